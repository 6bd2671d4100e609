//! Socket search backend
//!
//! Talks to a lightweight search daemon over its line protocol. All documents
//! live in one collection; an index is a bucket inside it. Identifiers travel
//! as codec tokens and text travels as a single JSON-style quoted literal.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::traits::{BackendError, BackendResult, SearchBackend};
use crate::client::connection::is_error;
use crate::client::{Channel, DaemonClient};
use crate::codec;
use crate::config::SocketBackendConfig;
use crate::types::{Document, SearchHit, SearchResult};

/// Collection every index (bucket) lives in
const COLLECTION: &str = "documents";

/// Search backend for the line-protocol search daemon
#[derive(Debug)]
pub struct SocketBackend {
    client: DaemonClient,
}

impl SocketBackend {
    pub fn new(config: SocketBackendConfig) -> Self {
        info!(
            "Initializing socket search backend: {}:{}",
            config.host, config.port
        );

        let client = DaemonClient::new(config.host, config.port, config.password).with_timeouts(
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.read_timeout_secs),
        );

        Self { client }
    }
}

impl SearchBackend for SocketBackend {
    fn create_index(&self, index_name: &str) -> BackendResult<()> {
        // Buckets come into existence on first PUSH
        validate_index_name(index_name)?;
        debug!("create_index({}) is a no-op for the socket backend", index_name);
        Ok(())
    }

    fn delete_index(&self, index_name: &str) -> BackendResult<()> {
        validate_index_name(index_name)?;

        let mut conn = self.client.open(Channel::Ingest)?;
        let response = conn.command(&format!("FLUSHB {} {}", COLLECTION, index_name))?;
        if is_error(&response) {
            return Err(BackendError::protocol(format!(
                "flush of {} refused: {}",
                index_name, response
            )));
        }

        debug!("Flushed bucket {}: {}", index_name, response);
        Ok(())
    }

    fn index_documents(&self, index_name: &str, documents: &[Document]) -> BackendResult<()> {
        validate_index_name(index_name)?;
        if documents.is_empty() {
            return Ok(());
        }
        validate_document_ids(documents)?;

        let mut conn = self.client.open(Channel::Ingest)?;
        let mut rejected = Vec::new();

        for document in documents {
            let command = format!(
                "PUSH {} {} {} {}",
                COLLECTION,
                index_name,
                codec::encode(&document.id),
                escape_text(&document.content)
            );

            // Exactly one response line per command keeps the stream aligned
            let response = conn.command(&command)?;
            if is_error(&response) {
                warn!("Daemon rejected {}: {}", document.id, response);
                rejected.push(document.id.as_str());
            }
        }

        if rejected.is_empty() {
            debug!("Pushed {} documents to {}", documents.len(), index_name);
            Ok(())
        } else {
            Err(BackendError::protocol(format!(
                "{} of {} documents rejected by daemon: {}",
                rejected.len(),
                documents.len(),
                rejected.join(", ")
            )))
        }
    }

    fn search(&self, index_name: &str, query: &str, limit: usize) -> BackendResult<SearchResult> {
        validate_index_name(index_name)?;
        let start = Instant::now();

        let command = format!(
            "QUERY {} {} {} LIMIT({})",
            COLLECTION,
            index_name,
            escape_text(query),
            limit
        );

        let event = {
            let mut conn = self.client.open(Channel::Search)?;
            let ack = conn.command(&command)?;
            if is_error(&ack) {
                return Err(BackendError::protocol(format!("query refused: {}", ack)));
            }
            conn.read_line()?
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;

        let tokens = match parse_query_event(&event) {
            Ok(tokens) => tokens,
            Err(message) => {
                let mut partial = SearchResult::empty(query, limit);
                partial.processing_time_ms = processing_time_ms;
                return Err(BackendError::Protocol {
                    message,
                    partial: Some(Box::new(partial)),
                });
            }
        };

        let hits = tokens
            .into_iter()
            .map(|token| codec::decode(token).map(SearchHit::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchResult {
            hits,
            offset: 0,
            limit,
            estimated_total_hits: None,
            processing_time_ms,
            query: query.to_string(),
        })
    }

    fn name(&self) -> &str {
        "socket"
    }
}

/// Quote text as a single protocol token
///
/// JSON string encoding escapes quotes, backslashes and control characters,
/// so the result never contains a raw newline.
pub fn escape_text(text: &str) -> String {
    serde_json::Value::String(text.to_owned()).to_string()
}

/// Extract hit tokens from `EVENT QUERY <request-id> <token>...`
fn parse_query_event(line: &str) -> Result<Vec<&str>, String> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("EVENT"), Some("QUERY"), Some(_request_id)) => Ok(parts.collect()),
        _ => Err(format!("malformed query event: {:?}", line)),
    }
}

/// Index names are sent bare, so they must be a single protocol token
fn validate_index_name(index_name: &str) -> BackendResult<()> {
    if index_name.is_empty()
        || index_name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '"')
    {
        return Err(BackendError::Config(format!(
            "invalid index name {:?}: must be non-empty without whitespace or quotes",
            index_name
        )));
    }
    Ok(())
}

/// An empty identifier encodes to an empty token, which would shift the
/// content into the object field of PUSH
fn validate_document_ids(documents: &[Document]) -> BackendResult<()> {
    let empty = documents.iter().filter(|d| d.id.is_empty()).count();
    if empty > 0 {
        return Err(BackendError::Config(format!(
            "{} of {} documents have an empty identifier",
            empty,
            documents.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text_quotes_and_newlines() {
        assert_eq!(escape_text("hello"), "\"hello\"");
        assert_eq!(escape_text("say \"hi\""), r#""say \"hi\"""#);
        assert_eq!(escape_text("a\\b"), r#""a\\b""#);
        assert_eq!(escape_text("line1\nline2\r\n"), r#""line1\nline2\r\n""#);
    }

    #[test]
    fn test_parse_query_event() {
        assert_eq!(
            parse_query_event("EVENT QUERY Bt2m2gYa YQ Yg").unwrap(),
            vec!["YQ", "Yg"]
        );
        assert!(parse_query_event("EVENT QUERY Bt2m2gYa").unwrap().is_empty());
        assert!(parse_query_event("EVENT QUERY").is_err());
        assert!(parse_query_event("ERR timed_out").is_err());
        assert!(parse_query_event("").is_err());
    }

    #[test]
    fn test_validate_index_name() {
        assert!(validate_index_name("test_index").is_ok());
        assert!(validate_index_name("").is_err());
        assert!(validate_index_name("two words").is_err());
        assert!(validate_index_name("quo\"te").is_err());
    }

    #[test]
    fn test_validate_document_ids() {
        assert!(validate_document_ids(&[Document::new("a.txt", "x")]).is_ok());
        let err = validate_document_ids(&[Document::new("a.txt", "x"), Document::new("", "y")])
            .unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
        assert!(err.to_string().contains("1 of 2"));
    }
}
