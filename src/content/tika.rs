//! Apache Tika extraction
//!
//! Sends each file to a Tika server's `/tika/text` endpoint and flattens the
//! JSON answer into metadata plus content.

use super::{ExtractedDocument, ExtractionError, TextExtractor};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Key under which Tika returns the extracted text
const CONTENT_KEY: &str = "X-TIKA:content";

/// Client for a running Tika server
#[derive(Debug, Clone)]
pub struct TikaExtractor {
    client: Client,
    endpoint: Url,
}

impl TikaExtractor {
    pub fn new(tika_url: &str, timeout: Duration) -> Result<Self, ExtractionError> {
        let endpoint = Url::parse(tika_url)
            .and_then(|base| base.join("tika/text"))
            .map_err(|e| {
                ExtractionError::InvalidResponse(format!("invalid Tika URL {}: {}", tika_url, e))
            })?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, endpoint })
    }
}

impl TextExtractor for TikaExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        let body = std::fs::read(path).map_err(|e| ExtractionError::io(path, e))?;
        debug!("Extracting {} ({} bytes) via Tika", path.display(), body.len());

        let response = self
            .client
            .put(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .body(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(ExtractionError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let fields: Map<String, Value> = response
            .json()
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        Ok(flatten_response(fields))
    }

    fn name(&self) -> &str {
        "tika"
    }
}

/// Split Tika's JSON object into string metadata and trimmed content
fn flatten_response(fields: Map<String, Value>) -> ExtractedDocument {
    let mut metadata = HashMap::with_capacity(fields.len());
    let mut content = String::new();

    for (key, value) in fields {
        if key == CONTENT_KEY {
            if let Value::String(text) = value {
                content = text.trim().to_string();
            }
            continue;
        }
        metadata.insert(key, metadata_value(value));
    }

    ExtractedDocument { metadata, content }
}

fn metadata_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Array(items) => items
            .into_iter()
            .map(metadata_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
