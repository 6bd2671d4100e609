//! HTTP search backend
//!
//! Delegates to a remote full-text search engine over its REST API. Every
//! mutating call enqueues an asynchronous task on the engine; the backend
//! polls that task to completion before returning, so a search issued right
//! after `index_documents` sees the new documents.
//!
//! Uses `reqwest::blocking`, so calls must not be made directly from an async
//! context. The HTTP API runs them on the blocking pool.

use super::traits::{BackendError, BackendResult, SearchBackend};
use crate::codec;
use crate::config::HttpBackendConfig;
use crate::types::{Document, SearchHit, SearchResult};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Primary key field every index is created with
const PRIMARY_KEY: &str = "id";

/// Engine error code when creating an index that exists
const INDEX_ALREADY_EXISTS: &str = "index_already_exists";

/// Engine error code when addressing an index that does not exist
const INDEX_NOT_FOUND: &str = "index_not_found";

/// HTTP search backend for a remote full-text search engine
#[derive(Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    config: HttpBackendConfig,
}

/// Create-index request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIndexRequest<'a> {
    uid: &'a str,
    primary_key: &'a str,
}

/// Document as submitted to the engine, with its identifier encoded
#[derive(Debug, Serialize)]
struct WireDocument<'a> {
    id: String,
    metadata: &'a HashMap<String, String>,
    content: &'a str,
}

/// Search request body
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    limit: usize,
}

/// Engine search response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    hits: Vec<Map<String, Value>>,
    #[serde(default)]
    offset: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    estimated_total_hits: Option<u64>,
    #[serde(default)]
    processing_time_ms: u64,
    #[serde(default)]
    query: Option<String>,
}

/// Summary returned when a task is enqueued
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskInfo {
    task_uid: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

#[derive(Debug, Deserialize)]
struct Task {
    status: TaskStatus,
    #[serde(default)]
    error: Option<EngineError>,
}

/// Engine error body
#[derive(Debug, Deserialize)]
struct EngineError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl HttpBackend {
    /// Create a new HTTP search backend
    pub fn new(config: HttpBackendConfig) -> BackendResult<Self> {
        info!("Initializing HTTP search backend: url={}", config.url);

        let mut base_url = Url::parse(&config.url)
            .map_err(|e| BackendError::Config(format!("Invalid search engine URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Config(format!(
                "Search engine URL cannot be a base: {}",
                config.url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| BackendError::Config(format!("Invalid API key format: {}", e)))?,
            );
        } else {
            warn!("No API key configured for {}", config.url);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Build an endpoint URL from path segments (each segment is escaped)
    fn endpoint(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Config("Search engine URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Turn a non-success response into an API error
    fn check(response: Response) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().unwrap_or_else(|_| "Unknown error".to_string());
        match serde_json::from_str::<EngineError>(&text) {
            Ok(body) => Err(BackendError::Api {
                status: status.as_u16(),
                code: body.code,
                message: body.message,
            }),
            Err(_) => Err(BackendError::Api {
                status: status.as_u16(),
                code: None,
                message: text,
            }),
        }
    }

    /// Poll a task until it leaves the queue
    ///
    /// A failed task whose error code equals `tolerated` counts as success.
    fn wait_for_task(&self, task_uid: u64, tolerated: Option<&str>) -> BackendResult<()> {
        let url = self.endpoint(&["tasks", &task_uid.to_string()])?;
        let poll_interval = Duration::from_millis(self.config.task_poll_interval_ms);
        let deadline = Instant::now() + Duration::from_millis(self.config.task_timeout_ms);

        loop {
            let task: Task = Self::check(self.client.get(url.clone()).send()?)?.json()?;

            match task.status {
                TaskStatus::Succeeded => return Ok(()),
                TaskStatus::Failed | TaskStatus::Canceled => {
                    let (code, message) = match task.error {
                        Some(e) => (e.code, e.message),
                        None => (None, format!("task {:?}", task.status).to_lowercase()),
                    };
                    if code.is_some() && code.as_deref() == tolerated {
                        debug!("Task {} ended with tolerated code: {}", task_uid, message);
                        return Ok(());
                    }
                    return Err(BackendError::RemoteTask { task_uid, message });
                }
                TaskStatus::Enqueued | TaskStatus::Processing => {}
            }

            if Instant::now() >= deadline {
                return Err(BackendError::RemoteTask {
                    task_uid,
                    message: format!(
                        "did not complete within {}ms",
                        self.config.task_timeout_ms
                    ),
                });
            }
            std::thread::sleep(poll_interval);
        }
    }
}

impl SearchBackend for HttpBackend {
    fn create_index(&self, index_name: &str) -> BackendResult<()> {
        let url = self.endpoint(&["indexes"])?;
        let request = CreateIndexRequest {
            uid: index_name,
            primary_key: PRIMARY_KEY,
        };

        let task: TaskInfo = Self::check(self.client.post(url).json(&request).send()?)?.json()?;
        debug!("create_index({}) enqueued as task {}", index_name, task.task_uid);
        self.wait_for_task(task.task_uid, Some(INDEX_ALREADY_EXISTS))
    }

    fn delete_index(&self, index_name: &str) -> BackendResult<()> {
        let url = self.endpoint(&["indexes", index_name])?;

        let response = match Self::check(self.client.delete(url).send()?) {
            Ok(response) => response,
            Err(BackendError::Api { code: Some(code), .. }) if code == INDEX_NOT_FOUND => {
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let task: TaskInfo = response.json()?;
        debug!("delete_index({}) enqueued as task {}", index_name, task.task_uid);
        self.wait_for_task(task.task_uid, Some(INDEX_NOT_FOUND))
    }

    fn index_documents(&self, index_name: &str, documents: &[Document]) -> BackendResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let url = self.endpoint(&["indexes", index_name, "documents"])?;
        let body: Vec<WireDocument<'_>> = documents
            .iter()
            .map(|d| WireDocument {
                id: codec::encode(&d.id),
                metadata: &d.metadata,
                content: &d.content,
            })
            .collect();

        let task: TaskInfo = Self::check(self.client.post(url).json(&body).send()?)?.json()?;
        debug!(
            "index_documents({}, {} documents) enqueued as task {}",
            index_name,
            documents.len(),
            task.task_uid
        );
        self.wait_for_task(task.task_uid, None)
    }

    fn search(&self, index_name: &str, query: &str, limit: usize) -> BackendResult<SearchResult> {
        let url = self.endpoint(&["indexes", index_name, "search"])?;
        let request = SearchRequest { q: query, limit };

        let response: SearchResponse =
            Self::check(self.client.post(url).json(&request).send()?)?.json()?;

        let hits = response
            .hits
            .into_iter()
            .map(decode_hit)
            .collect::<BackendResult<Vec<_>>>()?;

        Ok(SearchResult {
            hits,
            offset: response.offset.unwrap_or(0),
            limit: response.limit.unwrap_or(limit),
            estimated_total_hits: response.estimated_total_hits,
            processing_time_ms: response.processing_time_ms,
            query: response.query.unwrap_or_else(|| query.to_string()),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Pull the encoded identifier out of an engine hit and decode it
fn decode_hit(mut fields: Map<String, Value>) -> BackendResult<SearchHit> {
    let token = match fields.remove(PRIMARY_KEY) {
        Some(Value::String(token)) => token,
        other => {
            return Err(BackendError::protocol(format!(
                "hit has no string identifier: {:?}",
                other
            )))
        }
    };

    Ok(SearchHit {
        id: codec::decode(&token)?,
        fields,
    })
}
