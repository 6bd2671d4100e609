//! In-process fakes of the two search backends' servers

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const PASSWORD: &str = "SecretPassword";
pub const API_KEY: &str = "testKey";

// ============================================================================
// Line-protocol daemon
// ============================================================================

/// How the fake daemon misbehaves
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DaemonMode {
    #[default]
    Normal,
    /// Answer queries with an `EVENT` line that is missing fields
    MalformedEvent,
    /// Refuse every `QUERY` with `ERR`
    RejectQuery,
    /// Refuse `PUSH` of this encoded object token
    RejectPush(String),
}

#[derive(Debug, Default)]
struct DaemonState {
    mode: DaemonMode,
    /// Commands received, one list per connection
    connections: Vec<Vec<String>>,
    /// bucket -> (object token, text) in push order
    buckets: HashMap<String, Vec<(String, String)>>,
}

/// A fake line-protocol search daemon listening on 127.0.0.1
#[derive(Clone)]
pub struct FakeDaemon {
    pub port: u16,
    state: Arc<Mutex<DaemonState>>,
}

impl FakeDaemon {
    pub fn start() -> Self {
        Self::with_mode(DaemonMode::Normal)
    }

    pub fn with_mode(mode: DaemonMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(DaemonState {
            mode,
            ..Default::default()
        }));

        let accept_state = state.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let state = accept_state.clone();
                let conn = {
                    let mut s = state.lock();
                    s.connections.push(Vec::new());
                    s.connections.len() - 1
                };
                thread::spawn(move || handle_connection(stream, state, conn));
            }
        });

        Self { port, state }
    }

    /// Commands received so far, one list per connection
    pub fn connections(&self) -> Vec<Vec<String>> {
        self.state.lock().connections.clone()
    }

    /// Object tokens stored in a bucket, in push order
    pub fn objects(&self, bucket: &str) -> Vec<String> {
        self.state
            .lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.iter().map(|(token, _)| token.clone()).collect())
            .unwrap_or_default()
    }
}

fn handle_connection(stream: TcpStream, state: Arc<Mutex<DaemonState>>, conn: usize) {
    let mut writer = stream.try_clone().unwrap();
    let reader = BufReader::new(stream);

    if writer
        .write_all(b"CONNECTED <sonic-server v1.4.9>\r\n")
        .is_err()
    {
        return;
    }

    for line in reader.lines() {
        let Ok(line) = line else { break };
        let line = line.trim_end_matches('\r').to_string();
        state.lock().connections[conn].push(line.clone());

        let replies = respond(&line, &state);
        let mut closing = false;
        for reply in replies {
            closing |= reply.starts_with("ENDED");
            if writer.write_all(format!("{}\r\n", reply).as_bytes()).is_err() {
                return;
            }
        }
        if closing {
            return;
        }
    }
}

fn respond(line: &str, state: &Arc<Mutex<DaemonState>>) -> Vec<String> {
    let mut state = state.lock();
    let verb = line.split(' ').next().unwrap_or_default();

    match verb {
        "START" => {
            let parts: Vec<&str> = line.split(' ').collect();
            if parts.len() != 3 || parts[2] != PASSWORD {
                return vec!["ENDED authentication_failed".to_string()];
            }
            vec![format!("STARTED {} protocol(1) buffer(20000)", parts[1])]
        }
        "PUSH" => {
            // PUSH <collection> <bucket> <object> "<text>"
            let parts: Vec<&str> = line.splitn(5, ' ').collect();
            if parts.len() != 5 {
                return vec!["ERR invalid_format(PUSH <collection> <bucket> <object> \"<text>\")".to_string()];
            }
            if state.mode == DaemonMode::RejectPush(parts[3].to_string()) {
                return vec!["ERR invalid_format".to_string()];
            }
            let Ok(text) = serde_json::from_str::<String>(parts[4]) else {
                return vec!["ERR invalid_format(text is not quoted)".to_string()];
            };
            state
                .buckets
                .entry(parts[2].to_string())
                .or_default()
                .push((parts[3].to_string(), text));
            vec!["OK".to_string()]
        }
        "FLUSHB" => {
            let bucket = line.split(' ').nth(2).unwrap_or_default();
            let flushed = state.buckets.remove(bucket).map(|b| b.len()).unwrap_or(0);
            vec![format!("RESULT {}", flushed)]
        }
        "QUERY" => {
            if state.mode == DaemonMode::RejectQuery {
                return vec!["ERR query_failed".to_string()];
            }
            // QUERY <collection> <bucket> "<terms>" LIMIT(<n>)
            let parts: Vec<&str> = line.splitn(4, ' ').collect();
            let (bucket, rest) = (parts[2], parts[3]);
            let Some(split) = rest.rfind(" LIMIT(") else {
                return vec!["ERR invalid_format".to_string()];
            };
            let terms: String = serde_json::from_str(&rest[..split]).unwrap_or_default();
            let limit: usize = rest[split + 7..]
                .trim_end_matches(')')
                .parse()
                .unwrap_or(10);

            let words: Vec<String> = terms.split_whitespace().map(str::to_lowercase).collect();
            let hits: Vec<String> = state
                .buckets
                .get(bucket)
                .map(|objects| {
                    objects
                        .iter()
                        .filter(|(_, text)| {
                            let text = text.to_lowercase();
                            words.iter().any(|w| text.contains(w.as_str()))
                        })
                        .map(|(token, _)| token.clone())
                        .take(limit)
                        .collect()
                })
                .unwrap_or_default();

            let event = if state.mode == DaemonMode::MalformedEvent {
                "EVENT QUERY".to_string()
            } else if hits.is_empty() {
                "EVENT QUERY q7kDr1fM".to_string()
            } else {
                format!("EVENT QUERY q7kDr1fM {}", hits.join(" "))
            };
            vec!["PENDING q7kDr1fM".to_string(), event]
        }
        "QUIT" => vec!["ENDED quit".to_string()],
        _ => vec!["ERR unknown_command".to_string()],
    }
}

// ============================================================================
// HTTP search engine
// ============================================================================

#[derive(Debug)]
struct TaskRecord {
    polls: u32,
    error: Option<(String, String)>,
}

#[derive(Debug, Default)]
struct EngineState {
    indexes: HashMap<String, Vec<Value>>,
    tasks: HashMap<u64, TaskRecord>,
    next_task: u64,
    task_polls: u64,
}

type Shared = Arc<Mutex<EngineState>>;

/// A fake HTTP search engine with asynchronous tasks
///
/// Tasks report `processing` on their first poll and their final status on
/// the next one, so every mutating call goes through the poll loop.
#[derive(Clone)]
pub struct FakeEngine {
    pub url: String,
    state: Shared,
}

impl FakeEngine {
    pub fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/indexes", post(create_index))
            .route("/indexes/:uid", delete(delete_index))
            .route("/indexes/:uid/documents", post(add_documents))
            .route("/indexes/:uid/search", post(search))
            .route("/tasks/:uid", get(get_task))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    /// Raw documents stored in an index, as submitted
    pub fn documents(&self, index: &str) -> Option<Vec<Value>> {
        self.state.lock().indexes.get(index).cloned()
    }

    pub fn task_polls(&self) -> u64 {
        self.state.lock().task_polls
    }
}

fn engine_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "message": message,
            "code": code,
            "type": "invalid_request",
            "link": format!("https://docs.example/errors#{}", code),
        })),
    )
        .into_response()
}

fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {}", API_KEY);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(engine_error(
            StatusCode::UNAUTHORIZED,
            "invalid_api_key",
            "The provided API key is invalid.",
        )),
    }
}

fn enqueue(state: &mut EngineState, error: Option<(String, String)>) -> Response {
    state.next_task += 1;
    let uid = state.next_task;
    state.tasks.insert(uid, TaskRecord { polls: 0, error });
    (
        StatusCode::ACCEPTED,
        Json(json!({"taskUid": uid, "status": "enqueued", "type": "task"})),
    )
        .into_response()
}

async fn create_index(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    assert_eq!(body["primaryKey"], "id");
    let uid = body["uid"].as_str().unwrap_or_default().to_string();

    let mut state = state.lock();
    let error = if state.indexes.contains_key(&uid) {
        Some(("index_already_exists".to_string(), format!("Index `{}` already exists.", uid)))
    } else {
        state.indexes.insert(uid, Vec::new());
        None
    };
    enqueue(&mut state, error)
}

async fn delete_index(State(state): State<Shared>, headers: HeaderMap, Path(uid): Path<String>) -> Response {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let mut state = state.lock();
    let error = match state.indexes.remove(&uid) {
        Some(_) => None,
        None => Some(("index_not_found".to_string(), format!("Index `{}` not found.", uid))),
    };
    enqueue(&mut state, error)
}

async fn add_documents(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(documents): Json<Vec<Value>>,
) -> Response {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let mut state = state.lock();

    // Identifiers may only hold alphanumerics, '-' and '_'
    let invalid = documents.iter().find_map(|doc| {
        let id = doc["id"].as_str().unwrap_or_default();
        let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        (!valid).then(|| id.to_string())
    });
    if let Some(id) = invalid {
        let message = format!("Document identifier `{}` is invalid.", id);
        return enqueue(&mut state, Some(("invalid_document_id".to_string(), message)));
    }
    if documents.iter().any(|doc| doc["content"] == "FAIL") {
        return enqueue(
            &mut state,
            Some(("internal".to_string(), "indexing exploded".to_string())),
        );
    }

    let stored = state.indexes.entry(uid).or_default();
    for document in documents {
        stored.retain(|existing| existing["id"] != document["id"]);
        stored.push(document);
    }
    enqueue(&mut state, None)
}

async fn search(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(uid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let state = state.lock();
    let Some(documents) = state.indexes.get(&uid) else {
        return engine_error(
            StatusCode::NOT_FOUND,
            "index_not_found",
            &format!("Index `{}` not found.", uid),
        );
    };

    let query = body["q"].as_str().unwrap_or_default().to_string();
    let limit = body["limit"].as_u64().unwrap_or(20) as usize;
    let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();

    let matching: Vec<Value> = documents
        .iter()
        .filter(|doc| {
            let content = doc["content"].as_str().unwrap_or_default().to_lowercase();
            words.iter().any(|w| content.contains(w.as_str()))
        })
        .cloned()
        .collect();
    let total = matching.len();
    let hits: Vec<Value> = matching.into_iter().take(limit).collect();

    Json(json!({
        "hits": hits,
        "offset": 0,
        "limit": limit,
        "estimatedTotalHits": total,
        "processingTimeMs": 1,
        "query": query,
    }))
    .into_response()
}

async fn get_task(State(state): State<Shared>, headers: HeaderMap, Path(uid): Path<u64>) -> Response {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let mut state = state.lock();
    state.task_polls += 1;
    let Some(task) = state.tasks.get_mut(&uid) else {
        return engine_error(
            StatusCode::NOT_FOUND,
            "task_not_found",
            &format!("Task `{}` not found.", uid),
        );
    };

    task.polls += 1;
    let body = if task.polls == 1 {
        json!({"uid": uid, "status": "processing", "error": null})
    } else {
        match &task.error {
            None => json!({"uid": uid, "status": "succeeded", "error": null}),
            Some((code, message)) => json!({
                "uid": uid,
                "status": "failed",
                "error": {"message": message, "code": code, "type": "invalid_request", "link": ""},
            }),
        }
    };
    Json(body).into_response()
}
