//! HTTP API Request Handlers

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::backend::{BackendError, SearchBackend, DEFAULT_SEARCH_LIMIT};
use crate::metrics::AppMetrics;

use super::types::*;

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn SearchBackend>,
    pub index_name: Arc<str>,
    pub metrics: Arc<AppMetrics>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        index_name: impl Into<Arc<str>>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            backend,
            index_name: index_name.into(),
            metrics,
        }
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.update_memory_usage();
    let body = state.metrics.to_prometheus();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Search endpoint: `GET /search?q=<query>[&limit=<n>]`
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let Some(query) = params.q.filter(|q| !q.is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(ErrorResponse::query_required())).into_response();
    };
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    debug!("HTTP search request: query={}, limit={}", query, limit);
    state
        .metrics
        .search_queries_total
        .with_labels(&[state.index_name.as_ref()])
        .inc();

    // Backends block on network I/O
    let backend = state.backend.clone();
    let index_name = state.index_name.clone();
    let outcome =
        tokio::task::spawn_blocking(move || backend.search(&index_name, &query, limit)).await;

    match outcome {
        Ok(Ok(result)) => Json(result).into_response(),
        Ok(Err(e)) => backend_error(&e),
        Err(e) => {
            error!("Search task failed: {}", e);
            let mut response = (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::with_kind(e.to_string(), "JoinError")),
            )
                .into_response();
            response.extensions_mut().insert(ErrorKind("JoinError"));
            response
        }
    }
}

fn backend_error(e: &BackendError) -> Response {
    error!("Search failed: {} ({})", e, e.kind());
    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::with_kind(e.to_string(), e.kind())),
    )
        .into_response();
    response.extensions_mut().insert(ErrorKind(e.kind()));
    response
}
