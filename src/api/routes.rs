//! HTTP API Route Definitions

use axum::{middleware, routing::get, Router};
use std::path::Path;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use super::handlers::{self, AppState};
use super::middleware::track_metrics;

/// Create the API router
///
/// When `static_dir` exists, unmatched paths are served from it with
/// `index.html` for directories.
pub fn create_router(app_state: AppState, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/search", get(handlers::search))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/health", get(handlers::health));

    match static_dir {
        Some(dir) if dir.is_dir() => {
            info!("Serving static files from {}", dir.display());
            router = router
                .fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
        }
        Some(dir) => warn!("Static directory {} not found, frontend disabled", dir.display()),
        None => {}
    }

    router
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            track_metrics,
        ))
        .with_state(app_state)
}
