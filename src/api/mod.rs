//! HTTP API Server Module
//!
//! Serves `GET /search` against one index, Prometheus metrics, a health
//! check and the static search frontend.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::create_router;
pub use server::{shutdown_signal, ApiServer};
