//! aum: the tiny document search engine
//!
//! Indexes a directory of documents into a pluggable full-text search
//! backend and serves search over HTTP, featuring:
//! - A URL-safe identifier codec for document paths
//! - A line-protocol client for a lightweight search daemon
//! - An HTTP backend for a remote search engine with task polling
//! - Text extraction through Apache Tika
//! - Prometheus-style metrics for the API and every backend call

pub mod api;
pub mod backend;
pub mod client;
pub mod codec;
pub mod config;
pub mod content;
pub mod indexer;
pub mod metrics;
pub mod types;
pub mod util;

pub use backend::{create_backend, BackendError, BackendResult, SearchBackend};
pub use config::Config;
pub use types::*;
