//! Pluggable search backend system
//!
//! One trait, [`SearchBackend`], with two interchangeable implementations:
//!
//! - **HTTP backend**: a remote full-text search engine (Meilisearch-style
//!   REST API with asynchronous tasks)
//! - **Socket backend**: a lightweight line-protocol search daemon
//!   (Sonic-style ingest and search channels)
//!
//! The variant is chosen once at startup by [`create_backend`] and can be
//! wrapped in an [`InstrumentedBackend`] to record per-operation metrics.
//!
//! # Example Configuration
//!
//! ```toml
//! [search]
//! backend = "http"
//!
//! [search.http]
//! url = "http://127.0.0.1:7700"
//! api_key = "aMasterKey"
//! ```

mod factory;
mod http;
mod instrumented;
mod socket;
mod traits;

pub use factory::create_backend;
pub use http::HttpBackend;
pub use instrumented::InstrumentedBackend;
pub use socket::{escape_text, SocketBackend};
pub use traits::{BackendError, BackendResult, SearchBackend, DEFAULT_SEARCH_LIMIT};
