//! Search backend trait definitions
//!
//! Defines the capability interface both backend variants implement and the
//! error taxonomy they report through.

use crate::codec::DecodeError;
use crate::types::{Document, SearchResult};
use std::fmt::Debug;

/// Default number of hits requested by [`SearchBackend::search`] callers
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Errors that can occur during backend operations
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Connect/read/write failure, including a connection closed mid-response.
    /// The backend is unavailable; nothing is retried.
    #[error("Backend unavailable: {0}")]
    Transport(#[from] std::io::Error),

    /// The response did not have the expected shape
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        /// For `search`, the zero-hit result the call degraded to
        partial: Option<Box<SearchResult>>,
    },

    /// A hit carried an identifier token that is not valid codec output
    #[error("Identifier decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An asynchronous task on the remote engine failed or did not finish
    #[error("Remote task {task_uid} failed: {message}")]
    RemoteTask { task_uid: u64, message: String },

    /// HTTP client error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote engine answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BackendError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            partial: None,
        }
    }

    /// Stable name of the error class, used as a metric label and in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TransportError",
            Self::Protocol { .. } => "ProtocolError",
            Self::Decode(_) => "DecodeError",
            Self::RemoteTask { .. } => "RemoteTaskError",
            Self::Network(_) => "NetworkError",
            Self::Api { .. } => "ApiError",
            Self::Config(_) => "ConfigError",
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Core trait for search backends
///
/// All operations are blocking. Implementations hold only read-only
/// connection settings and open a fresh transport per call, so one instance
/// can be shared behind an `Arc<dyn SearchBackend>` by concurrent callers.
pub trait SearchBackend: Send + Sync + Debug {
    /// Create the named index. Succeeds if the index already exists.
    fn create_index(&self, index_name: &str) -> BackendResult<()>;

    /// Delete the named index. Succeeds if the index does not exist.
    fn delete_index(&self, index_name: &str) -> BackendResult<()>;

    /// Add a batch of documents to the index
    ///
    /// Returns once the documents are searchable.
    fn index_documents(&self, index_name: &str, documents: &[Document]) -> BackendResult<()>;

    /// Search the index, returning at most `limit` hits in ranking order
    fn search(&self, index_name: &str, query: &str, limit: usize) -> BackendResult<SearchResult>;

    /// Get the backend name (e.g., "http", "socket")
    fn name(&self) -> &str;
}
