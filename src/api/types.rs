//! HTTP API Request/Response Types

use serde::{Deserialize, Serialize};

/// Body of the 400 answer when `q` is missing
pub const QUERY_REQUIRED: &str = "Query parameter \"q\" is required.";

/// Query string of `GET /search`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// The search query text
    pub q: Option<String>,
    /// Maximum number of hits (default: 20)
    pub limit: Option<usize>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Error class, present for backend failures
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: None,
        }
    }

    pub fn with_kind(error: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: Some(kind.into()),
        }
    }

    pub fn query_required() -> Self {
        Self::new(QUERY_REQUIRED)
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
}

/// Error class of a failed request, attached to the response for metrics
#[derive(Debug, Clone, Copy)]
pub struct ErrorKind(pub &'static str);
