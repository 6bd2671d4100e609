//! HTTP API server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[http]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address for the API (e.g., "127.0.0.1:8000")
    pub listen_addr: String,
    /// Directory of static frontend files served for unmatched paths
    pub static_dir: Option<PathBuf>,
    /// Enable CORS (useful when the frontend is served elsewhere)
    pub cors_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8000".to_string(),
            static_dir: Some(PathBuf::from("public")),
            cors_enabled: false,
        }
    }
}
