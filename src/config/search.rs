//! Search backend configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which search backend variant to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote full-text search engine over HTTP
    #[default]
    #[serde(alias = "meilisearch")]
    Http,
    /// Line-protocol search daemon over TCP
    #[serde(alias = "sonic")]
    Socket,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Socket => "socket",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" | "meilisearch" => Ok(Self::Http),
            "socket" | "sonic" => Ok(Self::Socket),
            other => Err(format!(
                "unknown backend '{}' (expected http, socket, meilisearch or sonic)",
                other
            )),
        }
    }
}

/// `[search.http]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBackendConfig {
    /// Base URL of the search engine
    pub url: String,
    /// API key sent as a bearer token (empty string disables it)
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Delay between task status polls in milliseconds
    pub task_poll_interval_ms: u64,
    /// Maximum time to wait for a task in milliseconds
    pub task_timeout_ms: u64,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:7700".to_string(),
            api_key: Some("aMasterKey".to_string()),
            timeout_secs: 30,
            task_poll_interval_ms: 50,
            task_timeout_ms: 5000,
        }
    }
}

/// `[search.socket]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketBackendConfig {
    /// Daemon host
    pub host: String,
    /// Daemon port
    pub port: u16,
    /// Channel password
    pub password: String,
    /// Connect timeout in seconds (0 = none)
    pub connect_timeout_secs: u64,
    /// Read/write timeout in seconds (0 = none)
    pub read_timeout_secs: u64,
}

impl Default for SocketBackendConfig {
    fn default() -> Self {
        Self {
            host: "::1".to_string(),
            port: 1491,
            password: "SecretPassword".to_string(),
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
        }
    }
}

/// `[search]` section: backend selection plus per-variant settings
///
/// ```toml
/// [search]
/// backend = "socket"
///
/// [search.socket]
/// host = "::1"
/// port = 1491
/// password = "SecretPassword"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Selected variant
    pub backend: BackendKind,
    /// HTTP engine settings
    pub http: HttpBackendConfig,
    /// Socket daemon settings
    pub socket: SocketBackendConfig,
}
