//! Configuration for aum

mod extraction;
mod logging;
mod search;
mod server;

pub use extraction::{ExtractionConfig, ExtractorKind, IndexingConfig};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use search::{BackendConfig, BackendKind, HttpBackendConfig, SocketBackendConfig};
pub use server::HttpConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::debug;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "aum.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search backend selection and settings
    pub search: BackendConfig,
    /// Text extraction settings
    pub extraction: ExtractionConfig,
    /// Indexing workflow settings
    pub indexing: IndexingConfig,
    /// HTTP API server settings
    pub http: HttpConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("Config file {} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate all configuration fields.
    ///
    /// Collects every violation and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Search backend
        if url::Url::parse(&self.search.http.url).is_err() {
            errors.push(format!(
                "search.http.url is not a valid URL: '{}'",
                self.search.http.url
            ));
        }
        if self.search.http.task_poll_interval_ms == 0 {
            errors.push("search.http.task_poll_interval_ms must be positive".to_string());
        }
        if self.search.http.task_timeout_ms < self.search.http.task_poll_interval_ms {
            errors.push(
                "search.http.task_timeout_ms must be >= task_poll_interval_ms".to_string(),
            );
        }
        if self.search.socket.host.trim().is_empty() {
            errors.push("search.socket.host must not be empty".to_string());
        }
        if self.search.socket.port == 0 {
            errors.push("search.socket.port must be between 1 and 65535".to_string());
        }

        // Extraction
        if let Some(tika_url) = &self.extraction.tika_url {
            if url::Url::parse(tika_url).is_err() {
                errors.push(format!("extraction.tika_url is not a valid URL: '{}'", tika_url));
            }
        }
        if self.extraction.startup_timeout_secs == 0 {
            errors.push("extraction.startup_timeout_secs must be positive".to_string());
        }

        // Indexing
        if self.indexing.batch_size == 0 {
            errors.push("indexing.batch_size must be positive".to_string());
        }

        // HTTP API
        match self.http.listen_addr.parse::<SocketAddr>() {
            Ok(addr) if addr.port() == 0 => {
                errors.push("http.listen_addr port must be between 1 and 65535".to_string());
            }
            Ok(_) => {}
            Err(_) => errors.push(format!(
                "http.listen_addr is not a socket address: '{}'",
                self.http.listen_addr
            )),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )
        }
    }
}
