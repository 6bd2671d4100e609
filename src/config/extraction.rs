//! Text extraction and indexing configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which text extractor the indexer uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// Apache Tika server (external or spawned)
    #[default]
    Tika,
    /// Read files as UTF-8 text
    Plain,
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tika => "tika",
            Self::Plain => "plain",
        })
    }
}

impl FromStr for ExtractorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tika" => Ok(Self::Tika),
            "plain" | "text" => Ok(Self::Plain),
            other => Err(format!("unknown extractor '{}' (expected tika or plain)", other)),
        }
    }
}

/// `[extraction]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub extractor: ExtractorKind,
    /// URL of a running Tika server; when unset one is spawned locally
    pub tika_url: Option<String>,
    /// Host a spawned Tika server binds to
    pub tika_host: String,
    /// Port for a spawned Tika server (unset = pick a free port)
    pub tika_port: Option<u16>,
    /// Executable name or path of the Tika server launcher
    pub tika_binary: PathBuf,
    /// How long to wait for a spawned server to come up
    pub startup_timeout_secs: u64,
    /// Per-file extraction request timeout
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorKind::Tika,
            tika_url: None,
            tika_host: "127.0.0.1".to_string(),
            tika_port: None,
            tika_binary: PathBuf::from("tika-server"),
            startup_timeout_secs: 60,
            timeout_secs: 120,
        }
    }
}

/// `[indexing]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Documents sent per `index_documents` call
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}
