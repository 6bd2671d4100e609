//! Content extraction module
//!
//! Turns files on disk into plain text plus a flat metadata map, ready to be
//! sent to a search backend. Two extractors are available: a Tika server
//! client for arbitrary document formats and a plain-text reader.

mod server;
mod text;
mod tika;

pub use server::TikaServer;
pub use text::PlainTextExtractor;
pub use tika::TikaExtractor;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during text extraction
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Extraction request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Extraction server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid extraction response: {0}")]
    InvalidResponse(String),

    #[error("Extraction server unavailable: {0}")]
    Startup(String),
}

impl ExtractionError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Extracted document content with metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDocument {
    /// Flat string metadata (content type, author, ...)
    pub metadata: HashMap<String, String>,
    /// The extracted text content
    pub content: String,
}

impl ExtractedDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            metadata: HashMap::new(),
            content: content.into(),
        }
    }
}

/// Extracts text and metadata from a file
///
/// Implementations are blocking and must be shareable across threads.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError>;

    /// Extractor name for logging
    fn name(&self) -> &str;
}
