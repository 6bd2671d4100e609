//! Plain text extraction
//!
//! Reads the file as UTF-8, replacing invalid sequences. No metadata.

use super::{ExtractedDocument, ExtractionError, TextExtractor};
use std::path::Path;

/// Plain text extractor
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::io(path, e))?;
        Ok(ExtractedDocument::new(String::from_utf8_lossy(&bytes)))
    }

    fn name(&self) -> &str {
        "plain"
    }
}
