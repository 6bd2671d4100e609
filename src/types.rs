//! Core types shared by the backends, the indexer and the HTTP API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Caller-supplied document identifier (typically a relative file path)
pub type DocumentId = String;

/// A document ready to be indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub content: String,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: HashMap::new(),
            content: content.into(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A single hit, addressed by the caller-supplied identifier
///
/// The socket backend only ever fills `id`. The HTTP backend keeps every
/// other field the remote engine returned in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocumentId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SearchHit {
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }
}

/// Canonical search result shape produced by every backend
///
/// Serializes to exactly `hits`, `offset`, `limit`, `estimatedTotalHits`,
/// `processingTimeMs` and `query`. Hits are in the engine's ranking order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    pub offset: usize,
    pub limit: usize,
    pub estimated_total_hits: Option<u64>,
    pub processing_time_ms: u64,
    pub query: String,
}

impl SearchResult {
    /// A result with no hits, as synthesized when the engine gives no usable answer
    pub fn empty(query: impl Into<String>, limit: usize) -> Self {
        Self {
            hits: Vec::new(),
            offset: 0,
            limit,
            estimated_total_hits: None,
            processing_time_ms: 0,
            query: query.into(),
        }
    }

    /// Identifiers of all hits, in ranking order
    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.id.as_str()).collect()
    }
}
