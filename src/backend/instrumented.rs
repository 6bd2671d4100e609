//! Metrics decorator for search backends
//!
//! Wraps any backend so every operation is counted, timed and, on failure,
//! labelled with its error class. Errors pass through unchanged.

use std::sync::Arc;

use tracing::warn;

use super::traits::{BackendResult, SearchBackend};
use crate::metrics::{AppMetrics, Timer};
use crate::types::{Document, SearchResult};

/// A backend that records metrics around every call of an inner backend
#[derive(Debug)]
pub struct InstrumentedBackend {
    inner: Arc<dyn SearchBackend>,
    metrics: Arc<AppMetrics>,
}

impl InstrumentedBackend {
    pub fn new(inner: Arc<dyn SearchBackend>, metrics: Arc<AppMetrics>) -> Self {
        Self { inner, metrics }
    }

    /// Run one backend call under instrumentation
    fn instrument<T>(
        &self,
        operation: &'static str,
        index_name: &str,
        call: impl FnOnce(&dyn SearchBackend) -> BackendResult<T>,
    ) -> BackendResult<T> {
        let labels = [self.inner.name(), operation, index_name];
        self.metrics.backend_requests_total.with_labels(&labels).inc();

        let timer = Timer::start();
        let result = call(self.inner.as_ref());
        timer.record(&self.metrics.backend_request_duration.with_labels(&labels));

        if let Err(e) = &result {
            warn!(
                backend = self.inner.name(),
                operation, index_name, "Backend call failed: {}", e
            );
            self.metrics
                .backend_exceptions_total
                .with_labels(&[self.inner.name(), operation, index_name, e.kind()])
                .inc();
        }

        result
    }
}

impl SearchBackend for InstrumentedBackend {
    fn create_index(&self, index_name: &str) -> BackendResult<()> {
        self.instrument("create_index", index_name, |b| b.create_index(index_name))
    }

    fn delete_index(&self, index_name: &str) -> BackendResult<()> {
        self.instrument("delete_index", index_name, |b| b.delete_index(index_name))
    }

    fn index_documents(&self, index_name: &str, documents: &[Document]) -> BackendResult<()> {
        self.instrument("index_documents", index_name, |b| {
            b.index_documents(index_name, documents)
        })?;
        self.metrics
            .documents_indexed_total
            .with_labels(&[self.inner.name(), index_name])
            .add(documents.len() as u64);
        Ok(())
    }

    fn search(&self, index_name: &str, query: &str, limit: usize) -> BackendResult<SearchResult> {
        self.instrument("search", index_name, |b| b.search(index_name, query, limit))
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
