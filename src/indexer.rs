//! Directory walk and indexing workflow
//!
//! Walks a directory tree, extracts every regular file and pushes the results
//! to a search backend in fixed-size batches. Documents are identified by
//! their path relative to the walked root.

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::backend::{BackendError, BackendResult, SearchBackend};
use crate::content::TextExtractor;
use crate::types::Document;

/// Default number of documents per `index_documents` call
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Outcome of one `index_directory` run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexingReport {
    /// Regular files found under the root
    pub files_seen: usize,
    /// Documents accepted by the backend
    pub documents_indexed: usize,
    /// Files skipped because extraction failed
    pub extraction_failures: usize,
    /// `index_documents` calls made
    pub batches: usize,
}

/// Relative paths of all regular files below `root`, sorted by file name
///
/// Unreadable entries are logged and skipped. Each call starts a new walk.
pub fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(move |entry| entry.path().strip_prefix(root).ok().map(Path::to_path_buf))
}

/// Document identifier for a relative path, always `/`-separated
pub fn document_id(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Index every file under `root` into `index_name`
///
/// Extraction failures are logged and counted; backend failures abort the
/// run and are returned as-is.
pub fn index_directory(
    backend: &dyn SearchBackend,
    extractor: &dyn TextExtractor,
    index_name: &str,
    root: &Path,
    batch_size: usize,
) -> BackendResult<IndexingReport> {
    if !root.is_dir() {
        return Err(BackendError::Config(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let start = Instant::now();
    let batch_size = batch_size.max(1);
    let mut report = IndexingReport::default();
    let mut batch: Vec<Document> = Vec::with_capacity(batch_size);

    info!(
        "Indexing {} into {} using {} extractor ({} backend)",
        root.display(),
        index_name,
        extractor.name(),
        backend.name()
    );
    backend.create_index(index_name)?;

    for relative in walk_files(root) {
        report.files_seen += 1;
        let id = document_id(&relative);
        info!("indexing {}", id);

        let extracted = match extractor.extract(&root.join(&relative)) {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Failed to extract {}: {}", id, e);
                report.extraction_failures += 1;
                continue;
            }
        };

        batch.push(Document::new(id, extracted.content).with_metadata(extracted.metadata));
        if batch.len() >= batch_size {
            flush(backend, index_name, &mut batch, &mut report)?;
        }
    }

    if !batch.is_empty() {
        flush(backend, index_name, &mut batch, &mut report)?;
    }

    info!(
        "Indexed {} of {} files into {} in {:.1}s ({} extraction failures)",
        report.documents_indexed,
        report.files_seen,
        index_name,
        start.elapsed().as_secs_f64(),
        report.extraction_failures
    );

    Ok(report)
}

fn flush(
    backend: &dyn SearchBackend,
    index_name: &str,
    batch: &mut Vec<Document>,
    report: &mut IndexingReport,
) -> BackendResult<()> {
    debug!("Sending batch of {} documents", batch.len());
    backend.index_documents(index_name, batch)?;
    report.documents_indexed += batch.len();
    report.batches += 1;
    batch.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("test.pdf"), b"%PDF").unwrap();
        fs::write(dir.path().join("test.docx"), b"PK").unwrap();
        fs::create_dir(dir.path().join("test")).unwrap();
        fs::write(dir.path().join("test").join("test.txt"), b"hello").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        dir
    }

    #[test]
    fn test_walk_files_relative_and_sorted() {
        let dir = tree();
        let files: Vec<String> = walk_files(dir.path()).map(|p| document_id(&p)).collect();
        assert_eq!(files, vec!["test/test.txt", "test.docx", "test.pdf"]);
    }

    #[test]
    fn test_walk_files_restarts() {
        let dir = tree();
        assert_eq!(walk_files(dir.path()).count(), 3);
        assert_eq!(walk_files(dir.path()).count(), 3);
    }

    #[test]
    fn test_walk_files_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(walk_files(dir.path()).count(), 0);
    }

    #[test]
    fn test_document_id_uses_forward_slashes() {
        let path: PathBuf = ["a", "b", "c.txt"].iter().collect();
        assert_eq!(document_id(&path), "a/b/c.txt");
    }
}
