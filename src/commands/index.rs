use anyhow::{Context, Result};
use aum::{
    backend::create_backend,
    config::{Config, ExtractionConfig, ExtractorKind},
    content::{PlainTextExtractor, TextExtractor, TikaExtractor, TikaServer},
    indexer,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub fn index_directory(config: &Config, index_name: &str, directory: &Path) -> Result<()> {
    let backend = create_backend(&config.search).context("Failed to create search backend")?;

    // The spawned server, if any, must outlive the extractor using it
    let (extractor, _tika_server) = start_extractor(&config.extraction)?;

    let report = indexer::index_directory(
        backend.as_ref(),
        extractor.as_ref(),
        index_name,
        directory,
        config.indexing.batch_size,
    )
    .with_context(|| format!("Indexing {} failed", directory.display()))?;

    info!(
        "Done: {} files, {} documents indexed in {} batches, {} extraction failures",
        report.files_seen, report.documents_indexed, report.batches, report.extraction_failures
    );

    Ok(())
}

fn start_extractor(
    config: &ExtractionConfig,
) -> Result<(Box<dyn TextExtractor>, Option<TikaServer>)> {
    match config.extractor {
        ExtractorKind::Plain => {
            info!("Using plain text extractor");
            Ok((Box::new(PlainTextExtractor), None))
        }
        ExtractorKind::Tika => {
            let timeout = Duration::from_secs(config.timeout_secs);
            match &config.tika_url {
                Some(url) => {
                    info!("Using Tika server at {}", url);
                    Ok((Box::new(TikaExtractor::new(url, timeout)?), None))
                }
                None => {
                    let server = TikaServer::spawn(
                        &config.tika_binary,
                        &config.tika_host,
                        config.tika_port,
                        Duration::from_secs(config.startup_timeout_secs),
                    )
                    .context("Failed to start a local Tika server (set --tika-url to use a running one)")?;
                    let extractor = TikaExtractor::new(&server.url(), timeout)?;
                    Ok((Box::new(extractor), Some(server)))
                }
            }
        }
    }
}
