use anyhow::{Context, Result};
use aum::{backend::create_backend, config::Config};
use tracing::info;

pub fn search_index(config: &Config, index_name: &str, query: &str, limit: usize) -> Result<()> {
    info!("Searching {} for: {}", index_name, query);

    let backend = create_backend(&config.search).context("Failed to create search backend")?;
    let result = backend
        .search(index_name, query, limit)
        .with_context(|| format!("Search in {} failed", index_name))?;

    info!(
        "Found {} hits in {}ms",
        result.hits.len(),
        result.processing_time_ms
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
