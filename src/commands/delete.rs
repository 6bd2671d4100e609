use anyhow::{Context, Result};
use aum::{backend::create_backend, config::Config};
use tracing::info;

pub fn delete_index(config: &Config, index_name: &str) -> Result<()> {
    let backend = create_backend(&config.search).context("Failed to create search backend")?;

    backend
        .delete_index(index_name)
        .with_context(|| format!("Failed to delete index {}", index_name))?;

    info!("Deleted index {} ({} backend)", index_name, backend.name());
    Ok(())
}
