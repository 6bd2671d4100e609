use anyhow::{Context, Result};
use aum::{
    api::{shutdown_signal, ApiServer, AppState},
    backend::{create_backend, InstrumentedBackend, SearchBackend},
    config::Config,
    metrics::AppMetrics,
};
use std::sync::Arc;
use tracing::info;

pub fn serve(config: &Config, index_name: &str) -> Result<()> {
    let metrics = AppMetrics::shared();
    let backend = create_backend(&config.search).context("Failed to create search backend")?;
    let backend: Arc<dyn SearchBackend> =
        Arc::new(InstrumentedBackend::new(backend, metrics.clone()));

    // Held here so the blocking backend client is dropped outside the runtime
    let state = AppState::new(backend, index_name, metrics);
    let server = ApiServer::new(config.http.clone(), state.clone());

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(server.run(shutdown_signal()))?;
    drop(runtime);

    info!("Stopped serving {}", state.index_name);
    Ok(())
}
