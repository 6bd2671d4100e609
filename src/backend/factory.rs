//! Backend factory for creating search backends from configuration

use super::http::HttpBackend;
use super::socket::SocketBackend;
use super::traits::{BackendResult, SearchBackend};
use crate::config::{BackendConfig, BackendKind};
use std::sync::Arc;
use tracing::info;

/// Create a search backend from configuration
///
/// Returns an `Arc<dyn SearchBackend>` that can be shared across threads.
pub fn create_backend(config: &BackendConfig) -> BackendResult<Arc<dyn SearchBackend>> {
    match config.backend {
        BackendKind::Http => {
            info!("Creating HTTP search backend: url={}", config.http.url);
            Ok(Arc::new(HttpBackend::new(config.http.clone())?))
        }

        BackendKind::Socket => {
            info!(
                "Creating socket search backend: {}:{}",
                config.socket.host, config.socket.port
            );
            Ok(Arc::new(SocketBackend::new(config.socket.clone())))
        }
    }
}
