//! Client Module
//!
//! Speaks the search daemon's textual command/response protocol. Every
//! operation opens a fresh TCP stream, authenticates on a channel, runs its
//! commands and closes the stream again; no state survives between calls.

pub mod connection;

pub use connection::{read_line, send_command, Channel, ChannelConnection};

use std::net::TcpStream;
use std::time::Duration;

use tracing::debug;

use crate::backend::BackendResult;

/// Connection settings for the search daemon
///
/// Read-only after construction, so a single client can be shared by any
/// number of concurrent callers.
#[derive(Clone)]
pub struct DaemonClient {
    host: String,
    port: u16,
    password: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl std::fmt::Debug for DaemonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonClient")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl DaemonClient {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            connect_timeout: Duration::ZERO,
            read_timeout: Duration::ZERO,
        }
    }

    /// Set connect and read/write timeouts (zero disables a timeout)
    pub fn with_timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }

    /// Connect and authenticate on the given channel
    pub fn open(&self, channel: Channel) -> BackendResult<ChannelConnection<TcpStream>> {
        debug!(
            "Opening {} channel to {}:{}",
            channel.as_str(),
            self.host,
            self.port
        );
        let stream = connection::connect(
            &self.host,
            self.port,
            self.connect_timeout,
            self.read_timeout,
        )?;
        ChannelConnection::start(stream, channel, &self.password)
    }
}
