//! Locally spawned Tika server
//!
//! Used when no external Tika URL is configured. The child process lives as
//! long as the [`TikaServer`] value and is killed when it is dropped.

use super::ExtractionError;
use std::io::{BufRead, BufReader};
use std::net::TcpListener;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Line the server prints on stderr once it accepts requests
const READY_MARKER: &str = "Started Apache Tika server";

/// A Tika server child process
#[derive(Debug)]
pub struct TikaServer {
    child: Child,
    host: String,
    port: u16,
}

impl TikaServer {
    /// Spawn `<binary> -h <host> -p <port>` and wait until it reports ready
    ///
    /// `binary` is resolved on `PATH` unless it is a path. With no `port` a
    /// free local port is picked.
    pub fn spawn(
        binary: &Path,
        host: &str,
        port: Option<u16>,
        startup_timeout: Duration,
    ) -> Result<Self, ExtractionError> {
        let program = which::which(binary).map_err(|e| {
            ExtractionError::Startup(format!("cannot find {}: {}", binary.display(), e))
        })?;

        let port = match port {
            Some(port) => port,
            None => free_port(host)?,
        };

        info!("Starting Tika server {} on {}:{}", program.display(), host, port);

        let mut child = Command::new(&program)
            .arg("-h")
            .arg(host)
            .arg("-p")
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ExtractionError::Startup(format!("failed to run {}: {}", program.display(), e))
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractionError::Startup("child stderr not captured".to_string()))?;

        // Keep draining stderr after the marker so the child never blocks on a full pipe
        let (ready_tx, ready_rx) = mpsc::channel();
        thread::spawn(move || {
            let mut ready_tx = Some(ready_tx);
            for line in BufReader::new(stderr).lines() {
                let Ok(line) = line else { break };
                debug!("tika: {}", line);
                if line.contains(READY_MARKER) {
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(());
                    }
                }
            }
        });

        let mut server = Self {
            child,
            host: host.to_string(),
            port,
        };

        match ready_rx.recv_timeout(startup_timeout) {
            Ok(()) => {
                info!("Tika server ready at {}", server.url());
                Ok(server)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                server.kill();
                Err(ExtractionError::Startup(format!(
                    "Tika server did not start within {}s",
                    startup_timeout.as_secs()
                )))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let status = server.child.wait().ok();
                Err(ExtractionError::Startup(format!(
                    "Tika server exited before becoming ready (status: {:?})",
                    status
                )))
            }
        }
    }

    /// Base URL of the running server
    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }

    fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("Failed to stop Tika server: {}", e);
        }
        let _ = self.child.wait();
    }
}

impl Drop for TikaServer {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            debug!("Stopping Tika server on port {}", self.port);
            self.kill();
        }
    }
}

/// Ask the OS for an unused port on `host`
fn free_port(host: &str) -> Result<u16, ExtractionError> {
    let listener = TcpListener::bind((host, 0))
        .map_err(|e| ExtractionError::Startup(format!("cannot bind {}: {}", host, e)))?;
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|e| ExtractionError::Startup(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        let err = TikaServer::spawn(
            Path::new("definitely-not-a-tika-server-binary"),
            "127.0.0.1",
            None,
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::Startup(_)));
    }

    #[test]
    fn test_free_port() {
        assert_ne!(free_port("127.0.0.1").unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_waits_for_ready_marker() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-tika");
        std::fs::write(
            &script,
            "#!/bin/sh\necho 'INFO Started Apache Tika server at http://x/' >&2\nexec sleep 30\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let server =
            TikaServer::spawn(&script, "127.0.0.1", Some(9998), Duration::from_secs(10)).unwrap();
        assert_eq!(server.url(), "http://127.0.0.1:9998");
    }
}
