//! Throwaway local store processes.
//!
//! [`Emulator::start`] launches `surreal start ... memory` on a fresh loopback port
//! and waits until it answers health checks. A process that fails to spawn or never
//! becomes healthy is reported as an error and killed; no handle is returned for it.

use crate::backend::{Backend, LOCAL_ROOT_PASS, LOCAL_ROOT_USER};
use crate::error::{StoreError, StoreErrorExt};
use crate::ports::LOCAL_PORTS;
use preload_domain::EmulatorConfig;
use std::process::Stdio;
use std::time::Duration;
use surrealdb::engine::any::connect;
use tokio::process::{Child, Command};
use tracing::{info, instrument, warn};

/// A running local store process.
///
/// The process is killed by [`Emulator::shutdown`], or when the handle is dropped.
#[derive(Debug)]
pub struct Emulator {
    addr: String,
    project: String,
    child: Child,
}

impl Emulator {
    /// Spawns a local store and waits for it to become healthy.
    ///
    /// Health is probed up to `startup_attempts` times, starting `startup_delay_ms` apart and
    /// doubling the delay after every miss.
    ///
    /// # Errors
    /// [`StoreError::Connection`] if the binary cannot be spawned, exits early, or is still
    /// unhealthy after the last probe.
    #[instrument(skip(config), fields(binary = %config.binary.display()))]
    pub async fn start(config: &EmulatorConfig) -> Result<Self, StoreError> {
        let port = LOCAL_PORTS.next_port();
        let addr = format!("127.0.0.1:{port}");

        let mut child = Command::new(&config.binary)
            .args(["start", "--bind", addr.as_str()])
            .args(["--user", LOCAL_ROOT_USER, "--pass", LOCAL_ROOT_PASS])
            .args(["--log", "warn", "memory"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(StoreError::connection)
            .context(format!("Spawning {}", config.binary.display()))?;

        let url = format!("ws://{addr}");
        let attempts = config.startup_attempts.max(1);
        let mut delay = Duration::from_millis(config.startup_delay_ms);

        for attempt in 1..=attempts {
            if let Some(status) = child.try_wait().map_err(StoreError::connection)? {
                return Err(StoreError::Connection {
                    message: format!("local store exited early with {status}").into(),
                    context: Some(url.into()),
                });
            }

            if is_healthy(&url).await {
                info!(%addr, attempt, "Local store ready");
                return Ok(Self { addr, project: config.project.clone(), child });
            }

            if attempt < attempts {
                warn!(attempt, ?delay, "Local store not ready, retrying...");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        if let Err(err) = child.kill().await {
            warn!(error = %err, "Failed to kill unhealthy local store");
        }
        Err(StoreError::Connection {
            message: format!("unhealthy after {attempts} attempts").into(),
            context: Some(url.into()),
        })
    }

    /// `host:port` the process listens on.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// A backend bound to this process.
    #[must_use]
    pub fn backend(&self) -> Backend {
        Backend::local(self.addr.clone(), self.project.clone())
    }

    /// Terminates the process and waits for it to exit.
    pub async fn shutdown(mut self) -> Result<(), StoreError> {
        self.child
            .kill()
            .await
            .map_err(|e| StoreError::Internal {
                message: e.to_string().into(),
                context: Some(format!("Stopping local store at {}", self.addr).into()),
            })?;
        info!(addr = %self.addr, "Local store stopped");
        Ok(())
    }
}

async fn is_healthy(url: &str) -> bool {
    match connect(url).await {
        Ok(instance) => instance.health().await.is_ok(),
        Err(_) => false,
    }
}
