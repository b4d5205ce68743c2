use crate::constants::{DEFAULT_TIMEOUT_SECS, LOCAL_PROJECT_ID, NAMESPACE};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use strum_macros::Display;

/// Which backing store a [`StoreConfig`] selects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendKind {
    /// In-process engine, gone when the process exits.
    #[default]
    Memory,
    /// A throwaway local server process on a loopback port.
    Local,
    /// The durable remote store.
    Production,
}

/// Top-level store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub database: DatabaseConfig,
    pub emulator: EmulatorConfig,
    pub log: LogConfig,
    /// Per-call deadline applied independently to every store call.
    pub timeout_secs: u64,
}

impl StoreConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Remote `SurrealDB` connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    /// Database name; falls back to the production project when unset.
    pub project: Option<String>,
    pub credentials: Option<DatabaseCredentials>,
}

/// `SurrealDB` root credentials (optional when using unauthenticated engines like mem://).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: String,
}

/// How to launch the local server process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub binary: PathBuf,
    pub project: String,
    /// Health probes before giving up on a freshly spawned server.
    pub startup_attempts: u32,
    pub startup_delay_ms: u64,
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Logging settings, consumed by `preload-logger`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level directive, e.g. `info` or `debug`.
    pub level: String,
    /// Extra per-target directives, e.g. `preload_database=debug,surrealdb=warn`.
    pub filter: Option<String>,
    pub console: bool,
    /// Directory for daily rolling log files; no file output when unset.
    pub directory: Option<PathBuf>,
    pub format: LogFormat,
    pub max_files: usize,
}

// --- Default ---

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            database: DatabaseConfig::default(),
            emulator: EmulatorConfig::default(),
            log: LogConfig::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".to_owned(),
            namespace: NAMESPACE.to_owned(),
            project: None,
            credentials: None,
        }
    }
}

impl Default for DatabaseCredentials {
    fn default() -> Self {
        Self { username: "root".to_owned(), password: "root".to_owned() }
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("surreal"),
            project: LOCAL_PROJECT_ID.to_owned(),
            startup_attempts: 6,
            startup_delay_ms: 250,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            filter: None,
            console: true,
            directory: None,
            format: LogFormat::default(),
            max_files: 7,
        }
    }
}
