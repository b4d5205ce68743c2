//! # Logger
//!
//! Installs the global `tracing` subscriber for the preload list binaries and tests:
//! console output, optional rolling log files written off-thread, and `RUST_LOG`-style
//! filtering. Every crate in the workspace only ever calls the `tracing` macros; this is
//! the one place that decides where those events go.
//!
//! ## Example
//!
//! ```rust
//! # use preload_logger::{LevelFilter, Logger};
//! let _logger = Logger::builder()
//!     .name("preload-store")
//!     .level(LevelFilter::DEBUG)
//!     .filter("surrealdb=warn")
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use preload_domain::{LogConfig, LogFormat};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use std::fs;
use std::path::PathBuf;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_SUFFIX: &str = "log";

/// Configures the global subscriber. Obtained from [`Logger::builder`].
#[derive(Debug)]
pub struct LoggerBuilder {
    name: String,
    level: LevelFilter,
    filter: Option<String>,
    console: bool,
    directory: Option<PathBuf>,
    format: LogFormat,
    rotation: Rotation,
    max_files: usize,
}

impl LoggerBuilder {
    /// Identifies the process in logs and prefixes the rolling file names
    /// (`<name>.<date>.log`). Required.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Per-target directives layered over the default level, e.g.
    /// `preload_database=debug,surrealdb=warn`. An invalid directive fails [`init`](Self::init).
    ///
    /// Without it the `RUST_LOG` environment variable is honoured instead.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    #[must_use]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// Also writes to rolling files under `directory`, created if missing.
    #[must_use]
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    #[must_use]
    pub const fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Rolled files kept on disk before the oldest is deleted.
    #[must_use]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.max_files = max;
        self
    }

    /// Installs the global subscriber.
    ///
    /// Keep the returned [`Logger`] alive until shutdown; dropping it flushes and stops the
    /// background file writer.
    ///
    /// # Errors
    /// [`LoggerError::InvalidConfiguration`] for an empty name, zero `max_files`, an invalid
    /// filter or no output at all; [`LoggerError::Subscriber`] if a global subscriber is
    /// already installed.
    pub fn init(self) -> Result<Logger, LoggerError> {
        self.validate()?;
        let env_filter = self.env_filter()?;

        let mut layers = Vec::new();
        if self.console {
            layers.push(fmt_layer(self.format, std::io::stdout, true));
        }

        let guard = match &self.directory {
            Some(directory) => {
                fs::create_dir_all(directory).map_err(|e| LoggerError::Internal {
                    message: e.to_string().into(),
                    context: Some(format!("Failed to create {}", directory.display()).into()),
                })?;

                let appender = RollingFileAppender::builder()
                    .rotation(self.rotation.clone())
                    .filename_prefix(&self.name)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(self.max_files)
                    .build(directory)
                    .context(format!("Log directory {}", directory.display()))?;

                let (writer, guard) = tracing_appender::non_blocking(appender);
                layers.push(fmt_layer(self.format, writer, false));
                Some(guard)
            },
            None => None,
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No output enabled. Enable the console or set a log directory.".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(env_filter).with(layers).try_init()?;
        tracing::debug!(name = %self.name, format = %self.format, "Logger installed");

        Ok(Logger { name: self.name, guard })
    }

    fn validate(&self) -> Result<(), LoggerError> {
        if self.name.trim().is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "Logger name cannot be empty".into(),
                context: None,
            });
        }
        if self.directory.is_some() && self.max_files == 0 {
            return Err(LoggerError::InvalidConfiguration {
                message: "max_files must be greater than zero".into(),
                context: self.directory.as_ref().map(|d| d.display().to_string().into()),
            });
        }
        Ok(())
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggerError> {
        let builder = EnvFilter::builder().with_default_directive(self.level.into());
        match &self.filter {
            Some(filter) => builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid filter '{filter}': {e}").into(),
                context: None,
            }),
            None => Ok(builder.from_env_lossy()),
        }
    }
}

fn fmt_layer<S, W>(format: LogFormat, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
    match format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Handle to the installed subscriber.
#[must_use = "Dropping this handle stops the background log writer."]
#[derive(Debug)]
pub struct Logger {
    name: String,
    guard: Option<WorkerGuard>,
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder {
            name: String::new(),
            level: LevelFilter::INFO,
            filter: None,
            console: true,
            directory: None,
            format: LogFormat::default(),
            rotation: Rotation::DAILY,
            max_files: 7,
        }
    }

    /// A builder preset from the `[log]` section of the store configuration.
    ///
    /// # Errors
    /// [`LoggerError::InvalidConfiguration`] when `config.level` is not a level name.
    pub fn builder_from_config(
        name: impl Into<String>,
        config: &LogConfig,
    ) -> Result<LoggerBuilder, LoggerError> {
        let level = config.level.parse::<LevelFilter>().map_err(|e| {
            LoggerError::InvalidConfiguration {
                message: format!("Invalid level '{}': {e}", config.level).into(),
                context: Some("log.level".into()),
            }
        })?;

        let mut builder = Self::builder()
            .name(name)
            .level(level)
            .console(config.console)
            .format(config.format)
            .max_files(config.max_files);
        if let Some(filter) = &config.filter {
            builder = builder.filter(filter.as_str());
        }
        if let Some(directory) = &config.directory {
            builder = builder.directory(directory.as_path());
        }
        Ok(builder)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether log files are being written in the background.
    #[must_use]
    pub const fn writes_files(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!(name = %self.name, "Logger shutting down, flushing log files");
        }
    }
}
