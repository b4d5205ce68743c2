use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "PRELOAD";

/// Error raised while loading configuration.
#[preload_derive::preload_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads configuration from an optional file, overlaid with environment variables.
///
/// Environment variables use the `PRELOAD` prefix and `__` as the nesting separator,
/// so `PRELOAD__DATABASE__PROJECT` sets `database.project`. Fields missing from both
/// sources fall back to the type's `#[serde(default)]` values.
///
/// # Errors
/// Fails when the given file is missing or malformed, or when the merged values do not
/// deserialize into `T`.
///
/// # Example
/// ```rust,no_run
/// use preload_database::config::load_config;
/// use preload_domain::StoreConfig;
///
/// let cfg: StoreConfig = load_config(Some("config/preload.toml")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();

    if let Some(path) = &path {
        let path: &Path = path.as_ref();
        info!("Loading config from {}", path.display());
        builder = builder.add_source(File::from(path).required(true));
    }

    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX).separator("__").convert_case(config::Case::Snake),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}
