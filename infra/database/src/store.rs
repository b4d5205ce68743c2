//! The public face of the crate: [`DomainStore`].

pub(crate) mod schema;

use crate::backend::Backend;
use crate::batch::{BatchProgress, BatchWriter, Discard, ProgressSink};
use crate::config::{ConfigError, load_config};
use crate::emulator::Emulator;
use crate::error::StoreError;
use crate::query::QueryEngine;
use crate::session::Session;
use preload_domain::constants::LOCAL_PROJECT_ID;
use preload_domain::{
    BackendKind, DatabaseConfig, DomainState, EmulatorConfig, PreloadStatus, StoreConfig,
};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Deadline applied to session setup and, separately, to every store call.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Inner state of the [`DomainStore`] wrapper.
#[derive(Debug)]
pub struct DomainStoreInner {
    backend: Backend,
    timeout: Duration,
}

impl DomainStoreInner {
    #[must_use]
    pub const fn backend(&self) -> &Backend {
        &self.backend
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Persistence for the preload state of every domain.
///
/// Each operation opens its own session against the backend picked at construction, so a
/// store can be cloned cheaply and used from several tasks at once. No data is cached.
///
/// # Example
///
/// ```rust
/// use preload_database::{DomainStore, StoreError};
/// use preload_domain::{DomainState, PreloadStatus};
///
/// #[tokio::main]
/// async fn main() -> Result<(), StoreError> {
///     let store = DomainStore::in_memory().await?;
///
///     store.put_state(&DomainState::new("garron.net", PreloadStatus::Rejected)).await?;
///     let state = store.state_for_name("garron.net").await?;
///     assert_eq!(state.status, PreloadStatus::Rejected);
///
///     // Names never written are simply unknown.
///     let state = store.state_for_name("example.com").await?;
///     assert_eq!(state.status, PreloadStatus::Unknown);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DomainStore {
    inner: Arc<DomainStoreInner>,
}

impl Deref for DomainStore {
    type Target = DomainStoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DomainStore {
    /// Binds a store to `backend` with the default [`TIMEOUT`].
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self::with_timeout(backend, TIMEOUT)
    }

    #[must_use]
    pub fn with_timeout(backend: Backend, timeout: Duration) -> Self {
        info!(backend = backend.label(), ?timeout, "Domain store bound");
        Self { inner: Arc::new(DomainStoreInner { backend, timeout }) }
    }

    /// An ephemeral store inside this process. Data is gone once the last clone is dropped.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Backend::memory(LOCAL_PROJECT_ID).await?))
    }

    /// An ephemeral store backed by a freshly started local server process.
    ///
    /// Keep the returned [`Emulator`] alive while the store is in use and call
    /// [`Emulator::shutdown`] when done.
    pub async fn temp_local() -> Result<(Self, Emulator), StoreError> {
        Self::temp_local_with(&EmulatorConfig::default()).await
    }

    pub async fn temp_local_with(config: &EmulatorConfig) -> Result<(Self, Emulator), StoreError> {
        let emulator = Emulator::start(config).await?;
        Ok((Self::new(emulator.backend()), emulator))
    }

    /// The durable production store. No connection is made until the first operation.
    #[must_use]
    pub fn production(config: &DatabaseConfig) -> Self {
        Self::new(Backend::production(config))
    }

    /// The production store configured purely from `PRELOAD__*` environment variables.
    pub fn production_from_env() -> Result<Self, StoreError> {
        let config: StoreConfig =
            load_config(None::<&Path>).map_err(|e: ConfigError| StoreError::Validation {
                message: e.to_string().into(),
                context: Some("Loading store config from the environment".into()),
            })?;
        Self::production_from_config(&config)
    }

    /// The production store described by `config`, whatever backend it selects.
    pub fn production_from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        validate(config)?;
        Ok(Self::with_timeout(Backend::production(&config.database), config.timeout()))
    }

    /// Builds whichever store `config` selects. The emulator handle is only present for
    /// [`BackendKind::Local`].
    pub async fn from_config(config: &StoreConfig) -> Result<(Self, Option<Emulator>), StoreError> {
        validate(config)?;

        match config.backend {
            BackendKind::Memory => {
                let backend = Backend::memory(&config.emulator.project).await?;
                Ok((Self::with_timeout(backend, config.timeout()), None))
            },
            BackendKind::Local => {
                let emulator = Emulator::start(&config.emulator).await?;
                Ok((Self::with_timeout(emulator.backend(), config.timeout()), Some(emulator)))
            },
            BackendKind::Production => Ok((Self::production_from_config(config)?, None)),
        }
    }

    async fn session(&self) -> Result<Session, StoreError> {
        self.backend.acquire_session(self.timeout).await
    }

    /// Writes `updates` in chunks of [`BATCH_SIZE`](crate::BATCH_SIZE), reporting to `sink`.
    ///
    /// Stops at the first failed chunk. Chunks written before it stay written; see the
    /// [`batch`](crate::batch) module for the exact guarantees.
    #[instrument(skip_all, fields(updates = updates.len()))]
    pub async fn put_states<S>(&self, updates: &[DomainState], sink: &mut S) -> Result<(), StoreError>
    where
        S: ProgressSink + ?Sized,
    {
        if updates.is_empty() {
            sink.report(&BatchProgress::NoUpdates);
            return Ok(());
        }

        let session = self.session().await?;
        BatchWriter::new(&session).write(updates, sink).await
    }

    /// Writes a single state.
    pub async fn put_state(&self, update: &DomainState) -> Result<(), StoreError> {
        self.put_states(std::slice::from_ref(update), &mut Discard).await
    }

    /// The state of `name`. A name without a record is reported as
    /// [`PreloadStatus::Unknown`], not as an error.
    #[instrument(skip(self))]
    pub async fn state_for_name(&self, name: &str) -> Result<DomainState, StoreError> {
        let session = self.session().await?;
        QueryEngine::new(&session).state_for_name(name).await
    }

    /// Every stored state, in no particular order.
    #[instrument(skip(self))]
    pub async fn all_states(&self) -> Result<Vec<DomainState>, StoreError> {
        let session = self.session().await?;
        QueryEngine::new(&session).all_states().await
    }

    /// Names of the domains whose last written status is `status`, in no particular order.
    #[instrument(skip(self))]
    pub async fn names_with_status(&self, status: PreloadStatus) -> Result<Vec<String>, StoreError> {
        let session = self.session().await?;
        QueryEngine::new(&session).names_with_status(status).await
    }

    /// Up to five states whose name starts with `prefix`, in ascending name order.
    #[instrument(skip(self))]
    pub async fn autocomplete(&self, prefix: &str) -> Result<Vec<DomainState>, StoreError> {
        let session = self.session().await?;
        QueryEngine::new(&session).autocomplete(prefix).await
    }
}

fn validate(config: &StoreConfig) -> Result<(), StoreError> {
    if config.timeout_secs == 0 {
        return Err(StoreError::Validation {
            message: "timeout_secs must be greater than zero".into(),
            context: Some("store config".into()),
        });
    }
    Ok(())
}
