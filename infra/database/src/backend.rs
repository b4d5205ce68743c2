//! Backend selection: which store a session talks to.
//!
//! The variant is chosen once, when a [`DomainStore`](crate::DomainStore) is built.
//! Everything above this module only ever asks for a session.

use crate::error::{ErrorKind, StoreError, StoreErrorExt};
use crate::session::Session;
use crate::store::schema;
use preload_domain::{DatabaseConfig, DatabaseCredentials};
use preload_domain::constants::{NAMESPACE, PROD_PROJECT_ID};
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

/// Root user every local server process is started with.
pub(crate) const LOCAL_ROOT_USER: &str = "root";
pub(crate) const LOCAL_ROOT_PASS: &str = "root";

/// The closed set of stores a [`DomainStore`](crate::DomainStore) can be bound to.
#[derive(Debug, Clone)]
pub enum Backend {
    /// In-process engine shared by every session of the store.
    Memory { instance: Surreal<Any> },
    /// A local server process on a loopback address, see [`Emulator`](crate::Emulator).
    Local { addr: String, project: String },
    /// The durable remote store.
    Production {
        url: String,
        namespace: String,
        project: String,
        credentials: Option<DatabaseCredentials>,
    },
}

impl Backend {
    /// Starts an in-process `mem://` engine. Its data lives as long as the returned value
    /// (or any clone of it).
    #[instrument]
    pub async fn memory(project: &str) -> Result<Self, StoreError> {
        let instance = connect("mem://")
            .await
            .map_err(StoreError::connection)
            .context("Initializing in-memory engine")?;
        instance
            .use_ns(NAMESPACE)
            .use_db(project)
            .await
            .map_err(StoreError::connection)
            .context("Activating session")?;
        schema::define(&instance).await?;

        info!(namespace = NAMESPACE, database = project, "In-memory store ready");
        Ok(Self::Memory { instance })
    }

    /// Targets a local server process listening on `addr` (`host:port`).
    #[must_use]
    pub fn local(addr: impl Into<String>, project: impl Into<String>) -> Self {
        Self::Local { addr: addr.into(), project: project.into() }
    }

    /// Targets the production store. The project is taken from the config and defaults to
    /// the production project when unset.
    #[must_use]
    pub fn production(config: &DatabaseConfig) -> Self {
        Self::Production {
            url: config.url.clone(),
            namespace: config.namespace.clone(),
            project: config.project.clone().unwrap_or_else(|| PROD_PROJECT_ID.to_owned()),
            credentials: config.credentials.clone(),
        }
    }

    /// Short name of the variant, for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Memory { .. } => "memory",
            Self::Local { .. } => "local",
            Self::Production { .. } => "production",
        }
    }

    /// Opens a session whose connection setup must finish within `deadline`.
    /// The same `deadline` then bounds each call made through the session.
    ///
    /// # Errors
    /// [`StoreError::Connection`] when the store is unreachable, rejects the credentials,
    /// or does not answer in time. Nothing is retried.
    pub async fn acquire_session(&self, deadline: Duration) -> Result<Session, StoreError> {
        match self {
            Self::Memory { instance } => Ok(Session::new(instance.clone(), deadline)),
            Self::Local { addr, project } => {
                if addr.is_empty() {
                    return Err(StoreError::Connection {
                        message: "empty address".into(),
                        context: Some("Uninitialized local backend?".into()),
                    });
                }
                let credentials = DatabaseCredentials {
                    username: LOCAL_ROOT_USER.to_owned(),
                    password: LOCAL_ROOT_PASS.to_owned(),
                };
                open(&format!("ws://{addr}"), NAMESPACE, project, Some(&credentials), deadline).await
            },
            Self::Production { url, namespace, project, credentials } => {
                open(url, namespace, project, credentials.as_ref(), deadline).await
            },
        }
    }
}

async fn open(
    url: &str,
    namespace: &str,
    project: &str,
    credentials: Option<&DatabaseCredentials>,
    deadline: Duration,
) -> Result<Session, StoreError> {
    let handshake = async {
        let instance = connect(url)
            .await
            .map_err(StoreError::connection)
            .context(format!("Connecting to {url}"))?;

        if let Some(credentials) = credentials {
            instance
                .signin(Root {
                    username: credentials.username.clone(),
                    password: credentials.password.clone(),
                })
                .await
                .map_err(StoreError::connection)
                .context(format!("Signing in to {url}"))?;
        }

        instance
            .use_ns(namespace)
            .use_db(project)
            .await
            .map_err(StoreError::connection)
            .context("Activating session")?;
        schema::define(&instance).await?;

        Ok::<_, StoreError>(instance)
    };

    let instance = timeout(deadline, handshake)
        .await
        .map_err(|_| ErrorKind::Connection.wrap(StoreError::deadline_exceeded(deadline)))
        .context(format!("Connecting to {url}"))??;

    debug!(url, namespace, database = project, "Session opened");
    Ok(Session::new(instance, deadline))
}
