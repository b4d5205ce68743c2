//! Raw store access: typed keys plus the four primitives every higher layer is
//! built from (`put_multi`, `get`, `get_all`, `get_keys`).
//!
//! Every call runs under its own deadline; a session never shares a time budget
//! across calls.

use crate::error::{ErrorKind, StoreError, StoreErrorExt};
use crate::query::Query;
use crate::store::schema::{InsertRow, KeyedRow, NameRow, StoredState};
use std::fmt;
use std::future::IntoFuture;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use tokio::time::timeout;
use tracing::debug;

/// Primary key of a record: its kind (table) plus its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    kind: &'static str,
    name: String,
}

impl Key {
    #[must_use]
    pub fn new(kind: &'static str, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn into_name(self) -> String {
        self.name
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// A live, deadline-scoped handle to the backing store.
///
/// Obtained per operation from [`Backend::acquire_session`](crate::Backend::acquire_session).
#[derive(Debug, Clone)]
pub struct Session {
    db: Surreal<Any>,
    deadline: Duration,
}

impl Session {
    pub(crate) const fn new(db: Surreal<Any>, deadline: Duration) -> Self {
        Self { db, deadline }
    }

    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Writes all `(key, value)` pairs in one statement, so the whole set applies or none of it
    /// does. Existing records are overwritten field by field (last write wins).
    pub async fn put_multi(&self, keys: &[Key], values: &[StoredState]) -> Result<(), StoreError> {
        if keys.len() != values.len() {
            return Err(StoreError::Internal {
                message: format!("{} keys for {} values", keys.len(), values.len()).into(),
                context: Some("put_multi".into()),
            });
        }
        let Some(kind) = keys.first().map(Key::kind) else {
            return Ok(());
        };

        let rows: Vec<InsertRow> =
            keys.iter().zip(values).map(|(key, value)| InsertRow::new(key, value)).collect();
        let statement = format!(
            "INSERT INTO {kind} $rows ON DUPLICATE KEY UPDATE \
             status = $input.status, message = $input.message, submitted_at = $input.submitted_at"
        );

        let response = self
            .bounded(self.db.query(statement).bind(("rows", rows)), ErrorKind::Write)
            .await?;
        response.check().map_err(surrealdb::Error::from).map_err(StoreError::write)?;

        debug!(kind, count = keys.len(), "Records written");
        Ok(())
    }

    /// Fetches the value stored under `key`, or `None` when no record exists.
    pub async fn get(&self, key: &Key) -> Result<Option<StoredState>, StoreError> {
        let mut response = self
            .bounded(
                self.db
                    .query(
                        "SELECT status, message, submitted_at FROM ONLY type::record($table, $name)",
                    )
                    .bind(("table", key.kind().to_owned()))
                    .bind(("name", key.name().to_owned())),
                ErrorKind::Query,
            )
            .await?;

        response
            .take::<Option<StoredState>>(0)
            .map_err(StoreError::query)
            .context(format!("get {key}"))
    }

    /// Runs `query` and returns every matching key with its value.
    pub async fn get_all(&self, query: &Query) -> Result<Vec<(Key, StoredState)>, StoreError> {
        let rows: Vec<KeyedRow> = self.select(query).await?;
        Ok(rows.into_iter().map(|row| row.split(query.kind())).collect())
    }

    /// Runs `query` projected down to keys only.
    pub async fn get_keys(&self, query: &Query) -> Result<Vec<Key>, StoreError> {
        let query = query.clone().keys_only();
        let rows: Vec<NameRow> = self.select(&query).await?;
        Ok(rows.into_iter().map(|row| Key::new(query.kind(), row.name)).collect())
    }

    async fn select<T>(&self, query: &Query) -> Result<Vec<T>, StoreError>
    where
        T: surrealdb::types::SurrealValue,
    {
        let statement = query.statement();
        debug!(%statement, "Running query");

        let mut call = self.db.query(statement);
        for binding in query.bindings() {
            call = call.bind(binding);
        }

        let mut response = self.bounded(call, ErrorKind::Query).await?;
        response.take::<Vec<T>>(0).map_err(StoreError::query).context(query.describe())
    }

    async fn bounded<F, T, E>(&self, call: F, kind: ErrorKind) -> Result<T, StoreError>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: fmt::Display,
    {
        match timeout(self.deadline, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(kind.wrap(err.to_string())),
            Err(_) => Err(kind.wrap(StoreError::deadline_exceeded(self.deadline))),
        }
    }
}
