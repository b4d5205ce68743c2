//! Key-ordered reads over the domain state kind.
//!
//! [`Query`] renders a parameterised `SurrealQL` select; [`QueryEngine`] runs the
//! reads the store exposes and turns raw key/value rows back into
//! [`DomainState`]s, always taking the name from the key.

use crate::error::StoreError;
use crate::session::{Key, Session};
use crate::store::schema::{self, DOMAIN_STATE_KIND};
use preload_domain::{DomainState, PreloadStatus};
use tracing::debug;

/// Upper bound on [`QueryEngine::autocomplete`] results.
pub const AUTOCOMPLETE_LIMIT: usize = 5;

const VALUE_FIELDS: &str = "status, message, submitted_at";

/// A select over one kind with optional status filter, key range, ordering and limit.
///
/// Values are always bound as parameters; only the kind (a `'static` constant) and
/// the numeric limit are rendered into the statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    kind: &'static str,
    status: Option<String>,
    after: Option<String>,
    order_by_key: bool,
    limit: Option<usize>,
    keys_only: bool,
}

impl Query {
    #[must_use]
    pub const fn new(kind: &'static str) -> Self {
        Self { kind, status: None, after: None, order_by_key: false, limit: None, keys_only: false }
    }

    /// Keeps records whose status equals `status`.
    #[must_use]
    pub fn filter_status(mut self, status: PreloadStatus) -> Self {
        self.status = Some(status.to_string());
        self
    }

    /// Keeps records whose key sorts strictly after `key`.
    #[must_use]
    pub fn after_key(mut self, key: &Key) -> Self {
        self.after = Some(key.name().to_owned());
        self
    }

    /// Sorts ascending by key. Without this the store makes no ordering promise.
    #[must_use]
    pub const fn order_by_key(mut self) -> Self {
        self.order_by_key = true;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Projects rows down to their keys.
    #[must_use]
    pub const fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    pub(crate) fn statement(&self) -> String {
        let mut sql = if self.keys_only {
            format!("SELECT id.id() AS name FROM {}", self.kind)
        } else {
            format!("SELECT id.id() AS name, {VALUE_FIELDS} FROM {}", self.kind)
        };

        let mut conditions = Vec::with_capacity(2);
        if self.status.is_some() {
            conditions.push("status = $status");
        }
        if self.after.is_some() {
            conditions.push("id > type::record($table, $after)");
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        if self.order_by_key {
            sql.push_str(" ORDER BY name ASC");
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql
    }

    pub(crate) fn bindings(&self) -> Vec<(&'static str, String)> {
        let mut bindings = Vec::with_capacity(3);
        if let Some(status) = &self.status {
            bindings.push(("status", status.clone()));
        }
        if let Some(after) = &self.after {
            bindings.push(("table", self.kind.to_owned()));
            bindings.push(("after", after.clone()));
        }
        bindings
    }

    pub(crate) fn describe(&self) -> String {
        let mut parts = vec![format!("select {}", self.kind)];
        if let Some(status) = &self.status {
            parts.push(format!("status={status}"));
        }
        if let Some(after) = &self.after {
            parts.push(format!("after={after}"));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={limit}"));
        }
        parts.join(" ")
    }
}

/// Runs the read side of the store against one session.
#[derive(Debug)]
pub(crate) struct QueryEngine<'a> {
    session: &'a Session,
}

impl<'a> QueryEngine<'a> {
    pub(crate) const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Every stored record, in no particular order.
    pub(crate) async fn all_states(&self) -> Result<Vec<DomainState>, StoreError> {
        self.states_for(&Query::new(DOMAIN_STATE_KIND)).await
    }

    /// Names (keys only) of the records whose status equals `status`.
    pub(crate) async fn names_with_status(
        &self,
        status: PreloadStatus,
    ) -> Result<Vec<String>, StoreError> {
        let query = Query::new(DOMAIN_STATE_KIND).filter_status(status);
        let keys = self.session.get_keys(&query).await?;
        Ok(keys.into_iter().map(Key::into_name).collect())
    }

    /// The record stored for `name`, or an `Unknown` state when there is none.
    pub(crate) async fn state_for_name(&self, name: &str) -> Result<DomainState, StoreError> {
        let key = Key::new(DOMAIN_STATE_KIND, name);
        match self.session.get(&key).await? {
            Some(value) => schema::decode(key, value),
            None => Ok(DomainState::unknown(name)),
        }
    }

    /// Up to [`AUTOCOMPLETE_LIMIT`] records whose name starts with `prefix`, ascending.
    ///
    /// The store has no starts-with operator, so this scans the keys sorting strictly
    /// after `prefix`, takes the first few and drops the ones that went past the
    /// prefix range. A record named exactly `prefix` is not included. An empty prefix
    /// matches everything and yields the first records in key order.
    pub(crate) async fn autocomplete(&self, prefix: &str) -> Result<Vec<DomainState>, StoreError> {
        let query = autocomplete_query(prefix);

        let states = self.states_for(&query).await?;
        let scanned = states.len();
        let matches: Vec<DomainState> =
            states.into_iter().filter(|state| state.name.starts_with(prefix)).collect();

        debug!(prefix, scanned, matched = matches.len(), "Autocomplete scan finished");
        Ok(matches)
    }

    async fn states_for(&self, query: &Query) -> Result<Vec<DomainState>, StoreError> {
        self.session
            .get_all(query)
            .await?
            .into_iter()
            .map(|(key, value)| schema::decode(key, value))
            .collect()
    }
}

/// Empty names are not valid record ids, so an empty prefix scans from the start.
fn autocomplete_query(prefix: &str) -> Query {
    let query = Query::new(DOMAIN_STATE_KIND).order_by_key().limit(AUTOCOMPLETE_LIMIT);
    if prefix.is_empty() { query } else { query.after_key(&Key::new(DOMAIN_STATE_KIND, prefix)) }
}
