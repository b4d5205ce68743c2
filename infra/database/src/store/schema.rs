//! Record layout of the `domain_state` kind.
//!
//! The name lives only in the record key. Values carry the status in its stable
//! string form plus the opaque auxiliary fields.

use crate::error::{StoreError, StoreErrorExt};
use crate::session::Key;
use chrono::{DateTime, Utc};
use preload_domain::{DomainState, PreloadStatus};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::types::SurrealValue;

/// Table holding one record per domain name.
pub const DOMAIN_STATE_KIND: &str = "domain_state";

/// Declares the domain state table. Reads against a table that was never declared
/// fail, so every connection runs this before handing out a session. Idempotent.
pub(crate) async fn define(db: &Surreal<Any>) -> Result<(), StoreError> {
    db.query(format!("DEFINE TABLE IF NOT EXISTS {DOMAIN_STATE_KIND} SCHEMALESS"))
        .await
        .map_err(StoreError::connection)?
        .check()
        .map_err(surrealdb::Error::from)
        .map_err(StoreError::connection)
        .context(format!("Defining {DOMAIN_STATE_KIND}"))?;
    Ok(())
}

/// Value payload of a domain state record.
#[derive(Debug, Clone, PartialEq, Eq, SurrealValue)]
pub struct StoredState {
    pub status: String,
    pub message: Option<String>,
    /// Unix milliseconds.
    pub submitted_at: Option<i64>,
}

/// Row shape accepted by `INSERT`: the key name as `id` plus the value.
#[derive(Debug, Clone, SurrealValue)]
pub(crate) struct InsertRow {
    id: String,
    status: String,
    message: Option<String>,
    submitted_at: Option<i64>,
}

impl InsertRow {
    pub(crate) fn new(key: &Key, value: &StoredState) -> Self {
        Self {
            id: key.name().to_owned(),
            status: value.status.clone(),
            message: value.message.clone(),
            submitted_at: value.submitted_at,
        }
    }
}

/// Row shape returned by scans: key name next to the value.
#[derive(Debug, SurrealValue)]
pub(crate) struct KeyedRow {
    name: String,
    status: String,
    message: Option<String>,
    submitted_at: Option<i64>,
}

impl KeyedRow {
    pub(crate) fn split(self, kind: &'static str) -> (Key, StoredState) {
        let value = StoredState {
            status: self.status,
            message: self.message,
            submitted_at: self.submitted_at,
        };
        (Key::new(kind, self.name), value)
    }
}

/// Row shape returned by keys-only scans.
#[derive(Debug, SurrealValue)]
pub(crate) struct NameRow {
    pub name: String,
}

/// Splits a state into its primary key and stored value.
pub(crate) fn encode(state: &DomainState) -> (Key, StoredState) {
    let value = StoredState {
        status: state.status.to_string(),
        message: state.message.clone(),
        submitted_at: state.submitted_at.map(|at| at.timestamp_millis()),
    };
    (Key::new(DOMAIN_STATE_KIND, state.name.clone()), value)
}

/// Rebuilds a state from a key and its stored value. Any name inside the value is ignored.
pub(crate) fn decode(key: Key, value: StoredState) -> Result<DomainState, StoreError> {
    let status: PreloadStatus = value.status.parse().map_err(|_| StoreError::Query {
        message: format!("unrecognised status {:?}", value.status).into(),
        context: Some(format!("decoding {key}").into()),
    })?;

    let submitted_at = value
        .submitted_at
        .map(|millis| {
            DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| StoreError::Query {
                message: format!("timestamp {millis} out of range").into(),
                context: Some(format!("decoding {key}").into()),
            })
        })
        .transpose()?;

    Ok(DomainState { name: key.into_name(), status, message: value.message, submitted_at })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keeps_the_name_out_of_the_value() {
        let state = DomainState::new("example.com", PreloadStatus::Preloaded).with_message("ok");
        let (key, value) = encode(&state);
        assert_eq!(key, Key::new(DOMAIN_STATE_KIND, "example.com"));
        assert_eq!(value.status, "preloaded");
        assert_eq!(value.message.as_deref(), Some("ok"));
        assert!(value.submitted_at.is_none());
    }

    #[test]
    fn decode_takes_the_name_from_the_key() {
        let submitted = DateTime::<Utc>::from_timestamp_millis(1_466_000_000_123).unwrap();
        let state = DomainState::new("garron.net", PreloadStatus::Rejected)
            .with_submitted_at(submitted);

        let (_, value) = encode(&state);
        let decoded = decode(Key::new(DOMAIN_STATE_KIND, "garron.net"), value).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn unknown_status_is_a_query_error() {
        let value = StoredState { status: "archived".to_owned(), message: None, submitted_at: None };
        let err = decode(Key::new(DOMAIN_STATE_KIND, "a.test"), value).unwrap_err();
        assert!(err.is_query());
        assert_eq!(err.context_ref(), Some("decoding domain_state:a.test"));
    }
}
