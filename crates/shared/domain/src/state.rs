use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Position of a domain in the preload pipeline.
///
/// The string form (`"pending"`, `"pending-removal"`, ...) is what the store
/// persists and filters on, so it must stay stable.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PreloadStatus {
    /// No record exists for the domain.
    #[default]
    Unknown,
    Pending,
    Preloaded,
    Rejected,
    Removed,
    PendingRemoval,
}

/// The single persisted record per domain name.
///
/// `name` is the primary key in the store and is never written into the value
/// payload; readers rebuild it from the key. `message` and `submitted_at` are
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainState {
    pub name: String,
    pub status: PreloadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl DomainState {
    #[must_use]
    pub fn new(name: impl Into<String>, status: PreloadStatus) -> Self {
        Self { name: name.into(), status, message: None, submitted_at: None }
    }

    /// The state every never-written name is considered to be in.
    #[must_use]
    pub fn unknown(name: impl Into<String>) -> Self {
        Self::new(name, PreloadStatus::Unknown)
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub const fn with_submitted_at(mut self, at: DateTime<Utc>) -> Self {
        self.submitted_at = Some(at);
        self
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.status == PreloadStatus::Unknown
    }
}
