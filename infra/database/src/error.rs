use std::borrow::Cow;
use std::time::Duration;

/// Errors surfaced by [`DomainStore`](crate::DomainStore) and the layers beneath it.
///
/// Backend errors are flattened into messages here, so callers never see `surrealdb`
/// types. "No such record" is not an error: single lookups return an
/// [`Unknown`](preload_domain::PreloadStatus::Unknown) state and scans return empty lists.
#[preload_derive::preload_error]
pub enum StoreError {
    /// The store could not be reached, started, or signed into.
    #[error("Store connection failed{}: {message}", format_context(.context))]
    Connection { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A write chunk was not confirmed. Earlier chunks of the same batch stay applied.
    #[error("Store write failed{}: {message}", format_context(.context))]
    Write { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A read, scan, or lookup failed, or returned a record that cannot be decoded.
    #[error("Store query failed{}: {message}", format_context(.context))]
    Query { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Invalid configuration supplied while building a store.
    #[error("Validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for broken invariants.
    #[error("Internal store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Which [`StoreError`] variant a failed backend call maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    Connection,
    Write,
    Query,
}

impl ErrorKind {
    pub(crate) fn wrap(self, message: String) -> StoreError {
        let message = message.into();
        match self {
            Self::Connection => StoreError::Connection { message, context: None },
            Self::Write => StoreError::Write { message, context: None },
            Self::Query => StoreError::Query { message, context: None },
        }
    }
}

impl StoreError {
    pub(crate) fn connection(err: impl ToString) -> Self {
        Self::Connection { message: err.to_string().into(), context: None }
    }

    pub(crate) fn write(err: impl ToString) -> Self {
        Self::Write { message: err.to_string().into(), context: None }
    }

    pub(crate) fn query(err: impl ToString) -> Self {
        Self::Query { message: err.to_string().into(), context: None }
    }

    pub(crate) fn deadline_exceeded(after: Duration) -> String {
        format!("deadline of {after:?} exceeded")
    }

    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    #[must_use]
    pub const fn is_query(&self) -> bool {
        matches!(self, Self::Query { .. })
    }
}
