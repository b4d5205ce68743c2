//! Chunked writes.
//!
//! Updates are written in consecutive chunks of at most [`BATCH_SIZE`] records,
//! one atomic multi-put per chunk, strictly in input order. The first failed
//! chunk stops the batch: earlier chunks stay applied, later ones are never sent,
//! and nothing is retried or rolled back. Delivery is therefore at-least-once per
//! chunk; a caller that needs all-or-nothing must re-send the unapplied tail.

use crate::error::{StoreError, StoreErrorExt};
use crate::session::{Key, Session};
use crate::store::schema::{self, StoredState};
use preload_domain::DomainState;
use std::fmt;
use tracing::{debug, info, warn};

/// Records per write chunk, kept below the backend's per-operation item limit.
pub const BATCH_SIZE: usize = 450;

/// Number of chunk writes needed for `len` updates.
#[must_use]
pub const fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}

/// Progress events emitted around every chunk of a batch write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchProgress {
    /// The batch was empty; nothing will be written.
    NoUpdates,
    Starting { chunk: usize, size: usize },
    Done { chunk: usize, size: usize },
    Failed { chunk: usize, size: usize },
}

impl fmt::Display for BatchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoUpdates => write!(f, "No updates."),
            Self::Starting { size, .. } => write!(f, "Updating {size} entries..."),
            Self::Done { .. } => write!(f, " done."),
            Self::Failed { .. } => write!(f, " failed."),
        }
    }
}

/// Receives [`BatchProgress`] events synchronously, in order.
///
/// Any `FnMut(&BatchProgress)` closure is a sink.
pub trait ProgressSink {
    fn report(&mut self, event: &BatchProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(&BatchProgress),
{
    fn report(&mut self, event: &BatchProgress) {
        self(event);
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl ProgressSink for Discard {
    fn report(&mut self, _event: &BatchProgress) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn report(&mut self, event: &BatchProgress) {
        match *event {
            BatchProgress::NoUpdates => info!("No updates"),
            BatchProgress::Starting { chunk, size } => info!(chunk, size, "Updating entries"),
            BatchProgress::Done { chunk, size } => info!(chunk, size, "Chunk written"),
            BatchProgress::Failed { chunk, size } => warn!(chunk, size, "Chunk failed"),
        }
    }
}

/// Writes a batch through one session, chunk by chunk.
#[derive(Debug)]
pub(crate) struct BatchWriter<'a> {
    session: &'a Session,
    chunk_size: usize,
}

impl<'a> BatchWriter<'a> {
    pub(crate) const fn new(session: &'a Session) -> Self {
        Self { session, chunk_size: BATCH_SIZE }
    }

    pub(crate) async fn write<S>(&self, updates: &[DomainState], sink: &mut S) -> Result<(), StoreError>
    where
        S: ProgressSink + ?Sized,
    {
        let total = chunk_count(updates.len(), self.chunk_size);

        for (chunk, states) in updates.chunks(self.chunk_size).enumerate() {
            let size = states.len();
            let (keys, values): (Vec<Key>, Vec<StoredState>) =
                states.iter().map(schema::encode).unzip();

            sink.report(&BatchProgress::Starting { chunk, size });
            debug!(chunk, size, total, "Writing chunk");

            if let Err(err) = self.session.put_multi(&keys, &values).await {
                sink.report(&BatchProgress::Failed { chunk, size });
                return Err(err)
                    .context(format!("chunk {} of {total} ({size} entries)", chunk + 1));
            }

            sink.report(&BatchProgress::Done { chunk, size });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::query::QueryEngine;
    use crate::store::TIMEOUT;
    use preload_domain::PreloadStatus;
    use proptest::prelude::*;

    async fn rejecting_removed() -> Session {
        let Backend::Memory { instance } = Backend::memory("batch-failure").await.unwrap() else {
            unreachable!("memory backend");
        };
        instance
            .query(format!(
                "DEFINE FIELD status ON TABLE {} ASSERT $value != 'removed'",
                schema::DOMAIN_STATE_KIND
            ))
            .await
            .unwrap()
            .check()
            .unwrap();
        Session::new(instance, TIMEOUT)
    }

    #[test]
    fn chunk_count_matches_documented_examples() {
        assert_eq!(chunk_count(0, BATCH_SIZE), 0);
        assert_eq!(chunk_count(1, BATCH_SIZE), 1);
        assert_eq!(chunk_count(450, BATCH_SIZE), 1);
        assert_eq!(chunk_count(900, BATCH_SIZE), 2);
        assert_eq!(chunk_count(901, BATCH_SIZE), 3);
    }

    #[test]
    fn progress_renders_like_a_log_line() {
        let line = format!(
            "{}{}",
            BatchProgress::Starting { chunk: 0, size: 12 },
            BatchProgress::Done { chunk: 0, size: 12 }
        );
        assert_eq!(line, "Updating 12 entries... done.");
        assert_eq!(BatchProgress::NoUpdates.to_string(), "No updates.");
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        let mut sink = |event: &BatchProgress| seen.push(*event);
        sink.report(&BatchProgress::NoUpdates);
        Discard.report(&BatchProgress::NoUpdates);
        assert_eq!(seen, vec![BatchProgress::NoUpdates]);
    }

    #[tokio::test]
    async fn failed_chunk_stops_the_batch() {
        let session = rejecting_removed().await;
        let writer = BatchWriter { session: &session, chunk_size: 2 };
        let updates: Vec<DomainState> = ["a.com", "b.com", "c.com", "d.com", "e.com", "f.com"]
            .into_iter()
            .map(|name| {
                let status =
                    if name == "d.com" { PreloadStatus::Removed } else { PreloadStatus::Pending };
                DomainState::new(name, status)
            })
            .collect();

        let mut events = Vec::new();
        let err = writer
            .write(&updates, &mut |event: &BatchProgress| events.push(*event))
            .await
            .unwrap_err();

        assert!(err.is_write(), "{err}");
        assert_eq!(err.context_ref(), Some("chunk 2 of 3 (2 entries)"));
        assert_eq!(
            events,
            vec![
                BatchProgress::Starting { chunk: 0, size: 2 },
                BatchProgress::Done { chunk: 0, size: 2 },
                BatchProgress::Starting { chunk: 1, size: 2 },
                BatchProgress::Failed { chunk: 1, size: 2 },
            ]
        );

        let mut written: Vec<String> = QueryEngine::new(&session)
            .all_states()
            .await
            .unwrap()
            .into_iter()
            .map(|state| state.name)
            .collect();
        written.sort();
        assert_eq!(written, ["a.com", "b.com"]);
    }

    proptest! {
        #[test]
        fn chunks_cover_every_update_exactly_once(len in 0usize..5_000, size in 1usize..1_000) {
            let items: Vec<usize> = (0..len).collect();
            let chunks: Vec<&[usize]> = items.chunks(size).collect();

            prop_assert_eq!(chunks.len(), chunk_count(len, size));
            prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size));
            prop_assert_eq!(chunks.concat(), items);
        }
    }
}
