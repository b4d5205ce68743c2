//! # Preload Domain Store
//!
//! Persistence for the HSTS preload submission state of every domain, on top of
//! [SurrealDB](https://surrealdb.com).
//!
//! ## Key Features
//! - **Two Backends**: an ephemeral store (in-process `mem://` or a throwaway local
//!   server on a fresh loopback port) and the durable production store, chosen once.
//! - **Chunked Writes**: batches are split into chunks of [`BATCH_SIZE`] records and
//!   written in order, with progress reported to a [`ProgressSink`].
//! - **Key-Ordered Reads**: full scans, status filters, single lookups and prefix
//!   autocomplete.
//! - **Bounded Calls**: every store call runs under its own [`TIMEOUT`].
//!
//! ## Example
//!
//! ```rust
//! use preload_database::{BatchProgress, DomainStore, StoreError};
//! use preload_domain::{DomainState, PreloadStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StoreError> {
//!     let store = DomainStore::in_memory().await?;
//!
//!     let updates = vec![
//!         DomainState::new("google.com", PreloadStatus::Preloaded),
//!         DomainState::new("gopher.io", PreloadStatus::Pending),
//!     ];
//!     let mut log = String::new();
//!     store.put_states(&updates, &mut |event: &BatchProgress| log.push_str(&event.to_string())).await?;
//!     assert_eq!(log, "Updating 2 entries... done.");
//!
//!     let names: Vec<String> =
//!         store.autocomplete("go").await?.into_iter().map(|state| state.name).collect();
//!     assert_eq!(names, ["google.com", "gopher.io"]);
//!
//!     Ok(())
//! }
//! ```

mod backend;
pub mod batch;
pub mod config;
mod emulator;
mod error;
pub mod ports;
mod query;
mod session;
mod store;

pub use backend::Backend;
pub use batch::{BATCH_SIZE, BatchProgress, Discard, ProgressSink, TracingSink, chunk_count};
pub use emulator::Emulator;
pub use error::{StoreError, StoreErrorExt};
pub use ports::{LOCAL_PORTS, PortAllocator};
pub use preload_domain::{DomainState, PreloadStatus};
pub use query::{AUTOCOMPLETE_LIMIT, Query};
pub use session::{Key, Session};
pub use store::schema::{DOMAIN_STATE_KIND, StoredState};
pub use store::{DomainStore, DomainStoreInner, TIMEOUT};
