//! # Domain Models
//!
//! Pure data types shared by the preload list crates: the persisted [`DomainState`]
//! record, the closed [`PreloadStatus`] set, and the store configuration tree.
//! Keep it lean: no I/O, networking, or heavy logic, just data and simple helpers.

pub mod config;
pub mod constants;
pub mod state;

pub use config::{
    BackendKind, DatabaseConfig, DatabaseCredentials, EmulatorConfig, LogConfig, LogFormat, StoreConfig,
};
pub use state::{DomainState, PreloadStatus};
