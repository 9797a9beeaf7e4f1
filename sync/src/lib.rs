//! # Stride Sync
//!
//! Async runtime that mirrors a [`stride_engine::LocalStore`] to a remote
//! per-account document.
//!
//! - [`SyncEngine`] pulls (authoritative replace) and pushes (snapshot
//!   replace) whole collections.
//! - [`WriteScheduler`] debounces local writes into a single push.
//! - [`SyncSession`] reacts to sign-in, sign-out and cross-tab storage
//!   changes, and publishes [`SyncStatus`] and [`SessionEvent`]s.
//!
//! Remote storage sits behind [`RemoteDocumentStore`]; an in-memory and an
//! HTTP implementation ship with the crate.

pub mod config;
pub mod engine;
pub mod error;
pub mod remote;
pub mod scheduler;
pub mod session;
pub mod status;

pub use config::{ConfigError, SyncConfig, DEFAULT_DEBOUNCE};
pub use engine::{PullOutcome, SyncEngine};
pub use error::{RemoteError, Result, SyncError};
pub use remote::{Document, HttpDocumentStore, MemoryDocumentStore, RemoteDocumentStore};
pub use scheduler::WriteScheduler;
pub use session::{AuthState, StorageChange, SyncSession};
pub use status::{SessionEvent, SyncStatus};
