//! # Stride Engine
//!
//! The local-first data core behind Stride: on-device persistence for
//! workouts, nutrition, daily metrics, goals and settings, plus the schema
//! machinery that keeps that data valid across app versions.
//!
//! ## Design Principles
//!
//! - **No network, no async**: remote sync lives in `stride-sync`
//! - **Never lose a record**: reads degrade to fallbacks, normalization
//!   repairs instead of rejecting, ids are assigned once and kept
//! - **Injected world**: storage backend and clock are passed in, so every
//!   behavior is testable without touching the real system
//!
//! ## Core Concepts
//!
//! ### Collections
//!
//! Five [`Collection`]s are stored as JSON under namespaced keys (see
//! [`StorageKeys`]): three record lists and two singletons.
//!
//! ### Normalization
//!
//! [`normalize()`] maps any stored JSON onto the canonical shapes in
//! [`record`]. It never fails and is idempotent.
//!
//! ### Migration
//!
//! [`LocalStore::migrate`] re-normalizes everything and stamps
//! [`SCHEMA_VERSION`]. Run it once per load and after any bulk replacement.
//!
//! ## Quick Start
//!
//! ```rust
//! use stride_engine::{Collection, LocalStore, MemoryStorage, SystemClock};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let store = LocalStore::new(MemoryStorage::new(), Arc::new(SystemClock));
//! store.migrate();
//!
//! let workout = store
//!     .add(Collection::Workouts, json!({"date": "2026-02-01", "type": "legs"}))
//!     .unwrap();
//! let id = workout["id"].as_str().unwrap();
//!
//! store
//!     .update(Collection::Workouts, id, &json!({"notes": "felt strong"}))
//!     .unwrap();
//! assert_eq!(store.records(Collection::Workouts).len(), 1);
//! ```

pub mod clock;
pub mod coerce;
pub mod error;
pub mod migrate;
pub mod normalize;
pub mod onboarding;
pub mod owner;
pub mod record;
pub mod schema;
pub mod snapshot;
pub mod storage;
pub mod store;

// Re-export main types at crate root
pub use clock::{format_timestamp, parse_timestamp, Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use migrate::{MigrationGate, MigrationReport};
pub use normalize::{normalize, NormalizeContext};
pub use onboarding::{Onboarding, OnboardingInput};
pub use owner::OwnershipGuard;
pub use record::{
    Exercise, Goals, MetricsEntry, NutritionEntry, OnboardingState, Profile, Settings, Workout,
    WorkoutSet,
};
pub use schema::{
    Collection, StorageKeys, StoredKey, WorkoutType, DEFAULT_KEY_PREFIX, SCHEMA_VERSION,
};
pub use snapshot::{ExportBundle, ImportReport, LocalSnapshot};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::{LocalStore, StoreListener};

/// Type aliases for clarity
pub type RecordId = String;
pub type SchemaVersion = u32;
