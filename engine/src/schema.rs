//! Collection catalogue, enumerations and storage key layout.
//!
//! Everything the store persists lives under a small, fixed set of keys: the
//! five collections, the schema version marker and the owner marker.

use crate::{Error, SchemaVersion};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Schema version written by this build.
pub const SCHEMA_VERSION: SchemaVersion = 2;

/// Key prefix used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "stride";

/// The five logical collections managed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Workouts,
    Nutrition,
    Metrics,
    Goals,
    Settings,
}

impl Collection {
    /// Every collection, in persistence order.
    pub const ALL: [Collection; 5] = [
        Collection::Workouts,
        Collection::Nutrition,
        Collection::Metrics,
        Collection::Goals,
        Collection::Settings,
    ];

    /// Stable name used for storage keys, exports and remote document fields.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Workouts => "workouts",
            Collection::Nutrition => "nutrition",
            Collection::Metrics => "metrics",
            Collection::Goals => "goals",
            Collection::Settings => "settings",
        }
    }

    /// Singletons hold one object instead of a sequence of records.
    pub fn is_singleton(self) -> bool {
        matches!(self, Collection::Goals | Collection::Settings)
    }

    /// Look up a collection by its stable name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnknownCollection(s.to_string()))
    }
}

/// Workout categories, in declaration order.
///
/// The first variant doubles as the fallback for unrecognized input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    #[default]
    Push,
    Pull,
    Legs,
    Upper,
    Lower,
    FullBody,
    Cardio,
    Other,
}

impl WorkoutType {
    pub const ALL: [WorkoutType; 8] = [
        WorkoutType::Push,
        WorkoutType::Pull,
        WorkoutType::Legs,
        WorkoutType::Upper,
        WorkoutType::Lower,
        WorkoutType::FullBody,
        WorkoutType::Cardio,
        WorkoutType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkoutType::Push => "push",
            WorkoutType::Pull => "pull",
            WorkoutType::Legs => "legs",
            WorkoutType::Upper => "upper",
            WorkoutType::Lower => "lower",
            WorkoutType::FullBody => "full_body",
            WorkoutType::Cardio => "cardio",
            WorkoutType::Other => "other",
        }
    }

    /// Case-insensitive parse; `full body` and `full-body` are accepted too.
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|t| t.as_str() == wanted)
    }

    /// Split used when settings carry no usable one.
    pub fn default_split() -> Vec<WorkoutType> {
        vec![WorkoutType::Push, WorkoutType::Pull, WorkoutType::Legs]
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoredKey {
    Collection(Collection),
    SchemaVersion,
    OwnerAccountId,
}

/// Namespaced storage key layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    prefix: String,
}

impl StorageKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn collection(&self, collection: Collection) -> String {
        self.namespaced(collection.name())
    }

    pub fn schema_version(&self) -> String {
        self.namespaced("schemaVersion")
    }

    pub fn owner_account_id(&self) -> String {
        self.namespaced("ownerAccountId")
    }

    /// Map a raw storage key back to what it holds, `None` for foreign keys.
    pub fn classify(&self, raw: &str) -> Option<StoredKey> {
        let name = raw
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('.'))?;
        match name {
            "schemaVersion" => Some(StoredKey::SchemaVersion),
            "ownerAccountId" => Some(StoredKey::OwnerAccountId),
            other => Collection::from_name(other).map(StoredKey::Collection),
        }
    }

    fn namespaced(&self, name: &str) -> String {
        format!("{}.{}", self.prefix, name)
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}
