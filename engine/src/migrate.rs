//! Migration gate.
//!
//! Runs the normalizer over every collection and stamps the current schema
//! version. It runs unconditionally, so every load heals whatever an older
//! (or newer) build left behind.

use crate::normalize::normalize;
use crate::schema::{Collection, SCHEMA_VERSION};
use crate::store::LocalStore;
use crate::SchemaVersion;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// What a migration pass did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Version found in storage before the pass, if any.
    pub from_version: Option<SchemaVersion>,
    pub to_version: SchemaVersion,
    /// The stored data was written by a newer build.
    pub skewed: bool,
    /// Record count per record collection after normalization.
    pub counts: BTreeMap<Collection, usize>,
    /// Collections whose normalized value could not be written back.
    pub failed: Vec<Collection>,
}

impl MigrationReport {
    /// True when every write succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Schema version detection and re-normalization over a [`LocalStore`].
pub struct MigrationGate<'a> {
    store: &'a LocalStore,
}

impl<'a> MigrationGate<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    /// Stored schema version. Older stores only kept it inside settings.
    pub fn stored_version(&self) -> Option<SchemaVersion> {
        let keys = self.store.keys();
        if let Some(version) = self.store.read_json(&keys.schema_version()).and_then(|v| version_of(&v)) {
            return Some(version);
        }
        self.store
            .read_json(&keys.collection(Collection::Settings))
            .and_then(|settings| settings.get("schemaVersion").and_then(version_of))
    }

    /// Re-normalize all collections and persist the current version.
    pub fn run(&self) -> MigrationReport {
        let from_version = self.stored_version();
        let skewed = from_version.is_some_and(|v| v > SCHEMA_VERSION);
        if skewed {
            tracing::warn!(
                stored = ?from_version,
                supported = SCHEMA_VERSION,
                "stored data was written by a newer schema version; normalizing anyway"
            );
        }

        let ctx = self.store.normalize_context();
        let mut counts = BTreeMap::new();
        let mut failed = Vec::new();

        {
            let _guard = self.store.lock_edits();
            for collection in Collection::ALL {
                let raw = self
                    .store
                    .read_json(&self.store.keys().collection(collection))
                    .unwrap_or(Value::Null);
                let normalized = normalize(collection, &raw, &ctx);
                if let Value::Array(items) = &normalized {
                    counts.insert(collection, items.len());
                }
                if let Err(err) = self.store.put_quiet(collection, &normalized) {
                    tracing::warn!(collection = %collection, error = %err, "failed to persist normalized collection");
                    failed.push(collection);
                }
            }

            let version = SCHEMA_VERSION.to_string();
            if !self
                .store
                .write_raw(&self.store.keys().schema_version(), Some(&version))
            {
                tracing::warn!("failed to persist schema version");
            }
        }

        tracing::debug!(?from_version, to_version = SCHEMA_VERSION, "migration complete");
        MigrationReport {
            from_version,
            to_version: SCHEMA_VERSION,
            skewed,
            counts,
            failed,
        }
    }
}

fn version_of(value: &Value) -> Option<SchemaVersion> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| SchemaVersion::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{KeyValueStorage, MemoryStorage};
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> (LocalStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::at("2026-02-01T14:00:00Z").unwrap());
        (LocalStore::new(storage.clone(), clock), storage)
    }

    #[test]
    fn fresh_store_gets_defaults_and_version() {
        let (store, storage) = store();
        let report = store.migrate();

        assert_eq!(report.from_version, None);
        assert_eq!(report.to_version, SCHEMA_VERSION);
        assert!(!report.skewed);
        assert!(report.is_clean());
        assert_eq!(report.counts.get(&Collection::Workouts), Some(&0));
        assert_eq!(storage.get("stride.schemaVersion").unwrap().as_deref(), Some("2"));
        assert_eq!(store.schema_version(), Some(SCHEMA_VERSION));
        assert_eq!(store.get(Collection::Settings)["workoutSplit"], json!(["push", "pull", "legs"]));
    }

    #[test]
    fn version_falls_back_to_settings() {
        let (store, storage) = store();
        storage
            .set("stride.settings", r#"{"schemaVersion": "1", "darkMode": true}"#)
            .unwrap();
        assert_eq!(store.migration().stored_version(), Some(1));

        let report = store.migrate();
        assert_eq!(report.from_version, Some(1));
        assert_eq!(store.get(Collection::Settings)["theme"], json!("dark"));
        assert!(store.get(Collection::Settings).get("darkMode").is_none());
    }

    #[test]
    fn newer_version_is_warned_not_fatal() {
        let (store, storage) = store();
        storage.set("stride.schemaVersion", "99").unwrap();
        storage
            .set("stride.workouts", r#"[{"id": "w1", "date": "2026-01-31", "type": "yoga"}]"#)
            .unwrap();

        let report = store.migrate();
        assert!(report.skewed);
        assert_eq!(report.from_version, Some(99));
        assert_eq!(store.schema_version(), Some(SCHEMA_VERSION));
        assert_eq!(store.get(Collection::Workouts)[0]["type"], json!("push"));
    }

    #[test]
    fn migration_is_repeatable() {
        let (store, storage) = store();
        storage
            .set("stride.nutrition", r#"[{"date": "2026-01-30", "alcohol": 1}, 7]"#)
            .unwrap();

        store.migrate();
        let first = storage.dump();
        store.migrate();
        assert_eq!(storage.dump(), first);
        assert_eq!(store.records(Collection::Nutrition).len(), 1);
    }
}
