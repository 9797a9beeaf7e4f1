//! Snapshots, export and import.
//!
//! A [`LocalSnapshot`] is the raw stored text of everything a pull may
//! overwrite, captured before the pull starts so a failure can put it back
//! exactly. An [`ExportBundle`] is the user-facing backup format.

use crate::clock::Clock;
use crate::migrate::MigrationReport;
use crate::schema::{Collection, SCHEMA_VERSION};
use crate::store::LocalStore;
use crate::{Error, Result, SchemaVersion};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw copy of the stored collections and version marker.
///
/// The owner marker is deliberately excluded: it is set after every pull,
/// successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSnapshot {
    entries: BTreeMap<String, Option<String>>,
}

impl LocalSnapshot {
    pub fn capture(store: &LocalStore) -> Self {
        let keys = store.keys();
        let entries = Collection::ALL
            .into_iter()
            .map(|c| keys.collection(c))
            .chain(std::iter::once(keys.schema_version()))
            .map(|key| {
                let value = store.read_raw(&key);
                (key, value)
            })
            .collect();
        Self { entries }
    }

    /// Write every captured entry back, removing keys that were absent.
    pub fn restore(&self, store: &LocalStore) -> Result<()> {
        let _guard = store.lock_edits();
        let mut failed = Vec::new();
        for (key, value) in &self.entries {
            if !store.write_raw(key, value.as_deref()) {
                failed.push(key.as_str());
            }
        }
        if failed.is_empty() {
            tracing::debug!(entries = self.entries.len(), "snapshot restored");
            Ok(())
        } else {
            Err(crate::storage::StorageError::Unavailable(format!(
                "could not restore {}",
                failed.join(", ")
            ))
            .into())
        }
    }

    /// Raw stored text captured for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key)?.as_deref()
    }

    /// True when nothing was stored at capture time.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Option::is_none)
    }
}

/// Backup envelope: the five collections plus a version tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: SchemaVersion,
    pub exported_at: String,
    pub workouts: Value,
    pub nutrition: Value,
    pub metrics: Value,
    pub goals: Value,
    pub settings: Value,
}

impl ExportBundle {
    pub fn get(&self, collection: Collection) -> &Value {
        match collection {
            Collection::Workouts => &self.workouts,
            Collection::Nutrition => &self.nutrition,
            Collection::Metrics => &self.metrics,
            Collection::Goals => &self.goals,
            Collection::Settings => &self.settings,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }
}

/// Result of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Collections present in the input and written.
    pub imported: Vec<Collection>,
    pub migration: MigrationReport,
}

pub(crate) fn export(store: &LocalStore) -> ExportBundle {
    ExportBundle {
        version: store.schema_version().unwrap_or(SCHEMA_VERSION),
        exported_at: store.clock().now_iso(),
        workouts: store.get(Collection::Workouts),
        nutrition: store.get(Collection::Nutrition),
        metrics: store.get(Collection::Metrics),
        goals: store.get(Collection::Goals),
        settings: store.get(Collection::Settings),
    }
}

/// Write whichever collections `input` carries verbatim, then migrate.
pub(crate) fn import(store: &LocalStore, input: &Value) -> Result<ImportReport> {
    let fields = input
        .as_object()
        .ok_or_else(|| Error::InvalidImport("expected a JSON object".into()))?;

    let mut imported = Vec::new();
    {
        let _guard = store.lock_edits();
        for collection in Collection::ALL {
            if let Some(value) = fields.get(collection.name()) {
                store.put_quiet(collection, value)?;
                imported.push(collection);
            }
        }
        if let Some(version) = fields.get("version") {
            store.write_raw(&store.keys().schema_version(), Some(&version.to_string()));
        }
    }

    let migration = store.migrate();
    tracing::info!(collections = imported.len(), "import complete");
    for collection in &imported {
        store.notify(*collection);
    }
    Ok(ImportReport {
        imported,
        migration,
    })
}
