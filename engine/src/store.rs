//! LocalStore - on-device persistence for the five collections.
//!
//! Every collection is stored as JSON text under a namespaced key. Reads never
//! fail: missing or corrupt values come back as the collection's fallback.
//! Writes report success and notify registered listeners, which is how the
//! sync runtime learns it has something to push.
//!
//! Writes made on behalf of the system (migration, pull replacement, snapshot
//! restore, wipes) go through the quiet path and notify nobody.

use crate::clock::{format_timestamp, parse_timestamp, Clock};
use crate::coerce;
use crate::migrate::{MigrationGate, MigrationReport};
use crate::normalize::{normalize, NormalizeContext};
use crate::onboarding::Onboarding;
use crate::owner::OwnershipGuard;
use crate::schema::{Collection, StorageKeys};
use crate::snapshot::{self, ExportBundle, ImportReport, LocalSnapshot};
use crate::storage::KeyValueStorage;
use crate::{Error, Result, SchemaVersion};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Receives a callback after every user-visible write.
pub trait StoreListener: Send + Sync {
    fn on_write(&self, collection: Collection);
}

/// The local store.
pub struct LocalStore {
    storage: Box<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    keys: StorageKeys,
    listeners: RwLock<Vec<Arc<dyn StoreListener>>>,
    /// Serializes read-modify-write sequences.
    edit_lock: Mutex<()>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl LocalStore {
    /// Create a store over `storage` using the default key prefix.
    pub fn new(storage: impl KeyValueStorage + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage: Box::new(storage),
            clock,
            keys: StorageKeys::default(),
            listeners: RwLock::new(Vec::new()),
            edit_lock: Mutex::new(()),
        }
    }

    /// Use a different key namespace.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.keys = StorageKeys::new(prefix);
        self
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Normalization context pinned to the store's clock.
    pub fn normalize_context(&self) -> NormalizeContext {
        NormalizeContext::from_clock(self.clock.as_ref())
    }

    /// Register a write listener.
    pub fn subscribe(&self, listener: Arc<dyn StoreListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    // ------------------------------------------------------------------
    // Raw access
    // ------------------------------------------------------------------

    pub(crate) fn read_raw(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "storage read failed");
                None
            }
        }
    }

    pub(crate) fn read_json(&self, key: &str) -> Option<Value> {
        let text = self.read_raw(key)?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "ignoring unreadable stored value");
                None
            }
        }
    }

    /// Write or (for `None`) remove a raw value.
    pub(crate) fn write_raw(&self, key: &str, value: Option<&str>) -> bool {
        let result = match value {
            Some(text) => self.storage.set(key, text),
            None => self.storage.remove(key),
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "storage write failed");
                false
            }
        }
    }

    /// Persist a collection without notifying listeners.
    pub(crate) fn put_quiet(&self, collection: Collection, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.storage
            .set(&self.keys.collection(collection), &text)
            .map_err(Error::from)
    }

    pub(crate) fn notify(&self, collection: Collection) {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.on_write(collection);
        }
    }

    pub(crate) fn lock_edits(&self) -> std::sync::MutexGuard<'_, ()> {
        self.edit_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Collection API
    // ------------------------------------------------------------------

    /// Current stored value, or the collection's fallback (an empty list, or
    /// the default singleton) when missing or unreadable.
    pub fn get(&self, collection: Collection) -> Value {
        let stored = self.read_json(&self.keys.collection(collection));
        match stored {
            Some(value @ Value::Array(_)) if !collection.is_singleton() => value,
            Some(value @ Value::Object(_)) if collection.is_singleton() => value,
            _ => self.fallback(collection),
        }
    }

    fn fallback(&self, collection: Collection) -> Value {
        if collection.is_singleton() {
            normalize(collection, &Value::Null, &self.normalize_context())
        } else {
            Value::Array(Vec::new())
        }
    }

    /// Replace a collection. Returns `false` when the write failed.
    pub fn set(&self, collection: Collection, value: &Value) -> bool {
        let written = {
            let _guard = self.lock_edits();
            self.put_quiet(collection, value)
        };
        match written {
            Ok(()) => {
                tracing::debug!(collection = %collection, "collection written");
                self.notify(collection);
                true
            }
            Err(err) => {
                tracing::warn!(collection = %collection, error = %err, "collection write failed");
                false
            }
        }
    }

    /// Replace a collection wholesale without notifying listeners.
    ///
    /// Used for bulk replacement (remote pulls); run [`LocalStore::migrate`]
    /// afterwards to bring the new contents back to canonical shape.
    pub fn replace_quiet(&self, collection: Collection, value: &Value) -> Result<()> {
        let _guard = self.lock_edits();
        self.put_quiet(collection, value)
    }

    /// All records of a record collection (empty for singletons).
    pub fn records(&self, collection: Collection) -> Vec<Value> {
        match self.get(collection) {
            Value::Array(items) => items,
            _ => Vec::new(),
        }
    }

    /// Append a record. An `id` and `createdAt` are assigned only when the
    /// record does not already carry them; numeric ids are stored as strings.
    pub fn add(&self, collection: Collection, record: Value) -> Result<Value> {
        let mut record = into_object(record)?;
        ensure_records(collection)?;

        let id = match record.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => None,
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => Some(uuid::Uuid::new_v4().to_string()),
        };
        if let Some(id) = id {
            record.insert("id".into(), Value::String(id));
        }
        if !record.get("createdAt").is_some_and(has_identity) {
            record.insert("createdAt".into(), Value::String(self.clock.now_iso()));
        }
        let record = Value::Object(record);

        self.edit(collection, |records| {
            records.push(record.clone());
            Some(record.clone())
        })?
        .ok_or_else(|| Error::InvalidRecord("record was not added".into()))
    }

    /// Shallow-merge `patch` into the record with `id` and stamp `updatedAt`.
    /// `Ok(None)` means no record has that id.
    pub fn update(&self, collection: Collection, id: &str, patch: &Value) -> Result<Option<Value>> {
        let patch = patch
            .as_object()
            .ok_or_else(|| Error::InvalidRecord("update patch must be an object".into()))?;
        ensure_records(collection)?;
        let now = self.clock.now();

        self.edit(collection, |records| {
            let record = records
                .iter_mut()
                .find(|r| record_id(r) == Some(id))?
                .as_object_mut()?;

            for (key, value) in patch {
                if key != "id" && key != "createdAt" {
                    record.insert(key.clone(), value.clone());
                }
            }

            let previous = record
                .get("updatedAt")
                .and_then(Value::as_str)
                .and_then(parse_timestamp);
            let stamp = previous.map_or(now, |prev| prev.max(now));
            record.insert("updatedAt".into(), Value::String(format_timestamp(stamp)));
            Some(Value::Object(record.clone()))
        })
    }

    /// Remove the record with `id`. Returns whether one was removed.
    pub fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        ensure_records(collection)?;
        let removed = self.edit(collection, |records| {
            let before = records.len();
            records.retain(|r| record_id(r) != Some(id));
            (records.len() != before).then_some(())
        })?;
        Ok(removed.is_some())
    }

    pub fn find_by_id(&self, collection: Collection, id: &str) -> Option<Value> {
        self.records(collection)
            .into_iter()
            .find(|r| record_id(r) == Some(id))
    }

    /// Records whose `date` falls on `date`.
    pub fn find_by_date(&self, collection: Collection, date: NaiveDate) -> Vec<Value> {
        self.records(collection)
            .into_iter()
            .filter(|r| record_date(r) == Some(date))
            .collect()
    }

    /// Records dated within `start..=end`, oldest first.
    pub fn find_by_date_range(
        &self,
        collection: Collection,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<Value> {
        let mut found: Vec<(NaiveDate, Value)> = self
            .records(collection)
            .into_iter()
            .filter_map(|r| record_date(&r).map(|d| (d, r)))
            .filter(|(d, _)| *d >= start && *d <= end)
            .collect();
        found.sort_by_key(|(d, _)| *d);
        found.into_iter().map(|(_, r)| r).collect()
    }

    /// The `n` most recent records by date, then creation time.
    pub fn get_latest(&self, collection: Collection, n: usize) -> Vec<Value> {
        let mut records = self.records(collection);
        records.sort_by(|a, b| {
            let key = |r: &Value| {
                (
                    record_date(r),
                    r.get("createdAt")
                        .and_then(Value::as_str)
                        .and_then(parse_timestamp),
                )
            };
            key(b).cmp(&key(a))
        });
        records.truncate(n);
        records
    }

    /// Shallow-merge `patch` into a singleton and re-normalize it.
    pub fn patch(&self, collection: Collection, patch: &Value) -> Result<Value> {
        let patch = patch
            .as_object()
            .ok_or_else(|| Error::InvalidRecord("singleton patch must be an object".into()))?;
        if !collection.is_singleton() {
            return Err(Error::NotASingleton(collection));
        }

        let merged = {
            let _guard = self.lock_edits();
            let mut current = match self.get(collection) {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            for (key, value) in patch {
                current.insert(key.clone(), value.clone());
            }
            let merged = normalize(collection, &Value::Object(current), &self.normalize_context());
            self.put_quiet(collection, &merged)?;
            merged
        };
        self.notify(collection);
        Ok(merged)
    }

    /// Read-modify-write a record collection under the edit lock. The closure
    /// returns `None` to leave storage untouched.
    fn edit<T>(
        &self,
        collection: Collection,
        change: impl FnOnce(&mut Vec<Value>) -> Option<T>,
    ) -> Result<Option<T>> {
        let outcome = {
            let _guard = self.lock_edits();
            let mut records = self.records(collection);
            match change(&mut records) {
                Some(outcome) => {
                    self.put_quiet(collection, &Value::Array(records))?;
                    Some(outcome)
                }
                None => None,
            }
        };
        if outcome.is_some() {
            self.notify(collection);
        }
        Ok(outcome)
    }

    /// Current value of every collection, keyed by collection name.
    pub fn collections(&self) -> Map<String, Value> {
        Collection::ALL
            .into_iter()
            .map(|c| (c.name().to_string(), self.get(c)))
            .collect()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Schema version recorded in storage, if any.
    pub fn schema_version(&self) -> Option<SchemaVersion> {
        self.migration().stored_version()
    }

    /// Remove all collections, the version marker and the owner marker.
    pub fn wipe(&self) -> bool {
        let _guard = self.lock_edits();
        let mut keys: Vec<String> = Collection::ALL
            .into_iter()
            .map(|c| self.keys.collection(c))
            .collect();
        keys.push(self.keys.schema_version());
        keys.push(self.keys.owner_account_id());

        let mut ok = true;
        for key in &keys {
            ok &= self.write_raw(key, None);
        }
        tracing::info!(ok, "local data wiped");
        ok
    }

    pub fn owner(&self) -> OwnershipGuard<'_> {
        OwnershipGuard::new(self)
    }

    pub fn migration(&self) -> MigrationGate<'_> {
        MigrationGate::new(self)
    }

    /// Re-normalize everything and persist the current schema version.
    pub fn migrate(&self) -> MigrationReport {
        self.migration().run()
    }

    pub fn onboarding(&self) -> Onboarding<'_> {
        Onboarding::new(self)
    }

    /// Byte-exact copy of everything a pull may overwrite.
    pub fn snapshot(&self) -> LocalSnapshot {
        LocalSnapshot::capture(self)
    }

    pub fn export(&self) -> ExportBundle {
        snapshot::export(self)
    }

    pub fn import(&self, input: &Value) -> Result<ImportReport> {
        snapshot::import(self, input)
    }
}

fn into_object(record: Value) -> Result<Map<String, Value>> {
    match record {
        Value::Object(map) => Ok(map),
        _ => Err(Error::InvalidRecord("record must be an object".into())),
    }
}

fn ensure_records(collection: Collection) -> Result<()> {
    if collection.is_singleton() {
        Err(Error::NotARecordCollection(collection))
    } else {
        Ok(())
    }
}

fn has_identity(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(_) => true,
        _ => false,
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn record_date(record: &Value) -> Option<NaiveDate> {
    record
        .get("date")
        .and_then(Value::as_str)
        .and_then(coerce::calendar_date)
}
