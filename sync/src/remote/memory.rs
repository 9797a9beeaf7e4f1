use super::{Document, RemoteDocumentStore, UPDATED_AT_FIELD};
use crate::RemoteError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use stride_engine::{Clock, SystemClock};

type GetHook = Box<dyn Fn(&str) + Send + Sync>;

/// In-process document store with fault injection.
///
/// Used by tests and offline sessions. Failures can be switched on per
/// operation, and a hook observes every read before it is served.
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, Document>>,
    clock: Arc<dyn Clock>,
    fail_gets: AtomicBool,
    fail_writes: AtomicBool,
    gets: AtomicUsize,
    writes: AtomicUsize,
    get_hook: Mutex<Option<GetHook>>,
}

impl std::fmt::Debug for MemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocumentStore")
            .field("documents", &self.lock().len())
            .field("gets", &self.get_count())
            .field("writes", &self.write_count())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Stamp `updatedAt` from `clock` instead of system time.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            clock,
            fail_gets: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            gets: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            get_hook: Mutex::new(None),
        }
    }

    /// Seed a document directly, bypassing counters and failure switches.
    pub fn insert(&self, account_id: &str, document: Document) {
        self.lock().insert(account_id.to_string(), document);
    }

    pub fn document(&self, account_id: &str) -> Option<Document> {
        self.lock().get(account_id).cloned()
    }

    pub fn remove(&self, account_id: &str) -> Option<Document> {
        self.lock().remove(account_id)
    }

    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `get` calls served or failed.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `merge_set` calls served or failed.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Run `hook` at the start of every `get`, before any failure is injected.
    pub fn on_get(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.get_hook.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(hook));
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Document>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteDocumentStore for MemoryDocumentStore {
    async fn get(&self, account_id: &str) -> Result<Option<Document>, RemoteError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self
            .get_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            hook(account_id);
        }
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("injected read failure".into()));
        }
        Ok(self.document(account_id))
    }

    async fn merge_set(&self, account_id: &str, fields: Document) -> Result<(), RemoteError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("injected write failure".into()));
        }
        let mut documents = self.lock();
        let document = documents.entry(account_id.to_string()).or_default();
        document.extend(fields);
        document.insert(
            UPDATED_AT_FIELD.to_string(),
            Value::String(self.clock.now_iso()),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stride_engine::ManualClock;

    fn fields(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn merge_replaces_top_level_keys_only() {
        let clock = Arc::new(ManualClock::at("2026-02-01T14:00:00Z").unwrap());
        let remote = MemoryDocumentStore::with_clock(clock);

        remote
            .merge_set("a", fields(json!({"workouts": [1, 2], "goals": {"x": 1}})))
            .await
            .unwrap();
        remote
            .merge_set("a", fields(json!({"workouts": [3]})))
            .await
            .unwrap();

        let doc = remote.get("a").await.unwrap().unwrap();
        assert_eq!(doc["workouts"], json!([3]));
        assert_eq!(doc["goals"], json!({"x": 1}));
        assert_eq!(doc["updatedAt"], json!("2026-02-01T14:00:00.000Z"));
        assert_eq!(remote.write_count(), 2);
    }

    #[tokio::test]
    async fn missing_document_is_none() {
        let remote = MemoryDocumentStore::new();
        assert_eq!(remote.get("nobody").await.unwrap(), None);
        assert_eq!(remote.get_count(), 1);
    }

    #[tokio::test]
    async fn injected_failures() {
        let remote = MemoryDocumentStore::new();
        remote.set_fail_gets(true);
        remote.set_fail_writes(true);

        assert!(matches!(
            remote.get("a").await,
            Err(RemoteError::Unavailable(_))
        ));
        assert!(remote.merge_set("a", Document::new()).await.is_err());
        assert!(remote.document("a").is_none());
    }

    #[tokio::test]
    async fn get_hook_sees_account() {
        let remote = MemoryDocumentStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        remote.on_get(move |account| sink.lock().unwrap().push(account.to_string()));

        remote.get("acct-9").await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["acct-9".to_string()]);
    }
}
