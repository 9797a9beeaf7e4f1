//! SyncSession - wires the local store, sync engine and write scheduler
//! together and reacts to auth and cross-tab storage signals.

use crate::config::{ConfigError, SyncConfig};
use crate::engine::{PullOutcome, SyncEngine};
use crate::remote::RemoteDocumentStore;
use crate::scheduler::WriteScheduler;
use crate::status::{SessionEvent, SyncStatus};
use crate::{Result, SyncError};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use stride_engine::{Clock, Collection, LocalStore, MigrationReport, StoreListener, StoredKey};
use tokio::sync::{broadcast, watch};

const EVENT_CAPACITY: usize = 64;

/// Authentication signal from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn { account_id: String },
    SignedOut,
}

/// A stored key was changed by another tab or process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    /// Tab id of the writer, when known.
    pub origin: Option<String>,
}

struct SessionInner {
    store: Arc<LocalStore>,
    engine: SyncEngine,
    scheduler: WriteScheduler,
    account: RwLock<Option<String>>,
    tab_id: String,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionInner {
    fn account(&self) -> Option<String> {
        self.account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_account(&self, account_id: Option<String>) {
        *self.account.write().unwrap_or_else(PoisonError::into_inner) = account_id;
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn schedule_push(self: &Arc<Self>, collection: Collection) {
        let Some(account_id) = self.account() else {
            tracing::debug!(collection = %collection, "local write while signed out; not syncing");
            return;
        };

        let session = Arc::downgrade(self);
        self.scheduler.schedule(async move {
            let Some(session) = session.upgrade() else {
                return;
            };
            if session.account().as_deref() != Some(account_id.as_str()) {
                tracing::debug!(account_id = %account_id, "account changed before debounced push fired");
                return;
            }
            // Failures are logged and surfaced through the status channel
            let _ = session.engine.push(&account_id).await;
        });
    }
}

/// Pushes after local writes while an account is signed in.
struct PushOnWrite {
    session: Weak<SessionInner>,
}

impl StoreListener for PushOnWrite {
    fn on_write(&self, collection: Collection) {
        if let Some(session) = self.session.upgrade() {
            session.schedule_push(collection);
        }
    }
}

/// Handle to a running sync session. Cheap to clone.
#[derive(Clone)]
pub struct SyncSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("tab_id", &self.inner.tab_id)
            .field("account", &self.inner.account())
            .field("status", &self.current_status())
            .finish()
    }
}

impl SyncSession {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteDocumentStore>,
        debounce: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Arc::new(SessionInner {
            engine: SyncEngine::new(store.clone(), remote),
            store,
            scheduler: WriteScheduler::new(debounce),
            account: RwLock::new(None),
            tab_id: uuid::Uuid::new_v4().to_string(),
            events,
        });
        inner.store.subscribe(Arc::new(PushOnWrite {
            session: Arc::downgrade(&inner),
        }));
        Self { inner }
    }

    /// Build a session from environment-style configuration.
    pub fn from_config(config: &SyncConfig, clock: Arc<dyn Clock>) -> std::result::Result<Self, ConfigError> {
        let store = Arc::new(config.open_store(clock)?);
        let remote = config.build_remote()?;
        Ok(Self::new(store, remote, config.debounce))
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.inner.store
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.inner.engine
    }

    /// Identifier this session stamps on its own storage changes.
    pub fn tab_id(&self) -> &str {
        &self.inner.tab_id
    }

    pub fn account_id(&self) -> Option<String> {
        self.inner.account()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.engine.subscribe_status()
    }

    pub fn current_status(&self) -> SyncStatus {
        self.inner.engine.status()
    }

    /// Process-start migration.
    pub fn start(&self) -> MigrationReport {
        let report = self.inner.store.migrate();
        self.inner.emit(SessionEvent::Migrated {
            from_version: report.from_version,
            to_version: report.to_version,
        });
        report
    }

    pub async fn handle_auth_change(&self, auth: AuthState) -> Result<()> {
        match auth {
            AuthState::SignedIn { account_id } => self.sign_in(&account_id).await.map(|_| ()),
            AuthState::SignedOut => {
                self.end_session();
                Ok(())
            }
        }
    }

    /// Adopt `account_id` and pull its document.
    pub async fn sign_in(&self, account_id: &str) -> Result<PullOutcome> {
        tracing::info!(account_id = %account_id, "signed in");
        self.inner.set_account(Some(account_id.to_string()));

        let result = self.inner.engine.pull(account_id).await;
        self.inner.emit(SessionEvent::DataReady {
            account_id: account_id.to_string(),
            ok: result.is_ok(),
        });
        result
    }

    /// User-initiated sign-out: flush the last burst, then wipe.
    pub async fn sign_out(&self) {
        if self.inner.account().is_some() {
            if let Err(err) = self.force_sync().await {
                tracing::warn!(error = %err, "final push before sign-out failed");
            }
        }
        self.end_session();
    }

    /// Explicit account switch: flush, wipe, then sign in as `account_id`.
    pub async fn switch_account(&self, account_id: &str) -> Result<PullOutcome> {
        if self.inner.account().is_some() {
            if let Err(err) = self.force_sync().await {
                tracing::warn!(error = %err, "final push before account switch failed");
            }
        }
        self.inner.scheduler.cancel();
        self.inner.store.wipe();
        self.sign_in(account_id).await
    }

    /// Cancel the pending push and push right now.
    pub async fn force_sync(&self) -> Result<()> {
        let account_id = self.inner.account().ok_or(SyncError::SignedOut)?;
        self.inner.scheduler.cancel();
        self.inner.engine.push(&account_id).await
    }

    /// React to a storage change made elsewhere. Returns the classified key
    /// when the change was acted on.
    pub fn handle_storage_change(&self, change: &StorageChange) -> Option<StoredKey> {
        if change.origin.as_deref() == Some(self.inner.tab_id.as_str()) {
            return None;
        }
        let key = self.inner.store.keys().classify(&change.key)?;

        if matches!(
            key,
            StoredKey::SchemaVersion | StoredKey::Collection(Collection::Settings)
        ) {
            tracing::debug!(key = %change.key, "external settings change; re-running migration");
            self.start();
        }
        self.inner.emit(SessionEvent::ExternalChange { key });
        Some(key)
    }

    fn end_session(&self) {
        let had_pending = self.inner.scheduler.cancel();
        let previous = self.inner.account();
        self.inner.set_account(None);
        self.inner.store.wipe();
        self.inner.engine.set_status(SyncStatus::LocalOnly);
        tracing::info!(account_id = ?previous, dropped_pending_push = had_pending, "signed out");
        self.inner.emit(SessionEvent::SignedOut);
    }
}
