//! SyncEngine - moves whole collections between the local store and the
//! account's remote document.
//!
//! Pull is an authoritative replace: every collection present remotely
//! overwrites the local one. Push is a snapshot replace: all five collections
//! are written at once. Either way the last writer wins.

use crate::remote::{Document, RemoteDocumentStore};
use crate::status::SyncStatus;
use crate::{Result, SyncError};
use std::sync::Arc;
use stride_engine::{Collection, LocalStore, MigrationReport};
use tokio::sync::{watch, Mutex};

/// How a successful pull ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// The remote document existed; these collections were replaced.
    Replaced {
        collections: Vec<Collection>,
        migration: MigrationReport,
    },
    /// No remote document yet; local data was kept and pushed up.
    NoRemoteDocument { seeded: bool },
}

pub struct SyncEngine {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteDocumentStore>,
    status: watch::Sender<SyncStatus>,
    /// Held for the whole of every pull and push. A push that arrives while
    /// a pull is replacing local data waits and then sends the pulled state.
    transfer_lock: Mutex<()>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(store: Arc<LocalStore>, remote: Arc<dyn RemoteDocumentStore>) -> Self {
        Self {
            store,
            remote,
            status: watch::Sender::new(SyncStatus::LocalOnly),
            transfer_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub(crate) fn set_status(&self, status: SyncStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            tracing::debug!(from = %previous, to = %status, "sync status changed");
        }
    }

    /// Replace local data with the account's remote document.
    ///
    /// A different previous owner means the local cache is wiped before the
    /// remote is contacted. On failure the pre-pull contents are restored
    /// exactly; the owner marker is set to `account_id` in both cases.
    pub async fn pull(&self, account_id: &str) -> Result<PullOutcome> {
        let _guard = self.transfer_lock.lock().await;
        self.set_status(SyncStatus::Syncing);

        let snapshot = self.store.snapshot();
        if self.store.owner().is_switch(account_id) {
            tracing::info!(account_id = %account_id, "account switch detected; wiping local data");
            self.store.wipe();
        }

        let fetched = self.fetch_and_apply(account_id).await;
        if !self.store.owner().set(account_id) {
            tracing::warn!(account_id = %account_id, "failed to record owner marker");
        }

        match fetched {
            Ok(Some(collections)) => {
                let migration = self.store.migrate();
                tracing::info!(
                    account_id = %account_id,
                    collections = collections.len(),
                    "pulled remote document"
                );
                self.set_status(SyncStatus::Synced);
                Ok(PullOutcome::Replaced {
                    collections,
                    migration,
                })
            }
            Ok(None) => {
                tracing::info!(account_id = %account_id, "no remote document; seeding from device");
                self.store.migrate();
                let seeded = match self.send_snapshot(account_id).await {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(account_id = %account_id, error = %err, "initial push failed");
                        false
                    }
                };
                Ok(PullOutcome::NoRemoteDocument { seeded })
            }
            Err(err) => {
                tracing::warn!(account_id = %account_id, error = %err, "pull failed; restoring local snapshot");
                if let Err(restore_err) = snapshot.restore(&self.store) {
                    tracing::warn!(error = %restore_err, "snapshot restore incomplete");
                }
                self.set_status(SyncStatus::SyncFailed);
                Err(err)
            }
        }
    }

    async fn fetch_and_apply(&self, account_id: &str) -> Result<Option<Vec<Collection>>> {
        let Some(document) = self.remote.get(account_id).await? else {
            return Ok(None);
        };

        let mut replaced = Vec::new();
        for collection in Collection::ALL {
            if let Some(value) = document.get(collection.name()) {
                self.store.replace_quiet(collection, value)?;
                replaced.push(collection);
            }
        }
        Ok(Some(replaced))
    }

    /// Write all five collections to the account's remote document.
    ///
    /// Waits for any pull in progress, so a push never sends the wiped or
    /// half-replaced state a pull passes through.
    pub async fn push(&self, account_id: &str) -> Result<()> {
        let _guard = self.transfer_lock.lock().await;
        self.send_snapshot(account_id).await
    }

    async fn send_snapshot(&self, account_id: &str) -> Result<()> {
        self.set_status(SyncStatus::Saving);
        let document: Document = self.store.collections();

        match self.remote.merge_set(account_id, document).await {
            Ok(()) => {
                tracing::debug!(account_id = %account_id, "pushed local snapshot");
                self.set_status(SyncStatus::Synced);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(account_id = %account_id, error = %err, "push failed");
                self.set_status(SyncStatus::SyncFailed);
                Err(SyncError::from(err))
            }
        }
    }
}
