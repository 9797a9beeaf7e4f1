//! Sync status and session events.

use serde::{Deserialize, Serialize};
use std::fmt;
use stride_engine::{SchemaVersion, StoredKey};

/// What the sync indicator shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// No account; data lives on this device only.
    #[default]
    LocalOnly,
    /// Pulling the remote document.
    Syncing,
    /// Pushing local changes.
    Saving,
    Synced,
    SyncFailed,
}

impl SyncStatus {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            SyncStatus::LocalOnly => "Local only",
            SyncStatus::Syncing => "Syncing…",
            SyncStatus::Saving => "Saving…",
            SyncStatus::Synced => "Synced",
            SyncStatus::SyncFailed => "Sync failed",
        }
    }

    /// True while a pull or push is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, SyncStatus::Syncing | SyncStatus::Saving)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Notifications for whatever renders the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A pull finished, successfully or not. Local data is usable either way.
    DataReady { account_id: String, ok: bool },
    /// Another tab or process changed a stored key.
    ExternalChange { key: StoredKey },
    /// The migration gate ran.
    Migrated {
        from_version: Option<SchemaVersion>,
        to_version: SchemaVersion,
    },
    /// Local data was wiped after sign-out.
    SignedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(SyncStatus::default().to_string(), "Local only");
        assert_eq!(SyncStatus::Syncing.to_string(), "Syncing…");
        assert_eq!(SyncStatus::SyncFailed.to_string(), "Sync failed");
        assert!(SyncStatus::Saving.is_busy());
        assert!(!SyncStatus::Synced.is_busy());
    }

    #[test]
    fn serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&SyncStatus::SyncFailed).unwrap(),
            "\"sync-failed\""
        );
        assert_eq!(
            serde_json::to_string(&SyncStatus::LocalOnly).unwrap(),
            "\"local-only\""
        );
    }
}
