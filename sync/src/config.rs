//! Configuration for the sync runtime.

use crate::remote::{HttpDocumentStore, MemoryDocumentStore, RemoteDocumentStore};
use crate::RemoteError;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stride_engine::{
    Clock, FileStorage, LocalStore, MemoryStorage, StorageError, DEFAULT_KEY_PREFIX,
};

/// Default quiet period before a debounced push.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the document service; `None` keeps documents in memory
    pub remote_url: Option<String>,
    /// Bearer token sent to the document service
    pub auth_token: Option<String>,
    /// Quiet period before a debounced push
    pub debounce: Duration,
    /// Namespace for local storage keys
    pub key_prefix: String,
    /// Directory for file-backed storage; `None` keeps data in memory
    pub data_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            auth_token: None,
            debounce: DEFAULT_DEBOUNCE,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            data_dir: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration from the environment, reading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let debounce = match non_empty("STRIDE_DEBOUNCE_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidDebounce(raw))?,
            ),
            None => DEFAULT_DEBOUNCE,
        };

        Ok(Self {
            remote_url: non_empty("STRIDE_REMOTE_URL"),
            auth_token: non_empty("STRIDE_AUTH_TOKEN"),
            debounce,
            key_prefix: non_empty("STRIDE_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            data_dir: non_empty("STRIDE_DATA_DIR").map(PathBuf::from),
        })
    }

    /// Open the local store this configuration describes.
    pub fn open_store(&self, clock: Arc<dyn Clock>) -> Result<LocalStore, ConfigError> {
        let store = match &self.data_dir {
            Some(dir) => LocalStore::new(FileStorage::open(dir)?, clock),
            None => LocalStore::new(MemoryStorage::new(), clock),
        };
        Ok(store.with_key_prefix(self.key_prefix.clone()))
    }

    /// Build the remote document store this configuration describes.
    pub fn build_remote(&self) -> Result<Arc<dyn RemoteDocumentStore>, ConfigError> {
        match &self.remote_url {
            Some(url) => Ok(Arc::new(HttpDocumentStore::new(
                url,
                self.auth_token.clone(),
            )?)),
            None => {
                tracing::info!("no remote url configured; using in-memory documents");
                Ok(Arc::new(MemoryDocumentStore::new()))
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid STRIDE_DEBOUNCE_MS value: {0}")]
    InvalidDebounce(String),

    #[error("Invalid STRIDE_REMOTE_URL: {0}")]
    Remote(#[from] RemoteError),

    #[error("Could not open data directory: {0}")]
    Storage(#[from] StorageError),
}
