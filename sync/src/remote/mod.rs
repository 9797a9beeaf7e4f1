//! Remote document store.
//!
//! Each account owns one JSON document holding the five collections plus a
//! server-assigned `updatedAt`. The only operations are a keyed read and a
//! top-level merge write; there are no transactions.

mod http;
mod memory;

pub use http::HttpDocumentStore;
pub use memory::MemoryDocumentStore;

use crate::RemoteError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A remote account document.
pub type Document = Map<String, Value>;

/// Field the document service stamps on every write.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Fetch the document for `account_id`, `None` if it was never written.
    async fn get(&self, account_id: &str) -> Result<Option<Document>, RemoteError>;

    /// Merge `fields` into the document at top level, creating it if needed.
    /// Keys present in `fields` are replaced outright.
    async fn merge_set(&self, account_id: &str, fields: Document) -> Result<(), RemoteError>;
}
