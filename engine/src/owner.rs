//! Ownership guard.
//!
//! Remembers which account last owned the on-device cache, so a different
//! account signing in on the same device never sees the previous one's data.

use crate::store::LocalStore;
use serde_json::Value;

pub struct OwnershipGuard<'a> {
    store: &'a LocalStore,
}

impl<'a> OwnershipGuard<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    /// The account that last owned the local cache.
    pub fn current(&self) -> Option<String> {
        match self.store.read_json(&self.store.keys().owner_account_id())? {
            Value::String(id) if !id.is_empty() => Some(id),
            _ => None,
        }
    }

    pub fn set(&self, account_id: &str) -> bool {
        let text = Value::String(account_id.to_string()).to_string();
        self.store
            .write_raw(&self.store.keys().owner_account_id(), Some(&text))
    }

    pub fn clear(&self) -> bool {
        self.store
            .write_raw(&self.store.keys().owner_account_id(), None)
    }

    /// Signing in as `account_id` requires wiping the cache first.
    pub fn is_switch(&self, account_id: &str) -> bool {
        self.current().is_some_and(|owner| owner != account_id)
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::SystemClock;
    use crate::storage::{KeyValueStorage, MemoryStorage};
    use crate::store::LocalStore;
    use std::sync::Arc;

    #[test]
    fn owner_marker_lifecycle() {
        let storage = Arc::new(MemoryStorage::new());
        let store = LocalStore::new(storage.clone(), Arc::new(SystemClock));
        let owner = store.owner();

        assert_eq!(owner.current(), None);
        assert!(!owner.is_switch("a"));

        assert!(owner.set("a"));
        assert_eq!(storage.get("stride.ownerAccountId").unwrap().as_deref(), Some("\"a\""));
        assert!(!owner.is_switch("a"));
        assert!(owner.is_switch("b"));

        assert!(owner.clear());
        assert_eq!(owner.current(), None);
    }
}
