//! In-memory record store for testing.

use crate::backend::RecordStore;
use crate::error::StoreResult;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory record store.
///
/// This store holds all blobs in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sessions that don't need persistence
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use yomilog_store::{RecordStore, InMemoryStore};
///
/// let mut store = InMemoryStore::new();
/// store.save("accounts", b"[]").unwrap();
/// assert_eq!(store.load("accounts").unwrap(), Some(b"[]".to_vec()));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory store with pre-existing blobs.
    ///
    /// Useful for testing reload scenarios.
    #[must_use]
    pub fn with_data(blobs: HashMap<String, Vec<u8>>) -> Self {
        Self {
            blobs: RwLock::new(blobs),
        }
    }

    /// Returns a copy of all blobs in the store.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn data(&self) -> HashMap<String, Vec<u8>> {
        self.blobs.read().clone()
    }

    /// Returns the number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns true if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Clears all blobs from the store.
    pub fn clear(&mut self) {
        self.blobs.write().clear();
    }
}

impl RecordStore for InMemoryStore {
    fn load(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &[u8]) -> StoreResult<()> {
        self.blobs.write().insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.blobs.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.load("books").unwrap(), None);
    }

    #[test]
    fn save_then_load_roundtrips() {
        let mut store = InMemoryStore::new();
        store.save("books", b"[1,2,3]").unwrap();
        assert_eq!(store.load("books").unwrap(), Some(b"[1,2,3]".to_vec()));
    }

    #[test]
    fn save_replaces_previous_blob() {
        let mut store = InMemoryStore::new();
        store.save("books", b"old").unwrap();
        store.save("books", b"new").unwrap();
        assert_eq!(store.load("books").unwrap(), Some(b"new".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_deletes_blob() {
        let mut store = InMemoryStore::new();
        store.save("session", b"{}").unwrap();
        store.remove("session").unwrap();
        assert_eq!(store.load("session").unwrap(), None);
    }

    #[test]
    fn remove_absent_key_is_noop() {
        let mut store = InMemoryStore::new();
        assert!(store.remove("missing").is_ok());
    }

    #[test]
    fn keys_are_independent() {
        let mut store = InMemoryStore::new();
        store.save("books", b"b").unwrap();
        store.save("goals", b"g").unwrap();
        store.remove("books").unwrap();
        assert_eq!(store.load("books").unwrap(), None);
        assert_eq!(store.load("goals").unwrap(), Some(b"g".to_vec()));
    }

    #[test]
    fn with_data_preloads() {
        let mut blobs = HashMap::new();
        blobs.insert("accounts".to_string(), b"preloaded".to_vec());
        let store = InMemoryStore::with_data(blobs);
        assert_eq!(store.load("accounts").unwrap(), Some(b"preloaded".to_vec()));
    }

    #[test]
    fn clear_removes_everything() {
        let mut store = InMemoryStore::new();
        store.save("books", b"b").unwrap();
        store.clear();
        assert!(store.is_empty());
    }

    proptest! {
        #[test]
        fn arbitrary_blobs_roundtrip(entries in proptest::collection::hash_map("[a-z-]{1,16}", proptest::collection::vec(any::<u8>(), 0..256), 0..8)) {
            let mut store = InMemoryStore::new();
            for (key, blob) in &entries {
                store.save(key, blob).unwrap();
            }
            for (key, blob) in &entries {
                prop_assert_eq!(store.load(key).unwrap(), Some(blob.clone()));
            }
            prop_assert_eq!(store.len(), entries.len());
        }
    }
}
