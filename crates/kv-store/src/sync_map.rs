//! Unbounded concurrent map backend

use dashmap::DashMap;

use crate::KeyValueStore;
use crate::error::{Error, Result};

/// In-memory table backed by a sharded concurrent map.
///
/// Entries live until deleted; nothing is ever evicted.
pub struct SyncMapStore<V> {
    map: DashMap<String, V>,
}

impl<V> SyncMapStore<V> {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<V> Default for SyncMapStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> KeyValueStore<V> for SyncMapStore<V> {
    fn get(&self, key: &str) -> Result<V> {
        self.map
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::NotFound(key.to_owned()))
    }

    fn put(&self, key: &str, value: V) -> Result<()> {
        self.map.insert(key.to_owned(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    fn take(&self, key: &str) -> Result<V> {
        self.map
            .remove(key)
            .map(|(_, value)| value)
            .ok_or_else(|| Error::NotFound(key.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn get_missing_key_is_not_found() {
        let store: SyncMapStore<String> = SyncMapStore::new();
        let err = store.get("absent").unwrap_err();
        assert!(matches!(err, Error::NotFound(ref k) if k == "absent"), "got: {err:?}");
    }

    #[test]
    fn put_get_delete() {
        let store = SyncMapStore::new();
        store.put("code-1", "user-42".to_string()).unwrap();
        assert_eq!(store.get("code-1").unwrap(), "user-42");

        store.put("code-1", "user-43".to_string()).unwrap();
        assert_eq!(store.get("code-1").unwrap(), "user-43", "last write wins");

        store.delete("code-1").unwrap();
        assert!(store.get("code-1").is_err());
        // deleting again is a no-op
        store.delete("code-1").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn take_removes_value() {
        let store = SyncMapStore::new();
        store.put("k", 7u32).unwrap();
        assert_eq!(store.take("k").unwrap(), 7);
        assert!(matches!(store.take("k"), Err(Error::NotFound(_))));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn concurrent_take_has_single_winner() {
        let store = Arc::new(SyncMapStore::new());
        store.put("code", "session".to_string()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.take("code").is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1, "exactly one taker must receive the value");
    }

    #[test]
    fn concurrent_puts_to_distinct_keys() {
        let store = Arc::new(SyncMapStore::new());
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.put(&format!("key-{i}"), i).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 10);
        assert_eq!(store.get("key-3").unwrap(), 3);
    }
}
