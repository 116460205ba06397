//! Bounded LRU backend
//!
//! Holds at most `capacity` entries. Inserting a new key into a full table
//! evicts the least recently used entry; `get` counts as a use. Tables built
//! on this backend expire stale grant codes and tokens by eviction instead of
//! growing without bound.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use tracing::debug;

use crate::KeyValueStore;
use crate::error::{Error, Result};

/// In-memory table with least-recently-used eviction.
pub struct LruStore<V> {
    cache: Mutex<LruCache<String, V>>,
}

impl<V> LruStore<V> {
    /// Create a table holding at most `capacity` entries.
    ///
    /// Returns `Error::Backend` for a zero capacity.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| Error::Backend("lru capacity must be greater than 0".into()))?;
        Ok(Self {
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Number of stored entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, V>>> {
        self.cache
            .lock()
            .map_err(|_| Error::Backend("lru cache lock poisoned".into()))
    }
}

impl<V: Clone + Send + Sync> KeyValueStore<V> for LruStore<V> {
    fn get(&self, key: &str) -> Result<V> {
        let mut cache = self.lock()?;
        cache
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_owned()))
    }

    fn put(&self, key: &str, value: V) -> Result<()> {
        let mut cache = self.lock()?;
        if let Some((evicted, _)) = cache.push(key.to_owned(), value)
            && evicted != key
        {
            debug!(capacity = cache.cap().get(), "lru table full, evicted least recently used entry");
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.pop(key);
        Ok(())
    }

    fn take(&self, key: &str) -> Result<V> {
        self.lock()?
            .pop(key)
            .ok_or_else(|| Error::NotFound(key.to_owned()))
    }
}
