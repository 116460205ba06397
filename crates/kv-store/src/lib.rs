//! String-keyed key-value tables
//!
//! The credential store is composed from several independent tables, each
//! one a `KeyValueStore`. Two backends are provided:
//!
//! - `SyncMapStore`: unbounded concurrent map, never evicts
//! - `LruStore`: bounded cache that evicts the least recently used entry
//!   once it holds more than its capacity
//!
//! Backends are chosen at construction time and used through
//! `Box<dyn KeyValueStore<V>>`, so any table can be swapped without touching
//! the code that reads it.

pub mod error;
pub mod lru_store;
pub mod sync_map;

pub use error::{Error, Result};
pub use lru_store::LruStore;
pub use sync_map::SyncMapStore;

/// A string-keyed table.
///
/// Concurrent writers to the same key race with last-write-wins semantics.
/// `get` on a missing key returns `Error::NotFound`; `delete` on a missing
/// key is a no-op.
pub trait KeyValueStore<V>: Send + Sync {
    /// Look up a value by key.
    fn get(&self, key: &str) -> Result<V>;

    /// Insert or replace a value.
    fn put(&self, key: &str, value: V) -> Result<()>;

    /// Remove a value if present.
    fn delete(&self, key: &str) -> Result<()>;

    /// Remove a value and return it, as one atomic step.
    ///
    /// Of several callers racing to take the same key, exactly one receives
    /// the value; the rest get `Error::NotFound`.
    fn take(&self, key: &str) -> Result<V>;
}
