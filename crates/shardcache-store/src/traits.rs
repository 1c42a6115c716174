use crate::error::StoreResult;

/// Key-value cache operations.
///
/// Implementations must satisfy these invariants:
/// - `retrieve` after `add(key, value)` returns exactly `value` until the key
///   is removed or overwritten.
/// - Adding an existing key overwrites its value without duplicating its
///   bookkeeping.
/// - A miss is `Ok(None)` / `Ok(false)`, never an error.
/// - Removing a key that is not stored is an error.
pub trait CacheStore: Send + Sync {
    /// Returns `true` if a value is stored for `key`.
    fn has_key(&self, key: &str) -> StoreResult<bool>;

    /// Store `value` under `key`, replacing any previous value.
    fn add(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored.
    fn retrieve(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Remove `key` and its value.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Remove several keys.
    ///
    /// Default implementation calls `remove()` for each key and stops at the
    /// first error. Backends may override to batch bookkeeping.
    fn remove_many(&self, keys: &[&str]) -> StoreResult<()> {
        keys.iter().try_for_each(|key| self.remove(key))
    }

    /// Every stored key, sorted.
    fn list_keys(&self) -> StoreResult<Vec<String>>;
}
