// src/cache.rs
use crate::errors::CacheError;
use crate::memory::{CachedBytes, Disposal};
use crate::random::{EntropySource, os_entropy};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Named registry of sensitive buffers.
///
/// Handles returned by the cache share the holder with it. Removing an entry
/// clears the holder for every handle; handles that outlive the cache keep
/// the holder alive until the last one is dropped.
pub struct ByteCache {
    entries: DashMap<String, Arc<CachedBytes>>,
    entropy: Arc<dyn EntropySource>,
}

impl ByteCache {
    pub fn new() -> Self {
        Self::with_entropy(os_entropy())
    }

    pub fn with_entropy(entropy: Arc<dyn EntropySource>) -> Self {
        Self {
            entries: DashMap::new(),
            entropy,
        }
    }

    /// Cache `data` under `key`.
    ///
    /// A live entry is only replaced when `force` is set, and the replaced
    /// holder is cleared. On refusal `data` is scrubbed, not handed back.
    ///
    /// Replacing waits for views of the old holder, so a thread holding an
    /// [`Exposed`](crate::Exposed) of it must not force an insert over it.
    pub fn insert(
        &self,
        key: &str,
        data: Vec<u8>,
        force: bool,
    ) -> Result<Arc<CachedBytes>, CacheError> {
        let holder = Arc::new(CachedBytes::with_entropy(data, Arc::clone(&self.entropy)));

        let replaced = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if !force && !entry.get().is_cleared() {
                    return Err(CacheError::Exists(format!(
                        "{} is already cached. Use force to replace it",
                        key
                    )));
                }
                Some(entry.insert(Arc::clone(&holder)))
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&holder));
                None
            }
        };

        // Cleared outside the shard lock
        if let Some(previous) = replaced {
            previous.dispose();
            log::debug!(target: "cached_bytes", "Replaced cache entry {}", key);
        } else {
            log::debug!(target: "cached_bytes", "Cached entry {}", key);
        }

        Ok(holder)
    }

    pub fn get(&self, key: &str) -> Result<Arc<CachedBytes>, CacheError> {
        self.entries
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    /// Remove `key` and clear its holder.
    ///
    /// Waits for outstanding views of the holder, so it must not be called
    /// from a thread that holds one.
    pub fn remove(&self, key: &str) -> Result<Disposal, CacheError> {
        let (_, holder) = self
            .entries
            .remove(key)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        log::debug!(target: "cached_bytes", "Removed cache entry {}", key);
        Ok(holder.dispose())
    }

    /// Clear and remove every entry, returning how many were removed.
    /// Same waiting rule as [`remove`](Self::remove).
    pub fn purge(&self) -> usize {
        let mut removed = 0;
        for key in self.keys() {
            if self.remove(&key).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ByteCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = ByteCache::new();
        cache.insert("db-password", b"s3cr3t".to_vec(), false).unwrap();

        let holder = cache.get("db-password").unwrap();
        assert_eq!(&*holder.read().unwrap(), b"s3cr3t");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_no_overwrite() {
        let cache = ByteCache::new();
        cache.insert("token", b"first".to_vec(), false).unwrap();

        let result = cache.insert("token", b"second".to_vec(), false);
        assert!(matches!(result.unwrap_err(), CacheError::Exists(_)));
        assert_eq!(&*cache.get("token").unwrap().read().unwrap(), b"first");
    }

    #[test]
    fn test_insert_force_clears_previous() {
        let cache = ByteCache::new();
        let old = cache.insert("token", b"first".to_vec(), false).unwrap();

        cache.insert("token", b"second".to_vec(), true).unwrap();

        assert!(old.is_cleared());
        assert!(matches!(old.read(), Err(CacheError::UseAfterClear)));
        assert_eq!(&*cache.get("token").unwrap().read().unwrap(), b"second");
    }

    #[test]
    fn test_refused_insert_while_reading_entry() {
        let cache = ByteCache::new();
        let handle = cache.insert("token", b"first".to_vec(), false).unwrap();
        let view = handle.read().unwrap();

        let result = cache.insert("token", b"second".to_vec(), false);
        assert!(matches!(result.unwrap_err(), CacheError::Exists(_)));
        assert_eq!(&*view, b"first");
    }

    #[test]
    fn test_insert_replaces_cleared_entry() {
        let cache = ByteCache::new();
        let old = cache.insert("token", b"first".to_vec(), false).unwrap();
        old.dispose();

        assert!(cache.insert("token", b"second".to_vec(), false).is_ok());
    }

    #[test]
    fn test_remove_clears_outstanding_handles() {
        let cache = ByteCache::new();
        let handle = cache.insert("key", vec![1, 2, 3, 4], false).unwrap();

        assert_eq!(cache.remove("key").unwrap(), Disposal::Scrubbed { len: 4 });
        assert!(matches!(handle.read(), Err(CacheError::UseAfterClear)));
        assert!(matches!(cache.get("key"), Err(CacheError::NotFound(_))));
        assert!(matches!(cache.remove("key"), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_purge() {
        let cache = ByteCache::default();
        let a = cache.insert("a", vec![1], false).unwrap();
        let b = cache.insert("b", vec![2], false).unwrap();
        assert_eq!(cache.keys(), vec!["a".to_string(), "b".to_string()]);

        assert_eq!(cache.purge(), 2);
        assert!(cache.is_empty());
        assert!(a.is_cleared());
        assert!(b.is_cleared());
    }
}
