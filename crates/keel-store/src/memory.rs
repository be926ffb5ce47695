use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::traits::{KvStore, ScanPage};

type Hashes = HashMap<String, BTreeMap<String, String>>;

/// In-memory, HashMap-based key-value store.
///
/// Intended for tests and embedding. All hashes are held behind a single
/// `RwLock`; every mutating primitive (including `hincrby`) runs under the
/// write lock and is therefore atomic. Fields within a hash are kept in
/// lexicographic order, which is this backend's store-defined order.
pub struct InMemoryKvStore {
    hashes: RwLock<Hashes>,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            hashes: RwLock::new(HashMap::new()),
        }
    }

    /// Number of non-empty hashes currently stored.
    pub fn key_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    /// Names of all non-empty hashes, sorted.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self.read()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Remove every hash.
    pub fn clear(&self) -> StoreResult<()> {
        self.write()?.clear();
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Hashes>> {
        self.hashes
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Hashes>> {
        self.hashes
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for InMemoryKvStore {
    fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.write()?
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        Ok(self.read()?.get(key).and_then(|h| h.get(field)).cloned())
    }

    fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<u64> {
        let mut hashes = self.write()?;
        let Some(hash) = hashes.get_mut(key) else {
            return Ok(0);
        };
        let removed = fields
            .iter()
            .filter(|field| hash.remove(field.as_str()).is_some())
            .count() as u64;
        // An emptied hash disappears, as it would on a Redis server.
        if hash.is_empty() {
            hashes.remove(key);
        }
        Ok(removed)
    }

    fn hlen(&self, key: &str) -> StoreResult<u64> {
        Ok(self.read()?.get(key).map_or(0, |h| h.len() as u64))
    }

    fn hkeys(&self, key: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .read()?
            .get(key)
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn hvals(&self, key: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .read()?
            .get(key)
            .map(|h| h.values().cloned().collect())
            .unwrap_or_default())
    }

    fn hmget(&self, key: &str, fields: &[String]) -> StoreResult<Vec<Option<String>>> {
        let hashes = self.read()?;
        let hash = hashes.get(key);
        Ok(fields
            .iter()
            .map(|field| hash.and_then(|h| h.get(field)).cloned())
            .collect())
    }

    fn hscan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage> {
        let hashes = self.read()?;
        let Some(hash) = hashes.get(key) else {
            return Ok(ScanPage::default());
        };
        // The cursor is an offset into the ordered field set.
        let offset = usize::try_from(cursor).unwrap_or(usize::MAX);
        let entries: Vec<(String, String)> = hash
            .iter()
            .skip(offset)
            .take(count.max(1))
            .map(|(f, v)| (f.clone(), v.clone()))
            .collect();
        let next = offset.saturating_add(entries.len());
        let cursor = if entries.is_empty() || next >= hash.len() {
            0
        } else {
            next as u64
        };
        Ok(ScanPage { cursor, entries })
    }

    fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let mut hashes = self.write()?;
        let slot = hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert_with(|| "0".to_string());
        let current: i64 = slot.parse().map_err(|_| StoreError::InvalidInteger {
            key: key.to_string(),
            field: field.to_string(),
        })?;
        let next = current.checked_add(delta).ok_or_else(|| StoreError::Overflow {
            key: key.to_string(),
            field: field.to_string(),
        })?;
        *slot = next.to_string();
        Ok(next)
    }

    fn hexists(&self, key: &str, field: &str) -> StoreResult<bool> {
        Ok(self
            .read()?
            .get(key)
            .is_some_and(|h| h.contains_key(field)))
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.key_count().unwrap_or_default();
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // -----------------------------------------------------------------------
    // Basic hash access
    // -----------------------------------------------------------------------

    #[test]
    fn set_and_get() {
        let store = InMemoryKvStore::new();
        store.hset("h", "a", "1").unwrap();
        assert_eq!(store.hget("h", "a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.hget("h", "b").unwrap(), None);
        assert_eq!(store.hget("missing", "a").unwrap(), None);
    }

    #[test]
    fn set_overwrites() {
        let store = InMemoryKvStore::new();
        store.hset("h", "a", "1").unwrap();
        store.hset("h", "a", "2").unwrap();
        assert_eq!(store.hget("h", "a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.hlen("h").unwrap(), 1);
    }

    #[test]
    fn exists_reflects_presence() {
        let store = InMemoryKvStore::new();
        assert!(!store.hexists("h", "a").unwrap());
        store.hset("h", "a", "1").unwrap();
        assert!(store.hexists("h", "a").unwrap());
    }

    #[test]
    fn delete_counts_removed_fields() {
        let store = InMemoryKvStore::new();
        store.hset("h", "a", "1").unwrap();
        store.hset("h", "b", "2").unwrap();
        assert_eq!(store.hdel("h", &fields(&["a", "zz"])).unwrap(), 1);
        assert_eq!(store.hlen("h").unwrap(), 1);
        assert_eq!(store.hdel("missing", &fields(&["a"])).unwrap(), 0);
    }

    #[test]
    fn emptied_hash_is_removed() {
        let store = InMemoryKvStore::new();
        store.hset("h", "a", "1").unwrap();
        store.hdel("h", &fields(&["a"])).unwrap();
        assert_eq!(store.key_count().unwrap(), 0);
    }

    #[test]
    fn keys_vals_and_mget() {
        let store = InMemoryKvStore::new();
        store.hset("h", "b", "2").unwrap();
        store.hset("h", "a", "1").unwrap();
        assert_eq!(store.hkeys("h").unwrap(), fields(&["a", "b"]));
        assert_eq!(store.hvals("h").unwrap(), fields(&["1", "2"]));
        assert_eq!(
            store.hmget("h", &fields(&["b", "x", "a"])).unwrap(),
            vec![Some("2".to_string()), None, Some("1".to_string())]
        );
        assert!(store.hkeys("missing").unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Counters
    // -----------------------------------------------------------------------

    #[test]
    fn incrby_starts_at_zero() {
        let store = InMemoryKvStore::new();
        assert_eq!(store.hincrby("c", "ns", 1).unwrap(), 1);
        assert_eq!(store.hincrby("c", "ns", 1).unwrap(), 2);
        assert_eq!(store.hincrby("c", "ns", 0).unwrap(), 2);
        assert_eq!(store.hget("c", "ns").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn incrby_rejects_non_integer() {
        let store = InMemoryKvStore::new();
        store.hset("c", "ns", "abc").unwrap();
        let err = store.hincrby("c", "ns", 1).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInteger { .. }));
    }

    #[test]
    fn incrby_rejects_overflow() {
        let store = InMemoryKvStore::new();
        store.hset("c", "ns", &i64::MAX.to_string()).unwrap();
        let err = store.hincrby("c", "ns", 1).unwrap_err();
        assert!(matches!(err, StoreError::Overflow { .. }));
    }

    #[test]
    fn concurrent_incrby_yields_distinct_values() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryKvStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..50)
                        .map(|_| store.hincrby("c", "ns", 1).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread should not panic"))
            .collect();
        seen.sort();
        assert_eq!(seen, (1..=400).collect::<Vec<_>>());
    }

    // -----------------------------------------------------------------------
    // Scanning
    // -----------------------------------------------------------------------

    #[test]
    fn scan_pages_through_hash() {
        let store = InMemoryKvStore::new();
        for f in ["a", "b", "c", "d", "e"] {
            store.hset("h", f, f).unwrap();
        }
        let first = store.hscan("h", 0, 2).unwrap();
        assert_eq!(first.entries.len(), 2);
        assert_eq!(first.cursor, 2);
        let second = store.hscan("h", first.cursor, 2).unwrap();
        assert_eq!(second.cursor, 4);
        let last = store.hscan("h", second.cursor, 2).unwrap();
        assert_eq!(last.entries, vec![("e".to_string(), "e".to_string())]);
        assert_eq!(last.cursor, 0);
    }

    #[test]
    fn scan_of_missing_hash_is_done() {
        let store = InMemoryKvStore::new();
        assert_eq!(store.hscan("missing", 0, 10).unwrap(), ScanPage::default());
    }

    #[test]
    fn scan_past_end_is_done() {
        let store = InMemoryKvStore::new();
        store.hset("h", "a", "1").unwrap();
        let page = store.hscan("h", 50, 10).unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.cursor, 0);
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn clear_removes_all() {
        let store = InMemoryKvStore::default();
        store.hset("a", "f", "v").unwrap();
        store.hset("b", "f", "v").unwrap();
        assert_eq!(store.keys().unwrap(), fields(&["a", "b"]));
        store.clear().unwrap();
        assert_eq!(store.key_count().unwrap(), 0);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryKvStore::new();
        store.hset("a", "f", "v").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryKvStore"));
        assert!(debug.contains("key_count"));
    }
}
