use std::collections::VecDeque;

use crate::error::StoreResult;
use crate::traits::KvStore;

/// Lazy, pull-based iterator over every `(field, value)` pair of one hash.
///
/// Each refill issues a single `hscan` round trip for at most `page_size`
/// entries, so memory stays bounded by the page size regardless of how large
/// the hash is. Dropping the iterator cancels the scan. A transport error is
/// yielded once and ends the iteration.
pub struct HashScan<'a> {
    store: &'a dyn KvStore,
    key: String,
    page_size: usize,
    cursor: u64,
    buffer: VecDeque<(String, String)>,
    finished: bool,
}

impl<'a> HashScan<'a> {
    /// Start a scan of hash `key`. Nothing is fetched until the first `next()`.
    pub fn new(store: &'a dyn KvStore, key: impl Into<String>, page_size: usize) -> Self {
        Self {
            store,
            key: key.into(),
            page_size: page_size.max(1),
            cursor: 0,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    /// The hash being scanned.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Iterator for HashScan<'_> {
    type Item = StoreResult<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.finished {
                return None;
            }
            match self.store.hscan(&self.key, self.cursor, self.page_size) {
                Ok(page) => {
                    self.cursor = page.cursor;
                    self.finished = page.cursor == 0;
                    self.buffer.extend(page.entries);
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl std::fmt::Debug for HashScan<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashScan")
            .field("key", &self.key)
            .field("cursor", &self.cursor)
            .field("buffered", &self.buffer.len())
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::InMemoryKvStore;
    use crate::traits::ScanPage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn filled(n: usize) -> InMemoryKvStore {
        let store = InMemoryKvStore::new();
        for i in 0..n {
            store.hset("h", &i.to_string(), &format!("v{i}")).unwrap();
        }
        store
    }

    #[test]
    fn visits_every_entry_once() {
        let store = filled(25);
        let mut fields: Vec<u32> = HashScan::new(&store, "h", 4)
            .map(|r| r.unwrap().0.parse().unwrap())
            .collect();
        fields.sort();
        assert_eq!(fields, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn empty_hash_yields_nothing() {
        let store = InMemoryKvStore::new();
        assert_eq!(HashScan::new(&store, "missing", 10).count(), 0);
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let store = filled(3);
        assert_eq!(HashScan::new(&store, "h", 0).count(), 3);
    }

    #[test]
    fn scan_is_restartable() {
        let store = filled(5);
        let first: Vec<_> = HashScan::new(&store, "h", 2).map(|r| r.unwrap()).collect();
        let second: Vec<_> = HashScan::new(&store, "h", 2).map(|r| r.unwrap()).collect();
        assert_eq!(first, second);
    }

    /// Store whose scans fail after a fixed number of pages.
    struct FlakyStore {
        inner: InMemoryKvStore,
        pages_left: AtomicUsize,
    }

    impl KvStore for FlakyStore {
        fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
            self.inner.hset(key, field, value)
        }
        fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
            self.inner.hget(key, field)
        }
        fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<u64> {
            self.inner.hdel(key, fields)
        }
        fn hlen(&self, key: &str) -> StoreResult<u64> {
            self.inner.hlen(key)
        }
        fn hkeys(&self, key: &str) -> StoreResult<Vec<String>> {
            self.inner.hkeys(key)
        }
        fn hvals(&self, key: &str) -> StoreResult<Vec<String>> {
            self.inner.hvals(key)
        }
        fn hmget(&self, key: &str, fields: &[String]) -> StoreResult<Vec<Option<String>>> {
            self.inner.hmget(key, fields)
        }
        fn hscan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage> {
            if self.pages_left.fetch_sub(1, Ordering::SeqCst) == 0 {
                return Err(StoreError::Backend("connection reset".into()));
            }
            self.inner.hscan(key, cursor, count)
        }
        fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
            self.inner.hincrby(key, field, delta)
        }
    }

    #[test]
    fn transport_error_ends_scan() {
        let store = FlakyStore {
            inner: filled(10),
            pages_left: AtomicUsize::new(1),
        };
        let results: Vec<_> = HashScan::new(&store, "h", 3).collect();
        assert_eq!(results.len(), 4);
        assert!(results[..3].iter().all(|r| r.is_ok()));
        assert!(matches!(results[3], Err(StoreError::Backend(_))));
    }
}
