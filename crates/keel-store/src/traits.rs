use crate::error::StoreResult;

/// One page of an incremental hash scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor to pass to the next `hscan` call. `0` means the scan is done.
    pub cursor: u64,
    /// `(field, value)` pairs returned by this page.
    pub entries: Vec<(String, String)>,
}

/// Hash-keyed key-value store.
///
/// This is the only surface Keel needs from its backing store: a set of
/// named hashes mapping text fields to text values. All implementations must
/// satisfy these invariants:
/// - `hincrby` is a single atomic read-modify-write. Concurrent callers on the
///   same `(key, field)` each observe a distinct result.
/// - Missing keys behave as empty hashes; reads never fail because a key is
///   absent.
/// - `hscan` is cursor based and gives no snapshot isolation: entries written
///   or removed during a scan may or may not be observed by it.
/// - Transport errors are propagated, never swallowed or retried.
pub trait KvStore: Send + Sync {
    /// Set `field` in hash `key` to `value`, overwriting any previous value.
    fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;

    /// Read `field` from hash `key`. Returns `Ok(None)` if absent.
    fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Remove `fields` from hash `key`. Returns how many were present.
    fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<u64>;

    /// Number of fields in hash `key`.
    fn hlen(&self, key: &str) -> StoreResult<u64>;

    /// All field names in hash `key`, in store-defined order.
    fn hkeys(&self, key: &str) -> StoreResult<Vec<String>>;

    /// All values in hash `key`, in store-defined order.
    fn hvals(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Read several fields from hash `key` in one round trip. The result has
    /// one slot per requested field, in request order.
    fn hmget(&self, key: &str, fields: &[String]) -> StoreResult<Vec<Option<String>>>;

    /// Fetch the page of hash `key` that starts at `cursor`. `count` is a
    /// hint for the page size.
    fn hscan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage>;

    /// Atomically add `delta` to the integer stored at `key[field]` (missing
    /// fields start at zero) and return the new value.
    fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    /// Whether `field` is present in hash `key`.
    ///
    /// Default implementation reads the value. Backends may override with a
    /// native existence check.
    fn hexists(&self, key: &str, field: &str) -> StoreResult<bool> {
        Ok(self.hget(key, field)?.is_some())
    }
}
