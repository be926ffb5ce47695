//! Redis-backed [`KvStore`], enabled with the `redis` cargo feature.
//!
//! Every primitive maps onto exactly one Redis command, so the atomicity of
//! `hincrby` is the server's `HINCRBY`. Each call opens a connection from the
//! shared [`redis::Client`]; pooling and retries belong to the client layer.

use redis::{Client, Connection};
use tracing::debug;

use crate::error::StoreResult;
use crate::traits::{KvStore, ScanPage};

/// [`KvStore`] implementation talking to a Redis server.
///
/// Connections are not reused: every primitive opens its own, so a scan
/// costs one connection per page and `AliasIndex::resolve_or_create` several.
/// Wrap a pooling client through [`from_client`](Self::from_client) or keep
/// page sizes large where that matters.
pub struct RedisKvStore {
    client: Client,
}

impl RedisKvStore {
    /// Create a store for the server at `url` (e.g. `redis://127.0.0.1/`).
    ///
    /// Only the URL is validated here; the first command opens the first
    /// connection.
    pub fn open(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)?;
        debug!(url, "redis store opened");
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn conn(&self) -> StoreResult<Connection> {
        Ok(self.client.get_connection()?)
    }
}

impl KvStore for RedisKvStore {
    fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query::<()>(&mut self.conn()?)?;
        Ok(())
    }

    fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        Ok(redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query(&mut self.conn()?)?)
    }

    fn hdel(&self, key: &str, fields: &[String]) -> StoreResult<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        Ok(redis::cmd("HDEL")
            .arg(key)
            .arg(fields)
            .query(&mut self.conn()?)?)
    }

    fn hlen(&self, key: &str) -> StoreResult<u64> {
        Ok(redis::cmd("HLEN").arg(key).query(&mut self.conn()?)?)
    }

    fn hkeys(&self, key: &str) -> StoreResult<Vec<String>> {
        Ok(redis::cmd("HKEYS").arg(key).query(&mut self.conn()?)?)
    }

    fn hvals(&self, key: &str) -> StoreResult<Vec<String>> {
        Ok(redis::cmd("HVALS").arg(key).query(&mut self.conn()?)?)
    }

    fn hmget(&self, key: &str, fields: &[String]) -> StoreResult<Vec<Option<String>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        Ok(redis::cmd("HMGET")
            .arg(key)
            .arg(fields)
            .query(&mut self.conn()?)?)
    }

    fn hscan(&self, key: &str, cursor: u64, count: usize) -> StoreResult<ScanPage> {
        let (cursor, flat): (u64, Vec<String>) = redis::cmd("HSCAN")
            .arg(key)
            .arg(cursor)
            .arg("COUNT")
            .arg(count.max(1))
            .query(&mut self.conn()?)?;
        // Reply is a flat [field, value, field, value, ...] array.
        let mut entries = Vec::with_capacity(flat.len() / 2);
        let mut items = flat.into_iter();
        while let (Some(field), Some(value)) = (items.next(), items.next()) {
            entries.push((field, value));
        }
        Ok(ScanPage { cursor, entries })
    }

    fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        Ok(redis::cmd("HINCRBY")
            .arg(key)
            .arg(field)
            .arg(delta)
            .query(&mut self.conn()?)?)
    }

    fn hexists(&self, key: &str, field: &str) -> StoreResult<bool> {
        Ok(redis::cmd("HEXISTS")
            .arg(key)
            .arg(field)
            .query(&mut self.conn()?)?)
    }
}

impl std::fmt::Debug for RedisKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKvStore").finish_non_exhaustive()
    }
}
