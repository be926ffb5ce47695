//! Hash-keyed key-value store interface for Keel.
//!
//! Keel never talks to a database directly. It needs only a small set of
//! hash primitives (`HSET`, `HGET`, `HDEL`, `HLEN`, `HKEYS`, `HVALS`,
//! `HMGET`, `HSCAN` and `HINCRBY`) expressed by the [`KvStore`] trait.
//!
//! # Backends
//!
//! - [`InMemoryKvStore`] -- `HashMap`-based store for tests and embedding
//! - `RedisKvStore` -- Redis server, behind the `redis` cargo feature
//!
//! # Design Rules
//!
//! 1. `hincrby` is atomic; it is the only primitive that needs to be.
//! 2. Missing hashes read as empty; they are never an error.
//! 3. Scans are cursor based and bounded by page size, with no snapshot
//!    isolation.
//! 4. Transport errors are propagated unmodified. No retries, no timeouts.

pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod scan;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryKvStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisKvStore;
pub use scan::HashScan;
pub use traits::{KvStore, ScanPage};
