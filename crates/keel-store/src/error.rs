/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport or server failure reported by the backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// A lock guarding in-process state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// `HINCRBY` hit a field that does not hold an integer.
    #[error("hash value is not an integer: {key}[{field}]")]
    InvalidInteger { key: String, field: String },

    /// `HINCRBY` would overflow a signed 64-bit integer.
    #[error("increment would overflow: {key}[{field}]")]
    Overflow { key: String, field: String },

    /// Error reported by the Redis client.
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
