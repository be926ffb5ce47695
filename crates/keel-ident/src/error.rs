//! Error types for identity operations.

use keel_store::StoreError;
use thiserror::Error;

/// Errors that can occur while allocating sequences or managing aliases.
#[derive(Debug, Error)]
pub enum IdentError {
    /// The caller passed an unusable namespace or alias.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A counter or index entry in the store holds data that cannot be parsed.
    #[error("malformed index entry: {0}")]
    MalformedPayload(String),

    /// Error from the underlying store, propagated unmodified.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for identity operations.
pub type Result<T> = std::result::Result<T, IdentError>;
