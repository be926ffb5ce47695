use keel_codec::CodecError;
use keel_ident::IdentError;
use keel_types::Oid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeelError {
    /// No type is registered for the namespace.
    #[error("unknown type: namespace {0:?} is not registered")]
    UnknownType(String),

    /// No payload is stored at the requested identifier.
    #[error("record not found: {0}")]
    NotFound(Oid),

    /// Stored data is corrupt or does not fit the record type.
    #[error("malformed payload at {location}: {reason}")]
    MalformedPayload { location: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Error from the store, propagated unmodified.
    #[error(transparent)]
    Store(#[from] keel_store::StoreError),
}

impl KeelError {
    pub(crate) fn malformed(location: impl ToString, reason: impl ToString) -> Self {
        Self::MalformedPayload {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Attribute a transcoder failure to the record at `location`.
    pub(crate) fn from_codec(location: impl ToString, err: CodecError) -> Self {
        match err {
            CodecError::InvalidArgument(reason) => Self::InvalidArgument(reason),
            other => Self::malformed(location, other),
        }
    }
}

impl From<IdentError> for KeelError {
    fn from(err: IdentError) -> Self {
        match err {
            IdentError::InvalidArgument(reason) => Self::InvalidArgument(reason),
            IdentError::MalformedPayload(reason) => Self::malformed("identity index", reason),
            IdentError::Store(e) => Self::Store(e),
        }
    }
}

pub type KeelResult<T> = Result<T, KeelError>;
