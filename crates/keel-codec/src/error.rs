use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// A tagged node is missing a required component, or a component has the
    /// wrong shape or is out of range.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The value cannot be represented in a payload.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The payload text is not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;
