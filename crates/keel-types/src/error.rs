use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid oid text {text:?}: {reason}")]
    InvalidOid { text: String, reason: String },

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("field {field} has type {actual}, expected {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}
