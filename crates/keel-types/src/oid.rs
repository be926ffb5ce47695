use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A type whose records live in their own namespace of the store.
///
/// The namespace is the fully-qualified name of the type. The default uses
/// [`std::any::type_name`], whose output is not guaranteed to stay the same
/// across compiler versions, and which changes when the type is moved or
/// renamed. The namespace is the hash key records are persisted under, so
/// any type whose data must outlive a toolchain upgrade should override it
/// with a fixed name.
pub trait Namespaced {
    /// The namespace (hash key) that holds every record of this type.
    fn namespace() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Identifier of one stored record: a namespace plus a sequence number.
///
/// Sequences are zero-based and allocated monotonically per namespace, so an
/// `Oid` is unique within its namespace and is never reused after deletion.
/// The canonical text form is `namespace@sequence`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid {
    namespace: String,
    sequence: u64,
}

impl Oid {
    /// Create an `Oid` from an explicit namespace and sequence.
    pub fn new(namespace: impl Into<String>, sequence: u64) -> Self {
        Self {
            namespace: namespace.into(),
            sequence,
        }
    }

    /// Create an `Oid` in the namespace of `T`.
    pub fn of<T: Namespaced + ?Sized>(sequence: u64) -> Self {
        Self::new(T::namespace(), sequence)
    }

    /// Create an `Oid` from a `(namespace, sequence)` pair.
    pub fn from_pair<S: Into<String>>(pair: (S, u64)) -> Self {
        Self::new(pair.0, pair.1)
    }

    /// The namespace this record belongs to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The zero-based sequence number within the namespace.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The hash field under which the record's payload is stored.
    pub fn field(&self) -> String {
        self.sequence.to_string()
    }
}

impl FromStr for Oid {
    type Err = TypeError;

    /// Parse the canonical `namespace@sequence` form.
    ///
    /// Splits on the last `@`, so the sequence part is always the trailing
    /// decimal run.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TypeError::InvalidOid {
            text: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let (namespace, sequence) = trimmed
            .rsplit_once('@')
            .ok_or_else(|| invalid("missing '@' separator"))?;
        if namespace.is_empty() {
            return Err(invalid("empty namespace"));
        }
        if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("sequence is not a decimal number"));
        }
        let sequence = sequence
            .parse::<u64>()
            .map_err(|e| invalid(&e.to_string()))?;
        Ok(Self::new(namespace, sequence))
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.to_string()
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({}@{})", self.namespace, self.sequence)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.namespace, self.sequence)
    }
}
