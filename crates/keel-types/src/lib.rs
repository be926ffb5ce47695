//! Foundation types for Keel.
//!
//! Every other Keel crate depends on `keel-types`. It defines the identity of
//! a stored record and the closed set of values a record's fields can hold.
//!
//! # Key Types
//!
//! - [`Oid`] — `(namespace, sequence)` identifier of one stored record
//! - [`Namespaced`] — types that own a namespace (a partition of the store)
//! - [`Value`] — a single field value, including dates, times and byte blobs
//! - [`Fields`] — the field state of one record

pub mod error;
pub mod oid;
pub mod value;

pub use error::TypeError;
pub use oid::{Namespaced, Oid};
pub use value::{Fields, Value};
