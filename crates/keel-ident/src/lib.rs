//! Identity services for Keel.
//!
//! Two small services sit between the persistence facade and the store:
//!
//! - [`IdAllocator`] hands out zero-based, monotonically increasing sequence
//!   numbers per namespace. Allocation is a single atomic `HINCRBY` on a
//!   counter hash, so concurrent writers never receive the same sequence and
//!   deleting records never rolls a counter back.
//! - [`AliasIndex`] maps an [`Oid`](keel_types::Oid) to a random opaque token
//!   and back, for places where internal identifiers must not be exposed.
//!
//! Both are plain values constructed over a shared store handle; share one
//! instance by `Arc` among facades that target the same store.
//!
//! # Modules
//!
//! - [`error`] — Error types for identity operations
//! - [`allocator`] — Per-namespace sequence counters
//! - [`alias`] — Bijective OID ⇄ alias index

pub mod alias;
pub mod allocator;
pub mod error;

pub use alias::{AliasIndex, DEFAULT_ALIAS_TO_OID_KEY, DEFAULT_OID_TO_ALIAS_KEY};
pub use allocator::{IdAllocator, DEFAULT_COUNTERS_KEY};
pub use error::{IdentError, Result};
