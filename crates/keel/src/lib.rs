//! Schema-less record persistence over a hash-keyed key-value store.
//!
//! [`Keel`] is the main entry point. It stores any type implementing
//! [`Entity`] without a declared schema: each record is written as a tagged
//! JSON payload under `hash(namespace)[sequence]`, where the namespace is the
//! record type's fully-qualified name and the sequence comes from an atomic
//! per-namespace counter.
//!
//! ```ignore
//! let store = Arc::new(InMemoryKvStore::new());
//! let mut keel = Keel::new(store);
//! keel.register::<Person>()?;
//!
//! let mut ada = Person::new("Ada", 36);
//! let oid = keel.save(&mut ada)?;
//! let loaded: Person = keel.load(&oid)?;
//! let adults: Vec<Person> = keel
//!     .filter(|p: &Person| p.age >= 18, None)?
//!     .collect::<KeelResult<_>>()?;
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod facade;
pub mod iter;
pub mod registry;

pub use config::KeelConfig;
pub use entity::{Entity, Record, OID_FIELD};
pub use error::{KeelError, KeelResult};
pub use facade::Keel;
pub use iter::{Entities, Matches};
pub use registry::{TypeDescriptor, TypeRegistry};

// Re-export key types
pub use keel_ident::AliasIndex;
pub use keel_store::{InMemoryKvStore, KvStore};
#[cfg(feature = "redis")]
pub use keel_store::RedisKvStore;
pub use keel_types::{Fields, Namespaced, Oid, TypeError, Value};
