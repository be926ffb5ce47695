//! Opaque alias index.
//!
//! [`AliasIndex`] keeps two reverse hashes so that both directions are a
//! single `HGET`:
//!
//! - alias → OID text (`alias_to_oid_key`)
//! - OID text → alias (`oid_to_alias_key`)
//!
//! The two writes of a create are separate store operations. They are always
//! ordered alias → OID first, and releases remove OID → alias first, so the
//! only one-sided state a crash can leave behind is an alias → OID entry with
//! no matching reverse entry. [`AliasIndex::lookup_oid`] checks the reverse
//! entry before answering and reports such orphans as not found.

use std::sync::Arc;

use keel_store::KvStore;
use keel_types::Oid;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{IdentError, Result};

pub const DEFAULT_ALIAS_TO_OID_KEY: &str = "__keel_alias_oid__";
pub const DEFAULT_OID_TO_ALIAS_KEY: &str = "__keel_oid_alias__";

/// Bijective mapping between record identifiers and random opaque tokens.
///
/// Aliases are 128-bit random values rendered as 32 lowercase hex
/// characters. Create one per application and share it by `Arc`.
pub struct AliasIndex {
    store: Arc<dyn KvStore>,
    alias_to_oid_key: String,
    oid_to_alias_key: String,
}

impl AliasIndex {
    /// Index using [`DEFAULT_ALIAS_TO_OID_KEY`] and [`DEFAULT_OID_TO_ALIAS_KEY`].
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_keys(store, DEFAULT_ALIAS_TO_OID_KEY, DEFAULT_OID_TO_ALIAS_KEY)
    }

    /// Index keeping its two reverse maps in the given hashes.
    pub fn with_keys(
        store: Arc<dyn KvStore>,
        alias_to_oid_key: impl Into<String>,
        oid_to_alias_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            alias_to_oid_key: alias_to_oid_key.into(),
            oid_to_alias_key: oid_to_alias_key.into(),
        }
    }

    /// Return the alias of `oid`, minting and recording a new one if the OID
    /// has none yet. Repeated calls for the same OID return the same alias.
    pub fn resolve_or_create(&self, oid: &Oid) -> Result<String> {
        if let Some(alias) = self.lookup_alias(oid)? {
            return Ok(alias);
        }

        let alias = self.mint()?;
        let oid_text = oid.to_string();
        self.store.hset(&self.alias_to_oid_key, &alias, &oid_text)?;
        self.store.hset(&self.oid_to_alias_key, &oid_text, &alias)?;
        debug!(oid = %oid, "alias created");
        Ok(alias)
    }

    /// The alias of `oid`, if one has been created.
    pub fn lookup_alias(&self, oid: &Oid) -> Result<Option<String>> {
        Ok(self.store.hget(&self.oid_to_alias_key, &oid.to_string())?)
    }

    /// The OID an alias stands for, if the alias is known.
    pub fn lookup_oid(&self, alias: &str) -> Result<Option<Oid>> {
        if alias.is_empty() {
            return Err(IdentError::InvalidArgument("empty alias".into()));
        }
        let Some(text) = self.store.hget(&self.alias_to_oid_key, alias)? else {
            return Ok(None);
        };
        let oid: Oid = text.parse().map_err(|e| {
            IdentError::MalformedPayload(format!("alias {alias} maps to {text:?}: {e}"))
        })?;

        match self.lookup_alias(&oid)? {
            Some(current) if current == alias => Ok(Some(oid)),
            _ => {
                warn!(alias, oid = %oid, "orphaned alias entry ignored");
                Ok(None)
            }
        }
    }

    /// Remove both directions of the alias of `oid`. Returns `false` if the
    /// OID had no alias.
    pub fn release(&self, oid: &Oid) -> Result<bool> {
        let oid_text = oid.to_string();
        let Some(alias) = self.store.hget(&self.oid_to_alias_key, &oid_text)? else {
            return Ok(false);
        };
        self.store.hdel(&self.oid_to_alias_key, &[oid_text])?;
        self.store.hdel(&self.alias_to_oid_key, &[alias])?;
        debug!(oid = %oid, "alias released");
        Ok(true)
    }

    /// Number of active aliases. Orphaned alias → OID entries are not counted.
    pub fn count(&self) -> Result<u64> {
        Ok(self.store.hlen(&self.oid_to_alias_key)?)
    }

    /// A fresh token not yet present in the alias → OID map.
    fn mint(&self) -> Result<String> {
        loop {
            let alias = Uuid::new_v4().simple().to_string();
            if !self.store.hexists(&self.alias_to_oid_key, &alias)? {
                return Ok(alias);
            }
        }
    }
}

impl std::fmt::Debug for AliasIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasIndex")
            .field("alias_to_oid_key", &self.alias_to_oid_key)
            .field("oid_to_alias_key", &self.oid_to_alias_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_store::InMemoryKvStore;

    fn index() -> (Arc<InMemoryKvStore>, AliasIndex) {
        let store = Arc::new(InMemoryKvStore::new());
        let index = AliasIndex::new(store.clone());
        (store, index)
    }

    fn oid1() -> Oid {
        Oid::new("Person", 0)
    }

    fn oid2() -> Oid {
        Oid::new("Person", 1)
    }

    #[test]
    fn resolve_is_idempotent() {
        let (_, index) = index();
        let a1 = index.resolve_or_create(&oid1()).unwrap();
        let a2 = index.resolve_or_create(&oid1()).unwrap();
        assert_eq!(a1, a2);
        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn distinct_oids_get_distinct_aliases() {
        let (_, index) = index();
        let a1 = index.resolve_or_create(&oid1()).unwrap();
        let a2 = index.resolve_or_create(&oid2()).unwrap();
        assert_ne!(a1, a2);
        assert_eq!(index.count().unwrap(), 2);
    }

    #[test]
    fn alias_is_opaque_hex() {
        let (_, index) = index();
        let alias = index.resolve_or_create(&oid1()).unwrap();
        assert_eq!(alias.len(), 32);
        assert!(alias.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(!alias.contains("Person"));
    }

    #[test]
    fn lookups_in_both_directions() {
        let (_, index) = index();
        assert_eq!(index.lookup_alias(&oid1()).unwrap(), None);
        let alias = index.resolve_or_create(&oid1()).unwrap();
        assert_eq!(index.lookup_alias(&oid1()).unwrap(), Some(alias.clone()));
        assert_eq!(index.lookup_oid(&alias).unwrap(), Some(oid1()));
        assert_eq!(index.lookup_oid("0123456789abcdef0123456789abcdef").unwrap(), None);
    }

    #[test]
    fn release_removes_both_directions() {
        let (_, index) = index();
        let alias = index.resolve_or_create(&oid1()).unwrap();
        index.resolve_or_create(&oid2()).unwrap();

        assert!(index.release(&oid1()).unwrap());
        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(index.lookup_alias(&oid1()).unwrap(), None);
        assert_eq!(index.lookup_oid(&alias).unwrap(), None);
    }

    #[test]
    fn release_without_alias_is_noop() {
        let (_, index) = index();
        assert!(!index.release(&oid1()).unwrap());
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn new_alias_after_release() {
        let (_, index) = index();
        let first = index.resolve_or_create(&oid1()).unwrap();
        index.release(&oid1()).unwrap();
        let second = index.resolve_or_create(&oid1()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn orphaned_alias_reads_as_not_found() {
        let (store, index) = index();
        // Simulate a crash after the first of the two create writes.
        store
            .hset(DEFAULT_ALIAS_TO_OID_KEY, "deadbeef", &oid1().to_string())
            .unwrap();
        assert_eq!(index.lookup_oid("deadbeef").unwrap(), None);
        assert_eq!(index.lookup_alias(&oid1()).unwrap(), None);
        assert_eq!(index.count().unwrap(), 0);

        let alias = index.resolve_or_create(&oid1()).unwrap();
        assert_ne!(alias, "deadbeef");
        assert_eq!(index.lookup_oid(&alias).unwrap(), Some(oid1()));
    }

    #[test]
    fn corrupt_entry_is_reported() {
        let (store, index) = index();
        store.hset(DEFAULT_ALIAS_TO_OID_KEY, "abc", "not-an-oid").unwrap();
        assert!(matches!(
            index.lookup_oid("abc"),
            Err(IdentError::MalformedPayload(_))
        ));
    }

    #[test]
    fn empty_alias_is_rejected() {
        let (_, index) = index();
        assert!(matches!(index.lookup_oid(""), Err(IdentError::InvalidArgument(_))));
    }

    #[test]
    fn custom_keys_are_used() {
        let store = Arc::new(InMemoryKvStore::new());
        let index = AliasIndex::with_keys(store.clone(), "a2o", "o2a");
        let alias = index.resolve_or_create(&oid1()).unwrap();
        assert_eq!(store.hget("o2a", "Person@0").unwrap(), Some(alias.clone()));
        assert_eq!(store.hget("a2o", &alias).unwrap().as_deref(), Some("Person@0"));
    }
}
