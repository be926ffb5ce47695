use std::sync::Arc;

use keel_ident::{AliasIndex, IdAllocator};
use keel_store::{HashScan, KvStore};
use keel_types::Oid;
use tracing::debug;

use crate::config::KeelConfig;
use crate::entity::{Entity, Record};
use crate::error::{KeelError, KeelResult};
use crate::iter::{Entities, Matches};
use crate::registry::{TypeDescriptor, TypeRegistry};

/// Persistence facade: stores, loads, scans and deletes [`Entity`] records.
///
/// Every operation is a blocking sequence of store round trips. The facade
/// holds no lock of its own; it relies on the store client being
/// thread-safe and on the store's atomic increment for sequence allocation.
/// Concurrent saves of the same already-identified record are
/// last-writer-wins.
pub struct Keel {
    store: Arc<dyn KvStore>,
    allocator: IdAllocator,
    aliases: Arc<AliasIndex>,
    registry: TypeRegistry,
    config: KeelConfig,
}

impl Keel {
    /// Facade over `store` with the default configuration.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::build(store, KeelConfig::default())
    }

    /// Facade over `store` with a validated configuration.
    pub fn with_config(store: Arc<dyn KvStore>, config: KeelConfig) -> KeelResult<Self> {
        config.validate()?;
        Ok(Self::build(store, config))
    }

    /// Facade over the Redis server named by `config.redis_url`.
    #[cfg(feature = "redis")]
    pub fn connect(config: KeelConfig) -> KeelResult<Self> {
        let store = keel_store::RedisKvStore::open(&config.redis_url)?;
        Self::with_config(Arc::new(store), config)
    }

    fn build(store: Arc<dyn KvStore>, config: KeelConfig) -> Self {
        let allocator = IdAllocator::with_key(store.clone(), config.counters_key.clone());
        let aliases = Arc::new(AliasIndex::with_keys(
            store.clone(),
            config.alias_to_oid_key.clone(),
            config.oid_to_alias_key.clone(),
        ));
        Self {
            store,
            allocator,
            aliases,
            registry: TypeRegistry::new(),
            config,
        }
    }

    /// Use an alias index shared with other facades on the same store.
    pub fn share_aliases(mut self, aliases: Arc<AliasIndex>) -> Self {
        self.aliases = aliases;
        self
    }

    /// The alias index, for sharing with other facades.
    pub fn aliases(&self) -> &Arc<AliasIndex> {
        &self.aliases
    }

    pub fn config(&self) -> &KeelConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Register `T` so its records can be loaded.
    pub fn register<T: Entity>(&mut self) -> KeelResult<&TypeDescriptor> {
        self.registry.register::<T>()
    }

    // ---- Single records ----

    /// Store `entity`, assigning it an identity on first save.
    ///
    /// A record that already carries an identity overwrites its slot. The
    /// identity is attached to `entity` only once the payload is written.
    pub fn save<T: Entity>(&self, entity: &mut T) -> KeelResult<Oid> {
        let (oid, fresh) = match entity.oid() {
            Some(oid) if oid.namespace() == T::namespace() => (oid.clone(), false),
            Some(oid) => {
                return Err(KeelError::InvalidArgument(format!(
                    "{oid} does not belong to namespace {}",
                    T::namespace()
                )));
            }
            None => {
                let sequence = self.allocator.allocate(T::namespace())?;
                (Oid::of::<T>(sequence), true)
            }
        };

        let payload = Record::encode(&oid, entity.to_fields())?;
        self.store.hset(oid.namespace(), &oid.field(), &payload)?;
        if fresh {
            entity.set_oid(oid.clone());
        }
        debug!(oid = %oid, fresh, "record saved");
        Ok(oid)
    }

    /// Load the record stored at `oid` as a `T`.
    pub fn load<T: Entity>(&self, oid: &Oid) -> KeelResult<T> {
        self.registry.resolve(oid.namespace())?;
        expect_namespace::<T>(oid)?;
        self.fetch(oid)?.into_entity()
    }

    /// Load the record stored at `oid` without naming its type. The
    /// namespace must still be registered.
    pub fn load_record(&self, oid: &Oid) -> KeelResult<Record> {
        self.registry.resolve(oid.namespace())?;
        self.fetch(oid)
    }

    pub fn exists(&self, oid: &Oid) -> KeelResult<bool> {
        Ok(self.store.hexists(oid.namespace(), &oid.field())?)
    }

    /// Delete the record at `oid` and release its alias. Returns whether a
    /// record was removed.
    pub fn delete(&self, oid: &Oid) -> KeelResult<bool> {
        self.aliases.release(oid)?;
        let removed = self.store.hdel(oid.namespace(), &[oid.field()])? > 0;
        debug!(oid = %oid, removed, "record deleted");
        Ok(removed)
    }

    // ---- Batches ----

    /// Delete many records with one removal per namespace, releasing every
    /// alias. Returns the number of records removed.
    pub fn multi_delete(&self, oids: &[Oid]) -> KeelResult<u64> {
        for oid in oids {
            self.aliases.release(oid)?;
        }
        let mut removed = 0;
        for (namespace, group) in group_by_namespace(oids) {
            let fields: Vec<String> = group.iter().map(|oid| oid.field()).collect();
            removed += self.store.hdel(namespace, &fields)?;
        }
        debug!(requested = oids.len(), removed, "records deleted");
        Ok(removed)
    }

    /// Load many records with one batched fetch per namespace.
    ///
    /// Results follow batch order: namespaces in order of first appearance,
    /// and within a namespace the order of the input.
    pub fn multi_load_records(&self, oids: &[Oid]) -> KeelResult<Vec<Record>> {
        let groups = group_by_namespace(oids);
        for (namespace, _) in &groups {
            self.registry.resolve(namespace)?;
        }

        let mut records = Vec::with_capacity(oids.len());
        for (namespace, group) in groups {
            let fields: Vec<String> = group.iter().map(|oid| oid.field()).collect();
            let payloads = self.store.hmget(namespace, &fields)?;
            for (oid, payload) in group.into_iter().zip(payloads) {
                let payload = payload.ok_or_else(|| KeelError::NotFound(oid.clone()))?;
                records.push(Record::decode(oid.clone(), &payload)?);
            }
        }
        Ok(records)
    }

    /// Typed [`multi_load_records`](Self::multi_load_records); every OID must
    /// belong to `T`'s namespace.
    pub fn multi_load<T: Entity>(&self, oids: &[Oid]) -> KeelResult<Vec<T>> {
        for oid in oids {
            expect_namespace::<T>(oid)?;
        }
        self.multi_load_records(oids)?
            .into_iter()
            .map(Record::into_entity)
            .collect()
    }

    // ---- Namespace queries ----

    /// Number of live records of `T`. Deleted records do not count, so this
    /// is not the next sequence number.
    pub fn count<T: Entity>(&self) -> KeelResult<u64> {
        Ok(self.store.hlen(T::namespace())?)
    }

    /// Current counter of `T`'s namespace: how many sequences were ever
    /// allocated.
    pub fn peek_sequence<T: Entity>(&self) -> KeelResult<u64> {
        Ok(self.allocator.peek(T::namespace())?)
    }

    /// Lazily iterate the records of `T`, stopping after `limit` records if
    /// given.
    pub fn enumerate<T: Entity>(&self, limit: Option<usize>) -> KeelResult<Entities<'_, T>> {
        self.registry.resolve(T::namespace())?;
        Ok(Entities::new(self.scan(T::namespace()), limit))
    }

    /// Lazily iterate every record of `T`.
    pub fn load_all<T: Entity>(&self) -> KeelResult<Entities<'_, T>> {
        self.enumerate(None)
    }

    /// Lazily iterate the identifiers of every stored record of `T`.
    pub fn load_all_keys<T: Entity>(
        &self,
    ) -> KeelResult<impl Iterator<Item = KeelResult<Oid>> + '_> {
        let namespace = T::namespace();
        let keys = self.store.hkeys(namespace)?;
        Ok(keys.into_iter().map(move |field| {
            field.parse::<u64>().map(|seq| Oid::new(namespace, seq)).map_err(|_| {
                KeelError::malformed(format!("{namespace}[{field}]"), "field is not a sequence")
            })
        }))
    }

    /// Up to `n` records of `T` in ascending sequence order, skipping
    /// deleted slots. `n` is clamped to `[1, count]`.
    pub fn load_first<T: Entity>(&self, n: usize) -> KeelResult<Vec<T>> {
        let (n, end) = match self.window::<T>(n)? {
            Some(window) => window,
            None => return Ok(Vec::new()),
        };
        self.collect_window(0..end, n)
    }

    /// Up to `n` records of `T` in descending sequence order, starting from
    /// the last allocated sequence and skipping deleted slots. `n` is clamped
    /// to `[1, count]`.
    pub fn load_last<T: Entity>(&self, n: usize) -> KeelResult<Vec<T>> {
        let (n, end) = match self.window::<T>(n)? {
            Some(window) => window,
            None => return Ok(Vec::new()),
        };
        self.collect_window((0..end).rev(), n)
    }

    /// Lazily yield records of `T` for which `predicate` holds, stopping
    /// after `limit` matches if given. Scans the whole namespace.
    pub fn filter<T, P>(&self, predicate: P, limit: Option<usize>) -> KeelResult<Matches<'_, T, P>>
    where
        T: Entity,
        P: FnMut(&T) -> bool,
    {
        Ok(Matches::new(self.enumerate(None)?, predicate, limit))
    }

    /// The first record of `T` in scan order for which `predicate` holds.
    pub fn find_first<T, P>(&self, predicate: P) -> KeelResult<Option<T>>
    where
        T: Entity,
        P: FnMut(&T) -> bool,
    {
        self.filter(predicate, Some(1))?.next().transpose()
    }

    // ---- Aliases ----

    /// The record an alias stands for, if the alias is known.
    pub fn oid_from_alias(&self, alias: &str) -> KeelResult<Option<Oid>> {
        Ok(self.aliases.lookup_oid(alias)?)
    }

    /// The alias of `oid`, created on first request.
    pub fn alias_from_oid(&self, oid: &Oid) -> KeelResult<String> {
        Ok(self.aliases.resolve_or_create(oid)?)
    }

    /// Number of active aliases.
    pub fn alias_count(&self) -> KeelResult<u64> {
        Ok(self.aliases.count()?)
    }

    // ---- Internals ----

    fn fetch(&self, oid: &Oid) -> KeelResult<Record> {
        let payload = self
            .store
            .hget(oid.namespace(), &oid.field())?
            .ok_or_else(|| KeelError::NotFound(oid.clone()))?;
        Record::decode(oid.clone(), &payload)
    }

    fn scan(&self, namespace: &str) -> HashScan<'_> {
        HashScan::new(self.store.as_ref(), namespace, self.config.scan_page_size)
    }

    /// Clamped window size and the exclusive upper sequence bound, or `None`
    /// when the namespace holds no records.
    fn window<T: Entity>(&self, n: usize) -> KeelResult<Option<(usize, u64)>> {
        self.registry.resolve(T::namespace())?;
        let live = usize::try_from(self.count::<T>()?).unwrap_or(usize::MAX);
        if live == 0 {
            return Ok(None);
        }
        let end = self.allocator.peek(T::namespace())?;
        Ok(Some((n.clamp(1, live), end)))
    }

    fn collect_window<T: Entity>(
        &self,
        sequences: impl Iterator<Item = u64>,
        n: usize,
    ) -> KeelResult<Vec<T>> {
        let mut out = Vec::with_capacity(n);
        for sequence in sequences {
            if out.len() == n {
                break;
            }
            let oid = Oid::of::<T>(sequence);
            if let Some(payload) = self.store.hget(oid.namespace(), &oid.field())? {
                out.push(Record::decode(oid, &payload)?.into_entity()?);
            }
        }
        Ok(out)
    }
}

impl std::fmt::Debug for Keel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keel")
            .field("registered", &self.registry.namespaces())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn expect_namespace<T: Entity>(oid: &Oid) -> KeelResult<()> {
    if oid.namespace() != T::namespace() {
        return Err(KeelError::InvalidArgument(format!(
            "{oid} is not a record of namespace {}",
            T::namespace()
        )));
    }
    Ok(())
}

/// Group identifiers by namespace, keeping namespaces in order of first
/// appearance and identifiers in input order.
fn group_by_namespace(oids: &[Oid]) -> Vec<(&str, Vec<&Oid>)> {
    let mut groups: Vec<(&str, Vec<&Oid>)> = Vec::new();
    for oid in oids {
        match groups.iter_mut().find(|(ns, _)| *ns == oid.namespace()) {
            Some((_, group)) => group.push(oid),
            None => groups.push((oid.namespace(), vec![oid])),
        }
    }
    groups
}
