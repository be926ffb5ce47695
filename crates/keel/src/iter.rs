//! Lazy iterators over the records of one namespace.
//!
//! Both iterators pull one `HSCAN` page at a time, so memory is bounded by
//! the configured page size. They are finite, and restartable in the sense
//! that asking the facade again starts a fresh scan. Records written or
//! deleted while a scan is running may or may not be observed. Dropping the
//! iterator cancels the scan.

use std::marker::PhantomData;

use keel_store::HashScan;
use keel_types::Oid;

use crate::entity::{Entity, Record};
use crate::error::{KeelError, KeelResult};

/// Every record of type `T`, in store-defined order, up to an optional limit.
pub struct Entities<'a, T> {
    scan: HashScan<'a>,
    remaining: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Entity> Entities<'a, T> {
    pub(crate) fn new(scan: HashScan<'a>, limit: Option<usize>) -> Self {
        Self {
            scan,
            remaining: limit.unwrap_or(usize::MAX),
            _marker: PhantomData,
        }
    }

    fn decode(&self, field: &str, payload: &str) -> KeelResult<T> {
        let namespace = self.scan.key();
        let sequence: u64 = field.parse().map_err(|_| {
            KeelError::malformed(format!("{namespace}[{field}]"), "field is not a sequence")
        })?;
        Record::decode(Oid::new(namespace, sequence), payload)?.into_entity()
    }
}

impl<T: Entity> Iterator for Entities<'_, T> {
    type Item = KeelResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = match self.scan.next()? {
            Ok((field, payload)) => self.decode(&field, &payload),
            Err(e) => Err(e.into()),
        };
        self.remaining -= 1;
        Some(item)
    }
}

/// Records of type `T` that satisfy a predicate, up to an optional number of
/// matches. Errors are yielded as they are met and do not count as matches.
pub struct Matches<'a, T, P> {
    inner: Entities<'a, T>,
    predicate: P,
    remaining: usize,
}

impl<'a, T: Entity, P: FnMut(&T) -> bool> Matches<'a, T, P> {
    pub(crate) fn new(inner: Entities<'a, T>, predicate: P, limit: Option<usize>) -> Self {
        Self {
            inner,
            predicate,
            remaining: limit.unwrap_or(usize::MAX),
        }
    }
}

impl<T: Entity, P: FnMut(&T) -> bool> Iterator for Matches<'_, T, P> {
    type Item = KeelResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            match self.inner.next()? {
                Ok(entity) if (self.predicate)(&entity) => {
                    self.remaining -= 1;
                    return Some(Ok(entity));
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
