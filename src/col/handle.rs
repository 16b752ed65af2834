/*!
 * Collection References
 * Shared, counted handles to one collection object
 */

use super::object::Col;
use super::value::Value;
use parking_lot::RwLock;
use std::sync::Arc;

/// The owning entity a collection may be attached to: an object plus the
/// attribute slot holding the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub object: u64,
    pub slot: u32,
}

struct ColShared<V: Value> {
    col: RwLock<Col<V>>,
    owner: RwLock<Option<Owner>>,
}

/// A counted reference to a shared [`Col`].
///
/// Cloning a handle shares the underlying collection; the count is atomic,
/// and the collection is dropped with the last handle. Mutation goes
/// through `write`, which serializes against all other holders — the
/// collection itself carries no locking.
pub struct ColHandle<V: Value> {
    inner: Arc<ColShared<V>>,
}

impl<V: Value> ColHandle<V> {
    /// Wrap a collection in its first reference.
    pub fn make(col: Col<V>) -> Self {
        Self {
            inner: Arc::new(ColShared {
                col: RwLock::new(col),
                owner: RwLock::new(None),
            }),
        }
    }

    /// Number of live references to the collection.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether another handle aliases the same collection.
    pub fn shares_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read access to the collection.
    pub fn read<R>(&self, f: impl FnOnce(&Col<V>) -> R) -> R {
        f(&self.inner.col.read())
    }

    /// Exclusive access to the collection.
    pub fn write<R>(&self, f: impl FnOnce(&mut Col<V>) -> R) -> R {
        f(&mut self.inner.col.write())
    }

    /// Detach the collection if this is the only reference, otherwise hand
    /// the handle back.
    pub fn try_unwrap(self) -> Result<Col<V>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(shared) => Ok(shared.col.into_inner()),
            Err(inner) => Err(Self { inner }),
        }
    }

    pub fn owner(&self) -> Option<Owner> {
        *self.inner.owner.read()
    }

    /// Attach the collection to an owning object attribute.
    pub fn set_owner(&self, owner: Owner) {
        *self.inner.owner.write() = Some(owner);
    }

    pub fn clear_owner(&self) {
        *self.inner.owner.write() = None;
    }
}

impl<V: Value> Clone for ColHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Value> std::fmt::Debug for ColHandle<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColHandle")
            .field("ref_count", &self.ref_count())
            .field("owner", &self.owner())
            .finish()
    }
}
