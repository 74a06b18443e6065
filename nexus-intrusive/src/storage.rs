//! Element storage with stable indices.
//!
//! The collections in this crate never own their elements. Elements live in
//! a [`Storage`] and the collections thread link fields through them by
//! index, so one element can sit in several collections at once.

use crate::Index;

/// Slab-like storage with stable indices.
///
/// An index stays valid until the element is removed. Removed slots may be
/// handed out again by later inserts.
///
/// # Implementations
///
/// - [`BoxedStorage<T>`] - fixed capacity chosen at runtime (in this crate)
/// - `slab::Slab<T>` - growable (feature `slab`)
pub trait Storage<T> {
    /// Index type for this storage.
    type Index: Index;

    /// Error type for failed insertions.
    ///
    /// - `Full<T>` for fixed-capacity storage
    /// - `Infallible` for growable storage
    type Error;

    /// Inserts a value, returning its stable index.
    fn try_insert(&mut self, value: T) -> Result<Self::Index, Self::Error>;

    /// Removes and returns the value at `index`, if present.
    fn remove(&mut self, index: Self::Index) -> Option<T>;

    /// Returns a reference to the value at `index`, if present.
    fn get(&self, index: Self::Index) -> Option<&T>;

    /// Returns a mutable reference to the value at `index`, if present.
    fn get_mut(&mut self, index: Self::Index) -> Option<&mut T>;

    #[inline]
    fn contains(&self, index: Self::Index) -> bool {
        self.get(index).is_some()
    }
}

/// Error returned when fixed-capacity storage is full.
///
/// Carries the rejected value back to the caller.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Returns the value that could not be inserted.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> core::fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Full(..)")
    }
}

impl<T> core::fmt::Display for Full<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "storage is full")
    }
}

impl<T> std::error::Error for Full<T> {}

// =============================================================================
// BoxedStorage - runtime capacity, single allocation, intrusive free list
// =============================================================================

enum Slot<T, Idx> {
    Occupied(T),
    /// Next vacant slot, or `NONE`.
    Vacant(Idx),
}

/// Fixed-capacity storage with runtime-determined size.
///
/// Slots are allocated once up front. Vacant slots form a free list threaded
/// through the slot array, so reuse is LIFO.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{BoxedStorage, Storage};
///
/// let mut storage: BoxedStorage<u64> = BoxedStorage::with_capacity(1000);
/// assert_eq!(storage.capacity(), 1000);
///
/// let idx = storage.try_insert(42).unwrap();
/// assert_eq!(storage.get(idx), Some(&42));
/// ```
pub struct BoxedStorage<T, Idx: Index = u32> {
    slots: Box<[Slot<T, Idx>]>,
    free_head: Idx,
    len: usize,
}

impl<T, Idx: Index> BoxedStorage<T, Idx> {
    /// Creates storage with exactly `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 or not representable below the index
    /// type's sentinel.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        assert!(
            capacity <= Idx::NONE.as_usize(),
            "capacity exceeds index type maximum"
        );

        let slots = (0..capacity)
            .map(|i| {
                let next = if i + 1 == capacity {
                    Idx::NONE
                } else {
                    Idx::from_usize(i + 1)
                };
                Slot::Vacant(next)
            })
            .collect();

        Self {
            slots,
            free_head: Idx::from_usize(0),
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_head.is_none()
    }

    /// Iterates occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Idx, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| match slot {
            Slot::Occupied(value) => Some((Idx::from_usize(i), value)),
            Slot::Vacant(_) => None,
        })
    }
}

impl<T, Idx: Index> Storage<T> for BoxedStorage<T, Idx> {
    type Index = Idx;
    type Error = Full<T>;

    #[inline]
    fn try_insert(&mut self, value: T) -> Result<Self::Index, Self::Error> {
        let idx = self.free_head;
        if idx.is_none() {
            return Err(Full(value));
        }

        let slot = &mut self.slots[idx.as_usize()];
        self.free_head = match *slot {
            Slot::Vacant(next) => next,
            Slot::Occupied(_) => unreachable!("free list points at an occupied slot"),
        };
        *slot = Slot::Occupied(value);
        self.len += 1;

        Ok(idx)
    }

    #[inline]
    fn remove(&mut self, index: Self::Index) -> Option<T> {
        let slot = self.slots.get_mut(index.as_usize())?;
        if matches!(slot, Slot::Vacant(_)) {
            return None;
        }

        let value = match std::mem::replace(slot, Slot::Vacant(self.free_head)) {
            Slot::Occupied(value) => value,
            Slot::Vacant(_) => unreachable!(),
        };
        self.free_head = index;
        self.len -= 1;

        Some(value)
    }

    #[inline]
    fn get(&self, index: Self::Index) -> Option<&T> {
        match self.slots.get(index.as_usize())? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant(_) => None,
        }
    }

    #[inline]
    fn get_mut(&mut self, index: Self::Index) -> Option<&mut T> {
        match self.slots.get_mut(index.as_usize())? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant(_) => None,
        }
    }
}

// =============================================================================
// slab::Slab implementation
// =============================================================================

#[cfg(feature = "slab")]
impl<T> Storage<T> for slab::Slab<T> {
    type Index = usize;
    type Error = core::convert::Infallible;

    #[inline]
    fn try_insert(&mut self, value: T) -> Result<Self::Index, Self::Error> {
        Ok(self.insert(value))
    }

    #[inline]
    fn remove(&mut self, index: Self::Index) -> Option<T> {
        self.try_remove(index)
    }

    #[inline]
    fn get(&self, index: Self::Index) -> Option<&T> {
        slab::Slab::get(self, index)
    }

    #[inline]
    fn get_mut(&mut self, index: Self::Index) -> Option<&mut T> {
        slab::Slab::get_mut(self, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_empty() {
        let storage: BoxedStorage<u64> = BoxedStorage::with_capacity(16);
        assert!(storage.is_empty());
        assert!(!storage.is_full());
        assert_eq!(storage.len(), 0);
        assert_eq!(storage.capacity(), 16);
    }

    #[test]
    fn insert_get_remove() {
        let mut storage: BoxedStorage<u64> = BoxedStorage::with_capacity(16);

        let idx = storage.try_insert(42).unwrap();
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.get(idx), Some(&42));
        assert!(storage.contains(idx));

        assert_eq!(storage.remove(idx), Some(42));
        assert_eq!(storage.get(idx), None);
        assert_eq!(storage.remove(idx), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn fill_to_capacity() {
        let mut storage: BoxedStorage<u64> = BoxedStorage::with_capacity(3);

        let keys: Vec<u32> = (0..3).map(|i| storage.try_insert(i).unwrap()).collect();
        assert!(storage.is_full());

        let err = storage.try_insert(3).unwrap_err();
        assert_eq!(err.into_inner(), 3);
        assert_eq!(err.to_string(), "storage is full");

        for (i, key) in keys.iter().enumerate() {
            assert_eq!(storage.get(*key), Some(&(i as u64)));
        }
    }

    #[test]
    fn slot_reuse_is_lifo() {
        let mut storage: BoxedStorage<u64> = BoxedStorage::with_capacity(4);

        let k0 = storage.try_insert(0).unwrap();
        let k1 = storage.try_insert(1).unwrap();

        storage.remove(k0);
        storage.remove(k1);

        assert_eq!(storage.try_insert(2).unwrap(), k1);
        assert_eq!(storage.try_insert(3).unwrap(), k0);
    }

    #[test]
    fn out_of_range_is_absent() {
        let mut storage: BoxedStorage<u64, u16> = BoxedStorage::with_capacity(4);
        assert_eq!(storage.get(100), None);
        assert_eq!(storage.get_mut(100), None);
        assert_eq!(storage.remove(100), None);
    }

    #[test]
    fn iter_skips_vacant() {
        let mut storage: BoxedStorage<u64> = BoxedStorage::with_capacity(8);
        let keys: Vec<u32> = (0..5).map(|i| storage.try_insert(i * 10).unwrap()).collect();
        storage.remove(keys[1]);
        storage.remove(keys[3]);

        let seen: Vec<u64> = storage.iter().map(|(_, v)| *v).collect();
        assert_eq!(seen, vec![0, 20, 40]);
    }

    #[test]
    #[should_panic(expected = "capacity exceeds index type maximum")]
    fn capacity_beyond_index_panics() {
        let _storage: BoxedStorage<u64, u8> = BoxedStorage::with_capacity(256);
    }

    #[test]
    fn drop_cleans_up() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        struct DropCounter;
        impl Drop for DropCounter {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        {
            let mut storage: BoxedStorage<DropCounter> = BoxedStorage::with_capacity(8);
            for _ in 0..3 {
                let _ = storage.try_insert(DropCounter);
            }
        }

        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 3);
    }

    #[cfg(feature = "slab")]
    mod slab_tests {
        use super::*;

        #[test]
        fn insert_get_remove() {
            let mut storage = slab::Slab::new();

            let idx = Storage::try_insert(&mut storage, 42).unwrap();
            assert_eq!(Storage::get(&storage, idx), Some(&42));
            assert_eq!(Storage::remove(&mut storage, idx), Some(42));
            assert_eq!(Storage::get(&storage, idx), None);
        }
    }
}
