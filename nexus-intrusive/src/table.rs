//! Intrusive chained hash table over external storage.
//!
//! Each bucket is one index: the head of a singly linked chain threaded
//! through the elements' [`TableLink`]s. The last element of a chain has no
//! next element, so its link is tagged and holds the bucket number instead.
//! That makes [`Table::bus`] and [`Table::next`] work from the element
//! alone, without rehashing the key.
//!
//! Lookups move the hit to the front of its chain ([`Table::get`]). The
//! table never resizes on its own; call [`Table::reseat`] or
//! [`Table::rehash`] when [`Table::load_factor`] says so.

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

use crate::error::{Error, Result};
use crate::key::{Ascending, Compare, Fnv1a, KeyHash};
use crate::link::{Keyed, TaggedLink};
use crate::{Index, Storage};

/// Table link embedded in an element.
#[derive(Debug)]
pub struct TableLink<K: Index> {
    /// Next element; tagged (holding the bucket number) at the chain end.
    next: TaggedLink<K>,
}

impl<K: Index> TableLink<K> {
    pub const fn new() -> Self {
        Self {
            next: TaggedLink::new(),
        }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.next.is_bound()
    }
}

impl<K: Index> Default for TableLink<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Head of one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket<K: Index> {
    head: K,
}

impl<K: Index> Bucket<K> {
    pub const fn new() -> Self {
        Self { head: K::NONE }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

impl<K: Index> Default for Bucket<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// A hash table keyed by the element's own key.
///
/// `C` decides key equality (only [`Ordering::Equal`] matters) and `H`
/// hashes keys. Keys must be unique within a table.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{adapter, BoxedStorage, Storage, Table, TableLink};
///
/// struct Session {
///     user: String,
///     link: TableLink<u32>,
/// }
///
/// adapter! {
///     struct ByUser: Session => link: TableLink<u32>, key user: str;
/// }
///
/// let mut storage: BoxedStorage<Session> = BoxedStorage::with_capacity(16);
/// let mut sessions: Table<u32, ByUser> = Table::with_buckets(8);
///
/// let s = storage
///     .try_insert(Session { user: "ada".into(), link: TableLink::new() })
///     .unwrap();
/// sessions.set(&mut storage, s);
///
/// assert_eq!(sessions.get(&mut storage, "ada"), Some(s));
/// assert_eq!(sessions.get(&mut storage, "bob"), None);
///
/// sessions.clear(&mut storage);
/// ```
pub struct Table<K: Index, A, C = Ascending, H = Fnv1a> {
    buckets: Vec<Bucket<K>>,
    len: usize,
    _marker: PhantomData<fn() -> (A, C, H)>,
}

impl<K: Index, A, C, H> Table<K, A, C, H> {
    /// Creates a table with no buckets. Call [`Table::reseat`] before
    /// inserting.
    pub const fn new() -> Self {
        Self {
            buckets: Vec::new(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Creates a table with `n` empty buckets.
    ///
    /// # Panics
    ///
    /// Panics if `n` buckets cannot be numbered by `K`.
    pub fn with_buckets(n: usize) -> Self {
        assert!(n <= K::NONE.as_usize(), "bucket count exceeds index type maximum");
        Self {
            buckets: vec![Bucket::new(); n],
            len: 0,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets.
    #[inline]
    pub fn buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Elements per bucket; zero for a table without buckets.
    pub fn load_factor(&self) -> f64 {
        if self.buckets.is_empty() {
            0.0
        } else {
            self.len as f64 / self.buckets.len() as f64
        }
    }

    /// First element in bucket order.
    pub fn first(&self) -> Option<K> {
        self.first_from(0)
    }

    fn first_from(&self, b: usize) -> Option<K> {
        self.buckets
            .get(b..)?
            .iter()
            .find(|bucket| !bucket.is_empty())
            .map(|bucket| bucket.head)
    }
}

impl<K: Index, A, C, H> Default for Table<K, A, C, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Index, A, C, H> fmt::Debug for Table<K, A, C, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("len", &self.len)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

impl<K, A, C, H> Table<K, A, C, H>
where
    K: Index,
    A: Keyed<TableLink<K>>,
    C: Compare<A::Key>,
    H: KeyHash<A::Key>,
{
    /// Inserts an unbound element at the front of its chain.
    ///
    /// # Panics
    ///
    /// Panics if the table has no buckets or `t` is already in a table.
    pub fn set<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(!self.buckets.is_empty(), "table has no buckets");
        assert!(!Self::link(storage, t).is_bound(), "element already in a table");
        debug_assert!(
            self.find(storage, A::key(storage.get(t).expect("invalid index"))).is_none(),
            "duplicate key"
        );

        let b = self.bucket_of(storage, t);
        self.push_front(storage, b, t);
        self.len += 1;
    }

    /// Looks up `key`, moving the hit to the front of its chain.
    pub fn get<S>(&mut self, storage: &mut S, key: &A::Key) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let b = self.index(key);

        let mut prev = K::NONE;
        let mut cur = self.buckets[b].head;
        while cur.is_some() {
            if Self::matches(storage, cur, key) {
                if prev.is_some() {
                    let (next, end) = Self::link(storage, cur).next.raw();
                    Self::link_mut(storage, prev).next.set(next, end);
                    let head = self.buckets[b].head;
                    Self::link_mut(storage, cur).next.set(head, false);
                    self.buckets[b].head = cur;
                }
                return Some(cur);
            }
            prev = cur;
            cur = Self::chain_next(storage, cur);
        }
        None
    }

    /// Looks up `key` without reordering the chain.
    pub fn find<S>(&self, storage: &S, key: &A::Key) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let mut cur = self.buckets[self.index(key)].head;
        while cur.is_some() {
            if Self::matches(storage, cur, key) {
                return Some(cur);
            }
            cur = Self::chain_next(storage, cur);
        }
        None
    }

    /// Head of the chain that `key` hashes to.
    pub fn chain_head(&self, key: &A::Key) -> Option<K> {
        if self.buckets.is_empty() {
            return None;
        }
        self.buckets[self.index(key)].head.to_option()
    }

    /// Removes `t`, returning it unbound.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not in a table.
    pub fn bus<S>(&mut self, storage: &mut S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(Self::link(storage, t).is_bound(), "element not in a table");
        debug_assert!(self.is_member(storage, t), "element is in another table");

        let b = Self::home(storage, t);
        let (next, end) = Self::link(storage, t).next.raw();
        if self.buckets[b].head == t {
            self.buckets[b].head = if end { K::NONE } else { next };
        } else {
            let mut prev = self.buckets[b].head;
            loop {
                let n = Self::chain_next(storage, prev);
                if n == t {
                    break;
                }
                assert!(n.is_some(), "element is not in its bucket");
                prev = n;
            }
            Self::link_mut(storage, prev).next.set(next, end);
        }
        Self::link_mut(storage, t).next.clear();
        self.len -= 1;
        t
    }

    /// Returns `true` if `t` is in this table.
    pub fn is_member<S>(&self, storage: &S, t: K) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        if !Self::link(storage, t).is_bound() {
            return false;
        }
        let b = Self::home(storage, t);
        let Some(bucket) = self.buckets.get(b) else {
            return false;
        };
        let mut cur = bucket.head;
        while cur.is_some() {
            if cur == t {
                return true;
            }
            cur = Self::chain_next(storage, cur);
        }
        false
    }

    /// Next element in bucket order.
    pub fn next<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        let (next, end) = Self::link(storage, t).next.raw();
        if end {
            self.first_from(next.as_usize() + 1)
        } else {
            Some(next)
        }
    }

    pub fn iter<'a, S>(&'a self, storage: &'a S) -> Iter<'a, K, A, C, H, S>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Iter {
            table: self,
            storage,
            next: self.first(),
        }
    }

    /// Redistributes every element into `buckets`, returning the old ones.
    ///
    /// No allocation happens here: elements are threaded through their own
    /// links while in flight.
    ///
    /// # Panics
    ///
    /// Panics if `buckets` is not all empty, is too large for `K`, or is empty
    /// while the table is not.
    pub fn rehash<S>(&mut self, storage: &mut S, buckets: Vec<Bucket<K>>) -> Vec<Bucket<K>>
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(buckets.iter().all(Bucket::is_empty), "new buckets must be empty");
        assert!(
            buckets.len() <= K::NONE.as_usize(),
            "bucket count exceeds index type maximum"
        );
        assert!(
            !buckets.is_empty() || self.len == 0,
            "cannot rehash a non-empty table into zero buckets"
        );

        let mut pending = K::NONE;
        for b in 0..self.buckets.len() {
            let mut cur = core::mem::replace(&mut self.buckets[b].head, K::NONE);
            while cur.is_some() {
                let next = Self::chain_next(storage, cur);
                Self::link_mut(storage, cur).next.set(pending, false);
                pending = cur;
                cur = next;
            }
        }

        let from = self.buckets.len();
        let old = core::mem::replace(&mut self.buckets, buckets);

        while pending.is_some() {
            let t = pending;
            pending = Self::link(storage, t).next.slot();
            Self::link_mut(storage, t).next.clear();
            let b = self.bucket_of(storage, t);
            self.push_front(storage, b, t);
        }

        tracing::debug!(from, to = self.buckets.len(), len = self.len, "table rehash");
        old
    }

    /// Resizes to `n` buckets, allocating them here. `n == 0` dehashes.
    pub fn reseat<S>(&mut self, storage: &mut S, n: usize) -> Result<()>
    where
        S: Storage<A::Elem, Index = K>,
    {
        if n == 0 {
            self.dehash(storage);
            return Ok(());
        }
        let max = K::NONE.as_usize();
        if n > max {
            return Err(Error::TooManyBuckets { buckets: n, max });
        }

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(n)
            .map_err(|source| Error::Alloc { buckets: n, source })?;
        buckets.resize(n, Bucket::new());

        tracing::debug!(buckets = n, "table reseat");
        self.rehash(storage, buckets);
        Ok(())
    }

    /// Drops all buckets, returning them. The table must be empty.
    pub fn dehash<S>(&mut self, storage: &mut S) -> Vec<Bucket<K>>
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(self.is_empty(), "cannot dehash a non-empty table");
        self.rehash(storage, Vec::new())
    }

    /// Removes every element, handing each to `wipe` after it is unbound.
    pub fn polish<S, F>(&mut self, storage: &mut S, mut wipe: F)
    where
        S: Storage<A::Elem, Index = K>,
        F: FnMut(&mut S, K),
    {
        for b in 0..self.buckets.len() {
            let mut cur = core::mem::replace(&mut self.buckets[b].head, K::NONE);
            while cur.is_some() {
                let next = Self::chain_next(storage, cur);
                Self::link_mut(storage, cur).next.clear();
                self.len -= 1;
                wipe(storage, cur);
                cur = next;
            }
        }
        debug_assert_eq!(self.len, 0);
    }

    /// Unbinds every element, leaving them in storage.
    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        self.polish(storage, |_, _| {});
    }

    /// Checks that every element sits in the bucket its key hashes to and
    /// that the count matches.
    pub fn is_valid<S>(&self, storage: &S) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        let mut count = 0;
        for (b, bucket) in self.buckets.iter().enumerate() {
            let mut cur = bucket.head;
            while cur.is_some() {
                if self.bucket_of(storage, cur) != b || Self::home(storage, cur) != b {
                    return false;
                }
                count += 1;
                cur = Self::chain_next(storage, cur);
            }
        }
        count == self.len
    }

    // =========================================================================
    // Internals
    // =========================================================================

    #[inline]
    fn index(&self, key: &A::Key) -> usize {
        (H::hash(key) % self.buckets.len() as u64) as usize
    }

    #[inline]
    fn bucket_of<S>(&self, storage: &S, t: K) -> usize
    where
        S: Storage<A::Elem, Index = K>,
    {
        self.index(A::key(storage.get(t).expect("invalid index")))
    }

    #[inline]
    fn matches<S>(storage: &S, t: K, key: &A::Key) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        C::compare(key, A::key(storage.get(t).expect("invalid index"))) == Ordering::Equal
    }

    #[inline]
    fn link<S>(storage: &S, t: K) -> &TableLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link(storage.get(t).expect("invalid index"))
    }

    #[inline]
    fn link_mut<S>(storage: &mut S, t: K) -> &mut TableLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link_mut(storage.get_mut(t).expect("invalid index"))
    }

    /// Next element in the chain, `NONE` at the end.
    #[inline]
    fn chain_next<S>(storage: &S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        let (next, end) = Self::link(storage, t).next.raw();
        if end { K::NONE } else { next }
    }

    /// Bucket number recorded at the end of `t`'s chain.
    fn home<S>(storage: &S, mut t: K) -> usize
    where
        S: Storage<A::Elem, Index = K>,
    {
        loop {
            let (next, end) = Self::link(storage, t).next.raw();
            if end {
                return next.as_usize();
            }
            t = next;
        }
    }

    fn push_front<S>(&mut self, storage: &mut S, b: usize, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let head = self.buckets[b].head;
        if head.is_none() {
            Self::link_mut(storage, t).next.set(K::from_usize(b), true);
        } else {
            Self::link_mut(storage, t).next.set(head, false);
        }
        self.buckets[b].head = t;
    }
}

/// Iterator over a table's element indices in bucket order.
pub struct Iter<'a, K: Index, A, C, H, S> {
    table: &'a Table<K, A, C, H>,
    storage: &'a S,
    next: Option<K>,
}

impl<K, A, C, H, S> Iterator for Iter<'_, K, A, C, H, S>
where
    K: Index,
    A: Keyed<TableLink<K>>,
    C: Compare<A::Key>,
    H: KeyHash<A::Key>,
    S: Storage<A::Elem, Index = K>,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let t = self.next?;
        self.next = self.table.next(self.storage, t);
        Some(t)
    }
}
