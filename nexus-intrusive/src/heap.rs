//! Intrusive pairing heap over external storage.
//!
//! Elements embed a [`HeapLink`]. The heap itself is only a root index and
//! a count, so it never allocates, and decrease-key is O(1) amortized
//! ([`Heap::rehume`]). Removal from the middle ([`Heap::sift`]) works from
//! the element's own index.
//!
//! Each element keeps a link to its leftmost child and one to its next
//! sibling. The last sibling has no next, so that link is tagged and points
//! back at the parent instead. Getting from a node to its parent therefore
//! walks the sibling run to its tagged end.

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

use crate::key::{Ascending, Compare};
use crate::link::{Keyed, Link, TaggedLink};
use crate::{Index, Storage};

/// Heap link embedded in an element.
#[derive(Debug)]
pub struct HeapLink<K: Index> {
    /// Next sibling, or (tagged) the parent when this is the last sibling.
    sibling: TaggedLink<K>,
    child: Link<K>,
}

impl<K: Index> HeapLink<K> {
    pub const fn new() -> Self {
        Self {
            sibling: TaggedLink::new(),
            child: Link::new(),
        }
    }

    /// Returns `true` while the element is in a heap.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.sibling.is_bound()
    }
}

impl<K: Index> Default for HeapLink<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// A pairing heap.
///
/// `C` orders the keys; the element comparing least sits at the root. Use
/// [`Descending`](crate::Descending) for a max-heap.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{adapter, BoxedStorage, Heap, HeapLink, Storage};
///
/// struct Timer {
///     deadline: u64,
///     link: HeapLink<u32>,
/// }
///
/// adapter! {
///     struct ByDeadline: Timer => link: HeapLink<u32>, key deadline: u64;
/// }
///
/// let mut storage: BoxedStorage<Timer> = BoxedStorage::with_capacity(16);
/// let mut timers: Heap<u32, ByDeadline> = Heap::new();
///
/// for deadline in [30, 10, 20] {
///     let t = storage.try_insert(Timer { deadline, link: HeapLink::new() }).unwrap();
///     timers.inhume(&mut storage, t);
/// }
///
/// // Pull the 30 forward.
/// let late = timers.iter(&storage).find(|&t| storage.get(t).unwrap().deadline == 30).unwrap();
/// storage.get_mut(late).unwrap().deadline = 5;
/// timers.churn(&mut storage, late);
///
/// let mut order = Vec::new();
/// while let Some(t) = timers.exhume(&mut storage) {
///     order.push(storage.get(t).unwrap().deadline);
/// }
/// assert_eq!(order, vec![5, 10, 20]);
/// ```
pub struct Heap<K: Index, A, C = Ascending> {
    root: K,
    len: usize,
    _marker: PhantomData<fn() -> (A, C)>,
}

impl<K: Index, A, C> Heap<K, A, C> {
    pub const fn new() -> Self {
        Self {
            root: K::NONE,
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
        self.root.is_none()
    }

    /// Returns the least element without removing it.
    #[inline]
    pub fn peek(&self) -> Option<K> {
        self.root.to_option()
    }
}

impl<K: Index, A, C> Default for Heap<K, A, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Index, A, C> fmt::Debug for Heap<K, A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("root", &self.root)
            .field("len", &self.len)
            .finish()
    }
}

impl<K, A, C> Heap<K, A, C>
where
    K: Index,
    A: Keyed<HeapLink<K>>,
    C: Compare<A::Key>,
{
    /// Inserts an unbound element.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not in storage or already in a heap.
    pub fn inhume<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(!Self::link(storage, t).is_bound(), "element already in a heap");

        Self::link_parent(storage, K::NONE, t);
        self.root = if self.root.is_none() {
            t
        } else {
            Self::meld_nodes(storage, self.root, t)
        };
        self.len += 1;

        debug_validate!(self.is_valid(storage));
    }

    /// Removes and returns the least element.
    pub fn exhume<S>(&mut self, storage: &mut S) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        if self.root.is_none() {
            return None;
        }
        let m = self.take_root(storage);
        debug_validate!(self.is_valid(storage));
        Some(m)
    }

    /// Moves every element of `other` into this heap in O(1).
    pub fn meld<S>(&mut self, storage: &mut S, other: &mut Self)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let r = core::mem::replace(&mut other.root, K::NONE);
        if r.is_some() {
            self.root = if self.root.is_none() {
                r
            } else {
                Self::meld_nodes(storage, self.root, r)
            };
        }
        tracing::trace!(moved = other.len, len = self.len + other.len, "heap meld");
        self.len += core::mem::take(&mut other.len);

        debug_validate!(self.is_valid(storage));
    }

    /// Removes an arbitrary element.
    ///
    /// Its children are paired among themselves and re-attached to its
    /// parent, so the rest of the heap is untouched.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not in a heap.
    pub fn sift<S>(&mut self, storage: &mut S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(Self::link(storage, t).is_bound(), "element not in a heap");

        if t == self.root {
            self.take_root(storage);
        } else {
            let p = Self::parent(storage, t);
            Self::orphan(storage, t, p);
            self.len -= 1;
        }

        debug_validate!(self.is_valid(storage));
        t
    }

    /// Restores order after `t`'s key decreased.
    ///
    /// Returns `false` and does nothing if `t` is the root or its key still
    /// does not sort before its parent's. Otherwise `t` and its subtree are
    /// cut loose and melded with the root.
    pub fn rehume<S>(&mut self, storage: &mut S, t: K) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        debug_assert!(Self::link(storage, t).is_bound(), "element not in a heap");

        if t == self.root {
            return false;
        }
        let p = Self::parent(storage, t);
        if Self::cmp(storage, p, t) != Ordering::Greater {
            return false;
        }

        Self::cut(storage, t, p);
        Self::link_parent(storage, K::NONE, t);
        self.root = Self::meld_nodes(storage, self.root, t);

        debug_validate!(self.is_valid(storage));
        true
    }

    /// Inserts `t` if it is unbound, otherwise treats it as a decreased key.
    ///
    /// Returns `true` if the heap changed shape.
    pub fn churn<S>(&mut self, storage: &mut S, t: K) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        if Self::link(storage, t).is_bound() {
            self.rehume(storage, t)
        } else {
            self.inhume(storage, t);
            true
        }
    }

    /// Restores order after `t`'s key increased.
    ///
    /// `t`'s children are paired into one subtree; if that subtree now
    /// sorts before `t` it is hoisted beside `t` (or above it at the root).
    pub fn bury<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(Self::link(storage, t).is_bound(), "element not in a heap");

        if Self::child(storage, t).is_none() {
            return;
        }
        let cs = Self::pass(storage, t);
        if Self::cmp(storage, t, cs) != Ordering::Greater {
            Self::make_child(storage, t, cs);
        } else if t == self.root {
            Self::link_parent(storage, K::NONE, cs);
            self.root = Self::meld_nodes(storage, t, cs);
        } else {
            Self::make_sibling(storage, t, cs);
        }

        debug_validate!(self.is_valid(storage));
    }

    /// Preorder successor of `t`, for visiting every element.
    pub fn next<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::successor(storage, t).to_option()
    }

    pub fn iter<'a, S>(&self, storage: &'a S) -> Iter<'a, K, A, C, S>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Iter {
            storage,
            next: self.root,
            _marker: PhantomData,
        }
    }

    /// Unbinds every element, leaving them in storage.
    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let mut pending = core::mem::replace(&mut self.root, K::NONE);
        if pending.is_some() {
            // Reuse the sibling slot as an explicit stack.
            Self::link_sibling(storage, pending, K::NONE);
        }
        while pending.is_some() {
            let t = pending;
            pending = Self::link(storage, t).sibling.slot();
            let mut c = Self::link_mut(storage, t).child.take();
            while c.is_some() {
                let s = Self::sibling(storage, c);
                Self::link_sibling(storage, c, pending);
                pending = c;
                c = s;
            }
            Self::link_mut(storage, t).sibling.clear();
        }
        self.len = 0;
    }

    /// Checks heap order and link consistency. O(n²) in the worst case.
    pub fn is_valid<S>(&self, storage: &S) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        if self.root.is_none() {
            return self.len == 0;
        }
        let root = Self::link(storage, self.root);
        if !root.sibling.is_tagged() || root.sibling.slot().is_some() {
            return false;
        }

        let mut count = 0;
        let mut stack = vec![self.root];
        while let Some(t) = stack.pop() {
            count += 1;
            let mut c = Self::child(storage, t);
            while c.is_some() {
                if Self::cmp(storage, c, t) == Ordering::Less || Self::parent(storage, c) != t {
                    return false;
                }
                stack.push(c);
                c = Self::sibling(storage, c);
            }
        }
        count == self.len
    }

    // =========================================================================
    // Internals
    // =========================================================================

    #[inline]
    fn link<S>(storage: &S, t: K) -> &HeapLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link(storage.get(t).expect("invalid index"))
    }

    #[inline]
    fn link_mut<S>(storage: &mut S, t: K) -> &mut HeapLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link_mut(storage.get_mut(t).expect("invalid index"))
    }

    #[inline]
    fn cmp<S>(storage: &S, a: K, b: K) -> Ordering
    where
        S: Storage<A::Elem, Index = K>,
    {
        let a = A::key(storage.get(a).expect("invalid index"));
        let b = A::key(storage.get(b).expect("invalid index"));
        C::compare(a, b)
    }

    #[inline]
    fn child<S>(storage: &S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link(storage, t).child.get()
    }

    /// Next sibling, `NONE` for the last one.
    #[inline]
    fn sibling<S>(storage: &S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        let (s, last) = Self::link(storage, t).sibling.raw();
        if last { K::NONE } else { s }
    }

    fn parent<S>(storage: &S, mut t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        loop {
            let s = Self::sibling(storage, t);
            if s.is_none() {
                return Self::link(storage, t).sibling.slot();
            }
            t = s;
        }
    }

    fn successor<S>(storage: &S, mut t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        let c = Self::child(storage, t);
        if c.is_some() {
            return c;
        }
        while t.is_some() {
            let s = Self::sibling(storage, t);
            if s.is_some() {
                return s;
            }
            t = Self::link(storage, t).sibling.slot();
        }
        K::NONE
    }

    #[inline]
    fn link_parent<S>(storage: &mut S, p: K, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link_mut(storage, t).sibling.set(p, true);
    }

    #[inline]
    fn link_sibling<S>(storage: &mut S, t: K, s: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link_mut(storage, t).sibling.set(s, false);
    }

    /// Makes `c` the leftmost child of `p`.
    fn make_child<S>(storage: &mut S, p: K, c: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let first = Self::child(storage, p);
        if first.is_some() {
            Self::link_sibling(storage, c, first);
        } else {
            Self::link_parent(storage, p, c);
        }
        Self::link_mut(storage, p).child.set(c);
    }

    /// Inserts `s` right after `t` in `t`'s sibling run.
    fn make_sibling<S>(storage: &mut S, t: K, s: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let (next, last) = Self::link(storage, t).sibling.raw();
        Self::link_mut(storage, s).sibling.set(next, last);
        Self::link_sibling(storage, t, s);
    }

    /// Links two roots; the loser becomes the winner's first child.
    fn meld_nodes<S>(storage: &mut S, a: K, b: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        let (winner, loser) = if Self::cmp(storage, b, a) == Ordering::Less {
            (b, a)
        } else {
            (a, b)
        };
        Self::make_child(storage, winner, loser);
        winner
    }

    /// Detaches the first child of `t`, returning it with a clear sibling.
    fn take_child<S>(storage: &mut S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        let c = Self::child(storage, t);
        let rest = Self::sibling(storage, c);
        Self::link_mut(storage, t).child.set(rest);
        Self::link_sibling(storage, c, K::NONE);
        c
    }

    /// Pairs off `t`'s children left to right, then melds the pairs right to
    /// left. Leaves `t` childless and returns the merged subtree root.
    fn pass<S>(storage: &mut S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        let mut pairs = K::NONE;
        while Self::child(storage, t).is_some() {
            let mut c = Self::take_child(storage, t);
            if Self::child(storage, t).is_some() {
                let d = Self::take_child(storage, t);
                c = Self::meld_nodes(storage, c, d);
            }
            Self::link_sibling(storage, c, pairs);
            pairs = c;
        }

        let mut r = pairs;
        let mut rest = Self::link(storage, r).sibling.slot();
        Self::link_sibling(storage, r, K::NONE);
        while rest.is_some() {
            let s = rest;
            rest = Self::link(storage, s).sibling.slot();
            Self::link_sibling(storage, s, K::NONE);
            r = Self::meld_nodes(storage, r, s);
        }
        r
    }

    /// Removes `t` (a non-root) from its parent `p`'s child run, keeping
    /// `t`'s own subtree.
    fn cut<S>(storage: &mut S, t: K, p: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        if Self::child(storage, p) == t {
            Self::take_child(storage, p);
            return;
        }

        let mut s = Self::child(storage, p);
        while Self::sibling(storage, s) != t {
            s = Self::sibling(storage, s);
        }
        let (next, last) = Self::link(storage, t).sibling.raw();
        Self::link_mut(storage, s).sibling.set(next, last);
        Self::link_sibling(storage, t, K::NONE);
    }

    /// Cuts `t` from `p` and hands its paired children to `p`.
    fn orphan<S>(storage: &mut S, t: K, p: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::cut(storage, t, p);
        if Self::child(storage, t).is_some() {
            let r = Self::pass(storage, t);
            Self::make_child(storage, p, r);
        }
        Self::link_mut(storage, t).sibling.clear();
    }

    fn take_root<S>(&mut self, storage: &mut S) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        let m = core::mem::replace(&mut self.root, K::NONE);
        if Self::child(storage, m).is_some() {
            let r = Self::pass(storage, m);
            Self::link_parent(storage, K::NONE, r);
            self.root = r;
        }
        Self::link_mut(storage, m).sibling.clear();
        self.len -= 1;
        m
    }
}

/// Preorder iterator over a heap's element indices.
pub struct Iter<'a, K: Index, A, C, S> {
    storage: &'a S,
    next: K,
    _marker: PhantomData<fn() -> (A, C)>,
}

impl<K, A, C, S> Iterator for Iter<'_, K, A, C, S>
where
    K: Index,
    A: Keyed<HeapLink<K>>,
    C: Compare<A::Key>,
    S: Storage<A::Elem, Index = K>,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let t = self.next.to_option()?;
        self.next = Heap::<K, A, C>::successor(self.storage, t);
        Some(t)
    }
}
