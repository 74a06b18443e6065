//! Intrusive disjoint sets (union-find) with member enumeration.
//!
//! Every member's [`SetLink`] holds a parent pointer for the union-find
//! forest and a next pointer threading all members into one list, so a set
//! can both answer "which set is this in?" and walk its members.
//!
//! The forest root's parent link is tagged and empty. Lookups follow
//! parents up to it, compressing the path as they go, and name a set by its
//! root element. A set always holds its own root, so `archetype(t) ==
//! set.root()` is the membership test.

use core::fmt;
use core::marker::PhantomData;

use crate::link::{Adapter, Link, TaggedLink};
use crate::{Index, Storage};

/// Set link embedded in an element.
#[derive(Debug)]
pub struct SetLink<K: Index> {
    /// Parent member; tagged and empty at the root.
    parent: TaggedLink<K>,
    next: Link<K>,
}

impl<K: Index> SetLink<K> {
    pub const fn new() -> Self {
        Self {
            parent: TaggedLink::new(),
            next: Link::new(),
        }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.parent.is_bound()
    }
}

impl<K: Index> Default for SetLink<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// A disjoint set.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{adapter, BoxedStorage, Set, SetLink, Storage};
///
/// struct City {
///     link: SetLink<u32>,
/// }
///
/// adapter! {
///     struct Region: City => link: SetLink<u32>;
/// }
///
/// let mut storage: BoxedStorage<City> = BoxedStorage::with_capacity(8);
/// let mut north: Set<u32, Region> = Set::new();
/// let mut south: Set<u32, Region> = Set::new();
///
/// let a = storage.try_insert(City { link: SetLink::new() }).unwrap();
/// let b = storage.try_insert(City { link: SetLink::new() }).unwrap();
/// north.join(&mut storage, a);
/// south.join(&mut storage, b);
/// assert_eq!(Set::<u32, Region>::archetype(&mut storage, b), b);
/// assert_eq!(south.root(), Some(b));
///
/// north.conjoin(&mut storage, &mut south);
/// assert!(north.contains(&mut storage, b));
/// assert!(south.is_empty());
///
/// north.dissolve(&mut storage);
/// ```
pub struct Set<K: Index, A> {
    head: K,
    tail: K,
    rank: u32,
    len: usize,
    _marker: PhantomData<fn() -> A>,
}

impl<K: Index, A> Set<K, A> {
    pub const fn new() -> Self {
        Self {
            head: K::NONE,
            tail: K::NONE,
            rank: 0,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Upper bound on the forest height.
    #[inline]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// The forest root. [`Set::archetype`] of every member returns it.
    #[inline]
    pub fn root(&self) -> Option<K> {
        self.head.to_option()
    }

    /// First member in enumeration order, which is also the root.
    #[inline]
    pub fn first(&self) -> Option<K> {
        self.head.to_option()
    }
}

impl<K: Index, A> Default for Set<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Index, A> fmt::Debug for Set<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Set")
            .field("root", &self.head.to_option())
            .field("len", &self.len)
            .field("rank", &self.rank)
            .finish()
    }
}

impl<K, A> Set<K, A>
where
    K: Index,
    A: Adapter<SetLink<K>>,
{
    /// Adds an unbound element.
    ///
    /// # Panics
    ///
    /// Panics if `t` is already in a set.
    pub fn join<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(!Self::link(storage, t).is_bound(), "element already in a set");

        if self.head.is_none() {
            Self::link_mut(storage, t).parent.set(K::NONE, true);
            self.rank = self.rank.max(1);
            self.head = t;
        } else {
            Self::link_mut(storage, t).parent.set(self.head, false);
            Self::link_mut(storage, self.tail).next.set(t);
        }
        self.tail = t;
        self.len += 1;
    }

    /// Finds the root of the forest `t` belongs to, compressing the path.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not in a set.
    pub fn archetype<S>(storage: &mut S, mut t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(Self::link(storage, t).is_bound(), "element not in a set");
        loop {
            let (p, root) = Self::link(storage, t).parent.raw();
            if root {
                return t;
            }
            let (gp, p_root) = Self::link(storage, p).parent.raw();
            if !p_root {
                Self::link_mut(storage, t).parent.set(gp, false);
            }
            t = p;
        }
    }

    /// Returns `true` if `t` is a member of this set.
    pub fn contains<S>(&self, storage: &mut S, t: K) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        self.head.is_some()
            && Self::link(storage, t).is_bound()
            && Self::archetype(storage, t) == self.head
    }

    /// Moves every member of `other` into this set.
    ///
    /// The lower-ranked forest is hung under the other's root, and its
    /// members are enumerated after the higher-ranked set's.
    pub fn conjoin<S>(&mut self, storage: &mut S, other: &mut Self)
    where
        S: Storage<A::Elem, Index = K>,
    {
        if other.is_empty() {
            return;
        }
        let moved = other.len;

        if self.is_empty() || self.rank < other.rank {
            core::mem::swap(&mut self.head, &mut other.head);
            core::mem::swap(&mut self.tail, &mut other.tail);
            core::mem::swap(&mut self.rank, &mut other.rank);
        } else if self.rank == other.rank {
            self.rank += 1;
        }

        if other.head.is_some() {
            Self::link_mut(storage, other.head).parent.set(self.head, false);
            Self::link_mut(storage, self.tail).next.set(other.head);
            self.tail = other.tail;
        }

        self.len += moved;
        other.head = K::NONE;
        other.tail = K::NONE;
        other.rank = 0;
        other.len = 0;

        tracing::debug!(root = self.head.as_usize(), moved, len = self.len, "set conjoin");
    }

    /// Empties the set, unbinding every member.
    pub fn dissolve<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        self.dissolve_with(storage, |_, _| {});
    }

    /// Empties the set, handing each member to `f` after it is unbound.
    pub fn dissolve_with<S, F>(&mut self, storage: &mut S, mut f: F)
    where
        S: Storage<A::Elem, Index = K>,
        F: FnMut(&mut S, K),
    {
        let dissolved = self.len;
        let mut t = core::mem::replace(&mut self.head, K::NONE);
        while t.is_some() {
            let link = Self::link_mut(storage, t);
            let next = link.next.take();
            link.parent.clear();
            f(storage, t);
            t = next;
        }
        self.tail = K::NONE;
        self.rank = 0;
        self.len = 0;

        tracing::debug!(dissolved, "set dissolve");
    }

    /// Next member in enumeration order.
    pub fn next<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link(storage, t).next.get().to_option()
    }

    pub fn iter<'a, S>(&self, storage: &'a S) -> Iter<'a, K, A, S>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Iter {
            storage,
            next: self.head,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn link<S>(storage: &S, t: K) -> &SetLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link(storage.get(t).expect("invalid index"))
    }

    #[inline]
    fn link_mut<S>(storage: &mut S, t: K) -> &mut SetLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link_mut(storage.get_mut(t).expect("invalid index"))
    }
}

/// Iterator over a set's members in enumeration order.
pub struct Iter<'a, K: Index, A, S> {
    storage: &'a S,
    next: K,
    _marker: PhantomData<fn() -> A>,
}

impl<K, A, S> Iterator for Iter<'_, K, A, S>
where
    K: Index,
    A: Adapter<SetLink<K>>,
    S: Storage<A::Elem, Index = K>,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let t = self.next.to_option()?;
        self.next = Set::<K, A>::link(self.storage, t).next.get();
        Some(t)
    }
}
