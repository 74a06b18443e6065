//! Intrusive circular doubly-linked list.
//!
//! The list is a ring: the last element's `next` is the head and the head's
//! `prev` is the last element. A single element links to itself both ways.
//! Because there are no ends, the head can be rotated in O(1) with
//! [`List::prograde`] and [`List::retrograde`].

use core::fmt;
use core::marker::PhantomData;

use crate::link::{Adapter, Link};
use crate::{Index, Storage};

/// Ring link embedded in an element.
#[derive(Debug, Default)]
pub struct ListLink<K: Index> {
    next: Link<K>,
    prev: Link<K>,
}

impl<K: Index> ListLink<K> {
    pub const fn new() -> Self {
        Self {
            next: Link::new(),
            prev: Link::new(),
        }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.next.is_bound()
    }
}

/// A circular doubly-linked list.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{adapter, BoxedStorage, List, ListLink, Storage};
///
/// struct Seat {
///     name: char,
///     link: ListLink<u32>,
/// }
///
/// adapter! {
///     struct Seating: Seat => link: ListLink<u32>;
/// }
///
/// let mut storage: BoxedStorage<Seat> = BoxedStorage::with_capacity(4);
/// let mut ring: List<u32, Seating> = List::new();
/// for name in ['a', 'b', 'c'] {
///     let s = storage.try_insert(Seat { name, link: ListLink::new() }).unwrap();
///     ring.enlist(&mut storage, s, None);
/// }
///
/// ring.prograde(&storage);
/// let names: String = ring.iter(&storage).map(|s| storage.get(s).unwrap().name).collect();
/// assert_eq!(names, "bca");
///
/// ring.clear(&mut storage);
/// ```
pub struct List<K: Index, A> {
    head: K,
    len: usize,
    _marker: PhantomData<fn() -> A>,
}

impl<K: Index, A> List<K, A> {
    pub const fn new() -> Self {
        Self {
            head: K::NONE,
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
        self.head.is_none()
    }

    #[inline]
    pub fn first(&self) -> Option<K> {
        self.head.to_option()
    }
}

impl<K: Index, A> Default for List<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Index, A> fmt::Debug for List<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("head", &self.head)
            .field("len", &self.len)
            .finish()
    }
}

impl<K, A> List<K, A>
where
    K: Index,
    A: Adapter<ListLink<K>>,
{
    /// Inserts `t` before `before`, or at the end of the ring for `None`.
    ///
    /// Inserting before the head makes `t` the new head.
    ///
    /// # Panics
    ///
    /// Panics if `t` is already in a list.
    pub fn enlist<S>(&mut self, storage: &mut S, t: K, before: Option<K>)
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(!Self::link(storage, t).is_bound(), "element already in a list");

        if self.head.is_none() {
            debug_assert!(before.is_none(), "enlist before a foreign element");
            let link = Self::link_mut(storage, t);
            link.next.set(t);
            link.prev.set(t);
            self.head = t;
            self.len = 1;
            return;
        }

        let at = before.unwrap_or(self.head);
        Self::splice_before(storage, t, at);
        if before == Some(self.head) {
            self.head = t;
        }
        self.len += 1;
    }

    /// Inserts `t` directly after `after`. The head does not change.
    ///
    /// # Panics
    ///
    /// Panics if `t` is already in a list.
    pub fn enlist_after<S>(&mut self, storage: &mut S, t: K, after: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(!Self::link(storage, t).is_bound(), "element already in a list");
        let at = Self::link(storage, after).next.get();
        Self::splice_before(storage, t, at);
        self.len += 1;
    }

    /// Removes `t` from the ring. If `t` was the head, its successor takes
    /// over.
    pub fn delist<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let link = Self::link_mut(storage, t);
        let next = link.next.take();
        let prev = link.prev.take();

        if next == t {
            self.head = K::NONE;
        } else {
            Self::link_mut(storage, prev).next.set(next);
            Self::link_mut(storage, next).prev.set(prev);
            if self.head == t {
                self.head = next;
            }
        }
        self.len -= 1;
    }

    /// Element before the head.
    pub fn last<S>(&self, storage: &S) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        let head = self.head.to_option()?;
        Some(Self::link(storage, head).prev.get())
    }

    /// Successor of `t`, or `None` once the ring wraps to the head.
    pub fn next<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        let n = Self::link(storage, t).next.get();
        if n == self.head { None } else { Some(n) }
    }

    /// Predecessor of `t`, or `None` at the head.
    pub fn previous<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        if t == self.head {
            None
        } else {
            Some(Self::link(storage, t).prev.get())
        }
    }

    /// Rotates the head one step forward.
    pub fn prograde<S>(&mut self, storage: &S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        if let Some(head) = self.head.to_option() {
            self.head = Self::link(storage, head).next.get();
        }
    }

    /// Rotates the head one step backward.
    pub fn retrograde<S>(&mut self, storage: &S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        if let Some(head) = self.head.to_option() {
            self.head = Self::link(storage, head).prev.get();
        }
    }

    pub fn iter<'a, S>(&self, storage: &'a S) -> Iter<'a, K, A, S>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Iter {
            storage,
            head: self.head,
            next: self.head,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let mut cur = self.head;
        while cur.is_some() {
            let link = Self::link_mut(storage, cur);
            let next = link.next.take();
            link.prev.take();
            cur = if next == self.head { K::NONE } else { next };
        }
        self.head = K::NONE;
        self.len = 0;
    }

    fn splice_before<S>(storage: &mut S, t: K, at: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let prev = Self::link(storage, at).prev.get();
        let link = Self::link_mut(storage, t);
        link.next.set(at);
        link.prev.set(prev);
        Self::link_mut(storage, prev).next.set(t);
        Self::link_mut(storage, at).prev.set(t);
    }

    #[inline]
    fn link<S>(storage: &S, t: K) -> &ListLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link(storage.get(t).expect("invalid index"))
    }

    #[inline]
    fn link_mut<S>(storage: &mut S, t: K) -> &mut ListLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link_mut(storage.get_mut(t).expect("invalid index"))
    }
}

/// Iterator over one full turn of the ring, starting at the head.
pub struct Iter<'a, K: Index, A, S> {
    storage: &'a S,
    head: K,
    next: K,
    remaining: usize,
    _marker: PhantomData<fn() -> A>,
}

impl<K, A, S> Iterator for Iter<'_, K, A, S>
where
    K: Index,
    A: Adapter<ListLink<K>>,
    S: Storage<A::Elem, Index = K>,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let t = self.next.to_option()?;
        let n = List::<K, A>::link(self.storage, t).next.get();
        self.next = if n == self.head { K::NONE } else { n };
        self.remaining -= 1;
        Some(t)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, A, S> ExactSizeIterator for Iter<'_, K, A, S>
where
    K: Index,
    A: Adapter<ListLink<K>>,
    S: Storage<A::Elem, Index = K>,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxedStorage;

    struct Node {
        value: u32,
        link: ListLink<u32>,
    }

    crate::adapter! {
        struct Ring: Node => link: ListLink<u32>;
    }

    fn node(storage: &mut BoxedStorage<Node>, value: u32) -> u32 {
        storage
            .try_insert(Node {
                value,
                link: ListLink::new(),
            })
            .unwrap()
    }

    fn values(list: &List<u32, Ring>, storage: &BoxedStorage<Node>) -> Vec<u32> {
        list.iter(storage).map(|t| storage.get(t).unwrap().value).collect()
    }

    #[test]
    fn enlist_positions() {
        let mut storage: BoxedStorage<Node> = BoxedStorage::with_capacity(8);
        let mut list: List<u32, Ring> = List::new();

        let a = node(&mut storage, 1);
        let b = node(&mut storage, 2);
        let c = node(&mut storage, 3);
        let d = node(&mut storage, 4);
        let e = node(&mut storage, 5);

        list.enlist(&mut storage, b, None);
        list.enlist(&mut storage, d, None);
        list.enlist(&mut storage, a, Some(b));
        list.enlist(&mut storage, c, Some(d));
        list.enlist_after(&mut storage, e, d);

        assert_eq!(values(&list, &storage), vec![1, 2, 3, 4, 5]);
        assert_eq!(list.len(), 5);
        assert_eq!(list.first(), Some(a));
        assert_eq!(list.last(&storage), Some(e));
        assert_eq!(list.iter(&storage).len(), 5);

        list.clear(&mut storage);
        assert!(list.is_empty());
        assert!(!storage.get(c).unwrap().link.is_bound());
    }

    #[test]
    fn navigation_stops_at_head() {
        let mut storage: BoxedStorage<Node> = BoxedStorage::with_capacity(4);
        let mut list: List<u32, Ring> = List::new();
        let a = node(&mut storage, 1);
        let b = node(&mut storage, 2);
        list.enlist(&mut storage, a, None);
        list.enlist(&mut storage, b, None);

        assert_eq!(list.next(&storage, a), Some(b));
        assert_eq!(list.next(&storage, b), None);
        assert_eq!(list.previous(&storage, b), Some(a));
        assert_eq!(list.previous(&storage, a), None);

        list.clear(&mut storage);
    }

    #[test]
    fn rotation() {
        let mut storage: BoxedStorage<Node> = BoxedStorage::with_capacity(4);
        let mut list: List<u32, Ring> = List::new();
        for v in 1..=3 {
            let t = node(&mut storage, v);
            list.enlist(&mut storage, t, None);
        }

        list.prograde(&storage);
        assert_eq!(values(&list, &storage), vec![2, 3, 1]);
        list.retrograde(&storage);
        list.retrograde(&storage);
        assert_eq!(values(&list, &storage), vec![3, 1, 2]);

        list.clear(&mut storage);

        // Rotating an empty ring is a no-op.
        list.prograde(&storage);
        assert!(list.first().is_none());
    }

    #[test]
    fn delist_head_and_middle() {
        let mut storage: BoxedStorage<Node> = BoxedStorage::with_capacity(4);
        let mut list: List<u32, Ring> = List::new();
        let t: Vec<u32> = (1..=4).map(|v| node(&mut storage, v)).collect();
        for &x in &t {
            list.enlist(&mut storage, x, None);
        }

        list.delist(&mut storage, t[0]);
        assert_eq!(list.first(), Some(t[1]));
        list.delist(&mut storage, t[2]);
        assert_eq!(values(&list, &storage), vec![2, 4]);
        assert!(!storage.get(t[2]).unwrap().link.is_bound());

        list.delist(&mut storage, t[1]);
        list.delist(&mut storage, t[3]);
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert_eq!(list.last(&storage), None);
    }

    #[test]
    #[should_panic(expected = "element already in a list")]
    fn double_enlist_panics() {
        let mut storage: BoxedStorage<Node> = BoxedStorage::with_capacity(2);
        let mut list: List<u32, Ring> = List::new();
        let a = node(&mut storage, 1);
        list.enlist(&mut storage, a, None);
        list.enlist(&mut storage, a, None);
    }
}
