//! Intrusive singly-linked list kept sorted on insertion.
//!
//! Insertion walks from the head, so it is O(n), except that an element not
//! less than the current back is appended in O(1). Two orders merge in
//! O(n + m).

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

use crate::key::{Ascending, Compare};
use crate::link::{Adapter, Keyed, Link};
use crate::{Index, Storage};

/// Order link embedded in an element. The back element links to itself.
#[derive(Debug, Default)]
pub struct OrderLink<K: Index> {
    next: Link<K>,
}

impl<K: Index> OrderLink<K> {
    pub const fn new() -> Self {
        Self { next: Link::new() }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.next.is_bound()
    }
}

/// A sorted singly-linked list. Equal keys keep insertion order.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{adapter, BoxedStorage, Order, OrderLink, Storage};
///
/// struct Timer {
///     deadline: u64,
///     link: OrderLink<u32>,
/// }
///
/// adapter! {
///     struct ByDeadline: Timer => link: OrderLink<u32>, key deadline: u64;
/// }
///
/// let mut storage: BoxedStorage<Timer> = BoxedStorage::with_capacity(4);
/// let mut timers: Order<u32, ByDeadline> = Order::new();
/// for deadline in [30, 10, 20] {
///     let t = storage.try_insert(Timer { deadline, link: OrderLink::new() }).unwrap();
///     timers.insert(&mut storage, t);
/// }
///
/// let first = timers.remove(&mut storage).unwrap();
/// assert_eq!(storage.get(first).unwrap().deadline, 10);
///
/// timers.clear(&mut storage);
/// ```
pub struct Order<K: Index, A, C = Ascending> {
    head: K,
    tail: K,
    len: usize,
    _marker: PhantomData<fn() -> (A, C)>,
}

impl<K: Index, A, C> Order<K, A, C> {
    pub const fn new() -> Self {
        Self {
            head: K::NONE,
            tail: K::NONE,
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

    /// Least element.
    #[inline]
    pub fn front(&self) -> Option<K> {
        self.head.to_option()
    }

    /// Greatest element.
    #[inline]
    pub fn back(&self) -> Option<K> {
        self.tail.to_option()
    }

    /// Exchanges the contents of two orders in O(1).
    pub fn swap(&mut self, that: &mut Self) {
        core::mem::swap(self, that);
    }
}

impl<K: Index, A, C> Default for Order<K, A, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Index, A, C> fmt::Debug for Order<K, A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Order")
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("len", &self.len)
            .finish()
    }
}

impl<K, A, C> Order<K, A, C>
where
    K: Index,
    A: Adapter<OrderLink<K>>,
{
    /// Removes and returns the front element.
    pub fn remove<S>(&mut self, storage: &mut S) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        let t = self.head.to_option()?;
        let next = Self::link_mut(storage, t).next.take();
        if next == t {
            self.head = K::NONE;
            self.tail = K::NONE;
        } else {
            self.head = next;
        }
        self.len -= 1;
        Some(t)
    }

    /// Element after `t`, or `None` at the back.
    pub fn next<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        let n = Self::link(storage, t).next.get();
        if n == t { None } else { Some(n) }
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

    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        while self.remove(storage).is_some() {}
    }

    fn append<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link_mut(storage, t).next.set(t);
        if self.head.is_none() {
            self.head = t;
        } else {
            Self::link_mut(storage, self.tail).next.set(t);
        }
        self.tail = t;
    }

    #[inline]
    fn link<S>(storage: &S, t: K) -> &OrderLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link(storage.get(t).expect("invalid index"))
    }

    #[inline]
    fn link_mut<S>(storage: &mut S, t: K) -> &mut OrderLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link_mut(storage.get_mut(t).expect("invalid index"))
    }
}

impl<K, A, C> Order<K, A, C>
where
    K: Index,
    A: Keyed<OrderLink<K>>,
    C: Compare<A::Key>,
{
    /// Inserts `t` after every element whose key is not greater.
    ///
    /// # Panics
    ///
    /// Panics if `t` is already in an order.
    pub fn insert<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(!Self::link(storage, t).is_bound(), "element already in an order");

        if self.head.is_none() || Self::cmp(storage, t, self.tail) != Ordering::Less {
            self.append(storage, t);
            self.len += 1;
            return;
        }

        // The back is greater than `t`, so the walk always finds a slot.
        if Self::cmp(storage, t, self.head) == Ordering::Less {
            Self::link_mut(storage, t).next.set(self.head);
            self.head = t;
            self.len += 1;
            return;
        }

        let mut prev = self.head;
        loop {
            let cur = Self::link(storage, prev).next.get();
            if Self::cmp(storage, t, cur) == Ordering::Less {
                Self::link_mut(storage, t).next.set(cur);
                Self::link_mut(storage, prev).next.set(t);
                break;
            }
            prev = cur;
        }
        self.len += 1;
    }

    /// Merges `that` into this order, leaving `that` empty.
    ///
    /// Where keys tie, elements from `that` come first.
    pub fn merge<S>(&mut self, storage: &mut S, that: &mut Self)
    where
        S: Storage<A::Elem, Index = K>,
    {
        if that.is_empty() {
            return;
        }
        if self.is_empty() {
            self.swap(that);
            return;
        }

        let mut out = Self::new();
        let len = self.len + that.len;
        loop {
            let src = match (self.front(), that.front()) {
                (Some(a), Some(b)) => {
                    if Self::cmp(storage, a, b) == Ordering::Less {
                        &mut *self
                    } else {
                        &mut *that
                    }
                }
                (Some(_), None) => &mut *self,
                (None, Some(_)) => &mut *that,
                (None, None) => break,
            };
            if let Some(t) = src.remove(storage) {
                out.append(storage, t);
            }
        }
        out.len = len;
        *self = out;
    }

    /// Returns `true` if keys are in non-decreasing order under `C`.
    pub fn is_valid<S>(&self, storage: &S) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        let mut count = 0;
        let mut prev: Option<K> = None;
        for t in self.iter(storage) {
            if let Some(p) = prev {
                if Self::cmp(storage, p, t) == Ordering::Greater {
                    return false;
                }
            }
            prev = Some(t);
            count += 1;
        }
        count == self.len && prev == self.back()
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
}

/// Front-to-back iterator over an order's element indices.
pub struct Iter<'a, K: Index, A, S> {
    storage: &'a S,
    next: K,
    _marker: PhantomData<fn() -> A>,
}

impl<K, A, S> Iterator for Iter<'_, K, A, S>
where
    K: Index,
    A: Adapter<OrderLink<K>>,
    S: Storage<A::Elem, Index = K>,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let t = self.next.to_option()?;
        let n = A::link(self.storage.get(t).expect("invalid index")).next.get();
        self.next = if n == t { K::NONE } else { n };
        Some(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxedStorage, Descending};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    struct Timer {
        at: u64,
        seq: usize,
        link: OrderLink<u32>,
    }

    crate::adapter! {
        struct ByAt: Timer => link: OrderLink<u32>, key at: u64;
    }

    type Timers = Order<u32, ByAt>;

    fn timer(storage: &mut BoxedStorage<Timer>, at: u64, seq: usize) -> u32 {
        storage
            .try_insert(Timer {
                at,
                seq,
                link: OrderLink::new(),
            })
            .unwrap()
    }

    fn ats<C>(order: &Order<u32, ByAt, C>, storage: &BoxedStorage<Timer>) -> Vec<u64> {
        order.iter(storage).map(|t| storage.get(t).unwrap().at).collect()
    }

    #[test]
    fn insert_keeps_sorted() {
        let mut storage: BoxedStorage<Timer> = BoxedStorage::with_capacity(8);
        let mut order = Timers::new();
        for (seq, at) in [50, 10, 40, 10, 60, 5].into_iter().enumerate() {
            let t = timer(&mut storage, at, seq);
            order.insert(&mut storage, t);
        }

        assert_eq!(ats(&order, &storage), vec![5, 10, 10, 40, 50, 60]);
        assert_eq!(order.len(), 6);
        assert!(order.is_valid(&storage));
        assert_eq!(storage.get(order.back().unwrap()).unwrap().at, 60);

        let seqs: Vec<usize> = order
            .iter(&storage)
            .filter(|&t| storage.get(t).unwrap().at == 10)
            .map(|t| storage.get(t).unwrap().seq)
            .collect();
        assert_eq!(seqs, vec![1, 3]);

        order.clear(&mut storage);
        assert!(order.is_empty());
    }

    #[test]
    fn remove_pops_front() {
        let mut storage: BoxedStorage<Timer> = BoxedStorage::with_capacity(4);
        let mut order = Timers::new();
        assert_eq!(order.remove(&mut storage), None);

        let a = timer(&mut storage, 2, 0);
        let b = timer(&mut storage, 1, 1);
        order.insert(&mut storage, a);
        order.insert(&mut storage, b);

        assert_eq!(order.front(), Some(b));
        assert_eq!(order.next(&storage, b), Some(a));
        assert_eq!(order.next(&storage, a), None);
        assert_eq!(order.remove(&mut storage), Some(b));
        assert!(!storage.get(b).unwrap().link.is_bound());
        assert_eq!(order.remove(&mut storage), Some(a));
        assert_eq!(order.back(), None);
    }

    #[test]
    fn merge_interleaves() {
        let mut storage: BoxedStorage<Timer> = BoxedStorage::with_capacity(8);
        let mut left = Timers::new();
        let mut right = Timers::new();
        for (seq, at) in [1, 4, 6].into_iter().enumerate() {
            let t = timer(&mut storage, at, seq);
            left.insert(&mut storage, t);
        }
        for (seq, at) in [2, 4, 7, 9].into_iter().enumerate() {
            let t = timer(&mut storage, at, 10 + seq);
            right.insert(&mut storage, t);
        }

        left.merge(&mut storage, &mut right);
        assert_eq!(ats(&left, &storage), vec![1, 2, 4, 4, 6, 7, 9]);
        assert_eq!(left.len(), 7);
        assert!(right.is_empty());
        assert!(left.is_valid(&storage));

        // Ties take the merged-in element first.
        let fours: Vec<usize> = left
            .iter(&storage)
            .filter(|&t| storage.get(t).unwrap().at == 4)
            .map(|t| storage.get(t).unwrap().seq)
            .collect();
        assert_eq!(fours, vec![11, 1]);

        left.clear(&mut storage);
    }

    #[test]
    fn merge_into_empty_and_swap() {
        let mut storage: BoxedStorage<Timer> = BoxedStorage::with_capacity(4);
        let mut a = Timers::new();
        let mut b = Timers::new();
        let t = timer(&mut storage, 3, 0);
        b.insert(&mut storage, t);

        a.merge(&mut storage, &mut b);
        assert_eq!(a.front(), Some(t));
        assert!(b.is_empty());

        a.swap(&mut b);
        assert!(a.is_empty());
        assert_eq!(b.len(), 1);

        b.clear(&mut storage);
    }

    #[test]
    fn descending_order() {
        let mut storage: BoxedStorage<Timer> = BoxedStorage::with_capacity(8);
        let mut order: Order<u32, ByAt, Descending> = Order::new();
        for (seq, at) in [3, 9, 1, 7].into_iter().enumerate() {
            let t = timer(&mut storage, at, seq);
            order.insert(&mut storage, t);
        }
        assert_eq!(ats(&order, &storage), vec![9, 7, 3, 1]);
        order.clear(&mut storage);
    }

    #[test]
    fn random_inserts_match_sort() {
        let mut rng = SmallRng::seed_from_u64(17);
        let mut storage: BoxedStorage<Timer> = BoxedStorage::with_capacity(200);
        let mut order = Timers::new();
        let mut expected = Vec::new();
        for seq in 0..200 {
            let at = rng.gen_range(0..40);
            let t = timer(&mut storage, at, seq);
            order.insert(&mut storage, t);
            expected.push((at, seq));
        }
        expected.sort_by_key(|&(at, _)| at);

        let got: Vec<(u64, usize)> = order
            .iter(&storage)
            .map(|t| {
                let timer = storage.get(t).unwrap();
                (timer.at, timer.seq)
            })
            .collect();
        assert_eq!(got, expected);

        order.clear(&mut storage);
    }
}
