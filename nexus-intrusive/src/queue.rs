//! Intrusive FIFO queue with segment transfer and an in-place merge sort.
//!
//! The last element's link points at itself. That keeps "bound" a plain
//! non-null check and marks the tail without a separate flag.

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

use crate::key::{Ascending, Compare};
use crate::link::{Adapter, Keyed, Link};
use crate::{Index, Storage};

/// Queue link embedded in an element.
#[derive(Debug, Default)]
pub struct QueueLink<K: Index> {
    next: Link<K>,
}

impl<K: Index> QueueLink<K> {
    pub const fn new() -> Self {
        Self { next: Link::new() }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.next.is_bound()
    }
}

/// A singly linked FIFO queue.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{adapter, BoxedStorage, Queue, QueueLink, Storage};
///
/// struct Job {
///     cost: u32,
///     link: QueueLink<u32>,
/// }
///
/// adapter! {
///     struct ByCost: Job => link: QueueLink<u32>, key cost: u32;
/// }
///
/// let mut storage: BoxedStorage<Job> = BoxedStorage::with_capacity(8);
/// let mut jobs: Queue<u32, ByCost> = Queue::new();
///
/// for cost in [4, 2, 5, 1, 3] {
///     let j = storage.try_insert(Job { cost, link: QueueLink::new() }).unwrap();
///     jobs.enqueue(&mut storage, j);
/// }
/// jobs.sort(&mut storage);
///
/// let costs: Vec<u32> = jobs.iter(&storage).map(|j| storage.get(j).unwrap().cost).collect();
/// assert_eq!(costs, vec![1, 2, 3, 4, 5]);
///
/// jobs.clear(&mut storage);
/// ```
pub struct Queue<K: Index, A> {
    head: K,
    tail: K,
    len: usize,
    _marker: PhantomData<fn() -> A>,
}

impl<K: Index, A> Queue<K, A> {
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

    /// Front element, the next to be dequeued.
    #[inline]
    pub fn peek(&self) -> Option<K> {
        self.head.to_option()
    }

    /// Back element, the most recently enqueued.
    #[inline]
    pub fn last(&self) -> Option<K> {
        self.tail.to_option()
    }

    fn reset(&mut self) {
        self.head = K::NONE;
        self.tail = K::NONE;
        self.len = 0;
    }
}

impl<K: Index, A> Default for Queue<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Index, A> fmt::Debug for Queue<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("len", &self.len)
            .finish()
    }
}

impl<K, A> Queue<K, A>
where
    K: Index,
    A: Adapter<QueueLink<K>>,
{
    /// Appends an unbound element.
    ///
    /// # Panics
    ///
    /// Panics if `t` is already in a queue.
    pub fn enqueue<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(!Self::link(storage, t).is_bound(), "element already in a queue");

        Self::link_mut(storage, t).next.set(t);
        if self.head.is_none() {
            self.head = t;
        } else {
            Self::link_mut(storage, self.tail).next.set(t);
        }
        self.tail = t;
        self.len += 1;
    }

    /// Removes and returns the front element.
    pub fn dequeue<S>(&mut self, storage: &mut S) -> Option<K>
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

    /// Element after `t`, or `None` at the tail.
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

    /// Moves all of `other` onto the back of this queue in O(1).
    pub fn chain<S>(&mut self, storage: &mut S, other: &mut Self)
    where
        S: Storage<A::Elem, Index = K>,
    {
        if other.is_empty() {
            return;
        }
        if self.head.is_none() {
            self.head = other.head;
        } else {
            Self::link_mut(storage, self.tail).next.set(other.head);
        }
        self.tail = other.tail;
        self.len += other.len;
        other.reset();
    }

    /// Moves the first `n` elements of `other` (or all, if fewer) onto the
    /// back of this queue.
    pub fn chain_n<S>(&mut self, storage: &mut S, other: &mut Self, n: usize)
    where
        S: Storage<A::Elem, Index = K>,
    {
        if other.is_empty() || n == 0 {
            return;
        }

        let mut last = other.head;
        let mut moved = 1;
        while moved < n && last != other.tail {
            last = Self::link(storage, last).next.get();
            moved += 1;
        }

        if last == other.tail {
            self.chain(storage, other);
            return;
        }

        let rest = Self::link(storage, last).next.get();
        if self.head.is_none() {
            self.head = other.head;
        } else {
            Self::link_mut(storage, self.tail).next.set(other.head);
        }
        Self::link_mut(storage, last).next.set(last);
        self.tail = last;
        self.len += moved;

        other.head = rest;
        other.len -= moved;
    }

    /// Reverses the queue in place.
    pub fn reverse<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        if self.head.is_none() {
            return;
        }
        let first = self.head;
        let mut prev = first;
        let mut cur = first;
        while cur != self.tail {
            let next = Self::link(storage, cur).next.get();
            Self::link_mut(storage, cur).next.set(prev);
            prev = cur;
            cur = next;
        }
        Self::link_mut(storage, cur).next.set(prev);
        self.head = cur;
        self.tail = first;
    }

    /// Unbinds every element, leaving them in storage.
    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        while self.dequeue(storage).is_some() {}
    }

    #[inline]
    fn link<S>(storage: &S, t: K) -> &QueueLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link(storage.get(t).expect("invalid index"))
    }

    #[inline]
    fn link_mut<S>(storage: &mut S, t: K) -> &mut QueueLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link_mut(storage.get_mut(t).expect("invalid index"))
    }
}

// =============================================================================
// Sorting
// =============================================================================

impl<K, A> Queue<K, A>
where
    K: Index,
    A: Keyed<QueueLink<K>>,
{
    /// Sorts ascending by key. Stable.
    pub fn sort<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Elem, Index = K>,
        Ascending: Compare<A::Key>,
    {
        self.sort_by::<Ascending, S>(storage);
    }

    /// Sorts by `C`. Stable, O(n log n), no allocation.
    ///
    /// Bottom-up merge sort: each pass merges adjacent runs of `width`
    /// elements into a scratch queue and doubles `width`, until a pass finds
    /// the whole queue is one run.
    pub fn sort_by<C, S>(&mut self, storage: &mut S)
    where
        C: Compare<A::Key>,
        S: Storage<A::Elem, Index = K>,
    {
        if self.len < 2 {
            return;
        }

        let mut width = 1;
        loop {
            let mut out = Self::new();
            let mut merges = 0usize;
            while !self.is_empty() {
                let mut foo = Self::new();
                foo.chain_n(storage, self, width);
                if self.is_empty() {
                    if out.is_empty() {
                        // One run covers everything.
                        self.chain(storage, &mut foo);
                        tracing::trace!(width, len = self.len, "queue sorted");
                        return;
                    }
                    out.chain(storage, &mut foo);
                    break;
                }
                let mut bar = Self::new();
                bar.chain_n(storage, self, width);
                Self::merge::<C, S>(storage, &mut out, &mut foo, &mut bar);
                merges += 1;
            }
            self.chain(storage, &mut out);
            tracing::trace!(width, merges, "queue sort pass");
            width *= 2;
        }
    }

    /// Merges the sorted queues `foo` and `bar` onto the back of `out`.
    /// On equal keys `foo`'s element goes first.
    pub fn merge<C, S>(storage: &mut S, out: &mut Self, foo: &mut Self, bar: &mut Self)
    where
        C: Compare<A::Key>,
        S: Storage<A::Elem, Index = K>,
    {
        while let (Some(f), Some(b)) = (foo.peek(), bar.peek()) {
            if Self::cmp::<C, S>(storage, f, b) != Ordering::Greater {
                out.chain_n(storage, foo, 1);
            } else {
                out.chain_n(storage, bar, 1);
            }
        }
        out.chain(storage, foo);
        out.chain(storage, bar);
    }

    /// Returns `true` if the queue is in non-decreasing order under `C`.
    pub fn is_sorted<C, S>(&self, storage: &S) -> bool
    where
        C: Compare<A::Key>,
        S: Storage<A::Elem, Index = K>,
    {
        let mut it = self.iter(storage);
        let Some(mut prev) = it.next() else {
            return true;
        };
        for t in it {
            if Self::cmp::<C, S>(storage, prev, t) == Ordering::Greater {
                return false;
            }
            prev = t;
        }
        true
    }

    #[inline]
    fn cmp<C, S>(storage: &S, a: K, b: K) -> Ordering
    where
        C: Compare<A::Key>,
        S: Storage<A::Elem, Index = K>,
    {
        let a = A::key(storage.get(a).expect("invalid index"));
        let b = A::key(storage.get(b).expect("invalid index"));
        C::compare(a, b)
    }
}

/// Front-to-back iterator over a queue's element indices.
pub struct Iter<'a, K: Index, A, S> {
    storage: &'a S,
    next: K,
    _marker: PhantomData<fn() -> A>,
}

impl<K, A, S> Iterator for Iter<'_, K, A, S>
where
    K: Index,
    A: Adapter<QueueLink<K>>,
    S: Storage<A::Elem, Index = K>,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let t = self.next.to_option()?;
        let n = Queue::<K, A>::link(self.storage, t).next.get();
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

    #[derive(Debug)]
    struct Item {
        key: u32,
        seq: u32,
        link: QueueLink<u32>,
    }

    crate::adapter! {
        struct ByKey: Item => link: QueueLink<u32>, key key: u32;
    }

    type Fifo = Queue<u32, ByKey>;

    fn push_all(q: &mut Fifo, storage: &mut BoxedStorage<Item>, keys: &[u32]) -> Vec<u32> {
        keys.iter()
            .enumerate()
            .map(|(seq, &key)| {
                let t = storage
                    .try_insert(Item {
                        key,
                        seq: seq as u32,
                        link: QueueLink::new(),
                    })
                    .unwrap();
                q.enqueue(storage, t);
                t
            })
            .collect()
    }

    fn keys(q: &Fifo, storage: &BoxedStorage<Item>) -> Vec<u32> {
        q.iter(storage).map(|t| storage.get(t).unwrap().key).collect()
    }

    #[test]
    fn fifo_order() {
        let mut storage: BoxedStorage<Item> = BoxedStorage::with_capacity(8);
        let mut q = Fifo::new();
        let t = push_all(&mut q, &mut storage, &[1, 2, 3]);

        assert_eq!(q.len(), 3);
        assert_eq!(q.peek(), Some(t[0]));
        assert_eq!(q.last(), Some(t[2]));
        assert_eq!(q.next(&storage, t[0]), Some(t[1]));
        assert_eq!(q.next(&storage, t[2]), None);

        assert_eq!(q.dequeue(&mut storage), Some(t[0]));
        assert!(!storage.get(t[0]).unwrap().link.is_bound());
        assert_eq!(q.dequeue(&mut storage), Some(t[1]));
        assert_eq!(q.dequeue(&mut storage), Some(t[2]));
        assert_eq!(q.dequeue(&mut storage), None);
        assert!(q.is_empty());
        assert_eq!(q.last(), None);
    }

    #[test]
    fn single_element_tail_is_bound() {
        let mut storage: BoxedStorage<Item> = BoxedStorage::with_capacity(2);
        let mut q = Fifo::new();
        let t = push_all(&mut q, &mut storage, &[9]);
        assert!(storage.get(t[0]).unwrap().link.is_bound());
        q.clear(&mut storage);
        assert!(!storage.get(t[0]).unwrap().link.is_bound());
    }

    #[test]
    fn chain_and_chain_n() {
        let mut storage: BoxedStorage<Item> = BoxedStorage::with_capacity(16);
        let mut a = Fifo::new();
        let mut b = Fifo::new();
        push_all(&mut a, &mut storage, &[1, 2]);
        push_all(&mut b, &mut storage, &[3, 4, 5, 6]);

        a.chain_n(&mut storage, &mut b, 2);
        assert_eq!(keys(&a, &storage), vec![1, 2, 3, 4]);
        assert_eq!(keys(&b, &storage), vec![5, 6]);
        assert_eq!((a.len(), b.len()), (4, 2));

        a.chain_n(&mut storage, &mut b, 10);
        assert_eq!(keys(&a, &storage), vec![1, 2, 3, 4, 5, 6]);
        assert!(b.is_empty());

        b.chain(&mut storage, &mut a);
        assert_eq!(b.len(), 6);
        assert!(a.is_empty());

        b.clear(&mut storage);
    }

    #[test]
    fn reverse_in_place() {
        let mut storage: BoxedStorage<Item> = BoxedStorage::with_capacity(8);
        let mut q = Fifo::new();
        push_all(&mut q, &mut storage, &[1, 2, 3, 4]);

        q.reverse(&mut storage);
        assert_eq!(keys(&q, &storage), vec![4, 3, 2, 1]);
        assert_eq!(q.next(&storage, q.last().unwrap()), None);

        let mut one = Fifo::new();
        push_all(&mut one, &mut storage, &[7]);
        one.reverse(&mut storage);
        assert_eq!(keys(&one, &storage), vec![7]);

        q.clear(&mut storage);
        one.clear(&mut storage);
    }

    #[test]
    fn sort_small() {
        let mut storage: BoxedStorage<Item> = BoxedStorage::with_capacity(8);
        let mut q = Fifo::new();
        push_all(&mut q, &mut storage, &[4, 2, 5, 1, 3]);

        q.sort(&mut storage);
        assert_eq!(keys(&q, &storage), vec![1, 2, 3, 4, 5]);
        assert_eq!(storage.get(q.last().unwrap()).unwrap().key, 5);

        q.sort_by::<Descending, _>(&mut storage);
        assert_eq!(keys(&q, &storage), vec![5, 4, 3, 2, 1]);
        assert!(q.is_sorted::<Descending, _>(&storage));
        assert!(!q.is_sorted::<Ascending, _>(&storage));

        q.clear(&mut storage);
    }

    #[test]
    fn sort_is_stable() {
        let mut storage: BoxedStorage<Item> = BoxedStorage::with_capacity(64);
        let mut q = Fifo::new();
        let input: Vec<u32> = (0..37).map(|i| (i * 7) % 5).collect();
        push_all(&mut q, &mut storage, &input);

        q.sort(&mut storage);
        let out: Vec<(u32, u32)> = q
            .iter(&storage)
            .map(|t| {
                let item = storage.get(t).unwrap();
                (item.key, item.seq)
            })
            .collect();
        let mut expected: Vec<(u32, u32)> = input.iter().enumerate().map(|(s, &k)| (k, s as u32)).collect();
        expected.sort_by_key(|&(k, _)| k);
        assert_eq!(out, expected);

        q.clear(&mut storage);
    }

    #[test]
    fn sort_random_lengths() {
        let mut rng = SmallRng::seed_from_u64(5);
        for len in [0usize, 1, 2, 3, 7, 8, 9, 100, 257] {
            let mut storage: BoxedStorage<Item> = BoxedStorage::with_capacity(len.max(1));
            let mut q = Fifo::new();
            let input: Vec<u32> = (0..len).map(|_| rng.gen_range(0..50)).collect();
            push_all(&mut q, &mut storage, &input);

            q.sort(&mut storage);
            let mut expected = input.clone();
            expected.sort_unstable();
            assert_eq!(keys(&q, &storage), expected, "len {len}");
            assert_eq!(q.len(), len);
            assert!(q.is_sorted::<Ascending, _>(&storage));

            q.clear(&mut storage);
        }
    }

    #[test]
    fn merge_prefers_left_on_ties() {
        let mut storage: BoxedStorage<Item> = BoxedStorage::with_capacity(8);
        let mut foo = Fifo::new();
        let mut bar = Fifo::new();
        let mut out = Fifo::new();
        let f = push_all(&mut foo, &mut storage, &[1, 3]);
        let b = push_all(&mut bar, &mut storage, &[1, 2]);

        Fifo::merge::<Ascending, _>(&mut storage, &mut out, &mut foo, &mut bar);
        assert_eq!(out.iter(&storage).collect::<Vec<_>>(), vec![f[0], b[0], b[1], f[1]]);
        assert!(foo.is_empty() && bar.is_empty());

        out.clear(&mut storage);
    }
}
