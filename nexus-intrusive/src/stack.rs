//! Intrusive LIFO stack.

use core::fmt;
use core::marker::PhantomData;

use crate::link::{Adapter, Link};
use crate::{Index, Storage};

/// Stack link embedded in an element. The bottom element links to itself.
#[derive(Debug, Default)]
pub struct StackLink<K: Index> {
    next: Link<K>,
}

impl<K: Index> StackLink<K> {
    pub const fn new() -> Self {
        Self { next: Link::new() }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.next.is_bound()
    }
}

/// A singly linked LIFO stack.
pub struct Stack<K: Index, A> {
    top: K,
    len: usize,
    _marker: PhantomData<fn() -> A>,
}

impl<K: Index, A> Stack<K, A> {
    pub const fn new() -> Self {
        Self {
            top: K::NONE,
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
        self.top.is_none()
    }

    #[inline]
    pub fn peek(&self) -> Option<K> {
        self.top.to_option()
    }
}

impl<K: Index, A> Default for Stack<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Index, A> fmt::Debug for Stack<K, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("top", &self.top)
            .field("len", &self.len)
            .finish()
    }
}

impl<K, A> Stack<K, A>
where
    K: Index,
    A: Adapter<StackLink<K>>,
{
    /// Pushes an unbound element.
    ///
    /// # Panics
    ///
    /// Panics if `t` is already in a stack.
    pub fn push<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let link = Self::link_mut(storage, t);
        assert!(!link.is_bound(), "element already in a stack");
        link.next.set(if self.top.is_none() { t } else { self.top });
        self.top = t;
        self.len += 1;
    }

    pub fn pop<S>(&mut self, storage: &mut S) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        let t = self.top.to_option()?;
        let next = Self::link_mut(storage, t).next.take();
        self.top = if next == t { K::NONE } else { next };
        self.len -= 1;
        Some(t)
    }

    /// Element beneath `t`, or `None` at the bottom.
    pub fn next<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        let n = Self::link(storage, t).next.get();
        if n == t { None } else { Some(n) }
    }

    /// Top-to-bottom iterator.
    pub fn iter<'a, S>(&self, storage: &'a S) -> Iter<'a, K, A, S>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Iter {
            storage,
            next: self.top,
            _marker: PhantomData,
        }
    }

    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        while self.pop(storage).is_some() {}
    }

    #[inline]
    fn link<S>(storage: &S, t: K) -> &StackLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link(storage.get(t).expect("invalid index"))
    }

    #[inline]
    fn link_mut<S>(storage: &mut S, t: K) -> &mut StackLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link_mut(storage.get_mut(t).expect("invalid index"))
    }
}

pub struct Iter<'a, K: Index, A, S> {
    storage: &'a S,
    next: K,
    _marker: PhantomData<fn() -> A>,
}

impl<K, A, S> Iterator for Iter<'_, K, A, S>
where
    K: Index,
    A: Adapter<StackLink<K>>,
    S: Storage<A::Elem, Index = K>,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let t = self.next.to_option()?;
        let n = Stack::<K, A>::link(self.storage, t).next.get();
        self.next = if n == t { K::NONE } else { n };
        Some(t)
    }
}
