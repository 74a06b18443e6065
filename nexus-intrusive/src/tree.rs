//! Intrusive red-black tree over external storage.
//!
//! Elements embed a [`TreeLink`]: parent, left and right indices. The color
//! rides in the tag bit of the parent link (tagged means black), so a black
//! root with no parent is still a bound link.
//!
//! Keys need not be unique. Equal keys are kept in insertion order, and
//! [`Tree::find`] returns whichever equal element it meets first.

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

use crate::key::{Ascending, Compare};
use crate::link::{Keyed, Link, TaggedLink};
use crate::{Index, Storage};

/// Tree link embedded in an element.
#[derive(Debug)]
pub struct TreeLink<K: Index> {
    /// Parent; tagged when this node is black.
    parent: TaggedLink<K>,
    left: Link<K>,
    right: Link<K>,
}

impl<K: Index> TreeLink<K> {
    pub const fn new() -> Self {
        Self {
            parent: TaggedLink::new(),
            left: Link::new(),
            right: Link::new(),
        }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.parent.is_bound()
    }
}

impl<K: Index> Default for TreeLink<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Which neighbor replaces a pruned node that has two children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PruneBias {
    /// Alternate between the two, starting with the predecessor.
    #[default]
    Alternate,
    Predecessor,
    Successor,
}

/// A red-black tree.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{adapter, BoxedStorage, Storage, Tree, TreeLink};
///
/// struct Level {
///     price: u64,
///     link: TreeLink<u32>,
/// }
///
/// adapter! {
///     struct ByPrice: Level => link: TreeLink<u32>, key price: u64;
/// }
///
/// let mut storage: BoxedStorage<Level> = BoxedStorage::with_capacity(16);
/// let mut book: Tree<u32, ByPrice> = Tree::new();
///
/// for price in [101, 99, 100] {
///     let l = storage.try_insert(Level { price, link: TreeLink::new() }).unwrap();
///     book.graft(&mut storage, l);
/// }
///
/// let best = book.min(&storage).unwrap();
/// assert_eq!(storage.get(best).unwrap().price, 99);
/// assert!(book.find(&storage, &100).is_some());
///
/// book.clear(&mut storage);
/// ```
pub struct Tree<K: Index, A, C = Ascending> {
    root: K,
    len: usize,
    bias: PruneBias,
    flip: bool,
    _marker: PhantomData<fn() -> (A, C)>,
}

impl<K: Index, A, C> Tree<K, A, C> {
    pub const fn new() -> Self {
        Self::with_bias(PruneBias::Alternate)
    }

    pub const fn with_bias(bias: PruneBias) -> Self {
        Self {
            root: K::NONE,
            len: 0,
            bias,
            flip: false,
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

    #[inline]
    pub fn root(&self) -> Option<K> {
        self.root.to_option()
    }
}

impl<K: Index, A, C> Default for Tree<K, A, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Index, A, C> fmt::Debug for Tree<K, A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("root", &self.root)
            .field("len", &self.len)
            .field("bias", &self.bias)
            .finish()
    }
}

impl<K, A, C> Tree<K, A, C>
where
    K: Index,
    A: Keyed<TreeLink<K>>,
    C: Compare<A::Key>,
{
    /// Inserts an unbound element.
    ///
    /// # Panics
    ///
    /// Panics if `t` is already in a tree.
    pub fn graft<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(!Self::link(storage, t).is_bound(), "element already in a tree");

        let mut p = K::NONE;
        let mut go_left = false;
        let mut cur = self.root;
        while cur.is_some() {
            p = cur;
            go_left = Self::cmp(storage, t, cur) == Ordering::Less;
            cur = if go_left {
                Self::left_of(storage, cur)
            } else {
                Self::right_of(storage, cur)
            };
        }

        if p.is_none() {
            self.root = t;
        } else if go_left {
            Self::link_left(storage, p, t);
        } else {
            Self::link_right(storage, p, t);
        }
        self.len += 1;

        self.graft_fixup(storage, t);
        debug_validate!(self.is_valid(storage));
    }

    /// Removes `t`, returning it unbound.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not in a tree.
    pub fn prune<S>(&mut self, storage: &mut S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(Self::link(storage, t).is_bound(), "element not in a tree");
        debug_assert!(self.is_member(storage, t), "element is in another tree");

        let (l, r) = (Self::left_of(storage, t), Self::right_of(storage, t));
        if l.is_some() && r.is_some() {
            let predecessor = match self.bias {
                PruneBias::Predecessor => true,
                PruneBias::Successor => false,
                PruneBias::Alternate => {
                    self.flip = !self.flip;
                    self.flip
                }
            };
            let other = if predecessor {
                Self::rightest_from(storage, l)
            } else {
                Self::leftest_from(storage, r)
            };
            self.swap_nodes(storage, t, other);
        }

        let c = {
            let link = Self::link_mut(storage, t);
            let l = link.left.take();
            if l.is_some() { l } else { link.right.take() }
        };
        if c.is_some() {
            Self::link_mut(storage, c).parent.set_slot(K::NONE);
        }

        if Self::is_red(storage, t) {
            debug_assert!(c.is_none());
            self.unlink(storage, t);
        } else if c.is_some() {
            self.replace(storage, t, c);
            if Self::is_red(storage, c) {
                Self::set_black(storage, c);
            } else {
                self.prune_fixup(storage, c);
            }
        } else {
            // A black leaf stands in for the missing child while rebalancing.
            self.prune_fixup(storage, t);
            self.unlink(storage, t);
        }
        self.len -= 1;

        debug_validate!(self.is_valid(storage));
        t
    }

    /// Replaces `old` with the unbound `new`, which must compare equal.
    ///
    /// `new` takes over `old`'s position and color without any rebalancing.
    /// Returns `old`, now unbound.
    pub fn transplant<S>(&mut self, storage: &mut S, old: K, new: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        assert!(Self::link(storage, old).is_bound(), "element not in a tree");
        assert!(!Self::link(storage, new).is_bound(), "element already in a tree");
        assert_eq!(
            Self::cmp(storage, old, new),
            Ordering::Equal,
            "transplant changes the key"
        );

        let black = Self::is_black(storage, old);
        Self::link_mut(storage, new).parent.set_tag(black);
        Self::link_mut(storage, old).parent.set_tag(false);

        let l = Self::link_mut(storage, old).left.take();
        if l.is_some() {
            Self::link_left(storage, new, l);
        }
        let r = Self::link_mut(storage, old).right.take();
        if r.is_some() {
            Self::link_right(storage, new, r);
        }
        self.replace(storage, old, new);

        debug_validate!(self.is_valid(storage));
        old
    }

    /// Moves every element of `other` into this tree.
    ///
    /// Leaves are peeled off `other` one at a time, so `other` stays a
    /// well-formed (if unbalanced) tree until it is empty.
    pub fn inosculate<S>(&mut self, storage: &mut S, other: &mut Self)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let moved = other.len;
        let mut t = other.root;
        while t.is_some() {
            let l = Self::left_of(storage, t);
            if l.is_some() {
                t = l;
                continue;
            }
            let r = Self::right_of(storage, t);
            if r.is_some() {
                t = r;
                continue;
            }
            let p = Self::parent_of(storage, t);
            other.unlink(storage, t);
            other.len -= 1;
            self.graft(storage, t);
            t = p;
        }
        tracing::debug!(moved, len = self.len, "tree inosculate");
    }

    /// Unbinds every element, leaving them in storage.
    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let mut t = self.root;
        while t.is_some() {
            let l = Self::left_of(storage, t);
            if l.is_some() {
                t = l;
                continue;
            }
            let r = Self::right_of(storage, t);
            if r.is_some() {
                t = r;
                continue;
            }
            let p = Self::parent_of(storage, t);
            self.unlink(storage, t);
            t = p;
        }
        self.len = 0;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn min<S>(&self, storage: &S) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        self.root
            .to_option()
            .map(|r| Self::leftest_from(storage, r))
    }

    pub fn max<S>(&self, storage: &S) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        self.root
            .to_option()
            .map(|r| Self::rightest_from(storage, r))
    }

    /// Smallest element in `t`'s subtree.
    pub fn leftest<S>(&self, storage: &S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::leftest_from(storage, t)
    }

    /// Largest element in `t`'s subtree.
    pub fn rightest<S>(&self, storage: &S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::rightest_from(storage, t)
    }

    /// In-order successor.
    pub fn next<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::successor(storage, t).to_option()
    }

    /// In-order predecessor.
    pub fn prev<S>(&self, storage: &S, mut t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        let l = Self::left_of(storage, t);
        if l.is_some() {
            return Some(Self::rightest_from(storage, l));
        }
        loop {
            let p = Self::parent_of(storage, t).to_option()?;
            if Self::right_of(storage, p) == t {
                return Some(p);
            }
            t = p;
        }
    }

    /// Parent of `t`, `None` at the root.
    pub fn parent<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::parent_of(storage, t).to_option()
    }

    pub fn left<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::left_of(storage, t).to_option()
    }

    pub fn right<S>(&self, storage: &S, t: K) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::right_of(storage, t).to_option()
    }

    /// Finds an element whose key compares equal to `key`.
    pub fn find<S>(&self, storage: &S, key: &A::Key) -> Option<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        let mut t = self.root;
        while t.is_some() {
            let elem = storage.get(t).expect("invalid index");
            t = match C::compare(key, A::key(elem)) {
                Ordering::Less => Self::left_of(storage, t),
                Ordering::Greater => Self::right_of(storage, t),
                Ordering::Equal => return Some(t),
            };
        }
        None
    }

    /// Walks parent links to the root of whatever tree `t` is in.
    pub fn eldest<S>(&self, storage: &S, mut t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        loop {
            let p = Self::parent_of(storage, t);
            if p.is_none() {
                return t;
            }
            t = p;
        }
    }

    /// Returns `true` if `t` is in this tree. O(log n).
    pub fn is_member<S>(&self, storage: &S, t: K) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link(storage, t).is_bound() && self.root.is_some() && self.eldest(storage, t) == self.root
    }

    pub fn iter<'a, S>(&self, storage: &'a S) -> Iter<'a, K, A, C, S>
    where
        S: Storage<A::Elem, Index = K>,
    {
        Iter {
            storage,
            next: self
                .root
                .to_option()
                .map_or(K::NONE, |r| Self::leftest_from(storage, r)),
            _marker: PhantomData,
        }
    }

    /// Checks the red-black and search-tree properties.
    pub fn is_valid<S>(&self, storage: &S) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        if self.root.is_none() {
            return self.len == 0;
        }
        if !Self::is_black(storage, self.root) || Self::parent_of(storage, self.root).is_some() {
            return false;
        }
        let mut count = 0;
        Self::black_height(storage, self.root, (K::NONE, K::NONE), &mut count).is_some()
            && count == self.len
    }

    /// Black height of `t`'s subtree, whose keys must lie within `bounds`
    /// (`NONE` is unbounded).
    fn black_height<S>(storage: &S, t: K, bounds: (K, K), count: &mut usize) -> Option<usize>
    where
        S: Storage<A::Elem, Index = K>,
    {
        if t.is_none() {
            return Some(1);
        }
        *count += 1;
        let (l, r) = (Self::left_of(storage, t), Self::right_of(storage, t));
        for c in [l, r] {
            if c.is_some() && Self::parent_of(storage, c) != t {
                return None;
            }
        }
        if Self::is_red(storage, t) && (Self::is_red(storage, l) || Self::is_red(storage, r)) {
            return None;
        }
        let (lo, hi) = bounds;
        if lo.is_some() && Self::cmp(storage, t, lo) == Ordering::Less {
            return None;
        }
        if hi.is_some() && Self::cmp(storage, t, hi) == Ordering::Greater {
            return None;
        }
        let lh = Self::black_height(storage, l, (lo, t), count)?;
        let rh = Self::black_height(storage, r, (t, hi), count)?;
        (lh == rh).then(|| lh + usize::from(Self::is_black(storage, t)))
    }

    // =========================================================================
    // Rebalancing
    // =========================================================================

    fn graft_fixup<S>(&mut self, storage: &mut S, mut n: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        loop {
            let p = Self::parent_of(storage, n);
            if p.is_none() {
                Self::set_black(storage, n);
                return;
            }
            if Self::is_black(storage, p) {
                return;
            }
            // p is red, so it is not the root and g exists.
            let g = Self::parent_of(storage, p);
            let u = Self::peer(storage, p);
            if Self::is_red(storage, u) {
                Self::set_black(storage, p);
                Self::set_black(storage, u);
                Self::set_red(storage, g);
                n = g;
                continue;
            }

            let (mut n, mut p) = (n, p);
            if Self::is_right(storage, n) && Self::is_left(storage, p) {
                self.rotate_left(storage, p);
                core::mem::swap(&mut n, &mut p);
            } else if Self::is_left(storage, n) && Self::is_right(storage, p) {
                self.rotate_right(storage, p);
                core::mem::swap(&mut n, &mut p);
            }
            if Self::is_left(storage, n) {
                self.rotate_right(storage, g);
            } else {
                self.rotate_left(storage, g);
            }
            Self::set_black(storage, p);
            Self::set_red(storage, g);
            return;
        }
    }

    /// Restores black height above `n`, which is one short.
    fn prune_fixup<S>(&mut self, storage: &mut S, mut n: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        while n != self.root {
            let mut p = Self::parent_of(storage, n);
            let mut s = Self::peer(storage, n);

            if Self::is_red(storage, s) {
                Self::set_red(storage, p);
                Self::set_black(storage, s);
                if Self::is_left(storage, n) {
                    self.rotate_left(storage, p);
                } else {
                    self.rotate_right(storage, p);
                }
                p = Self::parent_of(storage, n);
                s = Self::peer(storage, n);
            }

            let (sl, sr) = (Self::left_of(storage, s), Self::right_of(storage, s));
            if Self::is_black(storage, sl) && Self::is_black(storage, sr) {
                Self::set_red(storage, s);
                if Self::is_red(storage, p) {
                    Self::set_black(storage, p);
                    return;
                }
                n = p;
                continue;
            }

            if Self::is_left(storage, n) {
                if Self::is_black(storage, sr) {
                    Self::set_red(storage, s);
                    Self::set_black(storage, sl);
                    self.rotate_right(storage, s);
                    s = Self::peer(storage, n);
                }
                let p_black = Self::is_black(storage, p);
                Self::set_color(storage, s, p_black);
                Self::set_black(storage, p);
                let far = Self::right_of(storage, s);
                Self::set_black(storage, far);
                self.rotate_left(storage, p);
            } else {
                if Self::is_black(storage, sl) {
                    Self::set_red(storage, s);
                    Self::set_black(storage, sr);
                    self.rotate_left(storage, s);
                    s = Self::peer(storage, n);
                }
                let p_black = Self::is_black(storage, p);
                Self::set_color(storage, s, p_black);
                Self::set_black(storage, p);
                let far = Self::left_of(storage, s);
                Self::set_black(storage, far);
                self.rotate_right(storage, p);
            }
            return;
        }
    }

    fn rotate_left<S>(&mut self, storage: &mut S, p: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let n = Self::right_of(storage, p);
        let c = Self::left_of(storage, n);
        self.replace_child(storage, p, n);
        Self::link_left(storage, n, p);
        Self::set_right_raw(storage, p, c);
        if c.is_some() {
            Self::link_mut(storage, c).parent.set_slot(p);
        }
    }

    fn rotate_right<S>(&mut self, storage: &mut S, p: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let n = Self::left_of(storage, p);
        let c = Self::right_of(storage, n);
        self.replace_child(storage, p, n);
        Self::link_right(storage, n, p);
        Self::set_left_raw(storage, p, c);
        if c.is_some() {
            Self::link_mut(storage, c).parent.set_slot(p);
        }
    }

    /// Points `old`'s parent (or the root) at `new`.
    fn replace_child<S>(&mut self, storage: &mut S, old: K, new: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let p = Self::parent_of(storage, old);
        if p.is_none() {
            self.root = new;
        } else if Self::left_of(storage, p) == old {
            Self::set_left_raw(storage, p, new);
        } else {
            Self::set_right_raw(storage, p, new);
        }
        if new.is_some() {
            Self::link_mut(storage, new).parent.set_slot(p);
        }
    }

    /// Puts the childless `old` out of the tree and `new` in its place.
    fn replace<S>(&mut self, storage: &mut S, old: K, new: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        self.replace_child(storage, old, new);
        Self::link_mut(storage, old).parent.clear();
    }

    /// Detaches the childless `t` from its parent and clears its link.
    fn unlink<S>(&mut self, storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        debug_assert!(Self::left_of(storage, t).is_none() && Self::right_of(storage, t).is_none());
        self.replace(storage, t, K::NONE);
    }

    /// Exchanges the tree positions and colors of `a` and `b`, where `b` is
    /// in `a`'s subtree (its in-order neighbor).
    fn swap_nodes<S>(&mut self, storage: &mut S, a: K, b: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        let (ap, al, ar) = (Self::parent_of(storage, a), Self::left_of(storage, a), Self::right_of(storage, a));
        let (bp, bl, br) = (Self::parent_of(storage, b), Self::left_of(storage, b), Self::right_of(storage, b));
        let a_black = Self::is_black(storage, a);
        let b_black = Self::is_black(storage, b);

        self.replace_child(storage, a, b);

        if bp == a {
            if al == b {
                Self::set_left_raw(storage, b, a);
                Self::link_right(storage, b, ar);
            } else {
                Self::set_right_raw(storage, b, a);
                Self::link_left(storage, b, al);
            }
            Self::link_mut(storage, a).parent.set_slot(b);
        } else {
            Self::link_left(storage, b, al);
            Self::link_right(storage, b, ar);
            if Self::left_of(storage, bp) == b {
                Self::set_left_raw(storage, bp, a);
            } else {
                Self::set_right_raw(storage, bp, a);
            }
            Self::link_mut(storage, a).parent.set_slot(bp);
        }
        debug_assert_eq!(Self::parent_of(storage, b), ap);

        Self::link_left(storage, a, bl);
        Self::link_right(storage, a, br);
        Self::set_color(storage, a, b_black);
        Self::set_color(storage, b, a_black);
    }

    // =========================================================================
    // Link access
    // =========================================================================

    #[inline]
    fn link<S>(storage: &S, t: K) -> &TreeLink<K>
    where
        S: Storage<A::Elem, Index = K>,
    {
        A::link(storage.get(t).expect("invalid index"))
    }

    #[inline]
    fn link_mut<S>(storage: &mut S, t: K) -> &mut TreeLink<K>
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
    fn parent_of<S>(storage: &S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link(storage, t).parent.slot()
    }

    #[inline]
    fn left_of<S>(storage: &S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link(storage, t).left.get()
    }

    #[inline]
    fn right_of<S>(storage: &S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link(storage, t).right.get()
    }

    /// Missing nodes count as black.
    #[inline]
    fn is_black<S>(storage: &S, t: K) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        t.is_none() || Self::link(storage, t).parent.is_tagged()
    }

    #[inline]
    fn is_red<S>(storage: &S, t: K) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        !Self::is_black(storage, t)
    }

    #[inline]
    fn set_color<S>(storage: &mut S, t: K, black: bool)
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link_mut(storage, t).parent.set_tag(black);
    }

    #[inline]
    fn set_black<S>(storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        if t.is_some() {
            Self::set_color(storage, t, true);
        }
    }

    #[inline]
    fn set_red<S>(storage: &mut S, t: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::set_color(storage, t, false);
    }

    #[inline]
    fn is_left<S>(storage: &S, t: K) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        let p = Self::parent_of(storage, t);
        p.is_some() && Self::left_of(storage, p) == t
    }

    #[inline]
    fn is_right<S>(storage: &S, t: K) -> bool
    where
        S: Storage<A::Elem, Index = K>,
    {
        let p = Self::parent_of(storage, t);
        p.is_some() && Self::right_of(storage, p) == t
    }

    /// The other child of `t`'s parent.
    #[inline]
    fn peer<S>(storage: &S, t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        let p = Self::parent_of(storage, t);
        if Self::left_of(storage, p) == t {
            Self::right_of(storage, p)
        } else {
            Self::left_of(storage, p)
        }
    }

    #[inline]
    fn set_left_raw<S>(storage: &mut S, p: K, c: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link_mut(storage, p).left.set(c);
    }

    #[inline]
    fn set_right_raw<S>(storage: &mut S, p: K, c: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::link_mut(storage, p).right.set(c);
    }

    /// Sets `p.left = c` and, if present, `c.parent = p` keeping `c`'s color.
    #[inline]
    fn link_left<S>(storage: &mut S, p: K, c: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::set_left_raw(storage, p, c);
        if c.is_some() {
            Self::link_mut(storage, c).parent.set_slot(p);
        }
    }

    #[inline]
    fn link_right<S>(storage: &mut S, p: K, c: K)
    where
        S: Storage<A::Elem, Index = K>,
    {
        Self::set_right_raw(storage, p, c);
        if c.is_some() {
            Self::link_mut(storage, c).parent.set_slot(p);
        }
    }

    fn leftest_from<S>(storage: &S, mut t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        loop {
            let l = Self::left_of(storage, t);
            if l.is_none() {
                return t;
            }
            t = l;
        }
    }

    fn rightest_from<S>(storage: &S, mut t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        loop {
            let r = Self::right_of(storage, t);
            if r.is_none() {
                return t;
            }
            t = r;
        }
    }

    fn successor<S>(storage: &S, mut t: K) -> K
    where
        S: Storage<A::Elem, Index = K>,
    {
        let r = Self::right_of(storage, t);
        if r.is_some() {
            return Self::leftest_from(storage, r);
        }
        loop {
            let p = Self::parent_of(storage, t);
            if p.is_none() || Self::left_of(storage, p) == t {
                return p;
            }
            t = p;
        }
    }
}

/// In-order iterator over a tree's element indices.
pub struct Iter<'a, K: Index, A, C, S> {
    storage: &'a S,
    next: K,
    _marker: PhantomData<fn() -> (A, C)>,
}

impl<K, A, C, S> Iterator for Iter<'_, K, A, C, S>
where
    K: Index,
    A: Keyed<TreeLink<K>>,
    C: Compare<A::Key>,
    S: Storage<A::Elem, Index = K>,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        let t = self.next.to_option()?;
        self.next = Tree::<K, A, C>::successor(self.storage, t);
        Some(t)
    }
}
