//! Link fields embedded in elements.
//!
//! A collection never allocates per element. Instead each element carries
//! one link struct per collection it can join ([`HeapLink`], [`TreeLink`],
//! ...), and an [`Adapter`] tells the collection where that struct lives
//! inside the element. Every collection link is built from the two
//! primitives here:
//!
//! - [`Link`] - a single index slot
//! - [`TaggedLink`] - an index slot plus one bit of structural state (heap
//!   "points at parent", tree "black", table "end of chain", set "root")
//!
//! A link is *bound* while its element belongs to a collection. Dropping an
//! element whose links are still bound would leave dangling indices behind,
//! so debug builds assert against it.
//!
//! [`HeapLink`]: crate::HeapLink
//! [`TreeLink`]: crate::TreeLink

use crate::Index;

/// A single index slot.
#[derive(Debug)]
pub struct Link<K: Index> {
    slot: K,
}

impl<K: Index> Link<K> {
    pub const fn new() -> Self {
        Self { slot: K::NONE }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.slot.is_some()
    }

    #[inline]
    pub(crate) fn get(&self) -> K {
        self.slot
    }

    #[inline]
    pub(crate) fn set(&mut self, slot: K) {
        self.slot = slot;
    }

    #[inline]
    pub(crate) fn take(&mut self) -> K {
        core::mem::replace(&mut self.slot, K::NONE)
    }
}

impl<K: Index> Default for Link<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Index> Drop for Link<K> {
    fn drop(&mut self) {
        debug_assert!(
            std::thread::panicking() || !self.is_bound(),
            "element dropped while still linked into a collection"
        );
    }
}

/// An index slot carrying one extra bit.
///
/// Bound when the slot is set *or* the tag is set, so a tagged null (heap
/// root, tree root colored black) still counts as membership.
#[derive(Debug)]
pub struct TaggedLink<K: Index> {
    slot: K,
    tag: bool,
}

impl<K: Index> TaggedLink<K> {
    pub const fn new() -> Self {
        Self {
            slot: K::NONE,
            tag: false,
        }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.tag || self.slot.is_some()
    }

    #[inline]
    pub(crate) fn is_tagged(&self) -> bool {
        self.tag
    }

    #[inline]
    pub(crate) fn slot(&self) -> K {
        self.slot
    }

    #[inline]
    pub(crate) fn raw(&self) -> (K, bool) {
        (self.slot, self.tag)
    }

    #[inline]
    pub(crate) fn set(&mut self, slot: K, tag: bool) {
        self.slot = slot;
        self.tag = tag;
    }

    /// Replaces the slot, keeping the tag.
    #[inline]
    pub(crate) fn set_slot(&mut self, slot: K) {
        self.slot = slot;
    }

    #[inline]
    pub(crate) fn set_tag(&mut self, tag: bool) {
        self.tag = tag;
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.slot = K::NONE;
        self.tag = false;
    }
}

impl<K: Index> Default for TaggedLink<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Index> Drop for TaggedLink<K> {
    fn drop(&mut self) {
        debug_assert!(
            std::thread::panicking() || !self.is_bound(),
            "element dropped while still linked into a collection"
        );
    }
}

/// Locates the link field `L` inside an element.
///
/// Adapters are zero-sized marker types; one element type can have several
/// adapters, one per embedded link. Use [`adapter!`](crate::adapter) to
/// declare them.
pub trait Adapter<L> {
    type Elem: 'static;

    fn link(elem: &Self::Elem) -> &L;

    fn link_mut(elem: &mut Self::Elem) -> &mut L;
}

/// An [`Adapter`] for ordered or hashed collections, which also reads the
/// element's key.
pub trait Keyed<L>: Adapter<L> {
    type Key: ?Sized + 'static;

    fn key(elem: &Self::Elem) -> &Self::Key;
}

/// Declares an [`Adapter`] (and optionally [`Keyed`]) marker type.
///
/// ```
/// use nexus_intrusive::{adapter, HeapLink, TableLink};
///
/// pub struct Word {
///     text: String,
///     count: u32,
///     by_text: TableLink<u32>,
///     by_count: HeapLink<u32>,
/// }
///
/// adapter! {
///     /// Looks words up by their text.
///     pub struct ByText: Word => by_text: TableLink<u32>, key text: str;
/// }
/// adapter! {
///     struct ByCount: Word => by_count: HeapLink<u32>, key count: u32;
/// }
/// ```
#[macro_export]
macro_rules! adapter {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $elem:ty => $field:ident : $link:ty
        $(, key $key:ident : $kty:ty)? ;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $name;

        impl $crate::Adapter<$link> for $name {
            type Elem = $elem;

            #[inline]
            fn link(elem: &$elem) -> &$link {
                &elem.$field
            }

            #[inline]
            fn link_mut(elem: &mut $elem) -> &mut $link {
                &mut elem.$field
            }
        }

        $(
            impl $crate::Keyed<$link> for $name {
                type Key = $kty;

                #[inline]
                fn key(elem: &$elem) -> &$kty {
                    &elem.$key
                }
            }
        )?
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_binding() {
        let mut link: Link<u32> = Link::new();
        assert!(!link.is_bound());

        link.set(3);
        assert!(link.is_bound());
        assert_eq!(link.take(), 3);
        assert!(!link.is_bound());
    }

    #[test]
    fn tagged_null_is_bound() {
        let mut link: TaggedLink<u16> = TaggedLink::new();
        assert!(!link.is_bound());

        link.set(u16::NONE, true);
        assert!(link.is_bound());
        assert!(link.is_tagged());

        link.set_slot(9);
        assert_eq!(link.raw(), (9, true));

        link.set_tag(false);
        assert!(link.is_bound());

        link.clear();
        assert!(!link.is_bound());
    }

    #[test]
    fn adapter_borrows_through_storage() {
        use crate::{BoxedStorage, Storage};

        struct Job {
            rank: u8,
            link: Link<u32>,
        }
        crate::adapter! {
            struct ByRank: Job => link: Link<u32>, key rank: u8;
        }

        fn link_of<A, S>(storage: &S, t: u32) -> &Link<u32>
        where
            A: Adapter<Link<u32>>,
            S: Storage<A::Elem, Index = u32>,
        {
            A::link(storage.get(t).expect("invalid index"))
        }

        fn key_of<A, S>(storage: &S, t: u32) -> &A::Key
        where
            A: Keyed<Link<u32>>,
            S: Storage<A::Elem, Index = u32>,
        {
            A::key(storage.get(t).expect("invalid index"))
        }

        let mut storage: BoxedStorage<Job> = BoxedStorage::with_capacity(2);
        let t = storage.try_insert(Job { rank: 4, link: Link::new() }).unwrap();
        assert!(!link_of::<ByRank, _>(&storage, t).is_bound());
        assert_eq!(*key_of::<ByRank, _>(&storage, t), 4);
    }

    #[test]
    #[should_panic(expected = "still linked")]
    #[cfg(debug_assertions)]
    fn dropping_bound_link_panics() {
        let mut link: Link<u32> = Link::new();
        link.set(0);
        drop(link);
    }
}
