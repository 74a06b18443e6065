//! Key ordering and hashing policies.
//!
//! Ordered collections take a [`Compare`] type parameter and the hash table
//! takes a [`KeyHash`] one. Both are stateless marker types, so a collection
//! carries no comparator or hasher instance.

use core::cmp::Ordering;
use core::hash::{Hash, Hasher};

/// A total order over keys.
pub trait Compare<T: ?Sized> {
    fn compare(a: &T, b: &T) -> Ordering;
}

/// The key's natural order. Heaps built with it are min-heaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ascending;

impl<T: Ord + ?Sized> Compare<T> for Ascending {
    #[inline]
    fn compare(a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// The reverse of the key's natural order. Heaps built with it are max-heaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct Descending;

impl<T: Ord + ?Sized> Compare<T> for Descending {
    #[inline]
    fn compare(a: &T, b: &T) -> Ordering {
        b.cmp(a)
    }
}

/// Hashes a key to 64 bits.
pub trait KeyHash<T: ?Sized> {
    fn hash(key: &T) -> u64;
}

/// 64-bit FNV-1a over the key's [`Hash`] byte stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1a;

impl<T: Hash + ?Sized> KeyHash<T> for Fnv1a {
    #[inline]
    fn hash(key: &T) -> u64 {
        let mut hasher = FnvHasher::default();
        key.hash(&mut hasher);
        hasher.finish()
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Streaming FNV-1a state.
#[derive(Debug, Clone, Copy)]
pub struct FnvHasher(u64);

impl Default for FnvHasher {
    fn default() -> Self {
        Self(FNV_OFFSET)
    }
}

impl Hasher for FnvHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}
