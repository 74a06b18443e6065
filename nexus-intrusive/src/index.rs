//! Handles into caller-owned element storage.
//!
//! Every link field in this crate holds one of these. The type's `MAX` is
//! reserved as the null link, so a link costs exactly one index and no
//! `Option` discriminant.

use core::fmt::Debug;

/// A copyable element handle with a reserved "no element" value.
///
/// # Example
///
/// ```
/// use nexus_intrusive::Index;
///
/// let idx: u32 = 5;
/// assert!(idx.is_some());
/// assert!(u32::NONE.is_none());
/// assert_eq!(u32::NONE.to_option(), None);
/// ```
pub trait Index: Copy + Eq + Debug {
    /// The null handle.
    const NONE: Self;

    #[inline]
    fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    fn is_some(self) -> bool {
        !self.is_none()
    }

    /// Maps the null handle to `None`.
    #[inline]
    fn to_option(self) -> Option<Self> {
        if self.is_none() { None } else { Some(self) }
    }

    fn as_usize(self) -> usize;

    /// Converts a raw position back into a handle.
    ///
    /// Values at or above `NONE` are a caller bug.
    fn from_usize(val: usize) -> Self;
}

macro_rules! impl_index_for_unsigned {
    ($($ty:ty),*) => {
        $(
            impl Index for $ty {
                const NONE: Self = <$ty>::MAX;

                #[inline]
                fn as_usize(self) -> usize {
                    self as usize
                }

                #[inline]
                fn from_usize(val: usize) -> Self {
                    debug_assert!(val <= <$ty>::MAX as usize, "index {val} overflows {}", stringify!($ty));
                    val as Self
                }
            }
        )*
    };
}

impl_index_for_unsigned!(u8, u16, u32, u64, usize);
