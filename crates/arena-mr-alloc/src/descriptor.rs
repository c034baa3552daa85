//! Per-arena bookkeeping.
//!
//! An [`ArenaDescriptor`] describes one contiguous chunk acquired from the
//! upstream provider: where it starts, how big it is, how far the bump
//! cursor has advanced, and how many allocations carved from it are still
//! outstanding. Descriptors live in the resource's owning `Vec` and are
//! referred to everywhere else by [`ArenaId`].

#![allow(unsafe_code)]

use std::fmt;
use std::ptr::NonNull;

use arena_mr_core::padding_for;

/// Index of an arena in the resource's owning collection.
///
/// Stable for the lifetime of the resource: arenas are appended, never
/// removed or reordered, until teardown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(pub u32);

impl ArenaId {
    /// Position in the owning collection.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bookkeeping for a single arena.
///
/// The descriptor does not own the memory it describes; the resource
/// returns it to the upstream provider at teardown using
/// [`base`](Self::base), [`capacity`](Self::capacity) and
/// [`align`](Self::align).
#[derive(Debug)]
pub struct ArenaDescriptor {
    /// First byte of the chunk.
    base: NonNull<u8>,
    /// Size of the chunk. Fixed at creation.
    capacity: usize,
    /// Alignment the chunk was acquired with.
    align: usize,
    /// Bump pointer: offset of the next free byte from `base`.
    cursor: usize,
    /// Outstanding allocations carved from this arena.
    live: usize,
}

impl ArenaDescriptor {
    /// Describe a freshly acquired, empty chunk.
    pub(crate) fn new(base: NonNull<u8>, capacity: usize, align: usize) -> Self {
        Self {
            base,
            capacity,
            align,
            cursor: 0,
            live: 0,
        }
    }

    /// Padding plus `bytes` needed at the cursor, if that fits the remainder.
    #[inline]
    fn bump_span(&self, bytes: usize, align: usize) -> Option<(usize, usize)> {
        let here = self.base_addr() + self.cursor;
        let pad = padding_for(here, align)?;
        let needed = pad.checked_add(bytes)?;
        (needed <= self.remaining()).then_some((pad, needed))
    }

    /// Whether [`try_bump`](Self::try_bump) would succeed.
    pub(crate) fn fits(&self, bytes: usize, align: usize) -> bool {
        self.bump_span(bytes, align).is_some()
    }

    /// Bump-allocate `bytes` bytes aligned to `align`.
    ///
    /// On success advances the cursor past the alignment padding and the
    /// allocation, and counts one more live allocation. Returns `None`
    /// without touching any state if the remaining space is too small.
    #[inline]
    pub(crate) fn try_bump(&mut self, bytes: usize, align: usize) -> Option<NonNull<u8>> {
        let (pad, needed) = self.bump_span(bytes, align)?;
        let offset = self.cursor + pad;
        self.cursor += needed;
        self.live += 1;
        // SAFETY: offset + bytes <= capacity, so the pointer stays inside
        // the chunk this descriptor was created for.
        Some(unsafe { self.base.add(offset) })
    }

    /// Account for one deallocation.
    ///
    /// Returns `true` when the last outstanding allocation was released;
    /// the cursor is then reset so the whole chunk is reusable at once.
    ///
    /// # Panics
    ///
    /// Panics if the arena has no outstanding allocations (a double free
    /// that slipped past the address check).
    pub(crate) fn release_one(&mut self) -> bool {
        assert!(
            self.live > 0,
            "arena at {:#x} released more allocations than it handed out",
            self.base_addr()
        );
        self.live -= 1;
        if self.live == 0 {
            self.cursor = 0;
            true
        } else {
            false
        }
    }

    /// First byte of the chunk.
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Address of the first byte of the chunk.
    #[inline]
    pub fn base_addr(&self) -> usize {
        self.base.as_ptr().addr()
    }

    /// Total size of the chunk in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Alignment the chunk was acquired with.
    pub fn align(&self) -> usize {
        self.align
    }

    /// Bytes consumed since the last reset, alignment padding included.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Bytes still available for bump allocation.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    /// Number of outstanding allocations.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Whether nothing carved from this arena is outstanding.
    pub fn is_drained(&self) -> bool {
        self.live == 0
    }

    /// Whether `addr` lies inside the chunk.
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr.wrapping_sub(self.base_addr()) < self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(64))]
    struct Chunk([u8; 256]);

    fn with_chunk<R>(f: impl FnOnce(ArenaDescriptor) -> R) -> R {
        let mut chunk = Box::new(Chunk([0; 256]));
        let base = NonNull::from(&mut chunk.0).cast::<u8>();
        f(ArenaDescriptor::new(base, 256, 64))
    }

    #[test]
    fn sequential_bumps_are_adjacent() {
        with_chunk(|mut arena| {
            let a = arena.try_bump(10, 1).unwrap();
            let b = arena.try_bump(20, 1).unwrap();
            assert_eq!(b.as_ptr().addr() - a.as_ptr().addr(), 10);
            assert_eq!(arena.used(), 30);
            assert_eq!(arena.remaining(), 226);
            assert_eq!(arena.live(), 2);
        });
    }

    #[test]
    fn padding_is_charged_to_the_request() {
        with_chunk(|mut arena| {
            arena.try_bump(1, 1).unwrap();
            let p = arena.try_bump(8, 16).unwrap();
            assert_eq!(p.as_ptr().addr() % 16, 0);
            assert_eq!(arena.used(), 16 + 8);
        });
    }

    #[test]
    fn exact_fit_succeeds_and_overflow_fails() {
        with_chunk(|mut arena| {
            assert!(arena.try_bump(256, 8).is_some());
            assert!(arena.try_bump(1, 1).is_none());
            assert_eq!(arena.live(), 1);
        });
    }

    #[test]
    fn failed_bump_leaves_state_untouched() {
        with_chunk(|mut arena| {
            arena.try_bump(250, 1).unwrap();
            assert!(arena.try_bump(8, 8).is_none());
            assert_eq!(arena.used(), 250);
            assert_eq!(arena.live(), 1);
        });
    }

    #[test]
    fn fits_agrees_with_bump() {
        with_chunk(|mut arena| {
            arena.try_bump(200, 1).unwrap();
            assert!(arena.fits(56, 8));
            assert!(!arena.fits(1, 64));
            assert_eq!(arena.used(), 200);
            assert!(arena.try_bump(56, 8).is_some());
            assert!(!arena.fits(1, 1));
        });
    }

    #[test]
    fn padding_overflow_fails() {
        with_chunk(|mut arena| {
            arena.try_bump(200, 1).unwrap();
            // 56 bytes remain but the next 64-byte boundary is the end.
            assert!(arena.try_bump(1, 64).is_none());
        });
    }

    #[test]
    fn last_release_resets_cursor() {
        with_chunk(|mut arena| {
            arena.try_bump(100, 8).unwrap();
            arena.try_bump(100, 8).unwrap();
            assert!(!arena.release_one());
            assert_eq!(arena.used(), 200);
            assert!(arena.release_one());
            assert!(arena.is_drained());
            assert_eq!(arena.used(), 0);
            assert_eq!(arena.remaining(), arena.capacity());
        });
    }

    #[test]
    #[should_panic(expected = "released more allocations than it handed out")]
    fn release_below_zero_panics() {
        with_chunk(|mut arena| {
            arena.release_one();
        });
    }

    #[test]
    fn contains_is_half_open() {
        with_chunk(|arena| {
            let base = arena.base_addr();
            assert!(arena.contains(base));
            assert!(arena.contains(base + 255));
            assert!(!arena.contains(base + 256));
            assert!(!arena.contains(base - 1));
        });
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn bumped_pointers_are_aligned_and_in_bounds(
                requests in proptest::collection::vec((1usize..48, 0u32..7), 1..40),
            ) {
                with_chunk(|mut arena| {
                    let mut granted = 0;
                    for &(bytes, shift) in &requests {
                        let align = 1usize << shift;
                        if let Some(p) = arena.try_bump(bytes, align) {
                            let addr = p.as_ptr().addr();
                            prop_assert_eq!(addr % align, 0);
                            prop_assert!(arena.contains(addr));
                            prop_assert!(addr + bytes <= arena.base_addr() + arena.capacity());
                            granted += 1;
                        }
                    }
                    prop_assert_eq!(arena.live(), granted);
                    prop_assert!(arena.used() <= arena.capacity());
                    Ok(())
                })?;
            }
        }
    }
}
