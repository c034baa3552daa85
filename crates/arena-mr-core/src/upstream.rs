//! The bulk-memory provider arenas are carved from.
//!
//! An [`Upstream`] hands out large raw byte ranges and takes them back.
//! The arena allocator calls it only when it needs a new chunk and at
//! teardown, never on the allocation fast path.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::UpstreamError;

/// A source of raw byte ranges.
///
/// Implementations must tolerate being called repeatedly for chunk
/// acquisition. Every range handed out by [`acquire`](Upstream::acquire)
/// is returned exactly once through [`release`](Upstream::release) with
/// the same `bytes` and `align`.
pub trait Upstream {
    /// Acquire `bytes` bytes aligned to `align`.
    ///
    /// `bytes` is non-zero and `align` is a power of two.
    fn acquire(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, UpstreamError>;

    /// Return a range previously obtained from [`acquire`](Upstream::acquire).
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `acquire(bytes, align)` on this
    /// provider and must not have been released already.
    unsafe fn release(&self, ptr: NonNull<u8>, bytes: usize, align: usize);
}

impl<U: Upstream + ?Sized> Upstream for &U {
    #[inline]
    fn acquire(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, UpstreamError> {
        (**self).acquire(bytes, align)
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, bytes: usize, align: usize) {
        // SAFETY: forwarded verbatim; the caller upholds `release`'s contract.
        unsafe { (**self).release(ptr, bytes, align) }
    }
}

/// The process's general-purpose heap, via the global allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Heap;

impl Upstream for Heap {
    fn acquire(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, UpstreamError> {
        let layout = layout_for(bytes, align)?;
        // SAFETY: `layout_for` rejects zero-sized layouts.
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(UpstreamError::Exhausted { bytes, align })
    }

    unsafe fn release(&self, ptr: NonNull<u8>, bytes: usize, align: usize) {
        // SAFETY: the caller guarantees `(bytes, align)` matches the
        // acquisition, which already validated the layout.
        unsafe {
            let layout = Layout::from_size_align_unchecked(bytes, align);
            alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

fn layout_for(bytes: usize, align: usize) -> Result<Layout, UpstreamError> {
    if bytes == 0 {
        return Err(UpstreamError::InvalidLayout { bytes, align });
    }
    Layout::from_size_align(bytes, align).map_err(|_| UpstreamError::InvalidLayout { bytes, align })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_round_trip_respects_alignment() {
        for align in [1, 8, 16, 64, 4096] {
            let ptr = Heap.acquire(1000, align).unwrap();
            assert_eq!(ptr.as_ptr() as usize % align, 0);
            // SAFETY: the range is 1000 bytes and freshly acquired.
            unsafe {
                ptr.as_ptr().write_bytes(0xAB, 1000);
                Heap.release(ptr, 1000, align);
            }
        }
    }

    #[test]
    fn zero_bytes_is_invalid_layout() {
        let err = Heap.acquire(0, 8).unwrap_err();
        assert_eq!(err, UpstreamError::InvalidLayout { bytes: 0, align: 8 });
    }

    #[test]
    fn non_power_of_two_alignment_is_invalid_layout() {
        let err = Heap.acquire(64, 24).unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidLayout { .. }));
    }

    #[test]
    fn borrowed_provider_forwards() {
        let heap = Heap;
        let by_ref = &heap;
        let ptr = by_ref.acquire(32, 16).unwrap();
        // SAFETY: acquired just above with the same size and alignment.
        unsafe { by_ref.release(ptr, 32, 16) };
    }
}
