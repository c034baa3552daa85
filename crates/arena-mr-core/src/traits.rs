//! The allocator capability exposed to containers.

#![allow(unsafe_code)]

use crate::error::ResourceError;

/// A pointer-producing, pointer-consuming memory source.
///
/// Containers generic over this trait compose with any implementation
/// without modification. Implementations are single-threaded unless they
/// say otherwise; sharing one across threads needs external locking.
pub trait MemoryResource {
    /// Allocate `bytes` bytes aligned to `align`.
    ///
    /// A zero-byte request returns a null pointer ("no storage") and
    /// must not consume any memory. Failures of the backing provider are
    /// returned unmodified inside [`ResourceError::Upstream`].
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two.
    fn allocate(&mut self, bytes: usize, align: usize) -> Result<*mut u8, ResourceError>;

    /// Release memory obtained from [`allocate`](MemoryResource::allocate).
    ///
    /// Null pointers are ignored. `bytes` and `align` are advisory: the
    /// owner of `ptr` is located from the address alone, and the values
    /// are only echoed back in a [`Corruption`](crate::Corruption) report.
    ///
    /// # Safety
    ///
    /// `ptr` must not be used after this call, and must not be passed
    /// here twice. Pointers that were never produced by this resource
    /// are reported as corruption when they fall outside its memory, but
    /// a foreign pointer aliasing live memory cannot be detected.
    unsafe fn deallocate(
        &mut self,
        ptr: *mut u8,
        bytes: usize,
        align: usize,
    ) -> Result<(), ResourceError>;

    /// Whether memory allocated from `self` can be released through
    /// `other` and vice versa. Identity comparison: only the same
    /// instance is equal.
    fn is_equal(&self, other: &dyn MemoryResource) -> bool;
}

/// Identity comparison helper for [`MemoryResource::is_equal`]
/// implementations.
#[inline]
pub fn same_instance<R: MemoryResource>(this: &R, other: &dyn MemoryResource) -> bool {
    std::ptr::addr_eq(this, other)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Null;

    impl MemoryResource for Null {
        fn allocate(&mut self, _bytes: usize, _align: usize) -> Result<*mut u8, ResourceError> {
            Ok(std::ptr::null_mut())
        }

        unsafe fn deallocate(
            &mut self,
            _ptr: *mut u8,
            _bytes: usize,
            _align: usize,
        ) -> Result<(), ResourceError> {
            Ok(())
        }

        fn is_equal(&self, other: &dyn MemoryResource) -> bool {
            same_instance(self, other)
        }
    }

    #[test]
    fn identity_not_state_decides_equality() {
        let null = Null;
        assert!(null.is_equal(&null));
        let erased: &dyn MemoryResource = &null;
        assert!(erased.is_equal(&null));
    }

    #[test]
    fn distinct_instances_are_not_equal() {
        let a = Box::new(7u8);
        let b = Box::new(7u8);
        struct Tagged<'a>(&'a u8);
        impl MemoryResource for Tagged<'_> {
            fn allocate(&mut self, _: usize, _: usize) -> Result<*mut u8, ResourceError> {
                Ok(std::ptr::null_mut())
            }
            unsafe fn deallocate(
                &mut self,
                _: *mut u8,
                _: usize,
                _: usize,
            ) -> Result<(), ResourceError> {
                Ok(())
            }
            fn is_equal(&self, other: &dyn MemoryResource) -> bool {
                same_instance(self, other)
            }
        }
        let (x, y) = (Tagged(&a), Tagged(&b));
        assert!(!x.is_equal(&y));
        assert!(x.is_equal(&x));
    }
}
