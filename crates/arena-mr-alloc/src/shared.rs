//! Container adapter: use an [`ArenaResource`] as an `Allocator`.
//!
//! Standard containers need an allocator they can hold by shared
//! reference. [`SharedArena`] wraps the resource in a `RefCell` and
//! implements [`allocator_api2::alloc::Allocator`] for `&SharedArena`, so
//! `allocator_api2::vec::Vec<T, &SharedArena>` and
//! `allocator_api2::boxed::Box<T, &SharedArena>` draw from the arenas.
//!
//! The containers borrow the adapter, so it outlives every allocation
//! made through it; teardown then returns all arenas upstream.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::cell::{Ref, RefCell};
use std::ptr::{self, NonNull};

use allocator_api2::alloc::{AllocError, Allocator};
use arena_mr_core::{same_instance, Heap, MemoryResource, ResourceError, Upstream};

use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::resource::ArenaResource;
use crate::stats::ArenaStats;

/// An [`ArenaResource`] behind a `RefCell`, usable as an allocator.
///
/// ```
/// use allocator_api2::vec::Vec;
/// use arena_mr_alloc::{ArenaConfig, SharedArena};
///
/// let arena = SharedArena::new(ArenaConfig::new(2, 4096)).unwrap();
/// let mut v = Vec::new_in(&arena);
/// v.extend([1u32, 2, 3]);
/// assert_eq!(arena.stats().live_allocations, 1);
/// drop(v);
/// assert_eq!(arena.stats().live_allocations, 0);
/// ```
pub struct SharedArena<U: Upstream = Heap> {
    inner: RefCell<ArenaResource<U>>,
}

impl SharedArena<Heap> {
    /// Create an adapter over a heap-backed resource.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        ArenaResource::new(config).map(Self::from)
    }
}

impl<U: Upstream> SharedArena<U> {
    /// Create an adapter over a resource drawing from `upstream`.
    pub fn with_upstream(config: ArenaConfig, upstream: U) -> Result<Self, ArenaError> {
        ArenaResource::with_upstream(config, upstream).map(Self::from)
    }

    /// Borrow the underlying resource for inspection.
    ///
    /// # Panics
    ///
    /// Panics if called from inside an allocation through this adapter.
    pub fn borrow(&self) -> Ref<'_, ArenaResource<U>> {
        self.inner.borrow()
    }

    /// Usage snapshot of the underlying resource.
    pub fn stats(&self) -> ArenaStats {
        self.inner.borrow().stats()
    }

    /// Unwrap the resource.
    pub fn into_inner(self) -> ArenaResource<U> {
        self.inner.into_inner()
    }
}

impl<U: Upstream> From<ArenaResource<U>> for SharedArena<U> {
    fn from(resource: ArenaResource<U>) -> Self {
        Self {
            inner: RefCell::new(resource),
        }
    }
}

// SAFETY: blocks come from the arena's bump allocator and stay valid until
// deallocated or until the `SharedArena` is dropped, which the `&self`
// borrow held by every container rules out while they are live. Sizes
// and alignments follow the layout; zero-sized layouts get a dangling,
// aligned pointer that is never passed to the resource.
unsafe impl<U: Upstream> Allocator for &SharedArena<U> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if layout.size() == 0 {
            let dangling = ptr::without_provenance_mut::<u8>(layout.align());
            // `align` is never zero.
            let dangling = NonNull::new(dangling).ok_or(AllocError)?;
            return Ok(NonNull::slice_from_raw_parts(dangling, 0));
        }
        let p = self
            .inner
            .borrow_mut()
            .allocate(layout.size(), layout.align())
            .map_err(|_| AllocError)?;
        let p = NonNull::new(p).ok_or(AllocError)?;
        Ok(NonNull::slice_from_raw_parts(p, layout.size()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        // SAFETY: `ptr` was returned by `allocate` above with this layout.
        let result = unsafe {
            self.inner
                .borrow_mut()
                .deallocate(ptr.as_ptr(), layout.size(), layout.align())
        };
        if let Err(e) = result {
            panic!("{e}");
        }
    }
}

impl<U: Upstream> MemoryResource for SharedArena<U> {
    fn allocate(&mut self, bytes: usize, align: usize) -> Result<*mut u8, ResourceError> {
        self.inner.get_mut().allocate(bytes, align)
    }

    unsafe fn deallocate(
        &mut self,
        ptr: *mut u8,
        bytes: usize,
        align: usize,
    ) -> Result<(), ResourceError> {
        // SAFETY: same contract as the trait method.
        unsafe { self.inner.get_mut().deallocate(ptr, bytes, align) }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        same_instance(self, other)
    }
}

impl<U: Upstream> PartialEq for SharedArena<U> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl<U: Upstream> Eq for SharedArena<U> {}

impl<U: Upstream> std::fmt::Debug for SharedArena<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f.debug_tuple("SharedArena").field(&*inner).finish(),
            Err(_) => f.write_str("SharedArena(<borrowed>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocator_api2::boxed::Box;
    use allocator_api2::vec::Vec;
    use arena_mr_test_utils::MockUpstream;

    #[test]
    fn vec_grows_and_releases() {
        let arena = SharedArena::new(ArenaConfig::new(4, 4096)).unwrap();
        {
            let mut v: Vec<u64, _> = Vec::new_in(&arena);
            for i in 0..200 {
                v.push(i);
            }
            assert_eq!(v.iter().sum::<u64>(), 199 * 200 / 2);
            assert_eq!(arena.stats().live_allocations, 1);
        }
        assert_eq!(arena.stats().live_allocations, 0);
        assert_eq!(arena.stats().used_bytes, 0);
    }

    #[test]
    fn boxes_are_aligned() {
        #[repr(align(64))]
        struct Wide([u8; 64]);

        let arena = SharedArena::new(ArenaConfig::new(2, 1024)).unwrap();
        let a = Box::new_in(Wide([1; 64]), &arena);
        let b = Box::new_in(7u8, &arena);
        assert_eq!((&*a as *const Wide).addr() % 64, 0);
        assert_eq!(a.0[63], 1);
        assert_eq!(*b, 7);
    }

    #[test]
    fn zero_sized_values_bypass_the_arenas() {
        let arena = SharedArena::new(ArenaConfig::new(1, 1024)).unwrap();
        let unit = Box::new_in((), &arena);
        let empty: Vec<u32, _> = Vec::with_capacity_in(0, &arena);
        assert_eq!(arena.stats().live_allocations, 0);
        drop((unit, empty));
        assert_eq!(arena.stats().live_allocations, 0);
    }

    #[test]
    fn upstream_failure_is_alloc_error() {
        let upstream = MockUpstream::with_limit(1024);
        let arena = SharedArena::with_upstream(ArenaConfig::new(1, 1024), &upstream).unwrap();
        let layout = Layout::from_size_align(8192, 8).unwrap();
        assert!((&arena).allocate(layout).is_err());
    }

    #[test]
    #[should_panic(expected = "double-free or memory corruption")]
    fn foreign_deallocation_panics() {
        let arena = SharedArena::new(ArenaConfig::new(1, 1024)).unwrap();
        let mut local = 0u64;
        let foreign = NonNull::from(&mut local).cast::<u8>();
        // SAFETY: deliberately violated; the resource only inspects the address.
        unsafe { (&arena).deallocate(foreign, Layout::new::<u64>()) };
    }

    #[test]
    fn into_inner_keeps_state() {
        let arena = SharedArena::new(ArenaConfig::new(2, 1024)).unwrap();
        let layout = Layout::from_size_align(100, 8).unwrap();
        let block = (&arena).allocate(layout).unwrap();
        let mut resource = arena.into_inner();
        assert_eq!(resource.live_allocations(), 1);
        // SAFETY: `block` came from this resource with this layout.
        unsafe { resource.deallocate(block.cast::<u8>().as_ptr(), 100, 8).unwrap() };
        assert_eq!(resource.live_allocations(), 0);
    }

    #[test]
    fn equality_is_identity() {
        let a = SharedArena::new(ArenaConfig::new(1, 1024)).unwrap();
        let b = SharedArena::new(ArenaConfig::new(1, 1024)).unwrap();
        assert!(a.is_equal(&a));
        assert!(!a.is_equal(&b));
        assert_ne!(a, b);
    }
}
