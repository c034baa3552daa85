//! The arena allocator core.
//!
//! [`ArenaResource`] carves allocations out of fixed-size arenas with a
//! bump pointer and recycles an arena as a whole once every allocation
//! in it has been released.
//!
//! ```text
//! ArenaResource
//! ├── arenas: Vec<ArenaDescriptor>   owning, indexed by ArenaId
//! ├── index:  AddressIndex           base address → ArenaId (+ sentinels)
//! ├── free:   FreePool               drained ArenaIds, LIFO
//! ├── active: ArenaId                bump target
//! └── upstream: U                    chunk provider
//! ```
//!
//! Allocation bumps the active arena. When it is exhausted, requests larger
//! than a standard arena get a dedicated arena of their own (the active
//! arena is left alone); anything else switches the active arena to one
//! from the free pool, or to a new one from upstream when the pool is empty.
//!
//! Deallocation resolves the pointer through the address index, decrements
//! the owning arena's live count, and when that reaches zero resets the
//! arena and pools it (unless it is the active arena, which simply starts
//! over from its base).

#![allow(unsafe_code)]

use std::ptr::{self, NonNull};

use arena_mr_core::{
    is_power_of_two, same_instance, Corruption, Heap, MemoryResource, ResourceError, Upstream,
    UpstreamError, MAX_ALIGN,
};

use crate::config::ArenaConfig;
use crate::descriptor::{ArenaDescriptor, ArenaId};
use crate::error::ArenaError;
use crate::index::{AddressIndex, IndexSlot};
use crate::pool::FreePool;
use crate::stats::ArenaStats;

/// Recycling arena allocator.
///
/// Single-threaded: the allocation fast path is a bump of the active
/// arena with no synchronisation. Use one instance per thread, or wrap it
/// in a lock outside the allocator. The type is `Send` (when `U` is) but
/// never `Sync`.
///
/// Every request larger than `arena_bytes` acquires a dedicated arena,
/// which joins the free pool once released. Churning such requests grows
/// the pool without bound, so size `arena_bytes` above the largest
/// routine request.
///
/// Not `Clone`: two instances must never own the same chunks. Moving an
/// instance transfers ownership of every arena it holds.
///
/// # Example
///
/// ```
/// use arena_mr_alloc::{ArenaConfig, ArenaResource};
///
/// let mut arena = ArenaResource::new(ArenaConfig::new(4, 4096)).unwrap();
/// let p = arena.allocate(64, 8).unwrap();
/// assert_eq!(p as usize % 8, 0);
/// assert_eq!(arena.live_allocations(), 1);
///
/// // SAFETY: `p` came from `arena` and is not used afterwards.
/// unsafe { arena.deallocate(p, 64, 8).unwrap() };
/// assert_eq!(arena.live_allocations(), 0);
/// ```
pub struct ArenaResource<U: Upstream = Heap> {
    /// Construction parameters.
    config: ArenaConfig,
    /// Every arena ever acquired, in acquisition order.
    arenas: Vec<ArenaDescriptor>,
    /// Base address → arena, bounded by sentinels.
    index: AddressIndex,
    /// Drained arenas ready for reuse.
    free: FreePool,
    /// Arena the fast path bumps from.
    active: ArenaId,
    /// Where arenas come from and go back to.
    upstream: U,
}

impl ArenaResource<Heap> {
    /// Create a resource backed by the process heap.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        Self::with_upstream(config, Heap)
    }
}

impl<U: Upstream> ArenaResource<U> {
    /// Create a resource that draws its arenas from `upstream`.
    ///
    /// Acquires `config.arena_count` standard arenas up front; the last
    /// one acquired becomes the active arena. Pass `&provider` to keep
    /// ownership of the provider with the caller.
    pub fn with_upstream(config: ArenaConfig, upstream: U) -> Result<Self, ArenaError> {
        config.validate()?;

        let mut this = Self {
            arenas: Vec::with_capacity(config.arena_count),
            index: AddressIndex::new(),
            free: FreePool::new(),
            active: ArenaId(0),
            upstream,
            config,
        };
        // Partially built instances release what they hold when dropped.
        for _ in 1..this.config.arena_count {
            let id = this.acquire_arena(this.config.arena_bytes, MAX_ALIGN)?;
            this.free.push(id);
        }
        this.active = this.acquire_arena(this.config.arena_bytes, MAX_ALIGN)?;

        tracing::debug!(
            arenas = this.config.arena_count,
            arena_bytes = this.config.arena_bytes,
            "arena resource created"
        );
        Ok(this)
    }

    /// Allocate `bytes` bytes aligned to `align`.
    ///
    /// Returns a null pointer for `bytes == 0`. Upstream failures are
    /// returned unmodified inside [`ResourceError::Upstream`].
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two.
    #[inline]
    pub fn allocate(&mut self, bytes: usize, align: usize) -> Result<*mut u8, ResourceError> {
        if bytes == 0 {
            return Ok(ptr::null_mut());
        }
        assert!(is_power_of_two(align), "alignment {align} is not a power of two");

        if let Some(p) = self.arenas[self.active.index()].try_bump(bytes, align) {
            return Ok(p.as_ptr());
        }
        match self.allocate_slow(bytes, align) {
            Ok(p) => Ok(p.as_ptr()),
            Err(e) => Err(ResourceError::Upstream(e)),
        }
    }

    /// Release an allocation.
    ///
    /// Null is ignored. The owning arena is found from the address alone;
    /// `bytes` and `align` only appear in the corruption report.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Corruption`] if `ptr` lies outside every arena
    /// this resource has acquired.
    ///
    /// # Panics
    ///
    /// Panics if the owning arena has no outstanding allocations.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`allocate`](Self::allocate) on
    /// this resource, must not have been released already, and must not
    /// be used afterwards. A pointer into live arena memory that does not
    /// satisfy this cannot be detected and corrupts the arena's count.
    pub unsafe fn deallocate(
        &mut self,
        ptr: *mut u8,
        bytes: usize,
        align: usize,
    ) -> Result<(), ResourceError> {
        if ptr.is_null() {
            return Ok(());
        }
        let addr = ptr.addr();
        let id = match self.index.resolve(addr) {
            IndexSlot::Arena(id) if self.arenas[id.index()].contains(addr) => id,
            _ => {
                tracing::warn!(
                    address = addr,
                    bytes,
                    align,
                    "deallocation does not belong to any arena"
                );
                return Err(Corruption {
                    address: addr,
                    bytes,
                    align,
                }
                .into());
            }
        };

        let drained = self.arenas[id.index()].release_one();
        if drained && id != self.active {
            self.free.push(id);
        }
        Ok(())
    }

    /// Identity comparison: `true` only for the very same instance.
    pub fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        same_instance(self, other)
    }

    /// The construction parameters.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Initial standard-arena count.
    pub fn num_arenas(&self) -> usize {
        self.config.arena_count
    }

    /// Size of one standard arena in bytes.
    pub fn arena_bytes(&self) -> usize {
        self.config.arena_bytes
    }

    /// The arena the fast path currently bumps from.
    pub fn active_arena(&self) -> ArenaId {
        self.active
    }

    /// Look up an arena by id.
    pub fn arena(&self, id: ArenaId) -> Option<&ArenaDescriptor> {
        self.arenas.get(id.index())
    }

    /// Iterate over every arena in acquisition order.
    pub fn arenas(&self) -> impl Iterator<Item = (ArenaId, &ArenaDescriptor)> + '_ {
        self.arenas
            .iter()
            .enumerate()
            .map(|(i, a)| (ArenaId(i as u32), a))
    }

    /// The address index.
    pub fn index(&self) -> &AddressIndex {
        &self.index
    }

    /// Arenas acquired so far.
    pub fn arena_count(&self) -> usize {
        self.arenas.len()
    }

    /// Drained arenas in the free pool.
    pub fn free_arena_count(&self) -> usize {
        self.free.len()
    }

    /// Whether `id` is in the free pool.
    pub fn is_pooled(&self, id: ArenaId) -> bool {
        self.free.contains(id)
    }

    /// Bytes consumed by outstanding allocations, padding included.
    pub fn used_memory(&self) -> usize {
        self.arenas.iter().map(ArenaDescriptor::used).sum()
    }

    /// Unused tail bytes stranded in arenas that are neither active nor
    /// pooled.
    pub fn wasted_memory(&self) -> usize {
        self.arenas()
            .filter(|&(id, _)| id != self.active && !self.free.contains(id))
            .map(|(_, a)| a.remaining())
            .sum()
    }

    /// Total bytes held from upstream.
    pub fn acquired_bytes(&self) -> usize {
        self.arenas.iter().map(ArenaDescriptor::capacity).sum()
    }

    /// Outstanding allocations across all arenas.
    pub fn live_allocations(&self) -> usize {
        self.arenas.iter().map(ArenaDescriptor::live).sum()
    }

    /// Compute a usage snapshot.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            arenas: self.arenas.len(),
            free_arenas: self.free.len(),
            dedicated_arenas: self
                .arenas
                .iter()
                .filter(|a| a.capacity() != self.config.arena_bytes || a.align() != MAX_ALIGN)
                .count(),
            acquired_bytes: self.acquired_bytes(),
            used_bytes: self.used_memory(),
            wasted_bytes: self.wasted_memory(),
            live_allocations: self.live_allocations(),
        }
    }

    /// Slow path: the active arena cannot fit the request.
    #[cold]
    fn allocate_slow(
        &mut self,
        bytes: usize,
        align: usize,
    ) -> Result<NonNull<u8>, UpstreamError> {
        if bytes > self.config.arena_bytes {
            return self.allocate_dedicated(bytes, bytes, align);
        }

        let next = match self.free.pop() {
            Some(id) => id,
            None => {
                let id = self.acquire_arena(self.config.arena_bytes, MAX_ALIGN)?;
                tracing::debug!(
                    arena = %id,
                    arena_bytes = self.config.arena_bytes,
                    total = self.arenas.len(),
                    "free pool empty, acquired standard arena"
                );
                id
            }
        };
        // A drained active arena would otherwise be neither active nor pooled.
        if self.arenas[self.active.index()].is_drained() {
            self.free.push(self.active);
        }
        self.active = next;

        match self.arenas[self.active.index()].try_bump(bytes, align) {
            Some(p) => Ok(p),
            None => self.allocate_over_aligned(bytes, align),
        }
    }

    /// Serve a request whose alignment padding overflows a fresh arena.
    ///
    /// Prefers a pooled arena whose base happens to suit the alignment;
    /// otherwise acquires an arena aligned for it. Either way the arena is
    /// taken out of rotation until the request is released, and the
    /// active arena is left alone.
    fn allocate_over_aligned(
        &mut self,
        bytes: usize,
        align: usize,
    ) -> Result<NonNull<u8>, UpstreamError> {
        let arenas = &self.arenas;
        if let Some(id) = self.free.take_first(|id| arenas[id.index()].fits(bytes, align)) {
            match self.arenas[id.index()].try_bump(bytes, align) {
                Some(p) => return Ok(p),
                None => self.free.push(id),
            }
        }
        // Never smaller than a standard arena: once drained it is pooled
        // and may become active.
        self.allocate_dedicated(self.config.arena_bytes, bytes, align)
    }

    /// Serve one request from an arena of its own, `capacity` bytes long.
    ///
    /// The arena is indexed like any other but does not become active.
    fn allocate_dedicated(
        &mut self,
        capacity: usize,
        bytes: usize,
        align: usize,
    ) -> Result<NonNull<u8>, UpstreamError> {
        let id = self.acquire_arena(capacity, align.max(MAX_ALIGN))?;
        tracing::debug!(arena = %id, capacity, bytes, align, "acquired dedicated arena");
        self.arenas[id.index()]
            .try_bump(bytes, align)
            .ok_or(UpstreamError::InvalidLayout { bytes, align })
    }

    /// Acquire a chunk from upstream, record it, and index it.
    fn acquire_arena(&mut self, bytes: usize, align: usize) -> Result<ArenaId, UpstreamError> {
        let base = self.upstream.acquire(bytes, align)?;
        let id = ArenaId(self.arenas.len() as u32);
        self.arenas.push(ArenaDescriptor::new(base, bytes, align));
        self.index.insert(base.as_ptr().addr(), id);
        Ok(id)
    }
}

impl<U: Upstream> MemoryResource for ArenaResource<U> {
    fn allocate(&mut self, bytes: usize, align: usize) -> Result<*mut u8, ResourceError> {
        ArenaResource::allocate(self, bytes, align)
    }

    unsafe fn deallocate(
        &mut self,
        ptr: *mut u8,
        bytes: usize,
        align: usize,
    ) -> Result<(), ResourceError> {
        // SAFETY: same contract as the trait method.
        unsafe { ArenaResource::deallocate(self, ptr, bytes, align) }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        ArenaResource::is_equal(self, other)
    }
}

impl<U: Upstream> PartialEq for ArenaResource<U> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl<U: Upstream> Eq for ArenaResource<U> {}

impl<U: Upstream> std::fmt::Debug for ArenaResource<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaResource")
            .field("config", &self.config)
            .field("active", &self.active)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<U: Upstream> Drop for ArenaResource<U> {
    fn drop(&mut self) {
        let released = self.arenas.len();
        let live = self.live_allocations();
        for arena in self.arenas.drain(..) {
            // SAFETY: each descriptor was built from an `acquire` on this
            // upstream with exactly these parameters, and draining the
            // owning Vec releases it once.
            unsafe {
                self.upstream
                    .release(arena.base(), arena.capacity(), arena.align());
            }
        }
        tracing::debug!(arenas = released, live, "arena resource released");
    }
}

// SAFETY: the raw chunk pointers are exclusively owned by this instance
// and carry no thread affinity; moving the whole resource moves that
// ownership with it. `&ArenaResource` exposes no mutation, but the type
// is still kept `!Sync` through its raw pointers.
unsafe impl<U: Upstream + Send> Send for ArenaResource<U> {}
