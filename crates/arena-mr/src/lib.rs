//! arena-mr: a recycling arena memory resource.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the arena-mr sub-crates. For most users, adding `arena-mr` as a single
//! dependency is sufficient.
//!
//! Memory is handed out by bumping a cursor through large fixed-size
//! arenas. An arena is reset and reused as soon as every allocation carved
//! from it has been released, so workloads that repeatedly build and clear
//! the same working set reach a steady state with no further requests to
//! the system allocator.
//!
//! # Quick start
//!
//! ```rust
//! use arena_mr::prelude::*;
//! use arena_mr::collections::{Box, Vec};
//!
//! let arena = SharedArena::new(ArenaConfig::new(4, 64 * 1024)).unwrap();
//!
//! for _ in 0..3 {
//!     let mut nodes = Vec::new_in(&arena);
//!     for key in 0..1_000u32 {
//!         nodes.push(Box::new_in((key, key * 2), &arena));
//!     }
//!     assert_eq!(nodes[10].1, 20);
//! }
//!
//! // Every cycle reused the same arenas.
//! let stats = arena.stats();
//! assert_eq!(stats.live_allocations, 0);
//! assert_eq!(stats.free_arenas, stats.arenas - 1);
//! ```
//!
//! Without the container adapter, the resource is driven directly:
//!
//! ```rust
//! use arena_mr::prelude::*;
//!
//! let mut arena = ArenaResource::new(ArenaConfig::default()).unwrap();
//! let p = arena.allocate(256, 32).unwrap();
//! assert_eq!(p as usize % 32, 0);
//! // SAFETY: `p` came from `arena` and is not used afterwards.
//! unsafe { arena.deallocate(p, 256, 32).unwrap() };
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `arena-mr-core` | Capability traits, upstream providers, errors, alignment |
//! | [`alloc`] | `arena-mr-alloc` | The arena resource, its bookkeeping, and the container adapter |
//! | [`collections`] | `allocator-api2` | Allocator-aware `Vec` and `Box` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Capability traits, upstream providers, and errors (`arena-mr-core`).
///
/// Implement [`types::Upstream`] to draw arenas from something other than
/// the process heap.
pub use arena_mr_core as types;

/// The arena resource and its bookkeeping (`arena-mr-alloc`).
///
/// [`alloc::ArenaResource`] is the allocator itself;
/// [`alloc::SharedArena`] adapts it for allocator-aware containers.
pub use arena_mr_alloc as alloc;

/// Allocator-aware containers that accept `&SharedArena`.
pub mod collections {
    pub use allocator_api2::boxed::Box;
    pub use allocator_api2::vec::Vec;
}

/// Common imports for typical usage.
///
/// ```rust
/// use arena_mr::prelude::*;
/// ```
pub mod prelude {
    // Allocator
    pub use arena_mr_alloc::{ArenaConfig, ArenaResource, ArenaStats, SharedArena};

    // Capabilities
    pub use arena_mr_core::{Heap, MemoryResource, Upstream};

    // Errors
    pub use arena_mr_alloc::ArenaError;
    pub use arena_mr_core::{Corruption, ResourceError, UpstreamError};
}
