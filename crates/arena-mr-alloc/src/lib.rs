//! Recycling arena allocator.
//!
//! Hands out memory by bumping a cursor through large fixed-size arenas
//! and recycles each arena wholesale once everything carved from it has
//! been released. Deallocation finds the owning arena from the pointer
//! alone, so callers never track which arena an object came from.
//!
//! # Architecture
//!
//! ```text
//! ArenaResource<U: Upstream>
//! ├── Vec<ArenaDescriptor>   one per chunk: base, capacity, cursor, live count
//! ├── AddressIndex           BTreeMap base → ArenaId, sentinels at 0 and usize::MAX
//! ├── FreePool               drained ArenaIds, most recent on top
//! ├── active: ArenaId        fast-path bump target
//! └── U                      chunk provider (Heap by default)
//!
//! SharedArena<U>             RefCell adapter, `&SharedArena: Allocator`
//! ```
//!
//! # Lifecycle of an arena
//!
//! - **Active:** receives every request that fits.
//! - **Retired:** replaced as active while allocations were still live.
//!   Its unused tail counts as wasted memory.
//! - **Pooled:** drained and reset, waiting to become active again.
//! - **Dedicated:** acquired for one oversized request; pooled like any
//!   other arena once that request is released.
//!
//! Every arena stays acquired and indexed until the resource is dropped.
//!
//! # Threading
//!
//! Single-threaded. The resource may be moved to another thread but not
//! shared between threads.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod descriptor;
pub mod error;
pub mod index;
pub mod pool;
pub mod resource;
pub mod shared;
pub mod stats;

// Public re-exports for the primary API surface.
pub use config::ArenaConfig;
pub use descriptor::{ArenaDescriptor, ArenaId};
pub use error::ArenaError;
pub use index::{AddressIndex, IndexSlot};
pub use pool::FreePool;
pub use resource::ArenaResource;
pub use shared::SharedArena;
pub use stats::ArenaStats;
