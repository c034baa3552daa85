//! Core types and traits for the arena-mr allocator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the abstractions shared by the allocator and its consumers:
//! alignment helpers, the upstream provider capability, the
//! memory-resource capability exposed to containers, and error types.
//!
//! Only [`upstream`] and [`traits`] may contain `unsafe` code: the
//! former wraps the global allocator, the latter declares the
//! `unsafe fn` entry points of the capability traits.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod align;
pub mod error;
pub mod traits;
pub mod upstream;

pub use align::{align_up, is_power_of_two, padding_for, MAX_ALIGN};
pub use error::{Corruption, ResourceError, UpstreamError};
pub use traits::{same_instance, MemoryResource};
pub use upstream::{Heap, Upstream};
