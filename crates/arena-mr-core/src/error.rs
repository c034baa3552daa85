//! Error types shared by every arena-mr crate.
//!
//! Organised by who produces the failure: the upstream provider
//! ([`UpstreamError`]), ownership checks on deallocation
//! ([`Corruption`]), and the union seen by callers of a
//! [`MemoryResource`](crate::MemoryResource) ([`ResourceError`]).

use std::error::Error;
use std::fmt;

/// Failures reported by an [`Upstream`](crate::Upstream) provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpstreamError {
    /// The provider could not supply the requested byte range.
    Exhausted {
        /// Number of bytes requested.
        bytes: usize,
        /// Alignment requested.
        align: usize,
    },
    /// `(bytes, align)` does not describe a valid allocation
    /// (alignment not a power of two, or size overflow once rounded).
    InvalidLayout {
        /// Number of bytes requested.
        bytes: usize,
        /// Alignment requested.
        align: usize,
    },
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { bytes, align } => {
                write!(
                    f,
                    "upstream exhausted: cannot supply {bytes} bytes at alignment {align}"
                )
            }
            Self::InvalidLayout { bytes, align } => {
                write!(f, "invalid layout: {bytes} bytes at alignment {align}")
            }
        }
    }
}

impl Error for UpstreamError {}

/// A deallocation that could not be resolved to any arena.
///
/// Raised for pointers this allocator never produced, including
/// pointers freed after their arena was already torn down. Pointers that
/// happen to fall inside a live arena cannot be told apart from genuine
/// allocations and are accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corruption {
    /// The offending address.
    pub address: usize,
    /// Size passed to the deallocation call (advisory).
    pub bytes: usize,
    /// Alignment passed to the deallocation call (advisory).
    pub align: usize,
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "double-free or memory corruption: address {:#x} ({} bytes, alignment {}) \
             does not belong to this resource",
            self.address, self.bytes, self.align
        )
    }
}

impl Error for Corruption {}

/// Errors returned by a [`MemoryResource`](crate::MemoryResource).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceError {
    /// The upstream provider failed; the original error is preserved.
    Upstream(UpstreamError),
    /// A deallocation did not resolve to memory owned by the resource.
    Corruption(Corruption),
}

impl ResourceError {
    /// Returns the corruption details if this is a corruption signal.
    pub fn corruption(&self) -> Option<&Corruption> {
        match self {
            Self::Corruption(c) => Some(c),
            Self::Upstream(_) => None,
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream(e) => write!(f, "allocation failed: {e}"),
            Self::Corruption(c) => write!(f, "{c}"),
        }
    }
}

impl Error for ResourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Upstream(e) => Some(e),
            Self::Corruption(c) => Some(c),
        }
    }
}

impl From<UpstreamError> for ResourceError {
    fn from(e: UpstreamError) -> Self {
        Self::Upstream(e)
    }
}

impl From<Corruption> for ResourceError {
    fn from(c: Corruption) -> Self {
        Self::Corruption(c)
    }
}
