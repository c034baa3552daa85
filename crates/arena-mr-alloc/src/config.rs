//! Arena configuration parameters.

use arena_mr_core::MAX_ALIGN;

use crate::error::ArenaError;

/// Configuration for the arena allocator.
///
/// Controls how many standard arenas are acquired up front and how large
/// each one is. Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Number of standard arenas acquired at construction.
    ///
    /// Default: 10. Must be at least 1. The pool grows past this count on
    /// demand, one arena at a time.
    pub arena_count: usize,

    /// Size of one standard arena in bytes.
    ///
    /// Default: 100_000. Must be a non-zero multiple of [`MAX_ALIGN`].
    /// Requests larger than this get a dedicated arena of their own.
    pub arena_bytes: usize,
}

impl ArenaConfig {
    /// Default number of standard arenas.
    pub const DEFAULT_ARENA_COUNT: usize = 10;

    /// Default size of one standard arena.
    pub const DEFAULT_ARENA_BYTES: usize = 100_000;

    /// Create a config with the given arena count and arena size.
    pub fn new(arena_count: usize, arena_bytes: usize) -> Self {
        Self {
            arena_count,
            arena_bytes,
        }
    }

    /// Check the invariants the allocator relies on.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.arena_count == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "arena_count must be at least 1".into(),
            });
        }
        if self.arena_bytes == 0 || self.arena_bytes % MAX_ALIGN != 0 {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "arena_bytes must be a non-zero multiple of {MAX_ALIGN} (got {})",
                    self.arena_bytes,
                ),
            });
        }
        if self.arena_count.checked_mul(self.arena_bytes).is_none() {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "arena_count ({}) * arena_bytes ({}) overflows usize",
                    self.arena_count, self.arena_bytes,
                ),
            });
        }
        Ok(())
    }

    /// Bytes acquired from upstream at construction.
    pub fn initial_bytes(&self) -> usize {
        self.arena_count.saturating_mul(self.arena_bytes)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ARENA_COUNT, Self::DEFAULT_ARENA_BYTES)
    }
}
