//! Point-in-time usage statistics for an arena resource.
//!
//! [`ArenaStats`] is computed on demand by walking the arena descriptors.
//! Intended for tests and for tuning `arena_count` / `arena_bytes`, not for
//! the allocation path.

use std::fmt;

/// Snapshot of how an arena resource is using its memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Arenas acquired so far (standard and dedicated).
    pub arenas: usize,
    /// Drained arenas waiting in the free pool.
    pub free_arenas: usize,
    /// Arenas acquired for a single oversized or over-aligned request.
    pub dedicated_arenas: usize,
    /// Total bytes held from the upstream provider.
    pub acquired_bytes: usize,
    /// Bytes consumed by outstanding allocations, alignment padding included.
    pub used_bytes: usize,
    /// Unused tail bytes of arenas that are neither active nor pooled.
    ///
    /// These bytes cannot be handed out until every allocation in their
    /// arena has been released.
    pub wasted_bytes: usize,
    /// Outstanding allocations across all arenas.
    pub live_allocations: usize,
}

impl ArenaStats {
    /// Fraction of acquired bytes currently consumed, in `[0.0, 1.0]`.
    ///
    /// Returns `0.0` if nothing has been acquired.
    pub fn utilisation(&self) -> f64 {
        if self.acquired_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.acquired_bytes as f64
    }
}

impl fmt::Display for ArenaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} arenas ({} free, {} dedicated), {} bytes acquired, {} used, {} wasted, {} live allocations",
            self.arenas,
            self.free_arenas,
            self.dedicated_arenas,
            self.acquired_bytes,
            self.used_bytes,
            self.wasted_bytes,
            self.live_allocations,
        )
    }
}
