//! Address index: maps any pointer back to the arena it came from.
//!
//! Arenas are keyed by base address in an ordered map. Resolving a
//! pointer is a predecessor lookup: the greatest base address that is
//! less than or equal to the pointer. Two sentinel entries at address 0
//! and `usize::MAX` bound the map, so a lookup always lands on an entry
//! and pointers below or above every arena resolve to a sentinel rather
//! than to nothing.

use std::collections::BTreeMap;

use crate::descriptor::ArenaId;

/// What a predecessor lookup resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexSlot {
    /// Below every arena.
    Floor,
    /// The arena with the greatest base address `<=` the pointer.
    Arena(ArenaId),
    /// At or above the upper sentinel.
    Ceiling,
}

/// Ordered index of arena base addresses.
///
/// Every arena stays indexed for the lifetime of the resource, drained or
/// not, so late deallocations into recycled arenas still resolve.
#[derive(Clone, Debug)]
pub struct AddressIndex {
    entries: BTreeMap<usize, IndexSlot>,
}

impl AddressIndex {
    const FLOOR: usize = 0;
    const CEILING: usize = usize::MAX;

    /// Create an index holding only the two sentinels.
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(Self::FLOOR, IndexSlot::Floor);
        entries.insert(Self::CEILING, IndexSlot::Ceiling);
        Self { entries }
    }

    /// Index an arena by its base address.
    ///
    /// # Panics
    ///
    /// Panics if `base` is already indexed or collides with a sentinel.
    pub fn insert(&mut self, base: usize, id: ArenaId) {
        assert!(
            base != Self::FLOOR && base != Self::CEILING,
            "arena base {base:#x} collides with an index sentinel"
        );
        let previous = self.entries.insert(base, IndexSlot::Arena(id));
        assert!(previous.is_none(), "arena base {base:#x} indexed twice");
    }

    /// Predecessor lookup for `addr`.
    #[inline]
    pub fn resolve(&self, addr: usize) -> IndexSlot {
        self.entries
            .range(..=addr)
            .next_back()
            .map_or(IndexSlot::Floor, |(_, slot)| *slot)
    }

    /// Number of indexed arenas, sentinels excluded.
    pub fn len(&self) -> usize {
        self.entries.len() - 2
    }

    /// Whether no arena has been indexed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over `(base, id)` pairs in address order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, ArenaId)> + '_ {
        self.entries.iter().filter_map(|(&base, slot)| match slot {
            IndexSlot::Arena(id) => Some((base, *id)),
            IndexSlot::Floor | IndexSlot::Ceiling => None,
        })
    }
}

impl Default for AddressIndex {
    fn default() -> Self {
        Self::new()
    }
}
