//! Stack of drained arenas waiting to be reused.

use smallvec::SmallVec;

use crate::descriptor::ArenaId;

/// Drained arenas available for reuse, most recently freed on top.
///
/// Holds ids only; the descriptors stay in the resource's owning
/// collection. Typical pools are small enough to live inline.
#[derive(Clone, Debug, Default)]
pub struct FreePool {
    stack: SmallVec<[ArenaId; 16]>,
}

impl FreePool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an arena available for reuse.
    pub fn push(&mut self, id: ArenaId) {
        debug_assert!(!self.contains(id), "arena {id} pushed to the free pool twice");
        self.stack.push(id);
    }

    /// Take the most recently freed arena.
    pub fn pop(&mut self) -> Option<ArenaId> {
        self.stack.pop()
    }

    /// Remove and return the most recently freed arena matching `pred`.
    pub fn take_first(&mut self, mut pred: impl FnMut(ArenaId) -> bool) -> Option<ArenaId> {
        let pos = self.stack.iter().rposition(|&id| pred(id))?;
        Some(self.stack.remove(pos))
    }

    /// Number of arenas in the pool.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Whether `id` is currently pooled.
    pub fn contains(&self, id: ArenaId) -> bool {
        self.stack.contains(&id)
    }

    /// Iterate from the bottom of the stack to the top.
    pub fn iter(&self) -> impl Iterator<Item = ArenaId> + '_ {
        self.stack.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_most_recent_first() {
        let mut pool = FreePool::new();
        pool.push(ArenaId(1));
        pool.push(ArenaId(2));
        pool.push(ArenaId(3));
        assert_eq!(pool.pop(), Some(ArenaId(3)));
        assert_eq!(pool.pop(), Some(ArenaId(2)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn empty_pool_pops_none() {
        let mut pool = FreePool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.pop(), None);
    }

    #[test]
    fn contains_tracks_membership() {
        let mut pool = FreePool::new();
        pool.push(ArenaId(7));
        assert!(pool.contains(ArenaId(7)));
        pool.pop();
        assert!(!pool.contains(ArenaId(7)));
    }

    #[test]
    fn take_first_removes_only_the_match() {
        let mut pool = FreePool::new();
        for i in 0..4 {
            pool.push(ArenaId(i));
        }
        assert_eq!(pool.take_first(|id| id.0 % 2 == 0), Some(ArenaId(2)));
        assert_eq!(pool.take_first(|id| id.0 > 10), None);
        assert_eq!(pool.iter().collect::<Vec<_>>(), [ArenaId(0), ArenaId(1), ArenaId(3)]);
    }

    #[test]
    fn grows_past_inline_capacity() {
        let mut pool = FreePool::new();
        for i in 0..40 {
            pool.push(ArenaId(i));
        }
        assert_eq!(pool.len(), 40);
        assert_eq!(pool.iter().next(), Some(ArenaId(0)));
        assert_eq!(pool.pop(), Some(ArenaId(39)));
    }
}
