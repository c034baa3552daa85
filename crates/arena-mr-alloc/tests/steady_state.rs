//! Integration test: steady-state reuse under insert/clear churn.
//!
//! Inserts 100 000 boxed key/value pairs through the container adapter,
//! clears them, and repeats ten times. After the first cycle the arenas
//! drained by the clear must cover every later cycle, so upstream sees no
//! further acquisitions.

use allocator_api2::boxed::Box;
use allocator_api2::vec::Vec as ArenaVec;
use arena_mr_alloc::{ArenaConfig, SharedArena};
use arena_mr_test_utils::MockUpstream;

const PAIRS: u64 = 100_000;
const CYCLES: usize = 10;

#[test]
fn insert_clear_cycles_do_not_grow() {
    let upstream = MockUpstream::new();
    let arena = SharedArena::with_upstream(ArenaConfig::default(), &upstream).unwrap();

    let mut pairs = Vec::with_capacity(PAIRS as usize);
    let mut acquired_after_first = None;
    for cycle in 0..CYCLES {
        for key in 0..PAIRS {
            pairs.push(Box::new_in((key, key * 2), &arena));
        }
        assert_eq!(arena.stats().live_allocations, PAIRS as usize);
        let checksum: u64 = pairs.iter().map(|pair| pair.1 - pair.0).sum();
        assert_eq!(checksum, PAIRS * (PAIRS - 1) / 2);

        pairs.clear();
        let stats = arena.stats();
        assert_eq!(stats.live_allocations, 0, "cycle {cycle}");
        assert_eq!(stats.used_bytes, 0, "cycle {cycle}");

        match acquired_after_first {
            None => acquired_after_first = Some(upstream.total_acquired_bytes()),
            Some(bytes) => assert_eq!(
                upstream.total_acquired_bytes(),
                bytes,
                "upstream grew in cycle {cycle}"
            ),
        }
    }
    drop(pairs);
    drop(arena);
    assert_eq!(upstream.outstanding_bytes(), 0);
}

#[test]
fn nested_containers_share_the_arena() {
    let arena = SharedArena::new(ArenaConfig::new(4, 4096)).unwrap();
    {
        let mut rows: ArenaVec<ArenaVec<u32, &SharedArena>, &SharedArena> =
            ArenaVec::new_in(&arena);
        for r in 0..16u32 {
            let mut row = ArenaVec::with_capacity_in(8, &arena);
            row.extend((0..8).map(|c| r * 8 + c));
            rows.push(row);
        }
        let sum: u32 = rows.iter().flat_map(|row| row.iter()).sum();
        assert_eq!(sum, (0..128).sum());
        assert!(arena.stats().live_allocations >= 17);
    }
    assert_eq!(arena.stats().live_allocations, 0);
}

#[test]
fn retained_objects_pin_only_their_arena() {
    let upstream = MockUpstream::new();
    let arena = SharedArena::with_upstream(ArenaConfig::new(2, 1024), &upstream).unwrap();

    // Interleave long-lived and short-lived blocks over several arenas.
    let mut keep = Vec::new();
    for round in 0..20u64 {
        let mut scratch = Vec::new();
        for i in 0..40u64 {
            scratch.push(Box::new_in([round, i], &arena));
        }
        keep.push(Box::new_in(round, &arena));
        drop(scratch);
    }
    assert_eq!(arena.stats().live_allocations, keep.len());
    let before = upstream.total_acquired_bytes();

    drop(keep);
    let stats = arena.stats();
    assert_eq!(stats.live_allocations, 0);
    assert_eq!(stats.wasted_bytes, 0);
    assert_eq!(stats.free_arenas, stats.arenas - 1);
    assert_eq!(upstream.total_acquired_bytes(), before);
}
