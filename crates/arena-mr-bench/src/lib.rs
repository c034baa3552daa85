//! Workloads shared by the arena-mr benchmarks and examples.
//!
//! Every workload is generic over its memory source so the same code runs
//! against the arena and against the global allocator:
//!
//! - [`insert_clear`]: build and clear a working set of boxed key/value pairs
//! - [`string_table`]: grow a table of short owned strings
//! - [`mixed_sizes`]: sliding window of variable-size raw allocations

#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::VecDeque;

use allocator_api2::alloc::Allocator;
use allocator_api2::boxed::Box;
use allocator_api2::vec::Vec as AllocVec;
use arena_mr_alloc::ArenaConfig;
use arena_mr_core::{MemoryResource, ResourceError};

/// Pairs per cycle in the reference churn workload.
pub const REFERENCE_PAIRS: u64 = 1_000;

/// Cycles in the reference churn workload.
pub const REFERENCE_CYCLES: usize = 100;

/// Arena layout tuned for the reference churn workload: one arena holds a
/// whole cycle, so the steady state never leaves the fast path.
pub fn reference_config() -> ArenaConfig {
    ArenaConfig::new(10, 1 << 20)
}

/// Insert `pairs` boxed `(key, value)` pairs, then drop them all; repeat
/// `cycles` times.
///
/// The node handles live in a global-heap `Vec` so that only the nodes
/// themselves are drawn from `alloc`. Returns a checksum over every
/// inserted value.
pub fn insert_clear<A: Allocator + Copy>(alloc: A, pairs: u64, cycles: usize) -> u64 {
    let mut nodes = Vec::with_capacity(pairs as usize);
    let mut checksum = 0u64;
    for _ in 0..cycles {
        for key in 0..pairs {
            nodes.push(Box::new_in((key, key ^ 0x5555), alloc));
        }
        checksum = nodes
            .iter()
            .fold(checksum, |acc, node| acc.wrapping_add(node.1));
        nodes.clear();
    }
    checksum
}

/// Build a table of `count` decimal strings, each stored in its own
/// allocator-aware byte vector. Returns the total string length.
pub fn string_table<A: Allocator + Copy>(alloc: A, count: usize) -> usize {
    let mut table: AllocVec<AllocVec<u8, A>, A> = AllocVec::new_in(alloc);
    for i in 0..count {
        let digits = i.to_string();
        let mut entry = AllocVec::with_capacity_in(digits.len(), alloc);
        entry.extend_from_slice(digits.as_bytes());
        table.push(entry);
    }
    table.iter().map(|entry| entry.len()).sum()
}

/// Allocate `ops` blocks of pseudo-random size through `resource`, keeping
/// at most `window` of them live and releasing the oldest first.
///
/// Sizes range over `8..=1024` bytes with alignments of 8 or 16. The
/// sequence depends only on `seed`. Returns the number of bytes requested.
pub fn mixed_sizes(
    resource: &mut dyn MemoryResource,
    ops: usize,
    window: usize,
    seed: u64,
) -> Result<usize, ResourceError> {
    let mut state = seed | 1;
    let mut live: VecDeque<(*mut u8, usize, usize)> = VecDeque::with_capacity(window + 1);
    let mut requested = 0;

    for _ in 0..ops {
        state = xorshift(state);
        let bytes = 8 + (state % 1017) as usize;
        let align = if state & 0x100 == 0 { 8 } else { 16 };
        live.push_back((resource.allocate(bytes, align)?, bytes, align));
        requested += bytes;

        if live.len() > window {
            if let Some((p, bytes, align)) = live.pop_front() {
                release(resource, p, bytes, align)?;
            }
        }
    }
    for (p, bytes, align) in live {
        release(resource, p, bytes, align)?;
    }
    Ok(requested)
}

#[allow(unsafe_code)]
fn release(
    resource: &mut dyn MemoryResource,
    p: *mut u8,
    bytes: usize,
    align: usize,
) -> Result<(), ResourceError> {
    // SAFETY: `p` came from `resource.allocate(bytes, align)` in
    // `mixed_sizes` and is released exactly once.
    unsafe { resource.deallocate(p, bytes, align) }
}

fn xorshift(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}
