//! Instrumented upstream provider.

#![allow(unsafe_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::ptr::NonNull;

use arena_mr_core::{Heap, Upstream, UpstreamError};

/// One outstanding range: what the caller asked for and the heap block
/// behind it.
struct Range {
    bytes: usize,
    align: usize,
    block: NonNull<u8>,
    block_bytes: usize,
    block_align: usize,
}

/// Block alignment used by skewed ranges; range bases sit `align` past it.
const SKEW_BLOCK: usize = 1 << 16;

#[derive(Default)]
struct Ledger {
    /// Outstanding ranges by address.
    ranges: HashMap<usize, Range>,
    limit: Option<usize>,
    skewed: bool,
    acquire_calls: usize,
    release_calls: usize,
    failures: usize,
    outstanding: usize,
    total_acquired: usize,
    peak: usize,
}

/// Heap-backed [`Upstream`] that records every call.
///
/// With a limit set, an acquisition that would push the outstanding byte
/// count past it fails with [`UpstreamError::Exhausted`]. Releasing a
/// range that was never acquired, or with mismatched size or alignment,
/// panics.
///
/// A [`skewed`](Self::skewed) provider hands out ranges aligned to exactly
/// the requested alignment and to no larger power of two below 64 KiB, so
/// tests see the least favourable base addresses the contract allows.
///
/// Pass `&mock` to the code under test and inspect the counters
/// afterwards.
#[derive(Default)]
pub struct MockUpstream {
    ledger: RefCell<Ledger>,
}

impl MockUpstream {
    /// An unlimited provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that refuses to hold more than `limit` bytes at once.
    pub fn with_limit(limit: usize) -> Self {
        let mock = Self::new();
        mock.set_limit(Some(limit));
        mock
    }

    /// A provider whose ranges are no more aligned than requested.
    pub fn skewed() -> Self {
        let mock = Self::new();
        mock.ledger.borrow_mut().skewed = true;
        mock
    }

    /// Change or remove the byte limit.
    pub fn set_limit(&self, limit: Option<usize>) {
        self.ledger.borrow_mut().limit = limit;
    }

    pub fn acquire_calls(&self) -> usize {
        self.ledger.borrow().acquire_calls
    }

    pub fn release_calls(&self) -> usize {
        self.ledger.borrow().release_calls
    }

    /// Acquisitions refused because of the limit.
    pub fn failures(&self) -> usize {
        self.ledger.borrow().failures
    }

    /// Bytes currently held by callers.
    pub fn outstanding_bytes(&self) -> usize {
        self.ledger.borrow().outstanding
    }

    /// Ranges currently held by callers.
    pub fn outstanding_ranges(&self) -> usize {
        self.ledger.borrow().ranges.len()
    }

    /// Bytes handed out over the provider's lifetime.
    pub fn total_acquired_bytes(&self) -> usize {
        self.ledger.borrow().total_acquired
    }

    /// Highest outstanding byte count seen.
    pub fn peak_bytes(&self) -> usize {
        self.ledger.borrow().peak
    }
}

impl Upstream for MockUpstream {
    fn acquire(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, UpstreamError> {
        let mut ledger = self.ledger.borrow_mut();
        ledger.acquire_calls += 1;
        if let Some(limit) = ledger.limit {
            if ledger.outstanding.saturating_add(bytes) > limit {
                ledger.failures += 1;
                return Err(UpstreamError::Exhausted { bytes, align });
            }
        }
        let (block_bytes, block_align, offset) = if ledger.skewed {
            let block_bytes = bytes
                .checked_add(align)
                .ok_or(UpstreamError::InvalidLayout { bytes, align })?;
            (block_bytes, align.saturating_mul(2).max(SKEW_BLOCK), align)
        } else {
            (bytes, align, 0)
        };
        let block = Heap.acquire(block_bytes, block_align)?;
        // SAFETY: the block is `offset` bytes longer than the range.
        let ptr = unsafe { block.add(offset) };
        let range = Range {
            bytes,
            align,
            block,
            block_bytes,
            block_align,
        };
        ledger.ranges.insert(ptr.as_ptr().addr(), range);
        ledger.outstanding += bytes;
        ledger.total_acquired += bytes;
        ledger.peak = ledger.peak.max(ledger.outstanding);
        Ok(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, bytes: usize, align: usize) {
        let mut ledger = self.ledger.borrow_mut();
        let addr = ptr.as_ptr().addr();
        let range = match ledger.ranges.remove(&addr) {
            Some(recorded) => {
                assert_eq!(
                    (recorded.bytes, recorded.align),
                    (bytes, align),
                    "range {addr:#x} released with a different size or alignment"
                );
                recorded
            }
            None => panic!("range {addr:#x} released but never acquired"),
        };
        ledger.release_calls += 1;
        ledger.outstanding -= bytes;
        // SAFETY: the ledger confirmed the block came from `Heap.acquire`
        // with these parameters and had not been released.
        unsafe { Heap.release(range.block, range.block_bytes, range.block_align) };
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        // Leaked ranges are returned so a failing test does not leak too.
        let ledger = self.ledger.get_mut();
        for (_, range) in ledger.ranges.drain() {
            // SAFETY: recorded by `acquire` and never released.
            unsafe { Heap.release(range.block, range.block_bytes, range.block_align) };
        }
    }
}
