//! Insert/clear churn with per-cycle arena statistics.
//!
//! Demonstrates: configure → build a shared arena over an instrumented
//! upstream → run cycles → watch the arena count settle after the first
//! cycle. Run with `RUST_LOG=arena_mr_alloc=debug` to see arena
//! acquisitions as they happen.

use std::time::Instant;

use allocator_api2::alloc::Global;
use arena_mr_alloc::{ArenaConfig, SharedArena};
use arena_mr_bench::insert_clear;
use arena_mr_test_utils::MockUpstream;

const PAIRS: u64 = 100_000;
const CYCLES: usize = 10;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = ArenaConfig::default();
    println!(
        "=== Arena churn: {PAIRS} pairs x {CYCLES} cycles, {} arenas of {} bytes ===\n",
        config.arena_count, config.arena_bytes
    );

    let upstream = MockUpstream::new();
    let arena = match SharedArena::with_upstream(config, &upstream) {
        Ok(arena) => arena,
        Err(e) => {
            eprintln!("cannot build arena: {e}");
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    for cycle in 1..=CYCLES {
        let checksum = insert_clear(&arena, PAIRS, 1);
        let stats = arena.stats();
        tracing::info!(cycle, checksum, arenas = stats.arenas, "cycle complete");
        println!(
            "cycle {cycle:>2}: {stats} | upstream: {} calls, {} bytes",
            upstream.acquire_calls(),
            upstream.total_acquired_bytes()
        );
    }
    let arena_time = start.elapsed();

    let start = Instant::now();
    insert_clear(Global, PAIRS, CYCLES);
    let global_time = start.elapsed();

    println!("\narena:  {arena_time:?}");
    println!("global: {global_time:?}");
    println!("peak upstream bytes: {}", upstream.peak_bytes());

    drop(arena);
    println!("outstanding after teardown: {} bytes", upstream.outstanding_bytes());
}
