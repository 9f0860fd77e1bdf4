// paracsv - a parallel delimited-text (CSV) loader.
//
// Splits a file into byte ranges on record boundaries (`chunk`/`boundary`),
// tokenizes each range independently (`tokenizer`), infers and accumulates
// typed columns per worker (`column`/`dictionary`), and merges the
// per-worker fragments into one coherent frame (`frame`) that the caller
// pulls columns out of one at a time (`transfer`).
//
// No unwrap/expect outside tests: fallible paths return `Result` or are
// recorded as non-fatal anomaly counters (`error::AnomalyCounts`).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod baselines;
pub mod boundary;
pub mod chunk;
pub mod column;
pub mod config;
pub mod core;
pub mod dictionary;
pub mod error;
pub mod frame;
pub mod loader;
pub mod source;
pub mod tokenizer;
pub mod transfer;
pub mod writer;

pub use column::{Column, ColumnType};
pub use config::{Encoding, LoadParams, Semantics};
pub use error::{AnomalyCounts, LoadError};
pub use loader::Loader;
pub use transfer::{ColumnCursor, TransferredColumn};

// ============================================================================
// Allocator configuration
// ============================================================================
//
// mimalloc backs the global allocator by default, the same choice the
// teacher made to keep worker-thread allocation contention down. With
// `memory_tracking` enabled, allocations are additionally counted so the
// "memory bound" testable property (peak RSS after `forget`) can be
// checked without an external profiler.

#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    pub static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

    pub struct TrackingAllocator;

    #[cfg(feature = "mimalloc")]
    static UNDERLYING: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static UNDERLYING: std::alloc::System = std::alloc::System;

    unsafe impl GlobalAlloc for TrackingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = UNDERLYING.alloc(layout);
            if !ptr.is_null() {
                let current = ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
                let mut peak = PEAK_ALLOCATED.load(Ordering::Relaxed);
                while current > peak {
                    match PEAK_ALLOCATED.compare_exchange_weak(
                        peak,
                        current,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break,
                        Err(p) => peak = p,
                    }
                }
            }
            ptr
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
            UNDERLYING.dealloc(ptr, layout)
        }
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::TrackingAllocator = tracking::TrackingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Current Rust heap allocation in bytes. Returns `0` when the
/// `memory_tracking` feature is disabled.
pub fn current_memory() -> usize {
    #[cfg(feature = "memory_tracking")]
    {
        tracking::ALLOCATED.load(std::sync::atomic::Ordering::SeqCst)
    }
    #[cfg(not(feature = "memory_tracking"))]
    {
        0
    }
}

/// Peak Rust heap allocation in bytes since the last `reset_memory_stats`
/// call (or process start). Returns `0` when `memory_tracking` is disabled.
pub fn peak_memory() -> usize {
    #[cfg(feature = "memory_tracking")]
    {
        tracking::PEAK_ALLOCATED.load(std::sync::atomic::Ordering::SeqCst)
    }
    #[cfg(not(feature = "memory_tracking"))]
    {
        0
    }
}

/// Reset the peak allocation counter to the current allocation, returning
/// `(current, previous_peak)`. A no-op pair of zeros when `memory_tracking`
/// is disabled.
pub fn reset_memory_stats() -> (usize, usize) {
    #[cfg(feature = "memory_tracking")]
    {
        use std::sync::atomic::Ordering;
        let current = tracking::ALLOCATED.load(Ordering::SeqCst);
        let peak = tracking::PEAK_ALLOCATED.swap(current, Ordering::SeqCst);
        (current, peak)
    }
    #[cfg(not(feature = "memory_tracking"))]
    {
        (0, 0)
    }
}
