//! Process-wide allocation counters, updated by the tracing allocator.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Whether allocations are currently being counted
static TRACING: AtomicBool = AtomicBool::new(false);

static ALLOC_COUNT: AtomicU64 = AtomicU64::new(0);
static ALLOC_BYTES: AtomicU64 = AtomicU64::new(0);
static FREE_COUNT: AtomicU64 = AtomicU64::new(0);
static FREE_BYTES: AtomicU64 = AtomicU64::new(0);

/// Point-in-time copy of the allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapCounters {
    /// Number of allocations observed
    pub alloc_count: u64,
    /// Bytes requested by those allocations
    pub alloc_bytes: u64,
    /// Number of frees observed
    pub free_count: u64,
    /// Bytes released by those frees
    pub free_bytes: u64,
}

impl HeapCounters {
    /// Bytes allocated and not yet freed. Negative when memory allocated
    /// before tracing started is released while tracing.
    pub fn live_bytes(&self) -> i64 {
        self.alloc_bytes as i64 - self.free_bytes as i64
    }

    /// Counters accumulated since `earlier` was taken.
    pub fn delta(&self, earlier: &HeapCounters) -> HeapCounters {
        HeapCounters {
            alloc_count: self.alloc_count.saturating_sub(earlier.alloc_count),
            alloc_bytes: self.alloc_bytes.saturating_sub(earlier.alloc_bytes),
            free_count: self.free_count.saturating_sub(earlier.free_count),
            free_bytes: self.free_bytes.saturating_sub(earlier.free_bytes),
        }
    }

    /// Component-wise sum.
    pub fn add(&self, other: &HeapCounters) -> HeapCounters {
        HeapCounters {
            alloc_count: self.alloc_count + other.alloc_count,
            alloc_bytes: self.alloc_bytes + other.alloc_bytes,
            free_count: self.free_count + other.free_count,
            free_bytes: self.free_bytes + other.free_bytes,
        }
    }

    /// True when no allocation or free was counted.
    pub fn is_empty(&self) -> bool {
        self.alloc_count == 0 && self.free_count == 0
    }
}

/// Start counting allocations.
pub fn start() {
    TRACING.store(true, Ordering::SeqCst);
}

/// Stop counting allocations. Counters keep their values.
pub fn stop() {
    TRACING.store(false, Ordering::SeqCst);
}

/// Whether allocations are currently being counted.
pub fn is_tracing() -> bool {
    TRACING.load(Ordering::Relaxed)
}

/// Zero all counters.
pub fn reset() {
    ALLOC_COUNT.store(0, Ordering::SeqCst);
    ALLOC_BYTES.store(0, Ordering::SeqCst);
    FREE_COUNT.store(0, Ordering::SeqCst);
    FREE_BYTES.store(0, Ordering::SeqCst);
}

/// Read the current counters.
pub fn snapshot() -> HeapCounters {
    HeapCounters {
        alloc_count: ALLOC_COUNT.load(Ordering::Relaxed),
        alloc_bytes: ALLOC_BYTES.load(Ordering::Relaxed),
        free_count: FREE_COUNT.load(Ordering::Relaxed),
        free_bytes: FREE_BYTES.load(Ordering::Relaxed),
    }
}

/// Record an allocation event
#[inline]
#[cfg_attr(not(feature = "heap"), allow(dead_code))]
pub(crate) fn record_alloc(size: usize) {
    if !TRACING.load(Ordering::Relaxed) {
        return;
    }
    ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
    ALLOC_BYTES.fetch_add(size as u64, Ordering::Relaxed);
}

/// Record a deallocation event
#[inline]
#[cfg_attr(not(feature = "heap"), allow(dead_code))]
pub(crate) fn record_dealloc(size: usize) {
    if !TRACING.load(Ordering::Relaxed) {
        return;
    }
    FREE_COUNT.fetch_add(1, Ordering::Relaxed);
    FREE_BYTES.fetch_add(size as u64, Ordering::Relaxed);
}
