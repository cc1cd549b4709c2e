//! Deterministic call profiler
//!
//! [`Profiler::call`] wraps a closure, timing it and diffing the heap
//! counters from `profkit-trace` around it. Every wrapped call site is
//! keyed by the caller's file and line, so wrapping individual statements
//! gives a line-level view and wrapping whole functions gives a call-level
//! view. Nested calls are tracked on a frame stack:
//! - `tottime` and heap figures exclude time and allocations in nested
//!   profiled calls
//! - `cumtime` includes them
//!
//! The profiler is single-threaded (`&self` with interior mutability).

mod location;

pub use location::{Location, simplify_path};

use location::CallSite;
use profkit_trace::HeapCounters;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Ordering for reported stats (descending)
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    Calls,
    Tottime,
    #[default]
    Cumtime,
    Heap,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Calls => "calls",
            SortKey::Tottime => "tottime",
            SortKey::Cumtime => "cumtime",
            SortKey::Heap => "heap",
        }
    }
}

/// Aggregated figures for one call site
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionStats {
    pub location: Location,
    pub calls: u64,
    /// Time spent in the call site itself
    pub tottime: Duration,
    /// Time including nested profiled calls
    pub cumtime: Duration,
    /// Allocations made by the call site itself
    pub heap: HeapCounters,
}

impl FunctionStats {
    pub fn percall_tottime(&self) -> Duration {
        per_call(self.tottime, self.calls)
    }

    pub fn percall_cumtime(&self) -> Duration {
        per_call(self.cumtime, self.calls)
    }
}

fn per_call(total: Duration, calls: u64) -> Duration {
    if calls == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((total.as_nanos() / calls as u128) as u64)
}

/// Sort stats in place by `key`, largest first. Ties fall back to location.
pub fn sort_stats(stats: &mut [FunctionStats], key: SortKey) {
    stats.sort_by(|a, b| {
        let primary = match key {
            SortKey::Calls => b.calls.cmp(&a.calls),
            SortKey::Tottime => b.tottime.cmp(&a.tottime),
            SortKey::Cumtime => b.cumtime.cmp(&a.cumtime),
            SortKey::Heap => b
                .heap
                .alloc_bytes
                .cmp(&a.heap.alloc_bytes)
                .then(b.heap.alloc_count.cmp(&a.heap.alloc_count)),
        };
        primary.then_with(|| a.location.cmp(&b.location))
    });
}

#[derive(Debug, Default, Clone, Copy)]
struct Accum {
    calls: u64,
    tottime: Duration,
    cumtime: Duration,
    heap: HeapCounters,
}

struct Frame {
    started: Instant,
    heap_start: HeapCounters,
    child_time: Duration,
    child_heap: HeapCounters,
}

#[derive(Default)]
struct State {
    stack: Vec<Frame>,
    stats: HashMap<CallSite, Accum>,
}

/// Records per-call-site call counts, time and allocations
pub struct Profiler {
    state: RefCell<State>,
    created: Instant,
}

impl Profiler {
    pub fn new() -> Self {
        Profiler {
            state: RefCell::new(State {
                stack: Vec::with_capacity(32),
                stats: HashMap::with_capacity(64),
            }),
            created: Instant::now(),
        }
    }

    /// Run `f` as a profiled call named `function`, attributed to the
    /// caller's file and line.
    #[track_caller]
    pub fn call<T>(&self, function: &'static str, f: impl FnOnce() -> T) -> T {
        let _frame = self.enter(CallSite::caller(function));
        f()
    }

    fn enter(&self, site: CallSite) -> FrameGuard<'_> {
        let mut state = self.state.borrow_mut();
        state.stack.push(Frame {
            started: Instant::now(),
            heap_start: HeapCounters::default(),
            child_time: Duration::ZERO,
            child_heap: HeapCounters::default(),
        });
        // Start the window after the push so stack growth is not charged to `f`
        if let Some(frame) = state.stack.last_mut() {
            frame.heap_start = profkit_trace::snapshot();
            frame.started = Instant::now();
        }
        FrameGuard {
            profiler: self,
            site,
        }
    }

    fn exit(&self, site: CallSite) {
        let ended = Instant::now();
        let heap_end = profkit_trace::snapshot();

        let mut state = self.state.borrow_mut();
        let Some(frame) = state.stack.pop() else {
            return;
        };

        let cumtime = ended.saturating_duration_since(frame.started);
        let inclusive_heap = heap_end.delta(&frame.heap_start);

        let entry = state.stats.entry(site).or_default();
        entry.calls += 1;
        entry.cumtime += cumtime;
        entry.tottime += cumtime.saturating_sub(frame.child_time);
        entry.heap = entry.heap.add(&inclusive_heap.delta(&frame.child_heap));

        // Bookkeeping allocations (new map entries) belong to nobody
        let overhead = profkit_trace::snapshot().delta(&heap_end);
        if let Some(parent) = state.stack.last_mut() {
            parent.child_time += cumtime;
            parent.child_heap = parent.child_heap.add(&inclusive_heap).add(&overhead);
        }
    }

    /// Stats for every call site seen so far
    pub fn stats(&self, sort: SortKey) -> Vec<FunctionStats> {
        let state = self.state.borrow();
        let mut stats: Vec<FunctionStats> = state
            .stats
            .iter()
            .map(|(site, accum)| FunctionStats {
                location: site.to_location(),
                calls: accum.calls,
                tottime: accum.tottime,
                cumtime: accum.cumtime,
                heap: accum.heap,
            })
            .collect();
        sort_stats(&mut stats, sort);
        stats
    }

    /// Total profiled calls across all call sites
    pub fn total_calls(&self) -> u64 {
        self.state.borrow().stats.values().map(|a| a.calls).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().stats.is_empty()
    }

    /// Time since the profiler was created
    pub fn elapsed(&self) -> Duration {
        self.created.elapsed()
    }

    /// Forget all recorded stats
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        state.stats.clear();
        state.stack.clear();
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes a frame when dropped, including on unwind
struct FrameGuard<'a> {
    profiler: &'a Profiler,
    site: CallSite,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.profiler.exit(self.site);
    }
}
