//! Allocation tracing for profkit.
//!
//! This crate provides a global allocator that counts allocations and frees
//! (count and bytes) while tracing is started:
//! - **start / stop**: toggle counting without swapping allocators
//! - **snapshot**: read the totals at any point and diff them
//!
//! # Usage
//!
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! profkit-trace = { version = "0.1", features = ["heap"] }
//! ```
//!
//! Install the allocator with the `profiler!` macro, then bracket the code
//! under test:
//! ```rust,ignore
//! profkit_trace::profiler!();
//!
//! profkit_trace::start();
//! let before = profkit_trace::snapshot();
//! work();
//! let used = profkit_trace::snapshot().delta(&before);
//! ```
//!
//! When the `heap` feature is disabled, the macro expands to nothing and the
//! counters stay at zero.

#![no_std]

mod counters;

pub use counters::{HeapCounters, is_tracing, reset, snapshot, start, stop};

/// Check if allocation counting is compiled in
pub const fn heap_compiled() -> bool {
    cfg!(feature = "heap")
}

/// A counting allocator that wraps the libc allocator.
///
/// With the `heap` feature enabled every allocation, reallocation and free
/// is added to the process-wide counters while tracing is started.
/// Without it, the allocator is a plain passthrough.
pub struct TracingAllocator;

impl TracingAllocator {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for TracingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

mod system {
    use core::alloc::Layout;
    use core::ptr;

    /// Alignment guaranteed by malloc on the targets we build for
    #[cfg(target_pointer_width = "64")]
    const MIN_ALIGN: usize = 16;
    #[cfg(not(target_pointer_width = "64"))]
    const MIN_ALIGN: usize = 8;

    #[inline]
    fn malloc_aligned(layout: &Layout) -> bool {
        layout.align() <= MIN_ALIGN && layout.align() <= layout.size()
    }

    #[inline]
    pub(crate) unsafe fn alloc(layout: Layout) -> *mut u8 {
        if malloc_aligned(&layout) {
            return unsafe { libc::malloc(layout.size()) as *mut u8 };
        }
        let mut out: *mut libc::c_void = ptr::null_mut();
        let align = layout.align().max(core::mem::size_of::<usize>());
        let ret = unsafe { libc::posix_memalign(&mut out, align, layout.size()) };
        if ret != 0 {
            ptr::null_mut()
        } else {
            out as *mut u8
        }
    }

    #[inline]
    pub(crate) unsafe fn alloc_zeroed(layout: Layout) -> *mut u8 {
        if malloc_aligned(&layout) {
            return unsafe { libc::calloc(1, layout.size()) as *mut u8 };
        }
        let ptr = unsafe { alloc(layout) };
        if !ptr.is_null() {
            unsafe { ptr::write_bytes(ptr, 0, layout.size()) };
        }
        ptr
    }

    #[inline]
    pub(crate) unsafe fn dealloc(ptr: *mut u8) {
        unsafe { libc::free(ptr as *mut libc::c_void) }
    }

    #[inline]
    pub(crate) unsafe fn realloc(ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() <= MIN_ALIGN && layout.align() <= new_size {
            return unsafe { libc::realloc(ptr as *mut libc::c_void, new_size) as *mut u8 };
        }
        let Ok(new_layout) = Layout::from_size_align(new_size, layout.align()) else {
            return ptr::null_mut();
        };
        let new_ptr = unsafe { alloc(new_layout) };
        if !new_ptr.is_null() {
            unsafe {
                ptr::copy_nonoverlapping(ptr, new_ptr, layout.size().min(new_size));
                dealloc(ptr);
            }
        }
        new_ptr
    }
}

#[cfg(not(feature = "heap"))]
mod disabled {
    use super::{TracingAllocator, system};
    use core::alloc::{GlobalAlloc, Layout};

    unsafe impl GlobalAlloc for TracingAllocator {
        #[inline]
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            unsafe { system::alloc(layout) }
        }

        #[inline]
        unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
            unsafe { system::dealloc(ptr) }
        }

        #[inline]
        unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
            unsafe { system::realloc(ptr, layout, new_size) }
        }

        #[inline]
        unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
            unsafe { system::alloc_zeroed(layout) }
        }
    }
}

#[cfg(feature = "heap")]
mod enabled {
    use super::counters::{record_alloc, record_dealloc};
    use super::{TracingAllocator, system};
    use core::alloc::{GlobalAlloc, Layout};

    unsafe impl GlobalAlloc for TracingAllocator {
        #[inline]
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = unsafe { system::alloc(layout) };
            if !ptr.is_null() {
                record_alloc(layout.size());
            }
            ptr
        }

        #[inline]
        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            record_dealloc(layout.size());
            unsafe { system::dealloc(ptr) }
        }

        #[inline]
        unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
            let new_ptr = unsafe { system::realloc(ptr, layout, new_size) };
            // A failed realloc leaves the old block in place
            if !new_ptr.is_null() {
                record_dealloc(layout.size());
                record_alloc(new_size);
            }
            new_ptr
        }

        #[inline]
        unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
            let ptr = unsafe { system::alloc_zeroed(layout) };
            if !ptr.is_null() {
                record_alloc(layout.size());
            }
            ptr
        }
    }
}

/// Install the tracing allocator as the global allocator.
///
/// Counting only happens between [`start`] and [`stop`].
/// When the `heap` feature is disabled, it expands to a no-op.
///
/// # Examples
///
/// ```rust,ignore
/// profkit_trace::profiler!();
/// ```
#[macro_export]
#[cfg(feature = "heap")]
macro_rules! profiler {
    () => {
        #[global_allocator]
        static __PROFKIT_ALLOC: $crate::TracingAllocator = $crate::TracingAllocator::new();
    };
}

/// No-op when heap feature is disabled
#[macro_export]
#[cfg(not(feature = "heap"))]
macro_rules! profiler {
    () => {};
}
