//! C FFI - drop-in allocation API for C hosts
//!
//! Design: thin wrappers over the process-wide registry in
//! [`crate::lifecycle`]:
//! 1. Lifecycle (init before host startup, uninit after host shutdown)
//! 2. malloc / calloc / realloc / free replacements
//! 3. Audit counters
//!
//! Failure is a null pointer, like libc. Contract violations panic, and a
//! panic cannot unwind out of an `extern "C"` function, so they abort.

mod alloc;

pub use alloc::{slotalloc_calloc, slotalloc_free, slotalloc_malloc, slotalloc_realloc};

use crate::lifecycle;
use crate::logging::debug;

/// Create the process-wide registry (call once, before the host starts)
#[no_mangle]
pub extern "C" fn slotalloc_init() {
    lifecycle::init();
    debug!("C allocation API ready");
}

/// Free every block still registered and discard the table
/// (call once, after the host has shut down)
#[no_mangle]
pub extern "C" fn slotalloc_uninit() {
    let report = lifecycle::uninit();
    debug!(freed = report.freed, "C allocation API shut down");
}

/// Number of live tracked allocations
#[no_mangle]
pub extern "C" fn slotalloc_live_count() -> usize {
    lifecycle::with_registry(|registry| registry.live_count())
}

/// Current slot table capacity
#[no_mangle]
pub extern "C" fn slotalloc_capacity() -> usize {
    lifecycle::with_registry(|registry| registry.capacity())
}
