//! C FFI - malloc family over the process-wide registry

use core::ffi::c_void;
use core::ptr::null_mut;

use crate::lifecycle::with_registry;

/// Allocate `size` uninitialized bytes; null on failure
#[no_mangle]
pub extern "C" fn slotalloc_malloc(size: usize) -> *mut c_void {
    with_registry(|registry| match registry.allocate(size) {
        Ok(allocation) => allocation.as_ptr().cast(),
        Err(_) => null_mut(),
    })
}

/// Allocate `nmemb * size` zeroed bytes; null on failure or overflow
#[no_mangle]
pub extern "C" fn slotalloc_calloc(nmemb: usize, size: usize) -> *mut c_void {
    with_registry(|registry| match registry.zero_allocate(nmemb, size) {
        Ok(allocation) => allocation.as_ptr().cast(),
        Err(_) => null_mut(),
    })
}

/// Resize a block, keeping its slot; null `ptr` allocates
///
/// On failure returns null and `ptr` stays valid.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by this API.
#[no_mangle]
pub unsafe extern "C" fn slotalloc_realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    with_registry(|registry| match unsafe { registry.reallocate(ptr.cast(), size) } {
        Ok(allocation) => allocation.as_ptr().cast(),
        Err(_) => null_mut(),
    })
}

/// Release a block; null is a no-op
///
/// # Safety
/// `ptr` must be null or a live pointer returned by this API.
#[no_mangle]
pub unsafe extern "C" fn slotalloc_free(ptr: *mut c_void) {
    with_registry(|registry| unsafe { registry.release(ptr.cast()) })
}
