//! Raw allocator seam - where the registry gets its untracked blocks
//!
//! The registry never carves memory itself; it asks a [`RawAllocator`] for
//! blocks of `payload + HEADER_SIZE` bytes. [`LibcAllocator`] forwards to the
//! C heap so that blocks interoperate with code linked against libc.

use core::ptr::NonNull;

/// Source of untracked raw blocks
///
/// # Safety
/// Implementations must return blocks that are valid for reads and writes of
/// the requested size until passed to `release` (or `reallocate`), and
/// `reallocate` must preserve the first `min(old, new)` bytes. A failed
/// `reallocate` must leave the original block untouched.
pub unsafe trait RawAllocator: Send + Sync {
    /// Uninitialized block of `size` bytes, or `None`
    fn allocate(&self, size: usize) -> Option<NonNull<u8>>;

    /// Zero-filled block of `size` bytes, or `None`
    fn allocate_zeroed(&self, size: usize) -> Option<NonNull<u8>>;

    /// Resize `block` to `new_size` bytes, possibly moving it
    ///
    /// # Safety
    /// `block` must be live and come from this allocator.
    unsafe fn reallocate(&self, block: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>>;

    /// Return `block` to the allocator
    ///
    /// # Safety
    /// `block` must be live and come from this allocator.
    unsafe fn release(&self, block: NonNull<u8>);
}

unsafe impl<T: RawAllocator + ?Sized> RawAllocator for &T {
    #[inline]
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).allocate(size)
    }

    #[inline]
    fn allocate_zeroed(&self, size: usize) -> Option<NonNull<u8>> {
        (**self).allocate_zeroed(size)
    }

    #[inline]
    unsafe fn reallocate(&self, block: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
        (**self).reallocate(block, new_size)
    }

    #[inline]
    unsafe fn release(&self, block: NonNull<u8>) {
        (**self).release(block)
    }
}

/// C heap (`malloc`/`calloc`/`realloc`/`free`)
#[derive(Debug, Default, Clone, Copy)]
pub struct LibcAllocator;

unsafe impl RawAllocator for LibcAllocator {
    #[inline]
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        NonNull::new(unsafe { libc::malloc(size) }.cast())
    }

    #[inline]
    fn allocate_zeroed(&self, size: usize) -> Option<NonNull<u8>> {
        NonNull::new(unsafe { libc::calloc(size, 1) }.cast())
    }

    #[inline]
    unsafe fn reallocate(&self, block: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
        NonNull::new(libc::realloc(block.as_ptr().cast(), new_size).cast())
    }

    #[inline]
    unsafe fn release(&self, block: NonNull<u8>) {
        libc::free(block.as_ptr().cast());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_block_is_zero() {
        let raw = LibcAllocator;
        let block = raw.allocate_zeroed(256).expect("calloc");
        unsafe {
            let bytes = core::slice::from_raw_parts(block.as_ptr(), 256);
            assert!(bytes.iter().all(|&b| b == 0));
            raw.release(block);
        }
    }

    #[test]
    fn reallocate_preserves_prefix() {
        let raw = LibcAllocator;
        let block = raw.allocate(8).expect("malloc");
        unsafe {
            core::ptr::copy_nonoverlapping(b"slotdata".as_ptr(), block.as_ptr(), 8);
            let grown = raw.reallocate(block, 4096).expect("realloc");
            assert_eq!(core::slice::from_raw_parts(grown.as_ptr(), 8), b"slotdata");
            raw.release(grown);
        }
    }
}
