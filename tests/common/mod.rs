//! Shared helpers for integration tests

#![allow(dead_code)]

use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use slotalloc::{LibcAllocator, RawAllocator, Registry, RegistryConfig};

/// C-heap allocator that counts blocks and can refuse the next request
#[derive(Default)]
pub struct CountingAllocator {
    allocs: AtomicUsize,
    frees: AtomicUsize,
    refuse: AtomicBool,
}

impl CountingAllocator {
    /// Blocks handed out and not yet freed
    pub fn outstanding(&self) -> usize {
        self.allocs.load(Ordering::SeqCst) - self.frees.load(Ordering::SeqCst)
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    pub fn refuse_next(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    fn refused(&self) -> bool {
        self.refuse.swap(false, Ordering::SeqCst)
    }

    fn counted(&self, block: Option<NonNull<u8>>) -> Option<NonNull<u8>> {
        if block.is_some() {
            self.allocs.fetch_add(1, Ordering::SeqCst);
        }
        block
    }
}

unsafe impl RawAllocator for CountingAllocator {
    fn allocate(&self, size: usize) -> Option<NonNull<u8>> {
        if self.refused() {
            return None;
        }
        self.counted(LibcAllocator.allocate(size))
    }

    fn allocate_zeroed(&self, size: usize) -> Option<NonNull<u8>> {
        if self.refused() {
            return None;
        }
        self.counted(LibcAllocator.allocate_zeroed(size))
    }

    unsafe fn reallocate(&self, block: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
        if self.refused() {
            return None;
        }
        LibcAllocator.reallocate(block, new_size)
    }

    unsafe fn release(&self, block: NonNull<u8>) {
        self.frees.fetch_add(1, Ordering::SeqCst);
        LibcAllocator.release(block);
    }
}

/// Registry with default settings over `raw`
pub fn counting_registry(raw: &CountingAllocator) -> Registry<&CountingAllocator> {
    Registry::with_allocator(raw, &RegistryConfig::default())
}
