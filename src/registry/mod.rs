//! Registry facade - slot-tracked allocate / reallocate / release
//!
//! Design: the only place where raw memory operations and slot bookkeeping
//! meet.
//! 1. Raw allocator call (outside the lock)
//! 2. Slot table mutation + header stamp (inside the lock)
//! 3. Raw free (outside the lock, after the slot is cleared)
//!
//! The lock therefore only ever covers metadata work. A block briefly exists
//! unregistered (after malloc, before bind; after unbind, before free), which
//! nothing else can observe through the registry.

mod header;
mod raw;
mod table;


pub use header::{Header, HEADER_SIZE};
pub use raw::{LibcAllocator, RawAllocator};
pub use table::{Slot, SlotTable, DEFAULT_INITIAL_CAPACITY};

use core::ptr::NonNull;

use parking_lot::Mutex;

use crate::config::RegistryConfig;
use crate::error::AllocError;
use crate::logging::{
    log_allocation, log_allocation_failure, log_registry_init, log_reallocation, log_release,
    log_teardown,
};
use header::{block_of, payload_of};

/// A live tracked allocation: caller-owned payload plus its slot handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "dropping an Allocation leaks its block until teardown"]
pub struct Allocation {
    payload: NonNull<u8>,
    slot: Slot,
}

impl Allocation {
    /// Payload start (`HEADER_SIZE` bytes past the block)
    #[inline]
    pub fn payload(&self) -> NonNull<u8> {
        self.payload
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.payload.as_ptr()
    }

    #[inline]
    pub fn slot(&self) -> Slot {
        self.slot
    }
}

/// Point-in-time table statistics for auditing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub capacity: usize,
    pub live: usize,
    pub growths: usize,
}

/// Outcome of bulk release at shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    /// Blocks the registry freed on the callers' behalf
    pub freed: usize,
    /// Table capacity just before it was discarded
    pub capacity: usize,
}

/// Indirect allocation registry
///
/// Owned by the embedding host. Creating one is `init`; [`Registry::uninit`]
/// (or dropping it) frees every block still registered.
pub struct Registry<A: RawAllocator = LibcAllocator> {
    table: Mutex<SlotTable>,
    raw: A,
}

impl Registry<LibcAllocator> {
    /// Registry over the C heap with default settings
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    pub fn with_config(config: &RegistryConfig) -> Self {
        Self::with_allocator(LibcAllocator, config)
    }
}

impl Default for Registry<LibcAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: RawAllocator> Registry<A> {
    /// Registry over a custom raw allocator
    ///
    /// # Panics
    /// If `config.initial_capacity` is zero.
    pub fn with_allocator(raw: A, config: &RegistryConfig) -> Self {
        assert!(
            config.initial_capacity > 0,
            "registry initial capacity must be non-zero"
        );
        log_registry_init(config.initial_capacity);

        Self {
            table: Mutex::new(SlotTable::new(config.initial_capacity)),
            raw,
        }
    }

    /// Allocate `size` uninitialized bytes under a fresh slot
    pub fn allocate(&self, size: usize) -> Result<Allocation, AllocError> {
        let total = size
            .checked_add(HEADER_SIZE)
            .ok_or(AllocError::SizeOverflow { count: 1, size })?;
        let block = self
            .raw
            .allocate(total)
            .ok_or_else(|| out_of_memory(total))?;

        Ok(self.register(block, size))
    }

    /// Allocate `count * size` zero-filled bytes under a fresh slot
    pub fn zero_allocate(&self, count: usize, size: usize) -> Result<Allocation, AllocError> {
        let total = count
            .checked_mul(size)
            .and_then(|bytes| bytes.checked_add(HEADER_SIZE))
            .ok_or(AllocError::SizeOverflow { count, size })?;
        let block = self
            .raw
            .allocate_zeroed(total)
            .ok_or_else(|| out_of_memory(total))?;

        Ok(self.register(block, count * size))
    }

    /// Resize a tracked allocation, keeping its slot
    ///
    /// A null `ptr` behaves as [`allocate`](Self::allocate). On failure the
    /// original allocation stays valid and registered.
    ///
    /// # Panics
    /// If the header's slot is empty or bound to another block; checked
    /// before the raw allocator sees the pointer.
    ///
    /// # Safety
    /// `ptr` must be null or a live payload pointer from this registry, not
    /// concurrently reallocated or released by another thread.
    pub unsafe fn reallocate(&self, ptr: *mut u8, new_size: usize) -> Result<Allocation, AllocError> {
        let Some(payload) = NonNull::new(ptr) else {
            return self.allocate(new_size);
        };

        let total = new_size
            .checked_add(HEADER_SIZE)
            .ok_or(AllocError::SizeOverflow { count: 1, size: new_size })?;
        let old_block = block_of(payload);
        let slot = Header::read(old_block).slot();
        // A stale header must not reach the raw allocator.
        self.table.lock().assert_bound(slot, old_block, "reallocate");

        let block = self
            .raw
            .reallocate(old_block, total)
            .ok_or_else(|| out_of_memory(total))?;

        {
            let mut table = self.table.lock();
            table.bind_existing(slot, old_block, block);
            Header::write(block, slot);
        }

        log_reallocation(slot, new_size, block != old_block);
        Ok(Allocation {
            payload: payload_of(block),
            slot,
        })
    }

    /// Unregister and free a tracked allocation; null is a no-op
    ///
    /// # Panics
    /// If the slot is empty (double release) or bound to another block.
    ///
    /// # Safety
    /// `ptr` must be null or a payload pointer from this registry.
    pub unsafe fn release(&self, ptr: *mut u8) {
        let Some(payload) = NonNull::new(ptr) else {
            return;
        };

        let block = block_of(payload);
        let slot = Header::read(block).slot();

        {
            let mut table = self.table.lock();
            table.assert_bound(slot, block, "release");
            table.release(slot);
        }

        log_release(slot, payload.as_ptr());
        self.raw.release(block);
    }

    /// Slot stored in a payload's header
    ///
    /// # Safety
    /// `payload` must be a live payload pointer from this registry.
    pub unsafe fn slot_of(&self, payload: NonNull<u8>) -> Slot {
        Header::read(block_of(payload)).slot()
    }

    /// Whether `slot` currently holds an allocation
    pub fn is_live(&self, slot: Slot) -> bool {
        self.table.lock().get(slot).is_some()
    }

    /// Occupied slots in ascending order
    pub fn live_slots(&self) -> Vec<Slot> {
        self.table.lock().live().map(|(slot, _)| slot).collect()
    }

    pub fn live_count(&self) -> usize {
        self.table.lock().live_count()
    }

    pub fn capacity(&self) -> usize {
        self.table.lock().capacity()
    }

    pub fn stats(&self) -> RegistryStats {
        let table = self.table.lock();
        RegistryStats {
            capacity: table.capacity(),
            live: table.live_count(),
            growths: table.growths(),
        }
    }

    /// Free every still-registered block and discard the table
    pub fn uninit(mut self) -> TeardownReport {
        let report = self.teardown();
        log_teardown(&report);
        report
    }

    fn register(&self, block: NonNull<u8>, size: usize) -> Allocation {
        let slot = {
            let mut table = self.table.lock();
            let slot = table.bind_new(block);
            // Safety: block spans at least HEADER_SIZE bytes.
            unsafe { Header::write(block, slot) };
            slot
        };

        // Safety: as above.
        let payload = unsafe { payload_of(block) };
        log_allocation(slot, size, payload.as_ptr());
        Allocation { payload, slot }
    }

    fn teardown(&mut self) -> TeardownReport {
        let raw = &self.raw;
        let table = self.table.get_mut();
        let capacity = table.capacity();
        // Safety: every entry is a live block from `raw`; the table is
        // emptied as it goes so nothing is freed twice.
        let freed = table.teardown(|block| unsafe { raw.release(block) });
        TeardownReport { freed, capacity }
    }
}

impl<A: RawAllocator> Drop for Registry<A> {
    fn drop(&mut self) {
        let report = self.teardown();
        if report.freed > 0 {
            log_teardown(&report);
        }
    }
}

#[cold]
fn out_of_memory(requested: usize) -> AllocError {
    log_allocation_failure(requested);
    AllocError::OutOfMemory { requested }
}
