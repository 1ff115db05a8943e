//! Slot table - growable indirection array, slot handle → block
//!
//! Design: next-fit search with wraparound from a hint: the slot most
//! recently bound or released. A release followed by an allocation therefore
//! hands the freed slot straight back. No free list: with typical alloc/free
//! locality the probe finds a hole in O(1) amortized, and a full table costs
//! one O(capacity) pass before doubling.
//!
//! The table never owns blocks. Entries are back-references used for lookup
//! and enumeration; only [`SlotTable::teardown`] hands them to a free
//! function.
//!
//! Mutating methods take `&mut self`: callers serialize access through the
//! registry's lock.

use core::fmt;
use core::ptr::NonNull;
use std::alloc::{handle_alloc_error, Layout};

/// Default capacity of the first growth step
pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

/// Stable small-integer handle of a tracked allocation
///
/// Valid from allocation until release; survives reallocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u32);

impl Slot {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Entry = Option<NonNull<u8>>;

/// Slot → block back-reference table
pub struct SlotTable {
    entries: Vec<Entry>,
    /// Last slot bound or released
    next_hint: usize,
    initial_capacity: usize,
    growths: usize,
}

// Safety: entries are plain addresses; the table never dereferences them and
// all access is serialized by the owning registry's mutex.
unsafe impl Send for SlotTable {}

impl SlotTable {
    /// Empty table (capacity 0); first bind grows to `initial_capacity`
    pub const fn new(initial_capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            next_hint: 0,
            initial_capacity,
            growths: 0,
        }
    }

    /// Bind `block` to a free slot
    ///
    /// Scans at most `capacity` entries circularly from the hint, then grows.
    /// Growth failure aborts the process.
    pub fn bind_new(&mut self, block: NonNull<u8>) -> Slot {
        let capacity = self.entries.len();
        let mut id = self.next_hint;

        let mut found = None;
        for _ in 0..capacity {
            if self.entries[id].is_none() {
                found = Some(id);
                break;
            }
            id = (id + 1) % capacity;
        }

        let id = match found {
            Some(id) => id,
            None => self.grow(),
        };

        self.entries[id] = Some(block);
        self.next_hint = id;
        Slot(id as u32)
    }

    /// Rebind a slot from `old_block` to its (possibly moved) successor
    ///
    /// # Panics
    /// If `slot` is out of range, empty, or bound to a block other than
    /// `old_block`.
    pub fn bind_existing(&mut self, slot: Slot, old_block: NonNull<u8>, block: NonNull<u8>) {
        self.assert_bound(slot, old_block, "rebind");
        self.entries[slot.0 as usize] = Some(block);
    }

    /// Check that `slot` is occupied by exactly `block`
    ///
    /// Addresses are only compared, never dereferenced.
    ///
    /// # Panics
    /// If `slot` is out of range, empty, or bound to another block.
    pub fn assert_bound(&self, slot: Slot, block: NonNull<u8>, op: &str) {
        let capacity = self.entries.len();
        let idx = slot.0 as usize;
        assert!(
            idx < capacity,
            "slot table {op}: slot {slot} out of range (capacity {capacity})"
        );
        match self.entries[idx] {
            Some(bound) => assert!(
                bound == block,
                "slot table {op}: slot {slot} is bound to a different block"
            ),
            None => panic!("slot table {op}: slot {slot} is not occupied"),
        }
    }

    /// Clear an occupied slot, returning its block (not freed)
    ///
    /// The next search starts at the cleared slot.
    ///
    /// # Panics
    /// If `slot` is out of range or already empty (double release).
    pub fn release(&mut self, slot: Slot) -> NonNull<u8> {
        let entry = self.occupied_entry(slot, "release");
        let Some(block) = entry.take() else {
            unreachable!("occupied_entry checked occupancy");
        };
        self.next_hint = slot.0 as usize;
        block
    }

    /// Hand every occupied block to `free`, then discard the entries array
    ///
    /// Returns the number of blocks freed.
    pub fn teardown(&mut self, mut free: impl FnMut(NonNull<u8>)) -> usize {
        let mut freed = 0;
        for block in self.entries.drain(..).flatten() {
            free(block);
            freed += 1;
        }
        self.entries = Vec::new();
        self.next_hint = 0;
        freed
    }

    /// Block bound to `slot`, if any
    pub fn get(&self, slot: Slot) -> Option<NonNull<u8>> {
        self.entries.get(slot.0 as usize).copied().flatten()
    }

    /// Occupied slots in ascending order
    pub fn live(&self) -> impl Iterator<Item = (Slot, NonNull<u8>)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.map(|block| (Slot(i as u32), block)))
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Number of growth steps since creation
    #[inline]
    pub fn growths(&self) -> usize {
        self.growths
    }

    /// Where the next search starts: the slot most recently bound or
    /// released (not only the last one assigned)
    #[inline]
    pub fn next_hint(&self) -> usize {
        self.next_hint
    }

    fn occupied_entry(&mut self, slot: Slot, op: &str) -> &mut Entry {
        let capacity = self.entries.len();
        let idx = slot.0 as usize;
        assert!(
            idx < capacity,
            "slot table {op}: slot {slot} out of range (capacity {capacity})"
        );
        let entry = &mut self.entries[idx];
        assert!(entry.is_some(), "slot table {op}: slot {slot} is not occupied");
        entry
    }

    /// Double the entries array (or create it) and return the first new slot
    #[cold]
    #[inline(never)]
    fn grow(&mut self) -> usize {
        let old = self.entries.len();
        let new = if old == 0 {
            self.initial_capacity
        } else {
            old.saturating_mul(2)
        };

        let layout = Layout::array::<Entry>(new).unwrap_or_else(|_| Layout::new::<Entry>());
        if new > u32::MAX as usize || self.entries.try_reserve_exact(new - old).is_err() {
            // Bookkeeping cannot stay consistent without the bigger table.
            handle_alloc_error(layout);
        }
        self.entries.resize(new, None);

        crate::logging::log_table_growth(old, new);
        self.growths += 1;
        self.next_hint = old;
        old
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_CAPACITY)
    }
}
