//! Allocation header - invisible prefix in front of every tracked payload
//!
//! Layout of a tracked block:
//!
//! ```text
//! block ──► ┌──────────────┬─────────────────────────┐
//!           │ Header (16B) │ payload (caller's size) │
//!           └──────────────┴─────────────────────────┘
//!                          ▲
//!                          └── pointer handed to the caller
//! ```
//!
//! The header stores the block's slot number, a non-owning back-reference
//! into the slot table. Invariant: `header.slot == i` iff `table[i]` points
//! at this block.

use core::ptr::NonNull;

use super::table::Slot;

/// Block prefix (16 bytes) - keeps the payload at the allocator's
/// fundamental alignment on 64-bit targets
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct Header {
    slot: u32,
}

/// Bytes between block start and payload start
pub const HEADER_SIZE: usize = core::mem::size_of::<Header>();

const _: () = assert!(HEADER_SIZE == 16);

impl Header {
    #[inline]
    pub const fn new(slot: Slot) -> Self {
        Self { slot: slot.index() }
    }

    #[inline]
    pub const fn slot(&self) -> Slot {
        Slot::new(self.slot)
    }

    /// Write header at block start
    ///
    /// # Safety
    /// `block` must point to at least `HEADER_SIZE` writable bytes.
    #[inline]
    pub unsafe fn write(block: NonNull<u8>, slot: Slot) {
        // Raw allocators only promise their own alignment.
        block.as_ptr().cast::<Header>().write_unaligned(Self::new(slot));
    }

    /// Read header at block start
    ///
    /// # Safety
    /// `block` must be a block previously stamped with [`Header::write`].
    #[inline]
    pub unsafe fn read(block: NonNull<u8>) -> Self {
        block.as_ptr().cast::<Header>().read_unaligned()
    }
}

/// Payload pointer for a block
///
/// # Safety
/// `block` must span at least `HEADER_SIZE` bytes.
#[inline]
pub unsafe fn payload_of(block: NonNull<u8>) -> NonNull<u8> {
    NonNull::new_unchecked(block.as_ptr().add(HEADER_SIZE))
}

/// Block pointer for a payload (steps back over the header)
///
/// # Safety
/// `payload` must have been produced by [`payload_of`].
#[inline]
pub unsafe fn block_of(payload: NonNull<u8>) -> NonNull<u8> {
    NonNull::new_unchecked(payload.as_ptr().sub(HEADER_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_slot_through_unaligned_buffer() {
        let mut buf = [0u8; HEADER_SIZE + 1];
        // Offset by one byte to force a misaligned header.
        let block = NonNull::new(buf[1..].as_mut_ptr()).unwrap();

        unsafe {
            Header::write(block, Slot::new(4711));
            assert_eq!(Header::read(block).slot(), Slot::new(4711));
        }
    }

    #[test]
    fn payload_and_block_are_inverse() {
        let mut buf = [0u8; HEADER_SIZE + 8];
        let block = NonNull::new(buf.as_mut_ptr()).unwrap();

        unsafe {
            let payload = payload_of(block);
            assert_eq!(payload.as_ptr() as usize - block.as_ptr() as usize, HEADER_SIZE);
            assert_eq!(block_of(payload), block);
        }
    }
}
