//! Bump allocation over the sample region of sound RAM.
//!
//! Sample data lives in one contiguous region above the driver firmware and
//! command block. The allocator is a single forward-moving cursor: loads
//! reserve from it, and the only way to free is to roll the cursor back to an
//! earlier offset, discarding everything above it.

use crate::{DriverError, Result};

/// First byte of the sample region, just past the shared command block.
pub const PCM_REGION_START: u32 = 0xC028;

/// One past the last usable byte of sound RAM.
pub const PCM_REGION_END: u32 = 0x8_0000;

/// Loads are refused once the cursor has run past this offset, leaving the
/// tail of the region as slack for an in-flight oversized sample.
pub const LOAD_BOUNDARY: u32 = 0x7_F800;

/// Pad a byte length for sound RAM placement: round up to even, then up to a
/// multiple of four.
pub fn pad_to_word(len: u32) -> u32 {
    let len = len + (len & 1);
    len + if len & 3 != 0 { 2 } else { 0 }
}

/// Forward-only cursor over the sample region.
#[derive(Debug, Clone)]
pub struct Arena {
    cursor: u32,
}

impl Arena {
    /// Create an allocator with the cursor at the region start.
    pub fn new() -> Self {
        Arena {
            cursor: PCM_REGION_START,
        }
    }

    /// Current cursor offset into sound RAM.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Bytes still available before the region end.
    pub fn free_bytes(&self) -> u32 {
        PCM_REGION_END.saturating_sub(self.cursor)
    }

    /// Whether the cursor has passed the load-refusal boundary.
    pub fn past_load_boundary(&self) -> bool {
        self.cursor > LOAD_BOUNDARY
    }

    /// Reserve `len` bytes (padded to the word rule), returning the offset of
    /// the reservation. Fails without moving the cursor if the padded
    /// reservation would run past the region end.
    pub fn reserve(&mut self, len: u32) -> Result<u32> {
        let padded = pad_to_word(len);
        let end = self.cursor.checked_add(padded).unwrap_or(u32::MAX);
        if end > PCM_REGION_END {
            return Err(DriverError::RamFull {
                requested: padded,
                available: self.free_bytes(),
            });
        }
        let offset = self.cursor;
        self.cursor = end;
        Ok(offset)
    }

    /// Move the cursor directly to `offset`, discarding everything above it.
    ///
    /// The caller derives `offset` from a live voice descriptor (address plus
    /// occupied length), so it is always inside the region.
    pub fn rollback(&mut self, offset: u32) {
        debug_assert!((PCM_REGION_START..=PCM_REGION_END).contains(&offset));
        self.cursor = offset;
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_rounds_to_word() {
        assert_eq!(pad_to_word(0), 0);
        assert_eq!(pad_to_word(1), 4);
        assert_eq!(pad_to_word(2), 4);
        assert_eq!(pad_to_word(3), 4);
        assert_eq!(pad_to_word(4), 4);
        assert_eq!(pad_to_word(5), 8);
        assert_eq!(pad_to_word(2000), 2000);
    }

    #[test]
    fn test_reservations_advance_by_padded_size() {
        let mut arena = Arena::new();
        let first = arena.reserve(10).unwrap();
        let second = arena.reserve(4).unwrap();
        assert_eq!(first, PCM_REGION_START);
        assert_eq!(second, PCM_REGION_START + 12);
        assert_eq!(arena.cursor(), PCM_REGION_START + 16);
    }

    #[test]
    fn test_full_region_is_rejected_without_moving() {
        let mut arena = Arena::new();
        let before = arena.cursor();
        let err = arena.reserve(PCM_REGION_END).unwrap_err();
        assert!(matches!(err, DriverError::RamFull { .. }));
        assert_eq!(arena.cursor(), before);
    }

    #[test]
    fn test_rollback_restores_offset() {
        let mut arena = Arena::new();
        let first = arena.reserve(256).unwrap();
        arena.reserve(512).unwrap();
        arena.rollback(first + 256);
        assert_eq!(arena.cursor(), first + 256);
        // Reserving again reproduces the rolled-back reservation exactly.
        assert_eq!(arena.reserve(512).unwrap(), first + 256);
    }

    #[test]
    fn test_load_boundary() {
        let mut arena = Arena::new();
        assert!(!arena.past_load_boundary());
        while arena.reserve(32 * 1024).is_ok() {}
        assert!(arena.free_bytes() < 32 * 1024);
    }
}
