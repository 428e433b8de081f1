// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! First-fit offset allocator for on-chip SRAM.
//!
//! The [`SramAllocator`] hands out byte offsets inside a fixed-capacity
//! SRAM. It:
//!
//! 1. Enforces the capacity: allocations that do not fit return
//!    `Err(OutOfSram)`.
//! 2. Rounds every request up to the hardware alignment, so offsets are
//!    always aligned.
//! 3. Keeps a sorted free list and coalesces neighbouring free ranges on
//!    release.
//! 4. Tracks allocation statistics.
//!
//! Nothing is ever really allocated: the compiler only needs the offsets to
//! lay out buffers for the command stream.

use crate::{AllocationStats, MemoryBudget, MemoryError};
use std::collections::BTreeMap;

/// A free range `[offset, offset + size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FreeRange {
    offset: usize,
    size: usize,
}

/// Offset allocator over a fixed-size SRAM.
///
/// # Example
/// ```
/// use sram_allocator::{MemoryBudget, SramAllocator};
///
/// let mut sram = SramAllocator::new(MemoryBudget::from_kb(64), 16);
/// let a = sram.allocate(1000).unwrap();
/// let b = sram.allocate(24).unwrap();
/// assert_eq!(a, 0);
/// assert_eq!(b, 1008); // 1000 rounded up to 16-byte alignment
///
/// sram.free(a).unwrap();
/// assert_eq!(sram.allocated_bytes(), 32);
/// ```
#[derive(Debug, Clone)]
pub struct SramAllocator {
    capacity: usize,
    alignment: usize,
    /// Sorted by offset, never adjacent (coalesced).
    free: Vec<FreeRange>,
    /// offset → aligned size of live allocations.
    live: BTreeMap<usize, usize>,
    allocated: usize,
    stats: AllocationStats,
}

impl SramAllocator {
    /// Creates an allocator covering `capacity`, aligning all blocks to
    /// `alignment` bytes (0 or 1 disables alignment).
    pub fn new(capacity: MemoryBudget, alignment: usize) -> Self {
        let capacity = capacity.as_bytes();
        let free = if capacity > 0 {
            vec![FreeRange {
                offset: 0,
                size: capacity,
            }]
        } else {
            Vec::new()
        };
        Self {
            capacity,
            alignment: alignment.max(1),
            free,
            live: BTreeMap::new(),
            allocated: 0,
            stats: AllocationStats::default(),
        }
    }

    /// Size a request of `size` bytes really occupies.
    pub fn aligned_size(&self, size: usize) -> usize {
        size.div_ceil(self.alignment) * self.alignment
    }

    /// Allocates `size` bytes, returning the block's offset.
    ///
    /// Uses the lowest-offset free range that fits.
    pub fn allocate(&mut self, size: usize) -> Result<usize, MemoryError> {
        if size == 0 {
            return Err(MemoryError::ZeroSizedAllocation);
        }
        let size = self.aligned_size(size);

        let Some(slot) = self.free.iter().position(|r| r.size >= size) else {
            self.stats.record_refusal();
            return Err(MemoryError::OutOfSram {
                requested_bytes: size,
                available_bytes: self.available_bytes(),
                capacity_bytes: self.capacity,
            });
        };

        let range = self.free[slot];
        if range.size == size {
            self.free.remove(slot);
        } else {
            self.free[slot] = FreeRange {
                offset: range.offset + size,
                size: range.size - size,
            };
        }

        self.live.insert(range.offset, size);
        self.allocated += size;
        self.stats.granted(size, self.allocated);
        Ok(range.offset)
    }

    /// Releases the block that starts at `offset`.
    pub fn free(&mut self, offset: usize) -> Result<(), MemoryError> {
        let size = self
            .live
            .remove(&offset)
            .ok_or(MemoryError::UnknownOffset(offset))?;
        self.allocated -= size;
        self.stats.record_free();

        let pos = self.free.partition_point(|r| r.offset < offset);
        self.free.insert(pos, FreeRange { offset, size });

        // Coalesce with the following range, then the preceding one.
        if pos + 1 < self.free.len() {
            let next = self.free[pos + 1];
            if self.free[pos].offset + self.free[pos].size == next.offset {
                self.free[pos].size += next.size;
                self.free.remove(pos + 1);
            }
        }
        if pos > 0 {
            let cur = self.free[pos];
            let prev = &mut self.free[pos - 1];
            if prev.offset + prev.size == cur.offset {
                prev.size += cur.size;
                self.free.remove(pos);
            }
        }
        Ok(())
    }

    /// Bytes currently held by live blocks (aligned sizes).
    pub fn allocated_bytes(&self) -> usize {
        self.allocated
    }

    /// Bytes not held by live blocks, possibly fragmented.
    pub fn available_bytes(&self) -> usize {
        self.capacity - self.allocated
    }

    /// Size of the largest single block that could currently be allocated.
    pub fn largest_free_block(&self) -> usize {
        self.free.iter().map(|r| r.size).max().unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn stats(&self) -> &AllocationStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sram(bytes: usize) -> SramAllocator {
        SramAllocator::new(MemoryBudget::from_bytes(bytes), 16)
    }

    #[test]
    fn test_allocate_sequential_offsets() {
        let mut s = sram(1024);
        assert_eq!(s.allocate(100).unwrap(), 0);
        assert_eq!(s.allocate(16).unwrap(), 112);
        assert_eq!(s.allocated_bytes(), 128);
        assert_eq!(s.available_bytes(), 896);
    }

    #[test]
    fn test_out_of_sram() {
        let mut s = sram(256);
        s.allocate(200).unwrap();
        let err = s.allocate(100).unwrap_err();
        match err {
            MemoryError::OutOfSram {
                requested_bytes,
                available_bytes,
                capacity_bytes,
            } => {
                assert_eq!(requested_bytes, 112);
                assert_eq!(available_bytes, 48);
                assert_eq!(capacity_bytes, 256);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(s.stats().refused, 1);
    }

    #[test]
    fn test_zero_allocation() {
        let mut s = sram(256);
        assert!(matches!(s.allocate(0), Err(MemoryError::ZeroSizedAllocation)));
    }

    #[test]
    fn test_free_and_reuse_first_fit() {
        let mut s = sram(1024);
        let a = s.allocate(256).unwrap();
        let _b = s.allocate(256).unwrap();
        s.free(a).unwrap();
        // The hole at 0 is reused before the tail.
        assert_eq!(s.allocate(128).unwrap(), 0);
        assert_eq!(s.allocate(128).unwrap(), 128);
        assert_eq!(s.allocate(128).unwrap(), 512);
    }

    #[test]
    fn test_coalescing() {
        let mut s = sram(768);
        let a = s.allocate(256).unwrap();
        let b = s.allocate(256).unwrap();
        let c = s.allocate(256).unwrap();
        assert_eq!(s.largest_free_block(), 0);

        s.free(a).unwrap();
        s.free(c).unwrap();
        assert_eq!(s.largest_free_block(), 256);

        s.free(b).unwrap();
        assert_eq!(s.largest_free_block(), 768);
        assert_eq!(s.allocate(768).unwrap(), 0);
    }

    #[test]
    fn test_fragmentation_blocks_large_request() {
        let mut s = sram(768);
        let a = s.allocate(256).unwrap();
        let _b = s.allocate(256).unwrap();
        let c = s.allocate(256).unwrap();
        s.free(a).unwrap();
        s.free(c).unwrap();
        assert_eq!(s.available_bytes(), 512);
        assert!(s.allocate(512).is_err());
    }

    #[test]
    fn test_free_unknown_offset() {
        let mut s = sram(256);
        assert!(matches!(s.free(32), Err(MemoryError::UnknownOffset(32))));
    }

    #[test]
    fn test_stats_follow_allocate_and_free() {
        let mut s = sram(512);
        let a = s.allocate(100).unwrap();
        let b = s.allocate(100).unwrap();
        s.free(a).unwrap();
        s.free(b).unwrap();
        assert_eq!(s.allocated_bytes(), 0);
        assert_eq!(s.allocate(512).unwrap(), 0);
        assert_eq!(s.stats().frees, 2);
        assert_eq!(s.stats().peak_bytes, 512);
    }

    #[test]
    fn test_unaligned_allocator() {
        let mut s = SramAllocator::new(MemoryBudget::from_bytes(10), 0);
        assert_eq!(s.alignment(), 1);
        assert_eq!(s.allocate(3).unwrap(), 0);
        assert_eq!(s.allocate(7).unwrap(), 3);
        assert!(s.allocate(1).is_err());
    }
}
