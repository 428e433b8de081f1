// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-allocator counters, reported when a pass has been placed.

/// What one [`crate::SramAllocator`] went through.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AllocationStats {
    pub allocations: u64,
    /// Requests refused for lack of a large enough free range.
    pub refused: u64,
    pub frees: u64,
    /// High-water mark of aligned bytes in use.
    pub peak_bytes: usize,
    /// Largest single aligned block handed out.
    pub largest_block: usize,
}

impl AllocationStats {
    /// Records a granted block of `size` bytes with `in_use` bytes now held.
    pub(crate) fn granted(&mut self, size: usize, in_use: usize) {
        self.allocations += 1;
        self.largest_block = self.largest_block.max(size);
        self.peak_bytes = self.peak_bytes.max(in_use);
    }

    pub(crate) fn record_refusal(&mut self) {
        self.refused += 1;
    }

    pub(crate) fn record_free(&mut self) {
        self.frees += 1;
    }

    /// Peak use as a percentage of `capacity`.
    pub fn peak_percent(&self, capacity: usize) -> f64 {
        if capacity == 0 {
            return 0.0;
        }
        self.peak_bytes as f64 * 100.0 / capacity as f64
    }

    pub fn summary(&self) -> String {
        format!(
            "{} blocks (largest {} B), peak {} B, {} refused, {} freed",
            self.allocations, self.largest_block, self.peak_bytes, self.refused, self.frees,
        )
    }
}
