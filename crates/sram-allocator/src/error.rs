// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for SRAM sizing and allocation.

/// Errors that can occur during SRAM budgeting and allocation.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The requested block does not fit in any free range.
    #[error("out of SRAM: requested {requested_bytes} bytes, but only {available_bytes} available (capacity: {capacity_bytes})")]
    OutOfSram {
        requested_bytes: usize,
        available_bytes: usize,
        capacity_bytes: usize,
    },

    /// Attempted to allocate a zero-sized block.
    #[error("cannot allocate zero-sized block")]
    ZeroSizedAllocation,

    /// A size string could not be parsed.
    #[error("invalid memory size '{0}': expected a number followed by an optional suffix (K, M, G)")]
    InvalidBudget(String),

    /// `free` was called with an offset that is not the start of a live block.
    #[error("no live allocation at offset {0}")]
    UnknownOffset(usize),
}
