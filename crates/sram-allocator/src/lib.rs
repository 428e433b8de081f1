// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # sram-allocator
//!
//! Sizing and layout of the accelerator's on-chip SRAM.
//!
//! # Key Components
//!
//! - [`MemoryBudget`]: a capacity with human-readable parsing
//!   (`"512K"`, `"1M"`, …), used for SRAM sizes in configs and the CLI.
//! - [`SramAllocator`]: a first-fit, alignment-aware offset allocator used
//!   to place a pass's buffers.
//! - [`AllocationStats`]: per-allocator counters (peak use, largest block,
//!   refused requests).
//!
//! # Example
//! ```
//! use sram_allocator::{MemoryBudget, SramAllocator};
//!
//! let mut sram = SramAllocator::new(MemoryBudget::parse("1M").unwrap(), 16);
//! let input = sram.allocate(64 * 1024).unwrap();
//! let output = sram.allocate(64 * 1024).unwrap();
//! assert_eq!(output - input, 64 * 1024);
//! ```

mod allocator;
mod budget;
mod error;
mod stats;

pub use allocator::SramAllocator;
pub use budget::MemoryBudget;
pub use error::MemoryError;
pub use stats::AllocationStats;
