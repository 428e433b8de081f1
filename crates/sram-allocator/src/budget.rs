// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory capacity configuration and parsing.
//!
//! A [`MemoryBudget`] is a byte capacity, typically the accelerator's total
//! SRAM. It supports human-readable string parsing for configs and the CLI.

use crate::MemoryError;
use std::fmt;

/// A memory capacity in bytes.
///
/// # Parsing
/// Supports human-readable strings with binary suffixes:
/// - `"512K"` or `"512KB"` → 512 × 1024 bytes
/// - `"1M"` or `"1MB"` → 1024² bytes
/// - `"1G"` or `"1GB"` → 1024³ bytes
/// - `"65536"` → raw byte count
///
/// # Examples
/// ```
/// use sram_allocator::MemoryBudget;
///
/// let b = MemoryBudget::from_kb(512);
/// assert_eq!(b.as_bytes(), 512 * 1024);
///
/// let b = MemoryBudget::parse("1M").unwrap();
/// assert_eq!(b.as_bytes(), 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct MemoryBudget {
    /// Capacity in bytes.
    bytes: usize,
}

impl MemoryBudget {
    /// Creates a budget from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a budget from kilobytes.
    pub fn from_kb(kb: usize) -> Self {
        Self { bytes: kb * 1024 }
    }

    /// Returns the budget in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Parses a human-readable size string.
    ///
    /// Accepted formats: `"512K"`, `"512KB"`, `"1M"`, `"1MB"`, `"1G"`,
    /// `"1GB"`, `"64B"` or a plain byte count. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, MemoryError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MemoryError::InvalidBudget(s.to_string()));
        }

        let s_upper = s.to_uppercase();

        let (num_str, multiplier) = if s_upper.ends_with("GB") {
            (&s[..s.len() - 2], 1024 * 1024 * 1024)
        } else if s_upper.ends_with('G') {
            (&s[..s.len() - 1], 1024 * 1024 * 1024)
        } else if s_upper.ends_with("MB") {
            (&s[..s.len() - 2], 1024 * 1024)
        } else if s_upper.ends_with('M') {
            (&s[..s.len() - 1], 1024 * 1024)
        } else if s_upper.ends_with("KB") {
            (&s[..s.len() - 2], 1024)
        } else if s_upper.ends_with('K') {
            (&s[..s.len() - 1], 1024)
        } else if s_upper.ends_with('B') {
            (&s[..s.len() - 1], 1)
        } else {
            (s, 1)
        };

        let value: usize = num_str
            .trim()
            .parse()
            .map_err(|_| MemoryError::InvalidBudget(s.to_string()))?;

        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| MemoryError::InvalidBudget(s.to_string()))?;

        if bytes == 0 {
            return Err(MemoryError::ZeroSizedAllocation);
        }

        Ok(Self { bytes })
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes >= 1024 * 1024 * 1024 && self.bytes % (1024 * 1024 * 1024) == 0 {
            write!(f, "{} GB", self.bytes / (1024 * 1024 * 1024))
        } else if self.bytes >= 1024 * 1024 && self.bytes % (1024 * 1024) == 0 {
            write!(f, "{} MB", self.bytes / (1024 * 1024))
        } else if self.bytes >= 1024 && self.bytes % 1024 == 0 {
            write!(f, "{} KB", self.bytes / 1024)
        } else {
            write!(f, "{} B", self.bytes)
        }
    }
}
