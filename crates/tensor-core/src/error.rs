// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor descriptors.

use crate::Shape;

/// Errors raised when a tensor descriptor cannot be used by the accelerator.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The tensor has a zero-sized dimension.
    #[error("tensor shape {shape} has zero elements")]
    ZeroElements { shape: Shape },

    /// The tensor's byte size does not fit in `usize`.
    #[error("tensor shape {shape} is too large to address")]
    TooLarge { shape: Shape },

    /// Only ranks 1 through 4 are representable in NHWC.
    #[error("unsupported tensor rank {rank}; expected 1..=4")]
    UnsupportedRank { rank: usize },
}
