// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for partitioning, planning and combination search.

/// Errors that can occur while building or searching the graph of parts.
#[derive(Debug, thiserror::Error)]
pub enum CascadingError {
    /// The graph has a shape the partitioner or planner cannot handle.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),

    /// The search was cancelled through a [`crate::CancellationToken`].
    #[error("combination search cancelled")]
    Cancelled,
}
