// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for performance estimation.

/// Errors that can occur while estimating one combination.
#[derive(Debug, thiserror::Error)]
pub enum EstimationError {
    /// The estimator refuses this combination; the search may go on.
    #[error("estimation not supported: {0}")]
    NotSupported(String),

    /// The estimator hit an inconsistency; the compilation must stop.
    #[error("estimation internal error: {0}")]
    Internal(String),
}

impl EstimationError {
    /// `true` when the combination can simply be skipped.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EstimationError::NotSupported(_))
    }
}

impl From<cascading::CascadingError> for EstimationError {
    fn from(e: cascading::CascadingError) -> Self {
        match e {
            cascading::CascadingError::NotSupported(msg) => EstimationError::NotSupported(msg),
            other => EstimationError::Internal(other.to_string()),
        }
    }
}
