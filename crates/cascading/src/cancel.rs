// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cooperative cancellation for long-running searches.

use crate::CascadingError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply cloneable flag shared between the caller and the search.
///
/// The combiner polls it between combinations and between beam levels.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns `Err(CascadingError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), CascadingError> {
        if self.is_cancelled() {
            Err(CascadingError::Cancelled)
        } else {
            Ok(())
        }
    }
}
