// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Split-height strategy: horizontal bands of one or two brick rows.
//!
//! Full width and depth per stripe. Kernels taller than one row make the
//! consumer re-read a halo of input rows for every band.

use crate::strategy::{split_candidates, StripeStrategy};
use tensor_core::{Shape, BRICK_GROUP};

#[derive(Debug, Clone, Copy, Default)]
pub struct SplitHeight;

impl StripeStrategy for SplitHeight {
    fn name(&self) -> &str {
        "split-height"
    }

    fn propose(&self, output: &Shape) -> Vec<Shape> {
        split_candidates(output.height(), BRICK_GROUP[1])
            .into_iter()
            .map(|h| output.with_height(h))
            .collect()
    }
}
