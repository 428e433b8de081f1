// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Split-depth strategy: slices of one or two channel bricks.
//!
//! Each slice only needs the matching slice of the weights, which makes
//! this the strategy of choice for weight-heavy layers. Non-depthwise
//! convolutions still need the full input depth for every slice.

use crate::strategy::{split_candidates, StripeStrategy};
use tensor_core::{Shape, BRICK_GROUP};

#[derive(Debug, Clone, Copy, Default)]
pub struct SplitDepth;

impl StripeStrategy for SplitDepth {
    fn name(&self) -> &str {
        "split-depth"
    }

    fn propose(&self, output: &Shape) -> Vec<Shape> {
        split_candidates(output.channels(), BRICK_GROUP[3])
            .into_iter()
            .map(|c| output.with_channels(c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slices() {
        let out = Shape::nhwc(1, 8, 8, 64);
        assert_eq!(
            SplitDepth.propose(&out),
            vec![Shape::nhwc(1, 8, 8, 16), Shape::nhwc(1, 8, 8, 32)]
        );
        assert!(SplitDepth.propose(&Shape::nhwc(1, 8, 8, 16)).is_empty());
    }
}
