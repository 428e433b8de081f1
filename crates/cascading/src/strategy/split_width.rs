// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Split-width strategy: vertical bands of one or two brick columns.

use crate::strategy::{split_candidates, StripeStrategy};
use tensor_core::{Shape, BRICK_GROUP};

#[derive(Debug, Clone, Copy, Default)]
pub struct SplitWidth;

impl StripeStrategy for SplitWidth {
    fn name(&self) -> &str {
        "split-width"
    }

    fn propose(&self, output: &Shape) -> Vec<Shape> {
        split_candidates(output.width(), BRICK_GROUP[2])
            .into_iter()
            .map(|w| output.with_width(w))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands() {
        let out = Shape::nhwc(1, 4, 24, 16);
        assert_eq!(
            SplitWidth.propose(&out),
            vec![Shape::nhwc(1, 4, 8, 16), Shape::nhwc(1, 4, 16, 16)]
        );
    }
}
