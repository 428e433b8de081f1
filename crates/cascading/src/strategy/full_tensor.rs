// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Full-tensor strategy: the whole output is a single stripe.
//!
//! Lowest per-stripe overhead and no halo re-reads, but every buffer holds
//! a complete tensor, so it is the first strategy to run out of SRAM.

use crate::strategy::StripeStrategy;
use tensor_core::Shape;

#[derive(Debug, Clone, Copy, Default)]
pub struct FullTensor;

impl StripeStrategy for FullTensor {
    fn name(&self) -> &str {
        "full-tensor"
    }

    fn propose(&self, output: &Shape) -> Vec<Shape> {
        let [n, h, w, c] = output.as_nhwc();
        vec![Shape::nhwc(n, h, w, c)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_full_stripe() {
        let out = Shape::nhwc(1, 32, 32, 64);
        assert_eq!(FullTensor.propose(&out), vec![out]);
    }

    #[test]
    fn test_widens_to_nhwc() {
        let out = Shape::vector(10);
        assert_eq!(FullTensor.propose(&out), vec![Shape::nhwc(1, 1, 1, 10)]);
    }
}
