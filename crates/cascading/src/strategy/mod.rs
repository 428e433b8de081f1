// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`StripeStrategy`] trait and its implementations.
//!
//! A stripe strategy looks at the output tensor of a part and proposes the
//! stripe shapes the hardware could produce it in. The plan generator turns
//! each proposal into a family of plans.

pub mod full_tensor;
pub mod split_depth;
pub mod split_height;
pub mod split_width;

use std::sync::Arc;
use tensor_core::Shape;

pub use full_tensor::FullTensor;
pub use split_depth::SplitDepth;
pub use split_height::SplitHeight;
pub use split_width::SplitWidth;

/// Trait for output stripe strategies.
///
/// Strategies are purely algorithmic, so they are trivially unit-testable.
pub trait StripeStrategy: std::fmt::Debug + Send + Sync {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    /// Proposes NHWC stripe shapes for an output tensor of shape `output`.
    fn propose(&self, output: &Shape) -> Vec<Shape>;
}

/// Every built-in strategy, in the order the generator tries them.
pub fn all() -> Vec<Arc<dyn StripeStrategy>> {
    vec![
        Arc::new(FullTensor),
        Arc::new(SplitHeight),
        Arc::new(SplitWidth),
        Arc::new(SplitDepth),
    ]
}

/// Looks a strategy up by name (case-insensitive, short aliases accepted).
pub fn by_name(name: &str) -> Option<Arc<dyn StripeStrategy>> {
    match name.to_lowercase().as_str() {
        "full-tensor" | "full" => Some(Arc::new(FullTensor)),
        "split-height" | "height" => Some(Arc::new(SplitHeight)),
        "split-width" | "width" => Some(Arc::new(SplitWidth)),
        "split-depth" | "depth" => Some(Arc::new(SplitDepth)),
        _ => None,
    }
}

/// Stripe extents of one and two granules that actually split `extent`.
pub(crate) fn split_candidates(extent: usize, granule: usize) -> Vec<usize> {
    [granule, granule * 2]
        .into_iter()
        .filter(|&s| s < extent)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_candidates() {
        assert_eq!(split_candidates(32, 8), vec![8, 16]);
        assert_eq!(split_candidates(16, 8), vec![8]);
        assert!(split_candidates(8, 8).is_empty());
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("SPLIT-HEIGHT").unwrap().name(), "split-height");
        assert_eq!(by_name("depth").unwrap().name(), "split-depth");
        assert!(by_name("diagonal").is_none());
    }
}
