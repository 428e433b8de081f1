// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and dimension utilities.
//!
//! Activation tensors follow the NHWC convention. Shapes with fewer than
//! four dimensions are treated as if padded with leading 1s, so
//! `[8, 512]` reads as `[1, 1, 8, 512]`.

use std::fmt;

/// Describes the dimensionality of a tensor.
///
/// Shapes are immutable once created. The NHWC accessors
/// ([`Shape::height`], [`Shape::channels`], …) are the vocabulary the
/// stripe planner works in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![1, 16, 16, 32]);
    /// assert_eq!(s.rank(), 4);
    /// assert_eq!(s.num_elements(), 8192);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 4-D activation shape in NHWC order.
    pub fn nhwc(n: usize, h: usize, w: usize, c: usize) -> Self {
        Self {
            dims: vec![n, h, w, c],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements, saturating at `usize::MAX`.
    ///
    /// For a rank-0 shape, returns 1.
    pub fn num_elements(&self) -> usize {
        self.checked_num_elements().unwrap_or(usize::MAX)
    }

    /// Returns the total number of elements, or `None` on overflow.
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the dimensions widened to NHWC, padding missing leading dims with 1.
    pub fn as_nhwc(&self) -> [usize; 4] {
        let mut out = [1usize; 4];
        let take = self.dims.len().min(4);
        let src = &self.dims[self.dims.len() - take..];
        out[4 - take..].copy_from_slice(src);
        out
    }

    pub fn batch(&self) -> usize {
        self.as_nhwc()[0]
    }

    pub fn height(&self) -> usize {
        self.as_nhwc()[1]
    }

    pub fn width(&self) -> usize {
        self.as_nhwc()[2]
    }

    pub fn channels(&self) -> usize {
        self.as_nhwc()[3]
    }

    /// Returns a copy of this shape (as NHWC) with the height replaced.
    pub fn with_height(&self, h: usize) -> Shape {
        let [n, _, w, c] = self.as_nhwc();
        Shape::nhwc(n, h, w, c)
    }

    /// Returns a copy of this shape (as NHWC) with the width replaced.
    pub fn with_width(&self, w: usize) -> Shape {
        let [n, h, _, c] = self.as_nhwc();
        Shape::nhwc(n, h, w, c)
    }

    /// Returns a copy of this shape (as NHWC) with the channel count replaced.
    pub fn with_channels(&self, c: usize) -> Shape {
        let [n, h, w, _] = self.as_nhwc();
        Shape::nhwc(n, h, w, c)
    }

    /// Number of stripes of shape `stripe` needed to cover this shape.
    ///
    /// Returns 0 if any stripe dimension is zero.
    pub fn num_stripes(&self, stripe: &Shape) -> usize {
        let full = self.as_nhwc();
        let part = stripe.as_nhwc();
        if part.iter().any(|&d| d == 0) {
            return 0;
        }
        full.iter()
            .zip(part.iter())
            .map(|(&f, &p)| f.div_ceil(p))
            .product()
    }
}

/// Rounds `value` up to the next multiple of `multiple`, saturating at
/// `usize::MAX`.
pub fn round_up(value: usize, multiple: usize) -> usize {
    checked_round_up(value, multiple).unwrap_or(usize::MAX)
}

/// Rounds `value` up to the next multiple of `multiple`, or `None` on overflow.
pub fn checked_round_up(value: usize, multiple: usize) -> Option<usize> {
    if multiple == 0 {
        return Some(value);
    }
    value.div_ceil(multiple).checked_mul(multiple)
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![1, 8, 8, 16])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[1, 8, 8, 16][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}
