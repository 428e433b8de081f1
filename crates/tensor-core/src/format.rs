// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory layouts and tensor descriptors.
//!
//! The accelerator stores activations in SRAM as "bricks" of
//! `8 × 8 × 16` (H × W × C) elements. The same brick layout (`NHWCB`) can
//! also be used in DRAM, which avoids a reformat on load at the cost of the
//! padding bytes.

use crate::{checked_round_up, DType, Shape, TensorError};

/// Brick group dimensions in NHWC order.
pub const BRICK_GROUP: [usize; 4] = [1, 8, 8, 16];

/// Memory layout of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    /// Plain row-major NHWC.
    Nhwc,
    /// NHWC split into brick groups, H/W padded to 8, C padded to 16.
    Nhwcb,
    /// Convolution weights: height, width, input channels, output channels.
    Hwio,
    /// Depthwise weights: height, width, input channels, channel multiplier.
    Hwim,
}

impl DataFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DataFormat::Nhwc => "NHWC",
            DataFormat::Nhwcb => "NHWCB",
            DataFormat::Hwio => "HWIO",
            DataFormat::Hwim => "HWIM",
        }
    }

    /// Number of elements a shape occupies when stored in this layout,
    /// saturating at `usize::MAX`.
    pub fn storage_elements(self, shape: &Shape) -> usize {
        self.checked_storage_elements(shape).unwrap_or(usize::MAX)
    }

    /// Number of elements a shape occupies in this layout, or `None` on overflow.
    pub fn checked_storage_elements(self, shape: &Shape) -> Option<usize> {
        match self {
            DataFormat::Nhwcb => {
                let [n, h, w, c] = shape.as_nhwc();
                n.checked_mul(checked_round_up(h, BRICK_GROUP[1])?)?
                    .checked_mul(checked_round_up(w, BRICK_GROUP[2])?)?
                    .checked_mul(checked_round_up(c, BRICK_GROUP[3])?)
            }
            DataFormat::Nhwc | DataFormat::Hwio | DataFormat::Hwim => shape.checked_num_elements(),
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape and element type of a tensor flowing along a graph edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TensorInfo {
    pub shape: Shape,
    pub dtype: DType,
}

impl TensorInfo {
    pub fn new(shape: Shape, dtype: DType) -> Self {
        Self { shape, dtype }
    }

    /// Shorthand for a `u8` NHWC activation tensor.
    pub fn nhwc_u8(n: usize, h: usize, w: usize, c: usize) -> Self {
        Self::new(Shape::nhwc(n, h, w, c), DType::U8)
    }

    /// Bytes the whole tensor occupies in the given layout, saturating at
    /// `usize::MAX`.
    pub fn size_bytes(&self, format: DataFormat) -> usize {
        self.stripe_bytes(&self.shape, format)
    }

    /// Bytes a sub-tensor of shape `stripe` occupies in the given layout,
    /// saturating at `usize::MAX`.
    pub fn stripe_bytes(&self, stripe: &Shape, format: DataFormat) -> usize {
        format
            .checked_storage_elements(stripe)
            .and_then(|e| e.checked_mul(self.dtype.size_bytes()))
            .unwrap_or(usize::MAX)
    }

    /// Checks that the tensor is usable as an activation.
    pub fn validate(&self) -> Result<(), TensorError> {
        if self.shape.rank() == 0 || self.shape.rank() > 4 {
            return Err(TensorError::UnsupportedRank {
                rank: self.shape.rank(),
            });
        }
        // NHWCB is the largest layout, so checking it bounds every other one.
        let bytes = DataFormat::Nhwcb
            .checked_storage_elements(&self.shape)
            .and_then(|e| e.checked_mul(self.dtype.size_bytes()));
        match bytes {
            None => Err(TensorError::TooLarge {
                shape: self.shape.clone(),
            }),
            Some(0) => Err(TensorError::ZeroElements {
                shape: self.shape.clone(),
            }),
            Some(_) => Ok(()),
        }
    }
}

impl std::fmt::Display for TensorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.shape, self.dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nhwcb_pads_to_bricks() {
        let s = Shape::nhwc(1, 10, 8, 20);
        // 16 * 8 * 32
        assert_eq!(DataFormat::Nhwcb.storage_elements(&s), 4096);
        assert_eq!(DataFormat::Nhwc.storage_elements(&s), 1600);
    }

    #[test]
    fn test_size_bytes_uses_dtype() {
        let t = TensorInfo::new(Shape::nhwc(1, 8, 8, 16), DType::I32);
        assert_eq!(t.size_bytes(DataFormat::Nhwc), 1024 * 4);
        assert_eq!(t.size_bytes(DataFormat::Nhwcb), 1024 * 4);
    }

    #[test]
    fn test_stripe_bytes() {
        let t = TensorInfo::nhwc_u8(1, 32, 32, 32);
        let stripe = Shape::nhwc(1, 8, 32, 32);
        assert_eq!(t.stripe_bytes(&stripe, DataFormat::Nhwcb), 8 * 32 * 32);
    }

    #[test]
    fn test_validate() {
        assert!(TensorInfo::nhwc_u8(1, 8, 8, 8).validate().is_ok());
        assert!(matches!(
            TensorInfo::nhwc_u8(1, 0, 8, 8).validate(),
            Err(TensorError::ZeroElements { .. })
        ));
        assert!(matches!(
            TensorInfo::new(Shape::new(vec![]), DType::U8).validate(),
            Err(TensorError::UnsupportedRank { rank: 0 })
        ));
    }

    #[test]
    fn test_validate_rejects_overflowing_shape() {
        let huge = TensorInfo::nhwc_u8(1 << 32, 1 << 32, 1 << 32, 1);
        assert!(matches!(huge.validate(), Err(TensorError::TooLarge { .. })));
        assert_eq!(huge.size_bytes(DataFormat::Nhwcb), usize::MAX);
        assert_eq!(DataFormat::Nhwc.checked_storage_elements(&huge.shape), None);

        // Fits as NHWC but not once H, W and C are padded to bricks.
        let padded = TensorInfo::nhwc_u8(1, usize::MAX - 1, 1, 1);
        assert!(matches!(padded.validate(), Err(TensorError::TooLarge { .. })));
    }

    #[test]
    fn test_display() {
        assert_eq!(DataFormat::Nhwcb.to_string(), "NHWCB");
        assert_eq!(TensorInfo::nhwc_u8(1, 2, 3, 4).to_string(), "[1, 2, 3, 4] u8");
    }

    #[test]
    fn test_serde_roundtrip() {
        let t = TensorInfo::nhwc_u8(1, 16, 16, 3);
        let json = serde_json::to_string(&t).unwrap();
        let back: TensorInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
