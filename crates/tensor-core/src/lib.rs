// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor descriptors shared by every stage of the cascading compiler.
//!
//! This crate provides:
//! - [`Shape`]: dimensions with NHWC accessors and stripe arithmetic.
//! - [`DType`]: quantized element types (u8, i8, i32).
//! - [`DataFormat`]: memory layouts, including the brick layout `NHWCB`.
//! - [`TensorInfo`]: shape + element type, with per-layout byte sizes.
//!
//! No tensor data is ever held here: the compiler only reasons about sizes
//! and layouts.

mod dtype;
mod error;
mod format;
mod shape;

pub use dtype::DType;
pub use error::TensorError;
pub use format::{DataFormat, TensorInfo, BRICK_GROUP};
pub use shape::{checked_round_up, round_up, Shape};
