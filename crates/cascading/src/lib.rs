// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cascading
//!
//! Turns a validated operation graph into valid schedules for the NPU.
//!
//! ```text
//! Graph ──partition──▶ GraphOfParts ──plan──▶ Plans per Part
//!       ──combine──▶ Combinations ──lower──▶ OpGraph per Combination
//! ```
//!
//! - [`create_graph_of_parts`] groups nodes into [`Part`]s.
//! - [`create_plans`] enumerates candidate [`Plan`]s per part, one family per
//!   [`StripeStrategy`].
//! - [`combine`] searches for [`Combination`]s whose boundaries glue together
//!   and whose cascaded sections fit in SRAM.
//! - [`op_graph_for_combination`] flattens a combination into passes with
//!   concrete SRAM offsets, ready for estimation.
//!
//! # Trait-Based Extensibility
//!
//! Output stripe shapes come from [`StripeStrategy`] implementations, so new
//! tilings can be added without touching the generator:
//!
//! ```ignore
//! #[derive(Debug)]
//! struct QuarterHeight;
//! impl StripeStrategy for QuarterHeight {
//!     fn name(&self) -> &str { "quarter-height" }
//!     fn propose(&self, output: &Shape) -> Vec<Shape> {
//!         vec![output.with_height(output.height().div_ceil(4))]
//!     }
//! }
//! ```
//!
//! # Example
//! ```
//! use cascading::{
//!     combine, create_graph_of_parts, create_plans, CancellationToken,
//!     CompilationOptions, EstimationOptions, HardwareCapabilities,
//! };
//! use network_ir::{GraphBuilder, MceOp, PostProcessKind};
//! use tensor_core::TensorInfo;
//!
//! let t = TensorInfo::nhwc_u8(1, 16, 16, 16);
//! let mut b = GraphBuilder::new("example");
//! let input = b.input("in", t.clone());
//! let conv = b.mce("conv", MceOp::convolution([3, 3], [1, 1]), input, t);
//! let relu = b.post_process("relu", PostProcessKind::Relu, conv);
//! b.output("out", relu);
//! let graph = b.build().validate().unwrap();
//!
//! let caps = HardwareCapabilities::default();
//! let mut gop = create_graph_of_parts(&graph).unwrap();
//! create_plans(&mut gop, &graph, &caps, &CompilationOptions::default()).unwrap();
//! let combinations = combine(
//!     &gop,
//!     &caps,
//!     &EstimationOptions::default(),
//!     &CancellationToken::new(),
//! )
//! .unwrap();
//! assert!(!combinations.is_empty());
//! ```

mod cancel;
mod capabilities;
mod combination;
mod combiner;
mod error;
pub mod op_graph;
mod options;
pub mod part;
pub mod plan;
mod plan_generator;
pub mod strategy;

pub use cancel::CancellationToken;
pub use capabilities::{HardwareCapabilities, NpuVariant};
pub use combination::{Combination, Glue};
pub use combiner::{combine, resolve_search_mode};
pub use error::CascadingError;
pub use op_graph::{op_graph_for_combination, Op, OpGraph, OpKind, Pass, PlacedBuffer};
pub use options::{CompilationOptions, EstimationOptions, SearchMode};
pub use part::{create_graph_of_parts, GraphOfParts, Part, PartConnection, PartId};
pub use plan::{Boundary, BufferRole, Location, Plan, PlanOp};
pub use plan_generator::create_plans;
pub use strategy::StripeStrategy;
