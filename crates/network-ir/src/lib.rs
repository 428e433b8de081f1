// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # network-ir
//!
//! The operation graph consumed by the cascading compiler.
//!
//! - [`NodeKind`]: what a node computes, as an explicit tagged enum.
//! - [`Node`]: one operation: kind, input edges, output tensors.
//! - [`Graph`]: the network as a DAG, with a **type-state pattern**
//!   (`Loaded` → `Validated`). Validation computes the topological order
//!   and consumer lists the partitioner relies on.
//! - [`GraphLoader`]: reads the JSON description produced by the front end.
//!
//! # Example
//! ```
//! use network_ir::{GraphBuilder, MceOp};
//! use tensor_core::TensorInfo;
//!
//! let mut b = GraphBuilder::new("demo");
//! let input = b.input("in", TensorInfo::nhwc_u8(1, 8, 8, 16));
//! let conv = b.mce("conv", MceOp::convolution([1, 1], [1, 1]), input, TensorInfo::nhwc_u8(1, 8, 8, 16));
//! b.output("out", conv);
//! let graph = b.build().validate().unwrap();
//! println!("{}", graph.summary());
//! ```

mod error;
pub mod graph;
mod loader;
mod node;

pub use error::GraphError;
pub use graph::{Consumer, Graph, GraphBuilder};
pub use loader::{GraphDescription, GraphLoader};
pub use node::{Edge, MceKind, MceOp, Node, NodeId, NodeKind, PleKind, PostProcessKind};
