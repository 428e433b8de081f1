// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Plans: concrete execution strategies for a single part.
//!
//! A plan fixes everything about how one part runs: the SRAM buffers it
//! needs, the operations it issues and, for each input and output slot, a
//! [`Boundary`] saying where and in which layout it expects the data. The
//! boundaries are the only thing the combiner looks at when gluing plans
//! of neighbouring parts together.

use network_ir::NodeId;
use std::fmt;
use tensor_core::{DataFormat, Shape, TensorInfo};

/// Where a tensor lives at a part boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Dram,
    Sram,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Dram => f.write_str("DRAM"),
            Location::Sram => f.write_str("SRAM"),
        }
    }
}

/// What a plan expects on one of its input or output slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Boundary {
    pub location: Location,
    pub format: DataFormat,
    pub tensor: TensorInfo,
    /// Stripe shape the slot is streamed in.
    pub stripe: Shape,
    /// Number of SRAM stripe buffers backing the slot (0 for host tensors).
    pub num_buffers: usize,
    /// Total aligned SRAM bytes of those buffers.
    pub buffer_bytes: usize,
}

impl Boundary {
    /// A whole tensor in DRAM with no SRAM staging of its own.
    pub fn dram(tensor: TensorInfo, format: DataFormat) -> Self {
        let stripe = Shape::from(tensor.shape.as_nhwc().to_vec());
        Self {
            location: Location::Dram,
            format,
            tensor,
            stripe,
            num_buffers: 0,
            buffer_bytes: 0,
        }
    }

    pub fn is_sram(&self) -> bool {
        self.location == Location::Sram
    }

    /// Bytes the whole tensor occupies in DRAM in this boundary's layout.
    pub fn dram_bytes(&self) -> usize {
        self.tensor.size_bytes(self.format)
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} stripe {}", self.location, self.format, self.stripe)?;
        if self.num_buffers > 0 {
            write!(f, " x{} ({} B)", self.num_buffers, self.buffer_bytes)?;
        }
        Ok(())
    }
}

/// What an SRAM buffer of a plan holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferRole {
    Input(usize),
    Output(usize),
    Weights,
}

/// One SRAM buffer; the size is already aligned.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlanBuffer {
    pub role: BufferRole,
    pub size_bytes: usize,
}

/// An operation a plan issues to the hardware.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PlanOp {
    /// DRAM → SRAM transfer.
    DmaLoad { bytes: usize, format: DataFormat },
    /// SRAM → DRAM transfer.
    DmaStore { bytes: usize, format: DataFormat },
    /// Multiply-accumulate work, with post-processing fused in.
    Mce {
        node: NodeId,
        macs: u64,
        stripes: usize,
        fused: Vec<NodeId>,
    },
    /// Programmable-layer-engine work.
    Ple {
        node: NodeId,
        elements: u64,
        stripes: usize,
    },
}

impl PlanOp {
    /// DRAM bytes moved by this op (zero for compute ops).
    pub fn dram_bytes(&self) -> usize {
        match self {
            PlanOp::DmaLoad { bytes, .. } | PlanOp::DmaStore { bytes, .. } => *bytes,
            PlanOp::Mce { .. } | PlanOp::Ple { .. } => 0,
        }
    }
}

/// One fully specified way of executing a part.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Plan {
    /// Stripe strategy that proposed the plan.
    pub strategy: String,
    pub inputs: Vec<Boundary>,
    pub outputs: Vec<Boundary>,
    pub buffers: Vec<PlanBuffer>,
    pub ops: Vec<PlanOp>,
}

impl Plan {
    /// SRAM occupied by all buffers of this plan.
    pub fn sram_bytes(&self) -> usize {
        self.buffers.iter().map(|b| b.size_bytes).sum()
    }

    /// DRAM traffic issued by this plan's own DMA ops.
    pub fn dram_bytes(&self) -> usize {
        self.ops.iter().map(PlanOp::dram_bytes).sum()
    }

    pub fn buffer(&self, role: BufferRole) -> Option<&PlanBuffer> {
        self.buffers.iter().find(|b| b.role == role)
    }

    /// Returns a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        let fmt_boundaries = |bs: &[Boundary]| -> String {
            bs.iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Plan '{}': in [{}] out [{}], {} buffers ({:.1} KB SRAM), {} ops, {} B DRAM",
            self.strategy,
            fmt_boundaries(&self.inputs),
            fmt_boundaries(&self.outputs),
            self.buffers.len(),
            self.sram_bytes() as f64 / 1024.0,
            self.ops.len(),
            self.dram_bytes(),
        )
    }
}

/// Builder helper for constructing a [`Plan`] incrementally.
///
/// Used internally by the plan generator.
pub(crate) struct PlanBuilder {
    strategy: String,
    inputs: Vec<Boundary>,
    outputs: Vec<Boundary>,
    buffers: Vec<PlanBuffer>,
    ops: Vec<PlanOp>,
}

impl PlanBuilder {
    pub fn new(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            buffers: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn input(&mut self, boundary: Boundary) -> &mut Self {
        self.inputs.push(boundary);
        self
    }

    pub fn output(&mut self, boundary: Boundary) -> &mut Self {
        self.outputs.push(boundary);
        self
    }

    /// Adds a buffer; zero-sized buffers are skipped.
    pub fn buffer(&mut self, role: BufferRole, size_bytes: usize) -> &mut Self {
        if size_bytes > 0 {
            self.buffers.push(PlanBuffer { role, size_bytes });
        }
        self
    }

    pub fn op(&mut self, op: PlanOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn build(self) -> Plan {
        Plan {
            strategy: self.strategy,
            inputs: self.inputs,
            outputs: self.outputs,
            buffers: self.buffers,
            ops: self.ops,
        }
    }
}
