// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lowering of a combination into a flat operation graph.
//!
//! Every section that does any work becomes a [`Pass`]. Its ops are the ops
//! of its parts' plans in part order, preceded by the DRAM conversions
//! feeding each part. Buffers get concrete SRAM offsets from one
//! [`SramAllocator`] shared by all passes: a pass's buffers are freed when
//! the pass ends, so every pass starts from an empty SRAM. The consumer side
//! of a cascade is placed on top of the producer's output buffer instead of
//! being allocated.

use crate::capabilities::HardwareCapabilities;
use crate::combination::{Combination, Glue};
use crate::part::{GraphOfParts, PartId};
use crate::plan::{BufferRole, PlanOp};
use crate::CascadingError;
use network_ir::NodeId;
use sram_allocator::SramAllocator;
use std::collections::HashMap;
use tensor_core::DataFormat;

/// One operation of the flattened graph.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OpKind {
    DmaLoad {
        bytes: usize,
        format: DataFormat,
    },
    DmaStore {
        bytes: usize,
        format: DataFormat,
    },
    Mce {
        node: NodeId,
        macs: u64,
        stripes: usize,
        fused: Vec<NodeId>,
    },
    Ple {
        node: NodeId,
        elements: u64,
        stripes: usize,
    },
    /// DRAM-to-DRAM layout conversion between two parts.
    Convert {
        bytes_in: usize,
        bytes_out: usize,
        from: DataFormat,
        to: DataFormat,
    },
}

impl From<&PlanOp> for OpKind {
    fn from(op: &PlanOp) -> Self {
        match op {
            PlanOp::DmaLoad { bytes, format } => OpKind::DmaLoad {
                bytes: *bytes,
                format: *format,
            },
            PlanOp::DmaStore { bytes, format } => OpKind::DmaStore {
                bytes: *bytes,
                format: *format,
            },
            PlanOp::Mce {
                node,
                macs,
                stripes,
                fused,
            } => OpKind::Mce {
                node: *node,
                macs: *macs,
                stripes: *stripes,
                fused: fused.clone(),
            },
            PlanOp::Ple {
                node,
                elements,
                stripes,
            } => OpKind::Ple {
                node: *node,
                elements: *elements,
                stripes: *stripes,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Op {
    /// Part the op was lowered from.
    pub part: PartId,
    pub kind: OpKind,
}

/// A plan buffer with its SRAM offset.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlacedBuffer {
    pub part: PartId,
    pub role: BufferRole,
    pub offset: usize,
    pub size_bytes: usize,
    /// `true` when the buffer aliases a producer's output buffer.
    pub shared: bool,
}

/// Work executed with one SRAM layout.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Pass {
    pub index: usize,
    pub parts: Vec<PartId>,
    pub ops: Vec<Op>,
    pub buffers: Vec<PlacedBuffer>,
}

impl Pass {
    /// Highest SRAM address used by the pass.
    pub fn sram_high_water(&self) -> usize {
        self.buffers
            .iter()
            .map(|b| b.offset + b.size_bytes)
            .max()
            .unwrap_or(0)
    }
}

/// The flattened graph of a combination.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OpGraph {
    pub passes: Vec<Pass>,
}

impl OpGraph {
    pub fn num_passes(&self) -> usize {
        self.passes.len()
    }

    pub fn num_ops(&self) -> usize {
        self.passes.iter().map(|p| p.ops.len()).sum()
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let peak = self
            .passes
            .iter()
            .map(Pass::sram_high_water)
            .max()
            .unwrap_or(0);
        format!(
            "{} passes, {} ops, peak SRAM {:.1} KB",
            self.num_passes(),
            self.num_ops(),
            peak as f64 / 1024.0,
        )
    }
}

/// Lowers `combination` into an [`OpGraph`].
pub fn op_graph_for_combination(
    combination: &Combination,
    gop: &GraphOfParts,
    caps: &HardwareCapabilities,
) -> Result<OpGraph, CascadingError> {
    let mut passes = Vec::new();
    let mut allocator = SramAllocator::new(caps.sram_budget(), caps.sram_alignment);

    for section in &combination.sections {
        let mut owned = Vec::new();
        let mut offsets: HashMap<(PartId, BufferRole), usize> = HashMap::new();
        let mut ops = Vec::new();
        let mut buffers = Vec::new();

        for &part in section {
            let plan = combination.plan_for(gop, part).ok_or_else(|| {
                CascadingError::Internal(format!("combination has no plan for {part}"))
            })?;

            // Cascaded inputs, by input slot, with the producer buffer they alias.
            let mut aliases: HashMap<usize, (PartId, usize)> = HashMap::new();
            for (i, conn) in gop.incoming(part) {
                match combination.glues.get(i) {
                    Some(Glue::Convert {
                        bytes_in,
                        bytes_out,
                        from,
                        to,
                    }) => ops.push(Op {
                        part,
                        kind: OpKind::Convert {
                            bytes_in: *bytes_in,
                            bytes_out: *bytes_out,
                            from: *from,
                            to: *to,
                        },
                    }),
                    Some(Glue::Cascade) => {
                        aliases.insert(conn.dest.slot, (conn.source.part, conn.source.slot));
                    }
                    Some(Glue::Dram) => {}
                    None => {
                        return Err(CascadingError::Internal(format!(
                            "connection {i} has no glue"
                        )))
                    }
                }
            }

            ops.extend(plan.ops.iter().map(|op| Op {
                part,
                kind: OpKind::from(op),
            }));

            for buffer in &plan.buffers {
                let alias = match buffer.role {
                    BufferRole::Input(slot) => aliases.get(&slot).copied(),
                    _ => None,
                };
                let (offset, shared) = match alias {
                    Some((producer, slot)) => {
                        let offset = offsets
                            .get(&(producer, BufferRole::Output(slot)))
                            .copied()
                            .ok_or_else(|| {
                                CascadingError::Internal(format!(
                                    "{part} cascades from {producer}, which has no output buffer {slot}"
                                ))
                            })?;
                        (offset, true)
                    }
                    None => {
                        let offset = allocator.allocate(buffer.size_bytes).map_err(|e| {
                            CascadingError::Internal(format!("placing buffers of {part}: {e}"))
                        })?;
                        owned.push(offset);
                        (offset, false)
                    }
                };
                offsets.insert((part, buffer.role), offset);
                buffers.push(PlacedBuffer {
                    part,
                    role: buffer.role,
                    offset,
                    size_bytes: buffer.size_bytes,
                    shared,
                });
            }
        }

        if !owned.is_empty() {
            tracing::trace!(
                "section {:?} SRAM: {} ({:.1}% peak), largest free block {} B",
                section,
                allocator.stats().summary(),
                allocator.stats().peak_percent(allocator.capacity()),
                allocator.largest_free_block(),
            );
        }
        release(&mut allocator, &owned)?;

        if ops.is_empty() {
            continue;
        }
        passes.push(Pass {
            index: passes.len(),
            parts: section.clone(),
            ops,
            buffers,
        });
    }

    Ok(OpGraph { passes })
}

/// Frees the buffers a pass allocated; afterwards the SRAM must be empty.
fn release(allocator: &mut SramAllocator, owned: &[usize]) -> Result<(), CascadingError> {
    for &offset in owned {
        allocator
            .free(offset)
            .map_err(|e| CascadingError::Internal(format!("releasing pass buffers: {e}")))?;
    }
    if allocator.allocated_bytes() != 0 || allocator.largest_free_block() != allocator.capacity() {
        return Err(CascadingError::Internal(format!(
            "{} bytes of SRAM still held after the pass",
            allocator.allocated_bytes()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::combiner::combine;
    use crate::options::{CompilationOptions, EstimationOptions};
    use crate::part::create_graph_of_parts;
    use crate::plan_generator::create_plans;
    use network_ir::{GraphBuilder, MceOp, PostProcessKind};
    use tensor_core::TensorInfo;

    fn two_convs() -> (GraphOfParts, HardwareCapabilities) {
        let t = TensorInfo::nhwc_u8(1, 16, 16, 16);
        let mut b = GraphBuilder::new("two-convs");
        let i = b.input("in", t.clone());
        let c1 = b.mce("c1", MceOp::convolution([1, 1], [1, 1]), i, t.clone());
        let r1 = b.post_process("r1", PostProcessKind::Relu, c1);
        let c2 = b.mce("c2", MceOp::convolution([1, 1], [1, 1]), r1, t);
        b.output("out", c2);
        let g = b.build().validate().unwrap();

        let caps = HardwareCapabilities::default();
        let mut gop = create_graph_of_parts(&g).unwrap();
        create_plans(&mut gop, &g, &caps, &CompilationOptions::default()).unwrap();
        (gop, caps)
    }

    #[test]
    fn test_cascaded_input_reuses_producer_offset() {
        let (gop, caps) = two_convs();
        let combos = combine(
            &gop,
            &caps,
            &EstimationOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let cascaded = combos.iter().find(|c| c.num_cascades() == 1).unwrap();

        let graph = op_graph_for_combination(cascaded, &gop, &caps).unwrap();
        assert_eq!(graph.num_passes(), 1);
        let pass = &graph.passes[0];
        assert_eq!(pass.parts, vec![PartId(1), PartId(2)]);

        let out = pass
            .buffers
            .iter()
            .find(|b| b.part == PartId(1) && b.role == BufferRole::Output(0))
            .unwrap();
        let shared = pass
            .buffers
            .iter()
            .find(|b| b.part == PartId(2) && b.role == BufferRole::Input(0))
            .unwrap();
        assert!(shared.shared);
        assert_eq!(shared.offset, out.offset);
        assert!(pass.sram_high_water() <= caps.total_sram_bytes);
    }

    #[test]
    fn test_host_only_sections_have_no_pass() {
        let (gop, caps) = two_convs();
        let combos = combine(
            &gop,
            &caps,
            &EstimationOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let uncascaded = combos.iter().find(|c| c.num_cascades() == 0).unwrap();
        let graph = op_graph_for_combination(uncascaded, &gop, &caps).unwrap();
        // in, c1+r1, c2, out: only the two compute parts do work.
        assert_eq!(graph.num_passes(), 2);
        assert_eq!(graph.passes[1].index, 1);
        assert!(graph.summary().starts_with("2 passes"));
    }

    #[test]
    fn test_every_pass_starts_from_empty_sram() {
        let (gop, caps) = two_convs();
        let combos = combine(
            &gop,
            &caps,
            &EstimationOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        for combination in &combos {
            let graph = op_graph_for_combination(combination, &gop, &caps).unwrap();
            for pass in &graph.passes {
                let lowest = pass
                    .buffers
                    .iter()
                    .filter(|b| !b.shared)
                    .map(|b| b.offset)
                    .min();
                assert_eq!(lowest, Some(0), "pass {} of {:?}", pass.index, combination.sections);
            }
        }
    }

    #[test]
    fn test_release_rejects_leaked_buffers() {
        let caps = HardwareCapabilities::default();
        let mut sram = SramAllocator::new(caps.sram_budget(), caps.sram_alignment);
        let a = sram.allocate(1024).unwrap();
        let b = sram.allocate(2048).unwrap();
        release(&mut sram, &[a, b]).unwrap();
        assert_eq!(sram.largest_free_block(), sram.capacity());

        let kept = sram.allocate(64).unwrap();
        let freed = sram.allocate(64).unwrap();
        assert!(matches!(
            release(&mut sram, &[freed]),
            Err(CascadingError::Internal(_))
        ));
        assert!(matches!(
            release(&mut sram, &[kept, kept]),
            Err(CascadingError::Internal(_))
        ));
    }

    #[test]
    fn test_convert_glue_lowered_into_consumer_pass() {
        let (gop, caps) = two_convs();
        let combos = combine(
            &gop,
            &caps,
            &EstimationOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let converting = combos
            .iter()
            .find(|c| matches!(c.glues[0], Glue::Convert { .. }))
            .unwrap();
        let graph = op_graph_for_combination(converting, &gop, &caps).unwrap();
        let first = &graph.passes[0];
        assert_eq!(first.parts[0], PartId(1));
        assert!(matches!(first.ops[0].kind, OpKind::Convert { .. }));
        assert_eq!(first.ops[0].part, PartId(1));
    }
}
