// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The cost model.
//!
//! Each pass keeps three engines busy concurrently, so its duration is the
//! slowest of them plus a fixed setup cost:
//!
//! ```text
//! dma  = ceil(nhwcb_bytes / bw) + ceil(nhwc_bytes * penalty% / bw)
//! mce  = Σ ceil(macs / (ces * macs_per_ce)) + stripes * stripe_overhead
//! ple  = Σ ceil(elements / ple_rate)        + stripes * stripe_overhead
//! pass = max(dma, mce, ple) + pass_setup
//! ```
//!
//! Only integer arithmetic is used, so the result is a pure function of the
//! op graph and the capabilities.

use crate::performance::{EstimatedOpGraph, PassPerformance, PerformanceData};
use crate::EstimationError;
use cascading::{
    op_graph_for_combination, Combination, EstimationOptions, GraphOfParts,
    HardwareCapabilities, OpGraph, OpKind, Pass,
};
use tensor_core::DataFormat;

/// Estimates every pass of `op_graph`.
///
/// # Errors
/// - [`EstimationError::NotSupported`] for a pass longer than
///   `options.max_pass_length` parts.
/// - [`EstimationError::Internal`] for unusable capabilities.
pub fn estimate_op_graph(
    op_graph: &OpGraph,
    caps: &HardwareCapabilities,
    options: &EstimationOptions,
) -> Result<PerformanceData, EstimationError> {
    caps.validate().map_err(EstimationError::Internal)?;

    let passes = op_graph
        .passes
        .iter()
        .map(|pass| estimate_pass(pass, caps, options))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PerformanceData::from_passes(passes))
}

/// Lowers `combination` and estimates the result.
pub fn estimate_combination(
    combination: &Combination,
    gop: &GraphOfParts,
    caps: &HardwareCapabilities,
    options: &EstimationOptions,
) -> Result<EstimatedOpGraph, EstimationError> {
    let op_graph = op_graph_for_combination(combination, gop, caps)?;
    let perf = estimate_op_graph(&op_graph, caps, options)?;
    Ok(EstimatedOpGraph { op_graph, perf })
}

fn estimate_pass(
    pass: &Pass,
    caps: &HardwareCapabilities,
    options: &EstimationOptions,
) -> Result<PassPerformance, EstimationError> {
    if pass.parts.len() > options.max_pass_length {
        return Err(EstimationError::NotSupported(format!(
            "pass {} cascades {} parts, at most {} are supported",
            pass.index,
            pass.parts.len(),
            options.max_pass_length
        )));
    }

    let mut traffic = DmaTraffic::default();
    let mut mce_cycles = 0u64;
    let mut ple_cycles = 0u64;
    let overhead = |stripes: usize| stripes as u64 * caps.stripe_overhead_cycles;

    for op in &pass.ops {
        match &op.kind {
            OpKind::DmaLoad { bytes, format } => traffic.read(*bytes, *format),
            OpKind::DmaStore { bytes, format } => traffic.write(*bytes, *format),
            OpKind::Convert {
                bytes_in,
                bytes_out,
                from,
                to,
            } => {
                traffic.read(*bytes_in, *from);
                traffic.write(*bytes_out, *to);
            }
            OpKind::Mce { macs, stripes, .. } => {
                mce_cycles += macs.div_ceil(caps.macs_per_cycle()) + overhead(*stripes);
            }
            OpKind::Ple {
                elements, stripes, ..
            } => {
                ple_cycles +=
                    elements.div_ceil(caps.ple_elements_per_cycle as u64) + overhead(*stripes);
            }
        }
    }

    let dma_cycles = traffic.cycles(caps);
    let total_cycles = dma_cycles.max(mce_cycles).max(ple_cycles) + caps.pass_setup_cycles;
    tracing::trace!(pass = pass.index, dma_cycles, mce_cycles, ple_cycles, "pass estimated");

    Ok(PassPerformance {
        pass: pass.index,
        parts: pass.parts.clone(),
        dram_read_bytes: traffic.read_bytes,
        dram_write_bytes: traffic.write_bytes,
        dma_cycles,
        mce_cycles,
        ple_cycles,
        total_cycles,
    })
}

#[derive(Debug, Default)]
struct DmaTraffic {
    read_bytes: u64,
    write_bytes: u64,
    /// Bytes moved in brick (or weight) layouts at full speed.
    fast_bytes: u64,
    /// Bytes moved as NHWC, which pays the penalty.
    nhwc_bytes: u64,
}

impl DmaTraffic {
    fn read(&mut self, bytes: usize, format: DataFormat) {
        self.read_bytes += bytes as u64;
        self.account(bytes, format);
    }

    fn write(&mut self, bytes: usize, format: DataFormat) {
        self.write_bytes += bytes as u64;
        self.account(bytes, format);
    }

    fn account(&mut self, bytes: usize, format: DataFormat) {
        match format {
            DataFormat::Nhwc => self.nhwc_bytes += bytes as u64,
            DataFormat::Nhwcb | DataFormat::Hwio | DataFormat::Hwim => {
                self.fast_bytes += bytes as u64
            }
        }
    }

    fn cycles(&self, caps: &HardwareCapabilities) -> u64 {
        let bw = caps.dram_bytes_per_cycle as u64;
        self.fast_bytes.div_ceil(bw)
            + (self.nhwc_bytes * caps.nhwc_dma_penalty_percent).div_ceil(100 * bw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascading::{Op, PartId};
    use network_ir::NodeId;

    fn caps() -> HardwareCapabilities {
        HardwareCapabilities {
            num_ces: 2,
            macs_per_ce_per_cycle: 50,
            ple_elements_per_cycle: 10,
            dram_bytes_per_cycle: 10,
            stripe_overhead_cycles: 5,
            pass_setup_cycles: 100,
            nhwc_dma_penalty_percent: 200,
            ..Default::default()
        }
    }

    fn pass(index: usize, parts: usize, ops: Vec<OpKind>) -> Pass {
        Pass {
            index,
            parts: (0..parts).map(PartId).collect(),
            ops: ops
                .into_iter()
                .map(|kind| Op {
                    part: PartId(0),
                    kind,
                })
                .collect(),
            buffers: Vec::new(),
        }
    }

    #[test]
    fn test_pass_cost_formula() {
        let graph = OpGraph {
            passes: vec![pass(
                0,
                1,
                vec![
                    OpKind::DmaLoad {
                        bytes: 1000,
                        format: DataFormat::Nhwcb,
                    },
                    OpKind::DmaLoad {
                        bytes: 15,
                        format: DataFormat::Nhwc,
                    },
                    OpKind::Mce {
                        node: NodeId(1),
                        macs: 10_001,
                        stripes: 2,
                        fused: vec![],
                    },
                    OpKind::DmaStore {
                        bytes: 500,
                        format: DataFormat::Nhwcb,
                    },
                ],
            )],
        };
        let perf = estimate_op_graph(&graph, &caps(), &EstimationOptions::default()).unwrap();
        let p = &perf.passes[0];
        // 1500 / 10 + ceil(15 * 2 / 10)
        assert_eq!(p.dma_cycles, 150 + 3);
        // ceil(10001 / 100) + 2 * 5
        assert_eq!(p.mce_cycles, 101 + 10);
        assert_eq!(p.ple_cycles, 0);
        assert_eq!(p.total_cycles, 153 + 100);
        assert_eq!(p.dram_read_bytes, 1015);
        assert_eq!(p.dram_write_bytes, 500);
        assert_eq!(perf.metric.total_cycles, 253);
        assert_eq!(perf.metric.dram_bytes, 1515);
        assert_eq!(perf.metric.num_passes, 1);
    }

    #[test]
    fn test_convert_counts_both_directions() {
        let graph = OpGraph {
            passes: vec![pass(
                0,
                1,
                vec![
                    OpKind::Convert {
                        bytes_in: 100,
                        bytes_out: 200,
                        from: DataFormat::Nhwc,
                        to: DataFormat::Nhwcb,
                    },
                    OpKind::Ple {
                        node: NodeId(0),
                        elements: 95,
                        stripes: 1,
                    },
                ],
            )],
        };
        let perf = estimate_op_graph(&graph, &caps(), &EstimationOptions::default()).unwrap();
        let p = &perf.passes[0];
        assert_eq!(p.dram_read_bytes, 100);
        assert_eq!(p.dram_write_bytes, 200);
        // 200 / 10 + 100 * 2 / 10
        assert_eq!(p.dma_cycles, 40);
        assert_eq!(p.ple_cycles, 10 + 5);
    }

    #[test]
    fn test_long_pass_is_not_supported() {
        let graph = OpGraph {
            passes: vec![pass(0, 3, vec![])],
        };
        let options = EstimationOptions {
            max_pass_length: 2,
            ..Default::default()
        };
        let err = estimate_op_graph(&graph, &caps(), &options).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_bad_capabilities_are_fatal() {
        let broken = HardwareCapabilities {
            num_ces: 0,
            ..caps()
        };
        let err = estimate_op_graph(&OpGraph::default(), &broken, &EstimationOptions::default())
            .unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_empty_graph_costs_nothing() {
        let perf =
            estimate_op_graph(&OpGraph::default(), &caps(), &EstimationOptions::default()).unwrap();
        assert_eq!(perf.metric, Default::default());
    }
}
