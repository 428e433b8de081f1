// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Performance reports.

use cascading::{OpGraph, PartId};
use std::fmt;

/// Cost breakdown of one pass.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PassPerformance {
    pub pass: usize,
    pub parts: Vec<PartId>,
    pub dram_read_bytes: u64,
    pub dram_write_bytes: u64,
    pub dma_cycles: u64,
    pub mce_cycles: u64,
    pub ple_cycles: u64,
    /// Slowest engine plus pass setup.
    pub total_cycles: u64,
}

impl PassPerformance {
    pub fn dram_bytes(&self) -> u64 {
        self.dram_read_bytes + self.dram_write_bytes
    }

    /// Name of the engine that bounds the pass.
    pub fn bottleneck(&self) -> &'static str {
        if self.dma_cycles >= self.mce_cycles && self.dma_cycles >= self.ple_cycles {
            "dma"
        } else if self.mce_cycles >= self.ple_cycles {
            "mce"
        } else {
            "ple"
        }
    }
}

/// Whole-network figure of merit.
///
/// Fields are compared in declaration order; smaller is more performant.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct PerformanceMetric {
    pub total_cycles: u64,
    pub dram_bytes: u64,
    pub num_passes: usize,
}

impl PerformanceMetric {
    /// `true` if `self` ranks strictly ahead of `other`.
    pub fn is_more_performant_than(&self, other: &PerformanceMetric) -> bool {
        self < other
    }
}

impl fmt::Display for PerformanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles, {} DRAM bytes, {} passes",
            self.total_cycles, self.dram_bytes, self.num_passes
        )
    }
}

/// Per-pass breakdown plus the aggregate metric.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PerformanceData {
    pub passes: Vec<PassPerformance>,
    pub metric: PerformanceMetric,
}

impl PerformanceData {
    pub fn from_passes(passes: Vec<PassPerformance>) -> Self {
        let metric = PerformanceMetric {
            total_cycles: passes.iter().map(|p| p.total_cycles).sum(),
            dram_bytes: passes.iter().map(PassPerformance::dram_bytes).sum(),
            num_passes: passes.len(),
        };
        Self { passes, metric }
    }

    /// Returns a per-pass table followed by the totals.
    pub fn report(&self) -> String {
        let mut out = String::new();
        for p in &self.passes {
            let parts: Vec<String> = p.parts.iter().map(|id| id.to_string()).collect();
            out.push_str(&format!(
                "  pass {:>3} [{}]: {} cycles ({}), dma {} mce {} ple {}, DRAM r {} w {}\n",
                p.pass,
                parts.join("+"),
                p.total_cycles,
                p.bottleneck(),
                p.dma_cycles,
                p.mce_cycles,
                p.ple_cycles,
                p.dram_read_bytes,
                p.dram_write_bytes,
            ));
        }
        out.push_str(&format!("  total: {}\n", self.metric));
        out
    }
}

/// An op graph together with its estimated performance.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EstimatedOpGraph {
    pub op_graph: OpGraph,
    pub perf: PerformanceData,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(cycles: u64, bytes: u64, passes: usize) -> PerformanceMetric {
        PerformanceMetric {
            total_cycles: cycles,
            dram_bytes: bytes,
            num_passes: passes,
        }
    }

    #[test]
    fn test_metric_order_is_lexicographic() {
        assert!(metric(10, 1000, 9).is_more_performant_than(&metric(11, 0, 0)));
        assert!(metric(10, 5, 9).is_more_performant_than(&metric(10, 6, 0)));
        assert!(metric(10, 5, 1).is_more_performant_than(&metric(10, 5, 2)));
        assert!(!metric(10, 5, 1).is_more_performant_than(&metric(10, 5, 1)));
    }

    #[test]
    fn test_from_passes_sums() {
        let pass = |i: usize, cycles: u64| PassPerformance {
            pass: i,
            parts: vec![PartId(i)],
            dram_read_bytes: 100,
            dram_write_bytes: 50,
            dma_cycles: cycles,
            mce_cycles: 0,
            ple_cycles: 0,
            total_cycles: cycles,
        };
        let data = PerformanceData::from_passes(vec![pass(0, 10), pass(1, 20)]);
        assert_eq!(data.metric, metric(30, 300, 2));
        assert_eq!(data.passes[0].bottleneck(), "dma");
        let report = data.report();
        assert!(report.contains("pass   1 [P1]"));
        assert!(report.contains("total: 30 cycles"));
    }
}
