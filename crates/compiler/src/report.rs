// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The result of a compilation and the statistics of how it was found.

use cascading::{Combination, GraphOfParts, SearchMode};
use estimation::{EstimatedOpGraph, PerformanceData};
use std::time::Duration;

/// Counters and phase timings for one compilation.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SearchStats {
    pub num_parts: usize,
    pub total_plans: usize,
    /// The walk the combiner actually used.
    pub search: SearchMode,
    pub num_combinations: usize,
    pub num_estimated: usize,
    /// Combinations the estimator refused.
    pub num_skipped: usize,
    pub partition_duration: Duration,
    pub plan_duration: Duration,
    pub combine_duration: Duration,
    pub estimate_duration: Duration,
}

impl SearchStats {
    pub fn total_duration(&self) -> Duration {
        self.partition_duration + self.plan_duration + self.combine_duration + self.estimate_duration
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        format!(
            "Search: {} parts, {} plans, {} combinations ({}), {} estimated, {} skipped, \
             {:.2}ms total (partition {:.2}ms, plans {:.2}ms, combine {:.2}ms, estimate {:.2}ms)",
            self.num_parts,
            self.total_plans,
            self.num_combinations,
            self.search,
            self.num_estimated,
            self.num_skipped,
            ms(self.total_duration()),
            ms(self.partition_duration),
            ms(self.plan_duration),
            ms(self.combine_duration),
            ms(self.estimate_duration),
        )
    }
}

/// The best combination of a network, lowered and estimated.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CompiledNetwork {
    pub graph_of_parts: GraphOfParts,
    /// Position of `combination` in the combiner's output.
    pub best_index: usize,
    pub combination: Combination,
    pub estimated: EstimatedOpGraph,
    pub stats: SearchStats,
}

impl CompiledNetwork {
    pub fn performance(&self) -> &PerformanceData {
        &self.estimated.perf
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Compiled: combination {} of {}, {} parts in {} passes ({} cascades), {} ops, {}",
            self.best_index,
            self.stats.num_combinations,
            self.graph_of_parts.num_parts(),
            self.estimated.op_graph.num_passes(),
            self.combination.num_cascades(),
            self.estimated.op_graph.num_ops(),
            self.performance().metric,
        )
    }
}
