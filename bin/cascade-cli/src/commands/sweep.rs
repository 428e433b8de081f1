// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cascade sweep` command: compile one network at several SRAM sizes.
//!
//! Prints one row per size with the search statistics and the estimate of
//! the chosen combination, then the size that gave the best estimate.

use super::{compile_cancellable, load_graph, resolve_config};
use estimation::PerformanceMetric;
use sram_allocator::MemoryBudget;
use std::path::PathBuf;

/// One successful compilation in the sweep.
struct SweepResult {
    sram: MemoryBudget,
    metric: PerformanceMetric,
    cascades: usize,
}

pub async fn execute(
    config_path: Option<PathBuf>,
    graph_path: PathBuf,
    sram_sizes: String,
    variant: Option<String>,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║               cascade · SRAM Sweep                  ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // Parse comma-separated SRAM sizes.
    let sizes: Vec<MemoryBudget> = sram_sizes
        .split(',')
        .map(|s| {
            MemoryBudget::parse(s.trim())
                .map_err(|e| anyhow::anyhow!("invalid SRAM size '{}': {e}", s.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let base = resolve_config(config_path, variant, None)?;
    let graph = load_graph(&graph_path)?;

    println!("  Network: {}", graph.summary());
    println!("  Variant: {}", base.variant);
    println!(
        "  Sizes:   {:?}",
        sizes.iter().map(|b| b.to_string()).collect::<Vec<_>>(),
    );
    println!();

    // ── Results Table ──────────────────────────────────────────
    println!(
        "  {:>9} {:>7} {:>7} {:>8} {:>8} {:>7} {:>12} {:>12}",
        "SRAM", "Plans", "Combos", "Skipped", "Cascades", "Passes", "Cycles", "DRAM bytes",
    );
    println!("  {}", "-".repeat(80));

    let mut results: Vec<SweepResult> = Vec::new();
    for &sram in &sizes {
        let mut config = base.clone();
        config.sram_size = Some(format!("{}", sram.as_bytes()));

        match compile_cancellable(graph.clone(), config).await {
            Ok(network) => {
                let metric = network.performance().metric;
                println!(
                    "  {:>9} {:>7} {:>7} {:>8} {:>8} {:>7} {:>12} {:>12}",
                    sram.to_string(),
                    network.stats.total_plans,
                    network.stats.num_combinations,
                    network.stats.num_skipped,
                    network.combination.num_cascades(),
                    metric.num_passes,
                    metric.total_cycles,
                    metric.dram_bytes,
                );
                results.push(SweepResult {
                    sram,
                    metric,
                    cascades: network.combination.num_cascades(),
                });
            }
            Err(e) => {
                tracing::warn!("compilation at {sram} SRAM failed: {e}");
                println!("  {:>9}     FAILED: {e}", sram.to_string());
            }
        }
    }
    println!();

    // ── Summary ────────────────────────────────────────────────
    // Ties go to the smaller SRAM size, which comes first.
    let mut best: Option<&SweepResult> = None;
    for r in &results {
        if best.map_or(true, |b| r.metric.is_more_performant_than(&b.metric)) {
            best = Some(r);
        }
    }
    match best {
        Some(b) => println!(
            "  Best: {} SRAM, {} cascades, {}",
            b.sram, b.cascades, b.metric
        ),
        None => println!("  No SRAM size compiled successfully."),
    }
    println!();

    Ok(())
}
