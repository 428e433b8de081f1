// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cascade compile` command: compile a network and print the best schedule.
//!
//! Runs the full type-state pipeline:
//! ```text
//! Compilation<Idle> → partition → create_plans → combine → estimate
//! ```

use super::{compile_cancellable, load_graph, resolve_config, truncate};
use anyhow::Context as _;
use std::path::PathBuf;

pub async fn execute(
    config_path: Option<PathBuf>,
    graph_path: PathBuf,
    variant: Option<String>,
    sram_size: Option<String>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              cascade · Network Compiler             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    let config = resolve_config(config_path, variant, sram_size)?;
    let caps = config.capabilities()?;
    let graph = load_graph(&graph_path)?;

    println!("  Config:");
    println!("   Network:    {}", graph_path.display());
    println!("   Hardware:   {}", caps.summary());
    println!("   Strategies: {}", config.strategies.join(", "));
    println!(
        "   Search:     {} (max {} combinations), cascading {}",
        config.search,
        config.max_combinations,
        if config.enable_cascading { "on" } else { "off" },
    );
    println!();
    println!("  {}", graph.summary());
    println!();

    // ── Compile ────────────────────────────────────────────────
    println!("  Compiling...");
    let network = compile_cancellable(graph, config).await?;
    println!("   {}", network.summary());
    println!("   {}", network.stats.summary());
    println!();

    // ── Chosen plans ───────────────────────────────────────────
    println!(
        "  {:<5} {:<28} {:<14} {:>10} {:>10}",
        "Part", "Nodes", "Strategy", "SRAM", "DRAM",
    );
    println!("  {}", "-".repeat(71));
    for part in &network.graph_of_parts.parts {
        match network.combination.plan_for(&network.graph_of_parts, part.id) {
            Some(plan) => println!(
                "  {:<5} {:<28} {:<14} {:>8} B {:>8} B",
                part.id.to_string(),
                truncate(&part.debug_tag, 28),
                plan.strategy,
                plan.sram_bytes(),
                plan.dram_bytes(),
            ),
            None => println!("  {:<5} {:<28} <no plan>", part.id.to_string(), truncate(&part.debug_tag, 28)),
        }
    }
    println!();

    // ── Per-pass estimate ──────────────────────────────────────
    println!("  Passes:");
    print!("{}", network.performance().report());
    println!();

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&network)?;
        std::fs::write(&path, json)
            .with_context(|| format!("cannot write '{}'", path.display()))?;
        println!("  Wrote compiled network to {}", path.display());
        println!();
    }

    Ok(())
}
