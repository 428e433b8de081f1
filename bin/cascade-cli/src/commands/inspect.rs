// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cascade inspect` command: display network structure, parts and plans.
//!
//! Partitions the network and generates plans without searching, so it
//! answers "how big is the search" before paying for it.

use super::{load_graph, resolve_config, truncate};
use compiler::Compilation;
use std::path::PathBuf;

pub async fn execute(config_path: Option<PathBuf>, graph_path: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             cascade · Network Inspector             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let config = resolve_config(config_path, None, None)?;
    let graph = load_graph(&graph_path)?;

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", graph.summary());
    println!();

    // ── Per-Node Detail ────────────────────────────────────────
    println!(
        "  {:<4} {:<24} {:<13} {:<12} {:<22} {:>9}",
        "Id", "Name", "Kind", "Inputs", "Output", "Consumers",
    );
    println!("  {}", "-".repeat(89));
    for &id in graph.nodes_sorted() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let inputs: Vec<String> = node.inputs.iter().map(|e| e.source.to_string()).collect();
        let output = node
            .outputs
            .first()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<4} {:<24} {:<13} {:<12} {:<22} {:>9}",
            id.to_string(),
            truncate(&node.name, 24),
            node.kind.as_str(),
            truncate(&inputs.join(","), 12),
            truncate(&output, 22),
            graph.num_consumers(id),
        );
    }
    println!();

    // ── Parts and Plans ────────────────────────────────────────
    let caps = config.capabilities()?;
    let planned = Compilation::new(config)?.partition(&graph)?.create_plans()?;
    let gop = planned.graph_of_parts();

    println!("  Parts on {}:", caps.summary());
    println!(
        "  {:<5} {:<32} {:>6} {:>7} {:>12}",
        "Part", "Nodes", "Inputs", "Plans", "Min SRAM",
    );
    println!("  {}", "-".repeat(66));
    for part in &gop.parts {
        let min_sram = part
            .plans
            .iter()
            .map(|p| p.sram_bytes())
            .min()
            .map(|b| format!("{b} B"))
            .unwrap_or_else(|| "-".into());
        println!(
            "  {:<5} {:<32} {:>6} {:>7} {:>12}",
            part.id.to_string(),
            truncate(&part.debug_tag, 32),
            part.inputs.len(),
            part.num_plans(),
            min_sram,
        );
    }
    println!();
    println!("  {}", gop.summary());
    println!(
        "  Search space: {} combinations (limit {})",
        gop.search_space(),
        planned.config().max_combinations,
    );
    if let Some(part) = gop.parts.iter().find(|p| p.plans.is_empty()) {
        println!(
            "  Warning: {} ({}) has no plan that fits; compilation will fail.",
            part.id, part.debug_tag
        );
    }
    println!();

    Ok(())
}
