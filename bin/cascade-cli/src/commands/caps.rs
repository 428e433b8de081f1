// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cascade caps` command: list the accelerator presets.

use cascading::NpuVariant;

pub async fn execute() -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            cascade · Hardware Presets               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    println!(
        "  {:<8} {:>10} {:>5} {:>10} {:>10} {:>10} {:>7}",
        "Variant", "SRAM", "CEs", "MACs/cyc", "PLE/cyc", "DRAM B/cyc", "Align",
    );
    println!("  {}", "-".repeat(68));
    for variant in NpuVariant::ALL {
        let caps = variant.capabilities();
        println!(
            "  {:<8} {:>10} {:>5} {:>10} {:>10} {:>10} {:>7}",
            variant.as_str(),
            caps.sram_budget().to_string(),
            caps.num_ces,
            caps.macs_per_cycle(),
            caps.ple_elements_per_cycle,
            caps.dram_bytes_per_cycle,
            caps.sram_alignment,
        );
    }
    println!();

    let caps = NpuVariant::default().capabilities();
    println!("  Overheads (all variants):");
    println!("   Stripe:      {} cycles", caps.stripe_overhead_cycles);
    println!("   Pass setup:  {} cycles", caps.pass_setup_cycles);
    println!("   NHWC DMA:    +{}%", caps.nhwc_dma_penalty_percent);
    println!();
    println!("  Default variant: {}", NpuVariant::default());
    println!();

    Ok(())
}
