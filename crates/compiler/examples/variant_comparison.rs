// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Compare accelerator variants and SRAM sizes on a small network.
//!
//! Larger SRAM admits more cascades, which shows up as fewer passes and
//! less DRAM traffic in the chosen combination.
//!
//! ```bash
//! cargo run -p compiler --example variant_comparison
//! ```

use cascading::NpuVariant;
use compiler::{compile, CompilerConfig};
use network_ir::{graph::Validated, Graph, GraphBuilder, GraphError, MceOp, PleKind, PostProcessKind};
use tensor_core::TensorInfo;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let graph = build_graph("conv-stack", 3)?;
    println!("Network: {}\n", graph.summary());

    println!(
        "{:<8} {:>8} {:>12} {:>8} {:>10} {:>12}",
        "Variant", "SRAM", "Combinations", "Passes", "Cycles", "DRAM bytes",
    );
    println!("{}", "-".repeat(64));

    for variant in NpuVariant::ALL {
        for sram in ["128K", "256K", "512K"] {
            let config = CompilerConfig {
                variant,
                sram_size: Some(sram.to_string()),
                ..Default::default()
            };
            match compile(&graph, &config) {
                Ok(network) => {
                    let metric = network.performance().metric;
                    println!(
                        "{:<8} {:>8} {:>12} {:>8} {:>10} {:>12}",
                        variant.as_str(),
                        sram,
                        network.stats.num_combinations,
                        metric.num_passes,
                        metric.total_cycles,
                        metric.dram_bytes,
                    );
                }
                Err(e) => {
                    println!("{:<8} {:>8} FAIL: {e}", variant.as_str(), sram);
                }
            }
        }
    }

    println!("\n--- Best schedule on the default variant ---\n");
    let network = compile(&graph, &CompilerConfig::default())?;
    println!("{}", network.summary());
    print!("{}", network.performance().report());
    println!("{}", network.stats.summary());

    Ok(())
}

fn build_graph(name: &str, blocks: usize) -> Result<Graph<Validated>, GraphError> {
    let mut b = GraphBuilder::new(name);
    let mut h = 56;
    let mut prev = b.input("in", TensorInfo::nhwc_u8(1, h, h, 16));
    for i in 0..blocks {
        let conv = b.mce(
            &format!("conv{i}"),
            MceOp::convolution([3, 3], [1, 1]),
            prev,
            TensorInfo::nhwc_u8(1, h, h, 32),
        );
        let relu = b.post_process(&format!("relu{i}"), PostProcessKind::Relu, conv);
        h /= 2;
        prev = b.ple(
            &format!("pool{i}"),
            PleKind::MaxPool { size: 2, stride: 2 },
            &[relu],
            TensorInfo::nhwc_u8(1, h, h, 32),
        );
    }
    b.output("out", prev);
    b.build().validate()
}
