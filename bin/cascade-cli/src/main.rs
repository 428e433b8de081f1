// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cascade
//!
//! Command-line interface for the npu-cascade compiler.
//!
//! ## Usage
//! ```bash
//! # Compile a network and print the chosen schedule
//! cascade compile --graph ./net.json --variant tops2 --sram-size 512K
//!
//! # Compare SRAM sizes
//! cascade sweep --graph ./net.json --sram-sizes 256K,512K,1M
//!
//! # Inspect the network, its parts and plan counts
//! cascade inspect --graph ./net.json
//!
//! # List the accelerator presets
//! cascade caps
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cascade",
    about = "Cascading compiler backend for a fixed-function NPU",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file; flags given on the command line win.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a network and report the best combination.
    Compile {
        /// Path to the network description (JSON).
        #[arg(short, long)]
        graph: PathBuf,

        /// Accelerator variant: tops1, tops2, tops4.
        #[arg(long)]
        variant: Option<String>,

        /// SRAM size override (e.g., "384K", "1M").
        #[arg(short, long)]
        sram_size: Option<String>,

        /// Write the compiled network as JSON to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile the same network at several SRAM sizes.
    Sweep {
        /// Path to the network description (JSON).
        #[arg(short, long)]
        graph: PathBuf,

        /// Comma-separated SRAM sizes (e.g., "256K,512K,1M").
        #[arg(long)]
        sram_sizes: String,

        /// Accelerator variant: tops1, tops2, tops4.
        #[arg(long)]
        variant: Option<String>,
    },

    /// Inspect a network: nodes, parts and plan counts.
    Inspect {
        /// Path to the network description (JSON).
        #[arg(short, long)]
        graph: PathBuf,
    },

    /// List the hardware capability presets.
    Caps,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Compile {
            graph,
            variant,
            sram_size,
            output,
        } => commands::compile::execute(cli.config, graph, variant, sram_size, output).await,
        Commands::Sweep {
            graph,
            sram_sizes,
            variant,
        } => commands::sweep::execute(cli.config, graph, sram_sizes, variant).await,
        Commands::Inspect { graph } => commands::inspect::execute(cli.config, graph).await,
        Commands::Caps => commands::caps::execute().await,
    }
}
