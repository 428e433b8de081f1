// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommands and the helpers they share.

pub mod caps;
pub mod compile;
pub mod inspect;
pub mod sweep;

use anyhow::Context as _;
use cascading::{CancellationToken, NpuVariant};
use compiler::{Compilation, CompiledNetwork, CompilerConfig, CompilerError};
use network_ir::{graph::Validated, Graph, GraphLoader};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_graph(path: &Path) -> anyhow::Result<Graph<Validated>> {
    GraphLoader::from_file(path)
        .with_context(|| format!("failed to load network from '{}'", path.display()))
}

/// The config file (or defaults) with command-line overrides applied.
pub fn resolve_config(
    path: Option<PathBuf>,
    variant: Option<String>,
    sram_size: Option<String>,
) -> anyhow::Result<CompilerConfig> {
    let mut config = match path {
        Some(path) => CompilerConfig::from_file(&path)?,
        None => CompilerConfig::default(),
    };
    if let Some(variant) = variant {
        config.variant = variant.parse::<NpuVariant>().map_err(anyhow::Error::msg)?;
    }
    if sram_size.is_some() {
        config.sram_size = sram_size;
    }
    tracing::debug!(
        "resolved config: variant {}, sram {}",
        config.variant,
        config.sram_size.as_deref().unwrap_or("preset"),
    );
    Ok(config)
}

/// Compiles on a blocking thread; Ctrl-C cancels the compilation.
pub async fn compile_cancellable(
    graph: Graph<Validated>,
    config: CompilerConfig,
) -> anyhow::Result<CompiledNetwork> {
    let token = CancellationToken::new();
    let worker_token = token.clone();
    let mut task = tokio::task::spawn_blocking(move || -> Result<CompiledNetwork, CompilerError> {
        Compilation::new(config)?
            .with_cancellation(worker_token)
            .partition(&graph)?
            .create_plans()?
            .combine()?
            .estimate()
    });

    tokio::select! {
        joined = &mut task => Ok(joined??),
        _ = tokio::signal::ctrl_c() => {
            eprintln!("  Interrupted, cancelling compilation...");
            tracing::warn!("ctrl-c received, cancelling compilation");
            token.cancel();
            Ok(task.await??)
        }
    }
}

/// Truncates a string to `max_len` with ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("conv", 10), "conv");
        assert_eq!(truncate("conv+relu+pool", 10), "conv+re...");
    }

    #[test]
    fn test_resolve_config_overrides() {
        let c = resolve_config(None, Some("tops4".into()), Some("2M".into())).unwrap();
        assert_eq!(c.variant, NpuVariant::Tops4);
        assert_eq!(c.sram_size.as_deref(), Some("2M"));
        assert!(resolve_config(None, Some("tops9".into()), None).is_err());
    }
}
