// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compiler configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! variant = "tops2"
//! sram_size = "512K"
//! strategies = ["full-tensor", "split-height", "split-width", "split-depth"]
//! enable_cascading = true
//! search = "auto"
//! max_combinations = 1024
//! max_pass_length = 8
//! parallel = true
//! debug_level = "none"
//! debug_dir = "./cascade-debug"
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above,
//! except `sram_size` which defaults to the variant's preset.

use crate::diagnostics::DebugLevel;
use crate::CompilerError;
use cascading::{
    strategy, CompilationOptions, EstimationOptions, HardwareCapabilities, NpuVariant,
    SearchMode, StripeStrategy,
};
use sram_allocator::MemoryBudget;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_STRATEGIES: [&str; 4] = ["full-tensor", "split-height", "split-width", "split-depth"];

/// Configuration for one compilation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompilerConfig {
    /// Accelerator preset: `"tops1"`, `"tops2"`, `"tops4"`.
    #[serde(default)]
    pub variant: NpuVariant,
    /// Overrides the preset SRAM size (human-readable, e.g. `"384K"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sram_size: Option<String>,
    /// Stripe strategy names, in the order plans are generated.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<String>,
    /// Allow parts to hand tensors over in SRAM.
    #[serde(default = "default_true")]
    pub enable_cascading: bool,
    #[serde(default)]
    pub search: SearchMode,
    #[serde(default = "default_max_combinations")]
    pub max_combinations: usize,
    #[serde(default = "default_max_pass_length")]
    pub max_pass_length: usize,
    /// Use the rayon pool for plan generation and estimation.
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub debug_level: DebugLevel,
    /// Where diagnostics are written when `debug_level` is not `none`.
    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_strategies() -> Vec<String> {
    DEFAULT_STRATEGIES.iter().map(|s| s.to_string()).collect()
}

fn default_max_combinations() -> usize {
    EstimationOptions::default().max_combinations
}

fn default_max_pass_length() -> usize {
    EstimationOptions::default().max_pass_length
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("./cascade-debug")
}

impl CompilerConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CompilerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompilerError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, CompilerError> {
        toml::from_str(toml_str)
            .map_err(|e| CompilerError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, CompilerError> {
        toml::to_string_pretty(self)
            .map_err(|e| CompilerError::Config(format!("TOML serialise error: {e}")))
    }

    /// Resolves the hardware capabilities: the variant preset, with the
    /// SRAM size overridden when `sram_size` is set.
    pub fn capabilities(&self) -> Result<HardwareCapabilities, CompilerError> {
        let mut caps = self.variant.capabilities();
        if let Some(size) = &self.sram_size {
            let budget = MemoryBudget::parse(size)
                .map_err(|e| CompilerError::Config(format!("invalid sram_size '{size}': {e}")))?;
            caps = caps.with_sram(budget);
        }
        caps.validate().map_err(CompilerError::Config)?;
        Ok(caps)
    }

    /// Creates the stripe strategies named by this config.
    pub fn create_strategies(&self) -> Result<Vec<Arc<dyn StripeStrategy>>, CompilerError> {
        if self.strategies.is_empty() {
            return Err(CompilerError::Config("no stripe strategies configured".into()));
        }
        self.strategies
            .iter()
            .map(|name| {
                strategy::by_name(name).ok_or_else(|| {
                    CompilerError::Config(format!(
                        "unknown strategy '{name}'; expected one of {}",
                        DEFAULT_STRATEGIES.join(", ")
                    ))
                })
            })
            .collect()
    }

    pub fn compilation_options(&self) -> Result<CompilationOptions, CompilerError> {
        Ok(CompilationOptions {
            enable_cascading: self.enable_cascading,
            parallel: self.parallel,
            strategies: self.create_strategies()?,
        })
    }

    pub fn estimation_options(&self) -> EstimationOptions {
        EstimationOptions {
            search: self.search,
            max_combinations: self.max_combinations,
            max_pass_length: self.max_pass_length,
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            variant: NpuVariant::default(),
            sram_size: None,
            strategies: default_strategies(),
            enable_cascading: true,
            search: SearchMode::default(),
            max_combinations: default_max_combinations(),
            max_pass_length: default_max_pass_length(),
            parallel: true,
            debug_level: DebugLevel::None,
            debug_dir: default_debug_dir(),
        }
    }
}
