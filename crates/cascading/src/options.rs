// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Knobs for plan generation and combination search.

use crate::strategy::{self, StripeStrategy};
use std::sync::Arc;

/// Options consumed by the plan generator.
#[derive(Debug, Clone)]
pub struct CompilationOptions {
    /// Allow SRAM boundaries, i.e. cascading between parts.
    pub enable_cascading: bool,
    /// Generate plans for different parts on the rayon pool.
    pub parallel: bool,
    /// Stripe strategies proposing output stripe shapes.
    pub strategies: Vec<Arc<dyn StripeStrategy>>,
}

impl CompilationOptions {
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            enable_cascading: true,
            parallel: true,
            strategies: strategy::all(),
        }
    }
}

/// How the combiner walks the space of plan assignments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Exhaustive when the space is small enough, beam otherwise.
    #[default]
    Auto,
    /// Depth-first with pruning, capped at `max_combinations` results.
    Exhaustive,
    /// Keeps the best `max_combinations` partial assignments per part.
    Beam,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Auto => "auto",
            SearchMode::Exhaustive => "exhaustive",
            SearchMode::Beam => "beam",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options consumed by the combiner and the estimator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EstimationOptions {
    pub search: SearchMode,
    /// Upper bound on emitted combinations (and beam width).
    pub max_combinations: usize,
    /// Passes with more parts than this are refused by the estimator.
    pub max_pass_length: usize,
}

impl Default for EstimationOptions {
    fn default() -> Self {
        Self {
            search: SearchMode::Auto,
            max_combinations: 1024,
            max_pass_length: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_compilation_options() {
        let o = CompilationOptions::default();
        assert!(o.enable_cascading);
        assert_eq!(
            o.strategy_names(),
            vec!["full-tensor", "split-height", "split-width", "split-depth"]
        );
    }

    #[test]
    fn test_search_mode_serde() {
        let m: SearchMode = serde_json::from_str("\"beam\"").unwrap();
        assert_eq!(m, SearchMode::Beam);
        assert_eq!(SearchMode::default().to_string(), "auto");
    }
}
