// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Debug dumps written next to a compilation.
//!
//! [`DebugContext`] writes into `debug_dir`:
//!
//! | Level  | Files |
//! |--------|-------|
//! | Medium | `plan_counts.txt`, `performance.txt`, `best.json` |
//! | High   | the above plus `combinations/<index>.json` |
//!
//! Dumps are a side channel. A failed write is logged and the compilation
//! goes on with the same result it would have produced without them.

use crate::CompiledNetwork;
use cascading::{Combination, GraphOfParts, OpGraph};
use estimation::PerformanceMetric;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// How much the compiler dumps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DebugLevel {
    #[default]
    None,
    Medium,
    High,
}

/// Outcome of estimating one combination, as recorded in `performance.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimateRecord {
    Estimated(PerformanceMetric),
    Skipped(String),
}

#[derive(serde::Serialize)]
struct CombinationDump<'a> {
    index: usize,
    combination: &'a Combination,
    op_graph: Option<&'a OpGraph>,
}

/// Writes diagnostics for one compilation.
#[derive(Debug, Clone)]
pub struct DebugContext {
    level: DebugLevel,
    dir: PathBuf,
}

impl DebugContext {
    pub fn new(level: DebugLevel, dir: impl Into<PathBuf>) -> Self {
        Self {
            level,
            dir: dir.into(),
        }
    }

    /// A context that never writes.
    pub fn disabled() -> Self {
        Self::new(DebugLevel::None, PathBuf::new())
    }

    pub fn level(&self) -> DebugLevel {
        self.level
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `true` if dumps of `level` are written.
    pub fn enabled(&self, level: DebugLevel) -> bool {
        level != DebugLevel::None && self.level >= level
    }

    /// One line per part: id, nodes and number of plans.
    pub fn write_plan_counts(&self, gop: &GraphOfParts) {
        if !self.enabled(DebugLevel::Medium) {
            return;
        }
        let mut out = String::new();
        for part in &gop.parts {
            let _ = writeln!(out, "{} {}: {} plans", part.id, part.debug_tag, part.num_plans());
        }
        let _ = writeln!(out, "Total: {} plans in {} parts", gop.total_plans(), gop.num_parts());
        self.report(self.write("plan_counts.txt", out.as_bytes()));
    }

    /// One line per combination with its metric or the reason it was
    /// skipped, then the winner.
    pub fn write_performance(&self, records: &[EstimateRecord], best: Option<usize>) {
        if !self.enabled(DebugLevel::Medium) {
            return;
        }
        let mut out = String::new();
        for (index, record) in records.iter().enumerate() {
            match record {
                EstimateRecord::Estimated(metric) => {
                    let _ = writeln!(out, "{index}: {metric}");
                }
                EstimateRecord::Skipped(reason) => {
                    let _ = writeln!(out, "{index}: ERROR {reason}");
                }
            }
        }
        match best {
            Some(index) => {
                let _ = writeln!(out, "Best: {index}");
            }
            None => out.push_str("Best: NONE\n"),
        }
        self.report(self.write("performance.txt", out.as_bytes()));
    }

    pub fn write_combination(&self, index: usize, combination: &Combination, op_graph: Option<&OpGraph>) {
        if !self.enabled(DebugLevel::High) {
            return;
        }
        let dump = CombinationDump {
            index,
            combination,
            op_graph,
        };
        let result = serde_json::to_vec_pretty(&dump)
            .map_err(io::Error::other)
            .and_then(|bytes| self.write(&format!("combinations/{index}.json"), &bytes));
        self.report(result);
    }

    pub fn write_best(&self, network: &CompiledNetwork) {
        if !self.enabled(DebugLevel::Medium) {
            return;
        }
        let result = serde_json::to_vec_pretty(network)
            .map_err(io::Error::other)
            .and_then(|bytes| self.write("best.json", &bytes));
        self.report(result);
    }

    fn write(&self, relative: &str, contents: &[u8]) -> io::Result<()> {
        let path = self.dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        tracing::debug!("wrote {}", path.display());
        Ok(())
    }

    fn report(&self, result: io::Result<()>) {
        if let Err(e) = result {
            tracing::warn!("cannot write diagnostics to '{}': {e}", self.dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(cycles: u64) -> PerformanceMetric {
        PerformanceMetric {
            total_cycles: cycles,
            dram_bytes: 0,
            num_passes: 1,
        }
    }

    #[test]
    fn test_levels() {
        let off = DebugContext::disabled();
        assert!(!off.enabled(DebugLevel::Medium));
        assert!(!off.enabled(DebugLevel::None));

        let medium = DebugContext::new(DebugLevel::Medium, "/tmp");
        assert!(medium.enabled(DebugLevel::Medium));
        assert!(!medium.enabled(DebugLevel::High));

        let high = DebugContext::new(DebugLevel::High, "/tmp");
        assert!(high.enabled(DebugLevel::Medium));
        assert!(high.enabled(DebugLevel::High));
    }

    #[test]
    fn test_performance_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DebugContext::new(DebugLevel::Medium, dir.path());
        ctx.write_performance(
            &[
                EstimateRecord::Estimated(metric(10)),
                EstimateRecord::Skipped("too long".into()),
            ],
            Some(0),
        );
        let text = fs::read_to_string(dir.path().join("performance.txt")).unwrap();
        assert!(text.starts_with("0: 10 cycles"));
        assert!(text.contains("1: ERROR too long"));
        assert!(text.ends_with("Best: 0\n"));
    }

    #[test]
    fn test_no_best_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DebugContext::new(DebugLevel::Medium, dir.path());
        ctx.write_performance(&[EstimateRecord::Skipped("nope".into())], None);
        let text = fs::read_to_string(dir.path().join("performance.txt")).unwrap();
        assert!(text.ends_with("Best: NONE\n"));
    }

    #[test]
    fn test_combination_dump_needs_high() {
        let dir = tempfile::tempdir().unwrap();
        let medium = DebugContext::new(DebugLevel::Medium, dir.path());
        medium.write_combination(0, &Combination::empty(), None);
        assert!(!dir.path().join("combinations").exists());

        let high = DebugContext::new(DebugLevel::High, dir.path());
        high.write_combination(3, &Combination::empty(), Some(&OpGraph::default()));
        let json = fs::read_to_string(dir.path().join("combinations/3.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["index"], 3);
        assert!(value["op_graph"]["passes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = DebugContext::new(DebugLevel::None, dir.path());
        ctx.write_plan_counts(&GraphOfParts::default());
        ctx.write_performance(&[], None);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_dir_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, b"x").unwrap();
        let ctx = DebugContext::new(DebugLevel::Medium, &file);
        ctx.write_plan_counts(&GraphOfParts::default());
        assert!(file.is_file());
    }
}
