// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hardware capability description of the target accelerator.
//!
//! Everything the planner, combiner and estimator know about the hardware
//! lives in [`HardwareCapabilities`]. Named presets are provided through
//! [`NpuVariant`]; individual fields can be overridden afterwards (the CLI
//! uses this for SRAM sweeps).

use sram_allocator::MemoryBudget;
use std::fmt;
use std::str::FromStr;

/// Accelerator configurations with known capability presets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NpuVariant {
    Tops1,
    #[default]
    Tops2,
    Tops4,
}

impl NpuVariant {
    pub const ALL: [NpuVariant; 3] = [NpuVariant::Tops1, NpuVariant::Tops2, NpuVariant::Tops4];

    pub fn as_str(self) -> &'static str {
        match self {
            NpuVariant::Tops1 => "tops1",
            NpuVariant::Tops2 => "tops2",
            NpuVariant::Tops4 => "tops4",
        }
    }

    /// Returns the capability preset for this variant.
    pub fn capabilities(self) -> HardwareCapabilities {
        let (sram_kb, num_ces, ple_elements_per_cycle, dram_bytes_per_cycle) = match self {
            NpuVariant::Tops1 => (256, 4, 32, 16),
            NpuVariant::Tops2 => (512, 8, 64, 16),
            NpuVariant::Tops4 => (1024, 16, 128, 32),
        };
        HardwareCapabilities {
            variant: self,
            total_sram_bytes: MemoryBudget::from_kb(sram_kb).as_bytes(),
            num_ces,
            macs_per_ce_per_cycle: 128,
            ple_elements_per_cycle,
            dram_bytes_per_cycle,
            sram_alignment: 16,
            stripe_overhead_cycles: 64,
            pass_setup_cycles: 512,
            nhwc_dma_penalty_percent: 200,
        }
    }
}

impl fmt::Display for NpuVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NpuVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tops1" | "1tops" => Ok(NpuVariant::Tops1),
            "tops2" | "2tops" => Ok(NpuVariant::Tops2),
            "tops4" | "4tops" => Ok(NpuVariant::Tops4),
            other => Err(format!(
                "unknown NPU variant '{other}'; expected 'tops1', 'tops2', or 'tops4'"
            )),
        }
    }
}

/// What the accelerator can do, in the units the cost model works with.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HardwareCapabilities {
    /// Preset this description started from.
    pub variant: NpuVariant,
    /// On-chip SRAM shared by all buffers of one pass.
    pub total_sram_bytes: usize,
    /// Number of compute engines.
    pub num_ces: usize,
    pub macs_per_ce_per_cycle: usize,
    pub ple_elements_per_cycle: usize,
    pub dram_bytes_per_cycle: usize,
    /// Every SRAM buffer is rounded up to this many bytes.
    pub sram_alignment: usize,
    /// Fixed cost per processed stripe on the MCE or PLE.
    pub stripe_overhead_cycles: u64,
    /// Fixed cost to launch one pass.
    pub pass_setup_cycles: u64,
    /// Extra DMA cost of NHWC transfers, as a percentage of their size.
    pub nhwc_dma_penalty_percent: u64,
}

impl HardwareCapabilities {
    /// Returns a copy with a different SRAM size.
    pub fn with_sram(mut self, budget: MemoryBudget) -> Self {
        self.total_sram_bytes = budget.as_bytes();
        self
    }

    pub fn sram_budget(&self) -> MemoryBudget {
        MemoryBudget::from_bytes(self.total_sram_bytes)
    }

    /// Peak multiply-accumulates per cycle across all compute engines.
    pub fn macs_per_cycle(&self) -> u64 {
        (self.num_ces * self.macs_per_ce_per_cycle) as u64
    }

    /// Rounds a buffer size up to the SRAM alignment.
    pub fn align(&self, bytes: usize) -> usize {
        tensor_core::round_up(bytes, self.sram_alignment.max(1))
    }

    /// Checks that every throughput figure is usable as a divisor.
    pub fn validate(&self) -> Result<(), String> {
        let checks = [
            ("total_sram_bytes", self.total_sram_bytes),
            ("num_ces", self.num_ces),
            ("macs_per_ce_per_cycle", self.macs_per_ce_per_cycle),
            ("ple_elements_per_cycle", self.ple_elements_per_cycle),
            ("dram_bytes_per_cycle", self.dram_bytes_per_cycle),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(format!("hardware capability '{name}' must be non-zero"));
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} SRAM, {} CEs x {} MACs/cycle, PLE {} elem/cycle, DRAM {} B/cycle",
            self.variant,
            self.sram_budget(),
            self.num_ces,
            self.macs_per_ce_per_cycle,
            self.ple_elements_per_cycle,
            self.dram_bytes_per_cycle,
        )
    }
}

impl Default for HardwareCapabilities {
    fn default() -> Self {
        NpuVariant::default().capabilities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_scale() {
        let small = NpuVariant::Tops1.capabilities();
        let large = NpuVariant::Tops4.capabilities();
        assert!(small.total_sram_bytes < large.total_sram_bytes);
        assert!(small.macs_per_cycle() < large.macs_per_cycle());
        for v in NpuVariant::ALL {
            v.capabilities().validate().unwrap();
        }
    }

    #[test]
    fn test_parse_variant() {
        assert_eq!("TOPS4".parse::<NpuVariant>().unwrap(), NpuVariant::Tops4);
        assert_eq!("2tops".parse::<NpuVariant>().unwrap(), NpuVariant::Tops2);
        assert!("tops8".parse::<NpuVariant>().is_err());
    }

    #[test]
    fn test_with_sram_and_align() {
        let caps = HardwareCapabilities::default().with_sram(MemoryBudget::from_kb(128));
        assert_eq!(caps.total_sram_bytes, 128 * 1024);
        assert_eq!(caps.align(17), 32);
        assert_eq!(caps.align(32), 32);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let caps = HardwareCapabilities {
            dram_bytes_per_cycle: 0,
            ..Default::default()
        };
        assert!(caps.validate().unwrap_err().contains("dram_bytes_per_cycle"));
    }

    #[test]
    fn test_summary() {
        let s = NpuVariant::Tops2.capabilities().summary();
        assert!(s.starts_with("tops2"));
        assert!(s.contains("512 KB"));
    }
}
