// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The compilation pipeline with type-state–enforced phase ordering.
//!
//! ```text
//! Compilation<Idle>
//!     │  .partition(&graph)
//!     ▼
//! Compilation<Partitioned>
//!     │  .create_plans()
//!     ▼
//! Compilation<Planned>
//!     │  .combine()
//!     ▼
//! Compilation<Combined>
//!     │  .estimate()
//!     ▼
//!   CompiledNetwork
//! ```
//!
//! Each transition consumes the old value and returns a new one. The data
//! a phase produces lives in the state type itself, so a later phase can
//! only be reached once it exists.

use crate::diagnostics::{DebugContext, EstimateRecord};
use crate::{CompiledNetwork, CompilerConfig, CompilerError, SearchStats};
use cascading::{
    CancellationToken, Combination, CompilationOptions, EstimationOptions, GraphOfParts,
    HardwareCapabilities,
};
use estimation::{estimate_combination, EstimatedOpGraph, EstimationError, PerformanceMetric};
use network_ir::{graph::Validated, Graph};
use rayon::prelude::*;
use std::time::Instant;

// ── Type-state markers ─────────────────────────────────────────

/// Configuration is resolved; nothing has been compiled yet.
#[derive(Debug)]
pub struct Idle;

/// The graph is split into parts.
#[derive(Debug)]
pub struct Partitioned {
    graph: Graph<Validated>,
    gop: GraphOfParts,
}

/// Every part holds its candidate plans.
#[derive(Debug)]
pub struct Planned {
    gop: GraphOfParts,
}

/// The valid combinations of plans are known.
#[derive(Debug)]
pub struct Combined {
    gop: GraphOfParts,
    combinations: Vec<Combination>,
}

/// Sealed trait for compilation states.
pub trait CompilationState: std::fmt::Debug {}
impl CompilationState for Idle {}
impl CompilationState for Partitioned {}
impl CompilationState for Planned {}
impl CompilationState for Combined {}

// ── Best-combination selection ─────────────────────────────────

/// Keeps the most performant candidate offered so far.
///
/// The first candidate becomes the best. A later one replaces it only when
/// it is strictly more performant, so among equals the earliest wins.
#[derive(Debug)]
pub struct BestSelector<T> {
    best: Option<(usize, PerformanceMetric, T)>,
}

impl<T> Default for BestSelector<T> {
    fn default() -> Self {
        Self { best: None }
    }
}

impl<T> BestSelector<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers candidate `index`; returns `true` if it is the new best.
    pub fn offer(&mut self, index: usize, metric: PerformanceMetric, candidate: T) -> bool {
        let better = match &self.best {
            None => true,
            Some((_, best, _)) => metric.is_more_performant_than(best),
        };
        if better {
            self.best = Some((index, metric, candidate));
        }
        better
    }

    pub fn best_index(&self) -> Option<usize> {
        self.best.as_ref().map(|(index, _, _)| *index)
    }

    pub fn best_metric(&self) -> Option<&PerformanceMetric> {
        self.best.as_ref().map(|(_, metric, _)| metric)
    }

    pub fn into_best(self) -> Option<(usize, T)> {
        self.best.map(|(index, _, candidate)| (index, candidate))
    }
}

// ── Compilation ────────────────────────────────────────────────

/// What every phase needs, resolved once from the config.
#[derive(Debug)]
struct Context {
    config: CompilerConfig,
    caps: HardwareCapabilities,
    options: CompilationOptions,
    estimation: EstimationOptions,
    cancel: CancellationToken,
    debug: DebugContext,
    stats: SearchStats,
}

impl Context {
    fn check_cancelled(&self) -> Result<(), CompilerError> {
        self.cancel.check().map_err(CompilerError::from_cascading)
    }
}

/// One compilation of one network.
///
/// `S` is a type-state marker that enforces the phase ordering at compile
/// time: plans cannot be created before partitioning, nor combinations
/// estimated before the search ran.
///
/// # Example
/// ```
/// use compiler::{Compilation, CompilerConfig};
/// use network_ir::{GraphBuilder, MceOp, PostProcessKind};
/// use tensor_core::TensorInfo;
///
/// let mut b = GraphBuilder::new("doc");
/// let input = b.input("in", TensorInfo::nhwc_u8(1, 16, 16, 16));
/// let conv = b.mce("conv", MceOp::convolution([1, 1], [1, 1]), input, TensorInfo::nhwc_u8(1, 16, 16, 16));
/// let relu = b.post_process("relu", PostProcessKind::Relu, conv);
/// b.output("out", relu);
/// let graph = b.build().validate().unwrap();
///
/// let network = Compilation::new(CompilerConfig::default())
///     .unwrap()
///     .partition(&graph)
///     .unwrap()
///     .create_plans()
///     .unwrap()
///     .combine()
///     .unwrap()
///     .estimate()
///     .unwrap();
/// assert_eq!(network.graph_of_parts.num_parts(), 3);
/// ```
pub struct Compilation<S: CompilationState = Idle> {
    ctx: Context,
    state: S,
}

impl<S: CompilationState> Compilation<S> {
    pub fn config(&self) -> &CompilerConfig {
        &self.ctx.config
    }

    pub fn capabilities(&self) -> &HardwareCapabilities {
        &self.ctx.caps
    }

    pub fn stats(&self) -> &SearchStats {
        &self.ctx.stats
    }
}

// ── Idle → Partitioned ─────────────────────────────────────────

impl Compilation<Idle> {
    /// Resolves capabilities, strategies and options from `config`.
    pub fn new(config: CompilerConfig) -> Result<Self, CompilerError> {
        let caps = config.capabilities()?;
        let options = config.compilation_options()?;
        let estimation = config.estimation_options();
        let debug = DebugContext::new(config.debug_level, config.debug_dir.clone());
        tracing::info!(
            "compilation for {} with strategies {:?}, cascading {}",
            caps.summary(),
            options.strategy_names(),
            if options.enable_cascading { "on" } else { "off" },
        );
        Ok(Self {
            ctx: Context {
                config,
                caps,
                options,
                estimation,
                cancel: CancellationToken::new(),
                debug,
                stats: SearchStats::default(),
            },
            state: Idle,
        })
    }

    /// Makes the compilation observe `token`; cancelling it stops the
    /// compilation at the next phase or combination boundary.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.ctx.cancel = token;
        self
    }

    /// Splits `graph` into parts.
    pub fn partition(
        self,
        graph: &Graph<Validated>,
    ) -> Result<Compilation<Partitioned>, CompilerError> {
        let mut ctx = self.ctx;
        ctx.check_cancelled()?;
        let started = Instant::now();
        let gop = cascading::create_graph_of_parts(graph).map_err(CompilerError::from_cascading)?;
        ctx.stats.num_parts = gop.num_parts();
        ctx.stats.partition_duration = started.elapsed();

        Ok(Compilation {
            ctx,
            state: Partitioned {
                graph: graph.clone(),
                gop,
            },
        })
    }
}

// ── Partitioned → Planned ──────────────────────────────────────

impl Compilation<Partitioned> {
    pub fn graph_of_parts(&self) -> &GraphOfParts {
        &self.state.gop
    }

    /// Generates the candidate plans of every part.
    pub fn create_plans(self) -> Result<Compilation<Planned>, CompilerError> {
        let Compilation {
            mut ctx,
            state: Partitioned { graph, mut gop },
        } = self;
        ctx.check_cancelled()?;
        let started = Instant::now();
        cascading::create_plans(&mut gop, &graph, &ctx.caps, &ctx.options)
            .map_err(CompilerError::from_cascading)?;

        ctx.stats.total_plans = gop.total_plans();
        ctx.stats.plan_duration = started.elapsed();
        tracing::info!(
            "{} plans across {} parts, search space {}",
            gop.total_plans(),
            gop.num_parts(),
            gop.search_space(),
        );
        ctx.debug.write_plan_counts(&gop);

        Ok(Compilation {
            ctx,
            state: Planned { gop },
        })
    }
}

// ── Planned → Combined ─────────────────────────────────────────

impl Compilation<Planned> {
    pub fn graph_of_parts(&self) -> &GraphOfParts {
        &self.state.gop
    }

    /// Searches for every valid combination of plans.
    pub fn combine(self) -> Result<Compilation<Combined>, CompilerError> {
        let Compilation {
            mut ctx,
            state: Planned { gop },
        } = self;
        ctx.check_cancelled()?;
        let started = Instant::now();
        ctx.stats.search = cascading::resolve_search_mode(&gop, &ctx.estimation);
        let combinations = cascading::combine(&gop, &ctx.caps, &ctx.estimation, &ctx.cancel)
            .map_err(CompilerError::from_cascading)?;

        ctx.stats.num_combinations = combinations.len();
        ctx.stats.combine_duration = started.elapsed();
        Ok(Compilation {
            ctx,
            state: Combined { gop, combinations },
        })
    }
}

// ── Combined → CompiledNetwork ─────────────────────────────────

impl Compilation<Combined> {
    pub fn graph_of_parts(&self) -> &GraphOfParts {
        &self.state.gop
    }

    pub fn combinations(&self) -> &[Combination] {
        &self.state.combinations
    }

    /// Estimates every combination and keeps the most performant one.
    ///
    /// # Errors
    /// - [`CompilerError::NoValidCombinations`] if the search found nothing.
    /// - [`CompilerError::NoBestCombination`] if the estimator refused
    ///   every combination.
    /// - [`CompilerError::Internal`] if estimation hit an inconsistency.
    pub fn estimate(self) -> Result<CompiledNetwork, CompilerError> {
        self.estimate_with(estimate_combination)
    }

    /// [`Compilation::estimate`] with the cost model passed in.
    fn estimate_with<F>(self, estimator: F) -> Result<CompiledNetwork, CompilerError>
    where
        F: Fn(
                &Combination,
                &GraphOfParts,
                &HardwareCapabilities,
                &EstimationOptions,
            ) -> Result<EstimatedOpGraph, EstimationError>
            + Sync,
    {
        let Compilation {
            ctx,
            state: Combined { gop, combinations },
        } = self;
        ctx.check_cancelled()?;
        let started = Instant::now();
        let Context {
            caps,
            options,
            estimation,
            cancel,
            debug,
            mut stats,
            ..
        } = ctx;

        if combinations.is_empty() {
            debug.write_performance(&[], None);
            tracing::warn!("no valid combinations for {} parts", gop.num_parts());
            return Err(CompilerError::NoValidCombinations);
        }

        let estimate_one = |combination: &Combination| -> Option<Result<EstimatedOpGraph, EstimationError>> {
            if cancel.is_cancelled() {
                return None;
            }
            Some(estimator(combination, &gop, &caps, &estimation))
        };
        let outcomes: Vec<_> = if options.parallel {
            combinations.par_iter().map(&estimate_one).collect()
        } else {
            combinations.iter().map(&estimate_one).collect()
        };

        let mut selector = BestSelector::new();
        let mut records = Vec::with_capacity(outcomes.len());
        for (index, (combination, outcome)) in combinations.iter().zip(outcomes).enumerate() {
            match outcome.ok_or(CompilerError::Cancelled)? {
                Ok(estimated) => {
                    let metric = estimated.perf.metric;
                    tracing::debug!("combination {index}: {metric}");
                    debug.write_combination(index, combination, Some(&estimated.op_graph));
                    records.push(EstimateRecord::Estimated(metric));
                    stats.num_estimated += 1;
                    if selector.offer(index, metric, estimated) {
                        tracing::debug!("combination {index} is the new best");
                    }
                }
                Err(e) if e.is_recoverable() => {
                    tracing::debug!("combination {index} skipped: {e}");
                    debug.write_combination(index, combination, None);
                    records.push(EstimateRecord::Skipped(e.to_string()));
                    stats.num_skipped += 1;
                }
                Err(e) => {
                    return Err(CompilerError::Internal(format!(
                        "estimating combination {index}: {e}"
                    )));
                }
            }
        }

        debug.write_performance(&records, selector.best_index());
        let (best_index, estimated) = selector.into_best().ok_or(CompilerError::NoBestCombination {
            failures: stats.num_skipped,
        })?;
        let combination = combinations.get(best_index).cloned().ok_or_else(|| {
            CompilerError::Internal(format!("best combination {best_index} out of range"))
        })?;
        stats.estimate_duration = started.elapsed();

        let network = CompiledNetwork {
            graph_of_parts: gop,
            best_index,
            combination,
            estimated,
            stats,
        };
        tracing::info!("{}", network.summary());
        tracing::info!("{}", network.stats.summary());
        debug.write_best(&network);
        Ok(network)
    }
}

impl<S: CompilationState> std::fmt::Debug for Compilation<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compilation")
            .field("state", &std::any::type_name::<S>())
            .field("variant", &self.ctx.caps.variant)
            .field("sram_bytes", &self.ctx.caps.total_sram_bytes)
            .field("strategies", &self.ctx.options.strategy_names())
            .field("search", &self.ctx.estimation.search)
            .field("cancelled", &self.ctx.cancel.is_cancelled())
            .finish()
    }
}

/// Compiles `graph` end to end with `config`.
pub fn compile(
    graph: &Graph<Validated>,
    config: &CompilerConfig,
) -> Result<CompiledNetwork, CompilerError> {
    Compilation::new(config.clone())?
        .partition(graph)?
        .create_plans()?
        .combine()?
        .estimate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use network_ir::{GraphBuilder, MceOp, PostProcessKind};
    use tensor_core::TensorInfo;

    fn metric(cycles: u64, bytes: u64) -> PerformanceMetric {
        PerformanceMetric {
            total_cycles: cycles,
            dram_bytes: bytes,
            num_passes: 1,
        }
    }

    fn small_graph() -> Graph<Validated> {
        let mut b = GraphBuilder::new("small");
        let input = b.input("in", TensorInfo::nhwc_u8(1, 16, 16, 16));
        let conv = b.mce(
            "conv",
            MceOp::convolution([3, 3], [1, 1]),
            input,
            TensorInfo::nhwc_u8(1, 16, 16, 32),
        );
        let relu = b.post_process("relu", PostProcessKind::Relu, conv);
        b.output("out", relu);
        b.build().validate().unwrap()
    }

    #[test]
    fn test_selector_first_is_best() {
        let mut s = BestSelector::new();
        assert!(s.best_index().is_none());
        assert!(s.offer(0, metric(100, 0), "a"));
        assert_eq!(s.best_index(), Some(0));
    }

    #[test]
    fn test_selector_ties_keep_first() {
        let mut s = BestSelector::new();
        s.offer(0, metric(100, 10), "a");
        assert!(!s.offer(1, metric(100, 10), "b"));
        assert!(!s.offer(2, metric(120, 0), "c"));
        assert!(s.offer(3, metric(100, 9), "d"));
        assert!(!s.offer(4, metric(100, 9), "e"));
        assert_eq!(s.best_metric(), Some(&metric(100, 9)));
        assert_eq!(s.into_best(), Some((3, "d")));
    }

    #[test]
    fn test_phases_in_order() {
        let graph = small_graph();
        let partitioned = Compilation::new(CompilerConfig::default())
            .unwrap()
            .partition(&graph)
            .unwrap();
        assert_eq!(partitioned.graph_of_parts().num_parts(), 3);
        assert_eq!(partitioned.graph_of_parts().total_plans(), 0);

        let planned = partitioned.create_plans().unwrap();
        assert!(planned.graph_of_parts().parts.iter().all(|p| p.num_plans() > 0));
        assert_eq!(planned.stats().total_plans, planned.graph_of_parts().total_plans());

        let combined = planned.combine().unwrap();
        assert!(!combined.combinations().is_empty());
        assert_eq!(combined.stats().num_combinations, combined.combinations().len());

        let network = combined.estimate().unwrap();
        assert!(network.best_index < network.stats.num_combinations);
        assert_eq!(
            network.stats.num_estimated + network.stats.num_skipped,
            network.stats.num_combinations
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let graph = small_graph();
        let par = compile(&graph, &CompilerConfig::default()).unwrap();
        let seq = compile(
            &graph,
            &CompilerConfig {
                parallel: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(par.best_index, seq.best_index);
        assert_eq!(par.combination, seq.combination);
        assert_eq!(par.estimated, seq.estimated);
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let result = Compilation::new(CompilerConfig::default())
            .unwrap()
            .with_cancellation(token)
            .partition(&small_graph());
        assert!(matches!(result, Err(CompilerError::Cancelled)));
    }

    #[test]
    fn test_cancelled_between_phases() {
        let token = CancellationToken::new();
        let planned = Compilation::new(CompilerConfig::default())
            .unwrap()
            .with_cancellation(token.clone())
            .partition(&small_graph())
            .unwrap()
            .create_plans()
            .unwrap();
        token.cancel();
        assert!(matches!(planned.combine(), Err(CompilerError::Cancelled)));
    }

    #[test]
    fn test_cancelled_during_estimation() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let token = CancellationToken::new();
        let combined = Compilation::new(CompilerConfig {
            parallel: false,
            ..Default::default()
        })
        .unwrap()
        .with_cancellation(token.clone())
        .partition(&small_graph())
        .unwrap()
        .create_plans()
        .unwrap()
        .combine()
        .unwrap();
        assert!(combined.combinations().len() > 1);

        let calls = AtomicUsize::new(0);
        let result = combined.estimate_with(|combination, gop, caps, options| {
            calls.fetch_add(1, Ordering::SeqCst);
            token.cancel();
            estimate_combination(combination, gop, caps, options)
        });
        assert!(matches!(result, Err(CompilerError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bad_config_fails_early() {
        let config = CompilerConfig {
            strategies: vec!["diagonal".into()],
            ..Default::default()
        };
        assert!(matches!(Compilation::new(config), Err(CompilerError::Config(_))));
    }

    #[test]
    fn test_debug_format() {
        let c = Compilation::new(CompilerConfig::default()).unwrap();
        let debug = format!("{c:?}");
        assert!(debug.contains("Compilation"));
        assert!(debug.contains("Idle"));
        assert!(debug.contains("split-height"));
    }
}
