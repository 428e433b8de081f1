// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end compilation.
//!
//! These tests exercise the complete flow from graph construction →
//! partitioning → plan generation → combination search → estimation,
//! proving that the workspace crates compose and that the type-state
//! transitions work end to end.

use cascading::{NpuVariant, SearchMode};
use compiler::{compile, Compilation, CompiledNetwork, CompilerConfig, CompilerError, DebugLevel};
use estimation::estimate_combination;
use network_ir::{graph::Validated, Graph, GraphBuilder, GraphLoader, MceOp, NodeId, PleKind, PostProcessKind};
use std::fs;
use tensor_core::TensorInfo;

// ── Helpers ────────────────────────────────────────────────────

fn t(h: usize, c: usize) -> TensorInfo {
    TensorInfo::nhwc_u8(1, h, h, c)
}

/// input → conv → relu → pool → output.
fn conv_relu_pool(h: usize) -> Graph<Validated> {
    let mut b = GraphBuilder::new("conv-relu-pool");
    let input = b.input("in", t(h, 16));
    let conv = b.mce("conv", MceOp::convolution([3, 3], [1, 1]), input, t(h, 32));
    let relu = b.post_process("relu", PostProcessKind::Relu, conv);
    let pool = b.ple("pool", PleKind::MaxPool { size: 2, stride: 2 }, &[relu], t(h / 2, 32));
    b.output("out", pool);
    b.build().validate().unwrap()
}

fn part_nodes(network: &CompiledNetwork) -> Vec<Vec<usize>> {
    network
        .graph_of_parts
        .parts
        .iter()
        .map(|p| p.nodes.iter().map(|n| n.0).collect())
        .collect()
}

fn exhaustive() -> CompilerConfig {
    CompilerConfig {
        search: SearchMode::Exhaustive,
        max_combinations: 4096,
        ..Default::default()
    }
}

// ── Partitioning scenarios ─────────────────────────────────────

#[test]
fn test_three_node_chain_makes_two_parts() {
    let mut b = GraphBuilder::new("chain");
    let input = b.input("in", t(16, 16));
    let conv = b.mce("conv", MceOp::convolution([3, 3], [1, 1]), input, t(16, 16));
    b.post_process("relu", PostProcessKind::Relu, conv);
    let graph = b.build().validate().unwrap();

    let partitioned = Compilation::new(CompilerConfig::default())
        .unwrap()
        .partition(&graph)
        .unwrap();
    let nodes: Vec<Vec<NodeId>> = partitioned
        .graph_of_parts()
        .parts
        .iter()
        .map(|p| p.nodes.clone())
        .collect();
    assert_eq!(nodes, vec![vec![NodeId(0)], vec![NodeId(1), NodeId(2)]]);
}

#[test]
fn test_multi_consumer_chain_keeps_post_process_apart() {
    let mut b = GraphBuilder::new("fanout");
    let input = b.input("in", t(16, 16));
    let conv = b.mce("conv", MceOp::convolution([3, 3], [1, 1]), input, t(16, 16));
    let relu = b.post_process("relu", PostProcessKind::Relu, conv);
    let tap = b.output("tap", conv);
    let graph = b.build().validate().unwrap();

    let partitioned = Compilation::new(CompilerConfig::default())
        .unwrap()
        .partition(&graph)
        .unwrap();
    let gop = partitioned.graph_of_parts();
    let owner = |node: NodeId| gop.parts.iter().position(|p| p.contains(node)).unwrap();

    let chain = [input, conv, relu];
    for node in chain {
        assert_eq!(gop.parts[owner(node)].nodes, vec![node]);
    }
    assert_eq!(gop.num_parts(), 4);
    assert_ne!(owner(tap), owner(conv));
}

#[test]
fn test_every_node_in_exactly_one_part() {
    let graph = conv_relu_pool(32);
    let network = compile(&graph, &CompilerConfig::default()).unwrap();
    let mut seen: Vec<usize> = part_nodes(&network).into_iter().flatten().collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..graph.num_nodes()).collect::<Vec<_>>());
}

// ── End-to-end compilation ─────────────────────────────────────

#[test]
fn test_end_to_end() {
    let graph = conv_relu_pool(32);
    let network = compile(&graph, &CompilerConfig::default()).unwrap();

    assert_eq!(part_nodes(&network), vec![vec![0], vec![1, 2], vec![3], vec![4]]);
    assert!(network.stats.num_combinations > 0);
    assert!(network.performance().metric.total_cycles > 0);
    assert_eq!(
        network.performance().metric.num_passes,
        network.estimated.op_graph.num_passes()
    );
    assert_eq!(network.combination.plans.len(), network.graph_of_parts.num_parts());
    assert!(network.summary().starts_with("Compiled: combination"));
}

#[test]
fn test_best_is_most_performant_first_wins() {
    let graph = conv_relu_pool(32);
    let config = exhaustive();
    let combined = Compilation::new(config.clone())
        .unwrap()
        .partition(&graph)
        .unwrap()
        .create_plans()
        .unwrap()
        .combine()
        .unwrap();

    let caps = config.capabilities().unwrap();
    let options = config.estimation_options();
    let metrics: Vec<_> = combined
        .combinations()
        .iter()
        .map(|c| {
            estimate_combination(c, combined.graph_of_parts(), &caps, &options)
                .unwrap()
                .perf
                .metric
        })
        .collect();
    let min = *metrics.iter().min().unwrap();
    let expected = metrics.iter().position(|m| *m == min).unwrap();

    let network = combined.estimate().unwrap();
    assert_eq!(network.best_index, expected);
    assert_eq!(network.performance().metric, min);
    assert_eq!(network.combination, compile(&graph, &config).unwrap().combination);
}

#[test]
fn test_cascading_never_hurts() {
    let graph = conv_relu_pool(32);
    let with = compile(&graph, &exhaustive()).unwrap();
    let without = compile(
        &graph,
        &CompilerConfig {
            enable_cascading: false,
            ..exhaustive()
        },
    )
    .unwrap();

    assert_eq!(without.combination.num_cascades(), 0);
    assert!(with.stats.num_combinations > without.stats.num_combinations);
    assert!(with.performance().metric <= without.performance().metric);
}

#[test]
fn test_beam_search_compiles() {
    let graph = conv_relu_pool(32);
    let network = compile(
        &graph,
        &CompilerConfig {
            search: SearchMode::Beam,
            max_combinations: 8,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(network.stats.search, SearchMode::Beam);
    assert!(network.stats.num_combinations <= 8);
}

#[test]
fn test_every_variant_compiles() {
    let graph = conv_relu_pool(16);
    for variant in NpuVariant::ALL {
        let network = compile(
            &graph,
            &CompilerConfig {
                variant,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(network.performance().metric.total_cycles > 0, "{variant}");
    }
}

#[test]
fn test_compile_from_json_and_toml() {
    let dir = tempfile::tempdir().unwrap();
    let graph_path = dir.path().join("net.json");
    fs::write(&graph_path, GraphLoader::to_json_string(&conv_relu_pool(16)).unwrap()).unwrap();
    let config_path = dir.path().join("cascade.toml");
    fs::write(
        &config_path,
        "variant = \"tops1\"\nstrategies = [\"full-tensor\", \"split-height\"]\nparallel = false\n",
    )
    .unwrap();

    let graph = GraphLoader::from_file(&graph_path).unwrap();
    let config = CompilerConfig::from_file(&config_path).unwrap();
    let network = compile(&graph, &config).unwrap();
    assert_eq!(network.graph_of_parts.num_parts(), 4);
}

// ── Graceful empty cases ───────────────────────────────────────

#[test]
fn test_empty_graph_is_trivial() {
    let graph = GraphBuilder::new("empty").build().validate().unwrap();
    let network = compile(&graph, &CompilerConfig::default()).unwrap();
    assert!(network.graph_of_parts.is_empty());
    assert_eq!(network.best_index, 0);
    assert!(network.combination.plans.is_empty());
    assert_eq!(network.estimated.op_graph.num_passes(), 0);
    assert_eq!(network.performance().metric.total_cycles, 0);
}

#[test]
fn test_zero_plan_part_gives_no_valid_combinations() {
    let graph = conv_relu_pool(64);
    let config = CompilerConfig {
        sram_size: Some("1K".into()),
        ..Default::default()
    };
    let result = compile(&graph, &config);
    assert!(matches!(result, Err(CompilerError::NoValidCombinations)));
}

#[test]
fn test_all_refused_gives_no_best() {
    let graph = conv_relu_pool(16);
    let config = CompilerConfig {
        max_pass_length: 0,
        ..Default::default()
    };
    match compile(&graph, &config) {
        Err(CompilerError::NoBestCombination { failures }) => assert!(failures > 0),
        other => panic!("expected NoBestCombination, got {other:?}"),
    }
}

// ── Diagnostics ────────────────────────────────────────────────

#[test]
fn test_debug_high_writes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let config = CompilerConfig {
        debug_level: DebugLevel::High,
        debug_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let network = compile(&conv_relu_pool(16), &config).unwrap();

    let counts = fs::read_to_string(dir.path().join("plan_counts.txt")).unwrap();
    assert!(counts.contains("conv+relu"));

    let perf = fs::read_to_string(dir.path().join("performance.txt")).unwrap();
    assert_eq!(perf.lines().count(), network.stats.num_combinations + 1);
    assert!(perf.ends_with(&format!("Best: {}\n", network.best_index)));

    let best: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("best.json")).unwrap()).unwrap();
    assert_eq!(best["best_index"], network.best_index);

    for index in 0..network.stats.num_combinations {
        assert!(dir.path().join(format!("combinations/{index}.json")).is_file());
    }
}

#[test]
fn test_debug_does_not_change_result() {
    let dir = tempfile::tempdir().unwrap();
    let graph = conv_relu_pool(16);
    let plain = compile(&graph, &CompilerConfig::default()).unwrap();
    let debugged = compile(
        &graph,
        &CompilerConfig {
            debug_level: DebugLevel::Medium,
            debug_dir: dir.path().to_path_buf(),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(plain.best_index, debugged.best_index);
    assert_eq!(plain.estimated, debugged.estimated);
    assert!(!dir.path().join("combinations").exists());
}

#[test]
fn test_no_valid_combinations_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let config = CompilerConfig {
        sram_size: Some("1K".into()),
        debug_level: DebugLevel::Medium,
        debug_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    assert!(compile(&conv_relu_pool(64), &config).is_err());
    let perf = fs::read_to_string(dir.path().join("performance.txt")).unwrap();
    assert_eq!(perf, "Best: NONE\n");
}
