// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Estimation must be a pure function of the combination.

use cascading::{
    combine, create_graph_of_parts, create_plans, CancellationToken, CompilationOptions,
    EstimationOptions, GraphOfParts, HardwareCapabilities,
};
use estimation::estimate_combination;
use network_ir::{GraphBuilder, MceOp, PleKind, PostProcessKind};
use tensor_core::TensorInfo;

fn planned_network(caps: &HardwareCapabilities) -> GraphOfParts {
    let mut b = GraphBuilder::new("det");
    let input = b.input("in", TensorInfo::nhwc_u8(1, 32, 32, 16));
    let conv = b.mce(
        "conv",
        MceOp::convolution([3, 3], [1, 1]),
        input,
        TensorInfo::nhwc_u8(1, 32, 32, 32),
    );
    let relu = b.post_process("relu", PostProcessKind::Relu, conv);
    let pool = b.ple(
        "pool",
        PleKind::MaxPool { size: 2, stride: 2 },
        &[relu],
        TensorInfo::nhwc_u8(1, 16, 16, 32),
    );
    b.output("out", pool);
    let graph = b.build().validate().unwrap();

    let mut gop = create_graph_of_parts(&graph).unwrap();
    create_plans(&mut gop, &graph, caps, &CompilationOptions::default()).unwrap();
    gop
}

#[test]
fn estimation_is_deterministic() {
    let caps = HardwareCapabilities::default();
    let options = EstimationOptions::default();
    let gop = planned_network(&caps);
    let combinations = combine(&gop, &caps, &options, &CancellationToken::new()).unwrap();
    assert!(!combinations.is_empty());

    for combination in combinations.iter().take(50) {
        let first = estimate_combination(combination, &gop, &caps, &options).unwrap();
        let second = estimate_combination(combination, &gop, &caps, &options).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn cascading_saves_dram_traffic() {
    let caps = HardwareCapabilities::default();
    let options = EstimationOptions::default();
    let gop = planned_network(&caps);
    let combinations = combine(&gop, &caps, &options, &CancellationToken::new()).unwrap();

    let best_dram = |cascaded: bool| {
        combinations
            .iter()
            .filter(|c| (c.num_cascades() > 0) == cascaded)
            .map(|c| {
                estimate_combination(c, &gop, &caps, &options)
                    .unwrap()
                    .perf
                    .metric
                    .dram_bytes
            })
            .min()
    };
    let with = best_dram(true).expect("some combination cascades");
    let without = best_dram(false).expect("some combination goes through DRAM");
    assert!(with < without);
}

#[test]
fn serialized_estimate_reloads_unchanged() {
    let caps = HardwareCapabilities::default();
    let options = EstimationOptions::default();
    let gop = planned_network(&caps);
    let combinations = combine(&gop, &caps, &options, &CancellationToken::new()).unwrap();
    let estimated = estimate_combination(&combinations[0], &gop, &caps, &options).unwrap();

    let json = serde_json::to_string(&estimated).unwrap();
    let back: estimation::EstimatedOpGraph = serde_json::from_str(&json).unwrap();
    assert_eq!(back, estimated);
    assert!(!back.perf.metric.is_more_performant_than(&estimated.perf.metric));
    assert!(!estimated.perf.metric.is_more_performant_than(&back.perf.metric));
}
