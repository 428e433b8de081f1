// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Node definitions for the network IR.
//!
//! Each [`Node`] is one operation in the source graph. The operation is an
//! explicit tagged [`NodeKind`], so passes ask capability questions
//! ([`NodeKind::is_post_process`], [`NodeKind::is_primary_compute`]) instead
//! of inspecting concrete types.

use std::fmt;
use tensor_core::TensorInfo;

/// Identity of a node: its position in the graph's node list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An input edge: the producing node and which of its outputs is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Edge {
    pub source: NodeId,
    #[serde(default)]
    pub output: usize,
}

impl Edge {
    pub fn new(source: NodeId, output: usize) -> Self {
        Self { source, output }
    }
}

/// The flavour of multiply-accumulate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MceKind {
    Convolution,
    DepthwiseConvolution,
    FullyConnected,
}

/// Parameters of a primary-compute (multiply-accumulate engine) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct MceOp {
    pub op: MceKind,
    /// Kernel size as `[height, width]`.
    #[serde(default = "unit_pair")]
    pub kernel: [usize; 2],
    /// Stride as `[y, x]`.
    #[serde(default = "unit_pair")]
    pub stride: [usize; 2],
}

fn unit_pair() -> [usize; 2] {
    [1, 1]
}

impl MceOp {
    pub fn convolution(kernel: [usize; 2], stride: [usize; 2]) -> Self {
        Self {
            op: MceKind::Convolution,
            kernel,
            stride,
        }
    }

    pub fn depthwise(kernel: [usize; 2], stride: [usize; 2]) -> Self {
        Self {
            op: MceKind::DepthwiseConvolution,
            kernel,
            stride,
        }
    }

    pub fn fully_connected() -> Self {
        Self {
            op: MceKind::FullyConnected,
            kernel: [1, 1],
            stride: [1, 1],
        }
    }
}

/// Activation/requantization steps that run on the output of an MCE op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostProcessKind {
    Relu,
    Clamp { min: i32, max: i32 },
    Requantize,
}

/// Standalone programmable-layer-engine operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PleKind {
    MaxPool { size: usize, stride: usize },
    AvgPool { size: usize, stride: usize },
    Addition,
    Sigmoid,
}

impl PleKind {
    /// Window `(size, stride)` for pooling kinds, `(1, 1)` for elementwise ones.
    pub fn window(&self) -> (usize, usize) {
        match *self {
            PleKind::MaxPool { size, stride } | PleKind::AvgPool { size, stride } => (size, stride),
            PleKind::Addition | PleKind::Sigmoid => (1, 1),
        }
    }

    /// Number of input tensors the operation consumes.
    pub fn num_inputs(&self) -> usize {
        match self {
            PleKind::Addition => 2,
            _ => 1,
        }
    }
}

/// What a node computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Network input, supplied by the host in DRAM.
    Input,
    /// Network output, read back by the host from DRAM.
    Output,
    /// Primary compute on the multiply-accumulate engines.
    Mce(MceOp),
    /// Post-processing fused onto the preceding MCE op when possible.
    PostProcess { op: PostProcessKind },
    /// Standalone PLE operation.
    Ple { op: PleKind },
}

impl NodeKind {
    /// `true` for nodes that want to be co-located with their MCE producer.
    pub fn is_post_process(&self) -> bool {
        matches!(self, NodeKind::PostProcess { .. })
    }

    /// `true` for nodes that run on the multiply-accumulate engines.
    pub fn is_primary_compute(&self) -> bool {
        matches!(self, NodeKind::Mce(_))
    }

    /// Expected number of input edges, or `None` when unconstrained.
    pub fn expected_inputs(&self) -> Option<usize> {
        match self {
            NodeKind::Input => Some(0),
            NodeKind::Output | NodeKind::Mce(_) | NodeKind::PostProcess { .. } => Some(1),
            NodeKind::Ple { op } => Some(op.num_inputs()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            NodeKind::Mce(m) => match m.op {
                MceKind::Convolution => "convolution",
                MceKind::DepthwiseConvolution => "depthwise_convolution",
                MceKind::FullyConnected => "fully_connected",
            },
            NodeKind::PostProcess { op } => match op {
                PostProcessKind::Relu => "relu",
                PostProcessKind::Clamp { .. } => "clamp",
                PostProcessKind::Requantize => "requantize",
            },
            NodeKind::Ple { op } => match op {
                PleKind::MaxPool { .. } => "max_pool",
                PleKind::AvgPool { .. } => "avg_pool",
                PleKind::Addition => "addition",
                PleKind::Sigmoid => "sigmoid",
            },
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operation in the source graph.
///
/// Nodes are never mutated once the graph is built; their identity is
/// their index in [`crate::Graph::nodes`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    /// Human-readable name, used in diagnostics only.
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub inputs: Vec<Edge>,
    #[serde(default)]
    pub outputs: Vec<TensorInfo>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, edge: Edge) -> Self {
        self.inputs.push(edge);
        self
    }

    pub fn with_output(mut self, tensor: TensorInfo) -> Self {
        self.outputs.push(tensor);
        self
    }

    /// Returns the tensor produced on output `index`.
    pub fn output(&self, index: usize) -> Option<&TensorInfo> {
        self.outputs.get(index)
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        let inputs: Vec<String> = self
            .inputs
            .iter()
            .map(|e| format!("{}:{}", e.source, e.output))
            .collect();
        let outputs: Vec<String> = self.outputs.iter().map(|t| t.to_string()).collect();
        format!(
            "{} ({}) in [{}] out [{}]",
            self.name,
            self.kind,
            inputs.join(", "),
            outputs.join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_queries() {
        let conv = NodeKind::Mce(MceOp::convolution([3, 3], [1, 1]));
        let relu = NodeKind::PostProcess {
            op: PostProcessKind::Relu,
        };
        assert!(conv.is_primary_compute());
        assert!(!conv.is_post_process());
        assert!(relu.is_post_process());
        assert!(!relu.is_primary_compute());
        assert!(!NodeKind::Input.is_primary_compute());
    }

    #[test]
    fn test_expected_inputs() {
        assert_eq!(NodeKind::Input.expected_inputs(), Some(0));
        assert_eq!(
            NodeKind::Ple {
                op: PleKind::Addition
            }
            .expected_inputs(),
            Some(2)
        );
        assert_eq!(
            NodeKind::Mce(MceOp::fully_connected()).expected_inputs(),
            Some(1)
        );
    }

    #[test]
    fn test_ple_window() {
        assert_eq!(PleKind::MaxPool { size: 3, stride: 2 }.window(), (3, 2));
        assert_eq!(PleKind::Sigmoid.window(), (1, 1));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(
            NodeKind::Mce(MceOp::depthwise([3, 3], [1, 1])).to_string(),
            "depthwise_convolution"
        );
        assert_eq!(
            NodeKind::PostProcess {
                op: PostProcessKind::Clamp { min: 0, max: 6 }
            }
            .to_string(),
            "clamp"
        );
    }

    #[test]
    fn test_kind_serde_tagged() {
        let kind = NodeKind::Mce(MceOp::convolution([3, 3], [2, 2]));
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"type\":\"mce\""));
        let back: NodeKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);

        let pp: NodeKind = serde_json::from_str(r#"{"type":"post_process","op":"relu"}"#).unwrap();
        assert!(pp.is_post_process());
    }

    #[test]
    fn test_summary() {
        let node = Node::new("conv1", NodeKind::Mce(MceOp::convolution([1, 1], [1, 1])))
            .with_input(Edge::new(NodeId(0), 0))
            .with_output(tensor_core::TensorInfo::nhwc_u8(1, 8, 8, 16));
        let s = node.summary();
        assert!(s.contains("conv1"));
        assert!(s.contains("convolution"));
        assert!(s.contains("#0:0"));
    }
}
