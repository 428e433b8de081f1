// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The operation graph: a DAG of [`Node`]s.
//!
//! # Type-State Pattern
//!
//! ```text
//! Graph<Loaded>     : nodes collected, nothing checked.
//!       │  .validate()
//!       ▼
//! Graph<Validated>  : edges checked, acyclic, topological order and
//!                     consumer lists computed. Ready for partitioning.
//! ```
//!
//! The partitioner only accepts `Graph<Validated>`, so it can rely on the
//! topological order and on every edge pointing at a real output.

use crate::{Edge, GraphError, Node, NodeId, NodeKind};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use tensor_core::TensorInfo;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been constructed but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and is ready for partitioning.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

/// One consumer of a node output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Consumer {
    /// The consuming node.
    pub node: NodeId,
    /// Which of the consuming node's inputs the edge feeds.
    pub input_index: usize,
    /// Which output of the producer is consumed.
    pub output: usize,
}

// ── Graph ──────────────────────────────────────────────────────────

/// The network as a set of nodes connected by input edges.
#[derive(Debug, Clone)]
pub struct Graph<S: GraphState = Loaded> {
    /// Human-readable network name.
    pub name: String,
    /// All nodes; a node's [`NodeId`] is its index here.
    pub nodes: Vec<Node>,
    order: Vec<NodeId>,
    consumers: Vec<Vec<Consumer>>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl Graph<Loaded> {
    /// Creates a new graph in the `Loaded` state.
    pub fn new(name: String, nodes: Vec<Node>) -> Self {
        Self {
            name,
            nodes,
            order: Vec::new(),
            consumers: Vec::new(),
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - Every edge references an existing node and output index.
    /// - Each node has the number of inputs its kind requires.
    /// - Every non-`Output` node produces at least one valid tensor.
    /// - The graph is acyclic.
    ///
    /// An empty graph is valid.
    pub fn validate(self) -> Result<Graph<Validated>, GraphError> {
        let n = self.nodes.len();

        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(expected) = node.kind.expected_inputs() {
                if node.inputs.len() != expected {
                    return Err(GraphError::InvalidNode {
                        node: node.name.clone(),
                        detail: format!(
                            "{} node expects {expected} input(s), got {}",
                            node.kind,
                            node.inputs.len()
                        ),
                    });
                }
            }

            match node.kind {
                NodeKind::Output => {
                    if !node.outputs.is_empty() {
                        return Err(GraphError::InvalidNode {
                            node: node.name.clone(),
                            detail: "output nodes produce no tensors".into(),
                        });
                    }
                }
                _ => {
                    if node.outputs.is_empty() {
                        return Err(GraphError::InvalidNode {
                            node: node.name.clone(),
                            detail: "node produces no outputs".into(),
                        });
                    }
                }
            }

            for tensor in &node.outputs {
                tensor.validate().map_err(|e| GraphError::InvalidNode {
                    node: node.name.clone(),
                    detail: e.to_string(),
                })?;
            }

            for edge in &node.inputs {
                let Some(source) = self.nodes.get(edge.source.index()) else {
                    return Err(GraphError::InvalidNode {
                        node: node.name.clone(),
                        detail: format!("input edge references missing node {}", edge.source),
                    });
                };
                if edge.output >= source.outputs.len() {
                    return Err(GraphError::InvalidNode {
                        node: node.name.clone(),
                        detail: format!(
                            "input edge references output {} of '{}', which has {} output(s)",
                            edge.output,
                            source.name,
                            source.outputs.len()
                        ),
                    });
                }
                if edge.source.index() == i {
                    return Err(GraphError::InvalidGraph(format!(
                        "node '{}' consumes its own output",
                        node.name
                    )));
                }
            }
        }

        // Consumer lists, ordered by consumer id then input index.
        let mut consumers: Vec<Vec<Consumer>> = vec![Vec::new(); n];
        for (i, node) in self.nodes.iter().enumerate() {
            for (input_index, edge) in node.inputs.iter().enumerate() {
                consumers[edge.source.index()].push(Consumer {
                    node: NodeId(i),
                    input_index,
                    output: edge.output,
                });
            }
        }

        let order = topological_order(&self.nodes, &consumers)?;

        Ok(Graph {
            name: self.name,
            nodes: self.nodes,
            order,
            consumers,
            _state: std::marker::PhantomData,
        })
    }
}

/// Kahn's algorithm, always releasing the lowest ready id first so the
/// order is deterministic.
fn topological_order(
    nodes: &[Node],
    consumers: &[Vec<Consumer>],
) -> Result<Vec<NodeId>, GraphError> {
    let mut in_degree: Vec<usize> = nodes.iter().map(|n| n.inputs.len()).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(NodeId(i));
        for c in &consumers[i] {
            let d = &mut in_degree[c.node.index()];
            *d -= 1;
            if *d == 0 {
                ready.push(Reverse(c.node.index()));
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(GraphError::InvalidGraph(format!(
            "graph contains a cycle ({} of {} nodes reachable in dependency order)",
            order.len(),
            nodes.len()
        )));
    }
    Ok(order)
}

// ── Validated state ────────────────────────────────────────────────

impl Graph<Validated> {
    /// Returns the total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Node ids in dependency order (producers before consumers).
    pub fn nodes_sorted(&self) -> &[NodeId] {
        &self.order
    }

    /// All consumer edges of every output of `id`.
    pub fn consumers(&self, id: NodeId) -> &[Consumer] {
        self.consumers
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of consumer edges leaving `id`, across all of its outputs.
    pub fn num_consumers(&self, id: NodeId) -> usize {
        self.consumers(id).len()
    }

    /// The tensor flowing along an edge.
    pub fn edge_tensor(&self, edge: &Edge) -> Option<&TensorInfo> {
        self.node(edge.source)?.output(edge.output)
    }

    /// Returns a summary string describing the graph.
    pub fn summary(&self) -> String {
        let count = |pred: fn(&NodeKind) -> bool| self.nodes.iter().filter(|n| pred(&n.kind)).count();
        format!(
            "Graph '{}': {} nodes ({} inputs, {} outputs, {} mce, {} post-process)",
            self.name,
            self.num_nodes(),
            count(|k| matches!(k, NodeKind::Input)),
            count(|k| matches!(k, NodeKind::Output)),
            count(NodeKind::is_primary_compute),
            count(NodeKind::is_post_process),
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for Graph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph '{}' ({} nodes):", self.name, self.nodes.len())?;
        for (i, node) in self.nodes.iter().enumerate() {
            writeln!(f, "  [{i}] {}", node.summary())?;
        }
        Ok(())
    }
}

// ── Builder ────────────────────────────────────────────────────────

/// Incremental graph construction, mostly for tests and synthetic networks.
///
/// ```
/// use network_ir::{GraphBuilder, MceOp, PostProcessKind};
/// use tensor_core::TensorInfo;
///
/// let mut b = GraphBuilder::new("tiny");
/// let input = b.input("in", TensorInfo::nhwc_u8(1, 16, 16, 16));
/// let conv = b.mce("conv", MceOp::convolution([1, 1], [1, 1]), input, TensorInfo::nhwc_u8(1, 16, 16, 32));
/// let relu = b.post_process("relu", PostProcessKind::Relu, conv);
/// b.output("out", relu);
/// let graph = b.build().validate().unwrap();
/// assert_eq!(graph.num_nodes(), 4);
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    name: String,
    nodes: Vec<Node>,
}

impl GraphBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: Vec::new(),
        }
    }

    /// Appends an arbitrary node and returns its id.
    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn input(&mut self, name: &str, tensor: TensorInfo) -> NodeId {
        self.add(Node::new(name, NodeKind::Input).with_output(tensor))
    }

    pub fn mce(
        &mut self,
        name: &str,
        op: crate::MceOp,
        source: NodeId,
        output: TensorInfo,
    ) -> NodeId {
        self.add(
            Node::new(name, NodeKind::Mce(op))
                .with_input(Edge::new(source, 0))
                .with_output(output),
        )
    }

    /// Adds a post-process node whose output has the producer's shape.
    pub fn post_process(
        &mut self,
        name: &str,
        op: crate::PostProcessKind,
        source: NodeId,
    ) -> NodeId {
        let tensor = self.output_of(source);
        self.add(
            Node::new(name, NodeKind::PostProcess { op })
                .with_input(Edge::new(source, 0))
                .with_output(tensor),
        )
    }

    pub fn ple(
        &mut self,
        name: &str,
        op: crate::PleKind,
        sources: &[NodeId],
        output: TensorInfo,
    ) -> NodeId {
        let mut node = Node::new(name, NodeKind::Ple { op }).with_output(output);
        for &s in sources {
            node = node.with_input(Edge::new(s, 0));
        }
        self.add(node)
    }

    pub fn output(&mut self, name: &str, source: NodeId) -> NodeId {
        self.add(Node::new(name, NodeKind::Output).with_input(Edge::new(source, 0)))
    }

    pub fn build(self) -> Graph<Loaded> {
        Graph::new(self.name, self.nodes)
    }

    fn output_of(&self, id: NodeId) -> TensorInfo {
        self.nodes
            .get(id.index())
            .and_then(|n| n.outputs.first())
            .cloned()
            .unwrap_or_else(|| TensorInfo::nhwc_u8(1, 1, 1, 1))
    }
}
