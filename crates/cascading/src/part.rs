// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Parts and the partitioner.
//!
//! A [`Part`] is the unit the scheduler reasons about: a short, ordered run
//! of nodes that always execute together. [`create_graph_of_parts`] splits a
//! validated graph into parts so that every node belongs to exactly one of
//! them, then derives the connections between parts from the graph edges.
//!
//! # Partitioning rule
//!
//! Nodes are visited in topological order. Every node starts its own part,
//! except a post-process node whose only producer is an MCE node with a
//! single consumer edge: that node is appended to the producer's part so
//! the hardware can fuse it.

use crate::plan::Plan;
use crate::CascadingError;
use network_ir::{graph::Validated, Edge, Graph, NodeId};
use std::collections::HashMap;
use std::fmt;

/// Identity of a part: its index in [`GraphOfParts::parts`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PartId(pub usize);

impl PartId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A graph edge entering a part from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PartInputSlot {
    /// The consuming node inside the part.
    pub node: NodeId,
    /// Which input of that node the edge feeds.
    pub input_index: usize,
    pub edge: Edge,
}

/// An output of a part's last node that somebody consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PartOutputSlot {
    pub node: NodeId,
    pub output_index: usize,
}

/// A scheduling unit: an ordered, non-empty sequence of nodes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Part {
    pub id: PartId,
    pub nodes: Vec<NodeId>,
    pub inputs: Vec<PartInputSlot>,
    pub outputs: Vec<PartOutputSlot>,
    /// Candidate plans, filled in by the plan generator.
    pub plans: Vec<Plan>,
    /// Node names joined with `+`, for logs and dumps.
    pub debug_tag: String,
}

impl Part {
    fn new(id: PartId, first: NodeId) -> Self {
        Self {
            id,
            nodes: vec![first],
            inputs: Vec::new(),
            outputs: Vec::new(),
            plans: Vec::new(),
            debug_tag: String::new(),
        }
    }

    pub fn first_node(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn last_node(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn num_plans(&self) -> usize {
        self.plans.len()
    }
}

/// One end of a [`PartConnection`]: a part and one of its slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct PartSlot {
    pub part: PartId,
    pub slot: usize,
}

/// A producer output slot feeding a consumer input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct PartConnection {
    pub source: PartSlot,
    pub dest: PartSlot,
}

/// The partitioned graph. Part indices follow topological order, so every
/// connection goes from a lower to a higher part id.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GraphOfParts {
    pub parts: Vec<Part>,
    pub connections: Vec<PartConnection>,
}

impl GraphOfParts {
    pub fn num_parts(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.index())
    }

    /// Connections feeding `part`, with their indices.
    pub fn incoming(&self, part: PartId) -> impl Iterator<Item = (usize, &PartConnection)> {
        self.connections
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.dest.part == part)
    }

    /// Connections leaving `part`, with their indices.
    pub fn outgoing(&self, part: PartId) -> impl Iterator<Item = (usize, &PartConnection)> {
        self.connections
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.source.part == part)
    }

    pub fn total_plans(&self) -> usize {
        self.parts.iter().map(Part::num_plans).sum()
    }

    /// Product of plan counts, saturating; the size of the naive search space.
    pub fn search_space(&self) -> usize {
        self.parts
            .iter()
            .fold(1usize, |acc, p| acc.saturating_mul(p.num_plans()))
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let counts: Vec<usize> = self.parts.iter().map(Part::num_plans).collect();
        format!(
            "{} parts, {} connections, {} plans total, plans per part: {:?}",
            self.num_parts(),
            self.connections.len(),
            self.total_plans(),
            counts,
        )
    }
}

/// Splits `graph` into parts.
///
/// # Errors
/// - [`CascadingError::Internal`] when a post-process node should join its
///   producer's part but that part does not end with the producer.
/// - [`CascadingError::NotSupported`] when, after partitioning, some node is
///   not in exactly one part.
pub fn create_graph_of_parts(graph: &Graph<Validated>) -> Result<GraphOfParts, CascadingError> {
    let mut parts: Vec<Part> = Vec::new();
    let mut owner: HashMap<NodeId, PartId> = HashMap::with_capacity(graph.num_nodes());

    for &id in graph.nodes_sorted() {
        let target = fusion_target(graph, id, &owner, &parts)?;
        let part_id = match target {
            Some(pid) => {
                parts[pid.index()].nodes.push(id);
                pid
            }
            None => {
                let pid = PartId(parts.len());
                parts.push(Part::new(pid, id));
                pid
            }
        };
        owner.insert(id, part_id);
    }

    check_complete(graph, &parts)?;

    for part in &mut parts {
        part.debug_tag = part
            .nodes
            .iter()
            .filter_map(|&n| graph.node(n).map(|node| node.name.as_str()))
            .collect::<Vec<_>>()
            .join("+");
        part.inputs = input_slots(graph, part, &owner);
        part.outputs = output_slots(graph, part);
    }

    let connections = connect(&parts, &owner)?;

    let gop = GraphOfParts { parts, connections };
    tracing::info!("partitioned '{}': {}", graph.name, gop.summary());
    Ok(gop)
}

/// Returns the part a post-process node must join, if any.
fn fusion_target(
    graph: &Graph<Validated>,
    id: NodeId,
    owner: &HashMap<NodeId, PartId>,
    parts: &[Part],
) -> Result<Option<PartId>, CascadingError> {
    let Some(node) = graph.node(id) else {
        return Err(CascadingError::Internal(format!(
            "topological order names missing node {id}"
        )));
    };
    if !node.kind.is_post_process() || node.inputs.len() != 1 {
        return Ok(None);
    }

    let producer = node.inputs[0].source;
    let fusable = graph
        .node(producer)
        .is_some_and(|p| p.kind.is_primary_compute())
        && graph.num_consumers(producer) == 1;
    if !fusable {
        return Ok(None);
    }

    match owner.get(&producer) {
        Some(&pid) if parts[pid.index()].last_node() == producer => Ok(Some(pid)),
        _ => Err(CascadingError::Internal(format!(
            "no part ends with producer {producer} of post-process node '{}'",
            node.name
        ))),
    }
}

fn check_complete(graph: &Graph<Validated>, parts: &[Part]) -> Result<(), CascadingError> {
    let mut seen = vec![0usize; graph.num_nodes()];
    for part in parts {
        for n in &part.nodes {
            match seen.get_mut(n.index()) {
                Some(count) => *count += 1,
                None => {
                    return Err(CascadingError::NotSupported(
                        "Some nodes could not be assigned to a Part".into(),
                    ))
                }
            }
        }
    }
    if seen.iter().any(|&c| c != 1) {
        return Err(CascadingError::NotSupported(
            "Some nodes could not be assigned to a Part".into(),
        ));
    }
    Ok(())
}

fn input_slots(
    graph: &Graph<Validated>,
    part: &Part,
    owner: &HashMap<NodeId, PartId>,
) -> Vec<PartInputSlot> {
    let mut slots = Vec::new();
    for &id in &part.nodes {
        let Some(node) = graph.node(id) else { continue };
        for (input_index, edge) in node.inputs.iter().enumerate() {
            if owner.get(&edge.source) != Some(&part.id) {
                slots.push(PartInputSlot {
                    node: id,
                    input_index,
                    edge: *edge,
                });
            }
        }
    }
    slots
}

fn output_slots(graph: &Graph<Validated>, part: &Part) -> Vec<PartOutputSlot> {
    let last = part.last_node();
    let num_outputs = graph.node(last).map_or(0, |n| n.num_outputs());
    (0..num_outputs)
        .filter(|&o| graph.consumers(last).iter().any(|c| c.output == o))
        .map(|output_index| PartOutputSlot {
            node: last,
            output_index,
        })
        .collect()
}

fn connect(
    parts: &[Part],
    owner: &HashMap<NodeId, PartId>,
) -> Result<Vec<PartConnection>, CascadingError> {
    let mut connections = Vec::new();
    for part in parts {
        for (dest_slot, input) in part.inputs.iter().enumerate() {
            let source_part = owner.get(&input.edge.source).copied().ok_or_else(|| {
                CascadingError::Internal(format!("node {} has no part", input.edge.source))
            })?;
            let source_slot = parts[source_part.index()]
                .outputs
                .iter()
                .position(|o| o.node == input.edge.source && o.output_index == input.edge.output)
                .ok_or_else(|| {
                    CascadingError::Internal(format!(
                        "edge {}:{} into {} does not leave an output slot of {}",
                        input.edge.source, input.edge.output, part.id, source_part
                    ))
                })?;
            connections.push(PartConnection {
                source: PartSlot {
                    part: source_part,
                    slot: source_slot,
                },
                dest: PartSlot {
                    part: part.id,
                    slot: dest_slot,
                },
            });
        }
    }
    Ok(connections)
}
