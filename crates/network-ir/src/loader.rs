// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph loading from a JSON description.
//!
//! The front end that builds graphs from a network description lives
//! outside this workspace; it hands graphs over in this format:
//!
//! ```json
//! {
//!   "name": "tiny",
//!   "nodes": [
//!     { "name": "in",   "kind": { "type": "input" }, "outputs": [{ "shape": [1, 16, 16, 16], "dtype": "u8" }] },
//!     { "name": "conv", "kind": { "type": "mce", "op": "convolution", "kernel": [3, 3], "stride": [1, 1] },
//!       "inputs": [{ "source": 0 }], "outputs": [{ "shape": [1, 16, 16, 32], "dtype": "u8" }] },
//!     { "name": "out",  "kind": { "type": "output" }, "inputs": [{ "source": 1 }] }
//!   ]
//! }
//! ```

use crate::{graph, Graph, GraphError, Node};
use std::path::Path;

/// Serialised form of a graph.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GraphDescription {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl<S: graph::GraphState> From<&Graph<S>> for GraphDescription {
    fn from(graph: &Graph<S>) -> Self {
        Self {
            name: graph.name.clone(),
            nodes: graph.nodes.clone(),
        }
    }
}

/// Loads graph descriptions into validated [`Graph`]s.
pub struct GraphLoader;

impl GraphLoader {
    /// Parses and validates a graph from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Graph<graph::Validated>, GraphError> {
        let desc: GraphDescription = serde_json::from_str(json)?;
        Graph::new(desc.name, desc.nodes).validate()
    }

    /// Reads, parses and validates a graph from a JSON file.
    pub fn from_file(path: &Path) -> Result<Graph<graph::Validated>, GraphError> {
        let content = std::fs::read_to_string(path)?;
        let graph = Self::from_json_str(&content)?;
        tracing::info!("loaded graph from '{}': {}", path.display(), graph.summary());
        Ok(graph)
    }

    /// Serialises any graph back into the JSON description format.
    pub fn to_json_string<S: graph::GraphState>(graph: &Graph<S>) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(&GraphDescription::from(graph))?)
    }
}
