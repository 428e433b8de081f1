// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph loading and validation.

/// Errors that can occur when building or loading a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The graph description file could not be read.
    #[error("failed to read graph description: {0}")]
    Io(#[from] std::io::Error),

    /// The graph description JSON is malformed.
    #[error("failed to parse graph description: {0}")]
    Parse(#[from] serde_json::Error),

    /// A node is malformed (wrong arity, dangling edge, bad tensor).
    #[error("invalid node '{node}': {detail}")]
    InvalidNode { node: String, detail: String },

    /// The graph as a whole is malformed (e.g. contains a cycle).
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
}
