// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the compiler.

/// Errors that can end a compilation.
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    /// Some part of the network cannot be compiled.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// The search produced no valid combination of plans.
    #[error("no valid combinations of plans")]
    NoValidCombinations,

    /// Every valid combination was refused by the estimator.
    #[error("no best combination: all {failures} combination(s) failed estimation")]
    NoBestCombination { failures: usize },

    /// An internal invariant was violated.
    #[error("internal compiler error: {0}")]
    Internal(String),

    /// The compilation was cancelled.
    #[error("compilation cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The input graph could not be loaded or validated.
    #[error("graph error: {0}")]
    Graph(#[from] network_ir::GraphError),

    /// Partitioning, plan generation or the combination search failed.
    #[error("cascading error: {0}")]
    Cascading(#[from] cascading::CascadingError),

    /// An SRAM size or allocation was rejected.
    #[error("memory error: {0}")]
    Memory(#[from] sram_allocator::MemoryError),
}

impl CompilerError {
    /// Lifts the cascading variants that have a direct counterpart here.
    pub(crate) fn from_cascading(e: cascading::CascadingError) -> Self {
        match e {
            cascading::CascadingError::NotSupported(msg) => CompilerError::NotSupported(msg),
            cascading::CascadingError::Cancelled => CompilerError::Cancelled,
            other => CompilerError::Cascading(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascading::CascadingError;

    #[test]
    fn test_cascading_errors_are_lifted() {
        assert!(matches!(
            CompilerError::from_cascading(CascadingError::Cancelled),
            CompilerError::Cancelled
        ));
        assert!(matches!(
            CompilerError::from_cascading(CascadingError::NotSupported("x".into())),
            CompilerError::NotSupported(m) if m == "x"
        ));
        assert!(matches!(
            CompilerError::from_cascading(CascadingError::Internal("y".into())),
            CompilerError::Cascading(CascadingError::Internal(_))
        ));
    }

    #[test]
    fn test_display() {
        let e = CompilerError::NoBestCombination { failures: 3 };
        assert_eq!(
            e.to_string(),
            "no best combination: all 3 combination(s) failed estimation"
        );
    }
}
