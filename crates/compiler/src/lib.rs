// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # compiler
//!
//! Drives a validated network through the whole backend:
//! - `cascading` splits it into parts, generates plans per part and
//!   searches for valid combinations of plans.
//! - `estimation` lowers and estimates every combination.
//! - The most performant combination wins and is returned as a
//!   [`CompiledNetwork`].
//!
//! # Type-State Pipeline
//! ```text
//! Compilation<Idle> → <Partitioned> → <Planned> → <Combined> → CompiledNetwork
//! ```
//! Transitions are compile-time checked. [`compile`] runs them all.
//!
//! # Parallelism
//! Plan generation and estimation use the rayon pool when
//! `CompilerConfig::parallel` is set. Results are collected in order, so
//! the outcome does not depend on scheduling.

mod config;
pub mod diagnostics;
mod error;
mod pipeline;
mod report;

pub use config::CompilerConfig;
pub use diagnostics::{DebugContext, DebugLevel};
pub use error::CompilerError;
pub use pipeline::{
    compile, BestSelector, Combined, Compilation, CompilationState, Idle, Partitioned, Planned,
};
pub use report::{CompiledNetwork, SearchStats};
