// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # estimation
//!
//! Integer cost model for cascaded NPU schedules.
//!
//! [`estimate_op_graph`] turns an [`OpGraph`](cascading::OpGraph) into a
//! [`PerformanceData`] report; the aggregate [`PerformanceMetric`] has a total
//! order so combinations can be ranked. Estimation is pure: the same op graph
//! and capabilities always give the same numbers.
//!
//! A combination the model cannot handle is refused with a recoverable
//! [`EstimationError::NotSupported`]; callers skip it and carry on.

mod error;
mod estimator;
mod performance;

pub use error::EstimationError;
pub use estimator::{estimate_combination, estimate_op_graph};
pub use performance::{EstimatedOpGraph, PassPerformance, PerformanceData, PerformanceMetric};
