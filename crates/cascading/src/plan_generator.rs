// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Plan generation: fills every part with its candidate plans.
//!
//! Host parts (network inputs and outputs) get a single plan with their
//! tensors in DRAM as NHWC. Compute parts get one plan per combination of
//!
//! - an output stripe shape proposed by an enabled [`StripeStrategy`], and
//! - a location/layout for every input and output slot.
//!
//! Plans that do not fit in SRAM on their own are dropped. A part may end
//! up with no plans at all; the combiner then finds no combinations.
//!
//! [`StripeStrategy`]: crate::strategy::StripeStrategy

use crate::capabilities::HardwareCapabilities;
use crate::options::CompilationOptions;
use crate::part::{GraphOfParts, Part};
use crate::plan::{Boundary, BufferRole, Location, Plan, PlanBuilder, PlanOp};
use crate::CascadingError;
use network_ir::{graph::Validated, Graph, MceKind, Node, NodeId, NodeKind};
use rayon::prelude::*;
use tensor_core::{DType, DataFormat, Shape, TensorInfo};

/// Populates `Part::plans` for every part of `gop`.
pub fn create_plans(
    gop: &mut GraphOfParts,
    graph: &Graph<Validated>,
    caps: &HardwareCapabilities,
    options: &CompilationOptions,
) -> Result<(), CascadingError> {
    let generator = PlanGenerator {
        graph,
        caps,
        options,
    };

    let results: Vec<Result<Vec<Plan>, CascadingError>> = if options.parallel {
        gop.parts.par_iter().map(|p| generator.plans_for(p)).collect()
    } else {
        gop.parts.iter().map(|p| generator.plans_for(p)).collect()
    };

    for (part, plans) in gop.parts.iter_mut().zip(results) {
        part.plans = plans?;
        if part.plans.is_empty() {
            tracing::warn!(part = %part.id, tag = %part.debug_tag, "no feasible plans");
        } else {
            tracing::debug!(part = %part.id, tag = %part.debug_tag, plans = part.plans.len(), "plans generated");
        }
    }

    tracing::info!(
        "generated {} plans for {} parts (strategies: {})",
        gop.total_plans(),
        gop.num_parts(),
        options.strategy_names().join(", "),
    );
    Ok(())
}

struct PlanGenerator<'a> {
    graph: &'a Graph<Validated>,
    caps: &'a HardwareCapabilities,
    options: &'a CompilationOptions,
}

/// SRAM footprint of one input slot for a given output stripe.
struct InputGeometry {
    tensor: TensorInfo,
    stripe: Shape,
    /// How many times the input stripe is fetched.
    loads: usize,
    num_buffers: usize,
    buffer_bytes: usize,
}

struct WeightGeometry {
    format: DataFormat,
    total_bytes: usize,
    buffer_bytes: usize,
}

/// Everything about a compute part that depends only on the output stripe.
struct StripeGeometry {
    stripe: Shape,
    num_buffers: usize,
    buffer_bytes: usize,
    inputs: Vec<InputGeometry>,
    weights: Option<WeightGeometry>,
    compute: PlanOp,
}

impl PlanGenerator<'_> {
    fn node(&self, id: NodeId) -> Result<&Node, CascadingError> {
        self.graph
            .node(id)
            .ok_or_else(|| CascadingError::Internal(format!("part references missing node {id}")))
    }

    fn plans_for(&self, part: &Part) -> Result<Vec<Plan>, CascadingError> {
        let first = self.node(part.first_node())?;
        match first.kind {
            NodeKind::Input => self.input_plan(part).map(|p| vec![p]),
            NodeKind::Output => self.output_plan(part).map(|p| vec![p]),
            _ => self.compute_plans(part),
        }
    }

    fn input_plan(&self, part: &Part) -> Result<Plan, CascadingError> {
        let node = self.node(part.first_node())?;
        let mut builder = PlanBuilder::new("host");
        for slot in &part.outputs {
            let tensor = node.output(slot.output_index).cloned().ok_or_else(|| {
                CascadingError::Internal(format!("{} has no output {}", node.name, slot.output_index))
            })?;
            builder.output(Boundary::dram(tensor, DataFormat::Nhwc));
        }
        Ok(builder.build())
    }

    fn output_plan(&self, part: &Part) -> Result<Plan, CascadingError> {
        let mut builder = PlanBuilder::new("host");
        for tensor in self.input_tensors(part)? {
            builder.input(Boundary::dram(tensor, DataFormat::Nhwc));
        }
        Ok(builder.build())
    }

    fn input_tensors(&self, part: &Part) -> Result<Vec<TensorInfo>, CascadingError> {
        part.inputs
            .iter()
            .map(|slot| {
                self.graph.edge_tensor(&slot.edge).cloned().ok_or_else(|| {
                    CascadingError::Internal(format!(
                        "dangling edge {}:{} into {}",
                        slot.edge.source, slot.edge.output, part.id
                    ))
                })
            })
            .collect()
    }

    fn compute_plans(&self, part: &Part) -> Result<Vec<Plan>, CascadingError> {
        let main = self.node(part.first_node())?;
        let last = self.node(part.last_node())?;
        let output = last.output(0).cloned().ok_or_else(|| {
            CascadingError::Internal(format!("compute node '{}' has no output", last.name))
        })?;
        let inputs = self.input_tensors(part)?;

        // Several strategies may propose the same stripe; keep the first.
        let mut stripes: Vec<(&str, Shape)> = Vec::new();
        for strategy in &self.options.strategies {
            for shape in strategy.propose(&output.shape) {
                if !stripes.iter().any(|(_, s)| *s == shape) {
                    stripes.push((strategy.name(), shape));
                }
            }
        }

        let choices = self.location_choices();
        let slots = inputs.len() + part.outputs.len();
        let slot_layouts = bounded_assignments(&choices, slots, MAX_SLOT_LAYOUTS).unwrap_or_else(|| {
            tracing::warn!(
                "{} has {slots} boundary slots; trying only uniform layouts",
                part.id
            );
            choices.iter().map(|&c| vec![c; slots]).collect()
        });

        let mut plans = Vec::new();
        for (strategy, stripe) in stripes {
            let geometry = self.geometry(part, main, &inputs, &output, stripe);
            for layout in &slot_layouts {
                let (input_layout, output_layout) = layout.split_at(inputs.len());
                let plan = self.build_plan(strategy, &geometry, &output, input_layout, output_layout);
                if plan.sram_bytes() <= self.caps.total_sram_bytes {
                    plans.push(plan);
                }
            }
        }
        Ok(plans)
    }

    fn location_choices(&self) -> Vec<(Location, DataFormat)> {
        let mut choices = vec![
            (Location::Dram, DataFormat::Nhwcb),
            (Location::Dram, DataFormat::Nhwc),
        ];
        if self.options.enable_cascading {
            choices.push((Location::Sram, DataFormat::Nhwcb));
        }
        choices
    }

    fn geometry(
        &self,
        part: &Part,
        main: &Node,
        inputs: &[TensorInfo],
        output: &TensorInfo,
        stripe: Shape,
    ) -> StripeGeometry {
        let num_stripes = output.shape.num_stripes(&stripe).max(1);
        let num_buffers = buffer_count(num_stripes);
        let buffer_bytes =
            self.caps.align(output.stripe_bytes(&stripe, DataFormat::Nhwcb)) * num_buffers;

        let input_geometry = inputs
            .iter()
            .map(|tensor| {
                let in_stripe = input_stripe(&main.kind, &tensor.shape, &output.shape, &stripe);
                let full = Shape::from(tensor.shape.as_nhwc().to_vec());
                let loads = if in_stripe == full { 1 } else { num_stripes };
                let n = buffer_count(loads);
                InputGeometry {
                    tensor: tensor.clone(),
                    buffer_bytes: self.caps.align(tensor.stripe_bytes(&in_stripe, DataFormat::Nhwcb))
                        * n,
                    stripe: in_stripe,
                    loads,
                    num_buffers: n,
                }
            })
            .collect::<Vec<_>>();

        let out_elements = output.shape.num_elements() as u64;
        let (weights, compute) = match main.kind {
            NodeKind::Mce(op) => {
                let in_shape = inputs.first().map(|t| t.shape.as_nhwc()).unwrap_or([1; 4]);
                let [_, in_h, in_w, in_c] = in_shape;
                let [kh, kw] = op.kernel;
                let flat = in_h.saturating_mul(in_w).saturating_mul(in_c);
                let out_c = output.shape.channels();
                let stripe_c = stripe.channels();
                let (format, full, sliced, macs_per_output) = match op.op {
                    MceKind::Convolution => (
                        DataFormat::Hwio,
                        Shape::new(vec![kh, kw, in_c, out_c]),
                        Shape::new(vec![kh, kw, in_c, stripe_c]),
                        kh.saturating_mul(kw).saturating_mul(in_c),
                    ),
                    MceKind::DepthwiseConvolution => (
                        DataFormat::Hwim,
                        Shape::new(vec![kh, kw, out_c, 1]),
                        Shape::new(vec![kh, kw, stripe_c, 1]),
                        kh.saturating_mul(kw),
                    ),
                    MceKind::FullyConnected => (
                        DataFormat::Hwio,
                        Shape::new(vec![1, 1, flat, out_c]),
                        Shape::new(vec![1, 1, flat, stripe_c]),
                        flat,
                    ),
                };
                let depth_stripes = out_c.div_ceil(stripe_c.max(1));
                let weight_tensor = TensorInfo::new(full, DType::U8);
                let weights = WeightGeometry {
                    format,
                    total_bytes: weight_tensor.size_bytes(format),
                    buffer_bytes: self.caps.align(weight_tensor.stripe_bytes(&sliced, format))
                        * buffer_count(depth_stripes),
                };
                let compute = PlanOp::Mce {
                    node: part.first_node(),
                    macs: out_elements.saturating_mul(macs_per_output as u64),
                    stripes: num_stripes,
                    fused: part.nodes[1..].to_vec(),
                };
                (Some(weights), compute)
            }
            NodeKind::Ple { op } => {
                let (size, _) = op.window();
                let per_output = size.saturating_mul(size).max(op.num_inputs()) as u64;
                let compute = PlanOp::Ple {
                    node: part.first_node(),
                    elements: out_elements.saturating_mul(per_output),
                    stripes: num_stripes,
                };
                (None, compute)
            }
            _ => {
                let compute = PlanOp::Ple {
                    node: part.first_node(),
                    elements: out_elements,
                    stripes: num_stripes,
                };
                (None, compute)
            }
        };

        StripeGeometry {
            stripe,
            num_buffers,
            buffer_bytes,
            inputs: input_geometry,
            weights,
            compute,
        }
    }

    fn build_plan(
        &self,
        strategy: &str,
        geometry: &StripeGeometry,
        output: &TensorInfo,
        input_layout: &[(Location, DataFormat)],
        output_layout: &[(Location, DataFormat)],
    ) -> Plan {
        let mut builder = PlanBuilder::new(strategy);

        for (slot, (input, &(location, format))) in
            geometry.inputs.iter().zip(input_layout).enumerate()
        {
            builder
                .input(Boundary {
                    location,
                    format,
                    tensor: input.tensor.clone(),
                    stripe: input.stripe.clone(),
                    num_buffers: input.num_buffers,
                    buffer_bytes: input.buffer_bytes,
                })
                .buffer(BufferRole::Input(slot), input.buffer_bytes);
            if location == Location::Dram {
                builder.op(PlanOp::DmaLoad {
                    bytes: input.tensor.stripe_bytes(&input.stripe, format) * input.loads,
                    format,
                });
            }
        }

        if let Some(weights) = &geometry.weights {
            builder
                .buffer(BufferRole::Weights, weights.buffer_bytes)
                .op(PlanOp::DmaLoad {
                    bytes: weights.total_bytes,
                    format: weights.format,
                });
        }

        builder.op(geometry.compute.clone());

        for (slot, &(location, format)) in output_layout.iter().enumerate() {
            builder
                .output(Boundary {
                    location,
                    format,
                    tensor: output.clone(),
                    stripe: geometry.stripe.clone(),
                    num_buffers: geometry.num_buffers,
                    buffer_bytes: geometry.buffer_bytes,
                })
                .buffer(BufferRole::Output(slot), geometry.buffer_bytes);
            if location == Location::Dram {
                builder.op(PlanOp::DmaStore {
                    bytes: output.size_bytes(format),
                    format,
                });
            }
        }

        builder.build()
    }
}

/// Double-buffer whenever more than one stripe streams through.
fn buffer_count(stripes: usize) -> usize {
    if stripes > 1 {
        2
    } else {
        1
    }
}

/// Input stripe needed to produce `out_stripe` of an output of shape `out_full`.
///
/// Windowed ops (convolutions, pooling) need a halo of `kernel - stride`
/// extra rows/columns; non-depthwise MCE ops need the full input depth.
fn input_stripe(kind: &NodeKind, in_full: &Shape, out_full: &Shape, out_stripe: &Shape) -> Shape {
    let [n, in_h, in_w, in_c] = in_full.as_nhwc();
    let (kernel, stride, full_depth) = match kind {
        NodeKind::Mce(op) => match op.op {
            MceKind::FullyConnected => return Shape::nhwc(n, in_h, in_w, in_c),
            MceKind::Convolution => (op.kernel, op.stride, true),
            MceKind::DepthwiseConvolution => (op.kernel, op.stride, false),
        },
        NodeKind::Ple { op } => {
            let (size, stride) = op.window();
            ([size, size], [stride, stride], false)
        }
        _ => ([1, 1], [1, 1], false),
    };

    let extent = |out_s: usize, out_f: usize, in_f: usize, k: usize, s: usize| {
        if out_s >= out_f {
            in_f
        } else {
            in_f.min((out_s - 1).saturating_mul(s).saturating_add(k))
        }
    };
    let h = extent(out_stripe.height(), out_full.height(), in_h, kernel[0], stride[0]);
    let w = extent(out_stripe.width(), out_full.width(), in_w, kernel[1], stride[1]);
    let c = if full_depth || out_stripe.channels() >= out_full.channels() {
        in_c
    } else {
        in_c.min(out_stripe.channels())
    };
    Shape::nhwc(n, h, w, c)
}

/// Most boundary layouts tried per stripe shape (three choices on five slots).
const MAX_SLOT_LAYOUTS: usize = 243;

/// [`assignments`], or `None` when there would be more than `limit` of them.
fn bounded_assignments<T: Copy>(choices: &[T], slots: usize, limit: usize) -> Option<Vec<Vec<T>>> {
    let count = u32::try_from(slots)
        .ok()
        .and_then(|s| choices.len().checked_pow(s))?;
    (count <= limit).then(|| assignments(choices, slots))
}

/// Every way of assigning one of `choices` to each of `slots` slots.
fn assignments<T: Copy>(choices: &[T], slots: usize) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = vec![Vec::with_capacity(slots)];
    for _ in 0..slots {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                choices.iter().map(move |&c| {
                    let mut next = prefix.clone();
                    next.push(c);
                    next
                })
            })
            .collect();
    }
    out
}
