// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Combinations: one plan per part, glued together.
//!
//! # Boundary rules
//!
//! | Producer | Consumer | Glue |
//! |---|---|---|
//! | SRAM | SRAM, identical boundary | [`Glue::Cascade`] |
//! | DRAM | DRAM, same format | [`Glue::Dram`] |
//! | DRAM | DRAM, other format | [`Glue::Convert`] |
//! | SRAM | DRAM (or the reverse) | incompatible |
//!
//! Parts joined by cascades form a *section*: their plans are resident in
//! SRAM at the same time and run as one pass. A section must fit in SRAM
//! (the consumer half of every cascade is the producer's buffer, so it is
//! only counted once), the sections must form a DAG, and two parts of the
//! same section may only be connected through cascades.

use crate::capabilities::HardwareCapabilities;
use crate::part::{GraphOfParts, PartConnection, PartId};
use crate::plan::{Boundary, BufferRole, Location, Plan};
use crate::CascadingError;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tensor_core::DataFormat;

/// How a producer boundary is joined to a consumer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "glue", rename_all = "snake_case")]
pub enum Glue {
    /// Consumer reads the producer's SRAM buffer directly.
    Cascade,
    /// Tensor goes through DRAM unchanged.
    Dram,
    /// Tensor is re-laid-out in DRAM between the two plans.
    Convert {
        bytes_in: usize,
        bytes_out: usize,
        from: DataFormat,
        to: DataFormat,
    },
}

impl Glue {
    /// Glue joining `producer` to `consumer`, or `None` if they are incompatible.
    pub fn between(producer: &Boundary, consumer: &Boundary) -> Option<Glue> {
        match (producer.location, consumer.location) {
            (Location::Sram, Location::Sram) => (producer == consumer).then_some(Glue::Cascade),
            (Location::Dram, Location::Dram) if producer.format == consumer.format => {
                Some(Glue::Dram)
            }
            (Location::Dram, Location::Dram) => Some(Glue::Convert {
                bytes_in: producer.dram_bytes(),
                bytes_out: consumer.dram_bytes(),
                from: producer.format,
                to: consumer.format,
            }),
            _ => None,
        }
    }

    pub fn is_cascade(&self) -> bool {
        matches!(self, Glue::Cascade)
    }

    /// DRAM traffic caused by the glue itself.
    pub fn dram_bytes(&self) -> usize {
        match self {
            Glue::Convert {
                bytes_in,
                bytes_out,
                ..
            } => bytes_in + bytes_out,
            Glue::Cascade | Glue::Dram => 0,
        }
    }
}

/// A full assignment of plans to parts, validated and immutable.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Combination {
    /// Chosen plan index, per part.
    pub plans: Vec<usize>,
    /// Glue, per [`GraphOfParts::connections`] entry.
    pub glues: Vec<Glue>,
    /// Cascade sections in execution order; parts ascend within a section.
    pub sections: Vec<Vec<PartId>>,
}

impl Combination {
    /// The combination of an empty graph of parts.
    pub fn empty() -> Self {
        Self {
            plans: Vec::new(),
            glues: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn plan_for<'g>(&self, gop: &'g GraphOfParts, part: PartId) -> Option<&'g Plan> {
        let index = *self.plans.get(part.index())?;
        gop.part(part)?.plans.get(index)
    }

    pub fn num_cascades(&self) -> usize {
        self.glues.iter().filter(|g| g.is_cascade()).count()
    }

    /// Checks every invariant from scratch.
    pub fn validate(
        &self,
        gop: &GraphOfParts,
        caps: &HardwareCapabilities,
    ) -> Result<(), CascadingError> {
        let invalid = |detail: String| CascadingError::Internal(format!("invalid combination: {detail}"));

        if self.plans.len() != gop.num_parts() {
            return Err(invalid(format!(
                "{} plan choices for {} parts",
                self.plans.len(),
                gop.num_parts()
            )));
        }
        for (part, &choice) in gop.parts.iter().zip(&self.plans) {
            if choice >= part.plans.len() {
                return Err(invalid(format!(
                    "{} has {} plans, plan {choice} chosen",
                    part.id,
                    part.plans.len()
                )));
            }
        }

        if self.glues.len() != gop.connections.len() {
            return Err(invalid(format!(
                "{} glues for {} connections",
                self.glues.len(),
                gop.connections.len()
            )));
        }
        for (i, glue) in self.glues.iter().enumerate() {
            if connection_glue(gop, &self.plans, i).as_ref() != Some(glue) {
                return Err(invalid(format!("glue of connection {i} does not match its boundaries")));
            }
        }

        let glues: Vec<Option<Glue>> = self.glues.iter().copied().map(Some).collect();
        let layout = SectionLayout::compute(gop, &self.plans, &glues).map_err(invalid)?;
        if layout.sections != self.sections {
            return Err(invalid("sections do not match the cascades".into()));
        }
        if let Some((section, bytes)) = layout.over_capacity(caps) {
            return Err(invalid(format!(
                "section {section} needs {bytes} B of SRAM, capacity is {} B",
                caps.total_sram_bytes
            )));
        }
        Ok(())
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let sections: Vec<String> = self
            .sections
            .iter()
            .map(|s| {
                s.iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join("+")
            })
            .collect();
        format!(
            "plans {:?}, {} cascades, sections [{}]",
            self.plans,
            self.num_cascades(),
            sections.join(", "),
        )
    }
}

/// Glue for connection `index` given (at least partial) plan choices.
pub(crate) fn connection_glue(gop: &GraphOfParts, plans: &[usize], index: usize) -> Option<Glue> {
    let conn = gop.connections.get(index)?;
    let source_plan = gop.part(conn.source.part)?.plans.get(*plans.get(conn.source.part.index())?)?;
    let dest_plan = gop.part(conn.dest.part)?.plans.get(*plans.get(conn.dest.part.index())?)?;
    Glue::between(
        source_plan.outputs.get(conn.source.slot)?,
        dest_plan.inputs.get(conn.dest.slot)?,
    )
}

/// Sections implied by a (possibly partial) assignment of the first
/// `plans.len()` parts, with the SRAM each one needs.
#[derive(Debug)]
pub(crate) struct SectionLayout {
    pub sections: Vec<Vec<PartId>>,
    pub sram_bytes: Vec<usize>,
}

impl SectionLayout {
    /// Groups assigned parts by cascades. `glues[i]` is `None` for
    /// connections whose consumer is not assigned yet.
    ///
    /// Fails when a non-cascade connection stays inside a section or the
    /// sections do not form a DAG.
    pub fn compute(
        gop: &GraphOfParts,
        plans: &[usize],
        glues: &[Option<Glue>],
    ) -> Result<Self, String> {
        let n = plans.len();
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        let decided: Vec<(&PartConnection, Glue)> = gop
            .connections
            .iter()
            .zip(glues)
            .filter_map(|(c, g)| g.map(|g| (c, g)))
            .filter(|(c, _)| c.dest.part.index() < n)
            .collect();

        for &(conn, glue) in &decided {
            if glue.is_cascade() {
                let a = find(&mut parent, conn.source.part.index());
                let b = find(&mut parent, conn.dest.part.index());
                // Keep the lowest part id as the root.
                parent[a.max(b)] = a.min(b);
            }
        }

        // Roots in ascending order identify the sections.
        let roots: Vec<usize> = (0..n).map(|p| find(&mut parent, p)).collect();
        let mut section_of = vec![usize::MAX; n];
        let mut members: Vec<Vec<PartId>> = Vec::new();
        for p in 0..n {
            let root = roots[p];
            if section_of[root] == usize::MAX {
                section_of[root] = members.len();
                members.push(Vec::new());
            }
            let s = section_of[root];
            section_of[p] = s;
            members[s].push(PartId(p));
        }

        let mut sram_bytes: Vec<usize> = members
            .iter()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|&p| gop.part(p).and_then(|part| part.plans.get(plans[p.index()])))
                    .map(Plan::sram_bytes)
                    .sum()
            })
            .collect();

        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); members.len()];
        let mut in_degree = vec![0usize; members.len()];
        for &(conn, glue) in &decided {
            let src = section_of[conn.source.part.index()];
            let dst = section_of[conn.dest.part.index()];
            if glue.is_cascade() {
                let shared = gop
                    .part(conn.dest.part)
                    .and_then(|part| part.plans.get(plans[conn.dest.part.index()]))
                    .and_then(|plan| plan.buffer(BufferRole::Input(conn.dest.slot)))
                    .map_or(0, |b| b.size_bytes);
                sram_bytes[dst] = sram_bytes[dst].saturating_sub(shared);
            } else if src == dst {
                return Err(format!(
                    "non-cascade connection {} -> {} inside one section",
                    conn.source.part, conn.dest.part
                ));
            } else if !edges[src].contains(&dst) {
                edges[src].push(dst);
                in_degree[dst] += 1;
            }
        }

        // Kahn over sections, lowest first part first.
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(s, _)| Reverse(s))
            .collect();
        let mut order = Vec::with_capacity(members.len());
        while let Some(Reverse(s)) = ready.pop() {
            order.push(s);
            for &next in &edges[s] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }
        if order.len() != members.len() {
            return Err("sections form a cycle".into());
        }

        Ok(Self {
            sections: order.iter().map(|&s| members[s].clone()).collect(),
            sram_bytes: order.iter().map(|&s| sram_bytes[s]).collect(),
        })
    }

    /// First section (in execution order) exceeding SRAM capacity.
    pub fn over_capacity(&self, caps: &HardwareCapabilities) -> Option<(usize, usize)> {
        self.sram_bytes
            .iter()
            .enumerate()
            .find(|(_, &b)| b > caps.total_sram_bytes)
            .map(|(s, &b)| (s, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{Shape, TensorInfo};

    fn boundary(location: Location, format: DataFormat) -> Boundary {
        Boundary {
            location,
            format,
            tensor: TensorInfo::nhwc_u8(1, 10, 10, 10),
            stripe: Shape::nhwc(1, 10, 10, 10),
            num_buffers: 1,
            buffer_bytes: 4096,
        }
    }

    #[test]
    fn test_glue_rules() {
        let sram = boundary(Location::Sram, DataFormat::Nhwcb);
        let nhwc = boundary(Location::Dram, DataFormat::Nhwc);
        let nhwcb = boundary(Location::Dram, DataFormat::Nhwcb);

        assert_eq!(Glue::between(&sram, &sram), Some(Glue::Cascade));
        assert_eq!(Glue::between(&nhwc, &nhwc), Some(Glue::Dram));
        assert_eq!(Glue::between(&sram, &nhwcb), None);
        assert_eq!(Glue::between(&nhwcb, &sram), None);

        let convert = Glue::between(&nhwc, &nhwcb).unwrap();
        assert_eq!(
            convert,
            Glue::Convert {
                bytes_in: 1000,
                bytes_out: 16 * 16 * 16,
                from: DataFormat::Nhwc,
                to: DataFormat::Nhwcb,
            }
        );
        assert_eq!(convert.dram_bytes(), 1000 + 4096);
    }

    #[test]
    fn test_sram_mismatch_is_incompatible() {
        let a = boundary(Location::Sram, DataFormat::Nhwcb);
        let mut b = a.clone();
        b.num_buffers = 2;
        assert_eq!(Glue::between(&a, &b), None);
        let mut c = a.clone();
        c.stripe = Shape::nhwc(1, 8, 10, 10);
        assert_eq!(Glue::between(&a, &c), None);
    }

    #[test]
    fn test_empty_combination_summary() {
        let c = Combination::empty();
        assert_eq!(c.num_cascades(), 0);
        assert!(c.summary().contains("0 cascades"));
        c.validate(&GraphOfParts::default(), &HardwareCapabilities::default())
            .unwrap();
    }
}
