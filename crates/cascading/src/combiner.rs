// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The cascading search: finds valid combinations of plans.
//!
//! Parts are assigned in index order, which is topological, so when a part
//! receives its plan every connection feeding it can be glued immediately.
//! A partial assignment is dropped as soon as a connection has no glue or
//! the sections built so far break a constraint; the constraints only get
//! harder as more parts are added, so nothing valid is lost by pruning.
//!
//! Two walks are available (see [`SearchMode`]): a depth-first exhaustive
//! walk capped at `max_combinations` results, and a beam search that keeps
//! the `max_combinations` cheapest partial assignments per part, ranked by
//! DRAM traffic and then by SRAM use.

use crate::cancel::CancellationToken;
use crate::capabilities::HardwareCapabilities;
use crate::combination::{connection_glue, Combination, Glue, SectionLayout};
use crate::options::{EstimationOptions, SearchMode};
use crate::part::GraphOfParts;
use crate::plan::BufferRole;
use crate::CascadingError;

/// Returns every valid combination the configured search finds.
///
/// An empty result is not an error. An empty graph of parts yields a
/// single empty combination.
pub fn combine(
    gop: &GraphOfParts,
    caps: &HardwareCapabilities,
    options: &EstimationOptions,
    cancel: &CancellationToken,
) -> Result<Vec<Combination>, CascadingError> {
    cancel.check()?;
    if gop.is_empty() {
        return Ok(vec![Combination::empty()]);
    }

    let mode = resolve_search_mode(gop, options);
    let limit = options.max_combinations.max(1);
    let mut search = Search::new(gop, caps, cancel);

    let partials = match mode {
        SearchMode::Beam => search.beam(limit)?,
        _ => {
            let mut found = Vec::new();
            search.depth_first(&mut Partial::root(gop), limit, &mut found)?;
            found
        }
    };

    let mut combinations = Vec::with_capacity(partials.len());
    for partial in partials {
        cancel.check()?;
        let combination = search.finish(partial)?;
        combination.validate(gop, caps)?;
        combinations.push(combination);
    }

    tracing::debug!(pruned = search.pruned, "search finished");
    if combinations.is_empty() {
        tracing::info!("{mode} search over {} parts found no valid combinations", gop.num_parts());
    } else {
        tracing::info!(
            "{mode} search over {} parts found {} combinations",
            gop.num_parts(),
            combinations.len(),
        );
    }
    Ok(combinations)
}

/// The walk [`combine`] will use: `Auto` becomes `Exhaustive` when the full
/// cross-product fits in `max_combinations`, `Beam` otherwise.
pub fn resolve_search_mode(gop: &GraphOfParts, options: &EstimationOptions) -> SearchMode {
    match options.search {
        SearchMode::Auto if gop.search_space() <= options.max_combinations => {
            SearchMode::Exhaustive
        }
        SearchMode::Auto => SearchMode::Beam,
        mode => mode,
    }
}

/// Plan choices for the first `plans.len()` parts.
#[derive(Debug, Clone)]
struct Partial {
    plans: Vec<usize>,
    /// Per connection; `None` until its consumer is assigned.
    glues: Vec<Option<Glue>>,
    /// SRAM each assigned part adds to its section.
    sram: Vec<usize>,
}

impl Partial {
    fn root(gop: &GraphOfParts) -> Self {
        Self {
            plans: Vec::with_capacity(gop.num_parts()),
            glues: vec![None; gop.connections.len()],
            sram: Vec::with_capacity(gop.num_parts()),
        }
    }
}

struct Search<'a> {
    gop: &'a GraphOfParts,
    caps: &'a HardwareCapabilities,
    cancel: &'a CancellationToken,
    /// Incoming connection indices per part.
    incoming: Vec<Vec<usize>>,
    pruned: usize,
}

impl<'a> Search<'a> {
    fn new(
        gop: &'a GraphOfParts,
        caps: &'a HardwareCapabilities,
        cancel: &'a CancellationToken,
    ) -> Self {
        let mut incoming = vec![Vec::new(); gop.num_parts()];
        for (i, conn) in gop.connections.iter().enumerate() {
            if let Some(list) = incoming.get_mut(conn.dest.part.index()) {
                list.push(i);
            }
        }
        Self {
            gop,
            caps,
            cancel,
            incoming,
            pruned: 0,
        }
    }

    /// Assigns `plan` to the next part in place. Returns `false`, leaving
    /// `partial` untouched, if that breaks a constraint.
    ///
    /// A part that is not cascaded into starts a section of its own with no
    /// outgoing edges yet, so only its own SRAM needs checking. Joining a
    /// section can merge sections or close a cycle, so that case lays the
    /// sections out again.
    fn push(&mut self, partial: &mut Partial, plan: usize) -> bool {
        let gop = self.gop;
        let part = partial.plans.len();
        let Some(chosen) = gop.parts.get(part).and_then(|p| p.plans.get(plan)) else {
            return false;
        };
        partial.plans.push(plan);

        let mut shared = 0;
        let mut cascaded = false;
        for &i in &self.incoming[part] {
            match connection_glue(gop, &partial.plans, i) {
                Some(glue) => {
                    if glue.is_cascade() {
                        cascaded = true;
                        let slot = gop.connections[i].dest.slot;
                        shared += chosen.buffer(BufferRole::Input(slot)).map_or(0, |b| b.size_bytes);
                    }
                    partial.glues[i] = Some(glue);
                }
                None => {
                    self.pruned += 1;
                    self.clear_last(partial);
                    return false;
                }
            }
        }

        let fits = if cascaded {
            SectionLayout::compute(gop, &partial.plans, &partial.glues)
                .is_ok_and(|layout| layout.over_capacity(self.caps).is_none())
        } else {
            chosen.sram_bytes() <= self.caps.total_sram_bytes
        };
        if !fits {
            self.pruned += 1;
            self.clear_last(partial);
            return false;
        }
        partial.sram.push(chosen.sram_bytes().saturating_sub(shared));
        true
    }

    /// Removes the plan of the last assigned part and its incoming glues.
    fn clear_last(&self, partial: &mut Partial) {
        if partial.plans.pop().is_some() {
            for &i in &self.incoming[partial.plans.len()] {
                partial.glues[i] = None;
            }
        }
    }

    /// Undoes a successful [`Search::push`].
    fn pop(&self, partial: &mut Partial) {
        partial.sram.pop();
        self.clear_last(partial);
    }

    fn depth_first(
        &mut self,
        partial: &mut Partial,
        limit: usize,
        found: &mut Vec<Partial>,
    ) -> Result<(), CascadingError> {
        self.cancel.check()?;
        let depth = partial.plans.len();
        if depth == self.gop.num_parts() {
            found.push(partial.clone());
            return Ok(());
        }

        for plan in 0..self.gop.parts[depth].num_plans() {
            if found.len() >= limit {
                break;
            }
            if self.push(partial, plan) {
                self.depth_first(partial, limit, found)?;
                self.pop(partial);
            }
        }
        Ok(())
    }

    fn beam(&mut self, width: usize) -> Result<Vec<Partial>, CascadingError> {
        let mut beam = vec![Partial::root(self.gop)];
        for depth in 0..self.gop.num_parts() {
            self.cancel.check()?;
            let mut candidates: Vec<((usize, usize), Partial)> = Vec::new();
            for partial in &mut beam {
                for plan in 0..self.gop.parts[depth].num_plans() {
                    if self.push(partial, plan) {
                        candidates.push((self.score(partial), partial.clone()));
                        self.pop(partial);
                    }
                }
            }
            // Stable: ties keep expansion order.
            candidates.sort_by_key(|(score, _)| *score);
            candidates.truncate(width);
            beam = candidates.into_iter().map(|(_, p)| p).collect();
            if beam.is_empty() {
                break;
            }
        }
        Ok(beam)
    }

    /// `(DRAM bytes, SRAM bytes)` of a partial assignment; lower is better.
    fn score(&self, partial: &Partial) -> (usize, usize) {
        let plan_dram: usize = partial
            .plans
            .iter()
            .enumerate()
            .filter_map(|(p, &i)| self.gop.parts[p].plans.get(i))
            .map(|plan| plan.dram_bytes())
            .sum();
        let glue_dram: usize = partial.glues.iter().flatten().map(Glue::dram_bytes).sum();
        (plan_dram + glue_dram, partial.sram.iter().sum())
    }

    fn finish(&self, partial: Partial) -> Result<Combination, CascadingError> {
        let glues: Vec<Glue> = partial
            .glues
            .iter()
            .copied()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CascadingError::Internal("complete assignment has unglued connections".into()))?;
        let layout = SectionLayout::compute(self.gop, &partial.plans, &partial.glues)
            .map_err(CascadingError::Internal)?;
        Ok(Combination {
            plans: partial.plans,
            glues,
            sections: layout.sections,
        })
    }
}
