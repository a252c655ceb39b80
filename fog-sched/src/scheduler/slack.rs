/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Slack maximisation: steepest-ascent shifting of movable instances.
//!
//! An instance may move within `[lo, hi]` on its node, where
//!
//! * `lo = max(release, producer finishes, end of the previous interval)`
//! * `hi = min(deadline, consumer starts, start of the next interval, span) − WCET`
//!
//! Only instances with `hi > lo` are movable.  Each iteration tries the full
//! left shift, the full right shift and, with a non-zero step, `start ± step`
//! for every movable instance, and applies the one with the best strictly
//! improving score.  The pass stops when nothing improves or the iteration
//! budget is spent.
//!
//! Shifts never change which node an instance runs on or the order of a
//! timeline, so busy time, and therefore total free capacity, is constant.
//! The pass works on one copy of the schedule: each candidate is checked
//! with [`Schedule::check_shift`] and scored from a [`Tally`] updated for
//! the moved interval alone.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::task::NodeId;

use super::instance::{InstanceKey, InstanceSet, TaskInstance};
use super::objective::{Evaluator, Score, Tally};
use super::schedule::{Positions, Schedule};

/// Default cap on accepted moves.
pub const DEFAULT_ITERATION_BUDGET: u32 = 64;

/// Result of one slack pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Refinement {
    pub schedule: Schedule,
    pub initial_score: Score,
    pub final_score: Score,

    /// Number of accepted moves.
    pub iterations: u32,
}

pub struct SlackMaximizer {
    shift_step: u64,
    iteration_budget: u32,
}

/// One candidate move and the tally it leads to.
struct Shift {
    key: InstanceKey,
    node: NodeId,
    pos: usize,
    start: u64,
    tally: Tally,
    score: Score,
}

impl SlackMaximizer {
    pub fn new(shift_step: u64, iteration_budget: u32) -> Self {
        Self {
            shift_step,
            iteration_budget,
        }
    }

    /// Refine `schedule` under `evaluator`.  `schedule` is left untouched.
    ///
    /// `schedule` must already be valid for `instances`; every accepted move
    /// keeps it valid.
    pub fn refine(
        &self,
        schedule: &Schedule,
        instances: &InstanceSet,
        evaluator: &Evaluator<'_>,
    ) -> Refinement {
        let mut current = schedule.clone();
        let positions = current.positions();
        let mut tally = evaluator.tally(&current);
        let initial_score = evaluator.score_of(&tally);
        let mut current_score = initial_score;
        let mut iterations = 0;

        info!(
            objective = %evaluator.objective(),
            shift_step = self.shift_step,
            budget = self.iteration_budget,
            instances = positions.len(),
            primary = initial_score.primary,
            consolidation = initial_score.consolidation,
            "maximising slack"
        );

        while iterations < self.iteration_budget {
            let best = self.best_move(&current, &positions, &tally, instances, evaluator);
            let Some(shift) = best else { break };

            debug!(
                instance = %shift.key,
                to = shift.start,
                primary = shift.score.primary,
                consolidation = shift.score.consolidation,
                "accepted shift"
            );
            current.shift(shift.node, shift.pos, shift.start);
            tally = shift.tally;
            current_score = shift.score;
            iterations += 1;
        }

        info!(
            iterations,
            free_capacity = current.free_capacity(),
            windows = current.slack_windows().len(),
            primary = current_score.primary,
            consolidation = current_score.consolidation,
            "slack maximisation finished"
        );

        Refinement {
            schedule: current,
            initial_score,
            final_score: current_score,
            iterations,
        }
    }

    /// Best strictly improving single shift, if any.
    fn best_move(
        &self,
        current: &Schedule,
        positions: &Positions,
        tally: &Tally,
        instances: &InstanceSet,
        evaluator: &Evaluator<'_>,
    ) -> Option<Shift> {
        let current_score = evaluator.score_of(tally);
        let mut best: Option<Shift> = None;

        for (node, timeline) in &current.timelines {
            for (pos, interval) in timeline.iter().enumerate() {
                let Some(inst) = instances.get(&interval.instance) else {
                    continue;
                };
                let range = movement_range(inst, current, positions, instances, *node, pos);
                let Some((lo, hi)) = range else {
                    continue;
                };

                for start in self.candidates(interval.start, lo, hi) {
                    let checked = current.check_shift(instances, positions, *node, pos, start);
                    if let Err(violation) = checked {
                        debug!(instance = %inst.key, to = start, %violation, "rejected shift");
                        continue;
                    }

                    let next = evaluator.shifted(current, positions, tally, *node, pos, start);
                    let score = evaluator.score_of(&next);
                    let bar = best.as_ref().map_or(current_score, |b| b.score);
                    if score.improves_on(&bar) {
                        best = Some(Shift {
                            key: inst.key,
                            node: *node,
                            pos,
                            start,
                            tally: next,
                            score,
                        });
                    }
                }
            }
        }

        best
    }

    /// Candidate starts in `[lo, hi]`, excluding the current one.
    fn candidates(&self, start: u64, lo: u64, hi: u64) -> BTreeSet<u64> {
        let mut out = BTreeSet::from([lo, hi]);
        if self.shift_step > 0 {
            let step = self.shift_step;
            out.insert(start.saturating_sub(step).clamp(lo, hi));
            out.insert(start.saturating_add(step).clamp(lo, hi));
        }
        out.remove(&start);
        out
    }
}

/// Range of valid starts for the interval at `pos` of `node`'s timeline.
/// `None` when the instance has no room to move.
fn movement_range(
    inst: &TaskInstance,
    schedule: &Schedule,
    positions: &Positions,
    instances: &InstanceSet,
    node: NodeId,
    pos: usize,
) -> Option<(u64, u64)> {
    let (prev_finish, next_start) = schedule.neighbour_bounds(node, pos);

    let producers_finish = inst
        .predecessors
        .iter()
        .filter_map(|p| schedule.lookup(positions, *p))
        .map(|i| i.finish)
        .max()
        .unwrap_or(0);
    let lo = inst.release.max(prev_finish).max(producers_finish);

    let consumers_start = instances
        .successors_of(&inst.key)
        .iter()
        .filter_map(|s| schedule.lookup(positions, *s))
        .map(|i| i.start)
        .min()
        .unwrap_or(schedule.span);
    let hi = inst
        .deadline
        .min(next_start)
        .min(consumers_start)
        .min(schedule.span)
        .checked_sub(inst.wcet)?;

    if hi > lo {
        debug!(instance = %inst.key, node = %node, lo, hi, "movable");
        Some((lo, hi))
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
