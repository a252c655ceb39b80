/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Objectives of the slack pass.
//!
//! Each objective maps a schedule to a [`Score`].  Scores compare
//! lexicographically: first the objective's own primary value, then the
//! consolidation term `Σ len²` over all slack windows, which rewards fewer,
//! larger free windows over many small ones.  Higher is better for both.
//!
//! | Objective | Primary value |
//! |---|---|
//! | `cumulated_free` | free capacity − `switch_time` × criticality switches |
//! | `nrml_dist_free` | −variance of slack window lengths |
//! | `min_e2e_app_del` | −Σ end-to-end delay |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::graph::TaskGraph;
use crate::task::{NodeId, TaskId};

use super::error::SchedulerError;
use super::instance::{InstanceKey, InstanceSet};
use super::schedule::{Interval, Positions, Schedule};

/// Tolerance when comparing scores.
const SCORE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Maximise total free capacity, net of partition switch costs.
    #[default]
    CumulatedFree,

    /// Spread free capacity as evenly as possible across windows.
    NrmlDistFree,

    /// Minimise the end-to-end delay of applications.
    MinE2eAppDel,
}

impl Objective {
    pub fn name(self) -> &'static str {
        match self {
            Objective::CumulatedFree => "cumulated_free",
            Objective::NrmlDistFree => "nrml_dist_free",
            Objective::MinE2eAppDel => "min_e2e_app_del",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Objective {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "cumulated_free" => Ok(Objective::CumulatedFree),
            "nrml_dist_free" => Ok(Objective::NrmlDistFree),
            "min_e2e_app_del" => Ok(Objective::MinE2eAppDel),
            _ => Err(SchedulerError::UnknownObjective(s.to_string())),
        }
    }
}

// ── Score ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub primary: f64,
    pub consolidation: f64,
}

impl Score {
    /// Strict lexicographic improvement over `other`.
    pub fn improves_on(&self, other: &Score) -> bool {
        if (self.primary - other.primary).abs() > SCORE_EPSILON {
            return self.primary > other.primary;
        }
        self.consolidation > other.consolidation + SCORE_EPSILON
    }
}

// ── Tally ─────────────────────────────────────────────────────────────────────

/// Running totals a [`Score`] is derived from.
///
/// The slack pass keeps one tally current across shifts, updating it from
/// the two windows around the moved interval and, for application
/// instances, from that one application run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Non-empty slack windows.
    windows: u64,
    free: u64,
    /// `Σ len²` over slack windows.
    squares: u128,
    switches: u64,
    delay: u64,
}

impl Tally {
    fn add_window(&mut self, len: u64) {
        if len > 0 {
            self.windows += 1;
            self.free += len;
            self.squares += u128::from(len).pow(2);
        }
    }

    fn remove_window(&mut self, len: u64) {
        if len > 0 {
            self.windows -= 1;
            self.free -= len;
            self.squares -= u128::from(len).pow(2);
        }
    }

    /// Population variance of window lengths, `(n·Σx² − (Σx)²) / n²`.
    fn variance(&self) -> f64 {
        if self.windows == 0 {
            return 0.0;
        }
        let n = u128::from(self.windows);
        let spread = (n * self.squares).saturating_sub(u128::from(self.free).pow(2));
        spread as f64 / (n * n) as f64
    }
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

/// Scores schedules of one instance set under one objective.
pub struct Evaluator<'a> {
    objective: Objective,
    instances: &'a InstanceSet,
    apps: BTreeMap<TaskId, &'a str>,
    members: BTreeMap<&'a str, Vec<TaskId>>,
    switch_time: u64,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        objective: Objective,
        graph: &'a TaskGraph,
        instances: &'a InstanceSet,
        switch_time: u64,
    ) -> Self {
        let apps: BTreeMap<TaskId, &'a str> = graph
            .tasks()
            .iter()
            .filter_map(|t| t.app.as_deref().map(|app| (t.id, app)))
            .collect();
        let mut members: BTreeMap<&'a str, Vec<TaskId>> = BTreeMap::new();
        for (task, app) in &apps {
            members.entry(*app).or_default().push(*task);
        }
        Self {
            objective,
            instances,
            apps,
            members,
            switch_time,
        }
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn score(&self, schedule: &Schedule) -> Score {
        self.score_of(&self.tally(schedule))
    }

    /// Tally of the whole schedule.
    pub fn tally(&self, schedule: &Schedule) -> Tally {
        let mut tally = Tally {
            windows: 0,
            free: 0,
            squares: 0,
            switches: self.criticality_switches(schedule),
            delay: self.end_to_end_delay(schedule),
        };
        for window in schedule.slack_windows() {
            tally.add_window(window.len());
        }
        tally
    }

    pub fn score_of(&self, tally: &Tally) -> Score {
        let primary = match self.objective {
            Objective::CumulatedFree => {
                tally.free as f64 - self.switch_time.saturating_mul(tally.switches) as f64
            }
            Objective::NrmlDistFree => -tally.variance(),
            Objective::MinE2eAppDel => -(tally.delay as f64),
        };

        Score {
            primary,
            consolidation: tally.squares as f64,
        }
    }

    /// Tally after moving the interval at `pos` of `node` to `start`.
    ///
    /// The move must keep the timeline ordered (see
    /// [`Schedule::check_shift`]); criticality switches are then unchanged.
    pub fn shifted(
        &self,
        schedule: &Schedule,
        positions: &Positions,
        tally: &Tally,
        node: NodeId,
        pos: usize,
        start: u64,
    ) -> Tally {
        let Some(moved) = schedule.at(node, pos) else {
            return *tally;
        };
        let finish = start + moved.len();
        let (prev_finish, next_start) = schedule.neighbour_bounds(node, pos);

        let mut next = *tally;
        next.remove_window(moved.start.saturating_sub(prev_finish));
        next.remove_window(next_start.saturating_sub(moved.finish));
        next.add_window(start.saturating_sub(prev_finish));
        next.add_window(next_start.saturating_sub(finish));

        next.delay = match self.apps.get(&moved.instance.task) {
            Some(app) => {
                let (before, after) = self.run_delays(schedule, positions, app, moved, start);
                next.delay - before + after
            }
            // response time moves with the start
            None => next.delay + start - moved.start,
        };

        next
    }

    /// Consecutive intervals on one node whose criticality differs.
    pub fn criticality_switches(&self, schedule: &Schedule) -> u64 {
        let mut switches = 0;
        for timeline in schedule.timelines.values() {
            let levels: Vec<_> = timeline
                .iter()
                .filter_map(|i| self.instances.get(&i.instance))
                .map(|i| i.criticality)
                .collect();
            switches += levels.windows(2).filter(|w| w[0] != w[1]).count() as u64;
        }
        switches
    }

    /// Sum of end-to-end delays.
    ///
    /// Instances of one application sharing an activation index form one
    /// run of that application; its delay is last finish − first start.
    /// Instances of tasks without an application count their response time.
    pub fn end_to_end_delay(&self, schedule: &Schedule) -> u64 {
        let mut runs: BTreeMap<(&str, u32), (u64, u64)> = BTreeMap::new();
        let mut total = 0;

        for (key, (_, interval)) in schedule.placements() {
            match self.apps.get(&key.task) {
                Some(app) => {
                    let run = runs
                        .entry((*app, key.index))
                        .or_insert((interval.start, interval.finish));
                    run.0 = run.0.min(interval.start);
                    run.1 = run.1.max(interval.finish);
                }
                None => {
                    let release = self
                        .instances
                        .get(&key)
                        .map_or(interval.start, |i| i.release);
                    total += interval.finish - release;
                }
            }
        }

        total + runs.values().map(|(first, last)| last - first).sum::<u64>()
    }

    /// Delay of the run containing `moved`, before and after it moves to
    /// `start`.
    fn run_delays(
        &self,
        schedule: &Schedule,
        positions: &Positions,
        app: &str,
        moved: &Interval,
        start: u64,
    ) -> (u64, u64) {
        let mut before = (moved.start, moved.finish);
        let mut after = (start, start + moved.len());

        let index = moved.instance.index;
        for task in self.members.get(app).into_iter().flatten() {
            let key = InstanceKey::new(*task, index);
            if key == moved.instance {
                continue;
            }
            if let Some(other) = schedule.lookup(positions, key) {
                before = (before.0.min(other.start), before.1.max(other.finish));
                after = (after.0.min(other.start), after.1.max(other.finish));
            }
        }

        (before.1 - before.0, after.1 - after.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
