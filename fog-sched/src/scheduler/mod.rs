/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Static scheduler pipeline.
//!
//! [`StaticScheduler::run`] takes a validated [`TaskGraph`] through:
//!
//! ```text
//! horizon ─► utilisation filter ─► expansion ─► construction ─► slack pass
//! ```
//!
//! | Stage | Module | Failure |
//! |---|---|---|
//! | Horizon | [`crate::hyperperiod`] | `Horizon` |
//! | Utilisation filter | [`feasibility`] | `UtilizationExceeded` |
//! | Expansion | [`instance`] | `TooManyActivations` |
//! | Construction | [`constructor`] | `ScheduleInfeasible`, `InvariantViolation` |
//! | Slack pass | [`slack`], [`objective`] | none (every move is checked) |
//!
//! The scheduler is stateless: all per-run state lives inside `run()`, and
//! the [`RunConfig`] it holds is never mutated.  Identical inputs give
//! identical outcomes.
//!
//! # Example
//! ```rust
//! use fog_sched::config::RunConfig;
//! use fog_sched::graph::TaskGraph;
//! use fog_sched::scheduler::StaticScheduler;
//! use fog_sched::task::{Node, Task};
//!
//! let graph = TaskGraph::new(
//!     vec![Node::new(0, "fog-a")],
//!     vec![
//!         Task::periodic(1, 2, 10).on_nodes([0]),
//!         Task::periodic(2, 2, 10).on_nodes([0]),
//!     ],
//! )
//! .unwrap();
//!
//! let outcome = StaticScheduler::new(RunConfig::default()).run(&graph).unwrap();
//! assert_eq!(outcome.free_capacity, 6);
//! ```

pub mod constructor;
pub mod error;
pub mod feasibility;
pub mod instance;
pub mod objective;
pub mod policy;
pub mod schedule;
pub mod slack;

pub use error::SchedulerError;
pub use feasibility::{FeasibilityReport, NodeSet};
pub use instance::{InstanceKey, InstanceSet, TaskInstance};
pub use objective::{Objective, Score};
pub use policy::Policy;
pub use schedule::{Interval, InvariantViolation, Schedule, SlackWindow};

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::graph::TaskGraph;
use crate::hyperperiod::{resolve_horizon, HorizonInfo};
use crate::task::TaskId;

use constructor::ScheduleConstructor;
use feasibility::check_utilization;
use objective::Evaluator;
use slack::SlackMaximizer;

// ── Results ───────────────────────────────────────────────────────────────────

/// Everything a renderer needs about one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleOutcome {
    pub policy: Policy,
    pub objective: Objective,
    pub horizon: HorizonInfo,
    pub feasibility: FeasibilityReport,

    /// Schedule as built by the constructor, before the slack pass.
    pub constructed: Schedule,

    /// Schedule after the slack pass.
    pub schedule: Schedule,

    /// Slack windows of `schedule`.
    pub slack_windows: Vec<SlackWindow>,
    pub free_capacity: u64,

    pub initial_score: Score,
    pub final_score: Score,

    /// Accepted slack-pass moves.
    pub iterations: u32,
}

/// What stopped a task set from being scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Culprit {
    /// Rejected by the utilisation filter.
    Task(TaskId),
    /// Could not be placed by the constructor.
    Instance(InstanceKey),
}

impl fmt::Display for Culprit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Culprit::Task(id) => write!(f, "task {id}"),
            Culprit::Instance(key) => write!(f, "instance {key}"),
        }
    }
}

/// Constructive feasibility verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeasibilityVerdict {
    pub feasible: bool,
    pub culprit: Option<Culprit>,
}

// ── StaticScheduler ───────────────────────────────────────────────────────────

pub struct StaticScheduler {
    config: RunConfig,
}

/// Intermediate products of the first four stages.
struct Constructed {
    horizon: HorizonInfo,
    feasibility: FeasibilityReport,
    instances: InstanceSet,
    schedule: Schedule,
}

impl StaticScheduler {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Schedule `graph` and maximise its slack.
    ///
    /// # Errors
    /// Any [`SchedulerError`] raised by a pipeline stage.  No partial
    /// schedule is ever returned.
    pub fn run(&self, graph: &TaskGraph) -> Result<ScheduleOutcome, SchedulerError> {
        info!(
            policy = %self.config.policy,
            objective = %self.config.objective,
            tasks = graph.tasks().len(),
            nodes = graph.nodes().count(),
            edges = graph.edge_count(),
            "=== StaticScheduler::run() ==="
        );

        let Constructed {
            horizon,
            feasibility,
            instances,
            schedule,
        } = self.construct(graph)?;

        let evaluator = Evaluator::new(
            self.config.objective,
            graph,
            &instances,
            self.config.switch_time,
        );
        let maximizer = SlackMaximizer::new(self.config.shift_step, self.config.iteration_budget);
        let refinement = maximizer.refine(&schedule, &instances, &evaluator);

        // The slack pass checks each move locally; the result is checked whole.
        refinement.schedule.validate(&instances)?;

        let outcome = ScheduleOutcome {
            policy: self.config.policy,
            objective: self.config.objective,
            horizon,
            feasibility,
            constructed: schedule,
            slack_windows: refinement.schedule.slack_windows(),
            free_capacity: refinement.schedule.free_capacity(),
            schedule: refinement.schedule,
            initial_score: refinement.initial_score,
            final_score: refinement.final_score,
            iterations: refinement.iterations,
        };

        info!(
            instances = outcome.schedule.instance_count(),
            free_capacity = outcome.free_capacity,
            slack_windows = outcome.slack_windows.len(),
            iterations = outcome.iterations,
            "=== Scheduling complete ==="
        );

        Ok(outcome)
    }

    /// Decide feasibility constructively: run the utilisation filter, then
    /// try to build a schedule.
    ///
    /// # Errors
    /// Failures that say nothing about the task set itself (horizon
    /// resolution, invariant violations) are returned as errors rather than
    /// as an infeasible verdict.
    pub fn check_feasibility(
        &self,
        graph: &TaskGraph,
    ) -> Result<FeasibilityVerdict, SchedulerError> {
        let culprit = match self.construct(graph) {
            Ok(_) => None,
            Err(SchedulerError::UtilizationExceeded { task, .. }) => Some(Culprit::Task(task)),
            Err(SchedulerError::ScheduleInfeasible { instance, .. }) => {
                Some(Culprit::Instance(instance))
            }
            Err(other) => return Err(other),
        };

        match culprit {
            Some(c) => warn!(culprit = %c, "task set is infeasible"),
            None => info!("task set is feasible"),
        }

        Ok(FeasibilityVerdict {
            feasible: culprit.is_none(),
            culprit,
        })
    }

    fn construct(&self, graph: &TaskGraph) -> Result<Constructed, SchedulerError> {
        let horizon = resolve_horizon(graph, self.config.horizon, self.config.hyperperiod_limit)?;
        let feasibility =
            check_utilization(graph, self.config.policy, self.config.security_margin)?;
        let instances = InstanceSet::build(graph, horizon.horizon)?;
        let constructor = ScheduleConstructor::new(self.config.policy);
        let schedule = constructor.construct(graph, &instances)?;

        Ok(Constructed {
            horizon,
            feasibility,
            instances,
            schedule,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperperiod::HorizonSpec;
    use crate::task::{Node, NodeId, Task};

    fn single_node(tasks: Vec<Task>) -> TaskGraph {
        TaskGraph::new(vec![Node::new(0, "fog-a")], tasks).unwrap()
    }

    fn two_light_tasks() -> TaskGraph {
        single_node(vec![
            Task::periodic(1, 2, 10).on_nodes([0]),
            Task::periodic(2, 2, 10).on_nodes([0]),
        ])
    }

    /// A → B → C, WCET 3 each, all due at 9.
    fn chain() -> TaskGraph {
        single_node(vec![
            Task::periodic(1, 3, 9).on_nodes([0]),
            Task::periodic(2, 3, 9).after([1]).on_nodes([0]),
            Task::periodic(3, 3, 9).after([2]).on_nodes([0]),
        ])
    }

    fn overloaded() -> TaskGraph {
        single_node(vec![
            Task::periodic(1, 6, 10).on_nodes([0]),
            Task::periodic(2, 6, 10).on_nodes([0]),
        ])
    }

    fn scheduler() -> StaticScheduler {
        StaticScheduler::new(RunConfig::default())
    }

    #[test]
    fn two_independent_tasks_leave_six_units_of_slack() {
        let outcome = scheduler().run(&two_light_tasks()).unwrap();
        assert_eq!(outcome.horizon.horizon, 10);
        assert_eq!(outcome.free_capacity, 6);
        assert_eq!(outcome.schedule.intervals(NodeId(0)).len(), 2);
        let slack: u64 = outcome.slack_windows.iter().map(SlackWindow::len).sum();
        assert_eq!(slack, 6);
    }

    #[test]
    fn zero_slack_chain_is_feasible() {
        let graph = chain();
        let verdict = scheduler().check_feasibility(&graph).unwrap();
        assert_eq!(
            verdict,
            FeasibilityVerdict {
                feasible: true,
                culprit: None
            }
        );

        let outcome = scheduler().run(&graph).unwrap();
        assert_eq!(outcome.free_capacity, 0);
        assert!(outcome.slack_windows.is_empty());

        let starts: Vec<u64> = outcome
            .schedule
            .intervals(NodeId(0))
            .iter()
            .map(|i| i.start)
            .collect();
        assert_eq!(starts, vec![0, 3, 6]);
    }

    #[test]
    fn overload_is_rejected_by_the_filter() {
        let err = scheduler().run(&overloaded()).unwrap_err();
        assert!(matches!(err, SchedulerError::UtilizationExceeded { .. }));

        let verdict = scheduler().check_feasibility(&overloaded()).unwrap();
        assert!(!verdict.feasible);
        assert_eq!(verdict.culprit, Some(Culprit::Task(TaskId(2))));
    }

    #[test]
    fn construction_failure_names_the_instance() {
        let graph = single_node(vec![
            Task::periodic(1, 4, 10).with_deadline(5).on_nodes([0]),
            Task::periodic(2, 4, 10).with_deadline(5).on_nodes([0]),
        ]);
        let verdict = scheduler().check_feasibility(&graph).unwrap();
        assert_eq!(
            verdict.culprit,
            Some(Culprit::Instance(InstanceKey::new(TaskId(2), 0)))
        );
        assert!(matches!(
            scheduler().run(&graph),
            Err(SchedulerError::ScheduleInfeasible { .. })
        ));
    }

    #[test]
    fn horizon_errors_are_not_verdicts() {
        let config = RunConfig {
            horizon: HorizonSpec::Explicit(0),
            ..RunConfig::default()
        };
        let scheduler = StaticScheduler::new(config);
        let result = scheduler.check_feasibility(&two_light_tasks());
        assert!(matches!(result, Err(SchedulerError::Horizon(_))));
    }

    #[test]
    fn explicit_horizon_repeats_the_pattern() {
        let config = RunConfig {
            horizon: HorizonSpec::Explicit(30),
            ..RunConfig::default()
        };
        let scheduler = StaticScheduler::new(config);
        let outcome = scheduler.run(&two_light_tasks()).unwrap();
        assert_eq!(outcome.schedule.instance_count(), 6);
        assert_eq!(outcome.free_capacity, 18);
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let graph = TaskGraph::new(
            vec![Node::new(0, "fog-a"), Node::new(1, "fog-b")],
            vec![
                Task::periodic(1, 1, 5).on_nodes([0, 1]),
                Task::periodic(2, 2, 10).after([1]).on_nodes([0, 1]),
                Task::periodic(3, 3, 10).on_nodes([1]),
                Task::periodic(4, 1, 10).after([2, 3]).on_nodes([0]),
            ],
        )
        .unwrap();

        let first = scheduler().run(&graph).unwrap();
        let second = scheduler().run(&graph).unwrap();
        assert_eq!(
            serde_yaml::to_string(&first).unwrap(),
            serde_yaml::to_string(&second).unwrap()
        );
    }

    #[test]
    fn slack_pass_never_reduces_free_capacity() {
        let mut late = Task::periodic(2, 2, 10).with_deadline(5).on_nodes([0]);
        late.offset = 5;
        let graph = single_node(vec![Task::periodic(1, 2, 10).on_nodes([0]), late]);

        let outcome = scheduler().run(&graph).unwrap();
        assert_eq!(outcome.free_capacity, outcome.constructed.free_capacity());
        let before = outcome.constructed.slack_windows().len();
        assert!(outcome.slack_windows.len() < before);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn rm_run_succeeds_above_liu_layland() {
        let graph = single_node(vec![
            Task::periodic(1, 45, 100).on_nodes([0]),
            Task::periodic(2, 45, 100).on_nodes([0]),
        ]);
        let config = RunConfig {
            policy: Policy::Rm,
            ..RunConfig::default()
        };
        let outcome = StaticScheduler::new(config).run(&graph).unwrap();
        assert!(outcome.feasibility.nodes[0].exceeds_liu_layland);
        assert_eq!(outcome.free_capacity, 10);
    }
}
