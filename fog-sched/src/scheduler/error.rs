/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the static scheduler.
//!
//! | Variant | Raised by |
//! |---|---|
//! | `MalformedGraph` | graph construction, before any scheduling |
//! | `Horizon` | horizon resolution |
//! | `UtilizationExceeded` | the feasibility filter |
//! | `TooManyActivations` | instance expansion |
//! | `ScheduleInfeasible` | the schedule constructor |
//! | `InvariantViolation` | the schedule checker (internal defect) |
//! | `UnknownPolicy` / `UnknownObjective` | selector parsing |
//!
//! Every variant carries the ids needed to log the failure with structured
//! fields.  Keep these typed; `anyhow` belongs to the binary and the file
//! loaders only.

use thiserror::Error;

use crate::graph::MalformedGraphError;
use crate::hyperperiod::HyperperiodError;
use crate::task::TaskId;

use super::feasibility::NodeSet;
use super::instance::InstanceKey;
use super::schedule::InvariantViolation;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("malformed task graph: {0}")]
    MalformedGraph(#[from] MalformedGraphError),

    #[error("cannot resolve horizon: {0}")]
    Horizon(#[from] HyperperiodError),

    /// The fast filter rejected the task set.  `task` is the first task, by
    /// id, whose addition pushes the load of `nodes` over `bound`.
    #[error(
        "utilization {utilization:.3} exceeds bound {bound:.3} on nodes {nodes} \
         (first offending task {task})"
    )]
    UtilizationExceeded {
        nodes: NodeSet,
        utilization: f64,
        bound: f64,
        task: TaskId,
    },

    /// A task is released more often within the horizon than an
    /// activation index can count.
    #[error(
        "task {task} has {count} activations within horizon {horizon}, \
         more than an activation index can hold"
    )]
    TooManyActivations {
        task: TaskId,
        count: u64,
        horizon: u64,
    },

    /// The constructor could not place `instance` before its deadline.
    #[error(
        "instance {instance} cannot meet its deadline: earliest finish {earliest_finish} \
         > deadline {deadline}"
    )]
    ScheduleInfeasible {
        instance: InstanceKey,
        earliest_finish: u64,
        deadline: u64,
    },

    /// A produced schedule broke one of its own invariants.  Always a bug.
    #[error("internal schedule invariant violated: {0}")]
    InvariantViolation(#[from] InvariantViolation),

    #[error("unknown scheduling policy: '{0}' (valid: edf, rm)")]
    UnknownPolicy(String),

    #[error(
        "unknown objective: '{0}' (valid: cumulated_free, nrml_dist_free, min_e2e_app_del)"
    )]
    UnknownObjective(String),
}
