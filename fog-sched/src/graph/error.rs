/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structural defects of an input task graph.
//!
//! Every variant names the offending task, node or edge so the caller can
//! point the user at the exact line of the case file.

use thiserror::Error;

use crate::task::{NodeId, TaskId};

/// Which timing rule a task violates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingDefect {
    ZeroWcet,
    ZeroPeriod,
    /// `deadline < wcet`: no instance can ever complete in time.
    DeadlineBelowWcet { wcet: u64, deadline: u64 },
    /// `period < deadline`: only constrained deadlines are supported.
    PeriodBelowDeadline { period: u64, deadline: u64 },
}

impl std::fmt::Display for TimingDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingDefect::ZeroWcet => write!(f, "WCET must be positive"),
            TimingDefect::ZeroPeriod => write!(f, "period must be positive"),
            TimingDefect::DeadlineBelowWcet { wcet, deadline } => {
                write!(f, "deadline {deadline} is shorter than WCET {wcet}")
            }
            TimingDefect::PeriodBelowDeadline { period, deadline } => {
                write!(f, "period {period} is shorter than deadline {deadline}")
            }
        }
    }
}

/// Error returned when a task graph fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedGraphError {
    #[error("task graph contains no tasks")]
    NoTasks,

    #[error("platform description contains no nodes")]
    NoNodes,

    #[error("task id {0} is declared more than once")]
    DuplicateTask(TaskId),

    #[error("node id {0} is declared more than once")]
    DuplicateNode(NodeId),

    #[error("node {node} has an invalid capacity factor {capacity}")]
    InvalidCapacity { node: NodeId, capacity: f64 },

    #[error("task {task} depends on unknown task {predecessor}")]
    DanglingEdge { task: TaskId, predecessor: TaskId },

    #[error("task {task} depends on itself")]
    SelfLoop { task: TaskId },

    #[error("task {task} names unknown node {node} as eligible")]
    UnknownNode { task: TaskId, node: NodeId },

    #[error("task {task} has no eligible node")]
    NoEligibleNode { task: TaskId },

    #[error("task {task} has invalid timing: {defect}")]
    InvalidTiming { task: TaskId, defect: TimingDefect },

    /// The dependency edges contain a cycle.  `involved` lists the tasks that
    /// could not be ordered, smallest id first.
    #[error("dependency cycle detected among tasks {involved:?}")]
    Cycle { involved: Vec<TaskId> },
}
