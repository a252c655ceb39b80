/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core data structures of the platform and the firm task set.
//!
//! ```text
//! case file ──(config::case)──►  Node / Task  ──(graph)──►  TaskGraph  ──(scheduler)──►  Schedule
//!                                 ↑ immutable inputs          ↑ validated arena
//! ```
//!
//! # Ownership model
//! `Task` and `Node` are plain immutable values.  They are moved into a
//! [`TaskGraph`](crate::graph::TaskGraph) once, and from then on only
//! borrowed.  The scheduler never mutates a task: it expands each one into
//! per-period instances and schedules those.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Stable task identifier.
///
/// Ordering on `TaskId` is the tie-breaker of every scheduling decision, so
/// it is a plain integer rather than a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Stable processing-node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

// ── Criticality ───────────────────────────────────────────────────────────────

/// Criticality level (CIL) of a task.
///
/// | Level | Meaning |
/// |---|---|
/// | 0 | dynamic, no guarantee |
/// | 1 | minimal end-to-end delay |
/// | 2 | bounded jitter |
/// | 3 | zero jitter |
/// | 4 | zero jitter and minimal completion time |
///
/// Consecutive intervals of different criticality on one node cost a
/// partition switch (see `RunConfig::switch_time`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Criticality(u8);

impl Criticality {
    pub const MAX: u8 = 4;

    /// Returns `None` for levels above [`Criticality::MAX`].
    pub fn new(level: u8) -> Option<Self> {
        (level <= Self::MAX).then_some(Criticality(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

/// One fog node of the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,

    /// Human-readable name, used only in logs and rendered output.
    pub name: String,

    /// Capacity factor used by the utilisation filter.
    ///
    /// `1.0` is one fully available processor.  The WCET of a task is already
    /// its worst case over every node it is eligible to, so the capacity does
    /// not scale execution times.
    pub capacity: f64,
}

impl Node {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: NodeId(id),
            name: name.into(),
            capacity: 1.0,
        }
    }

    /// Eligibility predicate: `true` if `task` may run on this node.
    pub fn accepts(&self, task: &Task) -> bool {
        task.eligible_nodes.contains(&self.id)
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// A periodic firm task, i.e. one vertex of the task DAG.
///
/// All timing values share one integer time unit.  Deadlines are relative to
/// each release.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    // ── Identity ──────────────────────────────────────────────────────────────
    pub id: TaskId,

    /// Display name.  Empty means "use the id".
    pub name: String,

    /// Application this task belongs to, if any.  Only used by the
    /// end-to-end delay objective.
    pub app: Option<String>,

    // ── Timing ────────────────────────────────────────────────────────────────
    /// Worst-case execution time.
    pub wcet: u64,

    pub period: u64,

    /// Relative deadline.
    pub deadline: u64,

    /// Release offset of the first activation.
    pub offset: u64,

    pub criticality: Criticality,

    // ── Graph and placement ───────────────────────────────────────────────────
    /// Producers this task consumes data from (incoming DAG edges).
    pub predecessors: BTreeSet<TaskId>,

    /// Nodes this task may be placed on.
    pub eligible_nodes: BTreeSet<NodeId>,
}

impl Task {
    /// Implicit-deadline task (`deadline == period`) with no offset.
    pub fn periodic(id: u32, wcet: u64, period: u64) -> Self {
        Self {
            id: TaskId(id),
            wcet,
            period,
            deadline: period,
            ..Default::default()
        }
    }

    /// Builder-style helper: restrict the task to the given nodes.
    pub fn on_nodes(mut self, nodes: impl IntoIterator<Item = u32>) -> Self {
        self.eligible_nodes = nodes.into_iter().map(NodeId).collect();
        self
    }

    /// Builder-style helper: add incoming dependency edges.
    pub fn after(mut self, producers: impl IntoIterator<Item = u32>) -> Self {
        self.predecessors.extend(producers.into_iter().map(TaskId));
        self
    }

    /// Builder-style helper: override the relative deadline.
    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = deadline;
        self
    }

    /// Processor utilisation `wcet / period`.
    ///
    /// Returns `0.0` when `period` is zero; the graph validator rejects such
    /// tasks anyway.
    pub fn utilization(&self) -> f64 {
        if self.period == 0 {
            0.0
        } else {
            self.wcet as f64 / self.period as f64
        }
    }

    /// Name for logs: the display name when set, the id otherwise.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            format!("{} ({})", self.name, self.id)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
