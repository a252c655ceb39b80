/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Expansion of periodic tasks into concrete activations over the horizon.
//!
//! Activation `k` of a task is released at `offset + k·period` and must
//! finish by `release + deadline`.  Activations are generated for every
//! release strictly below the horizon.
//!
//! For a dependency edge `p → c`, activation `c#k` (released at `r`) waits for
//! the latest activation of `p` released at or before `r`.  If `p` has not
//! been released yet at `r`, the edge does not constrain `c#k`.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::graph::TaskGraph;
use crate::task::{Criticality, NodeId, Task, TaskId};

use super::error::SchedulerError;

/// Identity of one task activation.  Orders by task, then activation index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct InstanceKey {
    pub task: TaskId,
    pub index: u32,
}

impl InstanceKey {
    pub fn new(task: TaskId, index: u32) -> Self {
        Self { task, index }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.task, self.index)
    }
}

/// One activation of a task with absolute timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInstance {
    pub key: InstanceKey,

    /// Absolute release time.
    pub release: u64,

    /// Absolute deadline.
    pub deadline: u64,

    pub wcet: u64,

    /// Period of the owning task; the RM priority key.
    pub period: u64,

    pub criticality: Criticality,

    /// Sorted by id.
    pub eligible_nodes: Vec<NodeId>,

    /// Producer activations that must finish before this one starts.
    pub predecessors: Vec<InstanceKey>,
}

impl TaskInstance {
    pub fn is_eligible(&self, node: NodeId) -> bool {
        self.eligible_nodes.binary_search(&node).is_ok()
    }
}

/// Every activation of every task within one horizon.
#[derive(Debug, Clone)]
pub struct InstanceSet {
    instances: BTreeMap<InstanceKey, TaskInstance>,
    successors: BTreeMap<InstanceKey, Vec<InstanceKey>>,
    horizon: u64,
    span: u64,
}

impl InstanceSet {
    /// Expand every task of `graph` over `[0, horizon)`.
    ///
    /// # Errors
    /// [`SchedulerError::TooManyActivations`] if a task is released more
    /// often within the horizon than a `u32` activation index can count.
    pub fn build(graph: &TaskGraph, horizon: u64) -> Result<Self, SchedulerError> {
        let mut instances = BTreeMap::new();

        for task in graph.tasks() {
            let count = activation_count(task, horizon)?;
            if count == 0 {
                warn!(
                    task = %task.label(),
                    offset = task.offset,
                    horizon,
                    "task is never released within the horizon"
                );
            }

            for index in 0..count {
                let release = task.offset + u64::from(index) * task.period;
                let predecessors = graph
                    .predecessors(task.id)
                    .filter_map(|producer| {
                        corresponding_activation(producer, release)
                            .map(|i| InstanceKey::new(producer.id, i))
                    })
                    .collect();

                let key = InstanceKey::new(task.id, index);
                instances.insert(
                    key,
                    TaskInstance {
                        key,
                        release,
                        deadline: release + task.deadline,
                        wcet: task.wcet,
                        period: task.period,
                        criticality: task.criticality,
                        eligible_nodes: task.eligible_nodes.iter().copied().collect(),
                        predecessors,
                    },
                );
            }
        }

        let mut successors: BTreeMap<InstanceKey, Vec<InstanceKey>> = BTreeMap::new();
        for inst in instances.values() {
            for producer in &inst.predecessors {
                successors.entry(*producer).or_default().push(inst.key);
            }
        }

        let span = instances
            .values()
            .map(|i| i.deadline)
            .max()
            .unwrap_or(0)
            .max(horizon);

        debug!(
            instances = instances.len(),
            horizon, span, "expanded task instances"
        );

        Ok(Self {
            instances,
            successors,
            horizon,
            span,
        })
    }

    pub fn get(&self, key: &InstanceKey) -> Option<&TaskInstance> {
        self.instances.get(key)
    }

    /// All instances, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = &TaskInstance> {
        self.instances.values()
    }

    /// Consumer activations waiting on `key`.
    pub fn successors_of(&self, key: &InstanceKey) -> &[InstanceKey] {
        self.successors.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    /// `max(horizon, latest absolute deadline)`: the window over which slack
    /// is measured.  Independent of where instances are placed.
    pub fn span(&self) -> u64 {
        self.span
    }
}

/// Number of releases of `task` strictly below `horizon`.
fn activation_count(task: &Task, horizon: u64) -> Result<u32, SchedulerError> {
    if task.offset >= horizon || task.period == 0 {
        return Ok(0);
    }
    let count = (horizon - task.offset).div_ceil(task.period);
    u32::try_from(count).map_err(|_| SchedulerError::TooManyActivations {
        task: task.id,
        count,
        horizon,
    })
}

/// Index of the latest activation of `producer` released at or before
/// `release`.
fn corresponding_activation(producer: &Task, release: u64) -> Option<u32> {
    if release < producer.offset || producer.period == 0 {
        return None;
    }
    let index = (release - producer.offset) / producer.period;
    u32::try_from(index).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
