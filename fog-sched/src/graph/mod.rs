/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Task graph model: the platform nodes plus the DAG of firm tasks.
//!
//! Tasks live in an arena (`Vec<Task>`) sorted by [`TaskId`]; edges are kept
//! as two index sets per task, one for predecessors and one for successors.
//! No task holds a reference to another, so bidirectional traversal needs no
//! shared ownership.
//!
//! A [`TaskGraph`] can only be obtained through [`TaskGraph::new`], which
//! validates the input.  Every query below may therefore assume an acyclic
//! graph with resolved references.

pub mod error;

pub use error::{MalformedGraphError, TimingDefect};

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::task::{Node, NodeId, Task, TaskId};

/// Validated, read-only task graph.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: BTreeMap<NodeId, Node>,

    /// Arena, sorted by id.
    tasks: Vec<Task>,

    /// `TaskId` → arena position.
    index: BTreeMap<TaskId, usize>,

    /// Arena positions of the producers of each task.
    preds: Vec<BTreeSet<usize>>,

    /// Arena positions of the consumers of each task.
    succs: Vec<BTreeSet<usize>>,
}

impl TaskGraph {
    /// Build and validate a task graph.
    ///
    /// # Errors
    /// Any [`MalformedGraphError`]: duplicates, dangling references, invalid
    /// timing, empty eligibility or a dependency cycle.
    pub fn new(nodes: Vec<Node>, mut tasks: Vec<Task>) -> Result<Self, MalformedGraphError> {
        if nodes.is_empty() {
            return Err(MalformedGraphError::NoNodes);
        }
        if tasks.is_empty() {
            return Err(MalformedGraphError::NoTasks);
        }

        let mut node_map = BTreeMap::new();
        for node in nodes {
            let id = node.id;
            if node_map.insert(id, node).is_some() {
                return Err(MalformedGraphError::DuplicateNode(id));
            }
        }

        tasks.sort_by_key(|t| t.id);
        let mut index = BTreeMap::new();
        for (pos, task) in tasks.iter().enumerate() {
            if index.insert(task.id, pos).is_some() {
                return Err(MalformedGraphError::DuplicateTask(task.id));
            }
        }

        let mut preds = vec![BTreeSet::new(); tasks.len()];
        let mut succs = vec![BTreeSet::new(); tasks.len()];
        for (pos, task) in tasks.iter().enumerate() {
            for producer in &task.predecessors {
                if *producer == task.id {
                    return Err(MalformedGraphError::SelfLoop { task: task.id });
                }
                let Some(&ppos) = index.get(producer) else {
                    return Err(MalformedGraphError::DanglingEdge {
                        task: task.id,
                        predecessor: *producer,
                    });
                };
                preds[pos].insert(ppos);
                succs[ppos].insert(pos);
            }
        }

        let graph = Self {
            nodes: node_map,
            tasks,
            index,
            preds,
            succs,
        };
        graph.validate()?;

        debug!(
            nodes = graph.nodes.len(),
            tasks = graph.tasks.len(),
            edges = graph.edge_count(),
            "task graph validated"
        );
        Ok(graph)
    }

    // ── Validation ────────────────────────────────────────────────────────────

    /// Re-check every structural invariant.
    ///
    /// Checks (in order): node capacities, per-task eligibility and timing,
    /// then acyclicity.
    pub fn validate(&self) -> Result<(), MalformedGraphError> {
        for node in self.nodes.values() {
            if !node.capacity.is_finite() || node.capacity <= 0.0 {
                return Err(MalformedGraphError::InvalidCapacity {
                    node: node.id,
                    capacity: node.capacity,
                });
            }
        }

        for task in &self.tasks {
            if task.eligible_nodes.is_empty() {
                return Err(MalformedGraphError::NoEligibleNode { task: task.id });
            }
            if let Some(&node) = task
                .eligible_nodes
                .iter()
                .find(|n| !self.nodes.contains_key(n))
            {
                return Err(MalformedGraphError::UnknownNode {
                    task: task.id,
                    node,
                });
            }
            if let Err(defect) = check_timing(task) {
                return Err(MalformedGraphError::InvalidTiming {
                    task: task.id,
                    defect,
                });
            }
        }

        self.kahn_order().map(|_| ())
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Tasks in dependency order; among ready tasks the smallest id goes
    /// first, so the order is fully deterministic.
    pub fn topological_order(&self) -> Vec<TaskId> {
        // `new` already proved acyclicity
        self.kahn_order()
            .unwrap_or_default()
            .into_iter()
            .map(|pos| self.tasks[pos].id)
            .collect()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.index.get(&id).map(|&pos| &self.tasks[pos])
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All tasks, sorted by id.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// All nodes, sorted by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Producers of `id`, sorted by id.  Empty for unknown ids.
    pub fn predecessors(&self, id: TaskId) -> impl Iterator<Item = &Task> {
        self.neighbours(id, &self.preds)
    }

    /// Consumers of `id`, sorted by id.  Empty for unknown ids.
    pub fn successors(&self, id: TaskId) -> impl Iterator<Item = &Task> {
        self.neighbours(id, &self.succs)
    }

    /// Eligible nodes of `id`, sorted by id.  Empty for unknown ids.
    pub fn eligible_nodes(&self, id: TaskId) -> impl Iterator<Item = &Node> {
        self.task(id)
            .into_iter()
            .flat_map(|t| t.eligible_nodes.iter())
            .filter_map(|n| self.nodes.get(n))
    }

    pub fn edge_count(&self) -> usize {
        self.preds.iter().map(BTreeSet::len).sum()
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn neighbours<'a>(
        &'a self,
        id: TaskId,
        adjacency: &'a [BTreeSet<usize>],
    ) -> impl Iterator<Item = &'a Task> {
        self.index
            .get(&id)
            .into_iter()
            .flat_map(move |&pos| adjacency[pos].iter())
            .map(move |&p| &self.tasks[p])
    }

    /// Kahn's algorithm over arena positions.  Because the arena is sorted by
    /// id, popping the smallest ready position yields the smallest ready id.
    fn kahn_order(&self) -> Result<Vec<usize>, MalformedGraphError> {
        let mut in_degree: Vec<usize> = self.preds.iter().map(BTreeSet::len).collect();
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(pos, _)| pos)
            .collect();

        let mut order = Vec::with_capacity(self.tasks.len());
        while let Some(pos) = ready.pop_first() {
            order.push(pos);
            for &next in &self.succs[pos] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        if order.len() == self.tasks.len() {
            Ok(order)
        } else {
            let involved = in_degree
                .iter()
                .enumerate()
                .filter(|(_, &d)| d > 0)
                .map(|(pos, _)| self.tasks[pos].id)
                .collect();
            Err(MalformedGraphError::Cycle { involved })
        }
    }
}

fn check_timing(task: &Task) -> Result<(), TimingDefect> {
    if task.wcet == 0 {
        return Err(TimingDefect::ZeroWcet);
    }
    if task.period == 0 {
        return Err(TimingDefect::ZeroPeriod);
    }
    if task.deadline < task.wcet {
        return Err(TimingDefect::DeadlineBelowWcet {
            wcet: task.wcet,
            deadline: task.deadline,
        });
    }
    if task.period < task.deadline {
        return Err(TimingDefect::PeriodBelowDeadline {
            period: task.period,
            deadline: task.deadline,
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
