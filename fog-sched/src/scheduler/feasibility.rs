/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Utilisation-based feasibility filter.
//!
//! This is a fast **necessary** condition, not a schedulability proof.  The
//! definitive verdict is constructive: see
//! [`StaticScheduler::check_feasibility`](super::StaticScheduler::check_feasibility).
//!
//! # Eligible-set bound
//! For every distinct eligible-node set `S` in the task graph, every task
//! whose eligible set is a subset of `S` can only run on nodes of `S`, so
//!
//! $$\sum_{i : E_i \subseteq S} \frac{C_i}{T_i} \leq m \cdot \sum_{n \in S} cap(n)$$
//!
//! must hold, with `m` the security margin.  Single-node sets give the
//! classic per-node check; larger sets give the relaxed multi-node bound.
//! Sets are checked smallest first, so an overloaded node is reported before
//! the platform-wide overload it causes.
//!
//! # Liu & Layland
//! Under RM, the tasks dedicated to a single node are also compared against
//! the Liu & Layland bound:
//!
//! $$U = \sum_{i=1}^{n} \frac{C_i}{T_i} \leq n \left(2^{1/n} - 1\right)$$
//!
//! | n | Bound |
//! |---|---|
//! | 1 | 1.000 |
//! | 2 | 0.828 |
//! | 3 | 0.780 |
//! | ∞ | ln(2) ≈ 0.693 |
//!
//! Exceeding it is only a **warning**: the bound assumes preemption and
//! independent tasks, and the constructor has the final word anyway.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::graph::TaskGraph;
use crate::task::{NodeId, Task};

use super::error::SchedulerError;
use super::policy::Policy;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Tolerance on utilisation comparisons, so that an exact `U = 1.0` passes.
pub const UTILIZATION_EPSILON: f64 = 1e-9;

/// Fraction of each node's capacity the filter lets the firm set use.
pub const DEFAULT_SECURITY_MARGIN: f64 = 1.0;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Sorted set of node ids, displayed as `{N0, N1}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeSet(pub Vec<NodeId>);

impl fmt::Display for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, node) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{node}")?;
        }
        f.write_str("}")
    }
}

/// Load of the tasks that may run on one node only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLoad {
    pub node: NodeId,
    pub dedicated_tasks: usize,
    pub utilization: f64,
    pub capacity: f64,

    /// Set when the RM Liu & Layland bound is exceeded for this node.
    pub exceeds_liu_layland: bool,
}

/// Summary of a successful filter pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeasibilityReport {
    pub total_utilization: f64,
    pub platform_capacity: f64,
    pub security_margin: f64,

    /// One entry per platform node, by id.
    pub nodes: Vec<NodeLoad>,
}

// ── Filter ────────────────────────────────────────────────────────────────────

/// Run the eligible-set utilisation filter over `graph`.
///
/// # Errors
/// [`SchedulerError::UtilizationExceeded`] for the first (smallest, then
/// lexicographically lowest) node set whose bound is violated.
pub fn check_utilization(
    graph: &TaskGraph,
    policy: Policy,
    margin: f64,
) -> Result<FeasibilityReport, SchedulerError> {
    let mut sets: Vec<Vec<NodeId>> = graph
        .tasks()
        .iter()
        .map(|t| t.eligible_nodes.iter().copied().collect::<Vec<_>>())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    sets.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    for set in &sets {
        let capacity: f64 = set
            .iter()
            .filter_map(|n| graph.node(*n))
            .map(|n| n.capacity)
            .sum();
        let bound = margin * capacity;

        let confined = graph
            .tasks()
            .iter()
            .filter(|t| t.eligible_nodes.iter().all(|n| set.contains(n)));

        let mut utilization = 0.0;
        let mut culprit = None;
        for task in confined {
            utilization += task.utilization();
            if culprit.is_none() && utilization > bound + UTILIZATION_EPSILON {
                culprit = Some(task.id);
            }
        }

        debug!(
            nodes = %NodeSet(set.clone()),
            utilization,
            bound,
            "eligible-set utilisation"
        );

        if let Some(task) = culprit {
            warn!(
                nodes = %NodeSet(set.clone()),
                utilization,
                bound,
                task = %task,
                "utilisation filter rejected the task set"
            );
            return Err(SchedulerError::UtilizationExceeded {
                nodes: NodeSet(set.clone()),
                utilization,
                bound,
                task,
            });
        }
    }

    let mut nodes = Vec::new();
    for node in graph.nodes() {
        let dedicated: Vec<&Task> = graph
            .tasks()
            .iter()
            .filter(|t| t.eligible_nodes.len() == 1 && node.accepts(t))
            .collect();
        let utilization: f64 = dedicated.iter().map(|t| t.utilization()).sum();

        let exceeds_liu_layland = policy == Policy::Rm && {
            match check_liu_layland(&dedicated) {
                Some(u) => {
                    warn!(
                        node = %node.id,
                        utilization = u,
                        bound = liu_layland_bound(dedicated.len()),
                        tasks = dedicated.len(),
                        "RM utilisation exceeds the Liu & Layland bound; \
                         schedulability is decided by construction"
                    );
                    true
                }
                None => false,
            }
        };

        nodes.push(NodeLoad {
            node: node.id,
            dedicated_tasks: dedicated.len(),
            utilization,
            capacity: node.capacity,
            exceeds_liu_layland,
        });
    }

    let report = FeasibilityReport {
        total_utilization: graph.tasks().iter().map(Task::utilization).sum(),
        platform_capacity: graph.nodes().map(|n| n.capacity).sum(),
        security_margin: margin,
        nodes,
    };

    info!(
        total_utilization = report.total_utilization,
        platform_capacity = report.platform_capacity,
        node_sets = sets.len(),
        "utilisation filter passed"
    );

    Ok(report)
}

// ── Liu & Layland ─────────────────────────────────────────────────────────────

/// `U_bound(n) = n × (2^(1/n) − 1)`.  `1.0` for one task, `0.0` for none.
pub fn liu_layland_bound(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    nf * (2.0_f64.powf(1.0 / nf) - 1.0)
}

/// `Some(total_utilisation)` if `tasks` exceed the Liu & Layland bound,
/// `None` if they are provably RM-schedulable on one processor.
///
/// Zero-period tasks contribute nothing and are not counted.
pub fn check_liu_layland(tasks: &[&Task]) -> Option<f64> {
    let periodic: Vec<&Task> = tasks.iter().copied().filter(|t| t.period > 0).collect();
    if periodic.is_empty() {
        return None;
    }

    let total_u: f64 = periodic.iter().map(|t| t.utilization()).sum();
    let bound = liu_layland_bound(periodic.len());

    (total_u > bound + UTILIZATION_EPSILON).then_some(total_u)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Node, TaskId};

    fn platform(n: u32) -> Vec<Node> {
        (0..n).map(|i| Node::new(i, format!("fog-{i}"))).collect()
    }

    fn graph(nodes: u32, tasks: Vec<Task>) -> TaskGraph {
        TaskGraph::new(platform(nodes), tasks).unwrap()
    }

    #[test]
    fn bound_zero_tasks_is_zero() {
        assert_eq!(liu_layland_bound(0), 0.0);
    }

    #[test]
    fn bound_one_task_is_one() {
        let b = liu_layland_bound(1);
        assert!((b - 1.0).abs() < 1e-10, "bound(1) should be 1.0, got {b}");
    }

    #[test]
    fn bound_two_tasks_is_approximately_0_828() {
        let b = liu_layland_bound(2);
        assert!((b - 0.8284).abs() < 1e-3, "bound(2) ≈ 0.828, got {b}");
    }

    #[test]
    fn bound_converges_toward_ln2() {
        let b = liu_layland_bound(1000);
        assert!((b - 2.0_f64.ln()).abs() < 1e-3, "got {b}");
    }

    #[test]
    fn classic_three_task_set_is_below_liu_layland() {
        // U = 0.30 + 0.25 + 0.16 = 0.71, bound(3) ≈ 0.780
        let a = Task::periodic(1, 3, 10);
        let b = Task::periodic(2, 5, 20);
        let c = Task::periodic(3, 8, 50);
        assert!(check_liu_layland(&[&a, &b, &c]).is_none());
    }

    #[test]
    fn overloaded_set_exceeds_liu_layland() {
        let tasks: Vec<Task> = (0..3).map(|i| Task::periodic(i, 35, 100)).collect();
        let refs: Vec<&Task> = tasks.iter().collect();
        let u = check_liu_layland(&refs).unwrap();
        assert!(
            (u - 1.05).abs() < 1e-6,
            "utilization should be 1.05, got {u}"
        );
    }

    #[test]
    fn empty_set_is_below_liu_layland() {
        assert!(check_liu_layland(&[]).is_none());
    }

    #[test]
    fn two_heavy_tasks_on_one_node_are_rejected() {
        let g = graph(
            1,
            vec![
                Task::periodic(1, 6, 10).on_nodes([0]),
                Task::periodic(2, 6, 10).on_nodes([0]),
            ],
        );
        match check_utilization(&g, Policy::Edf, 1.0) {
            Err(SchedulerError::UtilizationExceeded {
                nodes,
                utilization,
                task,
                ..
            }) => {
                assert_eq!(nodes, NodeSet(vec![NodeId(0)]));
                assert!((utilization - 1.2).abs() < 1e-9);
                assert_eq!(task, TaskId(2));
            }
            other => panic!("expected UtilizationExceeded, got {other:?}"),
        }
    }

    #[test]
    fn exactly_full_node_is_accepted() {
        // 1/3 + 1/3 + 1/3 does not sum to exactly 1.0 in f64
        let g = graph(
            1,
            vec![
                Task::periodic(1, 1, 3).on_nodes([0]),
                Task::periodic(2, 1, 3).on_nodes([0]),
                Task::periodic(3, 1, 3).on_nodes([0]),
            ],
        );
        let report = check_utilization(&g, Policy::Edf, 1.0).unwrap();
        assert!((report.nodes[0].utilization - 1.0).abs() < 1e-9);
    }

    #[test]
    fn relaxed_bound_rejects_platform_wide_overload() {
        // each node alone is fine, but 2.4 does not fit on two nodes
        let g = graph(
            2,
            vec![
                Task::periodic(1, 8, 10).on_nodes([0, 1]),
                Task::periodic(2, 8, 10).on_nodes([0, 1]),
                Task::periodic(3, 8, 10).on_nodes([0, 1]),
            ],
        );
        match check_utilization(&g, Policy::Edf, 1.0) {
            Err(SchedulerError::UtilizationExceeded { nodes, task, .. }) => {
                assert_eq!(nodes, NodeSet(vec![NodeId(0), NodeId(1)]));
                assert_eq!(task, TaskId(3));
            }
            other => panic!("expected UtilizationExceeded, got {other:?}"),
        }
    }

    #[test]
    fn dedicated_tasks_count_towards_wider_sets() {
        // both nodes are full with dedicated work, leaving no room for T3
        let g = graph(
            2,
            vec![
                Task::periodic(1, 10, 10).on_nodes([0]),
                Task::periodic(2, 10, 10).on_nodes([1]),
                Task::periodic(3, 1, 10).on_nodes([0, 1]),
            ],
        );
        assert!(matches!(
            check_utilization(&g, Policy::Edf, 1.0),
            Err(SchedulerError::UtilizationExceeded {
                task: TaskId(3),
                ..
            })
        ));
    }

    #[test]
    fn smallest_node_set_is_reported_first() {
        let g = graph(
            2,
            vec![
                Task::periodic(1, 8, 10).on_nodes([0, 1]),
                Task::periodic(2, 8, 10).on_nodes([0, 1]),
                Task::periodic(3, 6, 10).on_nodes([1]),
                Task::periodic(4, 6, 10).on_nodes([1]),
            ],
        );
        assert!(matches!(
            check_utilization(&g, Policy::Edf, 1.0),
            Err(SchedulerError::UtilizationExceeded {
                task: TaskId(4),
                ..
            })
        ));
    }

    #[test]
    fn security_margin_tightens_the_bound() {
        let g = graph(1, vec![Task::periodic(1, 95, 100).on_nodes([0])]);
        assert!(check_utilization(&g, Policy::Edf, 1.0).is_ok());
        assert!(check_utilization(&g, Policy::Edf, 0.9).is_err());
    }

    #[test]
    fn node_capacity_scales_the_bound() {
        let mut nodes = platform(1);
        nodes[0].capacity = 2.0;
        let g = TaskGraph::new(
            nodes,
            vec![
                Task::periodic(1, 6, 10).on_nodes([0]),
                Task::periodic(2, 6, 10).on_nodes([0]),
            ],
        )
        .unwrap();
        assert!(check_utilization(&g, Policy::Edf, 1.0).is_ok());
    }

    #[test]
    fn liu_layland_is_only_a_warning_under_rm() {
        // U = 0.9 on two tasks: above bound(2) ≈ 0.828 but still ≤ 1
        let g = graph(
            1,
            vec![
                Task::periodic(1, 45, 100).on_nodes([0]),
                Task::periodic(2, 45, 100).on_nodes([0]),
            ],
        );
        let rm = check_utilization(&g, Policy::Rm, 1.0).unwrap();
        assert!(rm.nodes[0].exceeds_liu_layland);

        let edf = check_utilization(&g, Policy::Edf, 1.0).unwrap();
        assert!(!edf.nodes[0].exceeds_liu_layland);
    }

    #[test]
    fn report_summarises_platform() {
        let g = graph(
            2,
            vec![
                Task::periodic(1, 2, 10).on_nodes([0]),
                Task::periodic(2, 2, 10).on_nodes([0, 1]),
            ],
        );
        let report = check_utilization(&g, Policy::Edf, 1.0).unwrap();
        assert!((report.total_utilization - 0.4).abs() < 1e-9);
        assert!((report.platform_capacity - 2.0).abs() < 1e-9);
        assert_eq!(report.nodes.len(), 2);
        assert_eq!(report.nodes[0].dedicated_tasks, 1);
        assert_eq!(report.nodes[1].dedicated_tasks, 0);
    }

    #[test]
    fn node_set_display() {
        assert_eq!(NodeSet(vec![NodeId(0), NodeId(3)]).to_string(), "{N0, N3}");
    }
}
