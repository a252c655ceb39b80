/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Event-driven, non-preemptive list scheduling.
//!
//! Time jumps from one scheduling point to the next: a node becoming idle or
//! an instance becoming ready (released, with every producer instance
//! finished).  At each point the ready instances are sorted by the policy
//! and, in that order, each one takes the idle eligible node with the
//! smallest id, starting immediately.  Every idle node gives the same start
//! time, so this is greedy earliest-start placement.
//!
//! Construction stops at the first scheduling point where a ready instance
//! can no longer meet its deadline.  A schedule that completes is checked
//! against every schedule invariant before it is returned.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::graph::TaskGraph;
use crate::task::NodeId;

use super::error::SchedulerError;
use super::instance::{InstanceKey, InstanceSet, TaskInstance};
use super::policy::Policy;
use super::schedule::{Interval, InvariantViolation, Schedule};

pub struct ScheduleConstructor {
    policy: Policy,
}

impl ScheduleConstructor {
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    /// Build a schedule for every instance in `instances` on the nodes of
    /// `graph`.
    ///
    /// # Errors
    /// * [`SchedulerError::ScheduleInfeasible`] naming the first instance, in
    ///   policy order, that cannot finish by its deadline.
    /// * [`SchedulerError::InvariantViolation`] if the result fails its own
    ///   invariant check.
    pub fn construct(
        &self,
        graph: &TaskGraph,
        instances: &InstanceSet,
    ) -> Result<Schedule, SchedulerError> {
        let mut schedule = Schedule::empty(graph.node_ids(), instances.horizon(), instances.span());

        // ── Per-run state ─────────────────────────────────────────────────────
        let mut node_free: BTreeMap<NodeId, u64> = graph.node_ids().map(|n| (n, 0)).collect();
        let mut outstanding: BTreeMap<InstanceKey, usize> = BTreeMap::new();
        let mut ready_time: BTreeMap<InstanceKey, u64> = BTreeMap::new();
        let mut queue: BTreeSet<(u64, InstanceKey)> = BTreeSet::new();

        for inst in instances.iter() {
            ready_time.insert(inst.key, inst.release);
            if inst.predecessors.is_empty() {
                queue.insert((inst.release, inst.key));
            } else {
                outstanding.insert(inst.key, inst.predecessors.len());
            }
        }

        info!(
            policy = %self.policy,
            instances = instances.len(),
            nodes = node_free.len(),
            horizon = instances.horizon(),
            "constructing schedule"
        );

        let mut now = 0;
        while !queue.is_empty() {
            let mut ready: Vec<&TaskInstance> = queue
                .iter()
                .take_while(|(t, _)| *t <= now)
                .filter_map(|(_, key)| instances.get(key))
                .collect();
            ready.sort_by(|a, b| self.policy.compare(a, b));

            if let Some(late) = ready.iter().find(|i| now + i.wcet > i.deadline) {
                warn!(
                    instance = %late.key,
                    now,
                    wcet = late.wcet,
                    deadline = late.deadline,
                    "instance cannot meet its deadline"
                );
                return Err(SchedulerError::ScheduleInfeasible {
                    instance: late.key,
                    earliest_finish: now + late.wcet,
                    deadline: late.deadline,
                });
            }

            for inst in ready {
                let idle = inst
                    .eligible_nodes
                    .iter()
                    .copied()
                    .find(|n| node_free.get(n).is_some_and(|&free| free <= now));
                let Some(node) = idle else {
                    continue;
                };

                let finish = now + inst.wcet;
                schedule.place(
                    node,
                    Interval {
                        instance: inst.key,
                        start: now,
                        finish,
                    },
                );
                node_free.insert(node, finish);
                let queued_at = ready_time.get(&inst.key).copied().unwrap_or(now);
                queue.remove(&(queued_at, inst.key));

                debug!(instance = %inst.key, node = %node, start = now, finish, "placed");

                for succ in instances.successors_of(&inst.key) {
                    let rt = ready_time.entry(*succ).or_insert(finish);
                    *rt = (*rt).max(finish);
                    if let Some(count) = outstanding.get_mut(succ) {
                        *count -= 1;
                        if *count == 0 {
                            outstanding.remove(succ);
                            queue.insert((*rt, *succ));
                        }
                    }
                }
            }

            let next = node_free
                .values()
                .copied()
                .chain(queue.iter().map(|(t, _)| *t))
                .filter(|&t| t > now)
                .min();

            match next {
                Some(t) => now = t,
                None => {
                    if let Some(&(_, stuck)) = queue.first() {
                        return Err(InvariantViolation::Unplaced { instance: stuck }.into());
                    }
                }
            }
        }

        schedule.validate(instances)?;

        info!(
            placed = schedule.instance_count(),
            free_capacity = schedule.free_capacity(),
            "schedule constructed"
        );

        Ok(schedule)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
