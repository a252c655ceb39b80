/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The static schedule: one ordered timeline of execution intervals per node.
//!
//! Execution is non-preemptive, so every instance owns exactly one interval
//! of length WCET.  Slack windows are never stored; they are derived from the
//! gaps between intervals inside `[0, span)`.
//!
//! [`Schedule::validate`] checks every schedule invariant over the whole
//! schedule.  [`Schedule::check_shift`] checks the same invariants for a
//! single moved interval, which is all the slack pass needs per candidate.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::task::NodeId;

use super::instance::{InstanceKey, InstanceSet};

// ── Building blocks ───────────────────────────────────────────────────────────

/// Execution of one instance on one node, `[start, finish)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub instance: InstanceKey,
    pub start: u64,
    pub finish: u64,
}

impl Interval {
    pub fn len(&self) -> u64 {
        self.finish - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.finish == self.start
    }
}

/// Idle gap `[start, finish)` on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlackWindow {
    pub node: NodeId,
    pub start: u64,
    pub finish: u64,
}

impl SlackWindow {
    pub fn len(&self) -> u64 {
        self.finish - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.finish == self.start
    }
}

// ── Invariant violations ──────────────────────────────────────────────────────

/// A broken schedule invariant, reported by [`Schedule::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("intervals of {first} and {second} overlap on node {node}")]
    Overlap {
        node: NodeId,
        first: InstanceKey,
        second: InstanceKey,
    },

    #[error("{instance} starts at {start} before its release {release}")]
    StartsBeforeRelease {
        instance: InstanceKey,
        start: u64,
        release: u64,
    },

    #[error("{instance} finishes at {finish} after its deadline {deadline}")]
    MissesDeadline {
        instance: InstanceKey,
        finish: u64,
        deadline: u64,
    },

    #[error("{instance} runs for {length} time units instead of its WCET {wcet}")]
    WrongLength {
        instance: InstanceKey,
        length: u64,
        wcet: u64,
    },

    #[error("{instance} is placed on node {node}, which it is not eligible to")]
    IneligibleNode { instance: InstanceKey, node: NodeId },

    #[error(
        "{instance} starts at {start} before its predecessor {predecessor} finishes at {finish}"
    )]
    DependencyBroken {
        instance: InstanceKey,
        predecessor: InstanceKey,
        start: u64,
        finish: u64,
    },

    #[error("{instance} is not placed")]
    Unplaced { instance: InstanceKey },

    #[error("{instance} is placed more than once")]
    PlacedTwice { instance: InstanceKey },

    #[error("schedule contains {instance}, which is not part of the task set")]
    UnknownInstance { instance: InstanceKey },
}

// ── Schedule ──────────────────────────────────────────────────────────────────

/// Node and timeline position per instance.  Stays valid across shifts,
/// which never reorder a timeline.
pub type Positions = BTreeMap<InstanceKey, (NodeId, usize)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    /// Horizon the task set was expanded over.
    pub horizon: u64,

    /// End of the window over which slack is measured.
    pub span: u64,

    /// Per-node intervals, sorted by start time.  Every platform node has an
    /// entry, even when nothing runs on it.
    pub timelines: BTreeMap<NodeId, Vec<Interval>>,
}

impl Schedule {
    /// Empty schedule over `nodes`.
    pub fn empty(nodes: impl IntoIterator<Item = NodeId>, horizon: u64, span: u64) -> Self {
        Self {
            horizon,
            span,
            timelines: nodes.into_iter().map(|n| (n, Vec::new())).collect(),
        }
    }

    /// Insert `interval` on `node`, keeping the timeline sorted.
    pub fn place(&mut self, node: NodeId, interval: Interval) {
        let timeline = self.timelines.entry(node).or_default();
        let at = timeline.partition_point(|i| i.start <= interval.start);
        timeline.insert(at, interval);
    }

    pub fn intervals(&self, node: NodeId) -> &[Interval] {
        self.timelines.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Interval at `pos` of `node`'s timeline.
    pub fn at(&self, node: NodeId, pos: usize) -> Option<&Interval> {
        self.timelines.get(&node).and_then(|t| t.get(pos))
    }

    /// Node and timeline position of every placed instance.
    pub fn positions(&self) -> Positions {
        self.timelines
            .iter()
            .flat_map(|(node, t)| {
                t.iter()
                    .enumerate()
                    .map(move |(pos, i)| (i.instance, (*node, pos)))
            })
            .collect()
    }

    /// Interval of `key`, found through `positions`.
    pub fn lookup(&self, positions: &Positions, key: InstanceKey) -> Option<&Interval> {
        positions
            .get(&key)
            .and_then(|&(node, pos)| self.at(node, pos))
    }

    /// Every interval, keyed by instance.
    pub fn placements(&self) -> BTreeMap<InstanceKey, (NodeId, Interval)> {
        self.timelines
            .iter()
            .flat_map(|(node, t)| t.iter().map(move |i| (i.instance, (*node, *i))))
            .collect()
    }

    /// End of the interval before `pos` and start of the one after it on
    /// `node`, defaulting to `0` and `span`.
    pub fn neighbour_bounds(&self, node: NodeId, pos: usize) -> (u64, u64) {
        let prev_finish = pos
            .checked_sub(1)
            .and_then(|p| self.at(node, p))
            .map_or(0, |i| i.finish);
        let next_start = self.at(node, pos + 1).map_or(self.span, |i| i.start);
        (prev_finish, next_start)
    }

    /// Check that moving the interval at `pos` of `node` to `start` keeps
    /// every invariant.  Only the moved interval can break one, so only it
    /// is checked: against its own timing, its neighbours on the node, and
    /// its producers and consumers wherever they run.
    pub fn check_shift(
        &self,
        instances: &InstanceSet,
        positions: &Positions,
        node: NodeId,
        pos: usize,
        start: u64,
    ) -> Result<(), InvariantViolation> {
        let Some(current) = self.at(node, pos) else {
            return Ok(());
        };
        let key = current.instance;
        let Some(inst) = instances.get(&key) else {
            return Err(InvariantViolation::UnknownInstance { instance: key });
        };
        let finish = start + current.len();

        if start < inst.release {
            return Err(InvariantViolation::StartsBeforeRelease {
                instance: key,
                start,
                release: inst.release,
            });
        }
        if finish > inst.deadline {
            return Err(InvariantViolation::MissesDeadline {
                instance: key,
                finish,
                deadline: inst.deadline,
            });
        }

        let (prev_finish, next_start) = self.neighbour_bounds(node, pos);
        if start < prev_finish {
            if let Some(prev) = pos.checked_sub(1).and_then(|p| self.at(node, p)) {
                return Err(InvariantViolation::Overlap {
                    node,
                    first: prev.instance,
                    second: key,
                });
            }
        }
        if finish > next_start {
            if let Some(next) = self.at(node, pos + 1) {
                return Err(InvariantViolation::Overlap {
                    node,
                    first: key,
                    second: next.instance,
                });
            }
        }

        for pred in &inst.predecessors {
            let Some(producer) = self.lookup(positions, *pred) else {
                return Err(InvariantViolation::Unplaced { instance: *pred });
            };
            if producer.finish > start {
                return Err(InvariantViolation::DependencyBroken {
                    instance: key,
                    predecessor: *pred,
                    start,
                    finish: producer.finish,
                });
            }
        }
        for succ in instances.successors_of(&key) {
            let Some(consumer) = self.lookup(positions, *succ) else {
                return Err(InvariantViolation::Unplaced { instance: *succ });
            };
            if consumer.start < finish {
                return Err(InvariantViolation::DependencyBroken {
                    instance: *succ,
                    predecessor: key,
                    start: consumer.start,
                    finish,
                });
            }
        }

        Ok(())
    }

    /// Move the interval at `pos` of `node` to `start`, in place.  The
    /// caller keeps the timeline ordered, so positions stay valid; use
    /// [`Schedule::check_shift`] first.
    pub fn shift(&mut self, node: NodeId, pos: usize, start: u64) {
        if let Some(interval) = self.timelines.get_mut(&node).and_then(|t| t.get_mut(pos)) {
            let len = interval.len();
            interval.start = start;
            interval.finish = start + len;
        }
    }

    pub fn instance_count(&self) -> usize {
        self.timelines.values().map(Vec::len).sum()
    }

    /// Total time covered by intervals, over all nodes.
    pub fn busy_time(&self) -> u64 {
        self.timelines.values().flatten().map(Interval::len).sum()
    }

    /// Total idle time over all nodes within `[0, span)`.
    pub fn free_capacity(&self) -> u64 {
        let capacity = self.span * self.timelines.len() as u64;
        capacity.saturating_sub(self.busy_time())
    }

    /// Gaps between intervals, per node and in time order, within `[0, span)`.
    pub fn slack_windows(&self) -> Vec<SlackWindow> {
        let mut windows = Vec::new();
        for (node, timeline) in &self.timelines {
            let mut cursor = 0;
            for interval in timeline {
                if interval.start > cursor {
                    windows.push(SlackWindow {
                        node: *node,
                        start: cursor,
                        finish: interval.start,
                    });
                }
                cursor = cursor.max(interval.finish);
            }
            if self.span > cursor {
                windows.push(SlackWindow {
                    node: *node,
                    start: cursor,
                    finish: self.span,
                });
            }
        }
        windows
    }

    /// Check every schedule invariant against `instances`.
    ///
    /// Checks run in a fixed order (timeline overlaps by node, then each
    /// instance by key), so the reported violation is deterministic.
    pub fn validate(&self, instances: &InstanceSet) -> Result<(), InvariantViolation> {
        let mut placed: BTreeMap<InstanceKey, (NodeId, Interval)> = BTreeMap::new();

        for (node, timeline) in &self.timelines {
            for pair in timeline.windows(2) {
                if pair[1].start < pair[0].finish {
                    return Err(InvariantViolation::Overlap {
                        node: *node,
                        first: pair[0].instance,
                        second: pair[1].instance,
                    });
                }
            }
            for interval in timeline {
                if instances.get(&interval.instance).is_none() {
                    return Err(InvariantViolation::UnknownInstance {
                        instance: interval.instance,
                    });
                }
                if placed.insert(interval.instance, (*node, *interval)).is_some() {
                    return Err(InvariantViolation::PlacedTwice {
                        instance: interval.instance,
                    });
                }
            }
        }

        for inst in instances.iter() {
            let Some(&(node, interval)) = placed.get(&inst.key) else {
                return Err(InvariantViolation::Unplaced { instance: inst.key });
            };

            if interval.finish < interval.start || interval.len() != inst.wcet {
                return Err(InvariantViolation::WrongLength {
                    instance: inst.key,
                    length: interval.finish.saturating_sub(interval.start),
                    wcet: inst.wcet,
                });
            }
            if interval.start < inst.release {
                return Err(InvariantViolation::StartsBeforeRelease {
                    instance: inst.key,
                    start: interval.start,
                    release: inst.release,
                });
            }
            if interval.finish > inst.deadline {
                return Err(InvariantViolation::MissesDeadline {
                    instance: inst.key,
                    finish: interval.finish,
                    deadline: inst.deadline,
                });
            }
            if !inst.is_eligible(node) {
                return Err(InvariantViolation::IneligibleNode {
                    instance: inst.key,
                    node,
                });
            }
            for pred in &inst.predecessors {
                let Some((_, producer)) = placed.get(pred) else {
                    return Err(InvariantViolation::Unplaced { instance: *pred });
                };
                if producer.finish > interval.start {
                    return Err(InvariantViolation::DependencyBroken {
                        instance: inst.key,
                        predecessor: *pred,
                        start: interval.start,
                        finish: producer.finish,
                    });
                }
            }
        }

        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TaskGraph;
    use crate::task::{Node, Task, TaskId};

    fn key(task: u32, index: u32) -> InstanceKey {
        InstanceKey::new(TaskId(task), index)
    }

    fn iv(task: u32, index: u32, start: u64, finish: u64) -> Interval {
        Interval {
            instance: key(task, index),
            start,
            finish,
        }
    }

    /// Two nodes; T1 (wcet 2) → T2 (wcet 3), both period 10.
    fn chain() -> InstanceSet {
        let g = TaskGraph::new(
            vec![Node::new(0, "a"), Node::new(1, "b")],
            vec![
                Task::periodic(1, 2, 10).on_nodes([0, 1]),
                Task::periodic(2, 3, 10).after([1]).on_nodes([0]),
            ],
        )
        .unwrap();
        InstanceSet::build(&g, 10).unwrap()
    }

    fn valid_chain_schedule() -> Schedule {
        let mut s = Schedule::empty([NodeId(0), NodeId(1)], 10, 10);
        s.place(NodeId(0), iv(2, 0, 4, 7));
        s.place(NodeId(0), iv(1, 0, 0, 2));
        s
    }

    #[test]
    fn place_keeps_timeline_sorted() {
        let s = valid_chain_schedule();
        let starts: Vec<u64> = s.intervals(NodeId(0)).iter().map(|i| i.start).collect();
        assert_eq!(starts, vec![0, 4]);
        assert!(s.intervals(NodeId(1)).is_empty());
    }

    #[test]
    fn slack_windows_cover_gaps_and_idle_nodes() {
        let s = valid_chain_schedule();
        let windows = s.slack_windows();
        assert_eq!(
            windows,
            vec![
                SlackWindow {
                    node: NodeId(0),
                    start: 2,
                    finish: 4
                },
                SlackWindow {
                    node: NodeId(0),
                    start: 7,
                    finish: 10
                },
                SlackWindow {
                    node: NodeId(1),
                    start: 0,
                    finish: 10
                },
            ]
        );
        assert_eq!(s.free_capacity(), 15);
        assert_eq!(windows.iter().map(SlackWindow::len).sum::<u64>(), 15);
    }

    #[test]
    fn positions_survive_a_shift() {
        let mut s = valid_chain_schedule();
        let positions = s.positions();
        assert_eq!(positions.get(&key(2, 0)), Some(&(NodeId(0), 1)));
        assert_eq!(s.lookup(&positions, key(9, 0)), None);

        s.shift(NodeId(0), 1, 2);
        assert_eq!(s.lookup(&positions, key(2, 0)), Some(&iv(2, 0, 2, 5)));
        assert_eq!(s.positions(), positions);
        assert_eq!(s.neighbour_bounds(NodeId(0), 1), (2, 10));
    }

    #[test]
    fn check_shift_agrees_with_full_validation() {
        let instances = chain();
        let s = valid_chain_schedule();
        let positions = s.positions();

        for pos in 0..2 {
            for start in 0..=9 {
                let local = s.check_shift(&instances, &positions, NodeId(0), pos, start);
                let mut moved = s.clone();
                moved.shift(NodeId(0), pos, start);
                assert_eq!(
                    local.is_ok(),
                    moved.validate(&instances).is_ok(),
                    "pos {pos} start {start}"
                );
            }
        }
    }

    #[test]
    fn check_shift_reports_the_broken_invariant() {
        let instances = chain();
        let s = valid_chain_schedule();
        let positions = s.positions();
        assert_eq!(
            s.check_shift(&instances, &positions, NodeId(0), 1, 1),
            Err(InvariantViolation::Overlap {
                node: NodeId(0),
                first: key(1, 0),
                second: key(2, 0),
            })
        );

        // producer on another node pushed past its consumer's start
        let mut split = Schedule::empty([NodeId(0), NodeId(1)], 10, 10);
        split.place(NodeId(1), iv(1, 0, 0, 2));
        split.place(NodeId(0), iv(2, 0, 4, 7));
        let positions = split.positions();
        assert_eq!(
            split.check_shift(&instances, &positions, NodeId(1), 0, 3),
            Err(InvariantViolation::DependencyBroken {
                instance: key(2, 0),
                predecessor: key(1, 0),
                start: 4,
                finish: 5,
            })
        );
    }

    #[test]
    fn valid_schedule_passes() {
        assert_eq!(valid_chain_schedule().validate(&chain()), Ok(()));
    }

    #[test]
    fn overlap_is_detected() {
        let mut s = Schedule::empty([NodeId(0), NodeId(1)], 10, 10);
        s.place(NodeId(0), iv(1, 0, 0, 2));
        s.place(NodeId(0), iv(2, 0, 1, 4));
        assert!(matches!(
            s.validate(&chain()),
            Err(InvariantViolation::Overlap { .. })
        ));
    }

    #[test]
    fn broken_dependency_is_detected() {
        let mut s = Schedule::empty([NodeId(0), NodeId(1)], 10, 10);
        s.place(NodeId(1), iv(1, 0, 3, 5));
        s.place(NodeId(0), iv(2, 0, 4, 7));
        assert_eq!(
            s.validate(&chain()),
            Err(InvariantViolation::DependencyBroken {
                instance: key(2, 0),
                predecessor: key(1, 0),
                start: 4,
                finish: 5,
            })
        );
    }

    #[test]
    fn deadline_miss_is_detected() {
        let mut s = Schedule::empty([NodeId(0), NodeId(1)], 10, 10);
        s.place(NodeId(0), iv(1, 0, 0, 2));
        s.place(NodeId(0), iv(2, 0, 8, 11));
        assert!(matches!(
            s.validate(&chain()),
            Err(InvariantViolation::MissesDeadline { finish: 11, .. })
        ));
    }

    #[test]
    fn ineligible_node_is_detected() {
        let mut s = Schedule::empty([NodeId(0), NodeId(1)], 10, 10);
        s.place(NodeId(0), iv(1, 0, 0, 2));
        s.place(NodeId(1), iv(2, 0, 2, 5));
        assert_eq!(
            s.validate(&chain()),
            Err(InvariantViolation::IneligibleNode {
                instance: key(2, 0),
                node: NodeId(1)
            })
        );
    }

    #[test]
    fn missing_and_duplicate_placements_are_detected() {
        let mut s = Schedule::empty([NodeId(0), NodeId(1)], 10, 10);
        s.place(NodeId(0), iv(1, 0, 0, 2));
        assert_eq!(
            s.validate(&chain()),
            Err(InvariantViolation::Unplaced {
                instance: key(2, 0)
            })
        );

        s.place(NodeId(1), iv(1, 0, 0, 2));
        assert_eq!(
            s.validate(&chain()),
            Err(InvariantViolation::PlacedTwice {
                instance: key(1, 0)
            })
        );
    }

    #[test]
    fn wrong_length_is_detected() {
        let mut s = Schedule::empty([NodeId(0), NodeId(1)], 10, 10);
        s.place(NodeId(0), iv(1, 0, 0, 3));
        s.place(NodeId(0), iv(2, 0, 4, 7));
        assert!(matches!(
            s.validate(&chain()),
            Err(InvariantViolation::WrongLength {
                length: 3,
                wcet: 2,
                ..
            })
        ));
    }
}
