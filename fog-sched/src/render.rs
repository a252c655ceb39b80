/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Output formats for a [`ScheduleOutcome`].
//!
//! * `raw`: plain text, one block per node listing intervals and slack.
//! * `yaml`: the full outcome serialised with serde.
//!
//! Both are deterministic for a given outcome.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::graph::TaskGraph;
use crate::scheduler::ScheduleOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Raw,
    Yaml,
}

pub fn render(
    outcome: &ScheduleOutcome,
    graph: &TaskGraph,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Raw => render_raw(outcome, graph).context("Failed to emit text"),
        OutputFormat::Yaml => serde_yaml::to_string(outcome).context("Failed to emit YAML"),
    }
}

fn render_raw(outcome: &ScheduleOutcome, graph: &TaskGraph) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let schedule = &outcome.schedule;

    writeln!(
        out,
        "policy: {}  objective: {}",
        outcome.policy, outcome.objective
    )?;
    writeln!(
        out,
        "horizon: {} (hyperperiod {})  span: {}",
        outcome.horizon.horizon, outcome.horizon.hyperperiod, schedule.span
    )?;
    writeln!(
        out,
        "free capacity: {} / {}  slack windows: {}  moves: {}",
        outcome.free_capacity,
        schedule.span * schedule.timelines.len() as u64,
        outcome.slack_windows.len(),
        outcome.iterations
    )?;

    for (node_id, timeline) in &schedule.timelines {
        let name = graph.node(*node_id).map_or("", |n| n.name.as_str());
        writeln!(out)?;
        writeln!(out, "node {node_id} {name}")?;

        let mut slack = outcome
            .slack_windows
            .iter()
            .filter(|w| w.node == *node_id)
            .peekable();

        for interval in timeline {
            while let Some(w) = slack.next_if(|w| w.start < interval.start) {
                writeln!(out, "  [{:>6}, {:>6})  slack", w.start, w.finish)?;
            }
            let label = graph
                .task(interval.instance.task)
                .map_or_else(|| interval.instance.task.to_string(), |t| t.label());
            writeln!(
                out,
                "  [{:>6}, {:>6})  {}#{}",
                interval.start, interval.finish, label, interval.instance.index
            )?;
        }
        for w in slack {
            writeln!(out, "  [{:>6}, {:>6})  slack", w.start, w.finish)?;
        }
    }

    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::scheduler::StaticScheduler;
    use crate::task::{Node, Task};

    fn run() -> (TaskGraph, ScheduleOutcome) {
        let mut sensor = Task::periodic(1, 2, 10).on_nodes([0]);
        sensor.name = "sensor".into();
        let graph = TaskGraph::new(
            vec![Node::new(0, "fog-a"), Node::new(1, "fog-b")],
            vec![sensor, Task::periodic(2, 2, 10).on_nodes([0])],
        )
        .unwrap();
        let scheduler = StaticScheduler::new(RunConfig::default());
        let outcome = scheduler.run(&graph).unwrap();
        (graph, outcome)
    }

    #[test]
    fn raw_lists_intervals_and_slack_per_node() {
        let (graph, outcome) = run();
        let text = render(&outcome, &graph, OutputFormat::Raw).unwrap();

        assert!(text.starts_with("policy: edf  objective: cumulated_free\n"));
        assert!(text.contains("free capacity: 16 / 20"));
        assert!(text.contains("node N0 fog-a\n"));
        assert!(text.contains("[     0,      2)  sensor (T1)#0"));
        assert!(text.contains("[     2,      4)  T2#0"));
        assert!(text.contains("[     4,     10)  slack"));
        assert!(text.contains("node N1 fog-b\n  [     0,     10)  slack"));
    }

    #[test]
    fn yaml_round_trips_the_outcome_fields() {
        let (graph, outcome) = run();
        let text = render(&outcome, &graph, OutputFormat::Yaml).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();

        assert_eq!(value["policy"].as_str(), Some("edf"));
        assert_eq!(value["free_capacity"].as_u64(), Some(16));
        assert_eq!(value["horizon"]["horizon"].as_u64(), Some(10));
    }

    #[test]
    fn rendering_is_deterministic() {
        let (graph, outcome) = run();
        assert_eq!(
            render(&outcome, &graph, OutputFormat::Raw).unwrap(),
            render(&outcome, &graph, OutputFormat::Raw).unwrap()
        );
    }
}
