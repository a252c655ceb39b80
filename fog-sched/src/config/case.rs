/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Problem case loading: platform nodes, tasks and applications.
//!
//! The expected YAML structure is:
//! ```yaml
//! nodes:
//!   - { id: 0, name: fog-a, capacity: 1.0 }
//!   - { id: 1, name: fog-b }
//! tasks:
//!   - id: 1
//!     name: sensor
//!     wcet: 2
//!     period: 10
//!     deadline: 10        # defaults to period
//!     offset: 0           # defaults to 0
//!     criticality: 2      # 0-4, defaults to 0
//!     predecessors: []
//!     eligible_nodes: [0] # omitted = every node
//!   - { id: 2, name: fusion, wcet: 3, period: 10 }
//! apps:
//!   - { name: perception, inorder: true, tasks: [1, 2] }
//! ```
//!
//! An application tags its tasks for the end-to-end delay objective.  With
//! `inorder: true` its tasks also form a chain, each one depending on the
//! one listed before it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::graph::TaskGraph;
use crate::task::{Criticality, Node, NodeId, Task, TaskId};

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseFile {
    nodes: Vec<NodeEntry>,
    tasks: Vec<TaskEntry>,
    #[serde(default)]
    apps: Vec<AppEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeEntry {
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default = "default_capacity")]
    capacity: f64,
}

/// Serde default for `capacity`: one full processor.
fn default_capacity() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskEntry {
    id: u32,
    #[serde(default)]
    name: String,
    app: Option<String>,
    wcet: u64,
    period: u64,
    /// Defaults to `period` when absent.
    deadline: Option<u64>,
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    criticality: u8,
    #[serde(default)]
    predecessors: Vec<u32>,
    /// `None` means every platform node.
    eligible_nodes: Option<Vec<u32>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AppEntry {
    name: String,
    #[serde(default)]
    inorder: bool,
    #[serde(default)]
    tasks: Vec<u32>,
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load and validate the case file at `path`.
///
/// # Errors
/// The file cannot be read or parsed, an application references an unknown
/// task, a criticality is out of range, or the resulting graph is malformed.
pub fn load_case(path: &Path) -> Result<TaskGraph> {
    info!("Loading case from: {}", path.display());

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot open case file: {}", path.display()))?;

    parse_case(&content).with_context(|| format!("Invalid case file: {}", path.display()))
}

/// Parse and validate a case from its YAML text.
pub fn parse_case(content: &str) -> Result<TaskGraph> {
    let file: CaseFile = serde_yaml::from_str(content).context("Failed to parse case YAML")?;

    let nodes: Vec<Node> = file
        .nodes
        .into_iter()
        .map(|n| Node {
            id: NodeId(n.id),
            name: n.name,
            capacity: n.capacity,
        })
        .collect();
    let all_nodes: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();

    let mut tasks: BTreeMap<TaskId, Task> = BTreeMap::new();
    for entry in file.tasks {
        let id = TaskId(entry.id);
        let criticality = Criticality::new(entry.criticality).with_context(|| {
            format!(
                "task {id}: criticality {} exceeds {}",
                entry.criticality,
                Criticality::MAX
            )
        })?;

        let task = Task {
            id,
            name: entry.name,
            app: entry.app,
            wcet: entry.wcet,
            period: entry.period,
            deadline: entry.deadline.unwrap_or(entry.period),
            offset: entry.offset,
            criticality,
            predecessors: entry.predecessors.into_iter().map(TaskId).collect(),
            eligible_nodes: match entry.eligible_nodes {
                Some(ids) => ids.into_iter().map(NodeId).collect(),
                None => all_nodes.iter().copied().collect(),
            },
        };

        debug!(
            task = %task.label(),
            wcet = task.wcet,
            period = task.period,
            deadline = task.deadline,
            eligible = task.eligible_nodes.len(),
            "  task"
        );

        if tasks.insert(id, task).is_some() {
            bail!("duplicate task id {id}");
        }
    }

    for app in &file.apps {
        apply_app(app, &mut tasks)?;
    }

    let graph = TaskGraph::new(nodes, tasks.into_values().collect())
        .context("Case does not describe a valid task graph")?;

    info!(
        nodes = graph.nodes().count(),
        tasks = graph.tasks().len(),
        edges = graph.edge_count(),
        apps = file.apps.len(),
        "case loaded"
    );

    Ok(graph)
}

/// Tag the tasks of `app` and, for in-order applications, chain them.
fn apply_app(app: &AppEntry, tasks: &mut BTreeMap<TaskId, Task>) -> Result<()> {
    let mut previous: Option<TaskId> = None;
    for raw in &app.tasks {
        let id = TaskId(*raw);
        let task = tasks
            .get_mut(&id)
            .with_context(|| format!("application '{}' lists unknown task {id}", app.name))?;

        if let Some(other) = task.app.as_deref() {
            if other != app.name {
                bail!("task {id} belongs to both '{other}' and '{}'", app.name);
            }
        }
        task.app = Some(app.name.clone());

        if app.inorder {
            if let Some(prev) = previous {
                task.predecessors.insert(prev);
            }
        }
        previous = Some(id);
    }
    Ok(())
}

// ── Collections ───────────────────────────────────────────────────────────────

/// Every case file (`*.yaml`, `*.yml`) under `root` and its subdirectories,
/// sorted by path.
///
/// # Errors
/// A directory cannot be read, or no case file is found.
pub fn find_cases(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_cases(root, &mut found)?;
    if found.is_empty() {
        bail!("no case files (*.yaml, *.yml) under {}", root.display());
    }
    found.sort();

    info!(root = %root.display(), cases = found.len(), "collection found");
    Ok(found)
}

fn collect_cases(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Cannot read collection directory: {}", dir.display()))?;

    for entry in entries {
        let path = entry
            .with_context(|| format!("Cannot list {}", dir.display()))?
            .path();
        if path.is_dir() {
            collect_cases(&path, found)?;
        } else if is_case_file(&path) {
            debug!(path = %path.display(), "  case file");
            found.push(path);
        }
    }
    Ok(())
}

fn is_case_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
