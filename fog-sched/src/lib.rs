/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! fog-sched: static scheduler for hybrid real-time fog computing platforms.
//!
//! Builds a feasible static schedule for a DAG of periodic firm tasks over
//! heterogeneous nodes, then reshapes it to maximise the idle capacity left
//! for sporadic work.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── task          – nodes, tasks, ids, criticality
//! ├── graph/        – validated task DAG and its queries
//! ├── hyperperiod/  – horizon resolution, LCM / GCD helpers
//! ├── scheduler/    – feasibility filter, construction, slack maximisation
//! ├── config/       – YAML run configuration and case loading
//! └── render        – raw and YAML output
//! ```

pub mod config;
pub mod graph;
pub mod hyperperiod;
pub mod render;
pub mod scheduler;
pub mod task;
