/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduling horizon resolution.
//!
//! The static schedule covers one horizon.  By default that is the
//! hyperperiod, the LCM of all task periods, after which the firm task set
//! repeats.  A caller may instead fix an explicit bound.
//!
//! | Situation | Result |
//! |-----------|--------|
//! | LCM does not fit in `u64` | `Err(Overflow)` |
//! | Horizon above the configured limit | `Err(TooLarge)` |
//! | Explicit horizon of zero | `Err(ZeroHorizon)` |
//! | Explicit horizon not a multiple of the hyperperiod | accepted, warning logged |

pub mod math;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::graph::TaskGraph;
use math::lcm_of_periods;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default upper limit on the horizon, in time units.
///
/// With microsecond units this is one hour.
pub const DEFAULT_HYPERPERIOD_LIMIT: u64 = 3_600_000_000;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur while resolving the horizon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperperiodError {
    /// LCM calculation overflowed `u64`.
    Overflow { a: u64, b: u64 },

    /// The horizon exceeded the configured limit.
    TooLarge { value: u64, limit: u64 },

    /// An explicit horizon of zero was requested.
    ZeroHorizon,
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
            HyperperiodError::TooLarge { value, limit } => {
                write!(f, "horizon {value} exceeds limit {limit}")
            }
            HyperperiodError::ZeroHorizon => write!(f, "explicit horizon must be positive"),
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── Horizon selection ─────────────────────────────────────────────────────────

/// How the horizon is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonSpec {
    /// LCM of all task periods.
    #[default]
    Hyperperiod,

    /// Caller-provided bound.
    Explicit(u64),
}

/// Resolved horizon for one scheduling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HorizonInfo {
    /// Horizon actually used by the scheduler.
    pub horizon: u64,

    /// LCM of all task periods.
    pub hyperperiod: u64,

    /// Distinct task periods, sorted.
    pub unique_periods: Vec<u64>,
}

/// Resolve the horizon of `graph` according to `selection`.
///
/// # Example
/// ```rust
/// use fog_sched::graph::TaskGraph;
/// use fog_sched::hyperperiod::{resolve_horizon, HorizonSpec, DEFAULT_HYPERPERIOD_LIMIT};
/// use fog_sched::task::{Node, Task};
///
/// let graph = TaskGraph::new(
///     vec![Node::new(0, "fog-a")],
///     vec![
///         Task::periodic(1, 1, 4).on_nodes([0]),
///         Task::periodic(2, 1, 6).on_nodes([0]),
///     ],
/// )
/// .unwrap();
///
/// let info = resolve_horizon(&graph, HorizonSpec::Hyperperiod, DEFAULT_HYPERPERIOD_LIMIT)
///     .unwrap();
/// assert_eq!(info.horizon, 12);
/// ```
///
/// # Errors
/// See the table in the module documentation.
pub fn resolve_horizon(
    graph: &TaskGraph,
    selection: HorizonSpec,
    limit: u64,
) -> Result<HorizonInfo, HyperperiodError> {
    let unique_periods: Vec<u64> = {
        let mut v: Vec<u64> = graph
            .tasks()
            .iter()
            .map(|t| t.period)
            .filter(|&p| p > 0)
            .collect();
        v.sort_unstable();
        v.dedup();
        v
    };

    let hyperperiod = lcm_of_periods(unique_periods.iter().copied())?;

    let horizon = match selection {
        HorizonSpec::Hyperperiod => hyperperiod,
        HorizonSpec::Explicit(0) => return Err(HyperperiodError::ZeroHorizon),
        HorizonSpec::Explicit(bound) => {
            if bound % hyperperiod != 0 {
                warn!(
                    horizon = bound,
                    hyperperiod,
                    remainder = bound % hyperperiod,
                    "explicit horizon is not a multiple of the hyperperiod"
                );
            }
            bound
        }
    };

    if horizon > limit {
        warn!(horizon, limit, "horizon exceeds configured limit");
        return Err(HyperperiodError::TooLarge {
            value: horizon,
            limit,
        });
    }

    info!(
        horizon,
        hyperperiod,
        unique_count = unique_periods.len(),
        "resolved scheduling horizon"
    );
    for p in &unique_periods {
        debug!(period = p, activations = horizon / p, "  unique period");
    }

    Ok(HorizonInfo {
        horizon,
        hyperperiod,
        unique_periods,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
