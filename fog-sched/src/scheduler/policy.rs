/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Priority policies.
//!
//! A policy is nothing more than a total order over task instances.  It is
//! chosen once per run and handed to the constructor, which never branches
//! on the policy itself.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::SchedulerError;
use super::instance::TaskInstance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Earliest Deadline First: smallest absolute deadline first.
    #[default]
    Edf,
    /// Rate Monotonic: smallest period first.
    Rm,
}

impl Policy {
    /// `Less` means `a` runs before `b`.
    ///
    /// Ties on the primary key fall back to the task id, then to the
    /// activation index, so no two distinct instances compare equal.
    pub fn compare(self, a: &TaskInstance, b: &TaskInstance) -> Ordering {
        let primary = match self {
            Policy::Edf => a.deadline.cmp(&b.deadline),
            Policy::Rm => a.period.cmp(&b.period),
        };
        primary.then_with(|| a.key.cmp(&b.key))
    }

    pub fn name(self) -> &'static str {
        match self {
            Policy::Edf => "edf",
            Policy::Rm => "rm",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "edf" => Ok(Policy::Edf),
            "rm" => Ok(Policy::Rm),
            _ => Err(SchedulerError::UnknownPolicy(s.to_string())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
