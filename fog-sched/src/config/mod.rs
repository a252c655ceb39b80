/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Run configuration loading.
//!
//! A run is driven by one immutable [`RunConfig`], resolved once at start-up
//! with the precedence CLI flag > configuration file > built-in default.
//!
//! The expected YAML structure is (every key optional):
//! ```yaml
//! algorithm: edf            # edf | rm
//! objective: cumulated_free # cumulated_free | nrml_dist_free | min_e2e_app_del
//! horizon: 200              # omitted = hyperperiod
//! switch_time: 1
//! shift_step: 2
//! iteration_budget: 64
//! security_margin: 0.9
//! hyperperiod_limit: 3600000000
//! ```
//!
//! The problem itself (nodes and tasks) is loaded by [`case`].

pub mod case;

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::hyperperiod::{HorizonSpec, DEFAULT_HYPERPERIOD_LIMIT};
use crate::scheduler::feasibility::DEFAULT_SECURITY_MARGIN;
use crate::scheduler::slack::DEFAULT_ITERATION_BUDGET;
use crate::scheduler::{Objective, Policy};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Maps directly onto the YAML file layout.  Callers work with [`RunConfig`].
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunConfigFile {
    algorithm: Option<String>,
    objective: Option<String>,
    horizon: Option<u64>,
    switch_time: Option<u64>,
    shift_step: Option<u64>,
    iteration_budget: Option<u32>,
    security_margin: Option<f64>,
    hyperperiod_limit: Option<u64>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Immutable configuration of one scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub policy: Policy,
    pub objective: Objective,
    pub horizon: HorizonSpec,

    /// Cost of a criticality change between consecutive intervals on a node.
    pub switch_time: u64,

    /// Extra ± shift tried by the slack pass; `0` tries full shifts only.
    pub shift_step: u64,

    /// Maximum number of accepted slack-pass moves.
    pub iteration_budget: u32,

    /// Fraction of node capacity the utilisation filter allows, in `(0, 1]`.
    pub security_margin: f64,

    pub hyperperiod_limit: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            objective: Objective::default(),
            horizon: HorizonSpec::default(),
            switch_time: 0,
            shift_step: 0,
            iteration_budget: DEFAULT_ITERATION_BUDGET,
            security_margin: DEFAULT_SECURITY_MARGIN,
            hyperperiod_limit: DEFAULT_HYPERPERIOD_LIMIT,
        }
    }
}

/// Values given on the command line.  `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOverrides {
    pub policy: Option<Policy>,
    pub objective: Option<Objective>,
    pub horizon: Option<u64>,
    pub switch_time: Option<u64>,
    pub shift_step: Option<u64>,
    pub iteration_budget: Option<u32>,
    pub security_margin: Option<f64>,
}

impl RunConfig {
    /// Parse the YAML run configuration at `path`.  Missing keys keep their
    /// defaults; an empty file yields [`RunConfig::default`].
    ///
    /// # Errors
    /// The file cannot be read, is not valid YAML, names an unknown
    /// algorithm or objective, or carries an out-of-range value.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading run configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: RunConfigFile = if content.trim().is_empty() {
            RunConfigFile::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?
        };

        let mut config = RunConfig::default();
        if let Some(algorithm) = file.algorithm {
            config.policy = algorithm
                .parse::<Policy>()
                .with_context(|| format!("Invalid 'algorithm' in {}", path.display()))?;
        }
        if let Some(objective) = file.objective {
            config.objective = objective
                .parse::<Objective>()
                .with_context(|| format!("Invalid 'objective' in {}", path.display()))?;
        }
        if let Some(horizon) = file.horizon {
            config.horizon = HorizonSpec::Explicit(horizon);
        }
        if let Some(v) = file.switch_time {
            config.switch_time = v;
        }
        if let Some(v) = file.shift_step {
            config.shift_step = v;
        }
        if let Some(v) = file.iteration_budget {
            config.iteration_budget = v;
        }
        if let Some(v) = file.security_margin {
            config.security_margin = v;
        }
        if let Some(v) = file.hyperperiod_limit {
            config.hyperperiod_limit = v;
        }

        config
            .check()
            .with_context(|| format!("Invalid run configuration: {}", path.display()))?;

        debug!(?config, "run configuration loaded");
        Ok(config)
    }

    /// Apply command-line overrides on top of this configuration.
    ///
    /// # Errors
    /// An override carries an out-of-range value.
    pub fn with_overrides(mut self, overrides: &RunOverrides) -> Result<Self> {
        if let Some(p) = overrides.policy {
            self.policy = p;
        }
        if let Some(o) = overrides.objective {
            self.objective = o;
        }
        if let Some(h) = overrides.horizon {
            self.horizon = HorizonSpec::Explicit(h);
        }
        if let Some(v) = overrides.switch_time {
            self.switch_time = v;
        }
        if let Some(v) = overrides.shift_step {
            self.shift_step = v;
        }
        if let Some(v) = overrides.iteration_budget {
            self.iteration_budget = v;
        }
        if let Some(v) = overrides.security_margin {
            self.security_margin = v;
        }
        self.check()?;
        Ok(self)
    }

    fn check(&self) -> Result<()> {
        if !(self.security_margin > 0.0 && self.security_margin <= 1.0) {
            bail!(
                "security_margin must be in (0, 1], got {}",
                self.security_margin
            );
        }
        if self.horizon == HorizonSpec::Explicit(0) {
            bail!("horizon must be positive");
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = RunConfig::default();
        assert_eq!(c.policy, Policy::Edf);
        assert_eq!(c.objective, Objective::CumulatedFree);
        assert_eq!(c.horizon, HorizonSpec::Hyperperiod);
        assert_eq!(c.iteration_budget, 64);
        assert_eq!(c.security_margin, 1.0);
        assert_eq!(c.shift_step, 0);
    }

    #[test]
    fn load_full_config() {
        let yaml = r#"
algorithm: rm
objective: nrml_dist_free
horizon: 200
switch_time: 1
shift_step: 2
iteration_budget: 10
security_margin: 0.9
hyperperiod_limit: 5000
"#;
        let f = yaml_tempfile(yaml);
        let c = RunConfig::load_from_file(f.path()).unwrap();
        assert_eq!(c.policy, Policy::Rm);
        assert_eq!(c.objective, Objective::NrmlDistFree);
        assert_eq!(c.horizon, HorizonSpec::Explicit(200));
        assert_eq!(c.switch_time, 1);
        assert_eq!(c.shift_step, 2);
        assert_eq!(c.iteration_budget, 10);
        assert_eq!(c.security_margin, 0.9);
        assert_eq!(c.hyperperiod_limit, 5000);
    }

    #[test]
    fn missing_keys_keep_defaults() {
        let f = yaml_tempfile("algorithm: rm\n");
        let c = RunConfig::load_from_file(f.path()).unwrap();
        assert_eq!(c.policy, Policy::Rm);
        assert_eq!(c.objective, Objective::CumulatedFree);
        assert_eq!(c.horizon, HorizonSpec::Hyperperiod);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let f = yaml_tempfile("");
        assert_eq!(
            RunConfig::load_from_file(f.path()).unwrap(),
            RunConfig::default()
        );
    }

    #[test]
    fn unknown_algorithm_is_an_error() {
        let f = yaml_tempfile("algorithm: fifo\n");
        let err = RunConfig::load_from_file(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains("fifo"));
    }

    #[test]
    fn misspelled_key_is_an_error() {
        let f = yaml_tempfile("algoritm: rm\n");
        let err = RunConfig::load_from_file(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains("algoritm"));
    }

    #[test]
    fn out_of_range_margin_is_an_error() {
        let f = yaml_tempfile("security_margin: 1.5\n");
        assert!(RunConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = RunConfig::load_from_file(Path::new("/nonexistent/path/run.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(RunConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn overrides_take_precedence_over_file() {
        let f = yaml_tempfile("algorithm: rm\nshift_step: 4\nswitch_time: 2\n");
        let c = RunConfig::load_from_file(f.path())
            .unwrap()
            .with_overrides(&RunOverrides {
                policy: Some(Policy::Edf),
                horizon: Some(50),
                ..RunOverrides::default()
            })
            .unwrap();
        assert_eq!(c.policy, Policy::Edf);
        assert_eq!(c.horizon, HorizonSpec::Explicit(50));
        // untouched by the overrides
        assert_eq!(c.shift_step, 4);
        assert_eq!(c.switch_time, 2);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let result = RunConfig::default().with_overrides(&RunOverrides {
            horizon: Some(0),
            ..RunOverrides::default()
        });
        assert!(result.is_err());
    }
}
