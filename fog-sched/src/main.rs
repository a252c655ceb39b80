/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use tracing::{error, info};

use fog_sched::config::case::{find_cases, load_case};
use fog_sched::config::{RunConfig, RunOverrides};
use fog_sched::render::{render, OutputFormat};
use fog_sched::scheduler::{Objective, Policy, StaticScheduler};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Static EDF/RM scheduler for fog computing platforms.
///
/// Example:
///   fog-sched --case cases/perception.yaml -a rm -o cumulated_free -f yaml
///   fog-sched --collection cases/ -f raw
#[derive(Debug, Parser)]
#[command(
    name = "fog-sched",
    about = "Static DAG scheduler with slack maximisation for fog computing platforms",
    long_about = None,
    group(ArgGroup::new("input").required(true).args(["case", "collection"])),
)]
struct Cli {
    /// Path to the YAML case file (nodes, tasks, applications).
    #[arg(long = "case")]
    case: Option<PathBuf>,

    /// Directory searched recursively for case files (*.yaml, *.yml).
    #[arg(long = "collection")]
    collection: Option<PathBuf>,

    /// Path to a YAML run configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Scheduling policy: edf or rm.
    #[arg(short = 'a', long = "algorithm")]
    algorithm: Option<String>,

    /// Slack objective: cumulated_free, nrml_dist_free or min_e2e_app_del.
    #[arg(short = 'o', long = "objective")]
    objective: Option<String>,

    /// Output format.
    #[arg(short = 'f', long = "format", value_enum, default_value = "raw")]
    format: OutputFormat,

    /// Extra shift step tried by the slack pass.
    #[arg(short = 's', long = "step")]
    step: Option<u64>,

    /// Maximum number of accepted slack-pass moves.
    #[arg(short = 't', long = "trial-limit")]
    trial_limit: Option<u32>,

    /// Explicit scheduling horizon (default: hyperperiod).
    #[arg(long = "horizon")]
    horizon: Option<u64>,

    /// Cost of a criticality switch between consecutive intervals.
    #[arg(long = "switch-time")]
    switch_time: Option<u64>,

    /// Security margin of the utilisation filter, in (0, 1].
    #[arg(long = "margin")]
    margin: Option<f64>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Result<RunOverrides> {
        Ok(RunOverrides {
            policy: self
                .algorithm
                .as_deref()
                .map(str::parse::<Policy>)
                .transpose()
                .context("Invalid --algorithm")?,
            objective: self
                .objective
                .as_deref()
                .map(str::parse::<Objective>)
                .transpose()
                .context("Invalid --objective")?,
            horizon: self.horizon,
            switch_time: self.switch_time,
            shift_step: self.step,
            iteration_budget: self.trial_limit,
            security_margin: self.margin,
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        case = ?cli.case,
        collection = ?cli.collection,
        config = ?cli.config,
        format = ?cli.format,
        "fog-sched starting"
    );

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let base = match &cli.config {
        Some(path) => RunConfig::load_from_file(path)?,
        None => RunConfig::default(),
    };
    let config = base.with_overrides(&cli.overrides()?)?;

    info!(
        policy = %config.policy,
        objective = %config.objective,
        horizon = ?config.horizon,
        shift_step = config.shift_step,
        iteration_budget = config.iteration_budget,
        security_margin = config.security_margin,
        "Configuration"
    );

    let Some(dir) = &cli.collection else {
        let case = cli.case.as_deref().context("No --case given")?;
        print!("{}", schedule_case(case, &config, cli.format)?);
        return Ok(());
    };

    // Each case is scheduled independently; one failure does not stop the
    // rest of the collection.
    let cases = find_cases(dir)?;
    let mut failed = 0;
    for case in &cases {
        match schedule_case(case, &config, cli.format) {
            Ok(output) => {
                println!("== {} ==", case.display());
                print!("{output}");
            }
            Err(e) => {
                error!(case = %case.display(), "{:#}", e);
                failed += 1;
            }
        }
    }

    info!(cases = cases.len(), failed, "collection complete");
    if failed > 0 {
        bail!("{failed} of {} cases failed", cases.len());
    }
    Ok(())
}

fn schedule_case(path: &Path, config: &RunConfig, format: OutputFormat) -> Result<String> {
    let graph = load_case(path)?;
    let outcome = StaticScheduler::new(config.clone())
        .run(&graph)
        .context("Scheduling failed")?;

    render(&outcome, &graph, format)
}
