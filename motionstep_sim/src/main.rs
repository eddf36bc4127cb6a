//! MotionStep Simulator CLI
//!
//! Build a scenario, step it pixel by pixel and report or export the log.

use anyhow::{bail, Context, Result};
use clap::Parser;
use motionstep_sim::scenarios::ScenarioId;
use motionstep_sim::{RunConfig, ScenarioResult, ScenarioRunner, StepExport};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// MotionStep stepping-loop CLI
#[derive(Parser, Debug)]
#[command(name = "motionstep-sim")]
#[command(about = "Step motionstep samples and report which objects bound each step", long_about = None)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<String>,

    /// Scenario to run (velocities, composite, groups, swarm, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Seed for generated scenes
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop stepping at this time (seconds)
    #[arg(short, long)]
    end_time: Option<f64>,

    /// Maximum number of steps per run
    #[arg(long)]
    max_steps: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON summary on stdout
    #[arg(long)]
    json: bool,

    /// Export the full step log of a single scenario to this JSON file
    #[arg(long)]
    export: Option<String>,
}

impl Args {
    fn resolve_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config from {}", path))?,
            None => RunConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(end_time) = self.end_time {
            config.end_time_s = end_time;
        }
        if let Some(max_steps) = self.max_steps {
            config.max_steps = max_steps;
        }
        Ok(config)
    }

    fn scenarios(&self) -> Result<Vec<ScenarioId>> {
        if self.scenario == "all" {
            return Ok(ScenarioId::all());
        }
        let scenario = self
            .scenario
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Available scenarios: velocities, composite, groups, swarm, all")?;
        Ok(vec![scenario])
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn report(result: &ScenarioResult) {
    let run = &result.run;
    if result.completed() {
        info!(
            "✓ {} (seed={}) {:?} after {} steps at t={:.6}s",
            result.scenario.name(),
            result.seed,
            run.outcome,
            run.step_count(),
            run.final_time_s
        );
    } else {
        warn!(
            "✗ {} (seed={}) stopped at step limit, t={:.6}s",
            result.scenario.name(),
            result.seed,
            run.final_time_s
        );
    }
    if let Some(min) = result.min_step_s() {
        info!("  objects={} materials={:?} min_step={:.3e}s", result.object_count, result.materials, min);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = args.resolve_config()?;
    let scenarios = args.scenarios()?;
    let runner = ScenarioRunner::new(config.clone()).context("Invalid run configuration")?;

    if !args.json {
        info!("MotionStep Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    if let Some(export_path) = &args.export {
        if scenarios.len() != 1 {
            bail!("--export only supports a single scenario, not 'all'");
        }
        let result = runner.run(scenarios[0])?;
        report(&result);
        StepExport::from_result(&result, config.pixel_size().inner_meters(), config.shape)
            .write_to_file(export_path)?;
        info!("Exported {} steps to {}", result.run.step_count(), export_path);
        return Ok(());
    }

    let mut results = Vec::new();
    for scenario in scenarios {
        let result = runner
            .run(scenario)
            .with_context(|| format!("Scenario {} failed", scenario))?;
        if !args.json {
            report(&result);
        }
        results.push(result);
    }

    let incomplete = results.iter().filter(|r| !r.completed()).count();

    if args.json {
        let summary = serde_json::json!({
            "seed": config.seed,
            "pixel_size_m": config.pixel_size().inner_meters(),
            "total": results.len(),
            "incomplete": incomplete,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "outcome": r.run.outcome,
                    "steps": r.run.step_count(),
                    "final_time_s": r.run.final_time_s,
                    "min_step_s": r.min_step_s(),
                    "objects": r.object_count,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if incomplete > 0 {
        error!("{}/{} runs hit the step limit", incomplete, results.len());
    } else {
        info!("All {} runs completed", results.len());
    }

    if incomplete > 0 {
        std::process::exit(1);
    }
    Ok(())
}
