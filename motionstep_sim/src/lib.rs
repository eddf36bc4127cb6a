//! MotionStep Simulation Harness
//!
//! Drives a [`motionstep_core::Sample`] the way an external render loop
//! would: ask for the largest safe step, advance, repeat.
//!
//! # Usage
//!
//! ```ignore
//! use motionstep_sim::{RunConfig, ScenarioRunner};
//! use motionstep_sim::scenarios::ScenarioId;
//!
//! let runner = ScenarioRunner::new(RunConfig::default())?;
//! let result = runner.run(ScenarioId::Groups)?;
//! println!("{} steps", result.run.step_count());
//! ```

mod config;
mod error;
mod exporter;
mod generator;
mod runner;
mod stepper;
pub mod scenarios;

pub use config::RunConfig;
pub use error::SimError;
pub use exporter::StepExport;
pub use generator::{SceneGenerator, MATERIAL_PALETTE};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use stepper::{StepOutcome, StepRecord, StepRun, Stepper};
