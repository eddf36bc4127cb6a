//! JSON exporter for stepping runs.
//!
//! Exports the full step log so downstream renderers can replay which
//! objects were advanced and when.

use crate::error::SimError;
use crate::runner::ScenarioResult;
use crate::stepper::{StepOutcome, StepRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// Complete stepping export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Discretization threshold (metres)
    pub pixel_size_m: f64,

    /// Output image shape [height, width]
    pub shape: [usize; 2],

    /// Registered materials
    pub materials: Vec<String>,

    /// Why stepping stopped
    pub outcome: StepOutcome,

    /// Simulation time at the end of the run (seconds)
    pub final_time_s: f64,

    /// All steps
    pub steps: Vec<StepRecord>,
}

impl StepExport {
    /// Creates an export from a finished scenario.
    pub fn from_result(result: &ScenarioResult, pixel_size_m: f64, shape: [usize; 2]) -> Self {
        Self {
            scenario: result.scenario.name().to_string(),
            seed: result.seed,
            pixel_size_m,
            shape,
            materials: result.materials.clone(),
            outcome: result.run.outcome,
            final_time_s: result.run.final_time_s,
            steps: result.run.steps.clone(),
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path).map_err(|e| SimError::io(path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| SimError::io(path, e))?;
        Ok(())
    }
}
