//! Run configuration, loadable from JSON and overridable from the CLI.

use crate::error::SimError;
use motionstep_core::{ImageShape, Length, Time};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a stepping run.
///
/// Plain numbers in fixed units so the JSON stays readable; use the
/// accessor methods to get typed quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Master seed for generated scenes
    pub seed: u64,

    /// Discretization threshold in micrometres
    pub pixel_size_um: f64,

    /// Output image shape [height, width]
    pub shape: [usize; 2],

    /// Time the stepping loop starts at (seconds)
    pub start_time_s: f64,

    /// Time the stepping loop stops at (seconds)
    pub end_time_s: f64,

    /// Hard cap on recorded steps
    pub max_steps: usize,

    /// Steps shorter than this are widened to it (seconds)
    pub min_step_s: f64,

    /// Leaf count for generated scenes
    pub num_objects: usize,

    /// Maximum composite nesting for generated scenes
    pub max_depth: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            pixel_size_um: 1.0, // 1e-3 mm
            shape: [512, 512],
            start_time_s: 0.0,
            end_time_s: 0.01,
            max_steps: 10_000,
            min_step_s: 1e-12,
            num_objects: 20,
            max_depth: 3,
        }
    }
}

impl RunConfig {
    /// Loads a config from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::io(path.display().to_string(), e))?;
        let config: RunConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable by the stepping loop.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.pixel_size_um.is_finite() && self.pixel_size_um > 0.0) {
            return Err(SimError::invalid(format!(
                "pixel_size_um must be positive, got {}",
                self.pixel_size_um
            )));
        }
        if !(self.start_time_s.is_finite() && self.end_time_s.is_finite()) {
            return Err(SimError::invalid("start and end times must be finite"));
        }
        if self.end_time_s < self.start_time_s {
            return Err(SimError::invalid(format!(
                "end_time_s ({}) is before start_time_s ({})",
                self.end_time_s, self.start_time_s
            )));
        }
        if !(self.min_step_s.is_finite() && self.min_step_s > 0.0) {
            return Err(SimError::invalid("min_step_s must be positive"));
        }
        if self.max_steps == 0 {
            return Err(SimError::invalid("max_steps must be at least 1"));
        }
        Ok(())
    }

    pub fn pixel_size(&self) -> Length {
        Length::micrometers(self.pixel_size_um)
    }

    pub fn image_shape(&self) -> ImageShape {
        ImageShape::new(self.shape[0], self.shape[1])
    }

    pub fn start_time(&self) -> Time {
        Time::seconds(self.start_time_s)
    }

    pub fn end_time(&self) -> Time {
        Time::seconds(self.end_time_s)
    }

    pub fn min_step(&self) -> Time {
        Time::seconds(self.min_step_s)
    }
}
