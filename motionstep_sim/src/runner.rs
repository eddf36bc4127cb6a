//! Scenario runner - builds a scene and drives it with the stepper.

use crate::config::RunConfig;
use crate::error::SimError;
use crate::scenarios::ScenarioId;
use crate::stepper::{StepOutcome, StepRun, Stepper};
use tracing::info;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Number of objects in the scene graph
    pub object_count: usize,

    /// Registered materials, sorted
    pub materials: Vec<String>,

    /// The stepping run itself
    pub run: StepRun,
}

impl ScenarioResult {
    /// Smallest step taken, if any.
    pub fn min_step_s(&self) -> Option<f64> {
        self.run
            .steps
            .iter()
            .filter(|s| !s.clamped)
            .map(|s| s.delta_s)
            .reduce(f64::min)
    }

    /// A run that hit the step cap did not cover the requested interval.
    pub fn completed(&self) -> bool {
        self.run.outcome != StepOutcome::StepLimit
    }
}

/// Runs scenarios under one configuration.
pub struct ScenarioRunner {
    config: RunConfig,
}

impl ScenarioRunner {
    /// Creates a runner; the config is validated up front.
    pub fn new(config: RunConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Builds and steps a scenario.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);

        let sample = scenario.build(&self.config)?;
        let stepper = Stepper::new(self.config.start_time(), self.config.end_time())
            .with_max_steps(self.config.max_steps)
            .with_min_step(self.config.min_step());
        let run = stepper.run(&sample);

        Ok(ScenarioResult {
            scenario,
            seed: self.config.seed,
            object_count: sample.graph().len(),
            materials: sample.materials(),
            run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    fn runner(end_time_s: f64) -> ScenarioRunner {
        ScenarioRunner::new(RunConfig {
            end_time_s,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RunConfig {
            pixel_size_um: -1.0,
            ..Default::default()
        };
        assert!(ScenarioRunner::new(config).is_err());
    }

    #[test]
    fn test_groups_first_step() {
        let result = runner(1e-3).run(ScenarioId::Groups).unwrap();
        let first = &result.run.steps[0];

        assert_relative_eq!(first.delta_s, 1e-3 / 3.0, epsilon = 1e-15);
        assert_eq!(first.group.len(), 2);
        // Both tying composites moved their fastest member a pixel
        let moved: HashSet<&str> = first.moved_materials.iter().map(String::as_str).collect();
        assert_eq!(moved, HashSet::from(["glass", "pmma"]));
    }

    #[test]
    fn test_velocities_steps_are_bounded_by_fastest() {
        let result = runner(1e-3).run(ScenarioId::Velocities).unwrap();
        assert_eq!(result.run.outcome, StepOutcome::ReachedEnd);
        assert!(result.completed());

        // 1 um at 10 mm/s
        assert_relative_eq!(result.min_step_s().unwrap(), 1e-4, epsilon = 1e-12);
        for step in &result.run.steps {
            assert!(step.moved_materials.contains(&"PMMA".to_string()) || step.clamped);
        }
    }

    #[test]
    fn test_composite_moves_only_after_a_pixel() {
        let result = runner(5e-3).run(ScenarioId::Composite).unwrap();
        // The composite's fastest child needs 1 ms per pixel
        let first = &result.run.steps[0];
        assert_relative_eq!(first.delta_s, 1e-3, epsilon = 1e-12);
        assert_eq!(first.moved_materials, vec!["PMMA".to_string()]);
        assert_eq!(first.group.len(), 1);
    }

    #[test]
    fn test_swarm_runs_to_completion() {
        let result = ScenarioRunner::new(RunConfig {
            end_time_s: 0.02,
            max_steps: 100_000,
            ..Default::default()
        })
        .unwrap()
        .run(ScenarioId::Swarm)
        .unwrap();

        assert!(result.completed());
        assert!(result.object_count >= RunConfig::default().num_objects);
        let mut last = f64::NEG_INFINITY;
        for step in &result.run.steps {
            assert!(step.time_s > last);
            assert!(step.delta_s > 0.0);
            last = step.time_s;
        }
    }
}
