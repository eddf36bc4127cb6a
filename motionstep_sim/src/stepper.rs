//! Stepper - the external loop that advances a sample pixel by pixel.
//!
//! Each iteration asks the sample for its largest safe step, records which
//! objects bound it and which materials moved, then advances time.

use motionstep_core::{ObjectId, Sample, Time};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Why a stepping run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The end time was reached
    ReachedEnd,

    /// Nothing left to move
    Idle,

    /// `max_steps` was hit before the end time
    StepLimit,
}

/// One advance of the stepping loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Time at the start of the step (seconds)
    pub time_s: f64,

    /// Length of the step actually taken (seconds)
    pub delta_s: f64,

    /// Objects whose motion bounded the step
    pub group: Vec<ObjectId>,

    /// Materials that moved at least one pixel during the step, sorted
    pub moved_materials: Vec<String>,

    /// Step was cut short by the end time
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub clamped: bool,
}

/// Result of a full stepping run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRun {
    pub outcome: StepOutcome,
    pub final_time_s: f64,
    pub steps: Vec<StepRecord>,
}

impl StepRun {
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

/// Drives a [`Sample`] from a start time to an end time.
#[derive(Debug, Clone)]
pub struct Stepper {
    start: Time,
    end: Time,
    max_steps: usize,
    min_step: Time,
}

impl Stepper {
    /// Creates a stepper over `[start, end]`.
    pub fn new(start: Time, end: Time) -> Self {
        Self {
            start,
            end,
            max_steps: 10_000,
            min_step: Time::seconds(1e-12),
        }
    }

    /// Sets the step cap.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the smallest step the loop will take.
    pub fn with_min_step(mut self, min_step: Time) -> Self {
        self.min_step = min_step;
        self
    }

    /// Runs the loop to completion.
    pub fn run(&self, sample: &Sample) -> StepRun {
        let mut time = self.start;
        let mut steps = Vec::new();

        let outcome = loop {
            if time >= self.end {
                break StepOutcome::ReachedEnd;
            }
            if steps.len() >= self.max_steps {
                warn!("Step limit {} hit at {}", self.max_steps, time);
                break StepOutcome::StepLimit;
            }

            let groups = sample.get_moved_groups(time);
            let Some(mut delta) = groups.next_step() else {
                debug!("Sample idle at {}", time);
                break StepOutcome::Idle;
            };

            if delta < self.min_step {
                warn!("Step {} below minimum, widening to {}", delta, self.min_step);
                delta = self.min_step;
            }

            let remaining = self.end - time;
            let clamped = delta > remaining;
            let (taken, next) = if clamped {
                (remaining, self.end)
            } else {
                (delta, time + delta)
            };

            let mut moved_materials: Vec<String> =
                sample.get_moved_materials(time, next).into_iter().collect();
            moved_materials.sort();

            debug!(
                "t={} dt={} group={} moved={:?}",
                time,
                taken,
                groups.group.len(),
                moved_materials
            );

            steps.push(StepRecord {
                time_s: time.inner_seconds(),
                delta_s: taken.inner_seconds(),
                group: groups.group.into_iter().collect(),
                moved_materials,
                clamped,
            });
            time = next;
        };

        info!("Stepping finished: {:?} after {} steps at {}", outcome, steps.len(), time);

        StepRun {
            outcome,
            final_time_s: time.inner_seconds(),
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::generator::SceneGenerator;
    use approx::assert_relative_eq;
    use motionstep_core::{Length, ObjectGraph, Trajectory, Velocity};
    use nalgebra::Point3;
    use proptest::prelude::*;

    fn linear_mm(velocity_mm_s: f64) -> Trajectory {
        Trajectory::new(
            vec![Point3::origin(), Point3::new(1e-3, 0.0, 0.0)],
            Velocity::millimeters_per_second(velocity_mm_s),
        )
        .unwrap()
    }

    fn single_ball(velocity_mm_s: f64) -> (Sample, ObjectId) {
        let mut graph = ObjectGraph::new();
        let ball = graph.insert_metaball(linear_mm(velocity_mm_s), Length::millimeters(1.0));
        let mut sample: Sample = Sample::new(graph, (2, 2), Length::micrometers(100.0));
        sample.add("PMMA".into(), ball).unwrap();
        (sample, ball)
    }

    #[test]
    fn test_steps_until_idle() {
        // 1 mm path in 100 um pixels: ten steps, then nothing moves
        let (sample, ball) = single_ball(1.0);
        let run = Stepper::new(Time::ZERO, Time::seconds(10.0)).run(&sample);

        assert_eq!(run.outcome, StepOutcome::Idle);
        assert_eq!(run.step_count(), 10);
        for step in &run.steps {
            assert_relative_eq!(step.delta_s, 0.1, epsilon = 1e-9);
            assert_eq!(step.group, vec![ball]);
            assert_eq!(step.moved_materials, vec!["PMMA".to_string()]);
        }
        assert_relative_eq!(run.final_time_s, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_last_step_clamped_to_end() {
        let (sample, _) = single_ball(1.0);
        let run = Stepper::new(Time::ZERO, Time::seconds(0.25)).run(&sample);

        assert_eq!(run.outcome, StepOutcome::ReachedEnd);
        assert_eq!(run.step_count(), 3);
        let last = run.steps.last().unwrap();
        assert!(last.clamped);
        assert_relative_eq!(last.delta_s, 0.05, epsilon = 1e-9);
        assert_relative_eq!(run.final_time_s, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_step_limit() {
        let (sample, _) = single_ball(1.0);
        let run = Stepper::new(Time::ZERO, Time::seconds(10.0))
            .with_max_steps(4)
            .run(&sample);
        assert_eq!(run.outcome, StepOutcome::StepLimit);
        assert_eq!(run.step_count(), 4);
    }

    #[test]
    fn test_min_step_widens_tiny_steps() {
        let (sample, _) = single_ball(1.0);
        let run = Stepper::new(Time::ZERO, Time::seconds(1.0))
            .with_min_step(Time::seconds(0.3))
            .run(&sample);
        assert_relative_eq!(run.steps[0].delta_s, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_stationary_sample_is_idle_immediately() {
        let mut graph = ObjectGraph::new();
        let ball = graph.insert_metaball(Trajectory::stationary(Point3::origin()), Length::millimeters(1.0));
        let mut sample: Sample = Sample::new(graph, (2, 2), Length::micrometers(1.0));
        sample.add("stat".into(), ball).unwrap();

        let run = Stepper::new(Time::ZERO, Time::seconds(1.0)).run(&sample);
        assert_eq!(run.outcome, StepOutcome::Idle);
        assert!(run.steps.is_empty());
        assert_eq!(run.final_time_s, 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_generated_scenes_step_forward(seed in any::<u64>()) {
            let config = RunConfig {
                seed,
                num_objects: 8,
                max_depth: 2,
                end_time_s: 5e-3,
                ..Default::default()
            };
            let sample = SceneGenerator::new(seed).generate(&config).unwrap();
            let run = Stepper::new(config.start_time(), config.end_time())
                .with_max_steps(50_000)
                .run(&sample);

            prop_assert_ne!(run.outcome, StepOutcome::StepLimit);
            let mut last = f64::NEG_INFINITY;
            for step in &run.steps {
                prop_assert!(step.time_s > last);
                prop_assert!(step.delta_s > 0.0);
                prop_assert!(!step.group.is_empty());
                last = step.time_s;
            }
            prop_assert!(run.final_time_s <= config.end_time_s + 1e-12);
        }
    }
}
