//! Seeded random scene generation.
//!
//! All randomness comes from a ChaCha8 stream seeded by the run seed, so the
//! same seed always yields the same graph, materials and trajectories.

use crate::config::RunConfig;
use crate::error::SimError;
use motionstep_core::{Length, ObjectGraph, ObjectId, Sample, Time, Trajectory, Velocity};
use nalgebra::{Point3, Vector3};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal, UnitSphere};
use tracing::debug;

/// Materials handed out to top-level objects.
pub const MATERIAL_PALETTE: [&str; 5] = ["PMMA", "glass", "PVC", "water", "air"];

/// Fraction of leaves that never move.
const STATIONARY_FRACTION: f64 = 0.1;

/// Chance that a finished group gets wrapped in a single-child composite.
const WRAP_PROBABILITY: f64 = 0.3;

/// Builds random samples of metaballs and nested composites.
pub struct SceneGenerator {
    rng: ChaCha8Rng,
}

impl SceneGenerator {
    /// Creates a generator for the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generates a sample with `config.num_objects` leaves.
    pub fn generate(&mut self, config: &RunConfig) -> Result<Sample, SimError> {
        let mut graph = ObjectGraph::new();

        // Speeds in mm/s, median 1 mm/s
        let speed = LogNormal::new(0.0, 1.0)
            .map_err(|e| SimError::invalid(format!("speed distribution: {}", e)))?;

        let mut leaves = Vec::with_capacity(config.num_objects);
        for _ in 0..config.num_objects {
            let velocity = if self.rng.gen_bool(STATIONARY_FRACTION) {
                0.0
            } else {
                speed.sample(&mut self.rng)
            };
            let trajectory = self.random_trajectory(velocity)?;
            let radius = Length::micrometers(self.rng.gen_range(10.0..200.0));
            leaves.push(graph.insert_metaball(trajectory, radius));
        }

        let top_level = self.group(&mut graph, leaves, config.max_depth)?;

        let mut sample = Sample::new(graph, config.image_shape(), config.pixel_size());
        for id in top_level {
            let material = MATERIAL_PALETTE
                .choose(&mut self.rng)
                .copied()
                .unwrap_or(MATERIAL_PALETTE[0]);
            sample.add(material.to_string(), id)?;
        }

        debug!(
            "Generated {} objects across {} materials",
            sample.graph().len(),
            sample.materials().len()
        );
        Ok(sample)
    }

    /// Random walk of 2-5 control points, each leg 0.1-1 mm, starting within 10 ms.
    fn random_trajectory(&mut self, velocity_mm_s: f64) -> Result<Trajectory, SimError> {
        let legs = self.rng.gen_range(1..=4);
        let mut point = Point3::origin();
        let mut points = vec![point];
        for _ in 0..legs {
            let dir: [f64; 3] = UnitSphere.sample(&mut self.rng);
            let leg = self.rng.gen_range(0.1e-3..1e-3);
            point += Vector3::from(dir) * leg;
            points.push(point);
        }
        let start = Time::milliseconds(self.rng.gen_range(0.0..10.0));
        Ok(Trajectory::new(points, Velocity::millimeters_per_second(velocity_mm_s))?
            .with_start_time(start))
    }

    /// Folds `members` into composites, `depth` levels at most.
    ///
    /// Members are chunked into groups of 1-3; groups larger than one become
    /// a composite, and some groups are wrapped once more in a single-child
    /// composite.
    fn group(
        &mut self,
        graph: &mut ObjectGraph,
        members: Vec<ObjectId>,
        depth: usize,
    ) -> Result<Vec<ObjectId>, SimError> {
        if depth == 0 || members.len() <= 1 {
            return Ok(members);
        }

        let mut grouped = Vec::new();
        let mut rest = members.as_slice();
        while !rest.is_empty() {
            let size = self.rng.gen_range(1..=3).min(rest.len());
            let (chunk, tail) = rest.split_at(size);
            rest = tail;

            let mut top = if chunk.len() == 1 {
                chunk[0]
            } else {
                let comp = graph.insert_composite(Trajectory::stationary(Point3::origin()));
                for child in chunk {
                    graph.add(comp, *child)?;
                }
                comp
            };
            if self.rng.gen_bool(WRAP_PROBABILITY) {
                let wrapper = graph.insert_composite(Trajectory::stationary(Point3::origin()));
                graph.add(wrapper, top)?;
                top = wrapper;
            }
            grouped.push(top);
        }

        self.group(graph, grouped, depth - 1)
    }
}
