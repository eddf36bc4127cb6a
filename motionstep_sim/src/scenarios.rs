//! Built-in scenes for exercising the stepping loop.

use crate::config::RunConfig;
use crate::error::SimError;
use crate::generator::SceneGenerator;
use motionstep_core::{Length, ObjectGraph, Sample, Trajectory, Velocity};
use nalgebra::Point3;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Four metaballs at 10, 1, 0.1 mm/s and standing still
    Velocities,

    /// The two slower metaballs wrapped in one stationary composite
    Composite,

    /// Nested composites whose fastest members tie
    Groups,

    /// Seeded random scene
    Swarm,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Velocities,
            ScenarioId::Composite,
            ScenarioId::Groups,
            ScenarioId::Swarm,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Velocities => "velocities",
            ScenarioId::Composite => "composite",
            ScenarioId::Groups => "groups",
            ScenarioId::Swarm => "swarm",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Velocities => "Four materials moving at 10, 1, 0.1 and 0 mm/s",
            ScenarioId::Composite => "Slow metaballs grouped under one stationary composite",
            ScenarioId::Groups => "Two composites tie on their fastest member, one behind a wrapper",
            ScenarioId::Swarm => "Random nested scene derived from the seed",
        }
    }

    /// Builds the scenario's sample.
    pub fn build(&self, config: &RunConfig) -> Result<Sample, SimError> {
        match self {
            ScenarioId::Velocities => build_velocities(config),
            ScenarioId::Composite => build_composite(config),
            ScenarioId::Groups => build_groups(config),
            ScenarioId::Swarm => SceneGenerator::new(config.seed).generate(config),
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "velocities" | "a" => Ok(ScenarioId::Velocities),
            "composite" | "b" => Ok(ScenarioId::Composite),
            "groups" | "c" => Ok(ScenarioId::Groups),
            "swarm" | "random" => Ok(ScenarioId::Swarm),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// Ten points along x covering `length_mm`.
pub fn linear_path(length_mm: f64, velocity_mm_s: f64) -> Result<Trajectory, SimError> {
    let points = (0..10)
        .map(|i| Point3::new(i as f64 / 9.0 * length_mm * 1e-3, 0.0, 0.0))
        .collect();
    Ok(Trajectory::new(points, Velocity::millimeters_per_second(velocity_mm_s))?)
}

fn still() -> Trajectory {
    Trajectory::stationary(Point3::origin())
}

fn build_velocities(config: &RunConfig) -> Result<Sample, SimError> {
    let mut graph = ObjectGraph::new();
    let balls = [
        ("PMMA", 10.0, 1.0),
        ("glass", 1.0, 2.0),
        ("PVC", 0.1, 3.0),
        ("stat", 0.0, 4.0),
    ];

    let mut assignments = Vec::new();
    for (material, velocity, radius) in balls {
        let id = graph.insert_metaball(linear_path(1.0, velocity)?, Length::millimeters(radius));
        assignments.push((material.to_string(), [id]));
    }

    Ok(Sample::with_materials(
        graph,
        assignments,
        config.image_shape(),
        config.pixel_size(),
    )?)
}

fn build_composite(config: &RunConfig) -> Result<Sample, SimError> {
    let mut graph = ObjectGraph::new();
    let mb_1 = graph.insert_metaball(linear_path(1.0, 1.0)?, Length::millimeters(2.0));
    let mb_2 = graph.insert_metaball(linear_path(1.0, 0.1)?, Length::millimeters(3.0));
    let comp = graph.insert_composite(still());
    graph.add(comp, mb_1)?;
    graph.add(comp, mb_2)?;

    Ok(Sample::with_materials(
        graph,
        [("PMMA".to_string(), [comp])],
        config.image_shape(),
        config.pixel_size(),
    )?)
}

fn build_groups(config: &RunConfig) -> Result<Sample, SimError> {
    let mut graph = ObjectGraph::new();
    let c_1 = graph.insert_composite(still());
    let c_2 = graph.insert_composite(still());
    let c_3 = graph.insert_composite(still());

    for (parent, velocity) in [(c_1, 1.0), (c_1, 3.0), (c_2, 2.0), (c_2, 3.0)] {
        let ball = graph.insert_metaball(linear_path(1.0, velocity)?, Length::millimeters(velocity));
        graph.add(parent, ball)?;
    }
    graph.add(c_3, c_2)?;

    let mut sample = Sample::new(graph, config.image_shape(), config.pixel_size());
    sample.add("pmma".to_string(), c_1)?;
    sample.add("glass".to_string(), c_3)?;
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use motionstep_core::Time;
    use std::collections::HashSet;

    #[test]
    fn test_scenario_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
        assert_eq!("B".parse::<ScenarioId>(), Ok(ScenarioId::Composite));
        assert!("nope".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_velocities_scenario() {
        let sample = ScenarioId::Velocities.build(&RunConfig::default()).unwrap();
        assert_eq!(sample.materials(), vec!["PMMA", "PVC", "glass", "stat"]);

        let moved = sample.get_moved_materials(Time::ZERO, Time::seconds(1e-3));
        let expected: HashSet<String> = ["PMMA", "glass"].iter().map(|s| s.to_string()).collect();
        assert_eq!(moved, expected);
    }

    #[test]
    fn test_groups_scenario() {
        let sample = ScenarioId::Groups.build(&RunConfig::default()).unwrap();
        let groups = sample.get_moved_groups(Time::ZERO);

        assert_relative_eq!(groups.delta.inner_seconds(), 1e-3 / 3.0, epsilon = 1e-15);
        assert_eq!(groups.group.len(), 2);

        // Neither member is a leaf, and the wrapper registered as "glass" is flattened away
        let glass_top = sample.get_objects(&"glass".to_string())[0];
        assert!(!groups.group.contains(&glass_top));
        for id in &groups.group {
            assert!(sample.graph().kind(*id).unwrap().is_composite());
        }
    }

    #[test]
    fn test_swarm_scenario_is_deterministic() {
        let config = RunConfig::default();
        let a = ScenarioId::Swarm.build(&config).unwrap();
        let b = ScenarioId::Swarm.build(&config).unwrap();
        let positions = |ids: &std::collections::BTreeSet<motionstep_core::ObjectId>| -> Vec<usize> {
            ids.iter().map(|id| id.index()).collect()
        };
        assert_eq!(a.materials(), b.materials());
        assert_eq!(positions(&a.objects()), positions(&b.objects()));

        let (ga, gb) = (a.get_moved_groups(Time::ZERO), b.get_moved_groups(Time::ZERO));
        assert_eq!(ga.delta, gb.delta);
        assert_eq!(positions(&ga.group), positions(&gb.group));
    }
}
