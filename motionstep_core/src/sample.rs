//! The Sample - materials mapped to the graphical objects made of them.
//!
//! A sample drives two queries for an external stepping loop:
//! 1. **Moved materials**: which materials move at least a pixel in a window
//! 2. **Moved groups**: the largest safe time step before any object
//!    crosses a pixel, and which objects bound it

use crate::error::{SampleError, StructuralError};
use crate::objects::{ObjectGraph, ObjectId, Transition};
use crate::trajectory::Trajectory;
use crate::units::{ImageShape, Length, Time};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, trace};

/// Output of [`Sample::get_moved_groups`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovedGroups {
    /// Smallest step across all top-level objects, `Time::INFINITY` if idle
    pub delta: Time,

    /// Contributors whose step equals `delta` exactly
    pub group: BTreeSet<ObjectId>,
}

impl MovedGroups {
    fn idle() -> Self {
        Self {
            delta: Time::INFINITY,
            group: BTreeSet::new(),
        }
    }

    /// True when nothing is scheduled to move.
    pub fn is_idle(&self) -> bool {
        !self.delta.is_finite()
    }

    /// The step to take, or `None` when idle.
    pub fn next_step(&self) -> Option<Time> {
        if self.is_idle() {
            None
        } else {
            Some(self.delta)
        }
    }
}

/// Materials and their objects, plus the discretization used for stepping.
///
/// `M` is the material identifier, a `String` unless the caller has a
/// richer key type.
///
/// The sample owns its graph and only lets it grow, so every registered
/// handle stays valid for the sample's lifetime.
#[derive(Debug, Clone)]
pub struct Sample<M = String> {
    graph: ObjectGraph,

    /// Material -> top-level objects in insertion order
    materials: HashMap<M, Vec<ObjectId>>,

    shape: ImageShape,

    pixel_size: Length,
}

impl<M> Sample<M>
where
    M: Eq + Hash + Ord + Clone + std::fmt::Debug,
{
    /// Create a sample with no materials.
    pub fn new(graph: ObjectGraph, shape: impl Into<ImageShape>, pixel_size: Length) -> Self {
        Self {
            graph,
            materials: HashMap::new(),
            shape: shape.into(),
            pixel_size,
        }
    }

    /// Create a sample pre-populated from `(material, objects)` pairs.
    pub fn with_materials<I, O>(
        graph: ObjectGraph,
        initial: I,
        shape: impl Into<ImageShape>,
        pixel_size: Length,
    ) -> Result<Self, SampleError>
    where
        I: IntoIterator<Item = (M, O)>,
        O: IntoIterator<Item = ObjectId>,
    {
        let mut sample = Self::new(graph, shape, pixel_size);
        for (material, objects) in initial {
            // An empty object list still registers the material
            sample.materials.entry(material.clone()).or_default();
            for id in objects {
                sample.add(material.clone(), id)?;
            }
        }
        Ok(sample)
    }

    /// Append `id` to `material`'s objects. Duplicates are kept.
    pub fn add(&mut self, material: M, id: ObjectId) -> Result<(), SampleError> {
        if !self.graph.contains(id) {
            return Err(SampleError::UnknownObject(id));
        }
        debug!("Material {:?} += {}", material, id);
        self.materials.entry(material).or_default().push(id);
        Ok(())
    }

    /// Snapshot of `material`'s objects; empty for unknown materials.
    ///
    /// Later calls to [`add`](Self::add) do not affect a returned snapshot.
    pub fn get_objects(&self, material: &M) -> Arc<[ObjectId]> {
        match self.materials.get(material) {
            Some(objects) => Arc::from(objects.as_slice()),
            None => Arc::from(Vec::new()),
        }
    }

    /// All registered materials, sorted.
    pub fn materials(&self) -> Vec<M> {
        let mut out: Vec<M> = self.materials.keys().cloned().collect();
        out.sort();
        out
    }

    /// Every top-level object across all materials.
    pub fn objects(&self) -> BTreeSet<ObjectId> {
        self.materials.values().flatten().copied().collect()
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    /// Insert a metaball into the sample's graph.
    pub fn insert_metaball(&mut self, trajectory: Trajectory, radius: Length) -> ObjectId {
        self.graph.insert_metaball(trajectory, radius)
    }

    /// Insert an empty composite into the sample's graph.
    pub fn insert_composite(&mut self, trajectory: Trajectory) -> ObjectId {
        self.graph.insert_composite(trajectory)
    }

    /// Nest `child` under `parent` with the graph's usual structural checks.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), StructuralError> {
        self.graph.add(parent, child)
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    pub fn pixel_size(&self) -> Length {
        self.pixel_size
    }

    /// Materials with at least one object moving a pixel or more in `[t0, t1)`.
    pub fn get_moved_materials(&self, t0: Time, t1: Time) -> HashSet<M> {
        self.materials
            .iter()
            .filter(|(_, objects)| {
                objects
                    .iter()
                    .any(|id| self.graph.moved_unchecked(*id, t0, t1, self.pixel_size))
            })
            .map(|(material, _)| material.clone())
            .collect()
    }

    /// Largest safe step from `current_time` and the objects that bound it.
    ///
    /// Each top-level object is evaluated once even if it is registered
    /// under several materials. Ties are exact.
    pub fn get_moved_groups(&self, current_time: Time) -> MovedGroups {
        let transitions: Vec<Transition> = self
            .objects()
            .into_iter()
            .map(|id| self.graph.transition_unchecked(id, current_time, self.pixel_size))
            .filter(Transition::is_finite)
            .collect();

        let Some(delta) = transitions.iter().map(|t| t.delta).reduce(Time::min) else {
            trace!("Sample idle at {}", current_time);
            return MovedGroups::idle();
        };

        let group: BTreeSet<ObjectId> = transitions
            .iter()
            .filter(|t| t.delta == delta)
            .map(|t| t.contributor)
            .collect();

        trace!("Next step at {} + {}: {} contributor(s)", current_time, delta, group.len());
        MovedGroups { delta, group }
    }
}
