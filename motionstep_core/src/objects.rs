//! Graphical objects: leaves and composites arranged in an acyclic tree.
//!
//! Objects live in an [`ObjectGraph`] arena and are addressed by
//! [`ObjectId`] handles. A composite owns an ordered list of children; each
//! child has at most one owning composite, and cycles are rejected before
//! insertion by walking the parent's ancestor chain.
//!
//! Handles are tagged with the graph that issued them (clones share the
//! tag), so a handle from another graph is reported as unknown even when its
//! index happens to be in range.

use crate::error::StructuralError;
use crate::trajectory::Trajectory;
use crate::units::{Length, Time};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, trace};

static NEXT_GRAPH_TAG: AtomicU32 = AtomicU32::new(0);

/// Stable handle to an object inside the [`ObjectGraph`] that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    graph: u32,
    index: u32,
}

impl ObjectId {
    /// Position in the issuing graph's arena.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.index)
    }
}

/// Object-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Leaf: a metaball of the given radius
    MetaBall { radius: Length },

    /// Ordered children, each with its own trajectory relative to this one
    Composite { children: Vec<ObjectId> },
}

impl ObjectKind {
    pub fn is_composite(&self) -> bool {
        matches!(self, ObjectKind::Composite { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    trajectory: Trajectory,
    kind: ObjectKind,
    parent: Option<ObjectId>,
}

/// Result of [`ObjectGraph::next_transition_time`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Time until the contributor has moved one pixel
    pub delta: Time,

    /// Object responsible for `delta` after flattening
    pub contributor: ObjectId,
}

impl Transition {
    pub fn is_finite(&self) -> bool {
        self.delta.is_finite()
    }
}

/// Arena holding every graphical object of a scene.
///
/// Deserialization replays every parent/child link through
/// [`add`](ObjectGraph::add), so a stored graph with a cycle, a shared
/// child or a parent that disagrees with its children list is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GraphRecord")]
pub struct ObjectGraph {
    tag: u32,
    nodes: Vec<Node>,
}

/// Serialized layout of an [`ObjectGraph`], accepted only after validation.
#[derive(Deserialize)]
struct GraphRecord {
    tag: u32,
    nodes: Vec<Node>,
}

impl TryFrom<GraphRecord> for ObjectGraph {
    type Error = StructuralError;

    fn try_from(record: GraphRecord) -> Result<Self, Self::Error> {
        let mut graph = ObjectGraph::new();
        let ids: Vec<ObjectId> = record
            .nodes
            .iter()
            .map(|node| match &node.kind {
                ObjectKind::MetaBall { radius } => graph.insert_metaball(node.trajectory.clone(), *radius),
                ObjectKind::Composite { .. } => graph.insert_composite(node.trajectory.clone()),
            })
            .collect();

        let stored_tag = record.tag;
        let local = |id: ObjectId| -> Result<ObjectId, StructuralError> {
            ids.get(id.index())
                .copied()
                .filter(|_| id.graph == stored_tag)
                .ok_or(StructuralError::UnknownObject(id))
        };

        for (node, &parent) in record.nodes.iter().zip(&ids) {
            if let ObjectKind::Composite { children } = &node.kind {
                for child in children {
                    graph.add(parent, local(*child)?)?;
                }
            }
        }

        for (node, &id) in record.nodes.iter().zip(&ids) {
            let stored = node.parent.map(&local).transpose()?;
            if stored != graph.nodes[id.index()].parent {
                return Err(StructuralError::InconsistentParent { child: id, parent: stored });
            }
        }

        Ok(graph)
    }
}

impl Default for ObjectGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self {
            tag: NEXT_GRAPH_TAG.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
        }
    }

    /// Insert a metaball leaf.
    pub fn insert_metaball(&mut self, trajectory: Trajectory, radius: Length) -> ObjectId {
        self.insert(trajectory, ObjectKind::MetaBall { radius })
    }

    /// Insert an empty composite.
    pub fn insert_composite(&mut self, trajectory: Trajectory) -> ObjectId {
        self.insert(
            trajectory,
            ObjectKind::Composite {
                children: Vec::new(),
            },
        )
    }

    fn insert(&mut self, trajectory: Trajectory, kind: ObjectKind) -> ObjectId {
        let id = ObjectId {
            graph: self.tag,
            index: self.nodes.len() as u32,
        };
        debug!("Inserted {} ({})", id, if kind.is_composite() { "composite" } else { "leaf" });
        self.nodes.push(Node {
            trajectory,
            kind,
            parent: None,
        });
        id
    }

    /// Append `child` to `parent`'s ordered children.
    ///
    /// Fails without modifying the graph if `parent` is not a composite, if
    /// `child` already has an owner, or if `child` is `parent` or one of its
    /// ancestors.
    pub fn add(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), StructuralError> {
        self.node(child)?;
        if !self.node(parent)?.kind.is_composite() {
            return Err(StructuralError::NotComposite(parent));
        }
        if self.ancestors_inclusive(parent).any(|id| id == child) {
            return Err(StructuralError::Cycle { parent, child });
        }
        if let Some(owner) = self.nodes[child.index()].parent {
            return Err(StructuralError::AlreadyParented { child, owner });
        }

        if let ObjectKind::Composite { children } = &mut self.nodes[parent.index()].kind {
            children.push(child);
        }
        self.nodes[child.index()].parent = Some(parent);
        debug!("Added {} to composite {}", child, parent);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` was issued by this graph (or the graph it was cloned from).
    pub fn contains(&self, id: ObjectId) -> bool {
        id.graph == self.tag && id.index() < self.nodes.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        let tag = self.tag;
        (0..self.nodes.len() as u32).map(move |index| ObjectId { graph: tag, index })
    }

    pub fn trajectory(&self, id: ObjectId) -> Result<&Trajectory, StructuralError> {
        Ok(&self.node(id)?.trajectory)
    }

    pub fn kind(&self, id: ObjectId) -> Result<&ObjectKind, StructuralError> {
        Ok(&self.node(id)?.kind)
    }

    pub fn parent(&self, id: ObjectId) -> Result<Option<ObjectId>, StructuralError> {
        Ok(self.node(id)?.parent)
    }

    /// Ordered direct children; empty for leaves.
    pub fn children(&self, id: ObjectId) -> Result<&[ObjectId], StructuralError> {
        Ok(self.children_of(self.node(id)?))
    }

    /// All descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: ObjectId) -> Result<Vec<ObjectId>, StructuralError> {
        let mut out = Vec::new();
        let mut stack: Vec<ObjectId> = self.children(id)?.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children_of(&self.nodes[next.index()]).iter().rev());
        }
        Ok(out)
    }

    /// Whether `id` or any descendant moves during `[t0, t1)`.
    pub fn is_moving_during(&self, id: ObjectId, t0: Time, t1: Time) -> Result<bool, StructuralError> {
        let node = self.node(id)?;
        Ok(self.any_in_subtree(node, &|t: &Trajectory| t.is_moving_during(t0, t1)))
    }

    /// Whether `id` or any descendant travels at least one pixel during `[t0, t1)`.
    pub fn moved(
        &self,
        id: ObjectId,
        t0: Time,
        t1: Time,
        pixel_size: Length,
    ) -> Result<bool, StructuralError> {
        self.node(id)?;
        Ok(self.moved_unchecked(id, t0, t1, pixel_size))
    }

    /// [`moved`](Self::moved) for a handle already known to belong here.
    pub(crate) fn moved_unchecked(&self, id: ObjectId, t0: Time, t1: Time, pixel_size: Length) -> bool {
        debug_assert!(self.contains(id));
        let node = &self.nodes[id.index()];
        self.any_in_subtree(node, &|t: &Trajectory| t.moved(t0, t1, pixel_size))
    }

    fn any_in_subtree(&self, node: &Node, pred: &dyn Fn(&Trajectory) -> bool) -> bool {
        pred(&node.trajectory)
            || self
                .children_of(node)
                .iter()
                .any(|c| self.any_in_subtree(&self.nodes[c.index()], pred))
    }

    /// Time until `id` (or the part of it that moves first) crosses one pixel.
    ///
    /// Leaves and childless composites report themselves. A composite with a
    /// single child passes the child's result through. A composite with
    /// several children reports itself with the fastest child's delta. A
    /// composite's own trajectory competes like a leaf's and wins ties.
    pub fn next_transition_time(
        &self,
        id: ObjectId,
        current_time: Time,
        pixel_size: Length,
    ) -> Result<Transition, StructuralError> {
        self.node(id)?;
        Ok(self.transition_unchecked(id, current_time, pixel_size))
    }

    /// [`next_transition_time`](Self::next_transition_time) for a handle
    /// already known to belong here.
    pub(crate) fn transition_unchecked(&self, id: ObjectId, current_time: Time, pixel_size: Length) -> Transition {
        debug_assert!(self.contains(id));
        self.transition_of(id, &self.nodes[id.index()], current_time, pixel_size)
    }

    fn transition_of(&self, id: ObjectId, node: &Node, current_time: Time, pixel_size: Length) -> Transition {
        let own = Transition {
            delta: node.trajectory.next_time_step(current_time, pixel_size),
            contributor: id,
        };

        let children = self.children_of(node);
        let from_children = match children {
            [] => None,
            [only] => Some(self.transition_of(*only, &self.nodes[only.index()], current_time, pixel_size)),
            many => {
                let delta = many
                    .iter()
                    .map(|c| self.transition_of(*c, &self.nodes[c.index()], current_time, pixel_size).delta)
                    .fold(Time::INFINITY, Time::min);
                Some(Transition { delta, contributor: id })
            }
        };

        let result = match from_children {
            Some(child) if child.delta < own.delta => child,
            _ => own,
        };
        trace!("{} next transition in {} via {}", id, result.delta, result.contributor);
        result
    }

    /// Spatial extent used for pixel-crossing estimates.
    ///
    /// The radius of a metaball; for composites the largest child extent.
    pub fn extent(&self, id: ObjectId) -> Result<Length, StructuralError> {
        let node = self.node(id)?;
        Ok(self.extent_of(node))
    }

    fn extent_of(&self, node: &Node) -> Length {
        match &node.kind {
            ObjectKind::MetaBall { radius } => *radius,
            ObjectKind::Composite { children } => children
                .iter()
                .map(|c| self.extent_of(&self.nodes[c.index()]))
                .fold(Length::ZERO, Length::max),
        }
    }

    /// Global position of `id` at time `t` (metres).
    ///
    /// A child's trajectory is relative to its owner, so the positions of
    /// all ancestors are summed.
    pub fn position_at(&self, id: ObjectId, t: Time) -> Result<Point3<f64>, StructuralError> {
        self.node(id)?;
        let offset = self
            .ancestors_inclusive(id)
            .map(|a| self.nodes[a.index()].trajectory.point_at(t).coords)
            .fold(Vector3::zeros(), |acc, p| acc + p);
        Ok(Point3::from(offset))
    }

    // ========== Private Helper Methods ==========

    fn node(&self, id: ObjectId) -> Result<&Node, StructuralError> {
        if id.graph != self.tag {
            return Err(StructuralError::UnknownObject(id));
        }
        self.nodes
            .get(id.index())
            .ok_or(StructuralError::UnknownObject(id))
    }

    fn children_of<'a>(&self, node: &'a Node) -> &'a [ObjectId] {
        match &node.kind {
            ObjectKind::Composite { children } => children,
            ObjectKind::MetaBall { .. } => &[],
        }
    }

    /// `id` followed by its owner, its owner's owner, and so on.
    fn ancestors_inclusive(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        std::iter::successors(Some(id), move |cur| self.nodes[cur.index()].parent)
    }
}
