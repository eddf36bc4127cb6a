//! Error types for the motionstep core.

use crate::objects::ObjectId;
use thiserror::Error;

/// Errors raised while constructing a [`Trajectory`](crate::Trajectory).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    /// A trajectory needs at least one control point
    #[error("Trajectory has no control points")]
    EmptyPath,

    /// A control point has a NaN or infinite coordinate
    #[error("Control point {0} is not finite")]
    NonFiniteControlPoint(usize),

    /// Velocity must be finite and non-negative
    #[error("Invalid velocity: {0} m/s")]
    InvalidVelocity(f64),

    /// A supplied path length must be finite and non-negative
    #[error("Invalid path length: {0} m")]
    InvalidLength(f64),
}

/// Violations of the object graph's shape. The graph is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// Handle does not belong to this graph
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    /// Children can only be added to composites
    #[error("{0} is not a composite object")]
    NotComposite(ObjectId),

    /// Adding the child would make the parent its own descendant
    #[error("Adding {child} to {parent} would create a cycle")]
    Cycle { parent: ObjectId, child: ObjectId },

    /// A child is owned by exactly one composite
    #[error("{child} already belongs to {owner}")]
    AlreadyParented { child: ObjectId, owner: ObjectId },

    /// A stored parent link disagrees with the owning composite's children
    #[error("{child} records parent {parent:?}, which disagrees with the composites listing it")]
    InconsistentParent { child: ObjectId, parent: Option<ObjectId> },
}

/// Errors raised by [`Sample`](crate::Sample) mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    /// Object handle is not part of the sample's graph
    #[error("Object {0} is not part of this sample's graph")]
    UnknownObject(ObjectId),
}

/// Umbrella error for callers that mix core operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Sample(#[from] SampleError),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
