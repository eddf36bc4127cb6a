//! MotionStep Core - Motion grouping and pixel-bounded time stepping
//!
//! A [`Sample`] maps materials to graphical objects, each following its own
//! [`Trajectory`]. The core answers two questions for an external
//! simulation or render loop:
//! 1. **Which materials move** within a time window
//! 2. **How far time may advance** before any object moves one pixel, and
//!    which objects are responsible for that bound
//!
//! Objects form an acyclic tree of leaves and composites stored in an
//! [`ObjectGraph`] arena. Quantities carry their dimension in the type
//! (see [`units`]).

pub mod error;
pub mod objects;
pub mod sample;
pub mod trajectory;
pub mod units;

// Re-export key types for convenience
pub use error::{Error, Result, SampleError, StructuralError, TrajectoryError};
pub use objects::{ObjectGraph, ObjectId, ObjectKind, Transition};
pub use sample::{MovedGroups, Sample};
pub use trajectory::Trajectory;
pub use units::{ImageShape, Length, Time, Velocity};
