//! Error types for the simulation harness.

use motionstep_core::{SampleError, StructuralError, TrajectoryError};
use thiserror::Error;

/// Errors that can occur while configuring or running a stepping session.
#[derive(Debug, Error)]
pub enum SimError {
    /// Config or export file could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config or export JSON was malformed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config values are out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Scene construction failed in the core
    #[error("Scene error: {0}")]
    Scene(#[from] motionstep_core::Error),
}

impl SimError {
    /// Creates an I/O error tagged with the offending path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid-config error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<TrajectoryError> for SimError {
    fn from(e: TrajectoryError) -> Self {
        Self::Scene(e.into())
    }
}

impl From<StructuralError> for SimError {
    fn from(e: StructuralError) -> Self {
        Self::Scene(e.into())
    }
}

impl From<SampleError> for SimError {
    fn from(e: SampleError) -> Self {
        Self::Scene(e.into())
    }
}
