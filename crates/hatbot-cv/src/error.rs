//! Error taxonomy for the hat pipeline
//!
//! Every variant of [`PipelineError`] is scoped to a single image. A request
//! keeps going after one of its images fails.

use hatbot_core::UserId;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// External collaborator a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    ObjectDetector,
    AssetStore,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::ObjectDetector => f.write_str("object detector"),
            Dependency::AssetStore => f.write_str("asset store"),
        }
    }
}

/// Failure reported by an object detector implementation.
#[derive(Debug, Error)]
#[error("object detector failed: {0}")]
pub struct DetectorError(pub String);

/// Failure reported by an asset or channel store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing is stored under the requested key.
    #[error("no entry stored")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Why a single image produced no output.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Detector or store unreachable, failing, or past its deadline.
    #[error("{dependency} failed: {reason}")]
    TransientDependency {
        dependency: Dependency,
        reason: String,
    },

    /// Previously accepted custom hat no longer decodes.
    #[error("stored hat for user {user} is corrupt")]
    DataIntegrity {
        user: UserId,
        #[source]
        source: image::ImageError,
    },

    #[error("image '{name}' could not be decoded")]
    MalformedInput {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode composited image")]
    Encode {
        #[source]
        source: image::ImageError,
    },

    #[error("request cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn timeout(dependency: Dependency, after: Duration) -> Self {
        PipelineError::TransientDependency {
            dependency,
            reason: format!("timed out after {} ms", after.as_millis()),
        }
    }

    pub fn store(err: StoreError) -> Self {
        PipelineError::TransientDependency {
            dependency: Dependency::AssetStore,
            reason: err.to_string(),
        }
    }

    /// Whether a retry of the same image could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::TransientDependency { .. })
    }
}

impl From<DetectorError> for PipelineError {
    fn from(err: DetectorError) -> Self {
        PipelineError::TransientDependency {
            dependency: Dependency::ObjectDetector,
            reason: err.0,
        }
    }
}
