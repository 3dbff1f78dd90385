//! Hatbot computer vision library
//!
//! Turns object-detector output into hat composites: detection polygons are
//! mapped to pixel rectangles, a head region is estimated from each
//! rectangle, the requesting user's hat is resolved, and the hat is scaled
//! and alpha-blended onto the source image.

pub mod bbox;
pub mod composite;
pub mod detection;
pub mod error;
pub mod hat;
pub mod head;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use bbox::PixelRect;
pub use composite::{Canvas, Compositor, Placement};
pub use detection::{
    cancel_pair, CancelHandle, CancelToken, EncodedImage, HatRequest, ImageOutcome, ImageReport,
    Orchestrator, OutputFormat, PipelineConfig, RequestOutcome, SourceImage,
};
pub use error::{Dependency, DetectorError, PipelineError, StoreError};
pub use hat::{DefaultHat, HatAsset, HatResolver, HatSource};
pub use head::{HeadEstimate, Posture};
pub use store::{DirAssetStore, DirChannelPolicy, MemoryAssetStore, MemoryChannelPolicy};

// Error handling for bootstrap and file loading
pub type Result<T> = anyhow::Result<T>;

/// Seams to the external collaborators of the pipeline
pub mod traits {
    use crate::error::{DetectorError, StoreError};
    use hatbot_core::{ChannelId, Detection, UserId};
    use std::future::Future;

    /// Labels regions of an encoded image.
    pub trait ObjectDetector: Send + Sync {
        /// Detections in the order the service returned them.
        fn detect(
            &self,
            image: &[u8],
        ) -> impl Future<Output = Result<Vec<Detection>, DetectorError>> + Send;
    }

    /// Persisted custom hats, keyed by user.
    pub trait AssetStore: Send + Sync {
        /// Stored hat bytes, or [`StoreError::NotFound`] when the user never set one.
        fn get(&self, user: &UserId) -> impl Future<Output = Result<Vec<u8>, StoreError>> + Send;

        fn set(
            &self,
            user: &UserId,
            hat: Vec<u8>,
        ) -> impl Future<Output = Result<(), StoreError>> + Send;

        /// Returns `true` if a hat was deleted.
        fn remove(&self, user: &UserId) -> impl Future<Output = Result<bool, StoreError>> + Send;
    }

    /// Per-channel opt-in for hat processing. Channels start disabled.
    pub trait ChannelPolicyStore: Send + Sync {
        fn is_enabled(
            &self,
            channel: &ChannelId,
        ) -> impl Future<Output = Result<bool, StoreError>> + Send;

        /// Flips the channel and returns its new state.
        fn toggle(&self, channel: &ChannelId)
            -> impl Future<Output = Result<bool, StoreError>> + Send;
    }
}
