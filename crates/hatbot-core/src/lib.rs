//! Hatbot core data model
//!
//! Plain types shared by the pipeline crate and the service wrapper:
//! detections as returned by the object detector, the animal allow-list,
//! and the identifiers of the chat platform.

pub mod detection;
pub mod ids;

pub use detection::{AnimalClass, Detection, DetectionSet, Vertex};
pub use ids::{ChannelId, UserId};
