//! Detections and the animal allow-list

pub mod data;
pub mod label;

pub use data::{Detection, DetectionSet, Vertex};
pub use label::AnimalClass;
