//! Object detector backed by JSON sidecar files
//!
//! The detection service is external; for local runs each image may come
//! with a `<image>.detections.json` next to it. Detections are looked up by
//! image content since the detector contract only sees bytes.

use anyhow::Result;
use hatbot_core::{Detection, DetectionSet};
use hatbot_cv::traits::ObjectDetector;
use hatbot_cv::DetectorError;
use log::warn;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

fn content_key(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

/// Sidecar path for an image: `dog.png` -> `dog.png.detections.json`.
pub fn sidecar_path(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_os_string();
    name.push(".detections.json");
    PathBuf::from(name)
}

#[derive(Debug, Default)]
pub struct SidecarDetector {
    detections: HashMap<u64, DetectionSet>,
}

impl SidecarDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the detections for an image's bytes.
    pub fn insert(&mut self, image: &[u8], detections: DetectionSet) {
        self.detections.insert(content_key(image), detections);
    }

    /// Register an image from disk, reading its sidecar if there is one.
    /// An image without a sidecar detects nothing.
    pub fn insert_file(&mut self, image_path: &Path, image: &[u8]) -> Result<()> {
        let sidecar = sidecar_path(image_path);
        let detections = if sidecar.exists() {
            DetectionSet::load(&sidecar)?
        } else {
            warn!("No detections for {} (expected {})", image_path.display(), sidecar.display());
            DetectionSet::default()
        };
        self.insert(image, detections);
        Ok(())
    }
}

impl ObjectDetector for SidecarDetector {
    async fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, DetectorError> {
        Ok(self
            .detections
            .get(&content_key(image))
            .map(|set| set.detections.clone())
            .unwrap_or_default())
    }
}
