use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::detection::label::AnimalClass;

/// A polygon vertex in normalized image coordinates (0..1 on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One labeled region returned by the object detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Detector confidence. Carried for logging only.
    #[serde(default)]
    pub score: f32,
    /// Bounding polygon, four vertices in practice.
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

impl Detection {
    pub fn new(label: impl Into<String>, vertices: Vec<Vertex>) -> Self {
        Self {
            label: label.into(),
            score: 0.0,
            vertices,
        }
    }

    /// Axis-aligned box given as normalized corners, expanded to four vertices.
    pub fn from_box(label: impl Into<String>, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(
            label,
            vec![
                Vertex::new(x1, y1),
                Vertex::new(x2, y1),
                Vertex::new(x2, y2),
                Vertex::new(x1, y2),
            ],
        )
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn animal_class(&self) -> Option<AnimalClass> {
        AnimalClass::from_label(&self.label)
    }

    /// Whether this detection's label is one of `allowed`.
    pub fn is_allowed(&self, allowed: &[AnimalClass]) -> bool {
        self.animal_class()
            .is_some_and(|class| allowed.contains(&class))
    }
}

/// Ordered list of detections for a single image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionSet {
    pub detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn from_vec(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Parse a JSON array of detections.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse detection list")
    }

    /// Load a JSON detection list from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read detections: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid detections in {}", path.display()))
    }

    /// Keep only detections whose label is in `allowed`, preserving detector order.
    pub fn filter_allowed(self, allowed: &[AnimalClass]) -> Self {
        self.into_iter().filter(|d| d.is_allowed(allowed)).collect()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

impl IntoIterator for DetectionSet {
    type Item = Detection;
    type IntoIter = std::vec::IntoIter<Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.detections.into_iter()
    }
}

impl FromIterator<Detection> for DetectionSet {
    fn from_iter<T: IntoIterator<Item = Detection>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}
