//! Hat assets and per-user resolution

pub mod loader;
pub mod resolver;

pub use loader::DefaultHat;
pub use resolver::HatResolver;

use image::RgbaImage;
use std::sync::Arc;

/// Where a resolved hat came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HatSource {
    /// The process-wide fallback.
    Default,
    /// A hat the user uploaded.
    Custom,
}

/// Decoded hat ready to be composited.
#[derive(Debug, Clone)]
pub struct HatAsset {
    pub image: Arc<RgbaImage>,
    pub source: HatSource,
}

impl HatAsset {
    pub fn custom(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
            source: HatSource::Custom,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
