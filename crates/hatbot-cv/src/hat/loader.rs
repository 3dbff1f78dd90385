//! Default hat loading

use super::{HatAsset, HatSource};
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::{Context, ensure};
use image::RgbaImage;
use log::info;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Process-wide fallback hat. Loaded once at startup, never mutated; clones
/// share the same pixels.
#[derive(Debug, Clone)]
pub struct DefaultHat {
    image: Arc<RgbaImage>,
}

impl DefaultHat {
    /// Load the default hat from a PNG file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read default hat: {}", path.display()))?;
        let hat = Self::from_png_bytes(&bytes)
            .with_context(|| format!("Invalid default hat: {}", path.display()))?;

        let (width, height) = hat.image.dimensions();
        info!("Loaded default hat {} ({}x{})", path.display(), width, height);
        Ok(hat)
    }

    /// Decode the default hat from in-memory PNG bytes
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self> {
        let image = ImageUtils::decode_png(bytes).context("Failed to decode PNG")?;
        Self::from_image(image)
    }

    pub fn from_image(image: RgbaImage) -> Result<Self> {
        ensure!(
            image.width() > 0 && image.height() > 0,
            "Default hat has zero dimensions"
        );
        Ok(Self {
            image: Arc::new(image),
        })
    }

    /// Shared handle to the default hat as a compositable asset
    pub fn asset(&self) -> HatAsset {
        HatAsset {
            image: Arc::clone(&self.image),
            source: HatSource::Default,
        }
    }
}
