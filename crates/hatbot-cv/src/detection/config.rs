//! Pipeline configuration

use crate::Result;
use anyhow::Context;
use hatbot_core::AnimalClass;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Encoding used for composited images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    Png,
    /// Drops the alpha channel.
    Jpeg,
}

impl OutputFormat {
    /// File extension for attachments in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Detector labels that get a hat.
    pub allowed_labels: Vec<AnimalClass>,
    /// Attachment file-name suffixes treated as images (case-insensitive).
    pub attachment_extensions: Vec<String>,
    pub detector_timeout_ms: u64,
    pub store_timeout_ms: u64,
    pub output_format: OutputFormat,
    /// Name given to every composited attachment, without extension.
    pub output_file_stem: String,
    pub default_hat_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            allowed_labels: AnimalClass::ALL.to_vec(),
            attachment_extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
            detector_timeout_ms: 10_000,
            store_timeout_ms: 5_000,
            output_format: OutputFormat::Png,
            output_file_stem: "hats".into(),
            default_hat_path: "propeller.png".into(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file; missing keys take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn detector_timeout(&self) -> Duration {
        Duration::from_millis(self.detector_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Attachment file name, with the extension of `output_format`
    pub fn output_file_name(&self) -> String {
        format!("{}.{}", self.output_file_stem, self.output_format.extension())
    }

    /// Whether an attachment with this file name should be processed
    pub fn accepts_attachment(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.attachment_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
    }
}
