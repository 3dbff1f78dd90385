//! Request orchestration

pub mod cancel;
pub mod config;
pub mod orchestrator;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use config::{OutputFormat, PipelineConfig};
pub use orchestrator::{
    EncodedImage, HatRequest, ImageOutcome, ImageReport, Orchestrator, RequestOutcome, SourceImage,
};
