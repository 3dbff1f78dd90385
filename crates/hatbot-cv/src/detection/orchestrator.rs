//! Per-request hat pipeline
//!
//! Each submitted image goes through decode, detect, filter, then one
//! geometry -> head estimate -> composite pass per qualifying detection,
//! and finally encode. Images of one request run sequentially and fail
//! independently.

use super::cancel::{with_deadline, CancelToken};
use super::config::{OutputFormat, PipelineConfig};
use crate::bbox::PixelRect;
use crate::composite::{Canvas, Compositor};
use crate::error::{Dependency, PipelineError};
use crate::hat::{DefaultHat, HatAsset, HatResolver};
use crate::head::HeadEstimate;
use crate::traits::{AssetStore, ObjectDetector};
use crate::utils::ImageUtils;
use hatbot_core::{DetectionSet, UserId};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{self, JoinHandle};

/// One image attached to a request.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// Attachment file name, used for logging and as a decode hint.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// All images one user submitted in one message.
#[derive(Debug, Clone)]
pub struct HatRequest {
    pub user: UserId,
    pub images: Vec<SourceImage>,
}

/// A composited image ready to send.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub source_name: String,
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    pub hats_drawn: usize,
}

/// Terminal state of one image.
#[derive(Debug)]
pub enum ImageOutcome {
    Encoded(EncodedImage),
    /// No qualifying detections; nothing to send.
    Skipped,
    Failed(PipelineError),
}

#[derive(Debug)]
pub struct ImageReport {
    pub name: String,
    pub outcome: ImageOutcome,
}

/// Per-image results of a request, in submission order.
#[derive(Debug)]
pub struct RequestOutcome {
    pub user: UserId,
    pub images: Vec<ImageReport>,
}

impl RequestOutcome {
    /// Encoded images in submission order
    pub fn composites(&self) -> impl Iterator<Item = &EncodedImage> {
        self.images.iter().filter_map(|report| match &report.outcome {
            ImageOutcome::Encoded(image) => Some(image),
            _ => None,
        })
    }

    pub fn into_composites(self) -> Vec<EncodedImage> {
        self.images
            .into_iter()
            .filter_map(|report| match report.outcome {
                ImageOutcome::Encoded(image) => Some(image),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PipelineError)> {
        self.images.iter().filter_map(|report| match &report.outcome {
            ImageOutcome::Failed(err) => Some((report.name.as_str(), err)),
            _ => None,
        })
    }

    pub fn skipped(&self) -> usize {
        self.images
            .iter()
            .filter(|report| matches!(report.outcome, ImageOutcome::Skipped))
            .count()
    }
}

/// Runs hat requests against an injected detector and asset store
pub struct Orchestrator<D, S> {
    detector: Arc<D>,
    resolver: HatResolver<S>,
    compositor: Compositor,
    config: PipelineConfig,
}

impl<D: ObjectDetector, S: AssetStore> Orchestrator<D, S> {
    pub fn new(
        detector: Arc<D>,
        store: Arc<S>,
        default_hat: DefaultHat,
        config: PipelineConfig,
    ) -> Self {
        let resolver = HatResolver::new(store, default_hat, config.store_timeout());
        Self {
            detector,
            resolver,
            compositor: Compositor::default(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &HatResolver<S> {
        &self.resolver
    }

    /// Process every image of a request in order.
    ///
    /// Never fails as a whole: each image reports its own outcome. Once
    /// `cancel` fires, unfinished images report [`PipelineError::Cancelled`].
    pub async fn process_request(&self, request: HatRequest, cancel: &CancelToken) -> RequestOutcome {
        let start_time = Instant::now();
        let mut reports = Vec::with_capacity(request.images.len());

        for image in &request.images {
            let outcome = if cancel.is_cancelled() {
                ImageOutcome::Failed(PipelineError::Cancelled)
            } else {
                match self.process_image(&request.user, image, cancel).await {
                    Ok(Some(encoded)) => ImageOutcome::Encoded(encoded),
                    Ok(None) => ImageOutcome::Skipped,
                    Err(err) => {
                        warn!("Image '{}' from user {} failed: {}", image.name, request.user, err);
                        ImageOutcome::Failed(err)
                    }
                }
            };
            reports.push(ImageReport {
                name: image.name.clone(),
                outcome,
            });
        }

        let outcome = RequestOutcome {
            user: request.user,
            images: reports,
        };
        info!(
            "Request from user {}: {} composited, {} skipped, {} failed in {}ms",
            outcome.user,
            outcome.composites().count(),
            outcome.skipped(),
            outcome.failures().count(),
            start_time.elapsed().as_millis()
        );
        outcome
    }

    /// Run one image through the pipeline. `Ok(None)` means no detection
    /// qualified and nothing was produced.
    ///
    /// Decoding, compositing and encoding run on the blocking pool so a
    /// large image never stalls other requests on the same worker.
    pub async fn process_image(
        &self,
        user: &UserId,
        image: &SourceImage,
        cancel: &CancelToken,
    ) -> Result<Option<EncodedImage>, PipelineError> {
        let canvas = {
            let name = image.name.clone();
            let bytes = image.bytes.clone();
            run_blocking(move || {
                let hint = ImageUtils::format_from_name(&name);
                ImageUtils::decode_rgba(&bytes, hint)
                    .map_err(|source| PipelineError::MalformedInput { name, source })
            })
            .await?
        };

        let detections = with_deadline(
            Dependency::ObjectDetector,
            self.config.detector_timeout(),
            cancel,
            self.detector.detect(&image.bytes),
        )
        .await??;

        let total = detections.len();
        let animals = DetectionSet::from_vec(detections).filter_allowed(&self.config.allowed_labels);
        debug!(
            "Image '{}': {} of {} detections are animals",
            image.name,
            animals.len(),
            total
        );
        if animals.is_empty() {
            return Ok(None);
        }

        let hat = self.resolver.resolve(user, cancel).await?;
        let compositor = self.compositor.clone();
        let format = self.config.output_format;
        let token = cancel.clone();

        let (bytes, hats_drawn) = run_blocking(move || {
            let mut canvas = canvas;
            let hats_drawn = draw_hats(&compositor, &mut canvas, animals, &hat, &token)?;
            let bytes = ImageUtils::encode(&canvas, format)
                .map_err(|source| PipelineError::Encode { source })?;
            Ok((bytes, hats_drawn))
        })
        .await?;

        Ok(Some(EncodedImage {
            source_name: image.name.clone(),
            format,
            bytes,
            hats_drawn,
        }))
    }
}

/// Draw one hat per detection, in detector order. Stops at the first
/// cancellation check that fires.
fn draw_hats(
    compositor: &Compositor,
    canvas: &mut Canvas,
    animals: DetectionSet,
    hat: &HatAsset,
    cancel: &CancelToken,
) -> Result<usize, PipelineError> {
    let (width, height) = canvas.dimensions();
    let mut hats_drawn = 0;

    for detection in animals {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let rect = PixelRect::from_polygon(&detection.vertices, width, height);
        let estimate = HeadEstimate::from_rect(&rect);
        debug!(
            "{} (score {:.2}) at {:?}: head {}px, {:?}",
            detection.label, detection.score, rect, estimate.width_px, estimate.posture
        );
        if compositor.draw(canvas, &rect, &estimate, hat).is_some() {
            hats_drawn += 1;
        }
    }
    Ok(hats_drawn)
}

/// Run CPU-bound work on the blocking pool. A panic in `work` is resumed
/// here; a task dropped by runtime shutdown reads as cancellation.
async fn run_blocking<T, F>(work: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    match task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => Err(PipelineError::Cancelled),
    }
}

impl<D, S> Orchestrator<D, S>
where
    D: ObjectDetector + 'static,
    S: AssetStore + 'static,
{
    /// Handle a request on its own task.
    pub fn spawn(self: &Arc<Self>, request: HatRequest, cancel: CancelToken) -> JoinHandle<RequestOutcome> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.process_request(request, &cancel).await })
    }
}
