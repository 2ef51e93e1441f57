// SPDX-License-Identifier: MPL-2.0

//! Async still capture pipeline
//!
//! ```text
//! CaptureSession → Capture → Normalize → Filter → Redact → StillImage
//!       ↓
//! Preview continues uninterrupted
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Capture**: One high resolution capture with the current settings
//! 2. **Normalize**: Rotate/flip to upright; no-op when already upright
//! 3. **Filter**: The filter the preview shows, from the shared selection
//! 4. **Redact**: Privacy redaction; on failure the unredacted image is kept
//!
//! The result is never cropped. Framing is the composition renderer's job.

pub mod capture;
pub mod encoding;
pub mod processing;

pub use capture::StillCapture;
pub use encoding::{EncodedImage, EncodingFormat, EncodingQuality, ImageEncoder};
pub use processing::{NormalizedImage, ProcessedStill, StillProcessor, normalize_orientation};

use crate::backends::camera::types::CaptureFormat;
use crate::backends::camera::{CaptureSession, CaptureSettings};
use crate::errors::{AppError, AppResult};
use crate::filters::FilterSelection;
use crate::flash::FlashMode;
use crate::services::PrivacyRedactor;
use image::RgbaImage;
use std::sync::Arc;
use tracing::{info, warn};

/// Upright, filtered still ready for composition
#[derive(Debug, Clone)]
pub struct StillImage {
    pub image: Arc<RgbaImage>,
    pub format: CaptureFormat,
    pub raw: Option<Arc<[u8]>>,
    pub flash: FlashMode,
    /// Whether normalization had to rewrite pixels
    pub reoriented: bool,
    /// False when no redactor is configured or redaction failed
    pub redacted: bool,
    pub filter: Option<&'static str>,
}

/// Complete still pipeline
///
/// Orchestrates capture → normalize → filter → redact.
pub struct StillPipeline {
    processor: StillProcessor,
    redactor: Option<Arc<dyn PrivacyRedactor>>,
}

impl StillPipeline {
    /// `selection` must be the same handle the preview pipeline uses
    pub fn new(selection: FilterSelection) -> Self {
        Self {
            processor: StillProcessor::new(selection),
            redactor: None,
        }
    }

    pub fn with_redactor(mut self, redactor: Arc<dyn PrivacyRedactor>) -> Self {
        self.redactor = Some(redactor);
        self
    }

    /// Capture with the session's current settings
    pub async fn capture(&self, session: &CaptureSession) -> AppResult<StillImage> {
        let settings = session.state().capture_settings();
        self.capture_with(session, settings).await
    }

    /// Capture with explicit settings
    pub async fn capture_with(
        &self,
        session: &CaptureSession,
        settings: CaptureSettings,
    ) -> AppResult<StillImage> {
        let captured = StillCapture::capture_with(session, settings).await?;
        let format = captured.format;
        let raw = captured.raw.clone();
        let flash = captured.flash;

        let processed = self.processor.process(captured).await.map_err(AppError::Other)?;
        let (image, redacted) = self.redact(Arc::new(processed.image)).await;

        info!(
            width = image.width(),
            height = image.height(),
            reoriented = processed.redrawn,
            redacted,
            "Still ready"
        );

        Ok(StillImage {
            image,
            format,
            raw,
            flash,
            reoriented: processed.redrawn,
            redacted,
            filter: processed.filter,
        })
    }

    /// Run the redactor; any failure keeps the input image
    async fn redact(&self, image: Arc<RgbaImage>) -> (Arc<RgbaImage>, bool) {
        let Some(redactor) = &self.redactor else {
            return (image, false);
        };

        match redactor.redact(Arc::clone(&image)).await {
            Ok(redacted) if redacted.dimensions() == image.dimensions() => {
                (Arc::new(redacted), true)
            }
            Ok(redacted) => {
                warn!(
                    expected = ?image.dimensions(),
                    got = ?redacted.dimensions(),
                    "Redactor changed image size, keeping unredacted image"
                );
                (image, false)
            }
            Err(e) => {
                warn!(error = %e, "Privacy redaction failed, keeping unredacted image");
                (image, false)
            }
        }
    }
}
