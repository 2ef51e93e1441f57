// SPDX-License-Identifier: MPL-2.0

//! Still capture from the capture session
//!
//! Triggers a single high resolution capture without pausing the preview
//! stream. Settings are negotiated against the active lens by the session.

use crate::backends::camera::types::CapturedImage;
use crate::backends::camera::{CaptureSession, CaptureSettings};
use crate::errors::SessionResult;
use std::time::Instant;
use tracing::{debug, info};

/// Still capture handler
pub struct StillCapture;

impl StillCapture {
    /// Capture with explicit settings
    pub async fn capture_with(
        session: &CaptureSession,
        settings: CaptureSettings,
    ) -> SessionResult<CapturedImage> {
        info!(format = ?settings.format, flash = %settings.flash, night = settings.night_mode, "Capturing still");
        let started = Instant::now();

        let captured = session.capture(settings).await?;

        debug!(
            width = captured.image.width(),
            height = captured.image.height(),
            format = ?captured.format,
            orientation = ?captured.orientation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Still captured"
        );
        Ok(captured)
    }
}
