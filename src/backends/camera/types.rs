// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::flash::FlashMode;
use image::RgbaImage;
use image::metadata::Orientation;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::watch;

/// Physical lens kind, ordered from widest to narrowest field of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LensKind {
    UltraWide,
    Wide,
    Telephoto,
}

impl std::fmt::Display for LensKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensKind::UltraWide => write!(f, "ultra-wide"),
            LensKind::Wide => write!(f, "wide"),
            LensKind::Telephoto => write!(f, "telephoto"),
        }
    }
}

/// Which side of the device a lens faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LensPosition {
    Front,
    #[default]
    Back,
}

/// A physical camera as reported by the hardware
///
/// Immutable once enumerated. The session refers to it by index into the
/// inventory, never by copy.
#[derive(Debug, Clone, PartialEq)]
pub struct LensDescriptor {
    /// Backend-specific identifier
    pub id: String,
    pub kind: LensKind,
    pub position: LensPosition,
    /// Lowest zoom factor the lens accepts
    pub min_zoom: f64,
    /// Highest zoom factor the lens accepts
    pub max_zoom: f64,
    /// Whether the lens can deliver raw sensor data
    pub supports_raw: bool,
    /// Flash modes the lens can fire with (empty for no flash unit)
    pub flash_modes: Vec<FlashMode>,
}

impl LensDescriptor {
    /// Clamp a zoom factor into this lens's native range
    pub fn clamp_zoom(&self, factor: f64) -> f64 {
        factor.clamp(self.min_zoom, self.max_zoom)
    }

    /// Whether `factor` is inside this lens's native range
    pub fn contains_zoom(&self, factor: f64) -> bool {
        factor >= self.min_zoom && factor <= self.max_zoom
    }
}

impl std::fmt::Display for LensDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({:?}) {:.1}x-{:.1}x",
            self.kind, self.position, self.min_zoom, self.max_zoom
        )
    }
}

/// Requested still output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaptureFormat {
    #[default]
    Standard,
    Raw,
    StandardAndRaw,
}

impl CaptureFormat {
    pub fn includes_raw(&self) -> bool {
        matches!(self, CaptureFormat::Raw | CaptureFormat::StandardAndRaw)
    }

    /// Format the hardware will actually deliver; raw degrades to standard
    pub fn negotiate(self, supports_raw: bool) -> CaptureFormat {
        if self.includes_raw() && !supports_raw {
            CaptureFormat::Standard
        } else {
            self
        }
    }
}

/// Physical device orientation at the time a frame was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl DeviceOrientation {
    fn index(self) -> usize {
        match self {
            DeviceOrientation::Portrait => 0,
            DeviceOrientation::PortraitUpsideDown => 1,
            DeviceOrientation::LandscapeLeft => 2,
            DeviceOrientation::LandscapeRight => 3,
        }
    }

    /// Clockwise rotation that brings a sensor frame upright.
    ///
    /// The sensor is mounted landscape (home button right), so a portrait
    /// device delivers frames lying on their side.
    pub fn correction(self) -> SensorRotation {
        ORIENTATION_CORRECTION[self.index()]
    }
}

/// Sensor-to-upright lookup, indexed by `DeviceOrientation::index`
const ORIENTATION_CORRECTION: [SensorRotation; 4] = [
    SensorRotation::Rotate90,
    SensorRotation::Rotate270,
    SensorRotation::None,
    SensorRotation::Rotate180,
];

/// Clockwise rotation in quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorRotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl SensorRotation {
    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, SensorRotation::Rotate90 | SensorRotation::Rotate270)
    }

    /// Rotate an image by this amount; `None` hands the input back untouched
    pub fn apply(&self, image: Arc<RgbaImage>) -> Arc<RgbaImage> {
        match self {
            SensorRotation::None => image,
            SensorRotation::Rotate90 => Arc::new(image::imageops::rotate90(image.as_ref())),
            SensorRotation::Rotate180 => Arc::new(image::imageops::rotate180(image.as_ref())),
            SensorRotation::Rotate270 => Arc::new(image::imageops::rotate270(image.as_ref())),
        }
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// A single frame from the preview stream
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    /// RGBA pixels as delivered by the sensor (not yet upright)
    pub image: Arc<RgbaImage>,
    /// Device orientation when the frame was produced
    pub orientation: DeviceOrientation,
    /// Monotonic sequence number assigned by the frame sink
    pub sequence: u64,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

/// Settings handed to the hardware for one still capture, already negotiated
/// against the active lens
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub format: CaptureFormat,
    pub flash: FlashMode,
    pub night_mode: bool,
    pub exposure_bias: f32,
}

/// High resolution still as delivered by the hardware
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Processed pixels (always present, raw-only captures carry a preview)
    pub image: RgbaImage,
    /// Orientation tag the pixels must be transformed by to appear upright
    pub orientation: Orientation,
    /// Format actually delivered
    pub format: CaptureFormat,
    /// Raw sensor payload when the format includes raw
    pub raw: Option<Arc<[u8]>>,
    /// Flash mode actually used
    pub flash: FlashMode,
}

/// Camera permission state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

struct FrameSenderInner {
    tx: watch::Sender<Option<Arc<PreviewFrame>>>,
    next_sequence: AtomicU64,
}

/// Producer side of the preview frame channel
///
/// Capacity is one: publishing a frame replaces any frame not yet consumed.
#[derive(Clone)]
pub struct FrameSender {
    inner: Arc<FrameSenderInner>,
}

impl FrameSender {
    /// Publish a frame, superseding any frame the consumer has not picked up
    pub fn send(&self, image: Arc<RgbaImage>, orientation: DeviceOrientation) -> u64 {
        let sequence = self.inner.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.inner.tx.send_replace(Some(Arc::new(PreviewFrame {
            image,
            orientation,
            sequence,
            captured_at: Instant::now(),
        })));
        sequence
    }

    /// Whether any consumer is still attached
    pub fn is_connected(&self) -> bool {
        !self.inner.tx.is_closed()
    }
}

impl std::fmt::Debug for FrameSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSender")
            .field("next_sequence", &self.inner.next_sequence.load(Ordering::Relaxed))
            .finish()
    }
}

/// Consumer side of the preview frame channel
#[derive(Debug, Clone)]
pub struct FrameReceiver {
    rx: watch::Receiver<Option<Arc<PreviewFrame>>>,
}

impl FrameReceiver {
    /// Wait for the next unseen frame; `None` once every sender is gone
    pub async fn next_frame(&mut self) -> Option<Arc<PreviewFrame>> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(frame) = self.rx.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }

    /// Most recent frame, whether or not it was already seen
    pub fn latest(&self) -> Option<Arc<PreviewFrame>> {
        self.rx.borrow().clone()
    }

    /// Whether a frame newer than the last one returned is waiting
    pub fn has_pending(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

/// Create a latest-frame-wins preview channel
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = watch::channel(None);
    (
        FrameSender {
            inner: Arc::new(FrameSenderInner {
                tx,
                next_sequence: AtomicU64::new(0),
            }),
        },
        FrameReceiver { rx },
    )
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Camera access refused or revoked
    PermissionDenied,
    /// Camera device not found
    DeviceNotFound(String),
    /// Failed to configure an input or output
    ConfigurationFailed(String),
    /// Hardware busy with another request
    Busy,
    /// Capture failed for another reason
    CaptureFailed(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::PermissionDenied => write!(f, "Camera permission denied"),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::ConfigurationFailed(msg) => write!(f, "Configuration failed: {}", msg),
            BackendError::Busy => write!(f, "Camera is busy"),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_degrades_without_support() {
        assert_eq!(
            CaptureFormat::StandardAndRaw.negotiate(false),
            CaptureFormat::Standard
        );
        assert_eq!(CaptureFormat::Raw.negotiate(true), CaptureFormat::Raw);
        assert_eq!(
            CaptureFormat::Standard.negotiate(false),
            CaptureFormat::Standard
        );
    }

    #[test]
    fn test_orientation_table() {
        assert_eq!(
            DeviceOrientation::Portrait.correction(),
            SensorRotation::Rotate90
        );
        assert_eq!(
            DeviceOrientation::LandscapeLeft.correction(),
            SensorRotation::None
        );
        assert!(DeviceOrientation::PortraitUpsideDown.correction().swaps_dimensions());
    }

    #[test]
    fn test_rotation_none_keeps_buffer() {
        let image = Arc::new(RgbaImage::new(4, 2));
        let rotated = SensorRotation::None.apply(Arc::clone(&image));
        assert!(Arc::ptr_eq(&image, &rotated));

        let rotated = SensorRotation::Rotate90.apply(image);
        assert_eq!(rotated.dimensions(), (2, 4));
    }

    #[tokio::test]
    async fn test_frame_channel_latest_wins() {
        let (tx, mut rx) = frame_channel();
        let image = Arc::new(RgbaImage::new(2, 2));
        tx.send(Arc::clone(&image), DeviceOrientation::Portrait);
        tx.send(Arc::clone(&image), DeviceOrientation::Portrait);
        let last = tx.send(image, DeviceOrientation::Portrait);

        let frame = rx.next_frame().await.expect("frame");
        assert_eq!(frame.sequence, last);
        assert!(!rx.has_pending());
    }

    #[tokio::test]
    async fn test_frame_channel_closes() {
        let (tx, mut rx) = frame_channel();
        drop(tx);
        assert!(rx.next_frame().await.is_none());
    }
}
