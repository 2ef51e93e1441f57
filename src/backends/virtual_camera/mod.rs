// SPDX-License-Identifier: GPL-3.0-only

//! Virtual multi-lens camera
//!
//! A synthetic `CameraBackend` used for headless runs, the CLI and tests. It
//! behaves like a strict hardware device: zoom outside the active lens's range,
//! raw capture on a lens without raw support, or an unsupported flash mode are
//! rejected, so callers that skip negotiation fail loudly.
//!
//! ```text
//! test pattern / image file
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ FrameDelivery    │  ← own thread, fixed cadence
//! │ Worker           │
//! └──────────────────┘
//!        │ FrameSender (latest wins)
//!        ▼
//!   CaptureSession / preview pipeline
//! ```

mod file_source;

pub use file_source::{load_source_image, test_pattern};

use crate::backends::camera::CameraBackend;
use crate::backends::camera::frame_loop::{FrameDeliveryWorker, LoopAction};
use crate::backends::camera::types::*;
use crate::flash::FlashMode;
use image::RgbaImage;
use image::metadata::Orientation;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Static description of the simulated device
#[derive(Debug, Clone)]
pub struct VirtualCameraConfig {
    pub lenses: Vec<LensDescriptor>,
    pub permission: PermissionStatus,
    /// Time between preview frames
    pub frame_interval: Duration,
    /// Preview frame size in sensor orientation
    pub frame_size: (u32, u32),
    /// Device orientation stamped on every preview frame
    pub orientation: DeviceOrientation,
    /// Still size in sensor orientation (ignored when a source image is set)
    pub still_size: (u32, u32),
    /// Orientation tag stamped on every still
    pub still_orientation: Orientation,
    /// Image served as both preview and still content
    pub source: Option<Arc<RgbaImage>>,
}

impl Default for VirtualCameraConfig {
    fn default() -> Self {
        Self {
            lenses: Self::phone_lenses(),
            permission: PermissionStatus::Granted,
            frame_interval: Duration::from_millis(33),
            frame_size: (64, 48),
            orientation: DeviceOrientation::LandscapeLeft,
            still_size: (400, 300),
            still_orientation: Orientation::NoTransforms,
            source: None,
        }
    }
}

impl VirtualCameraConfig {
    /// Three back lenses plus a front wide lens, like a current flagship phone
    pub fn phone_lenses() -> Vec<LensDescriptor> {
        let all_flash = vec![FlashMode::Auto, FlashMode::On];
        vec![
            LensDescriptor {
                id: "back-wide".to_string(),
                kind: LensKind::Wide,
                position: LensPosition::Back,
                min_zoom: 1.0,
                max_zoom: 10.0,
                supports_raw: true,
                flash_modes: all_flash.clone(),
            },
            LensDescriptor {
                id: "back-ultra-wide".to_string(),
                kind: LensKind::UltraWide,
                position: LensPosition::Back,
                min_zoom: 0.5,
                max_zoom: 2.0,
                supports_raw: true,
                flash_modes: all_flash.clone(),
            },
            LensDescriptor {
                id: "back-telephoto".to_string(),
                kind: LensKind::Telephoto,
                position: LensPosition::Back,
                min_zoom: 3.0,
                max_zoom: 15.0,
                supports_raw: false,
                flash_modes: all_flash,
            },
            LensDescriptor {
                id: "front-wide".to_string(),
                kind: LensKind::Wide,
                position: LensPosition::Front,
                min_zoom: 1.0,
                max_zoom: 4.0,
                supports_raw: false,
                flash_modes: Vec::new(),
            },
        ]
    }

    /// Keep only the lenses of the given kinds
    pub fn with_kinds(mut self, kinds: &[LensKind]) -> Self {
        self.lenses.retain(|l| kinds.contains(&l.kind));
        self
    }

    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_source(mut self, image: RgbaImage) -> Self {
        self.source = Some(Arc::new(image));
        self
    }

    /// Serve the content of an image file
    pub fn with_source_file(self, path: &Path) -> BackendResult<Self> {
        Ok(self.with_source(load_source_image(path)?))
    }
}

/// Everything the virtual device observed, plus injectable faults
#[derive(Debug, Default)]
pub struct ProbeState {
    /// Zoom factors applied to hardware, in commit order
    pub applied_zooms: Vec<f64>,
    /// Lens kinds selected as input, in commit order
    pub selected_inputs: Vec<LensKind>,
    pub commits: usize,
    pub discards: usize,
    /// Calls to `start_streaming`, including ones that found it already running
    pub stream_starts: usize,
    pub last_request: Option<CaptureRequest>,
    /// Make the next commit fail
    pub fail_next_commit: bool,
    /// Make the next capture fail with this error
    pub fail_next_capture: Option<BackendError>,
}

/// Shared view into a `VirtualCamera` that outlives moving it into a session
#[derive(Debug, Clone, Default)]
pub struct VirtualCameraProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl VirtualCameraProbe {
    pub fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn applied_zooms(&self) -> Vec<f64> {
        self.lock().applied_zooms.clone()
    }

    pub fn selected_inputs(&self) -> Vec<LensKind> {
        self.lock().selected_inputs.clone()
    }

    pub fn last_request(&self) -> Option<CaptureRequest> {
        self.lock().last_request.clone()
    }

    pub fn fail_next_commit(&self) {
        self.lock().fail_next_commit = true;
    }

    pub fn fail_next_capture(&self, error: BackendError) {
        self.lock().fail_next_capture = Some(error);
    }
}

#[derive(Debug, Clone, Default)]
struct PendingConfiguration {
    input: Option<LensDescriptor>,
    zoom: Option<f64>,
}

/// Synthetic camera device
pub struct VirtualCamera {
    config: VirtualCameraConfig,
    probe: VirtualCameraProbe,
    pending: Option<PendingConfiguration>,
    active: Option<LensDescriptor>,
    zoom: f64,
    exposure_bias: f32,
    sink: Option<FrameSender>,
    worker: Option<FrameDeliveryWorker>,
}

impl VirtualCamera {
    pub fn new(config: VirtualCameraConfig) -> Self {
        Self {
            config,
            probe: VirtualCameraProbe::default(),
            pending: None,
            active: None,
            zoom: 1.0,
            exposure_bias: 0.0,
            sink: None,
            worker: None,
        }
    }

    /// Create a device and a probe observing it
    pub fn with_probe(config: VirtualCameraConfig) -> (Self, VirtualCameraProbe) {
        let camera = Self::new(config);
        let probe = camera.probe.clone();
        (camera, probe)
    }

    fn target_lens(&self) -> Option<&LensDescriptor> {
        self.pending
            .as_ref()
            .and_then(|p| p.input.as_ref())
            .or(self.active.as_ref())
    }

    fn apply_input(&mut self, lens: LensDescriptor) {
        debug!(lens = %lens, "Virtual input selected");
        self.probe.lock().selected_inputs.push(lens.kind);
        self.active = Some(lens);
    }

    fn apply_zoom(&mut self, factor: f64) {
        self.probe.lock().applied_zooms.push(factor);
        self.zoom = factor;
    }

    fn still_content(&self) -> RgbaImage {
        match &self.config.source {
            Some(image) => image.as_ref().clone(),
            None => test_pattern(self.config.still_size.0, self.config.still_size.1),
        }
    }
}

impl CameraBackend for VirtualCamera {
    fn request_permission(&mut self) -> PermissionStatus {
        self.config.permission
    }

    fn enumerate_lenses(&self) -> Vec<LensDescriptor> {
        self.config.lenses.clone()
    }

    fn begin_configuration(&mut self) {
        self.pending = Some(PendingConfiguration::default());
    }

    fn commit_configuration(&mut self) -> BackendResult<()> {
        let pending = self.pending.take().unwrap_or_default();

        {
            let mut probe = self.probe.lock();
            if std::mem::take(&mut probe.fail_next_commit) {
                probe.discards += 1;
                return Err(BackendError::ConfigurationFailed(
                    "injected commit failure".to_string(),
                ));
            }
            probe.commits += 1;
        }

        if let Some(lens) = pending.input {
            self.apply_input(lens);
        }
        if let Some(zoom) = pending.zoom {
            self.apply_zoom(zoom);
        }
        Ok(())
    }

    fn discard_configuration(&mut self) {
        if self.pending.take().is_some() {
            self.probe.lock().discards += 1;
        }
    }

    fn select_input(&mut self, lens: &LensDescriptor) -> BackendResult<()> {
        if !self.config.lenses.contains(lens) {
            return Err(BackendError::DeviceNotFound(lens.id.clone()));
        }
        match self.pending.as_mut() {
            Some(pending) => pending.input = Some(lens.clone()),
            None => self.apply_input(lens.clone()),
        }
        Ok(())
    }

    fn set_zoom(&mut self, factor: f64) -> BackendResult<()> {
        let lens = self
            .target_lens()
            .ok_or_else(|| BackendError::ConfigurationFailed("no input selected".to_string()))?;
        if !lens.contains_zoom(factor) {
            return Err(BackendError::ConfigurationFailed(format!(
                "zoom {} outside {} range",
                factor, lens.kind
            )));
        }
        match self.pending.as_mut() {
            Some(pending) => pending.zoom = Some(factor),
            None => self.apply_zoom(factor),
        }
        Ok(())
    }

    fn set_exposure_bias(&mut self, bias: f32) -> BackendResult<()> {
        self.exposure_bias = bias;
        Ok(())
    }

    fn attach_preview(&mut self, sink: FrameSender) -> BackendResult<()> {
        self.sink = Some(sink);
        Ok(())
    }

    fn start_streaming(&mut self) -> BackendResult<()> {
        self.probe.lock().stream_starts += 1;
        if self.worker.is_some() {
            return Ok(());
        }
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| BackendError::ConfigurationFailed("no preview sink".to_string()))?;
        if self.active.is_none() {
            return Err(BackendError::ConfigurationFailed(
                "no input selected".to_string(),
            ));
        }

        let frame = match &self.config.source {
            Some(image) => Arc::clone(image),
            None => Arc::new(test_pattern(
                self.config.frame_size.0,
                self.config.frame_size.1,
            )),
        };
        let orientation = self.config.orientation;

        info!(
            width = frame.width(),
            height = frame.height(),
            "Virtual camera streaming"
        );
        self.worker = Some(FrameDeliveryWorker::start(
            "virtual-camera-frames",
            self.config.frame_interval,
            move || {
                if !sink.is_connected() {
                    debug!("Preview consumer gone, stopping virtual frames");
                    return LoopAction::Stop;
                }
                sink.send(Arc::clone(&frame), orientation);
                LoopAction::Continue
            },
        ));
        Ok(())
    }

    fn stop_streaming(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
            info!("Virtual camera stopped streaming");
        }
    }

    fn is_streaming(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_running())
    }

    fn capture_still(&mut self, request: &CaptureRequest) -> BackendResult<CapturedImage> {
        if self.config.permission == PermissionStatus::Denied {
            return Err(BackendError::PermissionDenied);
        }

        let injected = {
            let mut probe = self.probe.lock();
            probe.last_request = Some(request.clone());
            probe.fail_next_capture.take()
        };
        if let Some(error) = injected {
            warn!(error = %error, "Injected capture failure");
            return Err(error);
        }

        let lens = self
            .active
            .as_ref()
            .ok_or_else(|| BackendError::CaptureFailed("no input selected".to_string()))?;
        if request.format.includes_raw() && !lens.supports_raw {
            return Err(BackendError::CaptureFailed(format!(
                "{} lens cannot capture raw",
                lens.kind
            )));
        }
        if request.flash != FlashMode::Off && !lens.flash_modes.contains(&request.flash) {
            return Err(BackendError::CaptureFailed(format!(
                "{} lens has no flash mode {}",
                lens.kind, request.flash
            )));
        }

        let image = self.still_content();
        let raw = request
            .format
            .includes_raw()
            .then(|| Arc::<[u8]>::from(image.as_raw().as_slice()));

        debug!(
            width = image.width(),
            height = image.height(),
            zoom = self.zoom,
            exposure_bias = self.exposure_bias,
            night_mode = request.night_mode,
            "Virtual still captured"
        );

        Ok(CapturedImage {
            image,
            orientation: self.config.still_orientation,
            format: request.format,
            raw,
            flash: request.flash,
        })
    }
}

impl std::fmt::Debug for VirtualCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualCamera")
            .field("active", &self.active.as_ref().map(|l| l.kind))
            .field("zoom", &self.zoom)
            .field("streaming", &self.worker.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide() -> LensDescriptor {
        VirtualCameraConfig::phone_lenses()
            .into_iter()
            .find(|l| l.kind == LensKind::Wide && l.position == LensPosition::Back)
            .expect("wide lens")
    }

    #[test]
    fn test_bracket_applies_on_commit() {
        let (mut camera, probe) = VirtualCamera::with_probe(VirtualCameraConfig::default());
        camera.begin_configuration();
        camera.select_input(&wide()).unwrap();
        camera.set_zoom(2.0).unwrap();
        assert!(probe.applied_zooms().is_empty());

        camera.commit_configuration().unwrap();
        assert_eq!(probe.applied_zooms(), vec![2.0]);
        assert_eq!(probe.selected_inputs(), vec![LensKind::Wide]);
    }

    #[test]
    fn test_rejects_zoom_outside_lens() {
        let mut camera = VirtualCamera::new(VirtualCameraConfig::default());
        camera.select_input(&wide()).unwrap();
        assert!(camera.set_zoom(0.5).is_err());
        assert!(camera.set_zoom(10.5).is_err());
    }

    #[test]
    fn test_discard_drops_pending() {
        let (mut camera, probe) = VirtualCamera::with_probe(VirtualCameraConfig::default());
        camera.begin_configuration();
        camera.select_input(&wide()).unwrap();
        camera.discard_configuration();
        assert!(probe.selected_inputs().is_empty());
        assert_eq!(probe.lock().discards, 1);
    }

    #[test]
    fn test_capture_rejects_unsupported_flash() {
        let mut camera = VirtualCamera::new(VirtualCameraConfig::default());
        let front = VirtualCameraConfig::phone_lenses()
            .into_iter()
            .find(|l| l.position == LensPosition::Front)
            .unwrap();
        camera.select_input(&front).unwrap();

        let request = CaptureRequest {
            format: CaptureFormat::Standard,
            flash: FlashMode::On,
            night_mode: false,
            exposure_bias: 0.0,
        };
        assert!(camera.capture_still(&request).is_err());
    }

    #[test]
    fn test_streaming_requires_sink() {
        let mut camera = VirtualCamera::new(VirtualCameraConfig::default());
        camera.select_input(&wide()).unwrap();
        assert!(camera.start_streaming().is_err());

        let (sink, receiver) = frame_channel();
        camera.attach_preview(sink).unwrap();
        camera.start_streaming().unwrap();
        assert!(camera.is_streaming());
        camera.stop_streaming();
        assert!(!camera.is_streaming());
        drop(receiver);
    }

    #[test]
    fn test_streaming_ends_without_consumer() {
        let mut camera = VirtualCamera::new(VirtualCameraConfig::default());
        camera.select_input(&wide()).unwrap();
        let (sink, receiver) = frame_channel();
        camera.attach_preview(sink).unwrap();
        drop(receiver);

        camera.start_streaming().unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while camera.is_streaming() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!camera.is_streaming());
    }
}
