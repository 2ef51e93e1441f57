// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! Owns the single active hardware input and serializes every mutation of it.
//!
//! ```text
//! Uninitialized ──permission──▶ Configuring ──configure──▶ Running ◀──▶ Stopped
//!       │                           ▲   │                   │  ▲
//!       └──refused──▶ Denied        └───┘ (failure)         ▼  │
//!                                                      Interrupted
//! ```
//!
//! Published state (`SessionState`, `SessionPhase`) goes through `watch`
//! channels: readers always see the last value and never block the writer.

use super::CameraBackend;
use super::inventory::DeviceInventory;
use super::types::*;
use crate::constants::{
    DEFAULT_ZOOM_FACTOR, MAX_EXPOSURE_BIAS, MAX_ZOOM_FACTOR, MIN_EXPOSURE_BIAS, MIN_ZOOM_FACTOR,
    TELEPHOTO_THRESHOLD, ULTRA_WIDE_THRESHOLD,
};
use crate::errors::{SessionError, SessionResult};
use crate::flash::FlashMode;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Lifecycle phase of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    /// Permission granted, device not yet streaming
    Configuring,
    Running,
    /// Running session suspended by the system; resumable
    Interrupted,
    Stopped,
    /// Permission refused; terminal
    Denied,
}

impl SessionPhase {
    /// Whether an input has been configured and lens controls apply
    pub fn is_configured(&self) -> bool {
        matches!(
            self,
            SessionPhase::Running | SessionPhase::Interrupted | SessionPhase::Stopped
        )
    }
}

/// Observable session state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Index into the session's `DeviceInventory`
    pub active_lens_index: usize,
    /// Zoom the user asked for, clamped to the global bounds only
    pub current_zoom_factor: f64,
    pub flash_mode: FlashMode,
    /// Exposure bias in EV, within [-2.0, 2.0]
    pub exposure_bias: f32,
    pub night_mode_enabled: bool,
    pub capture_format: CaptureFormat,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            active_lens_index: 0,
            current_zoom_factor: DEFAULT_ZOOM_FACTOR,
            flash_mode: FlashMode::Off,
            exposure_bias: 0.0,
            night_mode_enabled: false,
            capture_format: CaptureFormat::Standard,
        }
    }
}

impl SessionState {
    /// Capture settings matching the current state
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            format: self.capture_format,
            flash: self.flash_mode,
            night_mode: self.night_mode_enabled,
        }
    }
}

/// Requested settings for one still capture, before lens negotiation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CaptureSettings {
    pub format: CaptureFormat,
    pub flash: FlashMode,
    pub night_mode: bool,
}

/// Pick the lens for a zoom factor using the fixed hand-off thresholds.
///
/// Falls back to the nearest available kind when the preferred lens is
/// missing. Returns `None` only for an empty inventory.
pub fn lens_for_zoom(inventory: &DeviceInventory, zoom: f64) -> Option<usize> {
    let preference: [LensKind; 3] = if zoom < ULTRA_WIDE_THRESHOLD {
        [LensKind::UltraWide, LensKind::Wide, LensKind::Telephoto]
    } else if zoom < TELEPHOTO_THRESHOLD {
        [LensKind::Wide, LensKind::UltraWide, LensKind::Telephoto]
    } else {
        [LensKind::Telephoto, LensKind::Wide, LensKind::UltraWide]
    };

    preference.iter().find_map(|kind| inventory.index_of(*kind))
}

struct SessionInner {
    backend: Box<dyn CameraBackend>,
    inventory: DeviceInventory,
    phase: SessionPhase,
    state: SessionState,
    /// Zoom last applied to hardware (lens-clamped)
    hardware_zoom: f64,
    frame_sink: FrameSender,
}

impl SessionInner {
    /// Run `apply` inside a configuration bracket, discarding on failure
    fn configure_with<F>(&mut self, apply: F) -> BackendResult<()>
    where
        F: FnOnce(&mut dyn CameraBackend) -> BackendResult<()>,
    {
        self.backend.begin_configuration();
        match apply(self.backend.as_mut()) {
            Ok(()) => self.backend.commit_configuration(),
            Err(e) => {
                self.backend.discard_configuration();
                Err(e)
            }
        }
    }

    fn configure_input(&mut self) -> SessionResult<()> {
        let index = self
            .inventory
            .default_index()
            .ok_or_else(|| SessionError::Configuration("no lens available".to_string()))?;
        let lens = self.inventory.lenses()[index].clone();
        let zoom = lens.clamp_zoom(DEFAULT_ZOOM_FACTOR);
        let sink = self.frame_sink.clone();

        self.configure_with(|backend| {
            backend.select_input(&lens)?;
            backend.set_zoom(zoom)?;
            backend.attach_preview(sink)
        })
        .map_err(|e| SessionError::Configuration(e.to_string()))?;

        self.backend
            .start_streaming()
            .map_err(|e| SessionError::Configuration(e.to_string()))?;

        self.state.active_lens_index = index;
        self.state.current_zoom_factor = DEFAULT_ZOOM_FACTOR;
        self.hardware_zoom = zoom;
        info!(lens = %lens, "Capture session running");
        Ok(())
    }
}

/// Capture session controller
///
/// Cheap to clone; all clones share one hardware session.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<Mutex<SessionInner>>,
    state_tx: Arc<watch::Sender<SessionState>>,
    phase_tx: Arc<watch::Sender<SessionPhase>>,
    frames: FrameReceiver,
    position: LensPosition,
}

impl CaptureSession {
    /// Create an uninitialized session over `backend` for lenses at `position`
    pub fn new(backend: Box<dyn CameraBackend>, position: LensPosition) -> Self {
        let (frame_sink, frames) = frame_channel();
        let (state_tx, _) = watch::channel(SessionState::default());
        let (phase_tx, _) = watch::channel(SessionPhase::Uninitialized);

        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                backend,
                inventory: DeviceInventory::default(),
                phase: SessionPhase::Uninitialized,
                state: SessionState::default(),
                hardware_zoom: DEFAULT_ZOOM_FACTOR,
                frame_sink,
            })),
            state_tx: Arc::new(state_tx),
            phase_tx: Arc::new(phase_tx),
            frames,
            position,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &SessionInner) {
        self.state_tx.send_replace(inner.state.clone());
        self.phase_tx.send_replace(inner.phase);
    }

    // ===== Lifecycle =====

    /// Request camera access and move to `Configuring`
    ///
    /// A refusal is terminal: the session stays `Denied` and every later
    /// lifecycle call reports `PermissionDenied`.
    pub fn authorize(&self) -> SessionResult<()> {
        let mut inner = self.lock();
        match inner.phase {
            SessionPhase::Denied => return Err(SessionError::PermissionDenied),
            SessionPhase::Uninitialized => {}
            _ => return Ok(()),
        }

        match inner.backend.request_permission() {
            PermissionStatus::Granted => {
                let inventory = DeviceInventory::enumerate(inner.backend.as_ref(), self.position);
                inner.inventory = inventory;
                inner.phase = SessionPhase::Configuring;
                info!(lenses = inner.inventory.len(), "Camera permission granted");
                self.publish(&inner);
                Ok(())
            }
            PermissionStatus::Denied => {
                inner.phase = SessionPhase::Denied;
                error!("Camera permission denied");
                self.publish(&inner);
                Err(SessionError::PermissionDenied)
            }
        }
    }

    /// Select the default lens, wire the frame sink and start streaming
    ///
    /// On failure the session stays in `Configuring` and may be retried.
    pub fn configure(&self) -> SessionResult<()> {
        let mut inner = self.lock();
        match inner.phase {
            SessionPhase::Configuring => {}
            SessionPhase::Denied => return Err(SessionError::PermissionDenied),
            SessionPhase::Uninitialized => {
                return Err(SessionError::Configuration(
                    "camera access not yet granted".to_string(),
                ));
            }
            _ => return Ok(()),
        }

        match inner.configure_input() {
            Ok(()) => {
                inner.phase = SessionPhase::Running;
                self.publish(&inner);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Device configuration failed, session stays configuring");
                Err(e)
            }
        }
    }

    /// Authorize and configure on a blocking worker
    pub async fn setup(&self) -> SessionResult<()> {
        let session = self.clone();
        tokio::task::spawn_blocking(move || {
            session.authorize()?;
            session.configure()
        })
        .await
        .map_err(|e| SessionError::Configuration(format!("setup task failed: {}", e)))?
    }

    /// Start (or restart) streaming. Idempotent.
    ///
    /// Runs on a blocking worker so the caller's thread is never held by
    /// the hardware.
    pub async fn start(&self) -> SessionResult<()> {
        let session = self.clone();
        tokio::task::spawn_blocking(move || session.start_blocking())
            .await
            .map_err(|e| SessionError::Configuration(format!("start task failed: {}", e)))?
    }

    fn start_blocking(&self) -> SessionResult<()> {
        let mut inner = self.lock();
        match inner.phase {
            SessionPhase::Running => {
                debug!("Session already running");
                Ok(())
            }
            SessionPhase::Configuring => {
                // `configure` takes the lock and re-checks the phase
                drop(inner);
                self.configure()
            }
            SessionPhase::Stopped | SessionPhase::Interrupted => {
                inner.backend.start_streaming()?;
                inner.phase = SessionPhase::Running;
                info!("Capture session started");
                self.publish(&inner);
                Ok(())
            }
            SessionPhase::Uninitialized => Err(SessionError::Configuration(
                "camera access not yet granted".to_string(),
            )),
            SessionPhase::Denied => Err(SessionError::PermissionDenied),
        }
    }

    /// Stop streaming. Idempotent and safe on a session that never started.
    pub async fn stop(&self) {
        let session = self.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || session.stop_blocking()).await {
            warn!(error = %e, "Stop task failed");
        }
    }

    fn stop_blocking(&self) {
        let mut inner = self.lock();
        match inner.phase {
            SessionPhase::Running | SessionPhase::Interrupted => {
                inner.backend.stop_streaming();
                inner.phase = SessionPhase::Stopped;
                info!("Capture session stopped");
                self.publish(&inner);
            }
            SessionPhase::Configuring => {
                // Partially configured hardware may already be pumping frames
                inner.backend.stop_streaming();
            }
            _ => debug!(phase = ?inner.phase, "Stop ignored"),
        }
    }

    /// Mark a running session as suspended by the system
    ///
    /// Streaming is stopped on a blocking worker, like [`Self::stop`].
    pub async fn interrupt(&self) {
        let session = self.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || session.interrupt_blocking()).await {
            warn!(error = %e, "Interrupt task failed");
        }
    }

    fn interrupt_blocking(&self) {
        let mut inner = self.lock();
        if inner.phase == SessionPhase::Running {
            inner.backend.stop_streaming();
            inner.phase = SessionPhase::Interrupted;
            warn!("Capture session interrupted");
            self.publish(&inner);
        }
    }

    /// Resume a session after a system interruption ended
    pub async fn resume_after_interruption(&self) -> SessionResult<()> {
        if self.phase() != SessionPhase::Interrupted {
            return Ok(());
        }
        self.start().await
    }

    // ===== Controls =====

    /// Set the zoom factor, switching lenses across the hand-off thresholds.
    ///
    /// The published zoom is the request clamped to [0.5, 15.0]; the value
    /// applied to hardware is further clamped to the active lens's range.
    /// A lens switch never changes the published zoom. Returns the published
    /// zoom.
    pub fn set_zoom(&self, factor: f64) -> SessionResult<f64> {
        let mut inner = self.lock();
        if !inner.phase.is_configured() {
            return Err(SessionError::NotRunning);
        }
        if !factor.is_finite() {
            warn!(factor, "Ignoring non-finite zoom request");
            return Ok(inner.state.current_zoom_factor);
        }

        let target = factor.clamp(MIN_ZOOM_FACTOR, MAX_ZOOM_FACTOR);
        let index = lens_for_zoom(&inner.inventory, target)
            .ok_or_else(|| SessionError::LensUnavailable("inventory is empty".to_string()))?;
        let lens = inner.inventory.lenses()[index].clone();
        let switch = index != inner.state.active_lens_index;
        let hardware_zoom = lens.clamp_zoom(target);

        inner
            .configure_with(|backend| {
                if switch {
                    backend.select_input(&lens)?;
                }
                backend.set_zoom(hardware_zoom)
            })
            .map_err(|e| {
                warn!(error = %e, lens = %lens, "Zoom update failed");
                SessionError::from(e)
            })?;

        if switch {
            info!(from = inner.state.active_lens_index, to = index, lens = %lens.kind, zoom = target, "Lens hand-off");
        }
        inner.state.active_lens_index = index;
        inner.state.current_zoom_factor = target;
        inner.hardware_zoom = hardware_zoom;
        debug!(zoom = target, hardware_zoom, "Zoom applied");
        self.publish(&inner);
        Ok(target)
    }

    /// Set exposure bias, clamped to [-2.0, 2.0]. Returns the applied bias.
    pub fn set_exposure_bias(&self, bias: f32) -> SessionResult<f32> {
        let mut inner = self.lock();
        if !inner.phase.is_configured() {
            return Err(SessionError::NotRunning);
        }
        if !bias.is_finite() {
            return Ok(inner.state.exposure_bias);
        }
        let bias = bias.clamp(MIN_EXPOSURE_BIAS, MAX_EXPOSURE_BIAS);
        inner.configure_with(|backend| backend.set_exposure_bias(bias))?;
        inner.state.exposure_bias = bias;
        self.publish(&inner);
        Ok(bias)
    }

    pub fn set_flash_mode(&self, mode: FlashMode) {
        let mut inner = self.lock();
        inner.state.flash_mode = mode;
        self.publish(&inner);
    }

    /// Cycle flash Off -> Auto -> On and return the new mode
    pub fn cycle_flash_mode(&self) -> FlashMode {
        let mut inner = self.lock();
        inner.state.flash_mode = inner.state.flash_mode.next();
        self.publish(&inner);
        inner.state.flash_mode
    }

    pub fn set_night_mode(&self, enabled: bool) {
        let mut inner = self.lock();
        inner.state.night_mode_enabled = enabled;
        self.publish(&inner);
    }

    pub fn set_capture_format(&self, format: CaptureFormat) {
        let mut inner = self.lock();
        inner.state.capture_format = format;
        self.publish(&inner);
    }

    // ===== Capture =====

    /// Capture one still with `settings`, negotiated against the active lens.
    ///
    /// Raw degrades to standard without hardware support, unsupported flash
    /// modes are dropped. Runs on a blocking worker.
    pub async fn capture(&self, settings: CaptureSettings) -> SessionResult<CapturedImage> {
        let session = self.clone();
        tokio::task::spawn_blocking(move || session.capture_blocking(settings))
            .await
            .map_err(|e| SessionError::Capture(format!("capture task failed: {}", e)))?
    }

    fn capture_blocking(&self, settings: CaptureSettings) -> SessionResult<CapturedImage> {
        let mut inner = self.lock();
        if inner.phase != SessionPhase::Running {
            return Err(SessionError::NotRunning);
        }
        let lens = inner
            .inventory
            .get(inner.state.active_lens_index)
            .cloned()
            .ok_or_else(|| SessionError::LensUnavailable("no active lens".to_string()))?;

        let request = CaptureRequest {
            format: settings.format.negotiate(lens.supports_raw),
            flash: settings.flash.negotiate(&lens.flash_modes),
            night_mode: settings.night_mode,
            exposure_bias: inner.state.exposure_bias,
        };
        if request.format != settings.format {
            debug!(requested = ?settings.format, "Raw capture unsupported, using standard");
        }

        info!(lens = %lens.kind, format = ?request.format, flash = %request.flash, "Capturing still");
        inner.backend.capture_still(&request).map_err(|e| {
            error!(error = %e, "Still capture failed");
            SessionError::Capture(e.to_string())
        })
    }

    // ===== Observation =====

    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase_tx.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    /// Preview frames delivered by the hardware
    pub fn frames(&self) -> FrameReceiver {
        self.frames.clone()
    }

    pub fn inventory(&self) -> DeviceInventory {
        self.lock().inventory.clone()
    }

    pub fn active_lens(&self) -> Option<LensDescriptor> {
        let inner = self.lock();
        inner.inventory.get(inner.state.active_lens_index).cloned()
    }

    /// Zoom factor last applied to the hardware (lens-clamped)
    pub fn hardware_zoom(&self) -> f64 {
        self.lock().hardware_zoom
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("phase", &self.phase())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lens(kind: LensKind, min_zoom: f64, max_zoom: f64) -> LensDescriptor {
        LensDescriptor {
            id: kind.to_string(),
            kind,
            position: LensPosition::Back,
            min_zoom,
            max_zoom,
            supports_raw: false,
            flash_modes: Vec::new(),
        }
    }

    fn inventory(kinds: &[LensKind]) -> DeviceInventory {
        DeviceInventory::from_lenses(
            kinds.iter().map(|k| lens(*k, 0.5, 10.0)).collect(),
            LensPosition::Back,
        )
    }

    #[test]
    fn test_thresholds_three_lenses() {
        let inv = inventory(&[LensKind::UltraWide, LensKind::Wide, LensKind::Telephoto]);
        assert_eq!(lens_for_zoom(&inv, 0.5), Some(0));
        assert_eq!(lens_for_zoom(&inv, 0.99), Some(0));
        assert_eq!(lens_for_zoom(&inv, 1.0), Some(1));
        assert_eq!(lens_for_zoom(&inv, 2.49), Some(1));
        assert_eq!(lens_for_zoom(&inv, 2.5), Some(2));
        assert_eq!(lens_for_zoom(&inv, 15.0), Some(2));
    }

    #[test]
    fn test_thresholds_wide_only() {
        let inv = inventory(&[LensKind::Wide]);
        assert_eq!(lens_for_zoom(&inv, 0.6), Some(0));
        assert_eq!(lens_for_zoom(&inv, 8.0), Some(0));
        assert_eq!(lens_for_zoom(&DeviceInventory::default(), 1.0), None);
    }

    #[test]
    fn test_default_state_settings() {
        let state = SessionState {
            capture_format: CaptureFormat::Raw,
            flash_mode: FlashMode::Auto,
            night_mode_enabled: true,
            ..SessionState::default()
        };
        let settings = state.capture_settings();
        assert_eq!(settings.format, CaptureFormat::Raw);
        assert_eq!(settings.flash, FlashMode::Auto);
        assert!(settings.night_mode);
    }
}
