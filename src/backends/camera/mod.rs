// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │   UI Layer (host)   │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │   CaptureSession    │  ← State machine, zoom, lens hand-off, capture
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Hardware seam
//! └──────────┬──────────┘
//!            │
//!            ▼
//!   ┌────────────────┐
//!   │ VirtualCamera  │  ← Synthetic multi-lens device
//!   └────────────────┘
//! ```

pub mod frame_loop;
pub mod inventory;
pub mod session;
pub mod types;

pub use inventory::DeviceInventory;
pub use session::{CaptureSession, CaptureSettings, SessionPhase, SessionState};
pub use types::*;

/// Hardware camera trait
///
/// Implementations wrap one platform capture device with several physical
/// lenses. The session serializes every call through a single lock, and wraps
/// input/zoom changes in `begin_configuration`/`commit_configuration`.
pub trait CameraBackend: Send {
    // ===== Permission & enumeration =====

    /// Ask the platform for camera access
    fn request_permission(&mut self) -> PermissionStatus;

    /// Lenses physically present on the device, in any order
    fn enumerate_lenses(&self) -> Vec<LensDescriptor>;

    // ===== Configuration =====

    /// Open a configuration bracket; changes apply atomically on commit
    fn begin_configuration(&mut self);

    /// Close the configuration bracket and apply all pending changes
    fn commit_configuration(&mut self) -> BackendResult<()>;

    /// Close the configuration bracket, dropping all pending changes
    fn discard_configuration(&mut self);

    /// Make `lens` the single active input
    fn select_input(&mut self, lens: &LensDescriptor) -> BackendResult<()>;

    /// Apply a zoom factor already clamped to the active lens's range
    fn set_zoom(&mut self, factor: f64) -> BackendResult<()>;

    /// Apply an exposure bias in EV
    fn set_exposure_bias(&mut self, bias: f32) -> BackendResult<()>;

    /// Wire the continuous preview frame sink
    fn attach_preview(&mut self, sink: FrameSender) -> BackendResult<()>;

    // ===== Streaming =====

    /// Start delivering preview frames to the attached sink
    fn start_streaming(&mut self) -> BackendResult<()>;

    /// Stop delivering preview frames; no-op when already stopped
    fn stop_streaming(&mut self);

    /// Whether frames are currently being delivered
    fn is_streaming(&self) -> bool;

    // ===== Capture =====

    /// Capture one high resolution still with negotiated settings
    fn capture_still(&mut self, request: &CaptureRequest) -> BackendResult<CapturedImage>;
}
