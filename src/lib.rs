// SPDX-License-Identifier: MPL-2.0

//! cardcam - multi-lens capture and card composition
//!
//! This library provides the capture side of a card-collecting camera: a
//! capture session across several physical lenses with continuous zoom, a
//! live filtered preview that matches what gets captured, still capture with
//! orientation normalization, and the interactive transform that is baked into
//! a fixed-aspect card image.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Hardware seam, lens inventory, capture session, virtual device
//! - [`pipelines`]: Preview, still and composition pipelines
//! - [`filters`]: Visual filters shared by preview and still
//! - [`transform`]: Gesture-driven pan/zoom/rotate/flip model
//! - [`card`]: Card types and the flow from still to saved card
//! - [`services`]: Ports for classification, redaction and persistence
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let (camera, _probe) = VirtualCamera::with_probe(VirtualCameraConfig::default());
//! let session = CaptureSession::new(Box::new(camera), LensPosition::Back);
//! session.setup().await?;
//! session.set_zoom(0.8)?; // hands off to the ultra-wide lens
//! ```

pub mod backends;
pub mod card;
pub mod config;
pub mod constants;
pub mod errors;
pub mod filters;
pub mod flash;
pub mod pipelines;
pub mod services;
pub mod transform;

// Re-export commonly used types
pub use backends::camera::{
    CameraBackend, CaptureSession, CaptureSettings, DeviceInventory, SessionPhase, SessionState,
};
pub use card::{CaptureType, CardFlow, CardFormat, ComposedCard, CompositionSession};
pub use config::Config;
pub use errors::{AppError, AppResult, CompositionError, ServiceError, SessionError};
pub use filters::{FilterSelection, FilterSpec};
pub use flash::FlashMode;
pub use transform::{InteractiveTransform, TransformState};
