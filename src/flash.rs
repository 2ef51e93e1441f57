// SPDX-License-Identifier: GPL-3.0-only

//! Flash mode selection and negotiation against lens capabilities

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Flash operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FlashMode {
    /// Flash never fires
    #[default]
    Off,
    /// Hardware decides based on scene brightness
    Auto,
    /// Flash fires on every capture
    On,
}

impl FlashMode {
    pub const ALL: [FlashMode; 3] = [FlashMode::Off, FlashMode::Auto, FlashMode::On];

    /// Cycle to the next mode: Off -> Auto -> On -> Off
    pub fn next(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::Auto,
            FlashMode::Auto => FlashMode::On,
            FlashMode::On => FlashMode::Off,
        }
    }

    /// Mode the hardware will actually use for a capture.
    ///
    /// Unsupported requests are silently dropped to `Off`. `Off` itself is
    /// always honoured.
    pub fn negotiate(self, supported: &[FlashMode]) -> FlashMode {
        if self == FlashMode::Off || supported.contains(&self) {
            self
        } else {
            debug!(requested = ?self, "Flash mode not supported by lens, ignoring");
            FlashMode::Off
        }
    }
}

impl std::fmt::Display for FlashMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlashMode::Off => write!(f, "off"),
            FlashMode::Auto => write!(f, "auto"),
            FlashMode::On => write!(f, "on"),
        }
    }
}
