// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Lowest zoom factor the session accepts, before any lens-specific clamp
pub const MIN_ZOOM_FACTOR: f64 = 0.5;

/// Highest zoom factor the session accepts, before any lens-specific clamp
pub const MAX_ZOOM_FACTOR: f64 = 15.0;

/// Zoom factor the session starts at (wide lens, 1×)
pub const DEFAULT_ZOOM_FACTOR: f64 = 1.0;

/// Below this zoom the ultra-wide lens is preferred (if present)
pub const ULTRA_WIDE_THRESHOLD: f64 = 1.0;

/// At or above this zoom the telephoto lens is preferred (if present)
pub const TELEPHOTO_THRESHOLD: f64 = 2.5;

/// Exposure bias bounds in EV
pub const MIN_EXPOSURE_BIAS: f32 = -2.0;
pub const MAX_EXPOSURE_BIAS: f32 = 2.0;

/// Default output size of a landscape (16:9) card
pub const LANDSCAPE_CARD_SIZE: (u32, u32) = (1920, 1080);

/// Default output size of a portrait (9:16) card
pub const PORTRAIT_CARD_SIZE: (u32, u32) = (1080, 1920);

/// Default on-screen size (points) of the landscape composition canvas
pub const LANDSCAPE_DISPLAY_SIZE: (f32, f32) = (390.0, 219.375);

/// Default on-screen size (points) of the portrait composition canvas
pub const PORTRAIT_DISPLAY_SIZE: (f32, f32) = (390.0, 693.333);

/// Default preview viewport in pixels
pub const DEFAULT_PREVIEW_VIEWPORT: (u32, u32) = (1170, 2532);

/// Log filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Aspect ratio of a card format, stored as an exact integer ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const LANDSCAPE_16_9: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };
    pub const PORTRAIT_9_16: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Width divided by height
    pub fn as_f32(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}
