// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::types::{CaptureFormat, LensPosition};
use crate::card::CardFormat;
use crate::constants::{
    DEFAULT_LOG_FILTER, DEFAULT_PREVIEW_VIEWPORT, LANDSCAPE_CARD_SIZE, LANDSCAPE_DISPLAY_SIZE,
    MAX_EXPOSURE_BIAS, MIN_EXPOSURE_BIAS, PORTRAIT_CARD_SIZE, PORTRAIT_DISPLAY_SIZE,
};
use crate::errors::{AppError, AppResult};
use crate::filters::FilterSpec;
use crate::flash::FlashMode;
use crate::pipelines::composition::CompositionTarget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory name under the platform config dir
const CONFIG_DIR_NAME: &str = "cardcam";
const CONFIG_FILE_NAME: &str = "config.json";

/// Output and on-screen size for one card format
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSettings {
    /// Output raster size in pixels
    pub output_size: (u32, u32),
    /// Interactive canvas size in display units
    pub display_size: (f32, f32),
}

impl TargetSettings {
    pub fn target(&self) -> CompositionTarget {
        CompositionTarget::new(self.output_size, self.display_size)
    }
}

impl From<CompositionTarget> for TargetSettings {
    fn from(target: CompositionTarget) -> Self {
        Self {
            output_size: target.output_size,
            display_size: target.display_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which side of the device to open
    pub lens_position: LensPosition,
    /// Flash mode a new session starts with
    pub flash_mode: FlashMode,
    pub capture_format: CaptureFormat,
    pub night_mode: bool,
    /// Exposure bias in EV, within [-2.0, 2.0]
    pub exposure_bias: f32,
    /// Filter selected at startup
    pub filter: Option<FilterSpec>,
    /// Preview viewport in pixels
    pub preview_viewport: (u32, u32),
    pub landscape: TargetSettings,
    pub portrait: TargetSettings,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lens_position: LensPosition::Back,
            flash_mode: FlashMode::Off,
            capture_format: CaptureFormat::Standard,
            night_mode: false,
            exposure_bias: 0.0,
            filter: None,
            preview_viewport: DEFAULT_PREVIEW_VIEWPORT,
            landscape: TargetSettings {
                output_size: LANDSCAPE_CARD_SIZE,
                display_size: LANDSCAPE_DISPLAY_SIZE,
            },
            portrait: TargetSettings {
                output_size: PORTRAIT_CARD_SIZE,
                display_size: PORTRAIT_DISPLAY_SIZE,
            },
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Default location: `<config dir>/cardcam/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory on this platform, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str::<Config>(&contents) {
            Ok(config) => {
                info!(path = %path.display(), "Config loaded");
                config.sanitized()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("no config directory on this platform".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write `path` atomically: a temp file next to it, then rename
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Storage(format!("{}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| AppError::Storage(format!("{}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| AppError::Storage(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Clamp every value into its valid range
    pub fn sanitized(mut self) -> Self {
        self.exposure_bias = if self.exposure_bias.is_finite() {
            self.exposure_bias.clamp(MIN_EXPOSURE_BIAS, MAX_EXPOSURE_BIAS)
        } else {
            0.0
        };
        if self.preview_viewport.0 == 0 || self.preview_viewport.1 == 0 {
            self.preview_viewport = DEFAULT_PREVIEW_VIEWPORT;
        }

        let defaults = Config::default();
        if self.landscape.target().validate().is_err() {
            warn!(landscape = ?self.landscape, "Invalid landscape target, using default");
            self.landscape = defaults.landscape;
        }
        if self.portrait.target().validate().is_err() {
            warn!(portrait = ?self.portrait, "Invalid portrait target, using default");
            self.portrait = defaults.portrait;
        }
        if self.log_filter.trim().is_empty() {
            self.log_filter = defaults.log_filter;
        }
        self
    }

    pub fn target_for(&self, format: CardFormat) -> CompositionTarget {
        match format {
            CardFormat::Landscape16x9 => self.landscape.target(),
            CardFormat::Portrait9x16 => self.portrait.target(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_clamps_exposure() {
        let config = Config {
            exposure_bias: 7.5,
            ..Config::default()
        }
        .sanitized();
        assert_eq!(config.exposure_bias, MAX_EXPOSURE_BIAS);
    }

    #[test]
    fn test_sanitize_restores_bad_targets() {
        let config = Config {
            landscape: TargetSettings {
                output_size: (0, 1080),
                display_size: (390.0, 219.0),
            },
            preview_viewport: (0, 0),
            ..Config::default()
        }
        .sanitized();
        assert_eq!(config.landscape, Config::default().landscape);
        assert_eq!(config.preview_viewport, DEFAULT_PREVIEW_VIEWPORT);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"night_mode": true}"#).unwrap();
        assert!(config.night_mode);
        assert_eq!(config.landscape.output_size, LANDSCAPE_CARD_SIZE);
    }
}
