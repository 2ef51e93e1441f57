// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use cardcam::backends::camera::types::{CaptureFormat, LensPosition};
use cardcam::{CardFormat, Config, FilterSpec, FlashMode};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.lens_position, LensPosition::Back);
    assert_eq!(config.flash_mode, FlashMode::Off);
    assert_eq!(config.filter, None);
    assert_eq!(
        config.target_for(CardFormat::Landscape16x9).output_size,
        (1920, 1080)
    );
    assert_eq!(
        config.target_for(CardFormat::Portrait9x16).output_size,
        (1080, 1920)
    );
}

#[test]
fn test_config_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        lens_position: LensPosition::Front,
        flash_mode: FlashMode::Auto,
        capture_format: CaptureFormat::StandardAndRaw,
        exposure_bias: -1.0,
        filter: Some(FilterSpec::Sepia { intensity: 0.5 }),
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());
    assert_eq!(Config::load_from(&path), config);
}

#[test]
fn test_missing_or_corrupt_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    assert_eq!(Config::load_from(&path), Config::default());

    std::fs::write(&path, "{ not json").unwrap();
    assert_eq!(Config::load_from(&path), Config::default());
}

#[test]
fn test_loaded_config_is_sanitized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"exposure_bias": -9.0, "log_filter": "  "}"#).unwrap();

    let config = Config::load_from(&path);
    assert_eq!(config.exposure_bias, -2.0);
    assert_eq!(config.log_filter, Config::default().log_filter);
}
