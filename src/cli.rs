// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing the virtual device's lenses
//! - Planning lens hand-offs for a zoom sequence
//! - Composing an image file into a card
//! - Running the live filtered preview
//! - Capturing and composing a card end to end

use cardcam::Config;
use cardcam::backends::camera::types::LensPosition;
use cardcam::backends::camera::{CaptureSession, DeviceInventory};
use cardcam::backends::virtual_camera::{VirtualCamera, VirtualCameraConfig, load_source_image};
use cardcam::card::{CaptureType, CompositionSession};
use cardcam::filters::{FilterSelection, FilterSpec};
use cardcam::pipelines::composition;
use cardcam::pipelines::photo::{EncodingFormat, EncodingQuality, ImageEncoder, StillPipeline};
use cardcam::pipelines::preview::PreviewPipeline;
use futures::StreamExt;
use cardcam::transform::TransformState;
use std::f64::consts::FRAC_PI_2;
use std::path::PathBuf;
use std::sync::Arc;

/// Default folder name for saving cards
const DEFAULT_SAVE_FOLDER: &str = "cardcam";

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// List the virtual device's lenses on one side
pub fn list_lenses(front: bool) -> CliResult {
    let position = if front {
        LensPosition::Front
    } else {
        LensPosition::Back
    };
    let camera = VirtualCamera::new(VirtualCameraConfig::default());
    let inventory = DeviceInventory::enumerate(&camera, position);

    if inventory.is_empty() {
        println!("No lenses found.");
        return Ok(());
    }

    println!("Available lenses ({:?}):", position);
    println!();
    for (index, lens) in inventory.lenses().iter().enumerate() {
        let default = if Some(index) == inventory.default_index() {
            " (default)"
        } else {
            ""
        };
        println!("  [{}] {}{}", index, lens.kind, default);
        println!(
            "      Zoom: {:.1}x-{:.1}x  Raw: {}  Flash: {}",
            lens.min_zoom,
            lens.max_zoom,
            if lens.supports_raw { "yes" } else { "no" },
            if lens.flash_modes.is_empty() {
                "none".to_string()
            } else {
                lens.flash_modes
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        );
    }
    Ok(())
}

/// Apply zoom factors in order and print where each one lands
pub fn zoom_plan(config: &Config, factors: &[f64]) -> CliResult {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let camera = VirtualCamera::new(VirtualCameraConfig::default());
        let session = CaptureSession::new(Box::new(camera), config.lens_position);
        session.setup().await?;

        println!("{:>10}  {:>10}  {:>10}  lens", "requested", "published", "hardware");
        for &factor in factors {
            let published = session.set_zoom(factor)?;
            let lens = session
                .active_lens()
                .map(|l| l.kind.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:>10.2}  {:>10.2}  {:>10.2}  {}",
                factor,
                published,
                session.hardware_zoom(),
                lens
            );
        }

        session.stop().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Arguments of the `render` command
pub struct RenderArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub capture_type: CaptureType,
    pub scale: f64,
    pub quarter_turns: i32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub offset: (f64, f64),
}

/// Compose an image file into a card with a fixed transform
pub fn render_card(config: &Config, args: RenderArgs) -> CliResult {
    let format = EncodingFormat::from_path(&args.output)
        .ok_or("Output must end in .png, .jpg or .jpeg")?;
    let source = load_source_image(&args.input)?;
    let target = config.target_for(args.capture_type.card_format());

    let state = TransformState {
        scale: args.scale,
        rotation_radians: args.quarter_turns as f64 * FRAC_PI_2,
        flip_horizontal: args.flip_horizontal,
        flip_vertical: args.flip_vertical,
        offset: args.offset,
    };

    println!(
        "Composing {}x{} into {}x{} ({} card)",
        source.width(),
        source.height(),
        target.output_size.0,
        target.output_size.1,
        args.capture_type
    );
    let image = composition::render(&source, &state, &target)?;

    let encoded = ImageEncoder::new(format, EncodingQuality::High)
        .encode_blocking(&image)
        .map_err(|e| format!("Encoding failed: {}", e))?;
    std::fs::write(&args.output, &encoded.data)?;

    println!("Card saved to: {}", args.output.display());
    Ok(())
}

/// Run the preview for `frames` updates, optionally saving the last filtered frame
pub fn preview(
    config: &Config,
    filter: Option<String>,
    frames: usize,
    output: Option<PathBuf>,
) -> CliResult {
    let filter = resolve_filter(config, filter.as_deref())?;
    let format = match &output {
        Some(path) => Some(
            EncodingFormat::from_path(path).ok_or("Output must end in .png, .jpg or .jpeg")?,
        ),
        None => None,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let last = runtime.block_on(async {
        let session = CaptureSession::new(
            Box::new(VirtualCamera::new(VirtualCameraConfig::default())),
            config.lens_position,
        );
        session.setup().await?;

        let (width, height) = config.preview_viewport;
        println!(
            "Previewing at {}x{} with filter {}",
            width,
            height,
            filter.map(|f| f.id()).unwrap_or("none")
        );

        let handle =
            PreviewPipeline::new(config.preview_viewport, FilterSelection::new(filter))
                .spawn(session.frames());
        let mut updates = Box::pin(handle.stream().take(frames));
        let mut last = None;
        while let Some(update) = updates.next().await {
            println!(
                "  frame {:>4}  {:>6.1} ms  {}",
                update.sequence,
                update.latency.as_secs_f64() * 1000.0,
                if update.output.is_raw_layer() {
                    "raw layer"
                } else {
                    "filtered"
                }
            );
            last = update.output.image().cloned();
        }

        handle.stop();
        session.stop().await;
        Ok::<_, Box<dyn std::error::Error>>(last)
    })?;

    if let (Some(path), Some(format)) = (output, format) {
        let image = last.ok_or("No filtered frame to save (no filter selected)")?;
        let encoded = ImageEncoder::new(format, EncodingQuality::High)
            .encode_blocking(&image)
            .map_err(|e| format!("Encoding failed: {}", e))?;
        std::fs::write(&path, &encoded.data)?;
        println!("Frame saved to: {}", path.display());
    }
    Ok(())
}

/// Capture from the virtual camera and compose the still into a card
pub fn take_photo(
    config: &Config,
    source: Option<PathBuf>,
    capture_type: CaptureType,
    zoom: f64,
    filter: Option<String>,
    output: Option<PathBuf>,
) -> CliResult {
    let filter = resolve_filter(config, filter.as_deref())?;

    let mut camera_config = VirtualCameraConfig::default();
    if let Some(path) = &source {
        camera_config = camera_config.with_source_file(path)?;
    }
    let output_dir = output.unwrap_or_else(get_default_photo_dir);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let session = CaptureSession::new(
            Box::new(VirtualCamera::new(camera_config)),
            config.lens_position,
        );
        session.setup().await?;
        session.set_flash_mode(config.flash_mode);
        session.set_capture_format(config.capture_format);
        session.set_night_mode(config.night_mode);
        session.set_exposure_bias(config.exposure_bias)?;
        session.set_zoom(zoom)?;

        if let Some(lens) = session.active_lens() {
            println!("Using lens: {} at {:.1}x", lens, session.hardware_zoom());
        }

        println!("Capturing...");
        let selection = FilterSelection::new(filter);
        let still = StillPipeline::new(selection).capture(&session).await?;
        session.stop().await;

        let target = config.target_for(capture_type.card_format());
        let mut composition = CompositionSession::new(capture_type, Arc::clone(&still.image), target);
        let image = composition.render()?;

        let encoder = ImageEncoder::new(EncodingFormat::Jpeg, EncodingQuality::High);
        let encoded = encoder.encode(image).await?;
        let path = encoder.save(encoded, output_dir, "CARD").await?;

        println!("Card saved to: {}", path.display());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Filter named on the command line, else the configured one
fn resolve_filter(config: &Config, id: Option<&str>) -> Result<Option<FilterSpec>, String> {
    match id {
        Some(id) => FilterSpec::from_id(id)
            .map(Some)
            .ok_or_else(|| format!("Unknown filter: {}", id)),
        None => Ok(config.filter),
    }
}

/// Get default card directory
fn get_default_photo_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_saves_frame_at_configured_viewport() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let config = Config {
            preview_viewport: (24, 40),
            ..Config::default()
        };

        preview(&config, Some("mono".to_string()), 2, Some(path.clone())).unwrap();

        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (24, 40));
    }

    #[test]
    fn test_unknown_filter_is_rejected() {
        assert!(resolve_filter(&Config::default(), Some("sparkle")).is_err());
        assert_eq!(
            resolve_filter(&Config::default(), Some("negative")),
            Ok(Some(FilterSpec::Negative))
        );
    }
}
