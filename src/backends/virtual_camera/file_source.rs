// SPDX-License-Identifier: GPL-3.0-only

//! Frame content for the virtual camera: image files or a generated pattern

use crate::backends::camera::types::{BackendError, BackendResult};
use image::{Rgba, RgbaImage};
use std::path::Path;
use tracing::{debug, info};

/// Load an image file as RGBA frame content
pub fn load_source_image(path: &Path) -> BackendResult<RgbaImage> {
    debug!(path = %path.display(), "Loading virtual camera source");

    let image = image::open(path)
        .map_err(|e| BackendError::Other(format!("Failed to load {}: {}", path.display(), e)))?
        .to_rgba8();

    if image.width() == 0 || image.height() == 0 {
        return Err(BackendError::Other(format!(
            "Source image {} is empty",
            path.display()
        )));
    }

    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Virtual camera source loaded"
    );
    Ok(image)
}

/// Horizontal red ramp, vertical green ramp, constant blue.
///
/// Every pixel is distinct along each axis, so rotations, flips and crops
/// are visible in tests.
pub fn test_pattern(width: u32, height: u32) -> RgbaImage {
    let w = width.max(2) - 1;
    let h = height.max(2) - 1;
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / w) as u8, (y * 255 / h) as u8, 128, 255])
    })
}
