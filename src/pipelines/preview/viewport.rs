// SPDX-License-Identifier: MPL-2.0

//! Cover scaling of upright preview frames into the on-screen viewport
//!
//! The frame is scaled uniformly until it covers the viewport on both axes,
//! then centre-cropped to the viewport's exact pixel size. There is never any
//! letterboxing.

use image::RgbaImage;
use image::imageops::{self, FilterType};

/// Uniform scale that makes `source` cover `viewport`
pub fn cover_scale(source: (u32, u32), viewport: (u32, u32)) -> f64 {
    let sx = viewport.0 as f64 / source.0.max(1) as f64;
    let sy = viewport.1 as f64 / source.1.max(1) as f64;
    sx.max(sy)
}

/// Size of `source` after cover scaling, never smaller than `viewport`
pub fn covered_size(source: (u32, u32), viewport: (u32, u32)) -> (u32, u32) {
    let scale = cover_scale(source, viewport);
    let width = ((source.0 as f64 * scale).round() as u32).max(viewport.0);
    let height = ((source.1 as f64 * scale).round() as u32).max(viewport.1);
    (width, height)
}

/// Scale to cover and centre-crop to exactly `viewport`
///
/// A zero-area viewport or frame yields an empty image of the viewport size.
pub fn cover_crop(image: &RgbaImage, viewport: (u32, u32)) -> RgbaImage {
    let (vw, vh) = viewport;
    if vw == 0 || vh == 0 || image.width() == 0 || image.height() == 0 {
        return RgbaImage::new(vw, vh);
    }
    if image.dimensions() == viewport {
        return image.clone();
    }

    let (sw, sh) = covered_size(image.dimensions(), viewport);
    let x = (sw - vw) / 2;
    let y = (sh - vh) / 2;

    if (sw, sh) == image.dimensions() {
        return imageops::crop_imm(image, x, y, vw, vh).to_image();
    }
    let scaled = imageops::resize(image, sw, sh, FilterType::Triangle);
    imageops::crop_imm(&scaled, x, y, vw, vh).to_image()
}
