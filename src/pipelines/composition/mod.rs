// SPDX-License-Identifier: MPL-2.0

//! Composition renderer
//!
//! Bakes a source image and a committed [`TransformState`] into a fixed-size
//! output raster that matches what the interactive canvas showed. The output
//! is opaque: anything the image does not cover is black.

pub mod geometry;

pub use geometry::{CompositionTarget, FillRect, composition_transform, fill_rect};

use crate::errors::CompositionError;
use crate::transform::TransformState;
use image::RgbaImage;
use tiny_skia::{Color, FilterQuality, IntSize, Pixmap, PixmapPaint};
use tracing::{debug, info};

/// Render `source` through `state` into `target`
///
/// All validation happens before the output is allocated, so an error never
/// leaves a partial image behind. Same inputs always give identical pixels.
pub fn render(
    source: &RgbaImage,
    state: &TransformState,
    target: &CompositionTarget,
) -> Result<RgbaImage, CompositionError> {
    let transform = composition_transform(source.dimensions(), state, target)?;
    let (width, height) = target.output_size;

    debug!(
        source_width = source.width(),
        source_height = source.height(),
        width,
        height,
        scale = state.scale,
        rotation = state.rotation_degrees(),
        "Rendering composition"
    );

    let source_pixmap = to_pixmap(source)?;
    let mut canvas = Pixmap::new(width, height)
        .ok_or_else(|| CompositionError::Allocation(format!("{}x{} canvas", width, height)))?;
    canvas.fill(Color::BLACK);

    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    canvas.draw_pixmap(0, 0, source_pixmap.as_ref(), &paint, transform, None);

    // The canvas starts opaque, so premultiplied and straight alpha agree
    let output = RgbaImage::from_raw(width, height, canvas.take())
        .ok_or_else(|| CompositionError::Allocation("output buffer size mismatch".to_string()))?;

    info!(width, height, "Composition rendered");
    Ok(output)
}

fn to_pixmap(image: &RgbaImage) -> Result<Pixmap, CompositionError> {
    let size = IntSize::from_wh(image.width(), image.height()).ok_or(CompositionError::EmptySource)?;

    let mut data = image.as_raw().clone();
    for pixel in data.chunks_exact_mut(4) {
        let alpha = pixel[3] as u16;
        if alpha < 255 {
            for channel in &mut pixel[..3] {
                *channel = ((*channel as u16 * alpha + 127) / 255) as u8;
            }
        }
    }

    Pixmap::from_vec(data, size)
        .ok_or_else(|| CompositionError::Allocation("source pixmap".to_string()))
}
