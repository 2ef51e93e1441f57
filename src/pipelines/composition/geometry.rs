// SPDX-License-Identifier: MPL-2.0

//! Composition geometry
//!
//! All geometry is centre-origin: (0, 0) is the middle of the output frame.
//! The interactive canvas shows the same frame at `display_size`, so an
//! offset of `dx` display units moves the image by `dx × output/display`
//! output pixels.

use crate::constants::{
    AspectRatio, LANDSCAPE_CARD_SIZE, LANDSCAPE_DISPLAY_SIZE, PORTRAIT_CARD_SIZE,
    PORTRAIT_DISPLAY_SIZE,
};
use crate::errors::CompositionError;
use crate::transform::TransformState;
use tiny_skia::Transform;

/// Output frame and the interactive canvas it corresponds to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositionTarget {
    /// Output raster size in pixels
    pub output_size: (u32, u32),
    /// Size of the interactive canvas in display units
    pub display_size: (f32, f32),
}

impl CompositionTarget {
    pub fn new(output_size: (u32, u32), display_size: (f32, f32)) -> Self {
        Self {
            output_size,
            display_size,
        }
    }

    /// 16:9 card at the default resolution
    pub fn landscape() -> Self {
        Self::new(LANDSCAPE_CARD_SIZE, LANDSCAPE_DISPLAY_SIZE)
    }

    /// 9:16 card at the default resolution
    pub fn portrait() -> Self {
        Self::new(PORTRAIT_CARD_SIZE, PORTRAIT_DISPLAY_SIZE)
    }

    /// Output aspect ratio, width over height
    pub fn aspect(&self) -> f32 {
        self.output_size.0 as f32 / self.output_size.1.max(1) as f32
    }

    /// Whether the output matches `ratio` to within a pixel of rounding
    pub fn matches_aspect(&self, ratio: AspectRatio) -> bool {
        let expected_height = self.output_size.0 as f32 / ratio.as_f32();
        (expected_height - self.output_size.1 as f32).abs() <= 1.0
    }

    /// Output pixels per display unit on each axis
    pub fn display_to_output(&self) -> (f32, f32) {
        (
            self.output_size.0 as f32 / self.display_size.0,
            self.output_size.1 as f32 / self.display_size.1,
        )
    }

    pub(crate) fn validate(&self) -> Result<(), CompositionError> {
        if self.output_size.0 == 0 || self.output_size.1 == 0 {
            return Err(CompositionError::EmptyOutput);
        }
        let (dw, dh) = self.display_size;
        if !(dw.is_finite() && dh.is_finite() && dw > 0.0 && dh > 0.0) {
            return Err(CompositionError::InvalidDisplaySize);
        }
        Ok(())
    }
}

/// Axis-aligned rectangle in centre-origin output coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Rectangle, centred on the origin, where an untransformed source lands
///
/// The source covers the whole output: a source wider than the output fills
/// the height and overflows horizontally, otherwise it fills the width and
/// overflows vertically.
pub fn fill_rect(source_size: (u32, u32), output_size: (u32, u32)) -> FillRect {
    let source_aspect = source_size.0 as f32 / source_size.1.max(1) as f32;
    let output_aspect = output_size.0 as f32 / output_size.1.max(1) as f32;
    let (out_w, out_h) = (output_size.0 as f32, output_size.1 as f32);

    let (width, height) = if source_aspect > output_aspect {
        (out_h * source_aspect, out_h)
    } else {
        (out_w, out_w / source_aspect)
    };

    FillRect {
        x: -width / 2.0,
        y: -height / 2.0,
        width,
        height,
    }
}

/// Matrix mapping source pixel coordinates to output pixel coordinates
///
/// Reading left to right, points are moved to the output centre, offset,
/// scaled, rotated, flipped, then placed in the fill rectangle. Points go
/// through the steps in reverse.
pub fn composition_transform(
    source_size: (u32, u32),
    state: &TransformState,
    target: &CompositionTarget,
) -> Result<Transform, CompositionError> {
    validate_state(state)?;
    target.validate()?;
    if source_size.0 == 0 || source_size.1 == 0 {
        return Err(CompositionError::EmptySource);
    }

    let (out_w, out_h) = (target.output_size.0 as f32, target.output_size.1 as f32);
    let (per_unit_x, per_unit_y) = target.display_to_output();
    let rect = fill_rect(source_size, target.output_size);
    let scale = state.scale as f32;
    let flip_x = if state.flip_horizontal { -1.0 } else { 1.0 };
    let flip_y = if state.flip_vertical { -1.0 } else { 1.0 };

    let transform = Transform::from_translate(out_w / 2.0, out_h / 2.0)
        .pre_translate(
            state.offset.0 as f32 * per_unit_x,
            state.offset.1 as f32 * per_unit_y,
        )
        .pre_scale(scale, scale)
        .pre_rotate(state.rotation_degrees() as f32)
        .pre_scale(flip_x, flip_y)
        .pre_translate(rect.x, rect.y)
        .pre_scale(
            rect.width / source_size.0 as f32,
            rect.height / source_size.1 as f32,
        );

    if !transform.is_finite() || transform.invert().is_none() {
        return Err(CompositionError::DegenerateTransform);
    }
    Ok(transform)
}

fn validate_state(state: &TransformState) -> Result<(), CompositionError> {
    if !state.scale.is_finite() || state.scale <= 0.0 {
        return Err(CompositionError::DegenerateScale(state.scale));
    }
    let finite = state.rotation_radians.is_finite()
        && state.offset.0.is_finite()
        && state.offset.1.is_finite();
    if !finite {
        return Err(CompositionError::DegenerateTransform);
    }
    Ok(())
}
