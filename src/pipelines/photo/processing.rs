// SPDX-License-Identifier: MPL-2.0

//! Post-processing of captured stills
//!
//! - Orientation normalization to upright
//! - The same filter the preview shows
//!
//! Stills are never cropped here; framing happens in composition.

use crate::backends::camera::types::CapturedImage;
use crate::filters::{FilterSelection, apply_optional};
use image::metadata::Orientation;
use image::{DynamicImage, RgbaImage};
use tracing::{debug, info};

/// Upright still ready for filtering
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub image: RgbaImage,
    /// Whether pixels had to be rewritten to become upright
    pub redrawn: bool,
}

/// Make `image` upright according to its orientation tag
///
/// Already-upright input is returned as is, without touching any pixel.
pub fn normalize_orientation(image: RgbaImage, orientation: Orientation) -> NormalizedImage {
    if orientation == Orientation::NoTransforms {
        return NormalizedImage {
            image,
            redrawn: false,
        };
    }

    debug!(?orientation, "Redrawing still upright");
    let mut dynamic = DynamicImage::ImageRgba8(image);
    dynamic.apply_orientation(orientation);
    NormalizedImage {
        image: dynamic.into_rgba8(),
        redrawn: true,
    }
}

/// Processed still
#[derive(Debug, Clone)]
pub struct ProcessedStill {
    pub image: RgbaImage,
    pub redrawn: bool,
    pub filter: Option<&'static str>,
}

/// Post-processor for captured stills
#[derive(Debug, Clone, Default)]
pub struct StillProcessor {
    selection: FilterSelection,
}

impl StillProcessor {
    /// `selection` is the handle shared with the preview pipeline
    pub fn new(selection: FilterSelection) -> Self {
        Self { selection }
    }

    /// Normalize and filter on a blocking worker
    pub async fn process(&self, captured: CapturedImage) -> Result<ProcessedStill, String> {
        info!(
            width = captured.image.width(),
            height = captured.image.height(),
            "Starting post-processing"
        );

        let filter = self.selection.get();
        tokio::task::spawn_blocking(move || {
            let normalized = normalize_orientation(captured.image, captured.orientation);
            let image = apply_optional(filter.as_ref(), normalized.image);
            debug!(filter = filter.as_ref().map(|f| f.id()), "Post-processing complete");
            ProcessedStill {
                image,
                redrawn: normalized.redrawn,
                filter: filter.as_ref().map(|f| f.id()),
            }
        })
        .await
        .map_err(|e| format!("Post-processing task error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::test_pattern;

    #[test]
    fn test_upright_is_untouched() {
        let image = test_pattern(12, 7);
        let normalized = normalize_orientation(image.clone(), Orientation::NoTransforms);
        assert!(!normalized.redrawn);
        assert_eq!(normalized.image, image);
    }

    #[test]
    fn test_rotate90_swaps_dimensions() {
        let normalized = normalize_orientation(test_pattern(12, 7), Orientation::Rotate90);
        assert!(normalized.redrawn);
        assert_eq!(normalized.image.dimensions(), (7, 12));
    }

    #[test]
    fn test_round_trip_quarter_turns() {
        let image = test_pattern(9, 5);
        let once = normalize_orientation(image.clone(), Orientation::Rotate90).image;
        let back = normalize_orientation(once, Orientation::Rotate270).image;
        assert_eq!(back, image);
    }
}
