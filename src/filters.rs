// SPDX-License-Identifier: GPL-3.0-only

//! Visual filters shared by the live preview and the still pipeline
//!
//! Filters are a closed set. Each variant is a pure per-pixel function (plus
//! normalized pixel position for spatial effects), so applying the same spec
//! to a preview frame and to a still yields the same look at any resolution.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// A visual effect and its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    /// Black & white
    Mono,
    /// Warm brownish tint, `intensity` in [0, 1]
    Sepia { intensity: f32 },
    /// High contrast black & white
    Noir { contrast: f32 },
    /// Boosted saturation and contrast
    Vivid { saturation: f32 },
    /// Colour temperature shift; negative is cooler, positive warmer, in [-1, 1]
    Temperature { shift: f32 },
    /// Lifted blacks with muted colours
    Fade { amount: f32 },
    /// Darkened edges; `radius` is where darkening starts, from the centre
    Vignette { radius: f32, softness: f32 },
    /// Inverted colours
    Negative,
    /// Reduced colour levels per channel
    Posterize { levels: u8 },
    /// Inverts tones above `threshold`
    Solarize { threshold: f32 },
}

impl FilterSpec {
    /// Stable identifier, e.g. for persisting the user's choice
    pub fn id(&self) -> &'static str {
        match self {
            FilterSpec::Mono => "mono",
            FilterSpec::Sepia { .. } => "sepia",
            FilterSpec::Noir { .. } => "noir",
            FilterSpec::Vivid { .. } => "vivid",
            FilterSpec::Temperature { .. } => "temperature",
            FilterSpec::Fade { .. } => "fade",
            FilterSpec::Vignette { .. } => "vignette",
            FilterSpec::Negative => "negative",
            FilterSpec::Posterize { .. } => "posterize",
            FilterSpec::Solarize { .. } => "solarize",
        }
    }

    /// Filter with default parameters for an identifier from [`FilterSpec::id`]
    pub fn from_id(id: &str) -> Option<Self> {
        let spec = match id {
            "mono" => FilterSpec::Mono,
            "sepia" => FilterSpec::Sepia { intensity: 1.0 },
            "noir" => FilterSpec::Noir { contrast: 1.5 },
            "vivid" => FilterSpec::Vivid { saturation: 1.4 },
            "temperature" => FilterSpec::Temperature { shift: 0.5 },
            "fade" => FilterSpec::Fade { amount: 0.6 },
            "vignette" => FilterSpec::Vignette {
                radius: 0.35,
                softness: 0.45,
            },
            "negative" => FilterSpec::Negative,
            "posterize" => FilterSpec::Posterize { levels: 4 },
            "solarize" => FilterSpec::Solarize { threshold: 0.5 },
            _ => return None,
        };
        Some(spec)
    }

    /// Apply the filter in place
    pub fn apply(&self, image: &mut RgbaImage) {
        let (width, height) = image.dimensions();
        debug!(filter = self.id(), width, height, "Applying filter");

        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let mut rgb = [
                pixel[0] as f32 / 255.0,
                pixel[1] as f32 / 255.0,
                pixel[2] as f32 / 255.0,
            ];
            // Pixel centres, normalized to [0, 1]
            let u = (x as f32 + 0.5) / w;
            let v = (y as f32 + 0.5) / h;
            self.apply_rgb(&mut rgb, u, v);

            pixel[0] = to_u8(rgb[0]);
            pixel[1] = to_u8(rgb[1]);
            pixel[2] = to_u8(rgb[2]);
        }
    }

    /// Apply to a copy, leaving `image` untouched
    pub fn applied(&self, image: &RgbaImage) -> RgbaImage {
        let mut out = image.clone();
        self.apply(&mut out);
        out
    }

    fn apply_rgb(&self, rgb: &mut [f32; 3], u: f32, v: f32) {
        let lum = luminance(rgb[0], rgb[1], rgb[2]);
        match *self {
            FilterSpec::Mono => *rgb = [lum; 3],

            FilterSpec::Sepia { intensity } => {
                let t = intensity.clamp(0.0, 1.0);
                let sepia = [lum * 1.2 + 0.1, lum * 0.9 + 0.05, lum * 0.7];
                for (c, target) in rgb.iter_mut().zip(sepia) {
                    *c = mix(*c, target, t);
                }
            }

            FilterSpec::Noir { contrast } => *rgb = [(lum - 0.5) * contrast + 0.5; 3],

            FilterSpec::Vivid { saturation } => {
                for c in rgb.iter_mut() {
                    let saturated = (lum + (*c - lum) * saturation).clamp(0.0, 1.0);
                    *c = (saturated - 0.5) * 1.15 + 0.5;
                }
            }

            FilterSpec::Temperature { shift } => {
                let s = shift.clamp(-1.0, 1.0);
                let gains = if s < 0.0 {
                    [0.9, 0.95, 1.1]
                } else {
                    [1.1, 1.0, 0.85]
                };
                for (c, gain) in rgb.iter_mut().zip(gains) {
                    *c *= mix(1.0, gain, s.abs());
                }
            }

            FilterSpec::Fade { amount } => {
                let a = amount.clamp(0.0, 1.0);
                for c in rgb.iter_mut() {
                    *c = *c * (1.0 - 0.15 * a) + 0.1 * a;
                }
                let lifted = luminance(rgb[0], rgb[1], rgb[2]);
                for c in rgb.iter_mut() {
                    *c = lifted + (*c - lifted) * (1.0 - 0.3 * a);
                }
            }

            FilterSpec::Vignette { radius, softness } => {
                let dx = u - 0.5;
                let dy = v - 0.5;
                let dist = (dx * dx + dy * dy).sqrt();
                let factor = 1.0 - smoothstep(radius, radius + softness.max(f32::EPSILON), dist);
                for c in rgb.iter_mut() {
                    *c *= factor;
                }
            }

            FilterSpec::Negative => {
                for c in rgb.iter_mut() {
                    *c = 1.0 - *c;
                }
            }

            FilterSpec::Posterize { levels } => {
                let levels = levels.max(2) as f32;
                for c in rgb.iter_mut() {
                    *c = (*c * levels).floor().min(levels - 1.0) / (levels - 1.0);
                }
            }

            FilterSpec::Solarize { threshold } => {
                for c in rgb.iter_mut() {
                    if *c > threshold {
                        *c = 1.0 - *c;
                    }
                }
            }
        }
    }
}

/// Apply an optional filter; `None` is passthrough and returns the input
pub fn apply_optional(filter: Option<&FilterSpec>, image: RgbaImage) -> RgbaImage {
    match filter {
        Some(spec) => {
            let mut image = image;
            spec.apply(&mut image);
            image
        }
        None => image,
    }
}

/// The currently selected filter, shared by the preview and still paths
///
/// Cloning shares the selection, so both paths always see the same effect.
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    current: Arc<RwLock<Option<FilterSpec>>>,
}

impl FilterSelection {
    pub fn new(filter: Option<FilterSpec>) -> Self {
        Self {
            current: Arc::new(RwLock::new(filter)),
        }
    }

    pub fn get(&self) -> Option<FilterSpec> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, filter: Option<FilterSpec>) {
        debug!(filter = filter.as_ref().map(FilterSpec::id), "Filter selection changed");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = filter;
    }

    pub fn is_active(&self) -> bool {
        self.get().is_some()
    }
}

#[inline]
fn luminance(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
