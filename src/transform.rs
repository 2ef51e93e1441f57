// SPDX-License-Identifier: GPL-3.0-only

//! Interactive transform model for card composition
//!
//! Continuous gestures (pinch, pan) update a *live* value derived from the
//! *baseline* captured when the gesture began. Ending the gesture commits the
//! live value into the baseline exactly once. Discrete actions (quarter
//! rotations, flips) apply to both immediately.

use std::f64::consts::FRAC_PI_2;
use tracing::{debug, warn};

/// Geometric state of the image inside the composition canvas
///
/// `offset` is in interactive display units, relative to the canvas centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    /// Uniform scale; never negative, zero allowed
    pub scale: f64,
    pub rotation_radians: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub offset: (f64, f64),
}

impl TransformState {
    pub const IDENTITY: TransformState = TransformState {
        scale: 1.0,
        rotation_radians: 0.0,
        flip_horizontal: false,
        flip_vertical: false,
        offset: (0.0, 0.0),
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.rotation_radians.to_degrees()
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Gesture-driven transform with baseline/live two-phase updates
#[derive(Debug, Clone, Default)]
pub struct InteractiveTransform {
    baseline: TransformState,
    live: TransformState,
    pinch_active: bool,
    pan_active: bool,
}

impl InteractiveTransform {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Pinch =====

    /// Start a pinch. An unfinished pinch is committed first.
    pub fn begin_pinch(&mut self) {
        if self.pinch_active {
            debug!("Pinch restarted before end, committing outstanding scale");
            self.commit_scale();
        }
        self.pinch_active = true;
    }

    /// Live scale becomes `baseline × magnification`
    ///
    /// Updates without a preceding `begin_pinch` start one implicitly.
    pub fn update_pinch(&mut self, magnification: f64) {
        if !magnification.is_finite() {
            warn!(magnification, "Ignoring non-finite pinch magnification");
            return;
        }
        self.pinch_active = true;
        self.live.scale = (self.baseline.scale * magnification).max(0.0);
    }

    /// Commit the live scale. A second call without a new gesture is a no-op.
    pub fn end_pinch(&mut self) {
        if self.pinch_active {
            self.commit_scale();
            self.pinch_active = false;
            debug!(scale = self.baseline.scale, "Pinch committed");
        }
    }

    fn commit_scale(&mut self) {
        self.baseline.scale = self.live.scale;
    }

    // ===== Pan =====

    /// Start a pan. An unfinished pan is committed first.
    pub fn begin_pan(&mut self) {
        if self.pan_active {
            debug!("Pan restarted before end, committing outstanding offset");
            self.commit_offset();
        }
        self.pan_active = true;
    }

    /// Live offset becomes `baseline + translation`, where the translation is
    /// cumulative since the pan began
    pub fn update_pan(&mut self, dx: f64, dy: f64) {
        if !dx.is_finite() || !dy.is_finite() {
            warn!(dx, dy, "Ignoring non-finite pan translation");
            return;
        }
        self.pan_active = true;
        self.live.offset = (self.baseline.offset.0 + dx, self.baseline.offset.1 + dy);
    }

    pub fn end_pan(&mut self) {
        if self.pan_active {
            self.commit_offset();
            self.pan_active = false;
            debug!(offset = ?self.baseline.offset, "Pan committed");
        }
    }

    fn commit_offset(&mut self) {
        self.baseline.offset = self.live.offset;
    }

    // ===== Discrete actions =====

    /// Rotate a quarter turn counter-clockwise
    pub fn rotate_left(&mut self) {
        self.rotate_by(-FRAC_PI_2);
    }

    /// Rotate a quarter turn clockwise
    pub fn rotate_right(&mut self) {
        self.rotate_by(FRAC_PI_2);
    }

    fn rotate_by(&mut self, radians: f64) {
        self.baseline.rotation_radians += radians;
        self.live.rotation_radians = self.baseline.rotation_radians;
    }

    pub fn flip_horizontal(&mut self) {
        self.baseline.flip_horizontal = !self.baseline.flip_horizontal;
        self.live.flip_horizontal = self.baseline.flip_horizontal;
    }

    pub fn flip_vertical(&mut self) {
        self.baseline.flip_vertical = !self.baseline.flip_vertical;
        self.live.flip_vertical = self.baseline.flip_vertical;
    }

    // ===== State =====

    /// Value to display right now, including any gesture in progress
    pub fn current(&self) -> TransformState {
        self.live
    }

    /// Committed value, as rendering should see it
    pub fn committed(&self) -> TransformState {
        self.baseline
    }

    /// Commit any gesture still in progress and return the result
    pub fn snapshot(&mut self) -> TransformState {
        self.end_pinch();
        self.end_pan();
        self.baseline
    }

    pub fn is_gesture_active(&self) -> bool {
        self.pinch_active || self.pan_active
    }

    /// Back to identity, e.g. when a new source image is loaded
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
