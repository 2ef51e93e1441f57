// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the preview, still and composition pipelines

use cardcam::backends::camera::types::LensPosition;
use cardcam::backends::virtual_camera::{VirtualCamera, VirtualCameraConfig, test_pattern};
use cardcam::errors::ServiceError;
use cardcam::pipelines::composition::{self, CompositionTarget, composition_transform};
use cardcam::pipelines::photo::StillPipeline;
use cardcam::pipelines::preview::PreviewPipeline;
use cardcam::services::{PrivacyRedactor, ServiceFuture};
use cardcam::{CaptureSession, FilterSelection, FilterSpec, TransformState};
use futures::{FutureExt, StreamExt};
use image::RgbaImage;
use image::metadata::Orientation;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::Point;

const WAIT: Duration = Duration::from_secs(5);

async fn running_session(config: VirtualCameraConfig) -> CaptureSession {
    let session = CaptureSession::new(Box::new(VirtualCamera::new(config)), LensPosition::Back);
    session.setup().await.expect("setup");
    session
}

struct FailingRedactor;

impl PrivacyRedactor for FailingRedactor {
    fn redact(&self, _image: Arc<RgbaImage>) -> ServiceFuture<RgbaImage> {
        async { Err(ServiceError::Failed("model not loaded".to_string())) }.boxed()
    }
}

/// Blacks out the top half
struct TopHalfRedactor;

impl PrivacyRedactor for TopHalfRedactor {
    fn redact(&self, image: Arc<RgbaImage>) -> ServiceFuture<RgbaImage> {
        async move {
            let mut out = image.as_ref().clone();
            let half = out.height() / 2;
            for (_, y, pixel) in out.enumerate_pixels_mut() {
                if y < half {
                    pixel.0 = [0, 0, 0, 255];
                }
            }
            Ok(out)
        }
        .boxed()
    }
}

/// Returns a thumbnail instead of the full image
struct ShrinkingRedactor;

impl PrivacyRedactor for ShrinkingRedactor {
    fn redact(&self, _image: Arc<RgbaImage>) -> ServiceFuture<RgbaImage> {
        async { Ok(RgbaImage::new(8, 8)) }.boxed()
    }
}

#[tokio::test]
async fn test_still_is_normalized_and_filtered() {
    let config = VirtualCameraConfig {
        still_orientation: Orientation::Rotate90,
        ..VirtualCameraConfig::default()
    };
    let session = running_session(config).await;
    let selection = FilterSelection::new(Some(FilterSpec::Mono));

    let still = StillPipeline::new(selection).capture(&session).await.unwrap();
    assert_eq!(still.image.dimensions(), (300, 400));
    assert!(still.reoriented);
    assert!(!still.redacted);
    assert_eq!(still.filter, Some("mono"));
    assert!(still.image.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));

    session.stop().await;
}

#[tokio::test]
async fn test_upright_still_is_passed_through() {
    let session = running_session(VirtualCameraConfig::default()).await;

    let still = StillPipeline::new(FilterSelection::default())
        .capture(&session)
        .await
        .unwrap();
    assert!(!still.reoriented);
    assert_eq!(still.filter, None);
    assert_eq!(still.image.as_ref(), &test_pattern(400, 300));

    session.stop().await;
}

#[tokio::test]
async fn test_redaction_failure_keeps_unredacted_still() {
    let session = running_session(VirtualCameraConfig::default()).await;

    let still = StillPipeline::new(FilterSelection::default())
        .with_redactor(Arc::new(FailingRedactor))
        .capture(&session)
        .await
        .unwrap();
    assert!(!still.redacted);
    assert_eq!(still.image.as_ref(), &test_pattern(400, 300));

    let still = StillPipeline::new(FilterSelection::default())
        .with_redactor(Arc::new(ShrinkingRedactor))
        .capture(&session)
        .await
        .unwrap();
    assert!(!still.redacted);
    assert_eq!(still.image.dimensions(), (400, 300));

    session.stop().await;
}

#[tokio::test]
async fn test_redactor_output_replaces_still() {
    let session = running_session(VirtualCameraConfig::default()).await;

    let still = StillPipeline::new(FilterSelection::default())
        .with_redactor(Arc::new(TopHalfRedactor))
        .capture(&session)
        .await
        .unwrap();
    assert!(still.redacted);
    assert_eq!(still.image.get_pixel(399, 0).0, [0, 0, 0, 255]);
    assert_eq!(still.image.get_pixel(399, 299), test_pattern(400, 300).get_pixel(399, 299));

    session.stop().await;
}

#[tokio::test]
async fn test_preview_follows_shared_filter_selection() {
    let session = running_session(VirtualCameraConfig::default()).await;
    let selection = FilterSelection::new(Some(FilterSpec::Negative));
    let handle = PreviewPipeline::new((32, 32), selection.clone()).spawn(session.frames());
    let mut updates = handle.subscribe();

    let update = tokio::time::timeout(WAIT, updates.wait_for(|u| u.is_some()))
        .await
        .expect("preview update")
        .unwrap()
        .clone()
        .unwrap();
    let image = update.output.image().expect("filtered frame");
    assert_eq!(image.dimensions(), (32, 32));

    // Clearing the selection switches the preview back to the raw layer
    selection.set(None);
    tokio::time::timeout(
        WAIT,
        updates.wait_for(|u| u.as_ref().is_some_and(|u| u.output.is_raw_layer())),
    )
    .await
    .expect("raw layer update")
    .unwrap();

    handle.stop();
    session.stop().await;
}

#[tokio::test]
async fn test_preview_sequences_increase() {
    let session = running_session(VirtualCameraConfig::default()).await;
    let handle = PreviewPipeline::new((16, 16), FilterSelection::new(Some(FilterSpec::Mono)))
        .spawn(session.frames());
    let mut stream = Box::pin(handle.stream());

    let mut last = None;
    for _ in 0..3 {
        let update = tokio::time::timeout(WAIT, stream.next())
            .await
            .expect("preview update")
            .expect("stream open");
        if let Some(last) = last {
            assert!(update.sequence > last);
        }
        last = Some(update.sequence);
    }

    session.stop().await;
}

fn map(transform: &tiny_skia::Transform, x: f32, y: f32) -> (f32, f32) {
    let mut points = [Point::from_xy(x, y)];
    transform.map_points(&mut points);
    (points[0].x, points[0].y)
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn test_reference_matrix_rotate_flip_scale() {
    let target = CompositionTarget::new((1920, 1080), (390.0, 219.375));
    let state = TransformState {
        scale: 2.0,
        rotation_radians: FRAC_PI_2,
        flip_horizontal: true,
        flip_vertical: false,
        offset: (0.0, 0.0),
    };

    let t = composition_transform((1920, 1080), &state, &target).unwrap();
    assert!(close(t.sx, 0.0), "sx = {}", t.sx);
    assert!(close(t.kx, -2.0), "kx = {}", t.kx);
    assert!(close(t.ky, -2.0), "ky = {}", t.ky);
    assert!(close(t.sy, 0.0), "sy = {}", t.sy);
    assert!(close(t.tx, 2040.0), "tx = {}", t.tx);
    assert!(close(t.ty, 2460.0), "ty = {}", t.ty);
}

#[test]
fn test_identity_4_3_source_is_centred() {
    let target = CompositionTarget::landscape();
    let t = composition_transform((4032, 3024), &TransformState::identity(), &target).unwrap();

    let (x, y) = map(&t, 2016.0, 1512.0);
    assert!(close(x, 960.0) && close(y, 540.0));
    // Width fills, height overflows evenly
    let (_, top) = map(&t, 2016.0, 0.0);
    let (_, bottom) = map(&t, 2016.0, 3024.0);
    assert!(close(top, -180.0) && close(bottom, 1260.0));
}

#[test]
fn test_render_matches_target_for_both_formats() {
    let source = test_pattern(400, 300);
    for target in [CompositionTarget::landscape(), CompositionTarget::portrait()] {
        let image = composition::render(&source, &TransformState::identity(), &target).unwrap();
        assert_eq!(image.dimensions(), target.output_size);
        assert!(image.pixels().all(|p| p[3] == 255));
    }
}

#[test]
fn test_extreme_aspects_cover_every_output_pixel() {
    let sources = [(1, 50), (50, 1), (1000, 3), (3, 1000), (7, 7), (2000, 1999)];
    let targets = [
        CompositionTarget::new((64, 36), (64.0, 36.0)),
        CompositionTarget::new((36, 64), (36.0, 64.0)),
    ];

    for (width, height) in sources {
        let white = RgbaImage::from_pixel(width, height, image::Rgba([255; 4]));
        for target in &targets {
            let image = composition::render(&white, &TransformState::identity(), target).unwrap();
            let uncovered = image.pixels().filter(|p| p.0 != [255; 4]).count();
            assert_eq!(
                uncovered, 0,
                "{}x{} into {:?} left {} pixels uncovered",
                width, height, target.output_size, uncovered
            );
        }
    }
}
