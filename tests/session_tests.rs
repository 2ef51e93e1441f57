// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the capture session controller

use cardcam::backends::camera::types::{
    BackendError, CaptureFormat, LensKind, LensPosition, PermissionStatus,
};
use cardcam::backends::virtual_camera::{VirtualCamera, VirtualCameraConfig, VirtualCameraProbe};
use cardcam::{CaptureSession, CaptureSettings, FlashMode, SessionError, SessionPhase};

async fn running_session(config: VirtualCameraConfig) -> (CaptureSession, VirtualCameraProbe) {
    let (camera, probe) = VirtualCamera::with_probe(config);
    let session = CaptureSession::new(Box::new(camera), LensPosition::Back);
    session.setup().await.expect("setup");
    (session, probe)
}

fn active_kind(session: &CaptureSession) -> LensKind {
    session.active_lens().expect("active lens").kind
}

#[tokio::test]
async fn test_setup_starts_on_wide_at_1x() {
    let (session, probe) = running_session(VirtualCameraConfig::default()).await;

    assert_eq!(session.phase(), SessionPhase::Running);
    assert_eq!(active_kind(&session), LensKind::Wide);
    assert_eq!(session.state().current_zoom_factor, 1.0);
    assert_eq!(probe.selected_inputs(), vec![LensKind::Wide]);

    session.stop().await;
}

#[tokio::test]
async fn test_zoom_sequence_hands_off_between_lenses() {
    let (session, _probe) = running_session(VirtualCameraConfig::default()).await;

    let expected = [
        (0.8, LensKind::UltraWide),
        (1.0, LensKind::Wide),
        (1.2, LensKind::Wide),
        (2.4, LensKind::Wide),
        (2.6, LensKind::Telephoto),
    ];
    for (factor, kind) in expected {
        let published = session.set_zoom(factor).unwrap();
        assert_eq!(published, factor, "published zoom changed at {}", factor);
        assert_eq!(session.state().current_zoom_factor, factor);
        assert_eq!(active_kind(&session), kind, "wrong lens at {}", factor);
    }

    session.stop().await;
}

#[tokio::test]
async fn test_hand_off_keeps_user_zoom_and_clamps_hardware() {
    let (session, probe) = running_session(VirtualCameraConfig::default()).await;

    session.set_zoom(0.9).unwrap();
    assert_eq!(session.hardware_zoom(), 0.9);
    session.set_zoom(1.1).unwrap();
    assert_eq!(session.hardware_zoom(), 1.1);

    // Telephoto starts at 3x: the published value stays where the user put it
    assert_eq!(session.set_zoom(2.6).unwrap(), 2.6);
    assert_eq!(session.hardware_zoom(), 3.0);

    assert_eq!(
        probe.selected_inputs(),
        vec![
            LensKind::Wide,
            LensKind::UltraWide,
            LensKind::Wide,
            LensKind::Telephoto
        ]
    );
    for zoom in probe.applied_zooms() {
        assert!((0.5..=15.0).contains(&zoom));
    }

    session.stop().await;
}

#[tokio::test]
async fn test_zoom_is_clamped_to_global_bounds() {
    let (session, _probe) = running_session(VirtualCameraConfig::default()).await;

    assert_eq!(session.set_zoom(20.0).unwrap(), 15.0);
    assert_eq!(session.hardware_zoom(), 15.0);
    assert_eq!(active_kind(&session), LensKind::Telephoto);

    assert_eq!(session.set_zoom(0.1).unwrap(), 0.5);
    assert_eq!(active_kind(&session), LensKind::UltraWide);

    // Non-finite requests leave the state untouched
    assert_eq!(session.set_zoom(f64::NAN).unwrap(), 0.5);

    session.stop().await;
}

#[tokio::test]
async fn test_wide_only_device_clamps_to_its_lens() {
    let config = VirtualCameraConfig::default().with_kinds(&[LensKind::Wide]);
    let (session, probe) = running_session(config).await;

    assert_eq!(session.set_zoom(0.6).unwrap(), 0.6);
    assert_eq!(session.hardware_zoom(), 1.0);
    assert_eq!(session.set_zoom(12.0).unwrap(), 12.0);
    assert_eq!(session.hardware_zoom(), 10.0);
    assert_eq!(probe.selected_inputs(), vec![LensKind::Wide]);

    session.stop().await;
}

#[tokio::test]
async fn test_failed_commit_keeps_previous_lens() {
    let (session, probe) = running_session(VirtualCameraConfig::default()).await;

    probe.fail_next_commit();
    assert!(session.set_zoom(0.7).is_err());
    assert_eq!(active_kind(&session), LensKind::Wide);
    assert_eq!(session.state().current_zoom_factor, 1.0);

    // The next request goes through
    session.set_zoom(0.7).unwrap();
    assert_eq!(active_kind(&session), LensKind::UltraWide);

    session.stop().await;
}

#[tokio::test]
async fn test_permission_denied_is_terminal() {
    let config = VirtualCameraConfig::default().with_permission(PermissionStatus::Denied);
    let session = CaptureSession::new(Box::new(VirtualCamera::new(config)), LensPosition::Back);

    let err = session.setup().await.unwrap_err();
    assert_eq!(err, SessionError::PermissionDenied);
    assert!(!err.is_retryable());
    assert_eq!(session.phase(), SessionPhase::Denied);

    assert_eq!(session.start().await, Err(SessionError::PermissionDenied));
    assert_eq!(session.authorize(), Err(SessionError::PermissionDenied));
    assert_eq!(session.set_zoom(2.0), Err(SessionError::NotRunning));
}

#[tokio::test]
async fn test_start_and_stop_are_idempotent() {
    let session = CaptureSession::new(
        Box::new(VirtualCamera::new(VirtualCameraConfig::default())),
        LensPosition::Back,
    );

    // Stopping before anything started is harmless
    session.stop().await;
    assert_eq!(session.phase(), SessionPhase::Uninitialized);
    assert_eq!(session.set_zoom(2.0), Err(SessionError::NotRunning));

    session.setup().await.unwrap();
    session.start().await.unwrap();
    session.start().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Running);

    session.stop().await;
    session.stop().await;
    assert_eq!(session.phase(), SessionPhase::Stopped);

    session.start().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Running);
    session.stop().await;
}

#[tokio::test]
async fn test_interruption_resumes() {
    let (session, _probe) = running_session(VirtualCameraConfig::default()).await;
    let mut phases = session.subscribe_phase();

    session.interrupt().await;
    assert_eq!(*phases.borrow_and_update(), SessionPhase::Interrupted);
    assert!(session.capture(CaptureSettings::default()).await.is_err());

    session.resume_after_interruption().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Running);
    session.stop().await;
}

#[tokio::test]
async fn test_exposure_bias_is_clamped() {
    let (session, _probe) = running_session(VirtualCameraConfig::default()).await;

    assert_eq!(session.set_exposure_bias(3.5).unwrap(), 2.0);
    assert_eq!(session.set_exposure_bias(-0.5).unwrap(), -0.5);
    assert_eq!(session.state().exposure_bias, -0.5);

    session.stop().await;
}

#[tokio::test]
async fn test_capture_negotiates_with_active_lens() {
    let (session, probe) = running_session(VirtualCameraConfig::default()).await;
    let settings = CaptureSettings {
        format: CaptureFormat::StandardAndRaw,
        flash: FlashMode::On,
        night_mode: true,
    };

    let still = session.capture(settings).await.unwrap();
    assert!(still.raw.is_some());
    assert_eq!(still.flash, FlashMode::On);

    // Telephoto has no raw support
    session.set_zoom(4.0).unwrap();
    let still = session.capture(settings).await.unwrap();
    assert_eq!(still.format, CaptureFormat::Standard);
    assert!(still.raw.is_none());

    let request = probe.last_request().unwrap();
    assert_eq!(request.format, CaptureFormat::Standard);
    assert!(request.night_mode);

    session.stop().await;
}

#[tokio::test]
async fn test_front_lens_drops_unsupported_flash() {
    let camera = VirtualCamera::new(VirtualCameraConfig::default());
    let session = CaptureSession::new(Box::new(camera), LensPosition::Front);
    session.setup().await.unwrap();

    session.set_flash_mode(FlashMode::On);
    let still = session
        .capture(session.state().capture_settings())
        .await
        .unwrap();
    assert_eq!(still.flash, FlashMode::Off);

    session.stop().await;
}

#[tokio::test]
async fn test_capture_failure_is_reported() {
    let (session, probe) = running_session(VirtualCameraConfig::default()).await;

    probe.fail_next_capture(BackendError::Busy);
    let err = session.capture(CaptureSettings::default()).await.unwrap_err();
    assert!(matches!(err, SessionError::Capture(_)));
    assert!(err.is_retryable());

    // The session keeps running
    assert!(session.capture(CaptureSettings::default()).await.is_ok());
    session.stop().await;
}

#[tokio::test]
async fn test_configuration_failure_stays_configuring() {
    let (camera, probe) = VirtualCamera::with_probe(VirtualCameraConfig::default());
    let session = CaptureSession::new(Box::new(camera), LensPosition::Back);

    probe.fail_next_commit();
    let err = session.setup().await.unwrap_err();
    assert!(matches!(err, SessionError::Configuration(_)));
    assert!(err.is_retryable());
    assert_eq!(session.phase(), SessionPhase::Configuring);

    // Retrying completes the configuration
    session.start().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Running);
    assert_eq!(active_kind(&session), LensKind::Wide);

    session.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_starts_restart_streaming_once() {
    let (session, probe) = running_session(VirtualCameraConfig::default()).await;
    session.stop().await;
    let starts_before = probe.lock().stream_starts;

    let (a, b, c) = tokio::join!(session.start(), session.start(), session.start());
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(session.phase(), SessionPhase::Running);
    assert_eq!(probe.lock().stream_starts, starts_before + 1);

    session.stop().await;
}
