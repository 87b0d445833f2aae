// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture session controller

use fitcheck::backends::camera::{
    DevicePosition, SessionController, SessionEvent, SessionPhase, SharedPermission,
};
use fitcheck::backends::virtual_camera::{CaptureTiming, FrameSource, VirtualCameraBackend};
use fitcheck::config::CameraSettings;
use fitcheck::errors::SessionError;
use proptest::prelude::*;
use std::time::Duration;
use tokio::sync::broadcast;

fn manual_backend() -> VirtualCameraBackend {
    VirtualCameraBackend::new()
        .with_source(FrameSource::Pattern {
            width: 12,
            height: 16,
        })
        .with_timing(CaptureTiming::Manual)
}

fn spawn(backend: VirtualCameraBackend) -> SessionController {
    SessionController::spawn(backend, true, CameraSettings::default())
        .expect("failed to spawn session thread")
}

async fn running(backend: VirtualCameraBackend) -> SessionController {
    let session = spawn(backend);
    session.configure().await.unwrap();
    session.start().await.unwrap();
    session
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

#[tokio::test]
async fn test_permission_denied_touches_no_hardware() {
    let backend = manual_backend();
    let probe = backend.probe();
    let session = SessionController::spawn(backend, false, CameraSettings::default()).unwrap();

    let err = session.configure().await.unwrap_err();
    assert_eq!(err, SessionError::PermissionDenied);
    assert_eq!(probe.hardware_calls(), 0);
    assert_eq!(session.snapshot().phase, SessionPhase::Uninitialized);
}

#[tokio::test]
async fn test_permission_granted_later() {
    let permission = SharedPermission::new(false);
    let session =
        SessionController::spawn(manual_backend(), permission.clone(), CameraSettings::default())
            .unwrap();

    assert!(session.configure().await.is_err());
    permission.set(true);
    let snapshot = session.configure().await.unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Configured);
}

#[tokio::test]
async fn test_configure_attaches_back_camera() {
    let session = spawn(manual_backend());
    let snapshot = session.configure().await.unwrap();

    assert_eq!(snapshot.position, DevicePosition::Back);
    assert_eq!(
        snapshot.input.as_ref().map(|device| device.position),
        Some(DevicePosition::Back)
    );
    assert!(snapshot.output_attached);
    assert!(!snapshot.is_running());
}

#[tokio::test]
async fn test_configure_without_device_is_unavailable() {
    let session = spawn(manual_backend().without_position(DevicePosition::Back));

    let err = session.configure().await.unwrap_err();
    assert!(matches!(err, SessionError::DeviceUnavailable(_)));
    assert_eq!(session.snapshot().phase, SessionPhase::Uninitialized);
}

#[tokio::test]
async fn test_rejected_output_leaves_no_input() {
    let session = spawn(manual_backend().rejecting_output());

    let err = session.configure().await.unwrap_err();
    assert!(matches!(err, SessionError::ConfigurationRejected(_)));
    let snapshot = session.snapshot();
    assert!(snapshot.input.is_none());
    assert!(!snapshot.output_attached);
}

#[tokio::test]
async fn test_capture_requires_running_session() {
    let backend = manual_backend();
    let probe = backend.probe();
    let session = spawn(backend);

    assert_eq!(session.capture().await.unwrap_err(), SessionError::SessionNotRunning);
    session.configure().await.unwrap();
    assert_eq!(session.capture().await.unwrap_err(), SessionError::SessionNotRunning);
    assert_eq!(probe.capture_calls(), 0);
}

#[tokio::test]
async fn test_capture_delivers_image() {
    let backend = manual_backend();
    let probe = backend.probe();
    let session = running(backend).await;

    let request = session.capture().await.unwrap();
    assert_eq!(probe.pending_captures(), 1);
    probe.release_pending();

    let image = request.completion().await.unwrap();
    assert_eq!((image.width, image.height), (12, 16));
    assert!(!session.snapshot().capture_pending);
}

#[tokio::test]
async fn test_second_capture_rejected_while_outstanding() {
    let backend = manual_backend();
    let probe = backend.probe();
    let session = running(backend).await;

    let first = session.capture().await.unwrap();
    let first_id = first.id();
    assert_eq!(session.capture().await.unwrap_err(), SessionError::CaptureInProgress);
    assert_eq!(probe.capture_calls(), 1);

    probe.release_pending();
    first.completion().await.unwrap();

    // Slot is free again
    let second = session.capture().await.unwrap();
    assert_ne!(second.id(), first_id);
    probe.release_pending();
    second.completion().await.unwrap();
    assert_eq!(probe.capture_calls(), 2);
}

#[tokio::test]
async fn test_concurrent_captures_admit_one() {
    let backend = manual_backend();
    let probe = backend.probe();
    let session = running(backend).await;

    let (a, b) = tokio::join!(session.capture(), session.capture());
    let outcomes = [a.is_ok(), b.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let rejected = if let Err(err) = a { err } else { b.unwrap_err() };
    assert_eq!(rejected, SessionError::CaptureInProgress);
    assert_eq!(probe.capture_calls(), 1);
}

#[tokio::test]
async fn test_hardware_failure_reaches_request() {
    let backend = manual_backend();
    let probe = backend.probe();
    let session = running(backend).await;
    let mut events = session.subscribe();

    probe.fail_next_capture();
    let request = session.capture().await.unwrap();
    let request_id = request.id();
    let err = request.completion().await.unwrap_err();
    assert!(matches!(err, SessionError::CaptureFailed(_)));
    assert!(!session.snapshot().capture_pending);

    let failed = drain(&mut events).into_iter().any(|event| {
        matches!(event, SessionEvent::CaptureFailed { request_id: id, .. } if id == request_id)
    });
    assert!(failed, "CaptureFailed event expected");
}

#[tokio::test]
async fn test_capture_event_order() {
    let backend = manual_backend();
    let probe = backend.probe();
    let session = running(backend).await;
    let mut events = session.subscribe();

    let request = session.capture().await.unwrap();
    let request_id = request.id();
    probe.release_pending();
    request.completion().await.unwrap();

    let events = drain(&mut events);
    assert!(matches!(&events[0], SessionEvent::StateChanged(s) if s.capture_pending));
    assert!(matches!(events[1], SessionEvent::CaptureIssued { request_id: id } if id == request_id));
    assert!(matches!(&events[2], SessionEvent::StateChanged(s) if !s.capture_pending));
    assert!(matches!(
        events[3],
        SessionEvent::CaptureCompleted { request_id: id, width: 12, height: 16 } if id == request_id
    ));
    assert_eq!(events.len(), 4);
}

#[tokio::test]
async fn test_switch_while_running_is_atomic() {
    let backend = manual_backend();
    let probe = backend.probe();
    let session = running(backend).await;
    let mut events = session.subscribe();

    let snapshot = session.switch_device_position().await.unwrap();
    assert_eq!(snapshot.position, DevicePosition::Front);
    assert!(snapshot.is_running());
    assert_eq!(
        snapshot.input.as_ref().map(|device| device.position),
        Some(DevicePosition::Front)
    );
    assert_eq!(probe.start_calls(), 2);

    // Observers only see the committed state
    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        SessionEvent::StateChanged(s) if s.position == DevicePosition::Front && s.is_running()
    ));
}

#[tokio::test]
async fn test_switch_rejected_during_capture() {
    let backend = manual_backend();
    let probe = backend.probe();
    let session = running(backend).await;

    let request = session.capture().await.unwrap();
    let err = session.switch_device_position().await.unwrap_err();
    assert_eq!(err, SessionError::CaptureInProgress);
    assert_eq!(session.snapshot().position, DevicePosition::Back);

    probe.release_pending();
    request.completion().await.unwrap();
    assert!(session.switch_device_position().await.is_ok());
}

#[tokio::test]
async fn test_switch_to_missing_camera_leaves_session_stopped() {
    let session = running(manual_backend().without_position(DevicePosition::Front)).await;

    let err = session.switch_device_position().await.unwrap_err();
    assert!(matches!(err, SessionError::DeviceUnavailable(_)));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Stopped);
    assert!(snapshot.input.is_none());
    assert_eq!(snapshot.position, DevicePosition::Back);

    // Recoverable by configuring again
    session.configure().await.unwrap();
    let snapshot = session.start().await.unwrap();
    assert!(snapshot.is_running());
    assert_eq!(snapshot.position, DevicePosition::Back);
}

#[tokio::test]
async fn test_switch_without_input_rejected() {
    let session = spawn(manual_backend());
    let err = session.switch_device_position().await.unwrap_err();
    assert!(matches!(err, SessionError::ConfigurationRejected(_)));
}

#[tokio::test]
async fn test_stop_fails_outstanding_capture() {
    let session = running(manual_backend()).await;

    let request = session.capture().await.unwrap();
    let snapshot = session.stop().await.unwrap();
    assert_eq!(snapshot.phase, SessionPhase::Stopped);

    let err = request.completion().await.unwrap_err();
    assert_eq!(
        err,
        SessionError::CaptureFailed("session stopped during capture".to_string())
    );
    assert!(!session.snapshot().capture_pending);
}

#[tokio::test]
async fn test_delayed_capture_completes_off_thread() {
    let backend = VirtualCameraBackend::new()
        .with_source(FrameSource::Pattern {
            width: 30,
            height: 40,
        })
        .with_timing(CaptureTiming::Delayed(Duration::from_millis(20)));
    let session = running(backend).await;

    let request = session.capture().await.unwrap();
    let image = tokio::time::timeout(Duration::from_secs(5), request.completion())
        .await
        .expect("capture timed out")
        .unwrap();
    assert_eq!((image.width, image.height), (30, 40));
}

#[tokio::test]
async fn test_watch_tracks_latest_snapshot() {
    let session = spawn(manual_backend());
    let mut watch = session.watch();

    session.configure().await.unwrap();
    session.start().await.unwrap();

    watch.changed().await.unwrap();
    assert!(watch.borrow_and_update().is_running());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn start_stop_sequences_are_idempotent(ops in prop::collection::vec(any::<bool>(), 1..12)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let backend = manual_backend();
            let probe = backend.probe();
            let session = spawn(backend);
            session.configure().await.unwrap();

            let mut is_running = false;
            let mut expected_starts = 0;
            for start in ops {
                let snapshot = if start {
                    session.start().await.unwrap()
                } else {
                    session.stop().await.unwrap()
                };
                if start && !is_running {
                    expected_starts += 1;
                }
                is_running = start;
                assert_eq!(snapshot.is_running(), is_running);
            }
            assert_eq!(probe.start_calls(), expected_starts);
        });
    }
}
