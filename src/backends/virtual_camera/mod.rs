// SPDX-License-Identifier: GPL-3.0-only

//! Software camera backend
//!
//! Implements [`CameraBackend`] without hardware. Stills are produced from a
//! generated pattern or an image file and delivered on a separate thread
//! after a short simulated shutter delay, the same way a real device reports
//! captures off the calling thread.
//!
//! ```text
//! capture_still()
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ virtual-shutter  │  ← sleeps, then completes
//! │     thread       │
//! └──────────────────┘
//!        │
//!        ▼
//!  CaptureCompletion
//! ```
//!
//! Tests can park completions with [`CaptureTiming::Manual`] and drive them
//! through a [`VirtualCameraProbe`].

mod file_source;

pub use file_source::{load_image_as_frame, load_still, test_pattern};

use crate::backends::camera::types::*;
use crate::backends::camera::CameraBackend;
use crate::constants::timing;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

const STOPPED_DURING_CAPTURE: &str = "session stopped during capture";

/// Where captured stills come from
#[derive(Debug, Clone)]
pub enum FrameSource {
    /// Generated test pattern of the given size
    Pattern { width: u32, height: u32 },
    /// The same image for every capture
    Image(Arc<CapturedImage>),
}

impl Default for FrameSource {
    fn default() -> Self {
        FrameSource::Pattern {
            width: 1200,
            height: 1600,
        }
    }
}

/// When a capture completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTiming {
    /// On the calling thread, before `capture_still` returns
    Immediate,
    /// On a shutter thread after the delay
    Delayed(Duration),
    /// Parked until released through the probe
    Manual,
}

impl Default for CaptureTiming {
    fn default() -> Self {
        CaptureTiming::Delayed(Duration::from_millis(timing::VIRTUAL_CAPTURE_LATENCY_MS))
    }
}

struct ParkedCapture {
    completion: CaptureCompletion,
    frame: CapturedImage,
}

#[derive(Default)]
struct ProbeShared {
    capture_calls: AtomicUsize,
    start_calls: AtomicUsize,
    hardware_calls: AtomicUsize,
    fail_next: AtomicBool,
    /// Bumped on every stop so delayed shutters can tell they were cut off
    generation: AtomicU64,
    parked: Mutex<Vec<ParkedCapture>>,
}

impl ProbeShared {
    fn parked(&self) -> MutexGuard<'_, Vec<ParkedCapture>> {
        self.parked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        self.hardware_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Observation and control handle for a [`VirtualCameraBackend`]
///
/// Stays usable after the backend has moved into a session controller.
#[derive(Clone)]
pub struct VirtualCameraProbe {
    shared: Arc<ProbeShared>,
}

impl VirtualCameraProbe {
    /// Number of `capture_still` calls
    pub fn capture_calls(&self) -> usize {
        self.shared.capture_calls.load(Ordering::SeqCst)
    }

    /// Number of `start_running` calls
    pub fn start_calls(&self) -> usize {
        self.shared.start_calls.load(Ordering::SeqCst)
    }

    /// Number of calls that touch the hardware (everything except queries)
    pub fn hardware_calls(&self) -> usize {
        self.shared.hardware_calls.load(Ordering::SeqCst)
    }

    /// Captures parked by [`CaptureTiming::Manual`]
    pub fn pending_captures(&self) -> usize {
        self.shared.parked().len()
    }

    /// Deliver every parked capture successfully
    pub fn release_pending(&self) -> usize {
        let parked = std::mem::take(&mut *self.shared.parked());
        let count = parked.len();
        for capture in parked {
            capture.completion.complete(Ok(capture.frame.recaptured()));
        }
        count
    }

    /// Fail every parked capture with `message`
    pub fn fail_pending(&self, message: &str) -> usize {
        let parked = std::mem::take(&mut *self.shared.parked());
        let count = parked.len();
        for capture in parked {
            capture
                .completion
                .complete(Err(BackendError::CaptureFailed(message.to_string())));
        }
        count
    }

    /// Make the next capture report a hardware failure
    pub fn fail_next_capture(&self) {
        self.shared.fail_next.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for VirtualCameraProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualCameraProbe")
            .field("capture_calls", &self.capture_calls())
            .field("hardware_calls", &self.hardware_calls())
            .field("pending_captures", &self.pending_captures())
            .finish()
    }
}

/// Software camera with a front and a back device
pub struct VirtualCameraBackend {
    devices: Vec<CameraDevice>,
    source: FrameSource,
    timing: CaptureTiming,
    reject_output: bool,
    next_handle: u64,
    attached: Option<(u64, DevicePosition)>,
    output_attached: bool,
    running: bool,
    shared: Arc<ProbeShared>,
}

impl VirtualCameraBackend {
    pub fn new() -> Self {
        Self {
            devices: vec![
                CameraDevice {
                    id: "virtual:back".to_string(),
                    name: "Virtual Back Camera".to_string(),
                    position: DevicePosition::Back,
                },
                CameraDevice {
                    id: "virtual:front".to_string(),
                    name: "Virtual Front Camera".to_string(),
                    position: DevicePosition::Front,
                },
            ],
            source: FrameSource::default(),
            timing: CaptureTiming::default(),
            reject_output: false,
            next_handle: 1,
            attached: None,
            output_attached: false,
            running: false,
            shared: Arc::new(ProbeShared::default()),
        }
    }

    pub fn with_source(mut self, source: FrameSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_timing(mut self, timing: CaptureTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Remove the device at `position`, as on hardware with a single camera
    pub fn without_position(mut self, position: DevicePosition) -> Self {
        self.devices.retain(|device| device.position != position);
        self
    }

    /// Make `attach_output` fail
    pub fn rejecting_output(mut self) -> Self {
        self.reject_output = true;
        self
    }

    pub fn probe(&self) -> VirtualCameraProbe {
        VirtualCameraProbe {
            shared: Arc::clone(&self.shared),
        }
    }

    fn frame_for(&self, position: DevicePosition) -> CapturedImage {
        match &self.source {
            FrameSource::Pattern { width, height } => test_pattern(*width, *height, position),
            FrameSource::Image(image) => image.recaptured(),
        }
    }

    /// Fail every parked capture; used when the session stops
    fn abort_parked(&self) {
        let parked = std::mem::take(&mut *self.shared.parked());
        if !parked.is_empty() {
            debug!(count = parked.len(), "Failing parked captures on stop");
        }
        for capture in parked {
            capture
                .completion
                .complete(Err(BackendError::CaptureFailed(STOPPED_DURING_CAPTURE.to_string())));
        }
    }
}

impl Default for VirtualCameraBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for VirtualCameraBackend {
    fn name(&self) -> &'static str {
        "virtual"
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.devices.clone()
    }

    fn open_input(&mut self, position: DevicePosition) -> BackendResult<DeviceHandle> {
        self.shared.touch();
        let device = self
            .devices
            .iter()
            .find(|device| device.position == position)
            .cloned()
            .ok_or_else(|| BackendError::DeviceNotFound(format!("no {} camera", position)))?;

        let handle_id = self.next_handle;
        self.next_handle += 1;
        debug!(handle_id, device = %device.name, "Opened virtual camera");
        Ok(DeviceHandle::new(handle_id, device))
    }

    fn attach_input(&mut self, input: &DeviceHandle) -> BackendResult<()> {
        self.shared.touch();
        if let Some((handle_id, _)) = self.attached {
            return Err(BackendError::Rejected(format!(
                "input {} is already attached",
                handle_id
            )));
        }
        self.attached = Some((input.handle_id(), input.position()));
        Ok(())
    }

    fn detach_input(&mut self, input: &DeviceHandle) {
        self.shared.touch();
        match self.attached {
            Some((handle_id, _)) if handle_id == input.handle_id() => self.attached = None,
            _ => warn!(handle_id = input.handle_id(), "Detaching an input that is not attached"),
        }
    }

    fn attach_output(&mut self) -> BackendResult<OutputSink> {
        self.shared.touch();
        if self.reject_output {
            return Err(BackendError::Rejected(
                "photo output cannot be added".to_string(),
            ));
        }
        self.output_attached = true;
        Ok(OutputSink::new(1))
    }

    fn start_running(&mut self) -> BackendResult<()> {
        self.shared.touch();
        self.shared.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.attached.is_none() || !self.output_attached {
            return Err(BackendError::NotAvailable(
                "no input or output attached".to_string(),
            ));
        }
        self.running = true;
        info!("Virtual camera running");
        Ok(())
    }

    fn stop_running(&mut self) {
        self.shared.touch();
        if !self.running {
            return;
        }
        self.running = false;
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_parked();
        info!("Virtual camera stopped");
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn capture_still(&mut self, settings: CaptureSettings, completion: CaptureCompletion) {
        self.shared.touch();
        self.shared.capture_calls.fetch_add(1, Ordering::SeqCst);

        let Some((_, position)) = self.attached.filter(|_| self.running) else {
            completion.complete(Err(BackendError::CaptureFailed(
                "camera is not running".to_string(),
            )));
            return;
        };

        if self.shared.fail_next.swap(false, Ordering::SeqCst) {
            completion.complete(Err(BackendError::CaptureFailed(
                "simulated sensor failure".to_string(),
            )));
            return;
        }

        debug!(flash = ?settings.flash, %position, "Virtual shutter triggered");
        let frame = self.frame_for(position);

        match self.timing {
            CaptureTiming::Immediate => completion.complete(Ok(frame)),
            CaptureTiming::Manual => {
                self.shared.parked().push(ParkedCapture { completion, frame });
            }
            CaptureTiming::Delayed(delay) => {
                let shared = Arc::clone(&self.shared);
                let generation = shared.generation.load(Ordering::SeqCst);
                // A failed spawn drops the completion, which reports the failure
                let spawned = std::thread::Builder::new()
                    .name("virtual-shutter".to_string())
                    .spawn(move || {
                        std::thread::sleep(delay);
                        if shared.generation.load(Ordering::SeqCst) != generation {
                            completion.complete(Err(BackendError::CaptureFailed(
                                STOPPED_DURING_CAPTURE.to_string(),
                            )));
                        } else {
                            completion.complete(Ok(frame));
                        }
                    });
                if let Err(e) = spawned {
                    warn!(error = %e, "Failed to spawn virtual shutter thread");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn running_backend(timing: CaptureTiming) -> VirtualCameraBackend {
        let mut backend = VirtualCameraBackend::new()
            .with_source(FrameSource::Pattern {
                width: 8,
                height: 8,
            })
            .with_timing(timing);
        let input = backend.open_input(DevicePosition::Back).unwrap();
        backend.attach_input(&input).unwrap();
        backend.attach_output().unwrap();
        backend.start_running().unwrap();
        backend
    }

    fn tracked_completion() -> (CaptureCompletion, mpsc::Receiver<BackendResult<CapturedImage>>) {
        let (tx, rx) = mpsc::channel();
        let completion = CaptureCompletion::new(move |result| {
            let _ = tx.send(result);
        });
        (completion, rx)
    }

    #[test]
    fn test_missing_position_is_device_not_found() {
        let mut backend = VirtualCameraBackend::new().without_position(DevicePosition::Front);
        assert_eq!(backend.enumerate_cameras().len(), 1);
        assert!(matches!(
            backend.open_input(DevicePosition::Front),
            Err(BackendError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_start_without_input_fails() {
        let mut backend = VirtualCameraBackend::new();
        assert!(backend.start_running().is_err());
        assert!(!backend.is_running());
    }

    #[test]
    fn test_immediate_capture_completes_inline() {
        let mut backend = running_backend(CaptureTiming::Immediate);
        let (completion, rx) = tracked_completion();
        backend.capture_still(CaptureSettings::default(), completion);
        let frame = rx.try_recv().unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (8, 8));
    }

    #[test]
    fn test_delayed_capture_completes_on_shutter_thread() {
        let mut backend = running_backend(CaptureTiming::Delayed(Duration::from_millis(5)));
        let (completion, rx) = tracked_completion();
        backend.capture_still(CaptureSettings::default(), completion);
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn test_stop_fails_parked_capture() {
        let mut backend = running_backend(CaptureTiming::Manual);
        let probe = backend.probe();
        let (completion, rx) = tracked_completion();
        backend.capture_still(CaptureSettings::default(), completion);
        assert_eq!(probe.pending_captures(), 1);

        backend.stop_running();
        let err = rx.try_recv().unwrap().unwrap_err();
        assert_eq!(err, BackendError::CaptureFailed(STOPPED_DURING_CAPTURE.to_string()));
        assert_eq!(probe.pending_captures(), 0);
    }

    #[test]
    fn test_fail_next_capture() {
        let mut backend = running_backend(CaptureTiming::Immediate);
        backend.probe().fail_next_capture();
        let (completion, rx) = tracked_completion();
        backend.capture_still(CaptureSettings::default(), completion);
        assert!(rx.try_recv().unwrap().is_err());

        let (completion, rx) = tracked_completion();
        backend.capture_still(CaptureSettings::default(), completion);
        assert!(rx.try_recv().unwrap().is_ok());
    }
}
