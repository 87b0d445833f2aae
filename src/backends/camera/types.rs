// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Which side of the device a camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosition {
    /// User-facing camera
    Front,
    /// Rear camera (preferred default)
    #[default]
    Back,
}

impl DevicePosition {
    /// The other position
    pub fn opposite(self) -> Self {
        match self {
            DevicePosition::Front => DevicePosition::Back,
            DevicePosition::Back => DevicePosition::Front,
        }
    }
}

impl std::fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePosition::Front => write!(f, "front"),
            DevicePosition::Back => write!(f, "back"),
        }
    }
}

/// Flash behaviour requested for a still capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    /// Never fire
    Off,
    /// Always fire
    On,
    /// Let the device decide based on scene brightness
    #[default]
    Auto,
}

/// Per-capture settings handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureSettings {
    pub flash: FlashMode,
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Backend-specific identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Which way the camera faces
    pub position: DevicePosition,
}

/// An opened video input
///
/// Only the session controller holds one of these; it is deliberately not
/// `Clone`. Observers see the [`CameraDevice`] it was opened from.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceHandle {
    handle_id: u64,
    device: CameraDevice,
}

impl DeviceHandle {
    /// Called by backends when a device has been opened
    pub fn new(handle_id: u64, device: CameraDevice) -> Self {
        Self { handle_id, device }
    }

    pub fn handle_id(&self) -> u64 {
        self.handle_id
    }

    pub fn device(&self) -> &CameraDevice {
        &self.device
    }

    pub fn position(&self) -> DevicePosition {
        self.device.position
    }
}

/// Still-image output attached to the session
#[derive(Debug, PartialEq, Eq)]
pub struct OutputSink {
    sink_id: u64,
}

impl OutputSink {
    pub fn new(sink_id: u64) -> Self {
        Self { sink_id }
    }

    pub fn sink_id(&self) -> u64 {
        self.sink_id
    }
}

/// Pixel layout of a captured image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    /// This is the canonical format produced by backends
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::RGBA => 4,
            PixelFormat::RGB24 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// A still image delivered by the hardware
///
/// Pixel data is reference counted so the gallery and the encoder can share
/// it without copying.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Timestamp when the frame was captured
    pub captured_at: Instant,
}

impl CapturedImage {
    /// Wrap a tightly packed RGBA buffer
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: PixelFormat::RGBA,
            stride: width * PixelFormat::RGBA.bytes_per_pixel(),
            captured_at: Instant::now(),
        }
    }

    /// Size of the pixel buffer in bytes
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// True when there are no pixels to encode
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Pixel rows without stride padding
    ///
    /// Returns `None` if the buffer is shorter than the declared geometry.
    pub fn packed_pixels(&self) -> Option<Vec<u8>> {
        if self.is_empty() {
            return None;
        }
        let row_len = (self.width * self.format.bytes_per_pixel()) as usize;
        let stride = self.stride as usize;
        if stride < row_len {
            return None;
        }
        let needed = stride * (self.height as usize - 1) + row_len;
        if self.data.len() < needed {
            return None;
        }
        if stride == row_len {
            return Some(self.data[..row_len * self.height as usize].to_vec());
        }
        let mut packed = Vec::with_capacity(row_len * self.height as usize);
        for row in self.data.chunks(stride).take(self.height as usize) {
            packed.extend_from_slice(&row[..row_len]);
        }
        Some(packed)
    }

    /// Same pixels with a fresh capture timestamp
    pub fn recaptured(&self) -> Self {
        Self {
            captured_at: Instant::now(),
            ..self.clone()
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Session refused an input or output
    Rejected(String),
    /// Hardware capture failed
    CaptureFailed(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::Rejected(msg) => write!(f, "Rejected by session: {}", msg),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

type CompletionFn = Box<dyn FnOnce(BackendResult<CapturedImage>) + Send>;

/// One-shot completion for a still capture
///
/// Backends call [`complete`](Self::complete) exactly once, from whatever
/// thread the hardware reports on. If a backend drops the completion without
/// calling it, the capture is reported as failed so the waiting request
/// always receives an outcome.
pub struct CaptureCompletion {
    callback: Option<CompletionFn>,
}

impl CaptureCompletion {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(BackendResult<CapturedImage>) + Send + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// Deliver the capture outcome
    pub fn complete(mut self, result: BackendResult<CapturedImage>) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl Drop for CaptureCompletion {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            warn!("Capture completion dropped without a result");
            callback(Err(BackendError::CaptureFailed(
                "backend dropped the capture without completing it".to_string(),
            )));
        }
    }
}

impl std::fmt::Debug for CaptureCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureCompletion")
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_position_opposite() {
        assert_eq!(DevicePosition::Back.opposite(), DevicePosition::Front);
        assert_eq!(DevicePosition::Front.opposite(), DevicePosition::Back);
    }

    #[test]
    fn test_packed_pixels_strips_padding() {
        let image = CapturedImage {
            width: 2,
            height: 2,
            // 2 RGB pixels per row plus 2 padding bytes
            data: Arc::from(vec![1, 1, 1, 2, 2, 2, 0, 0, 3, 3, 3, 4, 4, 4, 0, 0]),
            format: PixelFormat::RGB24,
            stride: 8,
            captured_at: Instant::now(),
        };

        let packed = image.packed_pixels().unwrap();
        assert_eq!(packed, vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4]);
    }

    #[test]
    fn test_packed_pixels_rejects_short_buffer() {
        let mut image = CapturedImage::from_rgba(4, 4, vec![0u8; 4 * 4 * 4]);
        image.data = Arc::from(vec![0u8; 10]);
        assert!(image.packed_pixels().is_none());
    }

    #[test]
    fn test_dropped_completion_reports_failure() {
        let outcome = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&outcome);
        let completion = CaptureCompletion::new(move |result| {
            *slot.lock().unwrap() = Some(result.is_err());
        });

        drop(completion);
        assert_eq!(*outcome.lock().unwrap(), Some(true));
    }
}
