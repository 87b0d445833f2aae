// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │  Capture pipeline   │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  SessionController  │  ← Serializes every hardware mutation
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Common interface
//! └──────────┬──────────┘
//!            │
//!            ▼
//!       ┌─────────┐
//!       │ Virtual │  ← Software implementation
//!       └─────────┘
//! ```

pub mod session;
pub mod types;

pub use session::{CaptureRequest, SessionController, SessionEvent, SessionPhase, SessionSnapshot};
pub use types::*;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Hardware interface driven by the session controller
///
/// Every method is called from the controller's serialization thread, one
/// at a time, so implementations need no internal locking for their own
/// state. Capture completions are the exception: they may fire from any
/// thread the hardware reports on.
pub trait CameraBackend: Send {
    /// Backend identifier for logging
    fn name(&self) -> &'static str;

    // ===== Enumeration =====

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    // ===== Configuration =====

    /// Open the camera facing `position`
    ///
    /// # Returns
    /// * `Ok(DeviceHandle)` - Device opened
    /// * `Err(BackendError::DeviceNotFound)` - No camera at that position
    fn open_input(&mut self, position: DevicePosition) -> BackendResult<DeviceHandle>;

    /// Attach an opened input to the session
    fn attach_input(&mut self, input: &DeviceHandle) -> BackendResult<()>;

    /// Detach a previously attached input
    fn detach_input(&mut self, input: &DeviceHandle);

    /// Attach the still-image output
    fn attach_output(&mut self) -> BackendResult<OutputSink>;

    // ===== Lifecycle =====

    /// Start streaming from the attached input
    fn start_running(&mut self) -> BackendResult<()>;

    /// Stop streaming; a no-op if not running
    fn stop_running(&mut self);

    /// Check if the hardware pipeline is running
    fn is_running(&self) -> bool;

    // ===== Capture =====

    /// Trigger a single still capture
    ///
    /// Must return without waiting for the exposure. The outcome, success or
    /// failure, is delivered through `completion`.
    fn capture_still(&mut self, settings: CaptureSettings, completion: CaptureCompletion);
}

/// Camera permission precondition
///
/// The platform permission prompt is owned by the embedding application;
/// the controller only asks whether access has been granted.
pub trait PermissionCheck: Send + Sync {
    fn is_granted(&self) -> bool;
}

impl PermissionCheck for bool {
    fn is_granted(&self) -> bool {
        *self
    }
}

/// Permission flag shared with whatever performs the platform prompt
#[derive(Debug, Clone, Default)]
pub struct SharedPermission(Arc<AtomicBool>);

impl SharedPermission {
    pub fn new(granted: bool) -> Self {
        Self(Arc::new(AtomicBool::new(granted)))
    }

    pub fn set(&self, granted: bool) {
        self.0.store(granted, Ordering::SeqCst);
    }
}

impl PermissionCheck for SharedPermission {
    fn is_granted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
