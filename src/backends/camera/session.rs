// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! The controller owns the camera backend and runs every hardware mutation
//! (configure, start, stop, position switch, capture issue) on one dedicated
//! thread, one command at a time. Callers talk to it through the cloneable
//! [`SessionController`] handle; each command is answered on a one-shot
//! reply channel.
//!
//! ```text
//!  callers ──commands──► session thread ──► CameraBackend
//!     ▲                        │
//!     │ snapshots / events     │ capture_still(completion)
//!     └────────────────────────┤
//!                              ▼
//!                     hardware thread ──► CaptureRequest completion
//! ```
//!
//! State is observed through snapshots (a `watch` of the latest value) and a
//! broadcast of [`SessionEvent`]s. Snapshots are only published once a
//! command has finished, so multi-step transactions such as a position switch
//! are atomic to observers.
//!
//! Capture completions fire on whatever thread the backend reports on. They
//! clear the outstanding-request slot and deliver the image without going
//! back through the command queue.

use super::types::*;
use super::{CameraBackend, PermissionCheck};
use crate::config::CameraSettings;
use crate::constants::timing::SESSION_EVENT_CAPACITY;
use crate::errors::{SessionError, SessionResult};
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle phase of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing attached yet
    Uninitialized,
    /// Input and output attached, never started (or re-configured)
    Configured,
    /// Hardware pipeline is live
    Running,
    /// Stopped after running, or left stopped by a failed switch
    Stopped,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Position used by the next `configure()` and reported by the input
    pub position: DevicePosition,
    /// Device backing the attached input, if any
    pub input: Option<CameraDevice>,
    pub output_attached: bool,
    /// A capture request is outstanding
    pub capture_pending: bool,
}

impl SessionSnapshot {
    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }
}

/// Discrete session notifications
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A command or completion changed the session state
    StateChanged(SessionSnapshot),
    /// A still capture was handed to the hardware
    CaptureIssued { request_id: Uuid },
    /// The hardware delivered an image
    CaptureCompleted {
        request_id: Uuid,
        width: u32,
        height: u32,
    },
    /// The hardware reported a failed capture
    CaptureFailed {
        request_id: Uuid,
        error: SessionError,
    },
}

/// One outstanding "take photo" call
///
/// The image (or the failure) arrives exactly once through
/// [`completion`](Self::completion).
#[derive(Debug)]
pub struct CaptureRequest {
    id: Uuid,
    issued_at: DateTime<Local>,
    completion: oneshot::Receiver<SessionResult<CapturedImage>>,
}

impl CaptureRequest {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn issued_at(&self) -> DateTime<Local> {
        self.issued_at
    }

    /// Wait for the hardware to deliver the capture outcome
    pub async fn completion(self) -> SessionResult<CapturedImage> {
        match self.completion.await {
            Ok(result) => result,
            Err(_) => Err(SessionError::CaptureFailed(
                "capture completion channel closed".to_string(),
            )),
        }
    }
}

type Reply<T> = oneshot::Sender<SessionResult<T>>;

enum Command {
    Configure(Reply<SessionSnapshot>),
    Start(Reply<SessionSnapshot>),
    Stop(Reply<SessionSnapshot>),
    SwitchPosition(Reply<SessionSnapshot>),
    Capture(Reply<CaptureRequest>),
}

/// State shared between the session thread and capture completions
struct Published {
    /// Id of the outstanding capture request
    in_flight: Mutex<Option<Uuid>>,
    snapshot: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl Published {
    fn lock_in_flight(&self) -> MutexGuard<'_, Option<Uuid>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Handle to the capture session
///
/// Cheap to clone. When the last handle is dropped the session thread stops
/// the hardware and exits.
#[derive(Clone)]
pub struct SessionController {
    commands: mpsc::UnboundedSender<Command>,
    published: Arc<Published>,
}

impl SessionController {
    /// Take ownership of `backend` and start the session thread
    ///
    /// # Arguments
    /// * `backend` - Hardware the session drives
    /// * `permission` - Checked before every `configure()`
    /// * `settings` - Preferred position and capture flash mode
    pub fn spawn<B, P>(backend: B, permission: P, settings: CameraSettings) -> std::io::Result<Self>
    where
        B: CameraBackend + 'static,
        P: PermissionCheck + 'static,
    {
        let initial = SessionSnapshot {
            phase: SessionPhase::Uninitialized,
            position: settings.preferred_position,
            input: None,
            output_attached: false,
            capture_pending: false,
        };
        let (snapshot, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        let published = Arc::new(Published {
            in_flight: Mutex::new(None),
            snapshot,
            events,
        });

        let backend_name = backend.name();
        let worker = SessionWorker {
            backend: Box::new(backend),
            permission: Box::new(permission),
            phase: SessionPhase::Uninitialized,
            position: settings.preferred_position,
            input: None,
            output: None,
            capture_settings: CaptureSettings {
                flash: settings.flash,
            },
            published: Arc::clone(&published),
        };

        let (commands, receiver) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("session-queue".to_string())
            .spawn(move || worker.run(receiver))?;

        info!(
            backend = backend_name,
            position = %settings.preferred_position,
            "Capture session controller started"
        );

        Ok(Self {
            commands,
            published,
        })
    }

    /// Attach the input for the current position and the photo output
    pub async fn configure(&self) -> SessionResult<SessionSnapshot> {
        self.request(Command::Configure).await
    }

    /// Start the hardware pipeline (no-op if running)
    pub async fn start(&self) -> SessionResult<SessionSnapshot> {
        self.request(Command::Start).await
    }

    /// Stop the hardware pipeline (no-op if stopped)
    pub async fn stop(&self) -> SessionResult<SessionSnapshot> {
        self.request(Command::Stop).await
    }

    /// Swap to the camera facing the other way
    ///
    /// Runs stop → detach → attach → restart-if-was-running as one
    /// transaction. If the other camera cannot be opened the session is left
    /// stopped with no input and must be re-configured.
    pub async fn switch_device_position(&self) -> SessionResult<SessionSnapshot> {
        self.request(Command::SwitchPosition).await
    }

    /// Issue a single still capture
    ///
    /// Returns as soon as the hardware has the request; await
    /// [`CaptureRequest::completion`] for the image.
    pub async fn capture(&self) -> SessionResult<CaptureRequest> {
        self.request(Command::Capture).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.published.snapshot.borrow().clone()
    }

    /// Receiver that always holds the latest snapshot
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.published.snapshot.subscribe()
    }

    /// Subscribe to session events from this point on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.published.events.subscribe()
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> SessionResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| Self::shut_down())?;
        response.await.map_err(|_| Self::shut_down())?
    }

    fn shut_down() -> SessionError {
        SessionError::DeviceUnavailable("capture session thread has exited".to_string())
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("SessionController")
            .field("phase", &snapshot.phase)
            .field("position", &snapshot.position)
            .field("capture_pending", &snapshot.capture_pending)
            .finish()
    }
}

/// Session state owned by the session thread
struct SessionWorker {
    backend: Box<dyn CameraBackend>,
    permission: Box<dyn PermissionCheck>,
    phase: SessionPhase,
    position: DevicePosition,
    input: Option<DeviceHandle>,
    output: Option<OutputSink>,
    capture_settings: CaptureSettings,
    published: Arc<Published>,
}

impl SessionWorker {
    fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        debug!("Session thread started");

        while let Some(command) = commands.blocking_recv() {
            match command {
                Command::Configure(reply) => {
                    let result = self.configure();
                    respond("configure", reply, result);
                }
                Command::Start(reply) => {
                    let result = self.start();
                    respond("start", reply, result);
                }
                Command::Stop(reply) => {
                    let result = self.stop();
                    respond("stop", reply, result);
                }
                Command::SwitchPosition(reply) => {
                    let result = self.switch_position();
                    respond("switch_position", reply, result);
                }
                Command::Capture(reply) => {
                    let result = self.capture();
                    respond("capture", reply, result);
                }
            }
        }

        // Every handle is gone
        if self.phase == SessionPhase::Running {
            self.backend.stop_running();
        }
        if let Some(input) = self.input.take() {
            self.backend.detach_input(&input);
        }
        info!("Capture session torn down");
    }

    fn configure(&mut self) -> SessionResult<SessionSnapshot> {
        if !self.permission.is_granted() {
            warn!("Camera permission not granted, refusing to configure");
            return Err(SessionError::PermissionDenied);
        }

        if self.input.is_some() && self.output.is_some() {
            debug!(position = %self.position, "Session already configured");
            return Ok(self.current_snapshot());
        }

        if self.capture_pending() {
            return Err(SessionError::CaptureInProgress);
        }

        if self.input.is_none() {
            let input = self.open_and_attach(self.position)?;
            self.input = Some(input);
        }

        if self.output.is_none() {
            match self.backend.attach_output() {
                Ok(sink) => self.output = Some(sink),
                Err(e) => {
                    error!(error = %e, "Failed to add photo output to session");
                    if let Some(input) = self.input.take() {
                        self.backend.detach_input(&input);
                    }
                    return Err(SessionError::ConfigurationRejected(e.to_string()));
                }
            }
        }

        if self.phase != SessionPhase::Running {
            self.phase = SessionPhase::Configured;
        }

        info!(position = %self.position, "Capture session configured");
        Ok(self.publish())
    }

    fn start(&mut self) -> SessionResult<SessionSnapshot> {
        if self.phase == SessionPhase::Running {
            debug!("Capture session already running");
            return Ok(self.current_snapshot());
        }

        if self.input.is_none() || self.output.is_none() {
            return Err(SessionError::ConfigurationRejected(
                "session has no input attached; configure first".to_string(),
            ));
        }

        self.backend.start_running().map_err(|e| {
            error!(error = %e, "Failed to start capture session");
            SessionError::DeviceUnavailable(e.to_string())
        })?;

        self.phase = SessionPhase::Running;
        info!(position = %self.position, "Capture session started");
        Ok(self.publish())
    }

    fn stop(&mut self) -> SessionResult<SessionSnapshot> {
        if self.phase != SessionPhase::Running {
            debug!("Capture session already stopped");
            return Ok(self.current_snapshot());
        }

        self.backend.stop_running();
        self.phase = SessionPhase::Stopped;
        info!("Capture session stopped");
        Ok(self.publish())
    }

    fn switch_position(&mut self) -> SessionResult<SessionSnapshot> {
        if self.capture_pending() {
            warn!("Refusing to switch camera while a capture is outstanding");
            return Err(SessionError::CaptureInProgress);
        }

        let Some(current) = self.input.take() else {
            return Err(SessionError::ConfigurationRejected(
                "session has no input attached; configure first".to_string(),
            ));
        };

        let was_running = self.phase == SessionPhase::Running;
        let target = self.position.opposite();
        info!(from = %self.position, to = %target, was_running, "Switching camera position");

        if was_running {
            self.backend.stop_running();
            debug!("Capture session stopped for switching camera");
        }
        self.backend.detach_input(&current);
        drop(current);

        match self.open_and_attach(target) {
            Ok(input) => {
                self.input = Some(input);
                self.position = target;
            }
            Err(e) => {
                self.phase = SessionPhase::Stopped;
                self.publish();
                return Err(e);
            }
        }

        if was_running && let Err(e) = self.backend.start_running() {
            error!(error = %e, "Failed to restart capture session after switching camera");
            self.phase = SessionPhase::Stopped;
            self.publish();
            return Err(SessionError::DeviceUnavailable(e.to_string()));
        }

        if !was_running && self.phase == SessionPhase::Uninitialized {
            self.phase = SessionPhase::Configured;
        }

        debug!(position = %self.position, "Capture session configuration committed for switched camera");
        Ok(self.publish())
    }

    fn capture(&mut self) -> SessionResult<CaptureRequest> {
        if self.phase != SessionPhase::Running || self.output.is_none() {
            warn!("Capture session is not running or photo output is unavailable");
            return Err(SessionError::SessionNotRunning);
        }

        let id = Uuid::new_v4();
        {
            let mut in_flight = self.published.lock_in_flight();
            if let Some(outstanding) = *in_flight {
                warn!(outstanding = %outstanding, "Rejecting capture: another request is outstanding");
                return Err(SessionError::CaptureInProgress);
            }
            *in_flight = Some(id);
        }

        let (sender, receiver) = oneshot::channel();
        let published = Arc::clone(&self.published);
        let completion = CaptureCompletion::new(move |result| {
            deliver_completion(&published, id, result, sender);
        });
        let request = CaptureRequest {
            id,
            issued_at: Local::now(),
            completion: receiver,
        };

        self.publish();
        self.published
            .emit(SessionEvent::CaptureIssued { request_id: id });

        info!(request_id = %id, flash = ?self.capture_settings.flash, "Issuing still capture");
        self.backend.capture_still(self.capture_settings, completion);

        Ok(request)
    }

    fn open_and_attach(&mut self, position: DevicePosition) -> SessionResult<DeviceHandle> {
        let input = self.backend.open_input(position).map_err(|e| {
            error!(position = %position, error = %e, "Failed to open camera input");
            match e {
                BackendError::Rejected(msg) => SessionError::ConfigurationRejected(msg),
                other => SessionError::DeviceUnavailable(other.to_string()),
            }
        })?;

        if let Err(e) = self.backend.attach_input(&input) {
            error!(device = %input.device().name, error = %e, "Cannot add capture session input");
            return Err(SessionError::ConfigurationRejected(e.to_string()));
        }

        debug!(device = %input.device().name, position = %position, "Input attached");
        Ok(input)
    }

    fn capture_pending(&self) -> bool {
        self.published.lock_in_flight().is_some()
    }

    fn current_snapshot(&self) -> SessionSnapshot {
        let in_flight = self.published.lock_in_flight();
        self.build_snapshot(in_flight.is_some())
    }

    fn build_snapshot(&self, capture_pending: bool) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            position: self.position,
            input: self.input.as_ref().map(|input| input.device().clone()),
            output_attached: self.output.is_some(),
            capture_pending,
        }
    }

    /// Publish the current state to watchers and subscribers
    fn publish(&self) -> SessionSnapshot {
        let snapshot = {
            // Held so a concurrent completion cannot publish in between
            let in_flight = self.published.lock_in_flight();
            let snapshot = self.build_snapshot(in_flight.is_some());
            self.published.snapshot.send_replace(snapshot.clone());
            snapshot
        };
        self.published
            .emit(SessionEvent::StateChanged(snapshot.clone()));
        snapshot
    }
}

fn respond<T>(operation: &'static str, reply: Reply<T>, result: SessionResult<T>) {
    if let Err(e) = &result {
        warn!(operation, error = %e, kind = %e.kind(), "Session command failed");
    }
    if reply.send(result).is_err() {
        debug!(operation, "Caller went away before the session replied");
    }
}

/// Runs on the backend's completion thread
fn deliver_completion(
    published: &Published,
    request_id: Uuid,
    result: BackendResult<CapturedImage>,
    sender: oneshot::Sender<SessionResult<CapturedImage>>,
) {
    let result = result.map_err(|e| match e {
        BackendError::CaptureFailed(detail) => SessionError::CaptureFailed(detail),
        other => SessionError::CaptureFailed(other.to_string()),
    });

    let snapshot = {
        let mut in_flight = published.lock_in_flight();
        if *in_flight == Some(request_id) {
            *in_flight = None;
        }
        let pending = in_flight.is_some();
        published
            .snapshot
            .send_modify(|snapshot| snapshot.capture_pending = pending);
        published.snapshot.borrow().clone()
    };
    published.emit(SessionEvent::StateChanged(snapshot));

    match &result {
        Ok(image) => {
            info!(
                request_id = %request_id,
                width = image.width,
                height = image.height,
                bytes = image.byte_size(),
                "Capture completed"
            );
            published.emit(SessionEvent::CaptureCompleted {
                request_id,
                width: image.width,
                height: image.height,
            });
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Error capturing photo");
            published.emit(SessionEvent::CaptureFailed {
                request_id,
                error: e.clone(),
            });
        }
    }

    if sender.send(result).is_err() {
        debug!(request_id = %request_id, "Capture request dropped before completion");
    }
}
