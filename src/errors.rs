// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture-to-feedback pipeline
//!
//! Every failure the subsystem can surface falls into one [`ErrorKind`].
//! Layer-specific errors ([`SessionError`], [`EncodeError`], [`FeedbackError`])
//! carry their kind plus whatever detail the layer had at hand, and
//! [`AppError`] wraps them for the command line.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for session controller operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Failure taxonomy shared by all pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Camera permission has not been granted
    PermissionDenied,
    /// No device exists for the requested position, or it could not be opened
    DeviceUnavailable,
    /// The session refused an input or output
    ConfigurationRejected,
    /// Capture attempted while the session is not running
    SessionNotRunning,
    /// A capture request is already outstanding
    CaptureInProgress,
    /// The hardware reported a failed capture
    CaptureFailed,
    /// Resizing or compression produced no output
    EncodingFailed,
    /// No credential configured for the feedback service
    MissingCredential,
    /// Network failure (DNS, connection, timeout)
    Transport,
    /// The feedback service answered with an empty body
    EmptyResponse,
    /// The feedback service answered with an unexpected shape
    MalformedResponse,
}

impl ErrorKind {
    /// Stable identifier, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::DeviceUnavailable => "device_unavailable",
            ErrorKind::ConfigurationRejected => "configuration_rejected",
            ErrorKind::SessionNotRunning => "session_not_running",
            ErrorKind::CaptureInProgress => "capture_in_progress",
            ErrorKind::CaptureFailed => "capture_failed",
            ErrorKind::EncodingFailed => "encoding_failed",
            ErrorKind::MissingCredential => "missing_credential",
            ErrorKind::Transport => "transport",
            ErrorKind::EmptyResponse => "empty_response",
            ErrorKind::MalformedResponse => "malformed_response",
        }
    }

    /// Short human-readable sentence suitable for the UI
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "Camera access has not been granted",
            ErrorKind::DeviceUnavailable => "The camera is not available",
            ErrorKind::ConfigurationRejected => "The camera could not be set up",
            ErrorKind::SessionNotRunning => "The camera is not running",
            ErrorKind::CaptureInProgress => "A photo is already being taken",
            ErrorKind::CaptureFailed => "The photo could not be taken",
            ErrorKind::EncodingFailed => "The photo could not be prepared for upload",
            ErrorKind::MissingCredential => "No API key is configured",
            ErrorKind::Transport => "Could not reach the feedback service",
            ErrorKind::EmptyResponse => "The feedback service returned nothing",
            ErrorKind::MalformedResponse => "The feedback service returned an unexpected answer",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session controller and capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Permission precondition not met; no hardware call was made
    PermissionDenied,
    /// Device for the requested position missing or failed to open
    DeviceUnavailable(String),
    /// Session refused the input or output
    ConfigurationRejected(String),
    /// Session not running or no output attached
    SessionNotRunning,
    /// Another capture request is outstanding
    CaptureInProgress,
    /// Hardware delivered a failed completion
    CaptureFailed(String),
}

impl SessionError {
    /// Taxonomy category for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::PermissionDenied => ErrorKind::PermissionDenied,
            SessionError::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            SessionError::ConfigurationRejected(_) => ErrorKind::ConfigurationRejected,
            SessionError::SessionNotRunning => ErrorKind::SessionNotRunning,
            SessionError::CaptureInProgress => ErrorKind::CaptureInProgress,
            SessionError::CaptureFailed(_) => ErrorKind::CaptureFailed,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::PermissionDenied => write!(f, "Camera permission not granted"),
            SessionError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            SessionError::ConfigurationRejected(msg) => {
                write!(f, "Configuration rejected: {}", msg)
            }
            SessionError::SessionNotRunning => write!(f, "Capture session is not running"),
            SessionError::CaptureInProgress => write!(f, "A capture is already in progress"),
            SessionError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
        }
    }
}

/// Image encoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Source image has no pixels
    EmptySource,
    /// Pixel buffer does not match the declared dimensions
    InvalidBuffer(String),
    /// Compression failed or produced zero bytes
    Compression(String),
    /// Background encode task panicked or was cancelled
    Task(String),
}

impl EncodeError {
    /// Taxonomy category for this error
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::EncodingFailed
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::EmptySource => write!(f, "Source image is empty"),
            EncodeError::InvalidBuffer(msg) => write!(f, "Invalid pixel buffer: {}", msg),
            EncodeError::Compression(msg) => write!(f, "Compression failed: {}", msg),
            EncodeError::Task(msg) => write!(f, "Encoding task error: {}", msg),
        }
    }
}

/// Feedback failure: a kind from the taxonomy plus detail text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl FeedbackError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FeedbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind.user_message())
        } else {
            write!(f, "{}: {}", self.kind.user_message(), self.detail)
        }
    }
}

impl From<EncodeError> for FeedbackError {
    fn from(err: EncodeError) -> Self {
        FeedbackError::new(err.kind(), err.to_string())
    }
}

/// Configuration file errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Reading or writing the file failed
    Io(String),
    /// File contents are not valid TOML for the config schema
    Parse(String),
    /// Config could not be serialized
    Serialize(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Serialize(msg) => write!(f, "Config serialize error: {}", msg),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

/// Top-level error for the command line
#[derive(Debug, Clone)]
pub enum AppError {
    Session(SessionError),
    Encode(EncodeError),
    Feedback(FeedbackError),
    Config(ConfigError),
    /// Generic error with message
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Encode(e) => write!(f, "Encoding error: {}", e),
            AppError::Feedback(e) => write!(f, "Feedback error: {}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SessionError {}
impl std::error::Error for EncodeError {}
impl std::error::Error for FeedbackError {}
impl std::error::Error for ConfigError {}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<EncodeError> for AppError {
    fn from(err: EncodeError) -> Self {
        AppError::Encode(err)
    }
}

impl From<FeedbackError> for AppError {
    fn from(err: FeedbackError) -> Self {
        AppError::Feedback(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}
