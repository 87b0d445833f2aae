// SPDX-License-Identifier: GPL-3.0-only

//! fitcheck - outfit photos critiqued by a vision language model
//!
//! Captures a still through a camera session, shrinks and encodes it, sends
//! it to a chat completions endpoint and pairs the returned critique with the
//! photo in an in-memory collection.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera backend trait, session controller and software camera
//! - [`pipelines`]: Capture coordination and photo encoding
//! - [`feedback`]: Critique request client and response parsing
//! - [`storage`]: In-memory photo collection with ratings
//! - [`app`]: Consumer that ties photos to their critiques
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! // Capture from the software camera and print the critique:
//! // fitcheck check --source outfit.jpg
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod feedback;
pub mod pipelines;
pub mod storage;

// Re-export commonly used types
pub use app::{App, AppUpdate};
pub use backends::camera::{SessionController, SessionPhase, SessionSnapshot};
pub use config::{Config, Credential};
pub use constants::EncodingPreset;
pub use errors::{AppError, AppResult, ErrorKind};
pub use feedback::{FeedbackClient, FeedbackResult, FeedbackService};
pub use pipelines::photo::{CaptureCoordinator, PhotoEncoder, PhotoPipeline, PipelineEvent};
