// SPDX-License-Identifier: GPL-3.0-only

//! Async photo critique pipeline
//!
//! ```text
//! Session capture → Encoding (blocking pool) → Feedback request → Result
//!       ↓
//! Session stays free for start/stop/switch
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Capture**: [`CaptureCoordinator`] waits for the hardware completion
//! 2. **Encoding**: bound the dimensions, compress, base64 ([`PhotoEncoder`])
//! 3. **Feedback**: one request to the [`FeedbackService`]
//!
//! A photo's stages always run in that order. Separate photos run
//! independently.

pub mod capture;
pub mod encoding;

pub use capture::{CaptureCoordinator, PipelineEvent};
pub use encoding::{EncodedPayload, EncodingConfig, PhotoEncoder, target_dimensions};

use crate::backends::camera::types::CapturedImage;
use crate::feedback::{FeedbackResult, FeedbackService};
use std::sync::Arc;
use tracing::{error, info};

/// Encoding plus feedback for one captured photo
pub struct PhotoPipeline<F> {
    encoder: PhotoEncoder,
    feedback: F,
}

impl<F: FeedbackService> PhotoPipeline<F> {
    pub fn new(encoder: PhotoEncoder, feedback: F) -> Self {
        Self { encoder, feedback }
    }

    pub fn encoder(&self) -> &PhotoEncoder {
        &self.encoder
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    /// Encode `image` off the async workers and request its critique
    ///
    /// Encoding failures come back as `Failure(EncodingFailed, ..)` without
    /// a network request.
    pub async fn critique(&self, image: Arc<CapturedImage>) -> FeedbackResult {
        info!(
            width = image.width,
            height = image.height,
            service = self.feedback.name(),
            "Starting critique pipeline"
        );

        let payload = match self.encoder.encode_in_background(image).await {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to encode photo for feedback");
                return FeedbackResult::Failure(e.into());
            }
        };

        let result = self.feedback.request_feedback(&payload).await;
        match &result {
            FeedbackResult::Success(text) => info!(chars = text.len(), "Critique received"),
            FeedbackResult::Failure(err) => {
                error!(kind = %err.kind, detail = %err.detail, "Critique failed")
            }
        }
        result
    }
}

impl<F> std::fmt::Debug for PhotoPipeline<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoPipeline")
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}
