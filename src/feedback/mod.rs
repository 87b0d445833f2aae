// SPDX-License-Identifier: GPL-3.0-only

//! Outfit critique from a remote vision model
//!
//! One encoded photo goes out, one [`FeedbackResult`] comes back. Every
//! failure is folded into the result, so callers never see a panic or an
//! unhandled error from this layer.

mod client;
mod critique;

pub use client::{ChatCompletionRequest, ChatMessage, FeedbackClient, parse_response};
pub use critique::Critique;

use crate::constants::gallery::FEEDBACK_PLACEHOLDER;
use crate::errors::{ErrorKind, FeedbackError};
use crate::pipelines::photo::encoding::EncodedPayload;
use std::future::Future;

/// Outcome of one feedback request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackResult {
    /// Critique text, trimmed
    Success(String),
    Failure(FeedbackError),
}

impl FeedbackResult {
    pub fn failure(kind: ErrorKind, detail: impl Into<String>) -> Self {
        FeedbackResult::Failure(FeedbackError::new(kind, detail))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FeedbackResult::Success(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            FeedbackResult::Success(text) => Some(text),
            FeedbackResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FeedbackError> {
        match self {
            FeedbackResult::Success(_) => None,
            FeedbackResult::Failure(err) => Some(err),
        }
    }

    /// Text to show next to the photo
    ///
    /// Failures show the placeholder followed by the reason.
    pub fn display_text(&self) -> String {
        match self {
            FeedbackResult::Success(text) => text.clone(),
            FeedbackResult::Failure(err) => {
                format!("{} ({})", FEEDBACK_PLACEHOLDER, err.kind.user_message())
            }
        }
    }
}

impl From<FeedbackError> for FeedbackResult {
    fn from(err: FeedbackError) -> Self {
        FeedbackResult::Failure(err)
    }
}

/// Something that can critique an encoded photo
///
/// Implementations make at most one attempt per call and never retry.
pub trait FeedbackService: Send + Sync {
    /// Service identifier for logging
    fn name(&self) -> &'static str;

    fn request_feedback(
        &self,
        payload: &EncodedPayload,
    ) -> impl Future<Output = FeedbackResult> + Send;
}
