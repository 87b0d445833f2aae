// SPDX-License-Identifier: GPL-3.0-only

//! Capture coordination
//!
//! Bridges one "take photo" action to the session controller and then to the
//! critique pipeline. Every accepted request produces exactly one terminal
//! event: [`PipelineEvent::Feedback`] after [`PipelineEvent::Captured`], or
//! [`PipelineEvent::CaptureFailed`] with no image.

use super::PhotoPipeline;
use crate::backends::camera::types::CapturedImage;
use crate::backends::camera::{CaptureRequest, SessionController};
use crate::errors::{SessionError, SessionResult};
use crate::feedback::{FeedbackResult, FeedbackService};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Progress of a capture request, in delivery order
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The hardware delivered the photo; feedback is being requested
    Captured {
        request_id: Uuid,
        image: Arc<CapturedImage>,
    },
    /// Terminal: critique text or a typed failure
    Feedback {
        request_id: Uuid,
        result: FeedbackResult,
    },
    /// Terminal: no photo was taken
    CaptureFailed {
        request_id: Uuid,
        error: SessionError,
    },
}

impl PipelineEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            PipelineEvent::Captured { request_id, .. }
            | PipelineEvent::Feedback { request_id, .. }
            | PipelineEvent::CaptureFailed { request_id, .. } => *request_id,
        }
    }

    /// True for the last event of a request
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineEvent::Captured { .. })
    }
}

/// Turns capture requests into pipeline events
pub struct CaptureCoordinator<F> {
    session: SessionController,
    pipeline: Arc<PhotoPipeline<F>>,
    events: mpsc::Sender<PipelineEvent>,
}

impl<F> Clone for CaptureCoordinator<F> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            pipeline: Arc::clone(&self.pipeline),
            events: self.events.clone(),
        }
    }
}

impl<F: FeedbackService + 'static> CaptureCoordinator<F> {
    /// # Arguments
    /// * `session` - Controller the captures are issued to
    /// * `pipeline` - Encoding and feedback for delivered photos
    /// * `events` - Where the UI-affine consumer receives results
    pub fn new(
        session: SessionController,
        pipeline: PhotoPipeline<F>,
        events: mpsc::Sender<PipelineEvent>,
    ) -> Self {
        Self {
            session,
            pipeline: Arc::new(pipeline),
            events,
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Issue a capture and follow it through the pipeline in the background
    ///
    /// Rejections from the session (not running, capture already in progress)
    /// are returned directly and produce no events.
    pub async fn request_capture(&self) -> SessionResult<Uuid> {
        let request = self.session.capture().await?;
        let request_id = request.id();
        info!(request_id = %request_id, issued_at = %request.issued_at(), "Capture requested");

        let pipeline = Arc::clone(&self.pipeline);
        let events = self.events.clone();
        tokio::spawn(follow_capture(request, pipeline, events));

        Ok(request_id)
    }
}

async fn follow_capture<F: FeedbackService>(
    request: CaptureRequest,
    pipeline: Arc<PhotoPipeline<F>>,
    events: mpsc::Sender<PipelineEvent>,
) {
    let request_id = request.id();

    let image = match request.completion().await {
        Ok(image) => Arc::new(image),
        Err(error) => {
            error!(request_id = %request_id, error = %error, "Capture did not deliver a photo");
            deliver(&events, PipelineEvent::CaptureFailed { request_id, error }).await;
            return;
        }
    };

    let captured = PipelineEvent::Captured {
        request_id,
        image: Arc::clone(&image),
    };
    if !deliver(&events, captured).await {
        return;
    }

    let result = pipeline.critique(image).await;
    deliver(&events, PipelineEvent::Feedback { request_id, result }).await;
}

async fn deliver(events: &mpsc::Sender<PipelineEvent>, event: PipelineEvent) -> bool {
    let request_id = event.request_id();
    match events.send(event).await {
        Ok(()) => true,
        Err(_) => {
            debug!(request_id = %request_id, "Pipeline consumer gone, dropping event");
            false
        }
    }
}
