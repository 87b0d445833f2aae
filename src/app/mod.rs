// SPDX-License-Identifier: GPL-3.0-only

//! UI-affine consumer of pipeline results
//!
//! [`App`] receives [`PipelineEvent`]s in delivery order on a single task,
//! keeps the photo collection, and pairs each photo with its critique.
//! Capture failures leave the collection untouched; feedback failures keep
//! the photo and show a placeholder critique.

use crate::errors::SessionError;
use crate::feedback::{Critique, FeedbackResult};
use crate::pipelines::photo::PipelineEvent;
use crate::storage::{PhotoItem, PhotoStore};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What changed after handling one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppUpdate {
    /// A photo joined the collection; its critique is on the way
    PhotoAdded { request_id: Uuid, photo_id: Uuid },
    /// The critique for a photo is ready (or replaced by the placeholder)
    CritiqueReady {
        photo_id: Uuid,
        text: String,
        /// Rating suggested by the model, if it gave one
        suggested_rating: Option<u8>,
        failed: bool,
    },
    /// The capture produced no photo
    CaptureError { request_id: Uuid, message: String },
}

/// Photo collection plus the critiques shown beside each photo
#[derive(Debug, Default)]
pub struct App {
    store: PhotoStore,
    /// Capture request -> photo awaiting its critique
    awaiting: HashMap<Uuid, Uuid>,
    critiques: HashMap<Uuid, String>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &PhotoStore {
        &self.store
    }

    pub fn photos(&self) -> &[PhotoItem] {
        self.store.items()
    }

    /// Critique text shown for `photo_id`
    pub fn critique(&self, photo_id: Uuid) -> Option<&str> {
        self.critiques.get(&photo_id).map(String::as_str)
    }

    /// Photos still waiting for a critique
    pub fn awaiting_feedback(&self) -> usize {
        self.awaiting.len()
    }

    /// User-set rating
    pub fn set_rating(&mut self, photo_id: Uuid, rating: i32) -> bool {
        self.store.update_rating(photo_id, rating)
    }

    pub fn remove_photo(&mut self, photo_id: Uuid) -> bool {
        self.critiques.remove(&photo_id);
        self.awaiting.retain(|_, photo| *photo != photo_id);
        self.store.remove(photo_id).is_some()
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.awaiting.clear();
        self.critiques.clear();
    }

    /// Apply one pipeline event
    ///
    /// Returns `None` for a critique whose photo was removed in the meantime.
    pub fn handle_event(&mut self, event: PipelineEvent) -> Option<AppUpdate> {
        match event {
            PipelineEvent::Captured { request_id, image } => {
                let photo = self.store.add(image);
                self.awaiting.insert(request_id, photo.id);
                info!(request_id = %request_id, photo_id = %photo.id, "Photo added to collection");
                Some(AppUpdate::PhotoAdded {
                    request_id,
                    photo_id: photo.id,
                })
            }
            PipelineEvent::Feedback { request_id, result } => {
                let Some(photo_id) = self.awaiting.remove(&request_id) else {
                    debug!(request_id = %request_id, "Critique arrived for a photo no longer shown");
                    return None;
                };
                Some(self.attach_critique(photo_id, result))
            }
            PipelineEvent::CaptureFailed { request_id, error } => {
                warn!(request_id = %request_id, error = %error, "Capture failed, nothing added");
                Some(AppUpdate::CaptureError {
                    request_id,
                    message: capture_message(&error),
                })
            }
        }
    }

    /// Consume events until every sender is gone
    pub async fn run<U>(&mut self, mut events: mpsc::Receiver<PipelineEvent>, mut on_update: U)
    where
        U: FnMut(&App, AppUpdate),
    {
        while let Some(event) = events.recv().await {
            if let Some(update) = self.handle_event(event) {
                on_update(self, update);
            }
        }
        debug!("Pipeline event channel closed");
    }

    fn attach_critique(&mut self, photo_id: Uuid, result: FeedbackResult) -> AppUpdate {
        let text = result.display_text();
        let suggested_rating = result.text().and_then(|text| Critique::parse(text).rating);
        self.critiques.insert(photo_id, text.clone());
        AppUpdate::CritiqueReady {
            photo_id,
            text,
            suggested_rating,
            failed: !result.is_success(),
        }
    }
}

fn capture_message(error: &SessionError) -> String {
    match error {
        SessionError::CaptureFailed(detail) => {
            format!("{}: {}", error.kind().user_message(), detail)
        }
        other => other.kind().user_message().to_string(),
    }
}
