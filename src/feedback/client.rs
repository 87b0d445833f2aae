// SPDX-License-Identifier: GPL-3.0-only

//! Chat completions client

use super::{FeedbackResult, FeedbackService};
use crate::config::{Credential, FeedbackSettings};
use crate::constants::{feedback::MALFORMED_SNIPPET_CHARS, prompt};
use crate::errors::{ErrorKind, FeedbackError};
use crate::pipelines::photo::encoding::EncodedPayload;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Request body sent to `/chat/completions`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct FeedbackClient {
    http: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    credential: Credential,
}

impl FeedbackClient {
    /// Build a client; the request timeout comes from `settings`
    pub fn new(settings: &FeedbackSettings, credential: Credential) -> Result<Self, FeedbackError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| FeedbackError::new(ErrorKind::Transport, e.to_string()))?;

        Ok(Self {
            http,
            url: format!("{}/chat/completions", settings.endpoint.trim_end_matches('/')),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            credential,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_present()
    }

    /// The request body for `payload`
    pub fn build_request(&self, payload: &EncodedPayload) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt::SYSTEM_PERSONA.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!(
                        "{}\n\n{}\n{}",
                        prompt::USER_INSTRUCTION,
                        prompt::IMAGE_LEAD_IN,
                        payload.data_url()
                    ),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Send one request for `payload` and map the outcome
    pub async fn request(&self, payload: &EncodedPayload) -> FeedbackResult {
        let Some(api_key) = self.credential.expose() else {
            warn!("No API key configured, skipping feedback request");
            return FeedbackResult::failure(ErrorKind::MissingCredential, "");
        };

        let request = self.build_request(payload);
        info!(
            url = %self.url,
            model = %self.model,
            shape_version = prompt::REQUEST_SHAPE_VERSION,
            payload_bytes = payload.data.len(),
            "Requesting outfit feedback"
        );

        let response = match self
            .http
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return transport_failure(e),
        };
        debug!(%status, bytes = body.len(), "Feedback response received");

        parse_response(status, &body)
    }
}

impl FeedbackService for FeedbackClient {
    fn name(&self) -> &'static str {
        "chat-completions"
    }

    async fn request_feedback(&self, payload: &EncodedPayload) -> FeedbackResult {
        self.request(payload).await
    }
}

impl std::fmt::Debug for FeedbackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("credential", &self.credential)
            .finish()
    }
}

fn transport_failure(e: reqwest::Error) -> FeedbackResult {
    if e.is_timeout() {
        warn!("Feedback request timed out");
        FeedbackResult::failure(ErrorKind::Transport, "timeout")
    } else {
        warn!(error = %e, "Feedback request failed");
        FeedbackResult::failure(ErrorKind::Transport, e.to_string())
    }
}

/// Map a response body to a [`FeedbackResult`]
///
/// Non-success statuses are only consulted for diagnostics; the body shape
/// decides the outcome.
pub fn parse_response(status: StatusCode, body: &str) -> FeedbackResult {
    if body.trim().is_empty() {
        warn!(%status, "Feedback service returned an empty body");
        return FeedbackResult::failure(ErrorKind::EmptyResponse, "");
    }

    let content = serde_json::from_str::<ChatCompletionResponse>(body)
        .ok()
        .and_then(|response| response.choices.into_iter().next())
        .and_then(|choice| choice.message.content);

    match content {
        Some(text) => {
            let text = text.trim();
            // Blank content is reported like an empty body, not as an empty critique
            if text.is_empty() {
                warn!("Feedback service returned empty content");
                FeedbackResult::failure(ErrorKind::EmptyResponse, "")
            } else {
                FeedbackResult::Success(text.to_string())
            }
        }
        None => {
            let snippet: String = body.chars().take(MALFORMED_SNIPPET_CHARS).collect();
            let detail = if status.is_success() {
                snippet
            } else {
                format!("HTTP {}: {}", status.as_u16(), snippet)
            };
            warn!(%status, "Feedback response did not match the expected shape");
            FeedbackResult::failure(ErrorKind::MalformedResponse, detail)
        }
    }
}
