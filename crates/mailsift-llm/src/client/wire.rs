//! Wire types for the Messages API.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body for a single-turn generation.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Conversation turns; always a single user turn here.
    pub messages: Vec<Message<'a>>,
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize)]
pub struct Message<'a> {
    /// Speaker role (`user`).
    pub role: &'static str,
    /// Turn text.
    pub content: &'a str,
}

/// Successful response body.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    /// Generated content blocks.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Why generation stopped (e.g. `end_turn`, `max_tokens`).
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// One block of generated content.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    /// Block type; only `text` blocks carry text.
    #[serde(rename = "type")]
    pub kind: String,
    /// Block text.
    #[serde(default)]
    pub text: Option<String>,
}

impl MessagesResponse {
    /// Concatenates all text blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries no text.
    pub fn into_text(self) -> Result<String> {
        let text: String = self
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(Error::InvalidResponse(format!(
                "no text content (stop_reason: {})",
                self.stop_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

/// Error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error details inside an error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    /// Error type (e.g., `rate_limit_error`).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl ErrorResponse {
    /// Converts to an Error for the given status.
    #[must_use]
    pub fn into_error(self, status: u16, retry_after: Option<Duration>) -> Error {
        let message = if self.error.kind.is_empty() {
            self.error.message
        } else {
            format!("{}: {}", self.error.kind, self.error.message)
        };
        Error::from_status(status, message, retry_after)
    }
}

/// Parses a `Retry-After` header given in whole seconds.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
