//! Model profiles.

use serde::{Deserialize, Serialize};

/// Request settings for one kind of inference call.
///
/// The pipeline uses two profiles: a cheap `triage` profile and a larger
/// `analysis` profile with zero temperature so repeated runs agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    /// Model identifier sent to the service.
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl ModelProfile {
    /// Creates a new profile.
    #[must_use]
    pub fn new(model: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    /// Fast, low-token profile for go/no-go triage.
    #[must_use]
    pub fn triage_default() -> Self {
        Self::new("claude-3-5-haiku-latest", 200, 0.0)
    }

    /// Larger profile for full structured extraction.
    #[must_use]
    pub fn analysis_default() -> Self {
        Self::new("claude-sonnet-4-5", 1500, 0.0)
    }
}
