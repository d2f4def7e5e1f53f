//! Bounded retry with exponential backoff around one inference call.

use std::future::Future;
use std::time::Duration;

use mailsift_llm::{Error as InferenceError, ErrorClass};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::duration_millis;

/// How often and how patiently to repeat a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of calls, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further one.
    #[serde(rename = "base_delay_ms", with = "duration_millis")]
    pub base_delay: Duration,
    /// Upper bound for any single delay, including server hints.
    #[serde(rename = "max_delay_ms", with = "duration_millis")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (0-based).
    ///
    /// `base_delay * 2^attempt`, raised to `hint` when the service asked for
    /// longer, and capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let backoff = self.base_delay.saturating_mul(factor);
        let delay = hint.map_or(backoff, |h| h.max(backoff));
        delay.min(self.max_delay)
    }

    /// Number of attempts actually made; never less than one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Why a wrapped call produced no value.
#[derive(Debug, thiserror::Error)]
pub enum CallFailure {
    /// Credentials or connectivity are broken; the run must stop.
    #[error("fatal inference failure: {0}")]
    Fatal(#[source] InferenceError),

    /// The service refused this request; repeating it will not help.
    #[error("inference request rejected: {0}")]
    Rejected(#[source] InferenceError),

    /// Every attempt failed with a retryable error.
    #[error("inference failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Calls made.
        attempts: u32,
        /// Error from the final call.
        #[source]
        last: InferenceError,
    },
}

impl CallFailure {
    /// Whether the whole batch must be aborted.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// The underlying inference error.
    #[must_use]
    pub const fn error(&self) -> &InferenceError {
        match self {
            Self::Fatal(e) | Self::Rejected(e) | Self::Exhausted { last: e, .. } => e,
        }
    }

    /// Short, stable label for structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Fatal(_) => "fatal",
            Self::Rejected(_) => "rejected",
            Self::Exhausted { .. } => "retries_exhausted",
        }
    }
}

/// Run `call` until it succeeds, fails non-retryably, or the policy runs out.
///
/// `label` names the call in log events.
///
/// # Errors
///
/// Returns [`CallFailure::Fatal`] or [`CallFailure::Rejected`] immediately on
/// a non-retryable error, and [`CallFailure::Exhausted`] once the last
/// allowed attempt has failed.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut call: F,
) -> Result<T, CallFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = mailsift_llm::Result<T>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        let error = match call().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(call = label, attempt = attempt + 1, "Call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        let class = error.class();
        if class != ErrorClass::Retryable {
            debug!(
                call = label,
                error_class = class.as_str(),
                error_kind = error.kind(),
                "Not retrying inference error"
            );
        }
        match class {
            ErrorClass::Fatal => return Err(CallFailure::Fatal(error)),
            ErrorClass::Permanent => return Err(CallFailure::Rejected(error)),
            ErrorClass::Retryable => {}
        }

        attempt += 1;
        if attempt >= attempts {
            warn!(
                call = label,
                attempts,
                error_kind = error.kind(),
                error = %error,
                "Retries exhausted"
            );
            return Err(CallFailure::Exhausted {
                attempts,
                last: error,
            });
        }

        let delay = policy.delay_for(attempt - 1, error.retry_after());
        warn!(
            call = label,
            attempt,
            max_attempts = attempts,
            error_kind = error.kind(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Retryable inference error, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
