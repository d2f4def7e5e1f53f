//! Error types for inference operations.

use std::time::Duration;

/// Result type alias for inference operations.
pub type Result<T> = std::result::Result<T, Error>;

/// How a caller should react to a failed inference call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The call may succeed if repeated after a delay.
    Retryable,
    /// Further calls cannot succeed in this run (credentials or connectivity).
    Fatal,
    /// This particular request will never succeed; other requests may.
    Permanent,
}

impl ErrorClass {
    /// Convert to a short label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Retryable => "retryable",
            Self::Fatal => "fatal",
            Self::Permanent => "permanent",
        }
    }
}

/// Inference error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport error that is neither a timeout nor a connect failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// The service could not be reached.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The service refused the credentials (HTTP 401/403).
    #[error("Authentication failed ({status}): {message}")]
    Auth {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// The service asked us to slow down (HTTP 429).
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Delay suggested by the `Retry-After` header, if any.
        retry_after: Option<Duration>,
        /// Message reported by the service.
        message: String,
    },

    /// Transient server-side failure (HTTP 5xx, including 529 overloaded).
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// The service rejected this request (other HTTP 4xx).
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// The reply was well-formed JSON but carried no usable text.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No API key could be found.
    #[error("No API key configured")]
    MissingApiKey,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// Classify this error for retry decisions.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout | Self::RateLimited { .. } | Self::Server { .. } => ErrorClass::Retryable,
            Self::Auth { .. } | Self::Connect(_) | Self::MissingApiKey => ErrorClass::Fatal,
            Self::Http(e) if e.is_timeout() => ErrorClass::Retryable,
            Self::Http(e) if e.is_connect() => ErrorClass::Fatal,
            Self::Http(_) => ErrorClass::Retryable,
            Self::Json(_)
            | Self::Rejected { .. }
            | Self::InvalidResponse(_)
            | Self::InvalidConfig(_)
            | Self::UrlError(_) => ErrorClass::Permanent,
        }
    }

    /// Delay hint supplied by the service, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short, stable name of the variant for structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::Timeout => "timeout",
            Self::Connect(_) => "connect",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limited",
            Self::Server { .. } => "server",
            Self::Rejected { .. } => "rejected",
            Self::InvalidResponse(_) => "invalid_response",
            Self::MissingApiKey => "missing_api_key",
            Self::InvalidConfig(_) => "invalid_config",
            Self::UrlError(_) => "url",
        }
    }

    /// Build the error matching an unsuccessful HTTP status.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Auth { status, message },
            408 => Self::Timeout,
            429 => Self::RateLimited {
                retry_after,
                message,
            },
            500..=599 => Self::Server { status, message },
            _ => Self::Rejected { status, message },
        }
    }
}
