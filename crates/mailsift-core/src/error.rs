//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Inference client setup failed.
    #[error("Inference error: {0}")]
    Inference(#[from] mailsift_llm::Error),

    /// A stored row could not be decoded.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] crate::credentials::CredentialError),
}

impl Error {
    /// Short, stable name of the variant for structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Serde(_) => "serde",
            Self::Io(_) => "io",
            Self::Inference(e) => e.kind(),
            Self::InvalidData(_) => "invalid_data",
            Self::Config(_) => "config",
            Self::Credential(_) => "credential",
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
