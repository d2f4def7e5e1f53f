//! Inference service endpoint configurations.

use crate::error::{Error, Result};
use url::Url;

/// Default API version header value for Messages-style endpoints.
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Inference service endpoint configuration.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Endpoint name (e.g., "Anthropic").
    pub name: String,
    /// Base URL of the service.
    pub base_url: Url,
    /// Value sent in the `anthropic-version` header.
    pub api_version: String,
}

impl Endpoint {
    /// Creates a new endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(name: impl Into<String>, base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            base_url: Url::parse(base_url.as_ref())?,
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Sets the API version header value.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Anthropic Messages API.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn anthropic() -> Result<Self> {
        Self::new("Anthropic", "https://api.anthropic.com/")
    }

    /// URL of the messages resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be joined.
    pub fn messages_url(&self) -> Result<Url> {
        self.base_url.join("v1/messages").map_err(Into::into)
    }

    /// Validates that required settings are present.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(Error::InvalidConfig(format!(
                "unsupported URL scheme: {}",
                self.base_url.scheme()
            )));
        }
        if self.api_version.trim().is_empty() {
            return Err(Error::InvalidConfig("api_version is empty".into()));
        }
        Ok(())
    }
}
