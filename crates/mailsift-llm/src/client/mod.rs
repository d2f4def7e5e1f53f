//! Inference clients.

mod wire;

pub use wire::{
    ContentBlock, ErrorDetail, ErrorResponse, Message, MessagesRequest, MessagesResponse,
    parse_retry_after,
};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::profile::ModelProfile;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A service that turns a prompt into raw text.
///
/// Implementations make exactly one call per invocation and never retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Generates text for `prompt` using the settings in `profile`.
    ///
    /// # Errors
    ///
    /// Returns an error classified by [`Error::class`].
    async fn generate(&self, profile: &ModelProfile, prompt: &str) -> Result<String>;
}

/// HTTP client for a Messages-style inference API.
#[derive(Debug, Clone)]
pub struct HttpClient {
    /// Endpoint configuration.
    pub endpoint: Endpoint,
    api_key: String,
    http_client: Client,
}

impl HttpClient {
    /// Creates a new client with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, the endpoint is invalid, or the
    /// HTTP client cannot be built.
    pub fn new(endpoint: Endpoint, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, api_key, DEFAULT_TIMEOUT)
    }

    /// Creates a new client with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, the endpoint is invalid, or the
    /// HTTP client cannot be built.
    pub fn with_timeout(
        endpoint: Endpoint,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::MissingApiKey);
        }
        endpoint.validate()?;

        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            api_key,
            http_client,
        })
    }
}

#[async_trait]
impl InferenceClient for HttpClient {
    async fn generate(&self, profile: &ModelProfile, prompt: &str) -> Result<String> {
        let body = MessagesRequest {
            model: &profile.model,
            max_tokens: profile.max_tokens,
            temperature: profile.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(
            model = %profile.model,
            max_tokens = profile.max_tokens,
            prompt_chars = prompt.len(),
            "Sending inference request"
        );

        let response = self
            .http_client
            .post(self.endpoint.messages_url()?)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.endpoint.api_version)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let text = response.text().await.unwrap_or_default();

            return Err(match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(error) => error.into_error(status.as_u16(), retry_after),
                Err(_) => Error::from_status(status.as_u16(), text, retry_after),
            });
        }

        let reply: MessagesResponse = response.json().await.map_err(transport_error)?;
        reply.into_text()
    }
}

/// Maps a transport failure to the variant that carries its class.
fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else if err.is_connect() {
        Error::Connect(err.to_string())
    } else if err.is_decode() {
        Error::InvalidResponse(err.to_string())
    } else {
        Error::Http(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    #[test]
    fn test_client_creation() {
        let client = HttpClient::new(Endpoint::anthropic().unwrap(), "test_key").unwrap();
        assert_eq!(client.endpoint.name, "Anthropic");
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = HttpClient::new(Endpoint::anthropic().unwrap(), "   ");
        assert!(matches!(result, Err(Error::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_not_permanent() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let endpoint = Endpoint::new("Local", "http://127.0.0.1:9/").unwrap();
        let client =
            HttpClient::with_timeout(endpoint, "test_key", Duration::from_secs(2)).unwrap();

        let err = client
            .generate(&ModelProfile::triage_default(), "ping")
            .await
            .unwrap_err();
        assert_ne!(err.class(), ErrorClass::Permanent);
    }
}
