//! # mailsift-llm
//!
//! Text-generation client for the `MailSift` email analysis pipeline.
//!
//! ## Features
//!
//! - **Model profiles**: Named request settings (model, token budget, temperature)
//! - **Endpoint configuration**: Base URL and API version for a Messages-style API
//! - **HTTP client**: [`HttpClient`] built on `reqwest` with request timeouts
//! - **Failure classification**: Every [`Error`] maps to an [`ErrorClass`] so callers
//!   can tell retryable failures from fatal ones without string matching
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailsift_llm::{Endpoint, HttpClient, InferenceClient, ModelProfile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::new(Endpoint::anthropic()?, "sk-...")?;
//!     let profile = ModelProfile::triage_default();
//!
//!     let text = client.generate(&profile, "Reply with {\"ok\": true}").await?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```
//!
//! ## Error Classes
//!
//! - **Retryable** - timeouts, rate limits (HTTP 429), transient server errors (5xx)
//! - **Fatal** - authentication/authorization failures and lost connectivity
//! - **Permanent** - the request was rejected or the reply could not be decoded

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod client;
pub mod endpoint;
mod error;
pub mod profile;

pub use client::{HttpClient, InferenceClient};
pub use endpoint::Endpoint;
pub use error::{Error, ErrorClass, Result};
pub use profile::ModelProfile;
