//! # mailsift-core
//!
//! Email analysis pipeline for `MailSift`.
//!
//! This crate provides:
//! - **Triage** - a cheap go/no-go call that files bulk mail without full analysis
//! - **Structured analysis** - summary, priority, actions, deadline, sentiment
//! - **Response normalization** - turns free-form model replies into validated records
//! - **Retry and rate limiting** - bounded backoff per call, pauses between sub-batches
//! - **Local storage** (`SQLite`) - the unanalyzed email projection and one analysis per email
//! - **Configuration and credentials** - JSON config file, API key in the system keyring

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod analysis;
pub mod config;
pub mod credentials;
mod db;
pub mod email;
mod error;
pub mod pipeline;
pub mod store;

pub use analysis::{
    ActionDeadline, AnalysisRecord, AnalysisRepository, AnalysisStats, NormalizeError,
    PersistedAnalysis, Sentiment, TriageVerdict, UpsertOutcome, normalize,
};
pub use config::{AnalyzerConfig, BatchSettings, InferenceSettings};
pub use credentials::{CredentialError, CredentialResult};
pub use db::Database;
pub use email::{EmailRepository, UnanalyzedEmail};
pub use error::{Error, Result};
pub use pipeline::{CallFailure, Orchestrator, RetryPolicy, RunSummary, Stage};
pub use store::{AnalysisStore, MailStore};
