//! Structured email analysis.
//!
//! Everything the pipeline produces and stores:
//! - [`AnalysisRecord`]: the canonical, validated analysis of one email
//! - [`normalize`]: turns a free-form model reply into an `AnalysisRecord`
//! - [`AnalysisRepository`]: one row per `(email_id, thread_id)`, upserted
//!
//! # Example
//!
//! ```ignore
//! use mailsift_core::analysis::normalize;
//!
//! let record = normalize(&reply_text, &email.body)?;
//! db.analyses().upsert(&email.id, &email.thread_id, &record).await?;
//! ```

pub mod links;
mod model;
mod normalize;
pub mod payload;
mod repository;

pub use model::{
    ASAP, ActionDeadline, AnalysisRecord, PersistedAnalysis, Sentiment, TriageVerdict,
    UpsertOutcome,
};
pub use normalize::{NormalizeError, REQUIRED_FIELDS, clamp_confidence, clamp_priority, normalize};
pub use repository::{AnalysisRepository, AnalysisStats};
