//! The email analysis pipeline.
//!
//! Per email: triage → (skip: minimal record) or (analyze → normalize) →
//! persist. Both inference calls go through [`call_with_retry`].
//!
//! # Example
//!
//! ```ignore
//! use mailsift_core::pipeline::Orchestrator;
//!
//! let emails = db.emails();
//! let analyses = db.analyses();
//! let summary = Orchestrator::new(&client, &emails, &analyses, &config)
//!     .run(config.batch.batch_size)
//!     .await?;
//! println!("processed={} skipped={} failed={}", summary.processed, summary.skipped, summary.failed);
//! ```

pub mod analyzer;
pub mod orchestrator;
pub mod retry;
pub mod triage;

use serde::Serialize;

pub use analyzer::{ANALYSIS_BODY_CHARS, StructuredAnalyzer, build_analysis_prompt};
pub use orchestrator::{AbortReason, ItemFailure, ItemOutcome, Orchestrator, RunSummary};
pub use retry::{CallFailure, RetryPolicy, call_with_retry};
pub use triage::{TRIAGE_BODY_CHARS, TriageClassifier, build_triage_prompt, parse_verdict};

/// Pipeline step an item was in when something happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Go/no-go classification call.
    Triage,
    /// Full analysis call.
    Analyze,
    /// Turning the analysis reply into a record.
    Normalize,
    /// Writing the record.
    Persist,
}

impl Stage {
    /// Convert to a short label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Triage => "triage",
            Self::Analyze => "analyze",
            Self::Normalize => "normalize",
            Self::Persist => "persist",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
