//! Storage boundaries used by the pipeline.
//!
//! The SQLite repositories implement both traits; tests substitute their own.

use async_trait::async_trait;

use crate::Result;
use crate::analysis::{AnalysisRecord, UpsertOutcome};
use crate::email::UnanalyzedEmail;

/// Source of emails that still need analysis.
#[async_trait]
pub trait MailStore: Send + Sync {
    /// Up to `limit` emails with no stored analysis, in processing order.
    async fn list_unanalyzed(&self, limit: usize) -> Result<Vec<UnanalyzedEmail>>;
}

/// Destination for finished analyses.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Insert or replace the analysis for `(email_id, thread_id)`.
    async fn upsert_analysis(
        &self,
        email_id: &str,
        thread_id: &str,
        record: &AnalysisRecord,
    ) -> Result<UpsertOutcome>;
}
