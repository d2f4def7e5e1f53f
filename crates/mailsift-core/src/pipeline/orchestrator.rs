//! Batch driver: pulls unanalyzed emails and runs each through the stages.
//!
//! Items are handled strictly one after another. A failure in any stage is
//! logged and counted and the batch moves on, except for fatal inference
//! failures (bad credentials, no connectivity) which end the batch at once.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use mailsift_llm::InferenceClient;

use super::Stage;
use super::analyzer::StructuredAnalyzer;
use super::retry::{CallFailure, call_with_retry};
use super::triage::{TriageClassifier, parse_verdict};
use crate::Result;
use crate::analysis::{AnalysisRecord, NormalizeError, UpsertOutcome, normalize};
use crate::config::AnalyzerConfig;
use crate::email::UnanalyzedEmail;
use crate::store::{AnalysisStore, MailStore};

/// Counts for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Items the batch started on.
    pub attempted: usize,
    /// Items fully analyzed and stored.
    pub processed: usize,
    /// Items triage filed away with a minimal record.
    pub skipped: usize,
    /// Items that failed at some stage and were not stored.
    pub failed: usize,
    /// Rate-limit pauses taken.
    pub pauses: usize,
    /// Set when a fatal failure ended the batch early.
    pub aborted: Option<AbortReason>,
}

impl RunSummary {
    /// Whether the batch ended early.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// Why a batch stopped before its last item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbortReason {
    /// Email being processed when the failure happened.
    pub email_id: String,
    /// Stage that failed.
    pub stage: Stage,
    /// Error text.
    pub message: String,
}

/// Terminal state of one item.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Full analysis stored.
    Processed(UpsertOutcome),
    /// Minimal record stored after triage said no.
    Skipped(UpsertOutcome),
    /// Nothing stored; the email stays unanalyzed.
    Failed(ItemFailure),
}

/// Details of a failed item.
#[derive(Debug)]
pub struct ItemFailure {
    /// Stage that failed.
    pub stage: Stage,
    /// Short error label.
    pub kind: &'static str,
    /// Error text.
    pub message: String,
    /// Model reply involved, if one was received.
    pub raw_response: Option<String>,
    /// Whether the batch must stop.
    pub fatal: bool,
}

impl ItemFailure {
    fn call(stage: Stage, failure: &CallFailure) -> Self {
        Self {
            stage,
            kind: failure.error().kind(),
            message: failure.to_string(),
            raw_response: None,
            fatal: failure.is_fatal(),
        }
    }

    fn normalize(error: &NormalizeError) -> Self {
        Self {
            stage: Stage::Normalize,
            kind: error.kind(),
            message: error.to_string(),
            raw_response: Some(error.raw().to_string()),
            fatal: false,
        }
    }

    fn persist(error: &crate::Error, raw_response: String) -> Self {
        Self {
            stage: Stage::Persist,
            kind: error.kind(),
            message: error.to_string(),
            raw_response: Some(raw_response),
            fatal: false,
        }
    }
}

/// Runs batches of emails through triage, analysis and persistence.
pub struct Orchestrator<'a> {
    client: &'a dyn InferenceClient,
    mail: &'a dyn MailStore,
    store: &'a dyn AnalysisStore,
    config: &'a AnalyzerConfig,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator over the given collaborators.
    #[must_use]
    pub const fn new(
        client: &'a dyn InferenceClient,
        mail: &'a dyn MailStore,
        store: &'a dyn AnalysisStore,
        config: &'a AnalyzerConfig,
    ) -> Self {
        Self {
            client,
            mail,
            store,
            config,
        }
    }

    /// Process up to `batch_size` unanalyzed emails.
    ///
    /// Per-item failures are counted in the summary rather than returned.
    ///
    /// # Errors
    ///
    /// Returns an error only if the list of unanalyzed emails cannot be read.
    pub async fn run(&self, batch_size: usize) -> Result<RunSummary> {
        let emails = self.mail.list_unanalyzed(batch_size).await?;
        let total = emails.len();
        let pause_every = self.config.batch.pause_every;
        let mut summary = RunSummary::default();

        info!(
            total,
            batch_size,
            pause_every,
            "Starting analysis batch"
        );

        for email in &emails {
            summary.attempted += 1;

            match self.process(email).await {
                ItemOutcome::Processed(outcome) => {
                    debug!(email_id = %email.id, ?outcome, "Email analyzed");
                    summary.processed += 1;
                }
                ItemOutcome::Skipped(outcome) => {
                    debug!(email_id = %email.id, ?outcome, "Email skipped by triage");
                    summary.skipped += 1;
                }
                ItemOutcome::Failed(failure) => {
                    summary.failed += 1;
                    if failure.fatal {
                        error!(
                            email_id = %email.id,
                            stage = failure.stage.as_str(),
                            error_kind = failure.kind,
                            error = %failure.message,
                            "Fatal inference failure, aborting batch"
                        );
                        summary.aborted = Some(AbortReason {
                            email_id: email.id.clone(),
                            stage: failure.stage,
                            message: failure.message,
                        });
                        break;
                    }
                    warn!(
                        email_id = %email.id,
                        thread_id = %email.thread_id,
                        stage = failure.stage.as_str(),
                        error_kind = failure.kind,
                        error = %failure.message,
                        raw_response = failure.raw_response.as_deref().unwrap_or(""),
                        "Email analysis failed"
                    );
                }
            }

            if pause_every > 0 && summary.attempted % pause_every == 0 && summary.attempted < total
            {
                summary.pauses += 1;
                info!(
                    attempted = summary.attempted,
                    pause_secs = self.config.batch.pause_duration.as_secs(),
                    "Pausing for rate limit"
                );
                tokio::time::sleep(self.config.batch.pause_duration).await;
            }
        }

        info!(
            attempted = summary.attempted,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            pauses = summary.pauses,
            aborted = summary.is_aborted(),
            "Analysis batch finished"
        );
        Ok(summary)
    }

    /// Run one email through every stage.
    async fn process(&self, email: &UnanalyzedEmail) -> ItemOutcome {
        let policy = &self.config.retry;

        let triage = TriageClassifier::new(self.client, &self.config.triage);
        let triage = &triage;
        let triage_raw =
            match call_with_retry(policy, Stage::Triage.as_str(), move || triage.request(email))
                .await
            {
                Ok(raw) => raw,
                Err(failure) => return ItemOutcome::Failed(ItemFailure::call(Stage::Triage, &failure)),
            };

        let verdict = parse_verdict(&triage_raw);
        debug!(
            email_id = %email.id,
            needs_analysis = verdict.needs_analysis,
            estimated_priority = verdict.estimated_priority,
            reason = %verdict.reason,
            "Triage verdict"
        );

        if !verdict.needs_analysis {
            let record = AnalysisRecord::skipped(&verdict, &email.body, triage_raw);
            return match self.persist(email, &record).await {
                Ok(outcome) => ItemOutcome::Skipped(outcome),
                Err(failure) => ItemOutcome::Failed(failure),
            };
        }

        let analyzer = StructuredAnalyzer::new(self.client, &self.config.analysis);
        let analyzer = &analyzer;
        let analysis_raw =
            match call_with_retry(policy, Stage::Analyze.as_str(), move || analyzer.request(email))
                .await
            {
                Ok(raw) => raw,
                Err(failure) => {
                    return ItemOutcome::Failed(ItemFailure::call(Stage::Analyze, &failure));
                }
            };

        let record = match normalize(&analysis_raw, &email.body) {
            Ok(record) => record,
            Err(e) => return ItemOutcome::Failed(ItemFailure::normalize(&e)),
        };

        match self.persist(email, &record).await {
            Ok(outcome) => ItemOutcome::Processed(outcome),
            Err(failure) => ItemOutcome::Failed(failure),
        }
    }

    async fn persist(
        &self,
        email: &UnanalyzedEmail,
        record: &AnalysisRecord,
    ) -> std::result::Result<UpsertOutcome, ItemFailure> {
        self.store
            .upsert_analysis(&email.id, &email.thread_id, record)
            .await
            .map_err(|e| ItemFailure::persist(&e, record.raw_response.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mailsift_llm::ModelProfile;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedMail(Vec<UnanalyzedEmail>);

    #[async_trait]
    impl MailStore for FixedMail {
        async fn list_unanalyzed(&self, limit: usize) -> Result<Vec<UnanalyzedEmail>> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    #[derive(Default)]
    struct MemoryStore(Mutex<Vec<(String, AnalysisRecord)>>);

    #[async_trait]
    impl AnalysisStore for MemoryStore {
        async fn upsert_analysis(
            &self,
            email_id: &str,
            _thread_id: &str,
            record: &AnalysisRecord,
        ) -> Result<UpsertOutcome> {
            self.0
                .lock()
                .unwrap()
                .push((email_id.to_string(), record.clone()));
            Ok(UpsertOutcome::Inserted)
        }
    }

    /// Triage always says "skip".
    struct SkipEverything;

    #[async_trait]
    impl InferenceClient for SkipEverything {
        async fn generate(&self, _: &ModelProfile, _: &str) -> mailsift_llm::Result<String> {
            Ok(r#"{"needs_analysis": false, "reason": "bulk mail", "estimated_priority": 1}"#
                .to_string())
        }
    }

    fn emails(n: usize) -> Vec<UnanalyzedEmail> {
        (0..n)
            .map(|i| UnanalyzedEmail::new(format!("m{i}"), format!("t{i}")))
            .collect()
    }

    fn config(pause_every: usize) -> AnalyzerConfig {
        let mut config = AnalyzerConfig::default();
        config.batch.pause_every = pause_every;
        config.batch.pause_duration = Duration::from_secs(60);
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pause_after_last_item() {
        let mail = FixedMail(emails(20));
        let store = MemoryStore::default();
        let config = config(10);

        let start = tokio::time::Instant::now();
        let summary = Orchestrator::new(&SkipEverything, &mail, &store, &config)
            .run(20)
            .await
            .unwrap();

        assert_eq!(summary.attempted, 20);
        assert_eq!(summary.skipped, 20);
        assert_eq!(summary.pauses, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pausing_disabled() {
        let mail = FixedMail(emails(5));
        let store = MemoryStore::default();
        let config = config(0);

        let summary = Orchestrator::new(&SkipEverything, &mail, &store, &config)
            .run(5)
            .await
            .unwrap();

        assert_eq!(summary.pauses, 0);
        assert_eq!(summary.skipped, 5);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let mail = FixedMail(Vec::new());
        let store = MemoryStore::default();
        let config = config(10);

        let summary = Orchestrator::new(&SkipEverything, &mail, &store, &config)
            .run(10)
            .await
            .unwrap();

        assert_eq!(summary, RunSummary::default());
    }

    #[tokio::test]
    async fn test_batch_size_limits_pull() {
        let mail = FixedMail(emails(8));
        let store = MemoryStore::default();
        let config = config(10);

        let summary = Orchestrator::new(&SkipEverything, &mail, &store, &config)
            .run(3)
            .await
            .unwrap();

        assert_eq!(summary.attempted, 3);
        let stored = store.0.into_inner().unwrap();
        let ids: Vec<&str> = stored.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2"]);
        assert!(stored[0].1.is_skipped());
        assert_eq!(stored[0].1.summary, "bulk mail");
    }
}
