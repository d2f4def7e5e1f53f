//! End-to-end pipeline tests with scripted inference clients.
//!
//! Timing-sensitive tests use in-memory stores and a paused tokio clock;
//! the rest run against an in-memory `SQLite` database.

#![allow(clippy::unwrap_used, missing_docs)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mailsift_core::pipeline::Orchestrator;
use mailsift_core::{
    AnalysisRecord, AnalysisStore, AnalyzerConfig, Database, Error, MailStore, Result, Stage,
    UnanalyzedEmail, UpsertOutcome,
};
use mailsift_llm::{Error as InferenceError, InferenceClient, ModelProfile};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Triage,
    Analysis,
}

#[derive(Debug, Clone)]
struct Request {
    call: Call,
    subject: String,
    /// Earlier calls of the same kind for the same subject.
    nth: usize,
    at: Duration,
}

type Responder = Box<dyn Fn(&Request) -> mailsift_llm::Result<String> + Send + Sync>;

/// Inference client whose replies are computed from the call kind and subject.
struct ScriptedClient {
    responder: Responder,
    calls: Mutex<Vec<Request>>,
    start: Instant,
}

impl ScriptedClient {
    fn new(responder: impl Fn(&Request) -> mailsift_llm::Result<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            start: Instant::now(),
        }
    }

    fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    fn subjects_seen(&self) -> Vec<String> {
        let mut subjects: Vec<String> = Vec::new();
        for request in self.calls() {
            if !subjects.contains(&request.subject) {
                subjects.push(request.subject);
            }
        }
        subjects
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn generate(&self, _profile: &ModelProfile, prompt: &str) -> mailsift_llm::Result<String> {
        let call = if prompt.contains("needs_analysis") {
            Call::Triage
        } else {
            Call::Analysis
        };
        let subject = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Subject: "))
            .unwrap_or_default()
            .to_string();

        let request = {
            let mut calls = self.calls.lock().unwrap();
            let nth = calls
                .iter()
                .filter(|r| r.call == call && r.subject == subject)
                .count();
            let request = Request {
                call,
                subject,
                nth,
                at: self.start.elapsed(),
            };
            calls.push(request.clone());
            request
        };

        (self.responder)(&request)
    }
}

struct MemoryMail(Vec<UnanalyzedEmail>);

#[async_trait]
impl MailStore for MemoryMail {
    async fn list_unanalyzed(&self, limit: usize) -> Result<Vec<UnanalyzedEmail>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
}

#[derive(Default)]
struct MemoryStore(Mutex<Vec<(String, AnalysisRecord)>>);

impl MemoryStore {
    fn ids(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }
}

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

/// Store that rejects writes for one email id.
struct RejectingStore {
    reject: &'static str,
    inner: MemoryStore,
}

#[async_trait]
impl AnalysisStore for RejectingStore {
    async fn upsert_analysis(
        &self,
        email_id: &str,
        thread_id: &str,
        record: &AnalysisRecord,
    ) -> Result<UpsertOutcome> {
        if email_id == self.reject {
            return Err(Error::InvalidData("disk full".to_string()));
        }
        self.inner.upsert_analysis(email_id, thread_id, record).await
    }
}

fn analyze_me() -> mailsift_llm::Result<String> {
    Ok(r#"{"needs_analysis": true, "reason": "personal", "estimated_priority": 3}"#.to_string())
}

fn good_analysis(subject: &str) -> mailsift_llm::Result<String> {
    Ok(format!(
        "Here is the analysis:\n```json\n{{\
            \"summary\": \"About {subject}\", \
            \"categories\": \"work\", \
            \"priority_score\": 4, \
            \"action_needed\": \"true\", \
            \"action_deadline\": \"2025-07-01\", \
            \"sentiment\": \"Positive\", \
            \"confidence_score\": 0.9, \
            \"links_found\": [\"https://invented.example.com\"]\
        }}\n```"
    ))
}

/// Emails `m01..=mNN`, newest first, so storage order matches the index.
fn numbered_emails(n: usize) -> Vec<UnanalyzedEmail> {
    (1..=n)
        .map(|i| {
            UnanalyzedEmail::new(format!("m{i:02}"), format!("t{i:02}"))
                .with_subject(format!("Email {i:02}"))
                .with_sender("someone@example.com")
                .with_date(format!("2025-01-{:02}", 31 - i))
                .with_body(format!("Details at https://example.com/item/{i}"))
        })
        .collect()
}

fn config(pause_every: usize, pause: Duration) -> AnalyzerConfig {
    let mut config = AnalyzerConfig::default();
    config.batch.pause_every = pause_every;
    config.batch.pause_duration = pause;
    config.retry.base_delay = Duration::from_secs(2);
    config
}

async fn seeded_database(emails: &[UnanalyzedEmail]) -> Database {
    let db = Database::in_memory().await.unwrap();
    let repo = db.emails();
    for email in emails {
        repo.save(email).await.unwrap();
    }
    db
}

#[tokio::test(start_paused = true)]
async fn rate_limited_triage_is_retried_with_backoff() {
    let client = ScriptedClient::new(|request| match request.call {
        Call::Triage if request.nth < 2 => Err(InferenceError::RateLimited {
            retry_after: None,
            message: "slow down".to_string(),
        }),
        Call::Triage => analyze_me(),
        Call::Analysis => good_analysis(&request.subject),
    });
    let mail = MemoryMail(numbered_emails(1));
    let store = MemoryStore::default();
    let config = config(10, Duration::from_secs(60));

    let summary = Orchestrator::new(&client, &mail, &store, &config)
        .run(10)
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);

    let triage_times: Vec<Duration> = client
        .calls()
        .iter()
        .filter(|r| r.call == Call::Triage)
        .map(|r| r.at)
        .collect();
    assert_eq!(
        triage_times,
        vec![Duration::ZERO, Duration::from_secs(2), Duration::from_secs(6)]
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fail_the_item_only() {
    let client = ScriptedClient::new(|request| match request.call {
        Call::Triage => analyze_me(),
        Call::Analysis if request.subject == "Email 01" => Err(InferenceError::Server {
            status: 529,
            message: "overloaded".to_string(),
        }),
        Call::Analysis => good_analysis(&request.subject),
    });
    let mail = MemoryMail(numbered_emails(3));
    let store = MemoryStore::default();
    let config = config(0, Duration::ZERO);

    let summary = Orchestrator::new(&client, &mail, &store, &config)
        .run(10)
        .await
        .unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_aborted());
    assert_eq!(store.ids(), vec!["m02", "m03"]);

    let analysis_calls_for_first = client
        .calls()
        .iter()
        .filter(|r| r.call == Call::Analysis && r.subject == "Email 01")
        .count();
    assert_eq!(analysis_calls_for_first, 3);
}

#[tokio::test(start_paused = true)]
async fn batch_of_25_with_three_normalization_failures() {
    let broken = ["Email 03", "Email 11", "Email 19"];
    let client = ScriptedClient::new(move |request| match request.call {
        Call::Triage => analyze_me(),
        Call::Analysis if broken.contains(&request.subject.as_str()) => {
            Ok("I'm sorry, I can't summarize this one.".to_string())
        }
        Call::Analysis => good_analysis(&request.subject),
    });
    let mail = MemoryMail(numbered_emails(25));
    let store = MemoryStore::default();
    let config = config(10, Duration::from_secs(60));

    let start = Instant::now();
    let summary = Orchestrator::new(&client, &mail, &store, &config)
        .run(25)
        .await
        .unwrap();

    assert_eq!(summary.attempted, 25);
    assert_eq!(summary.processed, 22);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.pauses, 2);
    assert!(summary.aborted.is_none());
    assert_eq!(start.elapsed(), Duration::from_secs(120));

    let ids = store.ids();
    assert_eq!(ids.len(), 22);
    assert!(!ids.contains(&"m03".to_string()));
}

#[tokio::test]
async fn fatal_error_on_fifth_item_aborts_batch() {
    let emails = numbered_emails(10);
    let db = seeded_database(&emails).await;
    let client = ScriptedClient::new(|request| match request.call {
        Call::Triage if request.subject == "Email 05" => Err(InferenceError::Auth {
            status: 401,
            message: "invalid x-api-key".to_string(),
        }),
        Call::Triage => analyze_me(),
        Call::Analysis => good_analysis(&request.subject),
    });
    let mail = db.emails();
    let analyses = db.analyses();
    let config = config(0, Duration::ZERO);

    let summary = Orchestrator::new(&client, &mail, &analyses, &config)
        .run(10)
        .await
        .unwrap();

    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.failed, 1);
    let aborted = summary.aborted.unwrap();
    assert_eq!(aborted.email_id, "m05");
    assert_eq!(aborted.stage, Stage::Triage);

    for email in &emails[..4] {
        assert!(analyses.get(&email.id, &email.thread_id).await.unwrap().is_some());
    }
    for email in &emails[4..] {
        assert!(analyses.get(&email.id, &email.thread_id).await.unwrap().is_none());
    }

    let seen = client.subjects_seen();
    assert_eq!(seen.last().unwrap(), "Email 05");
    assert!(!seen.contains(&"Email 06".to_string()));
    assert_eq!(mail.count_unanalyzed().await.unwrap(), 6);
}

#[tokio::test]
async fn triage_skip_stores_minimal_record() {
    let emails = numbered_emails(1);
    let db = seeded_database(&emails).await;
    let triage_reply = r#"{"needs_analysis": false, "reason": "Automated receipt", "estimated_priority": 2}"#;
    let client = ScriptedClient::new(move |request| match request.call {
        Call::Triage => Ok(triage_reply.to_string()),
        Call::Analysis => panic!("analysis must not run for skipped emails"),
    });
    let mail = db.emails();
    let analyses = db.analyses();
    let config = config(0, Duration::ZERO);

    let summary = Orchestrator::new(&client, &mail, &analyses, &config)
        .run(5)
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.processed, 0);

    let stored = analyses.get("m01", "t01").await.unwrap().unwrap();
    let record = stored.record;
    assert!(record.is_skipped());
    assert_eq!(record.summary, "Automated receipt");
    assert_eq!(record.priority_score, 2);
    assert!((record.confidence_score - 0.5).abs() < f64::EPSILON);
    assert_eq!(record.links_found, vec!["https://example.com/item/1"]);
    assert_eq!(record.raw_response, triage_reply);
}

#[tokio::test]
async fn full_analysis_is_normalized_before_storage() {
    let emails = numbered_emails(1);
    let db = seeded_database(&emails).await;
    let client = ScriptedClient::new(|request| match request.call {
        Call::Triage => Ok("not even json".to_string()),
        Call::Analysis => good_analysis(&request.subject),
    });
    let mail = db.emails();
    let analyses = db.analyses();
    let config = config(0, Duration::ZERO);

    let summary = Orchestrator::new(&client, &mail, &analyses, &config)
        .run(5)
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);

    let record = analyses.get("m01", "t01").await.unwrap().unwrap().record;
    assert_eq!(record.summary, "About Email 01");
    assert_eq!(record.categories, vec!["work"]);
    assert!(record.action_needed);
    assert_eq!(record.sentiment, mailsift_core::Sentiment::Positive);
    assert_eq!(record.links_found, vec!["https://example.com/item/1"]);
    assert!(record.action_deadline.is_some());
}

#[tokio::test]
async fn failed_items_are_picked_up_by_the_next_run() {
    let emails = numbered_emails(3);
    let db = seeded_database(&emails).await;
    let mail = db.emails();
    let analyses = db.analyses();
    let config = config(0, Duration::ZERO);

    let flaky = ScriptedClient::new(|request| match request.call {
        Call::Triage => analyze_me(),
        Call::Analysis if request.subject == "Email 02" => Ok("{\"summary\": \"partial\"}".to_string()),
        Call::Analysis => good_analysis(&request.subject),
    });
    let first = Orchestrator::new(&flaky, &mail, &analyses, &config)
        .run(10)
        .await
        .unwrap();
    assert_eq!(first.processed, 2);
    assert_eq!(first.failed, 1);
    assert_eq!(mail.count_unanalyzed().await.unwrap(), 1);

    let healthy = ScriptedClient::new(|request| match request.call {
        Call::Triage => analyze_me(),
        Call::Analysis => good_analysis(&request.subject),
    });
    let second = Orchestrator::new(&healthy, &mail, &analyses, &config)
        .run(10)
        .await
        .unwrap();
    assert_eq!(second.attempted, 1);
    assert_eq!(second.processed, 1);
    assert_eq!(healthy.subjects_seen(), vec!["Email 02"]);

    let third = Orchestrator::new(&healthy, &mail, &analyses, &config)
        .run(10)
        .await
        .unwrap();
    assert_eq!(third.attempted, 0);

    let stats = analyses.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.positive, 3);
}

#[tokio::test]
async fn storage_failure_fails_only_that_item() {
    let client = ScriptedClient::new(|request| match request.call {
        Call::Triage => analyze_me(),
        Call::Analysis => good_analysis(&request.subject),
    });
    let mail = MemoryMail(numbered_emails(3));
    let store = RejectingStore {
        reject: "m02",
        inner: MemoryStore::default(),
    };
    let config = config(0, Duration::ZERO);

    let summary = Orchestrator::new(&client, &mail, &store, &config)
        .run(10)
        .await
        .unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 1);
    assert!(!summary.is_aborted());
    assert_eq!(store.inner.ids(), vec!["m01", "m03"]);
    assert_eq!(client.subjects_seen(), vec!["Email 01", "Email 02", "Email 03"]);
}
