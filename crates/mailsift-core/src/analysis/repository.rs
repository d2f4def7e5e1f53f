//! Analysis persistence.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::debug;

use super::model::{ActionDeadline, AnalysisRecord, PersistedAnalysis, Sentiment, UpsertOutcome};
use crate::store::AnalysisStore;
use crate::{Error, Result};

const SELECT_COLUMNS: &str = r"
    SELECT email_id, thread_id, summary, categories, priority_score, priority_reason,
           action_needed, action_types, action_deadline, key_points, people_mentioned,
           links_found, links_display, project, topic, sentiment, confidence_score,
           raw_response, analysis_timestamp
    FROM email_analysis
";

/// Repository for persisted analyses.
///
/// Holds at most one row per `(email_id, thread_id)`.
#[derive(Debug, Clone)]
pub struct AnalysisRepository {
    pool: SqlitePool,
}

impl AnalysisRepository {
    /// Create a repository over an initialized pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the analysis for an email.
    ///
    /// The lookup and the write run in one transaction. Every column is
    /// overwritten on replace and `analysis_timestamp` is set to now.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn upsert(
        &self,
        email_id: &str,
        thread_id: &str,
        record: &AnalysisRecord,
    ) -> Result<UpsertOutcome> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let categories = serde_json::to_string(&record.categories)?;
        let action_types = serde_json::to_string(&record.action_types)?;
        let key_points = serde_json::to_string(&record.key_points)?;
        let people = serde_json::to_string(&record.people_mentioned)?;
        let links_found = serde_json::to_string(&record.links_found)?;
        let links_display = serde_json::to_string(&record.links_display)?;
        let deadline = record.action_deadline.map(|d| d.to_string());

        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM email_analysis WHERE email_id = ? AND thread_id = ?",
        )
        .bind(email_id)
        .bind(thread_id)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = if let Some(id) = existing {
            sqlx::query(
                r"
                UPDATE email_analysis
                SET summary = ?, categories = ?, priority_score = ?, priority_reason = ?,
                    action_needed = ?, action_types = ?, action_deadline = ?,
                    key_points = ?, people_mentioned = ?, links_found = ?,
                    links_display = ?, project = ?, topic = ?, sentiment = ?,
                    confidence_score = ?, raw_response = ?, analysis_timestamp = ?
                WHERE id = ?
                ",
            )
            .bind(&record.summary)
            .bind(&categories)
            .bind(i64::from(record.priority_score))
            .bind(&record.priority_reason)
            .bind(record.action_needed)
            .bind(&action_types)
            .bind(&deadline)
            .bind(&key_points)
            .bind(&people)
            .bind(&links_found)
            .bind(&links_display)
            .bind(&record.project)
            .bind(&record.topic)
            .bind(record.sentiment.as_str())
            .bind(record.confidence_score)
            .bind(&record.raw_response)
            .bind(&timestamp)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            UpsertOutcome::Replaced
        } else {
            sqlx::query(
                r"
                INSERT INTO email_analysis (
                    email_id, thread_id, summary, categories, priority_score,
                    priority_reason, action_needed, action_types, action_deadline,
                    key_points, people_mentioned, links_found, links_display,
                    project, topic, sentiment, confidence_score, raw_response,
                    analysis_timestamp
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(email_id)
            .bind(thread_id)
            .bind(&record.summary)
            .bind(&categories)
            .bind(i64::from(record.priority_score))
            .bind(&record.priority_reason)
            .bind(record.action_needed)
            .bind(&action_types)
            .bind(&deadline)
            .bind(&key_points)
            .bind(&people)
            .bind(&links_found)
            .bind(&links_display)
            .bind(&record.project)
            .bind(&record.topic)
            .bind(record.sentiment.as_str())
            .bind(record.confidence_score)
            .bind(&record.raw_response)
            .bind(&timestamp)
            .execute(&mut *tx)
            .await?;
            UpsertOutcome::Inserted
        };

        tx.commit().await?;

        debug!(email_id, thread_id, ?outcome, "Stored analysis");
        Ok(outcome)
    }

    /// Get the analysis for one email in one thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the row is corrupt.
    pub async fn get(&self, email_id: &str, thread_id: &str) -> Result<Option<PersistedAnalysis>> {
        let sql = format!("{SELECT_COLUMNS} WHERE email_id = ? AND thread_id = ?");
        let row = sqlx::query(&sql)
            .bind(email_id)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_analysis).transpose()
    }

    /// All analyses stored for an email id, across threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or a row is corrupt.
    pub async fn list_for_email(&self, email_id: &str) -> Result<Vec<PersistedAnalysis>> {
        let sql = format!("{SELECT_COLUMNS} WHERE email_id = ? ORDER BY thread_id ASC");
        let rows = sqlx::query(&sql)
            .bind(email_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_analysis).collect()
    }

    /// Aggregate counts over all stored analyses.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub async fn stats(&self) -> Result<AnalysisStats> {
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) as total,
                COALESCE(SUM(CASE WHEN action_needed = 1 THEN 1 ELSE 0 END), 0) as action_needed,
                COALESCE(SUM(CASE WHEN priority_score >= 4 THEN 1 ELSE 0 END), 0) as high_priority,
                COALESCE(SUM(CASE WHEN sentiment = 'positive' THEN 1 ELSE 0 END), 0) as positive,
                COALESCE(SUM(CASE WHEN sentiment = 'negative' THEN 1 ELSE 0 END), 0) as negative,
                COALESCE(SUM(CASE WHEN sentiment = 'neutral' THEN 1 ELSE 0 END), 0) as neutral,
                AVG(confidence_score) as average_confidence
            FROM email_analysis
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AnalysisStats {
            total: row.get::<i64, _>("total") as u32,
            action_needed: row.get::<i64, _>("action_needed") as u32,
            high_priority: row.get::<i64, _>("high_priority") as u32,
            positive: row.get::<i64, _>("positive") as u32,
            negative: row.get::<i64, _>("negative") as u32,
            neutral: row.get::<i64, _>("neutral") as u32,
            average_confidence: row.get::<Option<f64>, _>("average_confidence"),
        })
    }
}

#[async_trait]
impl AnalysisStore for AnalysisRepository {
    async fn upsert_analysis(
        &self,
        email_id: &str,
        thread_id: &str,
        record: &AnalysisRecord,
    ) -> Result<UpsertOutcome> {
        self.upsert(email_id, thread_id, record).await
    }
}

/// Statistics about stored analyses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisStats {
    /// Number of analyzed emails.
    pub total: u32,
    /// Emails that need an action.
    pub action_needed: u32,
    /// Emails with priority 4 or 5.
    pub high_priority: u32,
    /// Emails with positive sentiment.
    pub positive: u32,
    /// Emails with negative sentiment.
    pub negative: u32,
    /// Emails with neutral sentiment.
    pub neutral: u32,
    /// Mean confidence, `None` when nothing is stored.
    pub average_confidence: Option<f64>,
}

fn json_list(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let text: String = row.get(column);
    Ok(serde_json::from_str(&text)?)
}

/// Convert a database row to a `PersistedAnalysis`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_to_analysis(row: &SqliteRow) -> Result<PersistedAnalysis> {
    let timestamp: String = row.get("analysis_timestamp");
    let analysis_timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| Error::InvalidData(format!("analysis_timestamp {timestamp:?}: {e}")))?
        .with_timezone(&Utc);
    let deadline: Option<String> = row.get("action_deadline");
    let sentiment: String = row.get("sentiment");

    let record = AnalysisRecord {
        summary: row.get("summary"),
        categories: json_list(row, "categories")?,
        priority_score: row.get::<i64, _>("priority_score").clamp(1, 5) as u8,
        priority_reason: row.get("priority_reason"),
        action_needed: row.get("action_needed"),
        action_types: json_list(row, "action_types")?,
        action_deadline: deadline.as_deref().and_then(ActionDeadline::parse),
        key_points: json_list(row, "key_points")?,
        people_mentioned: json_list(row, "people_mentioned")?,
        links_found: json_list(row, "links_found")?,
        links_display: json_list(row, "links_display")?,
        project: row.get("project"),
        topic: row.get("topic"),
        sentiment: Sentiment::parse(&sentiment),
        confidence_score: row.get("confidence_score"),
        raw_response: row.get("raw_response"),
    };

    Ok(PersistedAnalysis {
        email_id: row.get("email_id"),
        thread_id: row.get("thread_id"),
        record,
        analysis_timestamp,
    })
}
