//! Email projection storage.
//!
//! The `emails` table is filled by the upstream fetcher; this repository
//! reads it and offers a save method for that fetcher (and for tests).

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::UnanalyzedEmail;
use crate::Result;
use crate::store::MailStore;

/// Repository for stored emails.
#[derive(Debug, Clone)]
pub struct EmailRepository {
    pool: SqlitePool,
}

impl EmailRepository {
    /// Create a repository over an initialized pool.
    ///
    /// Use [`crate::Database`] to obtain one.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store an email, replacing any previous copy with the same identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn save(&self, email: &UnanalyzedEmail) -> Result<()> {
        let labels = serde_json::to_string(&email.labels)?;

        sqlx::query(
            r"
            INSERT INTO emails (id, thread_id, subject, body, sender, date, sort_date, labels)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id, thread_id) DO UPDATE SET
                subject = excluded.subject,
                body = excluded.body,
                sender = excluded.sender,
                date = excluded.date,
                sort_date = excluded.sort_date,
                labels = excluded.labels
            ",
        )
        .bind(&email.id)
        .bind(&email.thread_id)
        .bind(&email.subject)
        .bind(&email.body)
        .bind(&email.sender)
        .bind(&email.date)
        .bind(email.sort_key())
        .bind(labels)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Emails with no analysis row, newest first, at most `limit`.
    ///
    /// Ordering uses the normalized date written by [`Self::save`]; emails
    /// with an unrecognized date come last.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or a label list is corrupt.
    pub async fn list_unanalyzed(&self, limit: usize) -> Result<Vec<UnanalyzedEmail>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query(
            r"
            SELECT e.id, e.thread_id, e.subject, e.body, e.sender, e.date, e.labels
            FROM emails e
            LEFT JOIN email_analysis a
                ON a.email_id = e.id AND a.thread_id = e.thread_id
            WHERE a.email_id IS NULL
            ORDER BY e.sort_date DESC, e.id ASC
            LIMIT ?
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_email).collect()
    }

    /// Number of emails with no analysis row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub async fn count_unanalyzed(&self) -> Result<u64> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as count
            FROM emails e
            LEFT JOIN email_analysis a
                ON a.email_id = e.id AND a.thread_id = e.thread_id
            WHERE a.email_id IS NULL
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("count") as u64)
    }
}

#[async_trait]
impl MailStore for EmailRepository {
    async fn list_unanalyzed(&self, limit: usize) -> Result<Vec<UnanalyzedEmail>> {
        Self::list_unanalyzed(self, limit).await
    }
}

/// Convert a database row to an `UnanalyzedEmail`.
fn row_to_email(row: &SqliteRow) -> Result<UnanalyzedEmail> {
    let labels: String = row.get("labels");
    Ok(UnanalyzedEmail {
        id: row.get("id"),
        thread_id: row.get("thread_id"),
        subject: row.get("subject"),
        body: row.get("body"),
        sender: row.get("sender"),
        date: row.get("date"),
        labels: serde_json::from_str(&labels)?,
    })
}
