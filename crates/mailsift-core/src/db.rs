//! SQLite database handle shared by the repositories.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::Result;
use crate::analysis::AnalysisRepository;
use crate::email::EmailRepository;

/// Connection pool plus schema setup.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database at the given path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn open(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// Underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Repository for the upstream email projection.
    #[must_use]
    pub fn emails(&self) -> EmailRepository {
        EmailRepository::new(self.pool.clone())
    }

    /// Repository for persisted analyses.
    #[must_use]
    pub fn analyses(&self) -> AnalysisRepository {
        AnalysisRepository::new(self.pool.clone())
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS emails (
                id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                sender TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL DEFAULT '',
                sort_date TEXT NOT NULL DEFAULT '',
                labels TEXT NOT NULL DEFAULT '[]',
                PRIMARY KEY (id, thread_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS email_analysis (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                summary TEXT NOT NULL,
                categories TEXT NOT NULL DEFAULT '[]',
                priority_score INTEGER NOT NULL,
                priority_reason TEXT NOT NULL DEFAULT '',
                action_needed INTEGER NOT NULL DEFAULT 0,
                action_types TEXT NOT NULL DEFAULT '[]',
                action_deadline TEXT,
                key_points TEXT NOT NULL DEFAULT '[]',
                people_mentioned TEXT NOT NULL DEFAULT '[]',
                links_found TEXT NOT NULL DEFAULT '[]',
                links_display TEXT NOT NULL DEFAULT '[]',
                project TEXT,
                topic TEXT,
                sentiment TEXT NOT NULL DEFAULT 'neutral',
                confidence_score REAL NOT NULL,
                raw_response TEXT NOT NULL DEFAULT '',
                analysis_timestamp TEXT NOT NULL,
                UNIQUE(email_id, thread_id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Index for the unanalyzed anti-join
        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_email_analysis_key
            ON email_analysis(email_id, thread_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_emails_sort_date
            ON emails(sort_date)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('emails', 'email_analysis')",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(count, 2);
    }
}
