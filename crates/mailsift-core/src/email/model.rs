//! Email projection model.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Read-only view of an email that has not been analyzed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnanalyzedEmail {
    /// Provider message identifier.
    pub id: String,
    /// Provider thread identifier.
    pub thread_id: String,
    /// Message subject.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// Sender address (with display name, if known).
    pub sender: String,
    /// Message date as stored by the mail store.
    ///
    /// RFC 3339, RFC 2822 and bare `YYYY-MM-DD` values are understood when
    /// ordering; see [`UnanalyzedEmail::sort_key`].
    pub date: String,
    /// Provider labels.
    pub labels: Vec<String>,
}

impl UnanalyzedEmail {
    /// Creates an email with the given identifiers and empty content.
    #[must_use]
    pub fn new(id: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            subject: String::new(),
            body: String::new(),
            sender: String::new(),
            date: String::new(),
            labels: Vec::new(),
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the sender.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Sets the date.
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Sets the labels.
    #[must_use]
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// The date as a UTC RFC 3339 string, so that text order is time order.
    ///
    /// Returns an empty string when the date is not recognized, which sorts
    /// such emails after all dated ones in a newest-first listing.
    #[must_use]
    pub fn sort_key(&self) -> String {
        let date = self.date.trim();
        DateTime::parse_from_rfc3339(date)
            .or_else(|_| DateTime::parse_from_rfc2822(date))
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            })
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    }

    /// The first `max_chars` characters of the body.
    #[must_use]
    pub fn body_prefix(&self, max_chars: usize) -> &str {
        match self.body.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.body[..idx],
            None => &self.body,
        }
    }
}
