//! Analysis data models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::links;

/// Overall tone of an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Friendly, appreciative, good news.
    Positive,
    /// Complaints, bad news, frustration.
    Negative,
    /// Informational or mixed.
    #[default]
    Neutral,
}

impl Sentiment {
    /// Recognize a sentiment label, ignoring case and surrounding whitespace.
    ///
    /// Returns `None` for anything outside the three known labels.
    #[must_use]
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        Self::from_label(s).unwrap_or_default()
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

/// When the requested action is due.
///
/// Free-form deadlines are never stored: a value is either a calendar date
/// or the `ASAP` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ActionDeadline {
    /// A specific calendar date.
    Date(NaiveDate),
    /// As soon as possible, with no specific date.
    Asap,
}

/// Sentinel text for [`ActionDeadline::Asap`].
pub const ASAP: &str = "ASAP";

impl ActionDeadline {
    /// Canonicalize a deadline string.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, RFC 3339 date-times (truncated to
    /// the date) and urgency words mapped to [`ActionDeadline::Asap`]. Anything
    /// else, including "none" and empty strings, yields `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "asap" | "immediately" | "urgent" | "today" => return Some(Self::Asap),
            "" | "none" | "null" | "n/a" => return None,
            _ => {}
        }

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Some(Self::Date(date));
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y/%m/%d") {
            return Some(Self::Date(date));
        }
        DateTime::parse_from_rfc3339(trimmed)
            .ok()
            .map(|dt| Self::Date(dt.date_naive()))
    }
}

impl std::fmt::Display for ActionDeadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Asap => f.write_str(ASAP),
        }
    }
}

impl From<ActionDeadline> for String {
    fn from(deadline: ActionDeadline) -> Self {
        deadline.to_string()
    }
}

impl TryFrom<String> for ActionDeadline {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("not a deadline: {s}"))
    }
}

/// Outcome of the cheap pre-screening call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageVerdict {
    /// Whether the email warrants full analysis.
    pub needs_analysis: bool,
    /// Short explanation from the classifier.
    pub reason: String,
    /// Rough priority guess in `[1, 5]`.
    pub estimated_priority: u8,
}

impl TriageVerdict {
    /// Reason recorded when the triage reply could not be understood.
    pub const UNPARSEABLE_REASON: &'static str = "triage unparseable";

    /// Verdict used when the triage reply cannot be parsed.
    ///
    /// Errs on the side of running full analysis.
    #[must_use]
    pub fn unparseable() -> Self {
        Self {
            needs_analysis: true,
            reason: Self::UNPARSEABLE_REASON.to_string(),
            estimated_priority: 3,
        }
    }
}

/// Canonical structured analysis of one email.
///
/// Only produced by the normalizer or [`AnalysisRecord::skipped`], so every
/// value satisfies the documented ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// One or two sentence summary.
    pub summary: String,
    /// Free-form category labels.
    pub categories: Vec<String>,
    /// Priority in `[1, 5]`, 5 being most urgent.
    pub priority_score: u8,
    /// Why the priority was chosen.
    pub priority_reason: String,
    /// Whether the recipient must do something.
    pub action_needed: bool,
    /// Kinds of action requested (reply, review, ...).
    pub action_types: Vec<String>,
    /// When the action is due.
    pub action_deadline: Option<ActionDeadline>,
    /// Key points of the email.
    pub key_points: Vec<String>,
    /// People named in the email.
    pub people_mentioned: Vec<String>,
    /// URLs found in the email body.
    pub links_found: Vec<String>,
    /// Display form of each URL in `links_found`.
    pub links_display: Vec<String>,
    /// Related project, if any.
    pub project: Option<String>,
    /// Short topic label, if any.
    pub topic: Option<String>,
    /// Overall tone.
    pub sentiment: Sentiment,
    /// Model confidence in `[0, 1]`.
    pub confidence_score: f64,
    /// Unmodified reply text the record was built from.
    pub raw_response: String,
}

impl AnalysisRecord {
    /// Category assigned to records created on the triage-skip path.
    pub const SKIPPED_CATEGORY: &'static str = "skipped";

    /// Minimal record for an email that triage decided not to analyze.
    #[must_use]
    pub fn skipped(verdict: &TriageVerdict, body: &str, raw_response: impl Into<String>) -> Self {
        let (links_found, links_display) = links::derive_links(body);
        Self {
            summary: verdict.reason.clone(),
            categories: vec![Self::SKIPPED_CATEGORY.to_string()],
            priority_score: verdict.estimated_priority.clamp(1, 5),
            priority_reason: verdict.reason.clone(),
            action_needed: false,
            action_types: Vec::new(),
            action_deadline: None,
            key_points: Vec::new(),
            people_mentioned: Vec::new(),
            links_found,
            links_display,
            project: None,
            topic: None,
            sentiment: Sentiment::Neutral,
            confidence_score: 0.5,
            raw_response: raw_response.into(),
        }
    }

    /// Whether this record came from the triage-skip path.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.categories.len() == 1 && self.categories[0] == Self::SKIPPED_CATEGORY
    }
}

/// A stored analysis, one per `(email_id, thread_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAnalysis {
    /// Email identifier.
    pub email_id: String,
    /// Thread identifier.
    pub thread_id: String,
    /// The analysis itself.
    #[serde(flatten)]
    pub record: AnalysisRecord,
    /// When this analysis was written.
    pub analysis_timestamp: DateTime<Utc>,
}

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed; one was created.
    Inserted,
    /// An existing row was overwritten.
    Replaced,
}
