//! Conversion of a free-form model reply into a validated [`AnalysisRecord`].
//!
//! This is the only place untyped model output enters the system. The steps:
//!
//! 1. Strip whitespace and fenced-code markers.
//! 2. Slice from the first `{` to the last `}`.
//! 3. Parse as a JSON object.
//! 4. Check required fields in a fixed order.
//! 5. Coerce types (scalar to list, `"true"` to `true`, numeric strings).
//! 6. Clamp `priority_score` to `[1, 5]` and `confidence_score` to `[0, 1]`.
//! 7. Canonicalize `sentiment`.
//! 8. Re-derive links from the email body.

use serde_json::{Map, Value};
use tracing::debug;

use super::links;
use super::model::{ActionDeadline, AnalysisRecord, Sentiment};
use super::payload;

/// Fields that must be present (and non-null), in check order.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "summary",
    "categories",
    "priority_score",
    "action_needed",
    "sentiment",
    "confidence_score",
];

/// Why a model reply could not be turned into a record.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// No `{ ... }` span was found.
    #[error("no JSON object found in response")]
    Extraction {
        /// The reply as received.
        raw: String,
    },

    /// The candidate span is not valid JSON.
    #[error("response is not valid JSON: {source}")]
    Parse {
        /// Parser error.
        source: serde_json::Error,
        /// The reply as received.
        raw: String,
    },

    /// A field is missing or has an unusable value.
    #[error("invalid field `{field}`: {reason}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
        /// The reply as received.
        raw: String,
    },
}

impl NormalizeError {
    /// The reply text that failed to normalize.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Extraction { raw } | Self::Parse { raw, .. } | Self::Validation { raw, .. } => {
                raw
            }
        }
    }

    /// Short, stable name of the failure for structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Extraction { .. } => "extraction",
            Self::Parse { .. } => "parse",
            Self::Validation { .. } => "validation",
        }
    }

    /// Field named by a validation failure.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }
}

/// Normalize a full-analysis reply for an email with the given body.
///
/// # Errors
///
/// Returns a [`NormalizeError`] describing the first problem found.
pub fn normalize(raw: &str, email_body: &str) -> Result<AnalysisRecord, NormalizeError> {
    let object = payload::parse_object(raw)?;
    let fields = Fields { object: &object, raw };

    for field in REQUIRED_FIELDS {
        if fields.get(field).is_none() {
            return Err(fields.invalid(field, "missing required field"));
        }
    }

    let priority = fields.number("priority_score")?;
    let confidence = fields.number("confidence_score")?;
    let action_needed = fields.boolean("action_needed")?;
    let sentiment = fields.sentiment();
    let (links_found, links_display) = links::derive_links(email_body);

    Ok(AnalysisRecord {
        summary: fields.text("summary"),
        categories: fields.list("categories"),
        priority_score: clamp_priority(priority),
        priority_reason: fields.text("priority_reason"),
        action_needed,
        action_types: fields.list("action_types"),
        action_deadline: fields.deadline(),
        key_points: fields.list("key_points"),
        people_mentioned: fields.list("people_mentioned"),
        links_found,
        links_display,
        project: fields.optional_text("project"),
        topic: fields.optional_text("topic"),
        sentiment,
        confidence_score: clamp_confidence(confidence),
        raw_response: raw.to_string(),
    })
}

/// Round and clamp a priority to `[1, 5]`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_priority(value: f64) -> u8 {
    value.round().clamp(1.0, 5.0) as u8
}

/// Clamp a confidence to `[0, 1]`.
#[must_use]
pub fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Typed accessors over the parsed reply.
struct Fields<'a> {
    object: &'a Map<String, Value>,
    raw: &'a str,
}

impl Fields<'_> {
    /// Field value, treating JSON `null` as absent.
    fn get(&self, field: &str) -> Option<&Value> {
        self.object.get(field).filter(|v| !v.is_null())
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> NormalizeError {
        NormalizeError::Validation {
            field,
            reason: reason.into(),
            raw: self.raw.to_string(),
        }
    }

    fn text(&self, field: &str) -> String {
        match self.get(field) {
            None => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => other.to_string(),
        }
    }

    fn optional_text(&self, field: &str) -> Option<String> {
        let text = self.text(field);
        if text.is_empty() || text.eq_ignore_ascii_case("none") || text.eq_ignore_ascii_case("null")
        {
            None
        } else {
            Some(text)
        }
    }

    fn list(&self, field: &str) -> Vec<String> {
        match self.get(field) {
            None => Vec::new(),
            Some(Value::Array(items)) => items.iter().filter_map(list_item).collect(),
            Some(scalar) => list_item(scalar).into_iter().collect(),
        }
    }

    fn number(&self, field: &'static str) -> Result<f64, NormalizeError> {
        let value = match self.get(field) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.invalid(field, "expected a number"))
    }

    fn boolean(&self, field: &'static str) -> Result<bool, NormalizeError> {
        match self.get(field) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(self.invalid(field, format!("expected a boolean, got {s:?}"))),
            },
            Some(Value::Number(n)) if n.as_u64() == Some(0) => Ok(false),
            Some(Value::Number(n)) if n.as_u64() == Some(1) => Ok(true),
            _ => Err(self.invalid(field, "expected a boolean")),
        }
    }

    fn sentiment(&self) -> Sentiment {
        let label = self.text("sentiment");
        Sentiment::from_label(&label).unwrap_or_else(|| {
            debug!(original = %label, "Unrecognized sentiment, using neutral");
            Sentiment::Neutral
        })
    }

    fn deadline(&self) -> Option<ActionDeadline> {
        let text = self.text("action_deadline");
        let deadline = ActionDeadline::parse(&text);
        if deadline.is_none() && !text.is_empty() {
            debug!(original = %text, "Dropping unrecognized action deadline");
        }
        deadline
    }
}

/// One list element as text; nulls and blanks are dropped.
fn list_item(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}
