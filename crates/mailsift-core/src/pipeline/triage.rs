//! Cheap go/no-go classification before full analysis.

use mailsift_llm::{InferenceClient, ModelProfile};
use serde_json::{Map, Value};
use tracing::debug;

use crate::analysis::TriageVerdict;
use crate::analysis::payload;
use crate::email::UnanalyzedEmail;

/// Body characters sent to the triage model.
pub const TRIAGE_BODY_CHARS: usize = 1000;

/// Priority assumed when the reply gives no usable estimate.
const DEFAULT_PRIORITY: u8 = 3;

/// Build the triage prompt for an email.
#[must_use]
pub fn build_triage_prompt(email: &UnanalyzedEmail) -> String {
    format!(
        "You are screening an inbox. Decide whether this email deserves a full \
         analysis or can be filed without one (newsletters, automated \
         notifications, receipts and marketing usually can).\n\n\
         Subject: {}\n\
         Body (truncated):\n{}\n\n\
         Return ONLY a JSON object with these fields:\n\
         - needs_analysis: true | false\n\
         - reason: string (one short sentence)\n\
         - estimated_priority: integer 1-5 (5 = most urgent)\n\n\
         Do not include any text outside the JSON object.",
        email.subject,
        email.body_prefix(TRIAGE_BODY_CHARS),
    )
}

/// Interpret a triage reply.
///
/// Never fails: anything that is not a JSON object yields
/// [`TriageVerdict::unparseable`], and odd field values are coerced so the
/// email is analyzed rather than skipped.
#[must_use]
pub fn parse_verdict(raw: &str) -> TriageVerdict {
    let Ok(object) = payload::parse_object(raw) else {
        debug!("Triage reply is not a JSON object, assuming analysis is needed");
        return TriageVerdict::unparseable();
    };

    TriageVerdict {
        needs_analysis: needs_analysis(&object),
        reason: reason(&object),
        estimated_priority: estimated_priority(&object),
    }
}

fn needs_analysis(object: &Map<String, Value>) -> bool {
    match object.get("needs_analysis") {
        Some(Value::Bool(b)) => *b,
        _ => true,
    }
}

fn reason(object: &Map<String, Value>) -> String {
    match object.get("reason") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn estimated_priority(object: &Map<String, Value>) -> u8 {
    let value = match object.get("estimated_priority") {
        Some(Value::Number(n)) => n.as_i64(),
        _ => None,
    };
    value.map_or(DEFAULT_PRIORITY, |v| v.clamp(1, 5) as u8)
}

/// Sends triage requests for one model profile.
pub struct TriageClassifier<'a> {
    client: &'a dyn InferenceClient,
    profile: &'a ModelProfile,
}

impl<'a> TriageClassifier<'a> {
    /// Create a classifier.
    #[must_use]
    pub const fn new(client: &'a dyn InferenceClient, profile: &'a ModelProfile) -> Self {
        Self { client, profile }
    }

    /// Make one triage call and return the raw reply.
    ///
    /// # Errors
    ///
    /// Returns the inference error unchanged; retrying is the caller's job.
    pub async fn request(&self, email: &UnanalyzedEmail) -> mailsift_llm::Result<String> {
        let prompt = build_triage_prompt(email);
        self.client.generate(self.profile, &prompt).await
    }
}
