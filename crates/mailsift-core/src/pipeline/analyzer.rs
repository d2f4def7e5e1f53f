//! Full structured analysis request.
//!
//! Builds the prompt and makes the call. The reply is returned untouched;
//! turning it into a record is [`crate::analysis::normalize`]'s job.

use mailsift_llm::{InferenceClient, ModelProfile};

use crate::email::UnanalyzedEmail;

/// Body characters sent to the analysis model.
pub const ANALYSIS_BODY_CHARS: usize = 4000;

const FIELD_CONTRACT: &str = "\
Return ONLY a JSON object with exactly these fields:
- summary: string (1-2 sentences)
- categories: array of short lowercase strings
- priority_score: integer 1-5 (5 = most urgent)
- priority_reason: string
- action_needed: true | false
- action_types: array of strings (reply, review, schedule, pay, ...)
- action_deadline: \"YYYY-MM-DD\", \"ASAP\" or null
- key_points: array of strings
- people_mentioned: array of strings
- project: string or null
- topic: string or null
- sentiment: \"positive\" | \"negative\" | \"neutral\"
- confidence_score: number between 0 and 1

Do not include any text outside the JSON object.";

/// Build the analysis prompt for an email.
#[must_use]
pub fn build_analysis_prompt(email: &UnanalyzedEmail) -> String {
    let labels = if email.labels.is_empty() {
        "(none)".to_string()
    } else {
        email.labels.join(", ")
    };

    format!(
        "You are an executive assistant. Analyze this email so it can be \
         prioritized and acted on without reading it.\n\n\
         From: {}\n\
         Date: {}\n\
         Labels: {}\n\
         Subject: {}\n\
         Body (truncated):\n{}\n\n\
         {FIELD_CONTRACT}",
        email.sender,
        email.date,
        labels,
        email.subject,
        email.body_prefix(ANALYSIS_BODY_CHARS),
    )
}

/// Sends full analysis requests for one model profile.
pub struct StructuredAnalyzer<'a> {
    client: &'a dyn InferenceClient,
    profile: &'a ModelProfile,
}

impl<'a> StructuredAnalyzer<'a> {
    /// Create an analyzer.
    #[must_use]
    pub const fn new(client: &'a dyn InferenceClient, profile: &'a ModelProfile) -> Self {
        Self { client, profile }
    }

    /// Make one analysis call and return the raw reply.
    ///
    /// # Errors
    ///
    /// Returns the inference error unchanged; retrying is the caller's job.
    pub async fn request(&self, email: &UnanalyzedEmail) -> mailsift_llm::Result<String> {
        let prompt = build_analysis_prompt(email);
        self.client.generate(self.profile, &prompt).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analysis::REQUIRED_FIELDS;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        prompts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl InferenceClient for Recorder {
        async fn generate(&self, profile: &ModelProfile, prompt: &str) -> mailsift_llm::Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((profile.model.clone(), prompt.to_string()));
            Ok("not json at all".to_string())
        }
    }

    fn email() -> UnanalyzedEmail {
        UnanalyzedEmail::new("m1", "t1")
            .with_subject("Contract renewal")
            .with_sender("Lee <lee@example.com>")
            .with_date("2025-04-01")
            .with_labels(vec!["INBOX".to_string(), "IMPORTANT".to_string()])
            .with_body("Please review the attached contract by Friday.")
    }

    #[test]
    fn test_prompt_names_every_required_field() {
        let prompt = build_analysis_prompt(&email());
        for field in REQUIRED_FIELDS {
            assert!(prompt.contains(field), "prompt is missing {field}");
        }
        assert!(prompt.contains("From: Lee <lee@example.com>"));
        assert!(prompt.contains("Labels: INBOX, IMPORTANT"));
    }

    #[test]
    fn test_prompt_body_budget() {
        let long = email().with_body("é".repeat(ANALYSIS_BODY_CHARS * 2));
        let prompt = build_analysis_prompt(&long);
        assert_eq!(prompt.matches('é').count(), ANALYSIS_BODY_CHARS);
    }

    #[test]
    fn test_prompt_without_labels() {
        let prompt = build_analysis_prompt(&email().with_labels(Vec::new()));
        assert!(prompt.contains("Labels: (none)"));
    }

    #[tokio::test]
    async fn test_request_returns_raw_text() {
        let client = Recorder {
            prompts: Mutex::new(Vec::new()),
        };
        let profile = ModelProfile::analysis_default();
        let analyzer = StructuredAnalyzer::new(&client, &profile);

        let raw = analyzer.request(&email()).await.unwrap();
        assert_eq!(raw, "not json at all");

        let prompts = client.prompts.into_inner().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, profile.model);
        assert!(prompts[0].1.contains("Contract renewal"));
    }
}
