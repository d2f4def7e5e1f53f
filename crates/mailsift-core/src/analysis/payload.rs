//! Locating and parsing the JSON object inside a model reply.

use serde_json::{Map, Value};

use super::normalize::NormalizeError;

/// Strip whitespace and a surrounding fenced-code block, if any.
#[must_use]
pub fn strip_wrappers(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (e.g. `json`) on the opening fence line.
        text = rest
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
            .trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

/// Slice from the first `{` to the last `}`.
///
/// # Errors
///
/// Returns [`NormalizeError::Extraction`] if no such span exists.
pub fn extract_object(raw: &str) -> Result<&str, NormalizeError> {
    let text = strip_wrappers(raw);
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(NormalizeError::Extraction {
            raw: raw.to_string(),
        }),
    }
}

/// Extract and parse the JSON object inside a model reply.
///
/// # Errors
///
/// Returns [`NormalizeError::Extraction`] if no object span is present, or
/// [`NormalizeError::Parse`] if the span is not a valid JSON object.
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, NormalizeError> {
    let candidate = extract_object(raw)?;
    serde_json::from_str(candidate).map_err(|source| NormalizeError::Parse {
        source,
        raw: raw.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_wrappers("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_wrappers("  ```\n{}\n```  "), "{}");
        assert_eq!(strip_wrappers("{}"), "{}");
    }

    #[test]
    fn test_extract_from_prose() {
        let raw = "Sure! Here is the analysis:\n{\"a\": {\"b\": 2}}\nLet me know.";
        assert_eq!(extract_object(raw).unwrap(), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_extract_missing_braces() {
        assert!(matches!(
            extract_object("I cannot analyze this email."),
            Err(NormalizeError::Extraction { .. })
        ));
        assert!(matches!(
            extract_object("} backwards {"),
            Err(NormalizeError::Extraction { .. })
        ));
    }

    #[test]
    fn test_parse_error_keeps_raw() {
        let raw = "{\"summary\": \"unterminated}";
        match parse_object(raw) {
            Err(NormalizeError::Parse { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_object() {
        let map = parse_object("```json\n{\"needs_analysis\": false}\n```").unwrap();
        assert_eq!(map.get("needs_analysis"), Some(&Value::Bool(false)));
    }
}
