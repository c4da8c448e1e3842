//! JSON parsing helpers for classifier responses
//!
//! Model replies rarely arrive as clean JSON: the object may sit inside a
//! fenced code block, be wrapped in prose, or be the whole body. Extraction
//! tries each shape in order; callers treat a total miss as a retryable
//! format error.

use serde::Deserialize;
use serde_json::Value;

/// Classifier verdict, straight off the wire before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct TrimAnswer {
    /// Chosen candidate, possibly empty when the model declines.
    #[serde(default)]
    pub trim: String,
    /// Stated confidence; any non-numeric or missing value collapses to 0,
    /// out-of-range values are clipped into [0, 1].
    #[serde(default, deserialize_with = "de_clipped_confidence")]
    pub confidence: f64,
    /// Informational label the model was asked to echo back.
    #[serde(default)]
    pub assignment_method: String,
}

fn de_clipped_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(clip01(&value))
}

/// Collapse an arbitrary JSON value to a confidence in [0, 1].
pub fn clip01(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f.clamp(0.0, 1.0)).unwrap_or(0.0),
        // some models quote their numbers
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| f.clamp(0.0, 1.0))
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Pull a JSON object out of a model response that may include code fences or
/// surrounding prose.
///
/// Tried in order: fenced blocks that look like an object, the span between
/// the first `{` and the last `}`, then a direct parse of the whole body.
pub fn extract_json(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.contains("```") {
        for chunk in text.split("```") {
            let chunk = chunk.trim().trim_start_matches("json").trim();
            if chunk.starts_with('{') && chunk.ends_with('}') {
                if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(chunk) {
                    return Some(Value::Object(obj));
                }
            }
        }
    }

    let first = text.find('{');
    let last = text.rfind('}');
    if let (Some(s), Some(e)) = (first, last) {
        if s < e {
            if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&text[s..=e]) {
                return Some(Value::Object(obj));
            }
        }
    }

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Some(Value::Object(obj)),
        _ => None,
    }
}

/// Parse a trim answer out of a raw response body.
pub fn parse_trim_answer(response: &str) -> Option<TrimAnswer> {
    let value = extract_json(response)?;
    serde_json::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_json() {
        let answer =
            parse_trim_answer(r#"{"trim": "SE", "confidence": 0.8, "assignment_method": "LLM"}"#)
                .unwrap();
        assert_eq!(answer.trim, "SE");
        assert_eq!(answer.confidence, 0.8);
        assert_eq!(answer.assignment_method, "LLM");
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let response = r#"Sure! Here's the mapping:
{"trim": "GT Line", "confidence": 0.72, "assignment_method": "LLM"}
Let me know if you need anything else."#;
        let answer = parse_trim_answer(response).unwrap();
        assert_eq!(answer.trim, "GT Line");
    }

    #[test]
    fn test_parse_fenced_block() {
        let response = "```json\n{\"trim\": \"XSE\", \"confidence\": 0.9}\n```";
        let answer = parse_trim_answer(response).unwrap();
        assert_eq!(answer.trim, "XSE");
        assert_eq!(answer.confidence, 0.9);
    }

    #[test]
    fn test_parse_fenced_block_without_language_tag() {
        let response = "prose before\n```\n{\"trim\": \"LE\", \"confidence\": 0.6}\n```\nafter";
        let answer = parse_trim_answer(response).unwrap();
        assert_eq!(answer.trim, "LE");
    }

    #[test]
    fn test_no_json_is_none() {
        assert!(parse_trim_answer("I could not decide.").is_none());
        assert!(parse_trim_answer("").is_none());
        assert!(parse_trim_answer("[1, 2, 3]").is_none());
    }

    #[test]
    fn test_confidence_clipping() {
        let over = parse_trim_answer(r#"{"trim": "SE", "confidence": 3.5}"#).unwrap();
        assert_eq!(over.confidence, 1.0);
        let under = parse_trim_answer(r#"{"trim": "SE", "confidence": -2}"#).unwrap();
        assert_eq!(under.confidence, 0.0);
        let junk = parse_trim_answer(r#"{"trim": "SE", "confidence": "high"}"#).unwrap();
        assert_eq!(junk.confidence, 0.0);
        let quoted = parse_trim_answer(r#"{"trim": "SE", "confidence": "0.7"}"#).unwrap();
        assert_eq!(quoted.confidence, 0.7);
        let missing = parse_trim_answer(r#"{"trim": "SE"}"#).unwrap();
        assert_eq!(missing.confidence, 0.0);
    }

    #[test]
    fn test_empty_trim_allowed() {
        let answer = parse_trim_answer(r#"{"trim": "", "confidence": 0.2}"#).unwrap();
        assert!(answer.trim.is_empty());
    }

    #[test]
    fn test_brace_span_beats_broken_fences() {
        // fence content isn't valid JSON, but the body still contains one object
        let response = "``` not json ``` and then {\"trim\": \"SE\", \"confidence\": 0.5} done";
        let answer = parse_trim_answer(response).unwrap();
        assert_eq!(answer.trim, "SE");
    }
}
