//! Normalisation of the agent's reply into an [`AnalysisResult`].
//!
//! The provider returns free text. Even when asked for bare JSON, models wrap
//! it in ```` ```json ```` fences, prepend a sentence, use CRLF line endings
//! or sprinkle zero-width characters. None of that should reach the caller,
//! and nothing about the reply's structure is assumed: a field that is absent
//! or of the wrong type is skipped, never an error.
//!
//! Rules (applied in order):
//! 1. Normalise line endings (CRLF → LF)
//! 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 3. Strip an outer code fence (`json` or untagged)
//! 4. Parse as JSON; failing that, parse the outermost `{…}` span
//! 5. Lift `summary`, `metrics`, `flags`, `recommendations`; keep the raw reply

use crate::output::AnalysisResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

/// Summary used when the reply carries none.
pub const AGENT_SUMMARY: &str = "Agent analysis";

/// Convert raw agent output into the common result shape.
pub fn normalize_reply(raw: &str) -> AnalysisResult {
    let cleaned = normalise_line_endings(raw);
    let cleaned = remove_invisible_chars(&cleaned);
    let cleaned = strip_code_fences(&cleaned);

    let mut result = match parse_object(&cleaned) {
        Some(obj) => lift_fields(&obj),
        None => {
            debug!("Agent reply is not a JSON object; keeping raw text");
            AnalysisResult::default()
        }
    };

    if result.summary.trim().is_empty() {
        result.summary = AGENT_SUMMARY.to_string();
    }
    result.result = Some(cleaned.trim().to_string());
    result
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\n(.*)\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 4: Parse the JSON object ────────────────────────────────────────────

fn parse_object(input: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(input.trim()) {
        return Some(obj);
    }

    // Models sometimes add a lead-in sentence; try the outermost braces.
    let start = input.find('{')?;
    let end = input.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&input[start..=end]) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

// ── Rule 5: Lift known fields ────────────────────────────────────────────────

fn lift_fields(obj: &Map<String, Value>) -> AnalysisResult {
    AnalysisResult {
        summary: obj
            .get("summary")
            .map(value_to_text)
            .unwrap_or_default(),
        metrics: match obj.get("metrics") {
            Some(Value::Object(m)) => m.clone(),
            _ => Map::new(),
        },
        flags: string_list(obj.get("flags")),
        recommendations: string_list(obj.get("recommendations")),
        ..Default::default()
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(value_to_text)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_json_is_lifted() {
        let raw = "```json\n{\"summary\": \"Mild anaemia\", \"metrics\": {\"Hemoglobin\": \"11.2 g/dL\"}, \"flags\": [\"Hemoglobin low\"], \"recommendations\": [\"Consult a doctor\"]}\n```";
        let r = normalize_reply(raw);
        assert_eq!(r.summary, "Mild anaemia");
        assert_eq!(r.metrics.get("Hemoglobin"), Some(&json!("11.2 g/dL")));
        assert_eq!(r.flags, vec!["Hemoglobin low".to_string()]);
        assert_eq!(r.recommendations, vec!["Consult a doctor".to_string()]);
        assert!(r.result.as_deref().unwrap().starts_with('{'));
        assert!(r.findings.is_empty());
    }

    #[test]
    fn lead_in_sentence_is_tolerated() {
        let raw = "Here is the analysis:\n{\"summary\": \"All values typical\"}\nStay healthy!";
        let r = normalize_reply(raw);
        assert_eq!(r.summary, "All values typical");
    }

    #[test]
    fn plain_text_reply_keeps_result() {
        let r = normalize_reply("The report looks unremarkable.\r\n");
        assert_eq!(r.summary, AGENT_SUMMARY);
        assert_eq!(r.result.as_deref(), Some("The report looks unremarkable."));
        assert!(r.metrics.is_empty());
    }

    #[test]
    fn non_object_json_is_not_lifted() {
        let r = normalize_reply("[1, 2, 3]");
        assert_eq!(r.summary, AGENT_SUMMARY);
        assert_eq!(r.result.as_deref(), Some("[1, 2, 3]"));
    }

    #[test]
    fn wrong_types_are_stringified_or_skipped() {
        let raw = r#"{"summary": 42, "metrics": ["not", "a", "map"], "flags": [{"name": "LDL"}, null, "HDL low"], "recommendations": "Retest in 3 months"}"#;
        let r = normalize_reply(raw);
        assert_eq!(r.summary, "42");
        assert!(r.metrics.is_empty());
        assert_eq!(r.flags, vec![r#"{"name":"LDL"}"#.to_string(), "HDL low".to_string()]);
        assert_eq!(r.recommendations, vec!["Retest in 3 months".to_string()]);
    }

    #[test]
    fn invisible_chars_removed() {
        let r = normalize_reply("\u{FEFF}{\"summary\": \"ok\u{200B}\"}");
        assert_eq!(r.summary, "ok");
    }

    #[test]
    fn untagged_fence_stripped() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("no fence"), "no fence");
    }
}
