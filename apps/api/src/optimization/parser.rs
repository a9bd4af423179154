//! Response Parser: turns free-form model output into structured values.
//!
//! Both entry points are total: malformed model output degrades to a usable
//! value and a warning, never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::optimization::prompts::{END_MARKER, START_MARKER};

pub const DEFAULT_HEADLINE: &str = "Resume optimized for job requirements";
pub const DEFAULT_SUMMARY: &str = "Enhanced resume with relevant keywords and improved phrasing.";
const FALLBACK_SUMMARY_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub headline: String,
    pub summary: String,
    pub keywords_added: Vec<String>,
}

/// Outcome of summary extraction. Both variants carry a usable summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryParse {
    /// A JSON object was found and read; absent fields took defaults.
    Parsed(ChangeSummary),
    /// No usable JSON; the summary is a prefix of the raw reply.
    Fallback(ChangeSummary),
}

impl SummaryParse {
    pub fn into_summary(self) -> ChangeSummary {
        match self {
            SummaryParse::Parsed(s) | SummaryParse::Fallback(s) => s,
        }
    }
}

/// Returns the trimmed text between the optimization markers, or the whole
/// trimmed reply when they are missing or out of order.
pub fn extract_optimized_text(raw: &str) -> String {
    if let Some(start) = raw.find(START_MARKER) {
        let body_start = start + START_MARKER.len();
        if let Some(len) = raw[body_start..].find(END_MARKER) {
            return raw[body_start..body_start + len].trim().to_string();
        }
    }

    warn!("Optimization markers not found in AI response, using full text");
    raw.trim().to_string()
}

pub fn parse_change_summary(raw: &str) -> SummaryParse {
    match find_json_object(raw) {
        Some(object) => SummaryParse::Parsed(summary_from_object(&object)),
        None => {
            warn!("Could not parse JSON from change summary, using fallback");
            SummaryParse::Fallback(ChangeSummary {
                headline: DEFAULT_HEADLINE.to_string(),
                summary: raw.chars().take(FALLBACK_SUMMARY_CHARS).collect(),
                keywords_added: Vec::new(),
            })
        }
    }
}

pub fn extract_change_summary(raw: &str) -> ChangeSummary {
    parse_change_summary(raw).into_summary()
}

// ────────────────────────────────────────────────────────────────────────────
// JSON location
// ────────────────────────────────────────────────────────────────────────────

/// First `{` to last `}`; if that span is not a JSON object, the balanced
/// object opening at the first `{`.
fn find_json_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
    let start = raw.find('{')?;

    if let Some(end) = raw.rfind('}') {
        if end > start {
            if let Ok(Value::Object(map)) = serde_json::from_str(&raw[start..=end]) {
                return Some(map);
            }
        }
    }

    let end = balanced_object_end(&raw[start..])?;
    match serde_json::from_str(&raw[start..start + end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Byte length of the brace-balanced object at the start of `s`, skipping
/// braces inside JSON strings.
fn balanced_object_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn summary_from_object(object: &serde_json::Map<String, Value>) -> ChangeSummary {
    let text_or = |key: &str, default: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    let mut keywords_added: Vec<String> = Vec::new();
    if let Some(Value::Array(items)) = object.get("keywordsAdded") {
        for keyword in items.iter().filter_map(Value::as_str) {
            let keyword = keyword.trim();
            if !keyword.is_empty() && !keywords_added.iter().any(|k| k == keyword) {
                keywords_added.push(keyword.to_string());
            }
        }
    }

    ChangeSummary {
        headline: text_or("headline", DEFAULT_HEADLINE),
        summary: text_or("summary", DEFAULT_SUMMARY),
        keywords_added,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_text_between_markers() {
        let raw = "Sure!\n---START_OPTIMIZED---\n  Jane Doe\nSenior Analyst \n---END_OPTIMIZED---\nThanks";
        assert_eq!(extract_optimized_text(raw), "Jane Doe\nSenior Analyst");
    }

    #[test]
    fn test_missing_end_marker_returns_whole_reply() {
        let raw = "  ---START_OPTIMIZED---\nJane Doe  ";
        assert_eq!(extract_optimized_text(raw), "---START_OPTIMIZED---\nJane Doe");
    }

    #[test]
    fn test_end_before_start_returns_whole_reply() {
        let raw = "---END_OPTIMIZED--- text ---START_OPTIMIZED---";
        assert_eq!(extract_optimized_text(raw), raw);
    }

    #[test]
    fn test_no_markers_returns_trimmed_reply() {
        assert_eq!(extract_optimized_text("\n plain text \n"), "plain text");
    }

    #[test]
    fn test_parses_embedded_json() {
        let raw = r#"Here you go:
{"headline": "Added SQL keywords", "summary": "Surfaced SQL work.", "keywordsAdded": ["SQL", "ETL"]}
Hope this helps"#;
        let parsed = parse_change_summary(raw);
        assert_eq!(
            parsed,
            SummaryParse::Parsed(ChangeSummary {
                headline: "Added SQL keywords".to_string(),
                summary: "Surfaced SQL work.".to_string(),
                keywords_added: vec!["SQL".to_string(), "ETL".to_string()],
            })
        );
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let summary = extract_change_summary(r#"{"headline": ""}"#);
        assert_eq!(summary.headline, DEFAULT_HEADLINE);
        assert_eq!(summary.summary, DEFAULT_SUMMARY);
        assert!(summary.keywords_added.is_empty());
    }

    #[test]
    fn test_keywords_deduplicated_and_non_strings_dropped() {
        let summary =
            extract_change_summary(r#"{"keywordsAdded": ["SQL", 3, "ETL", "SQL", null, "Python"]}"#);
        assert_eq!(summary.keywords_added, vec!["SQL", "ETL", "Python"]);
    }

    #[test]
    fn test_no_json_falls_back_to_prefix() {
        let raw = "x".repeat(250);
        match parse_change_summary(&raw) {
            SummaryParse::Fallback(summary) => {
                assert_eq!(summary.headline, DEFAULT_HEADLINE);
                assert_eq!(summary.summary.len(), 200);
                assert!(summary.keywords_added.is_empty());
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_falls_back() {
        let raw = "{headline: not json}";
        assert!(matches!(parse_change_summary(raw), SummaryParse::Fallback(_)));
        assert_eq!(extract_change_summary(raw).summary, raw);
    }

    #[test]
    fn test_trailing_brace_in_prose_uses_balanced_object() {
        let raw = r#"{"headline": "Tightened summary"} and a stray } at the end"#;
        let summary = extract_change_summary(raw);
        assert_eq!(summary.headline, "Tightened summary");
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_balancing() {
        let raw = r#"{"headline": "Used {curly} words", "summary": "ok"} trailing }"#;
        let summary = extract_change_summary(raw);
        assert_eq!(summary.headline, "Used {curly} words");
        assert_eq!(summary.summary, "ok");
    }

    #[test]
    fn test_fallback_prefix_counts_characters() {
        let raw = "é".repeat(201);
        let summary = extract_change_summary(&raw);
        assert_eq!(summary.summary.chars().count(), 200);
    }

    #[test]
    fn test_change_summary_serializes_camel_case() {
        let value = serde_json::to_value(ChangeSummary {
            headline: "h".into(),
            summary: "s".into(),
            keywords_added: vec!["k".into()],
        })
        .unwrap();
        assert_eq!(value["keywordsAdded"][0], "k");
    }
}
