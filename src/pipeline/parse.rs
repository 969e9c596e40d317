//! Response parser: labeled sections out of the generate-phase response.
//!
//! The generate prompt asks the model for four labeled sections separated by
//! `---` lines:
//!
//! ```text
//! AGE: 8
//! ---
//! RAW_DATA: Hemoglobin 10.2 g/dL (L) ...
//! ---
//! EXPLANATION: Your blood has a little less iron helper than usual ...
//! ---
//! SUGGESTIONS: - Eat spinach ...
//! ---
//! ```
//!
//! Models obey this contract most of the time, not always. Each section is
//! therefore located independently: find the first line that starts with the
//! label, take everything after the colon up to the next `---` line or the
//! next label, trim. A missing section is just empty. When the explanation
//! itself is missing the whole response is used as the explanation, which is
//! what a patient would want to read anyway.

use crate::pipeline::postprocess::strip_markdown_fences;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder for `raw_data` when neither the model nor the PDF text layer
/// produced any findings.
pub const RAW_DATA_PLACEHOLDER: &str = "See original scan";

/// Age reported when the model did not state one.
pub const UNKNOWN_AGE: &str = "Unknown";

pub const LABEL_AGE: &str = "AGE";
pub const LABEL_RAW_DATA: &str = "RAW_DATA";
pub const LABEL_EXPLANATION: &str = "EXPLANATION";
pub const LABEL_SUGGESTIONS: &str = "SUGGESTIONS";

/// Sections extracted from one generate-phase response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSections {
    /// Detected patient age as written by the model, or `"Unknown"`.
    pub age: String,
    /// Verbatim transcription of the findings. Never empty.
    pub raw_data: String,
    /// Draft explanation. Never empty unless the response itself was empty.
    pub explanation: String,
    /// Draft suggestions; empty when the model left them out.
    pub suggestions: String,
    /// `true` when no explanation section was found and the whole response
    /// was used instead.
    pub full_text_fallback: bool,
}

// A label at the start of a line, tolerating Markdown decoration and list
// numbering around it: "AGE:", "**AGE:**", "### RAW_DATA:", "- SUGGESTIONS :",
// "--- AGE: 8", "1. AGE: 8", "2) **RAW_DATA:**".
static RE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t>#*-]*(?:\d+[.)][ \t*_]*)?\b(AGE|RAW_DATA|EXPLANATION|SUGGESTIONS)\b[ \t*_]*:[ \t*_]*",
    )
    .unwrap()
});

static RE_DELIMITER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*-{3,}[ \t]*$").unwrap());

/// A label's first occurrence: where its line starts and where its content
/// starts.
#[derive(Debug, Clone, Copy)]
struct LabelHit {
    label: &'static str,
    line_start: usize,
    content_start: usize,
}

/// Parse a generate-phase response.
///
/// `source_text` is the text extracted from the PDF before the model saw it
/// (empty for images and scans); it backs `raw_data` when the model did not
/// transcribe anything.
///
/// Before splitting, CRLF line endings become `\n` and a code fence wrapping
/// the whole response is removed. When no explanation section is found, the
/// explanation is that normalised response with surrounding whitespace
/// trimmed.
pub fn parse_sections(response: &str, source_text: &str) -> ParsedSections {
    let normalised = response.replace("\r\n", "\n");
    let text = strip_markdown_fences(&normalised);
    let hits = first_hits(&text);
    let delimiters: Vec<usize> = RE_DELIMITER.find_iter(&text).map(|m| m.start()).collect();

    let section = |label: &str| -> Option<String> {
        let hit = hits.iter().find(|h| h.label == label)?;
        let end = hits
            .iter()
            .map(|h| h.line_start)
            .chain(delimiters.iter().copied())
            .filter(|&pos| pos >= hit.content_start)
            .min()
            .unwrap_or(text.len());
        Some(text[hit.content_start..end].trim().to_string())
    };

    let fallback_raw = fallback_raw_data(source_text);

    let age = section(LABEL_AGE)
        .map(|a| a.trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace()).to_string())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_AGE.to_string());
    let suggestions = section(LABEL_SUGGESTIONS).unwrap_or_default();

    match section(LABEL_EXPLANATION).filter(|e| !e.is_empty()) {
        Some(explanation) => ParsedSections {
            age,
            raw_data: section(LABEL_RAW_DATA)
                .filter(|r| !r.is_empty())
                .unwrap_or(fallback_raw),
            explanation,
            suggestions,
            full_text_fallback: false,
        },
        None => ParsedSections {
            age,
            raw_data: fallback_raw,
            explanation: text.trim().to_string(),
            suggestions,
            full_text_fallback: true,
        },
    }
}

/// The raw data to report when the model gave none.
pub fn fallback_raw_data(source_text: &str) -> String {
    if source_text.trim().is_empty() {
        RAW_DATA_PLACEHOLDER.to_string()
    } else {
        source_text.trim().to_string()
    }
}

/// First occurrence of each label, in text order.
fn first_hits(text: &str) -> Vec<LabelHit> {
    let mut hits: Vec<LabelHit> = Vec::with_capacity(4);
    for caps in RE_LABEL.captures_iter(text) {
        let label = match &caps[1] {
            "AGE" => LABEL_AGE,
            "RAW_DATA" => LABEL_RAW_DATA,
            "EXPLANATION" => LABEL_EXPLANATION,
            _ => LABEL_SUGGESTIONS,
        };
        if hits.iter().any(|h| h.label == label) {
            continue;
        }
        let whole = caps.get(0).map(|m| (m.start(), m.end()));
        if let Some((line_start, content_start)) = whole {
            hits.push(LabelHit {
                label,
                line_start,
                content_start,
            });
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_response() {
        let parsed = parse_sections(
            "AGE: 8\n---\nRAW_DATA: X\n---\nEXPLANATION: Y\n---\nSUGGESTIONS: Z\n---",
            "",
        );
        assert_eq!(parsed.age, "8");
        assert_eq!(parsed.raw_data, "X");
        assert_eq!(parsed.explanation, "Y");
        assert_eq!(parsed.suggestions, "Z");
        assert!(!parsed.full_text_fallback);
    }

    #[test]
    fn no_labels_uses_full_text() {
        let text = "Your results look fine overall.\nDrink more water.";
        let parsed = parse_sections(text, "");
        assert_eq!(parsed.explanation, text);
        assert_eq!(parsed.raw_data, RAW_DATA_PLACEHOLDER);
        assert_eq!(parsed.age, UNKNOWN_AGE);
        assert_eq!(parsed.suggestions, "");
        assert!(parsed.full_text_fallback);
    }

    #[test]
    fn no_labels_prefers_extracted_text() {
        let parsed = parse_sections("Just prose.", "  Glucose 95 mg/dL \n");
        assert_eq!(parsed.raw_data, "Glucose 95 mg/dL");
        assert_eq!(parsed.explanation, "Just prose.");
    }

    #[test]
    fn missing_age_and_suggestions() {
        let parsed = parse_sections("RAW_DATA: TSH 2.1\n---\nEXPLANATION: Thyroid is fine.", "");
        assert_eq!(parsed.age, UNKNOWN_AGE);
        assert_eq!(parsed.raw_data, "TSH 2.1");
        assert_eq!(parsed.explanation, "Thyroid is fine.");
        assert_eq!(parsed.suggestions, "");
    }

    #[test]
    fn missing_raw_data_falls_back_to_source() {
        let parsed = parse_sections("EXPLANATION: All good.\n---", "WBC 6.0");
        assert_eq!(parsed.raw_data, "WBC 6.0");
        assert_eq!(parsed.explanation, "All good.");
        assert!(!parsed.full_text_fallback);
    }

    #[test]
    fn reordered_labels() {
        let parsed = parse_sections(
            "SUGGESTIONS: Sleep well\n---\nEXPLANATION: Mild anemia.\n---\nAGE: 34\n---\nRAW_DATA: Hb 11",
            "",
        );
        assert_eq!(parsed.age, "34");
        assert_eq!(parsed.raw_data, "Hb 11");
        assert_eq!(parsed.explanation, "Mild anemia.");
        assert_eq!(parsed.suggestions, "Sleep well");
    }

    #[test]
    fn labels_without_delimiters_end_at_next_label() {
        let parsed = parse_sections(
            "AGE: 70\nRAW_DATA: LDL 160\nHDL 40\nEXPLANATION: Cholesterol is high.\nSUGGESTIONS:\n- Walk daily\n- Less fried food",
            "",
        );
        assert_eq!(parsed.age, "70");
        assert_eq!(parsed.raw_data, "LDL 160\nHDL 40");
        assert_eq!(parsed.explanation, "Cholesterol is high.");
        assert_eq!(parsed.suggestions, "- Walk daily\n- Less fried food");
    }

    #[test]
    fn empty_explanation_triggers_fallback() {
        let text = "AGE: 9\n---\nRAW_DATA: X\n---\nEXPLANATION:\n---\nSUGGESTIONS: Z";
        let parsed = parse_sections(text, "");
        assert!(parsed.full_text_fallback);
        assert_eq!(parsed.explanation, text);
        assert_eq!(parsed.raw_data, RAW_DATA_PLACEHOLDER);
        assert_eq!(parsed.age, "9");
    }

    #[test]
    fn empty_sections_stay_empty() {
        let parsed = parse_sections("AGE:\n---\nRAW_DATA: X\n---\nEXPLANATION: Y\n---\nSUGGESTIONS:\n---", "");
        assert_eq!(parsed.age, UNKNOWN_AGE);
        assert_eq!(parsed.suggestions, "");
        assert_eq!(parsed.explanation, "Y");
    }

    #[test]
    fn repeated_delimiters_and_leading_rule() {
        let parsed = parse_sections(
            "---\n---\nAGE: 12\n------\n\n---\nRAW_DATA: X\n---\n---\nEXPLANATION: Y\n---\n---",
            "",
        );
        assert_eq!(parsed.age, "12");
        assert_eq!(parsed.raw_data, "X");
        assert_eq!(parsed.explanation, "Y");
    }

    #[test]
    fn first_occurrence_wins() {
        let parsed = parse_sections(
            "AGE: 30\n---\nRAW_DATA: X\n---\nEXPLANATION: first\n---\nEXPLANATION: second\n---",
            "",
        );
        assert_eq!(parsed.explanation, "first");
    }

    #[test]
    fn markdown_decorated_labels() {
        let parsed = parse_sections(
            "**AGE:** 65\n---\n### RAW_DATA:\nCreatinine 1.4\n---\n**EXPLANATION**: Kidneys work a bit slower.\n---\n**SUGGESTIONS:**\n- Drink water",
            "",
        );
        assert_eq!(parsed.age, "65");
        assert_eq!(parsed.raw_data, "Creatinine 1.4");
        assert_eq!(parsed.explanation, "Kidneys work a bit slower.");
        assert_eq!(parsed.suggestions, "- Drink water");
    }

    #[test]
    fn numbered_labels() {
        let parsed = parse_sections(
            "1. AGE: 8\n---\n2. RAW_DATA: X\n---\n3. EXPLANATION: Y\n---\n4. SUGGESTIONS: Z\n---",
            "",
        );
        assert!(!parsed.full_text_fallback);
        assert_eq!(parsed.age, "8");
        assert_eq!(parsed.raw_data, "X");
        assert_eq!(parsed.explanation, "Y");
        assert_eq!(parsed.suggestions, "Z");

        let parsed = parse_sections("1) **AGE:** 70\n2) **EXPLANATION:** Fine.", "");
        assert_eq!(parsed.age, "70");
        assert_eq!(parsed.explanation, "Fine.");
    }

    #[test]
    fn fallback_explanation_is_trimmed_response() {
        let parsed = parse_sections("Your results are fine.\r\n\r\n", "");
        assert!(parsed.full_text_fallback);
        assert_eq!(parsed.explanation, "Your results are fine.");

        let parsed = parse_sections("```markdown\nAll normal.\n```", "");
        assert_eq!(parsed.explanation, "All normal.");
    }

    #[test]
    fn fenced_response_and_crlf() {
        let parsed = parse_sections(
            "```\r\nAGE: 5\r\n---\r\nRAW_DATA: X\r\n---\r\nEXPLANATION: Y\r\n---\r\n```",
            "",
        );
        assert_eq!(parsed.age, "5");
        assert_eq!(parsed.explanation, "Y");
    }

    #[test]
    fn label_words_inside_content_are_not_labels() {
        let parsed = parse_sections(
            "RAW_DATA: Patient AGE: 45, IMAGE: none\n---\nEXPLANATION: Y",
            "",
        );
        assert_eq!(parsed.raw_data, "Patient AGE: 45, IMAGE: none");
        assert_eq!(parsed.age, UNKNOWN_AGE);
    }
}
