//! Prompts for the three analysis phases.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: the section labels the parser looks for and
//!    the layout the post-processor repairs are defined next to the prompts
//!    that request them.
//!
//! 2. **Testability**: unit tests can inspect prompts directly without a
//!    model in the loop, so a prompt edit that drops a label is caught early.

use crate::pipeline::parse::{LABEL_AGE, LABEL_EXPLANATION, LABEL_RAW_DATA, LABEL_SUGGESTIONS};
use crate::pipeline::tone::Tone;

/// Header the verify and translate phases must emit before the bullets.
pub const RECOMMENDATIONS_HEADER: &str = "### Key Recommendations";

/// Phase 1 instructions. Output is labeled sections separated by `---`.
pub fn generate_prompt() -> String {
    format!(
        r#"You are MedClare AI, a careful medical report assistant.
Analyze the attached medical report and respond STRICTLY in this format, with each section separated by a line containing only ---:

{LABEL_AGE}: [The patient's age in years, taken from text in the report such as "Age", "DOB" or "Y/O". Write Unknown if it is not stated.]
---
{LABEL_RAW_DATA}: [Transcribe ALL test names, values, units, reference ranges, flags and findings exactly as written. Do not interpret.]
---
{LABEL_EXPLANATION}: [An ultra-simple explanation in English that a 10-year-old could understand. Say what was tested, what is normal and what is not.]
---
{LABEL_SUGGESTIONS}: [3 to 4 short, practical next steps, one per line starting with "- ".]
---

Rules:
- Never invent values that are not in the report.
- Do not add any text before {LABEL_AGE} or after the last ---."#
    )
}

/// Phase 1 message text for a digital report.
pub fn generate_text_prompt(report_text: &str) -> String {
    format!("{}\n\nReport text:\n{}", generate_prompt(), report_text.trim())
}

/// Phase 2 instructions: verify the draft and apply the tone.
///
/// Always produces English; translation is a separate phase.
pub fn verify_prompt(raw_data: &str, explanation: &str, suggestions: &str, tone: Tone) -> String {
    let suggestions = if suggestions.trim().is_empty() {
        "(none provided; write them from the raw data)"
    } else {
        suggestions.trim()
    };

    format!(
        r#"You are MedClare Verifier. Check the draft explanation against the raw report data, fix anything inaccurate or missing, and rewrite it for the patient.

RAW DATA (the facts):
{raw}

DRAFT EXPLANATION:
{explanation}

DRAFT SUGGESTIONS:
{suggestions}

TONE:
{tone}

Output ONLY the final Markdown, in English, with exactly this structure:
1. One comprehensive explanation paragraph.
2. A blank line.
3. The header "{RECOMMENDATIONS_HEADER}".
4. A blank line.
5. 3 to 4 bullet points, every one starting with "- ".

Do not add any other headers, preambles or closing remarks. Do not wrap the answer in code fences."#,
        raw = raw_data.trim(),
        explanation = explanation.trim(),
        tone = tone.directive(),
    )
}

/// Phase 3 instructions: mirror the English Markdown into `language`.
pub fn translate_prompt(english_markdown: &str, raw_data: &str, language: &str) -> String {
    format!(
        r#"You are MedClare Translator. Translate the medical summary below into {language}.

SOURCE DATA (facts, for reference only, do not translate or repeat):
{raw}

MARKDOWN TO TRANSLATE:
{english}

RULES:
1. Respond ONLY in {language}.
2. This is a direct translation, not a summary. Do not add, remove or reinterpret information. Take no creative liberty.
3. Keep the exact same structure: the same paragraphs, the same headers (translated), the same number of bullet points with the same "- " marker, and the same tone.
4. Keep the same Markdown spacing: a blank line before each header and a blank line after each list.
5. Keep numbers, units and test names accurate.
6. Output ONLY the translated Markdown, without code fences or commentary."#,
        raw = raw_data.trim(),
        english = english_markdown.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_prompt_requests_every_label() {
        let p = generate_prompt();
        for label in [LABEL_AGE, LABEL_RAW_DATA, LABEL_EXPLANATION, LABEL_SUGGESTIONS] {
            assert!(p.contains(&format!("{label}:")), "missing {label}");
        }
        assert!(p.contains("---"));
    }

    #[test]
    fn text_prompt_appends_report() {
        let p = generate_text_prompt("  Hemoglobin 13.5 g/dL \n");
        assert!(p.ends_with("Report text:\nHemoglobin 13.5 g/dL"));
    }

    #[test]
    fn verify_prompt_carries_inputs_and_tone() {
        let p = verify_prompt("Hb 9", "You are low on iron.", "- Eat beans", Tone::Playful);
        assert!(p.contains("Hb 9"));
        assert!(p.contains("You are low on iron."));
        assert!(p.contains("- Eat beans"));
        assert!(p.contains(Tone::Playful.directive()));
        assert!(p.contains(RECOMMENDATIONS_HEADER));
        assert!(p.contains("in English"));
    }

    #[test]
    fn verify_prompt_without_suggestions() {
        let p = verify_prompt("Hb 9", "Draft", "  ", Tone::Neutral);
        assert!(p.contains("(none provided"));
    }

    #[test]
    fn translate_prompt_names_language_and_forbids_summaries() {
        let p = translate_prompt("Text\n\n### Key Recommendations\n\n- a", "Hb 9", "Spanish");
        assert!(p.contains("into Spanish"));
        assert!(p.contains("ONLY in Spanish"));
        assert!(p.contains("not a summary"));
        assert!(p.contains("### Key Recommendations"));
    }
}
