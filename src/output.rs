//! Result types returned by the analysis pipeline.

use crate::pipeline::input::DocumentKind;
use crate::pipeline::parse::ParsedSections;
use crate::pipeline::tone::Tone;
use serde::{Deserialize, Serialize};

/// Phase 1 output: parsed sections plus the model that wrote them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub sections: ParsedSections,
    pub model: String,
}

/// Phase 2 output: the English source-of-truth Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedAnalysis {
    pub markdown: String,
    pub tone: Tone,
    pub model: String,
}

/// Which model served each phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseModels {
    pub generate: String,
    pub verify: String,
    /// `None` when translation was skipped or fell back to English.
    pub translate: Option<String>,
}

/// The complete result of analysing one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Final Markdown in the requested language (English if translation was
    /// skipped or failed). Never empty.
    pub analysis: String,
    /// Verbatim transcription of the report findings. Never empty.
    pub raw_data: String,
    /// Language that was requested.
    pub language: String,
    /// `true` when `analysis` is a translation of the English text.
    pub translated: bool,
    /// Age as detected by the generate phase.
    pub age: String,
    /// Register applied by the verify phase.
    pub tone: Tone,
    pub models: PhaseModels,
}

/// Response body of the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub analysis: String,
    pub raw_text: String,
    pub file_type: String,
}

impl UploadResponse {
    pub fn new(filename: impl Into<String>, kind: DocumentKind, result: AnalysisResult) -> Self {
        Self {
            filename: filename.into(),
            analysis: result.analysis,
            raw_text: result.raw_data,
            file_type: kind.mime().to_string(),
        }
    }
}

/// Request body of the translate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub raw_text: String,
    pub language: String,
}

/// Response body of the translate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub analysis: String,
}
