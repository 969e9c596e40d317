//! The analysis orchestrator: generate → verify → translate.
//!
//! ## Phases
//!
//! Each phase is an `async` function that takes the previous phase's output
//! by reference and returns a new value; nothing is mutated in place.
//!
//! 1. **Generate**: transcribe the report and draft an English explanation
//!    ([`Analyzer::generate`] → [`Draft`]).
//! 2. **Verify**: check the draft against the raw data and rewrite it in the
//!    tone picked from the detected age ([`Analyzer::verify`] →
//!    [`VerifiedAnalysis`]). Always English: that text is the source of
//!    truth every translation derives from.
//! 3. **Translate**: only when another language was requested
//!    ([`Analyzer::translate`]). Best effort: any failure returns the English
//!    text.
//!
//! ## Failure policy
//!
//! Generate and verify walk the model candidate list and fail the whole
//! analysis when every candidate fails; there is no partial result.
//! Translate absorbs failure and logs it.

use crate::client::{ChatBackend, ChatMessage, CompletionOptions, HttpChatClient};
use crate::config::AnalysisConfig;
use crate::error::MedClareError;
use crate::output::{AnalysisResult, Draft, PhaseModels, VerifiedAnalysis};
use crate::pipeline::encode::to_data_url;
use crate::pipeline::input::{self, AnalysisRequest, DocumentKind, ReportInput};
use crate::pipeline::llm::{complete_with_fallback, Phase, PhaseOutput};
use crate::pipeline::parse::parse_sections;
use crate::pipeline::postprocess::clean_markdown;
use crate::pipeline::tone::Tone;
use crate::progress::ProgressCallback;
use crate::prompts;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs the analysis pipeline.
///
/// Holds only read-only state, so one `Analyzer` can be shared (e.g. behind
/// an `Arc`) by any number of concurrent requests.
///
/// # Example
/// ```rust,no_run
/// use medclare::{AnalysisConfig, Analyzer};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AnalysisConfig::from_env().build()?;
/// let analyzer = Analyzer::from_config(config)?;
/// let result = analyzer.analyze_file("blood_test.pdf", "Spanish").await?;
/// println!("{}", result.analysis);
/// # Ok(())
/// # }
/// ```
pub struct Analyzer {
    config: AnalysisConfig,
    backend: Arc<dyn ChatBackend>,
    progress: Option<ProgressCallback>,
}

impl Analyzer {
    /// Analyzer over a caller-supplied backend.
    pub fn new(config: AnalysisConfig, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            config,
            backend,
            progress: None,
        }
    }

    /// Analyzer over the HTTPS chat-completions client.
    pub fn from_config(config: AnalysisConfig) -> Result<Self, MedClareError> {
        let client = HttpChatClient::new(&config)
            .map_err(|e| MedClareError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self::new(config, Arc::new(client)))
    }

    /// Receive per-phase progress events.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    // ── Entry points ─────────────────────────────────────────────────────

    /// Analyse uploaded bytes of the given `Content-Type`.
    ///
    /// # Errors
    /// - [`MedClareError::UnsupportedInput`] for anything but PDF/PNG/JPEG
    /// - [`MedClareError::ApiKeyMissing`] before any work is done
    /// - [`MedClareError::ExtractionFailed`] for unreadable PDFs
    /// - [`MedClareError::AllModelsFailed`] when generate or verify fails
    pub async fn analyze_document(
        &self,
        bytes: &[u8],
        content_type: &str,
        language: &str,
    ) -> Result<AnalysisResult, MedClareError> {
        let kind = DocumentKind::from_content_type(content_type)?;
        self.analyze_bytes(bytes, kind, language).await
    }

    /// Analyse a report file; the type comes from the extension.
    pub async fn analyze_file(
        &self,
        path: impl AsRef<Path>,
        language: &str,
    ) -> Result<AnalysisResult, MedClareError> {
        let path = path.as_ref();
        let kind = DocumentKind::from_path(path)?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MedClareError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                MedClareError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        self.analyze_bytes(&bytes, kind, language).await
    }

    async fn analyze_bytes(
        &self,
        bytes: &[u8],
        kind: DocumentKind,
        language: &str,
    ) -> Result<AnalysisResult, MedClareError> {
        self.config.require_api_key()?;
        let content = input::prepare_input(bytes, kind, self.config.max_rendered_pixels).await?;
        let request = AnalysisRequest::new(content).with_language(language);
        self.analyze(&request).await
    }

    /// Run all phases on prepared content.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, MedClareError> {
        self.config.require_api_key()?;
        let start = Instant::now();
        info!(
            "Starting analysis: {} input, language {}",
            if request.content.is_image() { "image" } else { "text" },
            request.language
        );

        let draft = self.generate(&request.content).await?;
        let verified = self.verify(&draft).await?;

        let mut models = PhaseModels {
            generate: draft.model.clone(),
            verify: verified.model.clone(),
            translate: None,
        };

        let (analysis, translated) = if input::is_english(&request.language) {
            debug!("English requested, translate phase skipped");
            self.notify_skipped(Phase::Translate, "English requested");
            (verified.markdown.clone(), false)
        } else {
            match self
                .translate_phase(&verified.markdown, &draft.sections.raw_data, &request.language)
                .await
            {
                Some((text, model)) => {
                    models.translate = Some(model);
                    (text, true)
                }
                None => (verified.markdown.clone(), false),
            }
        };

        info!(
            "Analysis complete in {}ms (tone {}, translated: {})",
            start.elapsed().as_millis(),
            verified.tone,
            translated
        );

        Ok(AnalysisResult {
            analysis,
            raw_data: draft.sections.raw_data,
            language: request.language.clone(),
            translated,
            age: draft.sections.age,
            tone: verified.tone,
            models,
        })
    }

    /// Translate finished English Markdown into `language`.
    ///
    /// Never fails because of the model: on any failure the English text is
    /// returned unchanged. Only a missing API key is an error.
    pub async fn translate(
        &self,
        english_markdown: &str,
        raw_data: &str,
        language: &str,
    ) -> Result<String, MedClareError> {
        self.config.require_api_key()?;
        if input::is_english(language) {
            self.notify_skipped(Phase::Translate, "English requested");
            return Ok(english_markdown.to_string());
        }
        Ok(self
            .translate_phase(english_markdown, raw_data, language)
            .await
            .map(|(text, _)| text)
            .unwrap_or_else(|| english_markdown.to_string()))
    }

    // ── Phases ───────────────────────────────────────────────────────────

    /// Phase 1: transcribe and draft.
    pub async fn generate(&self, content: &ReportInput) -> Result<Draft, MedClareError> {
        let message = match content {
            ReportInput::PlainText(text) => ChatMessage::user(prompts::generate_text_prompt(text)),
            ReportInput::RasterImage { bytes, mime } => {
                ChatMessage::user_with_image(prompts::generate_prompt(), to_data_url(bytes, mime))
            }
        };

        let out = self.run_phase(Phase::Generate, &[message]).await?;
        let sections = parse_sections(&out.content, content.source_text());
        if sections.full_text_fallback {
            warn!(
                "generate: {} ignored the section format; using the whole response",
                out.model
            );
        }
        debug!("generate: detected age {:?}", sections.age);

        Ok(Draft {
            sections,
            model: out.model,
        })
    }

    /// Phase 2: verify the draft and apply the age-based tone.
    pub async fn verify(&self, draft: &Draft) -> Result<VerifiedAnalysis, MedClareError> {
        let tone = Tone::from_age(&draft.sections.age);
        debug!("verify: age {:?} → {} tone", draft.sections.age, tone);

        let prompt = prompts::verify_prompt(
            &draft.sections.raw_data,
            &draft.sections.explanation,
            &draft.sections.suggestions,
            tone,
        );
        let out = self.run_phase(Phase::Verify, &[ChatMessage::user(prompt)]).await?;

        let mut markdown = clean_markdown(&out.content);
        if markdown.trim().is_empty() {
            warn!("verify: {} returned only formatting, keeping the draft", out.model);
            markdown = clean_markdown(&draft.sections.explanation);
        }

        Ok(VerifiedAnalysis {
            markdown,
            tone,
            model: out.model,
        })
    }

    /// Phase 3 with failure absorbed: `None` means "use the English text".
    async fn translate_phase(
        &self,
        english_markdown: &str,
        raw_data: &str,
        language: &str,
    ) -> Option<(String, String)> {
        let prompt = prompts::translate_prompt(english_markdown, raw_data, language);
        match self.run_phase(Phase::Translate, &[ChatMessage::user(prompt)]).await {
            Ok(out) => {
                let text = clean_markdown(&out.content);
                if text.trim().is_empty() {
                    warn!("translate: {} returned only formatting, keeping English", out.model);
                    return None;
                }
                Some((text, out.model))
            }
            Err(e) => {
                warn!("translate: falling back to English: {e}");
                self.notify_skipped(Phase::Translate, &e.to_string());
                None
            }
        }
    }

    async fn run_phase(
        &self,
        phase: Phase,
        messages: &[ChatMessage],
    ) -> Result<PhaseOutput, MedClareError> {
        if let Some(cb) = &self.progress {
            cb.on_phase_start(phase);
        }
        let out = complete_with_fallback(
            self.backend.as_ref(),
            phase,
            self.config.candidates_for(phase),
            messages,
            &CompletionOptions::from_config(&self.config),
            self.progress.as_ref(),
        )
        .await?;
        if let Some(cb) = &self.progress {
            cb.on_phase_complete(phase, &out.model, out.content.len());
        }
        Ok(out)
    }

    fn notify_skipped(&self, phase: Phase, reason: &str) {
        if let Some(cb) = &self.progress {
            cb.on_phase_skipped(phase, reason);
        }
    }
}
