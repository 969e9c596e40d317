//! Model fallback: run one phase's messages across the candidate list.
//!
//! This module is thin. All prompt engineering lives in
//! [`crate::prompts`] and all wire details in [`crate::client`].
//!
//! ## Fallback Strategy
//!
//! Candidates are tried strictly in order, one call each, no sleeping between
//! them. Free-tier gateway models disappear or get rate-limited without
//! notice, and the next candidate is usually healthy, so a linear walk beats
//! retrying the same model. The first success wins; when every candidate
//! fails the phase fails with the last error attached.

use crate::client::{ChatBackend, ChatMessage, CompletionOptions};
use crate::error::{ChatError, MedClareError};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One sequential stage of the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Phase 1: transcribe findings and draft an explanation.
    Generate,
    /// Phase 2: verify the draft against the raw data and set the tone.
    Verify,
    /// Phase 3: translate the verified English Markdown.
    Translate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Generate => "generate",
            Phase::Verify => "verify",
            Phase::Translate => "translate",
        })
    }
}

/// Which candidates a phase may fall back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Walk the whole candidate list. (default)
    #[default]
    AllCandidates,
    /// Only the primary (first) model; behaves as a one-element list.
    PrimaryOnly,
}

/// A successful phase call.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutput {
    /// Model id that answered.
    pub model: String,
    /// Raw assistant text.
    pub content: String,
    /// Candidates that failed before this one.
    pub failed_attempts: usize,
}

/// Run `messages` against each model in `candidates` until one succeeds.
///
/// # Errors
/// [`MedClareError::AllModelsFailed`] with the last [`ChatError`] when every
/// candidate fails, or [`MedClareError::InvalidConfig`] when `candidates` is
/// empty.
pub async fn complete_with_fallback(
    backend: &dyn ChatBackend,
    phase: Phase,
    candidates: &[String],
    messages: &[ChatMessage],
    options: &CompletionOptions,
    progress: Option<&ProgressCallback>,
) -> Result<PhaseOutput, MedClareError> {
    if candidates.is_empty() {
        return Err(MedClareError::InvalidConfig(format!(
            "No model candidates configured for the {phase} phase"
        )));
    }

    let mut last_err: Option<ChatError> = None;

    for (attempt, model) in candidates.iter().enumerate() {
        let start = Instant::now();
        info!("{phase}: attempting {model} ({}/{})", attempt + 1, candidates.len());
        if let Some(cb) = progress {
            cb.on_model_attempt(phase, model);
        }

        let result = match backend.complete(model, messages, options).await {
            Ok(content) if content.trim().is_empty() => Err(ChatError::EmptyContent),
            other => other,
        };

        match result {
            Ok(content) => {
                debug!(
                    "{phase}: {model} answered {} chars in {:?}",
                    content.len(),
                    start.elapsed()
                );
                return Ok(PhaseOutput {
                    model: model.clone(),
                    content,
                    failed_attempts: attempt,
                });
            }
            Err(e) => {
                warn!("{phase}: model {model} failed: {e}");
                if let Some(cb) = progress {
                    cb.on_model_failed(phase, model, &e.to_string());
                }
                last_err = Some(e);
            }
        }
    }

    Err(MedClareError::AllModelsFailed {
        phase,
        attempts: candidates.len(),
        last_error: last_err.unwrap_or_else(|| ChatError::Transport("Unknown error".into())),
    })
}
