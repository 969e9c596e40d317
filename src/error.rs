//! Error types for the medclare library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`MedClareError`]: **Fatal**: the analysis cannot proceed at all
//!   (unsupported upload, corrupt PDF, missing API key, every model
//!   candidate failed). Returned as `Err(MedClareError)` from the
//!   [`crate::Analyzer`] entry points.
//!
//! * [`ChatError`]: **Recoverable**: a single chat-completion call failed
//!   (network, timeout, non-2xx, malformed body). The pipeline absorbs these
//!   by moving on to the next model candidate; only when the whole candidate
//!   list is exhausted does the last one surface inside
//!   [`MedClareError::AllModelsFailed`].
//!
//! Section-parsing anomalies and translation failures are not errors at all:
//! the parser falls back to the full response and the translator falls back
//! to the English source text.

use crate::pipeline::llm::Phase;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the medclare library.
#[derive(Debug, Error)]
pub enum MedClareError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The upload is neither a PDF nor a PNG/JPEG image.
    #[error("Unsupported file type '{content_type}'. Accepted: application/pdf, image/png, image/jpeg")]
    UnsupportedInput { content_type: String },

    /// Input file was not found at the given path.
    #[error("Report file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The PDF could not be opened or parsed.
    #[error("Could not read the PDF document: {detail}")]
    ExtractionFailed { detail: String },

    /// Page 1 could not be rendered to an image.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No API key was configured.
    #[error("No API key configured.\nSet MEDCLARE_API_KEY (or OPENROUTER_API_KEY) before analysing a report.")]
    ApiKeyMissing,

    /// Every model candidate failed for a phase.
    #[error("All {attempts} model candidates failed during the {phase} phase.\nLast error: {last_error}")]
    AllModelsFailed {
        phase: Phase,
        attempts: usize,
        #[source]
        last_error: ChatError,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MedClareError {
    /// `true` when the caller sent something we cannot process (a 400 in HTTP
    /// terms); everything else is a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MedClareError::UnsupportedInput { .. } | MedClareError::FileNotFound { .. }
        )
    }
}

/// Failure of one chat-completion call against one model.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ChatError {
    /// Connection, TLS or body-transfer failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call exceeded the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not the expected chat-completion JSON.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// `choices[0].message.content` was missing or blank.
    #[error("response contained no content")]
    EmptyContent,
}
