//! # medclare
//!
//! Explain medical reports to patients in plain language, in their own
//! language, using chat-completion LLMs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PNG / JPEG
//!  │
//!  ├─ 1. Input      classify the upload; digital PDF → text, scan/photo → image
//!  ├─ 2. Generate   transcribe findings, detect age, draft an explanation
//!  ├─ 3. Parse      AGE / RAW_DATA / EXPLANATION / SUGGESTIONS sections
//!  ├─ 4. Verify     fact-check the draft, rewrite it in an age-matched tone
//!  ├─ 5. Translate  mirror the English Markdown into the requested language
//!  └─ 6. Output     final Markdown + the verbatim raw findings
//! ```
//!
//! Every model call walks an ordered list of model candidates and moves on
//! when one fails. Translation is best effort: if it fails the English
//! analysis is returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medclare::{AnalysisConfig, Analyzer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from MEDCLARE_API_KEY / OPENROUTER_API_KEY
//!     let config = AnalysisConfig::from_env().build()?;
//!     let analyzer = Analyzer::from_config(config)?;
//!
//!     let bytes = std::fs::read("lipid_panel.pdf")?;
//!     let result = analyzer
//!         .analyze_document(&bytes, "application/pdf", "Spanish")
//!         .await?;
//!     println!("{}", result.analysis);
//!     eprintln!("raw findings:\n{}", result.raw_data);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `medclare` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::Analyzer;
pub use client::{ChatBackend, ChatMessage, CompletionOptions, HttpChatClient};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use error::{ChatError, MedClareError};
pub use output::{
    AnalysisResult, Draft, PhaseModels, TranslateRequest, TranslateResponse, UploadResponse,
    VerifiedAnalysis,
};
pub use pipeline::input::{AnalysisRequest, DocumentKind, ReportInput};
pub use pipeline::llm::{FallbackPolicy, Phase};
pub use pipeline::parse::{parse_sections, ParsedSections};
pub use pipeline::tone::Tone;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
