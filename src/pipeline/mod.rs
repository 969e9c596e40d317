//! Pipeline stages for medical report analysis.
//!
//! Each submodule implements exactly one transformation step, so each is
//! testable on its own and the orchestrator in [`crate::analyze`] reads as a
//! plain sequence of calls.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──┬──────────────▶ llm (generate) ──▶ parse ──▶ tone
//! (kind)    (pdfium)  └─▶ render ─▶ encode                              │
//!                         (page 1)  (data URL)                          ▼
//!                          llm (translate) ◀── postprocess ◀── llm (verify)
//! ```
//!
//! 1. [`input`]      : classify the upload and route PDF text vs. image
//! 2. [`extract`]    : digital PDF text, page by page
//! 3. [`render`]     : rasterise page 1 of a scanned PDF; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 4. [`encode`]     : base64 `data:` URL for the multimodal message part
//! 5. [`llm`]        : run a phase against the model candidate list
//! 6. [`parse`]      : pull AGE / RAW_DATA / EXPLANATION / SUGGESTIONS out
//!    of the generate response
//! 7. [`tone`]       : pick the verify-phase register from the detected age
//! 8. [`postprocess`]: deterministic Markdown cleanup of model output

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;
pub mod postprocess;
pub mod render;
pub mod tone;
