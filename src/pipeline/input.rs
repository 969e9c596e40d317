//! Input routing: classify an upload and turn it into a [`ReportInput`].
//!
//! Three shapes of report arrive:
//!
//! * a digital PDF with a text layer → send the text, it is cheaper and more
//!   exact than any OCR;
//! * a scanned PDF (blank text layer) → rasterise page 1 and send the image;
//! * a PNG/JPEG photo → send the original bytes untouched.

use crate::config::DEFAULT_LANGUAGE;
use crate::error::MedClareError;
use crate::pipeline::{extract, render};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Accepted upload types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    /// Classify a `Content-Type` value (parameters such as `; charset=` are
    /// ignored).
    pub fn from_content_type(content_type: &str) -> Result<Self, MedClareError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Ok(DocumentKind::Pdf),
            "image/png" => Ok(DocumentKind::Png),
            "image/jpeg" | "image/jpg" => Ok(DocumentKind::Jpeg),
            _ => Err(MedClareError::UnsupportedInput {
                content_type: content_type.to_string(),
            }),
        }
    }

    /// Classify a file by its extension.
    pub fn from_path(path: &Path) -> Result<Self, MedClareError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "png" => Ok(DocumentKind::Png),
            "jpg" | "jpeg" => Ok(DocumentKind::Jpeg),
            _ => Err(MedClareError::UnsupportedInput {
                content_type: if ext.is_empty() {
                    "(no extension)".to_string()
                } else {
                    format!(".{ext}")
                },
            }),
        }
    }

    /// Canonical mime type.
    pub fn mime(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Png => "image/png",
            DocumentKind::Jpeg => "image/jpeg",
        }
    }
}

/// What the generate phase receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportInput {
    /// Text layer of a digital PDF.
    PlainText(String),
    /// A single raster image and its mime type.
    RasterImage { bytes: Vec<u8>, mime: String },
}

impl ReportInput {
    /// The text the model saw before analysis; empty for images.
    pub fn source_text(&self) -> &str {
        match self {
            ReportInput::PlainText(text) => text,
            ReportInput::RasterImage { .. } => "",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ReportInput::RasterImage { .. })
    }
}

/// One analysis call: the prepared content and the output language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub content: ReportInput,
    pub language: String,
}

impl AnalysisRequest {
    /// Request in the default language (English).
    pub fn new(content: ReportInput) -> Self {
        Self {
            content,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Set the output language; blank values keep English.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.language = language.trim().to_string();
        }
        self
    }
}

/// `true` when `language` means no translation is needed.
pub fn is_english(language: &str) -> bool {
    let l = language.trim();
    l.is_empty() || l.eq_ignore_ascii_case("english") || l.eq_ignore_ascii_case("en")
}

/// Decide how a PDF travels given its extracted text.
///
/// Returns `Some(PlainText)` when the text layer has content, `None` when the
/// caller must fall back to the image path.
pub fn route_pdf_text(extracted: String) -> Option<ReportInput> {
    if extracted.trim().is_empty() {
        None
    } else {
        Some(ReportInput::PlainText(extracted))
    }
}

/// Turn uploaded bytes into a [`ReportInput`].
pub async fn prepare_input(
    bytes: &[u8],
    kind: DocumentKind,
    max_rendered_pixels: u32,
) -> Result<ReportInput, MedClareError> {
    match kind {
        DocumentKind::Pdf => {
            let text = extract::extract_text(bytes).await?;
            match route_pdf_text(text) {
                Some(input) => {
                    info!("Digital PDF: using text layer");
                    Ok(input)
                }
                None => {
                    info!("Scanned PDF: no text layer, rasterising page 1");
                    let png = render::render_first_page(bytes, max_rendered_pixels).await?;
                    Ok(ReportInput::RasterImage {
                        bytes: png,
                        mime: DocumentKind::Png.mime().to_string(),
                    })
                }
            }
        }
        DocumentKind::Png | DocumentKind::Jpeg => {
            debug!("Image upload ({} bytes), sending as-is", bytes.len());
            Ok(ReportInput::RasterImage {
                bytes: bytes.to_vec(),
                mime: kind.mime().to_string(),
            })
        }
    }
}
