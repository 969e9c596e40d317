//! Text extraction: the text layer of a digital PDF, page by page.
//!
//! A blank result is not an error. It is how a scanned report looks from
//! here, and [`crate::pipeline::input`] uses it to switch to the image path.

use crate::error::MedClareError;
use crate::pipeline::render::{bind_pdfium, load_failed};
use tracing::{debug, warn};

/// Extract the text of every page of `pdf_bytes`, in document order.
///
/// Pages are joined with [`join_pages`]: `\r\n` and lone `\r` become `\n`,
/// and every page that does not already end in a newline gets one, so the
/// last line of a page never runs into the first line of the next.
///
/// # Errors
/// [`MedClareError::ExtractionFailed`] when the document cannot be opened.
pub async fn extract_text(pdf_bytes: &[u8]) -> Result<String, MedClareError> {
    let bytes = pdf_bytes.to_vec();

    tokio::task::spawn_blocking(move || extract_text_blocking(&bytes))
        .await
        .map_err(|e| MedClareError::Internal(format!("Extraction task panicked: {}", e)))?
}

fn extract_text_blocking(pdf_bytes: &[u8]) -> Result<String, MedClareError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(load_failed)?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        match page.text() {
            Ok(text) => pages.push(text.all()),
            Err(e) => {
                warn!("Page {}: no text layer ({:?})", idx + 1, e);
                pages.push(String::new());
            }
        }
    }

    let text = join_pages(&pages);
    debug!("Extracted {} chars from {} pages", text.len(), pages.len());
    Ok(text)
}

/// Concatenate page texts in order, each terminated by a newline.
///
/// Line endings are normalised so the prompt sees plain `\n`; whitespace-only
/// pages stay whitespace so a fully scanned document still reads as blank.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut out = String::new();
    for page in pages {
        let text = page.as_ref().replace("\r\n", "\n").replace('\r', "\n");
        out.push_str(&text);
        if !text.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_joined_in_order() {
        let text = join_pages(&["Patient: Jane\r\nAge: 8", "Hemoglobin 10.1", "Page three\n"]);
        assert_eq!(text, "Patient: Jane\nAge: 8\nHemoglobin 10.1\nPage three\n");
    }

    #[test]
    fn page_boundaries_get_a_newline() {
        assert_eq!(join_pages(&["WBC 6.1", "RBC 4.8"]), "WBC 6.1\nRBC 4.8\n");
        assert_eq!(join_pages(&["Old Mac\rline"]), "Old Mac\nline\n");
    }

    #[test]
    fn scanned_pages_are_blank() {
        let text = join_pages(&["", " ", ""]);
        assert!(text.trim().is_empty());
    }

    #[test]
    fn no_pages_is_empty() {
        assert_eq!(join_pages::<&str>(&[]), "");
    }
}
