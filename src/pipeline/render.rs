//! PDF rasterisation: render page 1 of a scanned report to PNG via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking pool so the
//! runtime's worker threads keep serving other requests.
//!
//! ## Why only page 1?
//!
//! A scanned report arrives as one image per page and the generate phase
//! sends exactly one image. Lab result sheets put the patient header and the
//! findings table on the first page.

use crate::error::MedClareError;
use crate::pipeline::encode::encode_png;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium library file.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to the pdfium library.
///
/// Lookup order: `PDFIUM_LIB_PATH`, then the working directory, then the
/// system library search path.
pub(crate) fn bind_pdfium() -> Result<Pdfium, MedClareError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            debug!("Binding pdfium from {PDFIUM_LIB_PATH_ENV}={path}");
            Pdfium::bind_to_library(path.trim())
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    };
    bindings
        .map(Pdfium::new)
        .map_err(|e| MedClareError::PdfiumBindingFailed(e.to_string()))
}

/// Map a pdfium load failure to a readable error.
pub(crate) fn load_failed(e: PdfiumError) -> MedClareError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        MedClareError::ExtractionFailed {
            detail: "the PDF is password protected".to_string(),
        }
    } else {
        MedClareError::ExtractionFailed { detail }
    }
}

/// Render the first page of `pdf_bytes` to PNG bytes.
///
/// The longest edge is capped at `max_pixels`.
pub async fn render_first_page(pdf_bytes: &[u8], max_pixels: u32) -> Result<Vec<u8>, MedClareError> {
    let bytes = pdf_bytes.to_vec();

    tokio::task::spawn_blocking(move || render_first_page_blocking(&bytes, max_pixels))
        .await
        .map_err(|e| MedClareError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of first-page rendering.
fn render_first_page_blocking(pdf_bytes: &[u8], max_pixels: u32) -> Result<Vec<u8>, MedClareError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(load_failed)?;

    let pages = document.pages();
    info!("PDF loaded for rasterisation: {} pages", pages.len());
    if pages.len() == 0 {
        return Err(MedClareError::RasterisationFailed {
            page: 1,
            detail: "document has no pages".to_string(),
        });
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let page = pages.get(0).map_err(|e| MedClareError::RasterisationFailed {
        page: 1,
        detail: format!("{:?}", e),
    })?;

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| MedClareError::RasterisationFailed {
            page: 1,
            detail: format!("{:?}", e),
        })?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 → {}x{} px", image.width(), image.height());

    encode_png(&image).map_err(|e| MedClareError::RasterisationFailed {
        page: 1,
        detail: format!("PNG encoding failed: {}", e),
    })
}
