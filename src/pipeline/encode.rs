//! Image encoding: raster bytes → base64 `data:` URL.
//!
//! Chat-completion APIs accept images inline as `data:<mime>;base64,<…>` URLs
//! inside an `image_url` content part. Rasterised PDF pages are always PNG;
//! direct uploads keep their original bytes and mime type, so a JPEG photo of
//! a report is sent as a JPEG rather than re-encoded.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Wrap raw image bytes as a `data:` URL.
pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} image → {} bytes base64", mime, b64.len());
    format!("data:{mime};base64,{b64}")
}

/// Encode a rendered page as PNG bytes.
///
/// PNG is lossless; JPEG artefacts around small print (reference ranges,
/// units) measurably hurt transcription.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}
