//! Attachment encoding: [`UploadedDocument`] → base64 [`Attachment`].
//!
//! PNG, JPEG, WEBP and PDF go to the API untouched when they fit the pixel
//! cap. Other image formats, and oversized images, are decoded, downscaled
//! and re-encoded as PNG. PNG is lossless: text crispness matters more than
//! file size for OCR accuracy.

use crate::backend::Attachment;
use crate::error::ExtractionError;
use crate::types::{MediaKind, UploadedDocument};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use tracing::debug;

/// Encode a document for the vision API.
///
/// CPU-bound for images that need re-encoding; call from `spawn_blocking`.
pub fn encode_document(doc: &UploadedDocument, max_pixels: u32) -> Result<Attachment, ExtractionError> {
    if doc.kind == MediaKind::Pdf {
        return Ok(attachment(&doc.bytes, doc.kind.mime_type()));
    }

    let img = image::load_from_memory(&doc.bytes).map_err(|e| ExtractionError::UnsupportedFormat {
        name: doc.name.clone(),
        detail: format!("image could not be decoded: {e}"),
    })?;

    let (w, h) = img.dimensions();
    if doc.kind.is_natively_supported() && w.max(h) <= max_pixels {
        debug!("{}: {}x{} px, sent as-is", doc.name, w, h);
        return Ok(attachment(&doc.bytes, doc.kind.mime_type()));
    }

    let img = downscale(img, max_pixels);
    let png = encode_png(&img).map_err(|e| ExtractionError::UnsupportedFormat {
        name: doc.name.clone(),
        detail: format!("image could not be re-encoded: {e}"),
    })?;
    debug!(
        "{}: {}x{} px re-encoded as {}x{} PNG",
        doc.name,
        w,
        h,
        img.width(),
        img.height()
    );
    Ok(attachment(&png, "image/png"))
}

fn attachment(bytes: &[u8], mime_type: &str) -> Attachment {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} → {} bytes base64", mime_type, b64.len());
    Attachment {
        mime_type: mime_type.to_string(),
        base64: b64,
    }
}

/// Shrink so the longest edge is at most `max_pixels`, keeping aspect ratio.
fn downscale(img: DynamicImage, max_pixels: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w.max(h) <= max_pixels {
        img
    } else {
        img.resize(max_pixels, max_pixels, image::imageops::FilterType::Lanczos3)
    }
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}
