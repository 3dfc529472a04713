//! Input resolution: turn uploads, local paths and URLs into
//! [`UploadedDocument`]s with a known [`MediaKind`].
//!
//! The kind is detected from magic bytes first, because browsers and users
//! both lie about extensions; the extension is only a fallback for formats
//! whose signature we do not sniff.

use crate::error::{ExtractionError, StudyDeckError};
use crate::types::{MediaKind, UploadedDocument};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Detect the media kind of `bytes`, falling back to `name`'s extension.
pub fn detect_kind(name: &str, bytes: &[u8]) -> Option<MediaKind> {
    sniff_magic(bytes).or_else(|| kind_from_extension(name))
}

fn sniff_magic(bytes: &[u8]) -> Option<MediaKind> {
    if bytes.starts_with(b"%PDF") {
        return Some(MediaKind::Pdf);
    }
    match image::guess_format(bytes).ok()? {
        image::ImageFormat::Png => Some(MediaKind::Png),
        image::ImageFormat::Jpeg => Some(MediaKind::Jpeg),
        image::ImageFormat::WebP => Some(MediaKind::Webp),
        image::ImageFormat::Gif => Some(MediaKind::Gif),
        image::ImageFormat::Bmp => Some(MediaKind::Bmp),
        image::ImageFormat::Tiff => Some(MediaKind::Tiff),
        _ => None,
    }
}

fn kind_from_extension(name: &str) -> Option<MediaKind> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MediaKind::Pdf),
        "png" => Some(MediaKind::Png),
        "jpg" | "jpeg" => Some(MediaKind::Jpeg),
        "webp" => Some(MediaKind::Webp),
        "gif" => Some(MediaKind::Gif),
        "bmp" => Some(MediaKind::Bmp),
        "tif" | "tiff" => Some(MediaKind::Tiff),
        _ => None,
    }
}

/// Wrap uploaded bytes, rejecting empty and unsupported files.
pub fn document_from_bytes(name: &str, bytes: Vec<u8>) -> Result<UploadedDocument, ExtractionError> {
    let name = if name.trim().is_empty() {
        "uploaded_file".to_string()
    } else {
        name.trim().to_string()
    };

    if bytes.is_empty() {
        return Err(ExtractionError::UnsupportedFormat {
            name,
            detail: "file is empty".into(),
        });
    }

    let kind = detect_kind(&name, &bytes).ok_or_else(|| {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        ExtractionError::UnsupportedFormat {
            name: name.clone(),
            detail: format!("unrecognised content (first bytes: {magic:?})"),
        }
    })?;

    debug!("Detected {} as {:?} ({} bytes)", name, kind, bytes.len());
    Ok(UploadedDocument { name, kind, bytes })
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local path or download a URL into an [`UploadedDocument`].
pub async fn load_document(input: &str, timeout_secs: u64) -> Result<UploadedDocument, StudyDeckError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(input).await
    }
}

async fn load_local(path_str: &str) -> Result<UploadedDocument, StudyDeckError> {
    let path = PathBuf::from(path_str);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StudyDeckError::FileNotFound { path: path.clone() }
        } else {
            StudyDeckError::Internal(format!("Failed to read '{}': {e}", path.display()))
        }
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path_str.to_string());
    Ok(document_from_bytes(&name, bytes)?)
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedDocument, StudyDeckError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StudyDeckError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| StudyDeckError::Download {
        url: url.to_string(),
        reason: if e.is_timeout() {
            format!("timed out after {timeout_secs}s")
        } else {
            e.to_string()
        },
    })?;

    if !response.status().is_success() {
        return Err(StudyDeckError::Download {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| StudyDeckError::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(document_from_bytes(&filename_from_url(url), bytes.to_vec())?)
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded_file".to_string()
}
