//! Image loading and data-URI encoding for the vision adapter (§4.3, §4.4)

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::path::Path;
use thiserror::Error;

/// Mirrors the OCR stage's image loader contract: missing files and
/// unreadable files are distinguished so the worker can record an accurate
/// per-frame error message.
#[derive(Error, Debug)]
pub enum ImageEncodeError {
    #[error("could not load image: {0}")]
    NotFound(String),

    #[error("could not load image: {0}")]
    LoadError(String),
}

fn strip_file_scheme(image_ref: &str) -> &str {
    image_ref.strip_prefix("file://").unwrap_or(image_ref)
}

fn mime_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Resolve `image_ref` and encode it as a `data:<mime>;base64,<payload>`
/// URI suitable for a chat-completions image part.
pub fn to_data_uri(image_ref: &str) -> Result<String, ImageEncodeError> {
    let path = strip_file_scheme(image_ref);

    if !Path::new(path).exists() {
        return Err(ImageEncodeError::NotFound(path.to_string()));
    }

    let bytes =
        std::fs::read(path).map_err(|e| ImageEncodeError::LoadError(format!("{path}: {e}")))?;

    let mime = mime_for(path);
    let payload = BASE64.encode(&bytes);

    Ok(format!("data:{mime};base64,{payload}"))
}
