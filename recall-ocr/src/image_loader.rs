//! Image loader (§4.4)
//!
//! Resolves a frame's `image_ref` (an absolute path or a `file://` URI) to
//! raw image bytes, distinguishing "file does not exist" from "file exists
//! but could not be read/decoded".

use std::path::Path;
use thiserror::Error;

/// Error surfaced by the image loader. Kept separate from `OcrError` /
/// `VisionError` so both workers can map it onto their own per-frame error
/// message without the adapter caring which stage called it.
#[derive(Error, Debug)]
pub enum ImageLoadError {
    #[error("could not load image: {0}")]
    NotFound(String),

    #[error("could not load image: {0}")]
    LoadError(String),
}

/// Strip a `file://` prefix from an `image_ref`, if present.
fn strip_file_scheme(image_ref: &str) -> &str {
    image_ref.strip_prefix("file://").unwrap_or(image_ref)
}

/// Resolve `image_ref` to raw bytes. Distinguishes a missing file (the most
/// common per-frame input error, §7 category 2) from any other read
/// failure.
pub fn load_image_bytes(image_ref: &str) -> Result<Vec<u8>, ImageLoadError> {
    let path = strip_file_scheme(image_ref);

    if !Path::new(path).exists() {
        return Err(ImageLoadError::NotFound(path.to_string()));
    }

    std::fs::read(path).map_err(|e| ImageLoadError::LoadError(format!("{path}: {e}")))
}

/// Decode `image_ref` into an `image::DynamicImage`, used by the OCR engine
/// adapter (which needs pixel data, not just bytes).
pub fn load_image(image_ref: &str) -> Result<image::DynamicImage, ImageLoadError> {
    let bytes = load_image_bytes(image_ref)?;
    image::load_from_memory(&bytes)
        .map_err(|e| ImageLoadError::LoadError(format!("{image_ref}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn write_test_png(dir: &std::path::Path, name: &str) -> String {
        let path = dir.join(name);
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(4, 4);
        img.save(&path).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn strips_file_scheme_prefix() {
        assert_eq!(strip_file_scheme("file:///tmp/x.png"), "/tmp/x.png");
        assert_eq!(strip_file_scheme("/tmp/x.png"), "/tmp/x.png");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_image_bytes("/definitely/does/not/exist.png").unwrap_err();
        assert!(matches!(err, ImageLoadError::NotFound(_)));
    }

    #[test]
    fn existing_file_loads_successfully() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_png(dir.path(), "frame.png");

        let image = load_image(&path).unwrap();
        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 4);
    }

    #[test]
    fn file_scheme_uri_loads_successfully() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_png(dir.path(), "frame.png");
        let uri = format!("file://{path}");

        let image = load_image(&uri).unwrap();
        assert_eq!(image.width(), 4);
    }

    #[test]
    fn corrupt_file_is_a_load_error_not_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.png");
        std::fs::write(&path, b"not a real png").unwrap();

        let err = load_image(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ImageLoadError::LoadError(_)));
    }
}
