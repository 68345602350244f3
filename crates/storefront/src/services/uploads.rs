//! Product image uploads.
//!
//! Files are checked by extension and magic bytes, stored under the configured
//! upload directory with a random name, and served from `/uploads/<name>`.

use std::path::Path;

use thiserror::Error;
use uuid::Uuid;

/// Maximum file size (5MB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Public path prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file `{0}` is empty")]
    Empty(String),

    #[error("file `{name}` is larger than {max} bytes")]
    TooLarge { name: String, max: usize },

    #[error("file `{0}` has no extension")]
    MissingExtension(String),

    #[error("unsupported image format `{ext}`, expected one of: {}", SUPPORTED_FORMATS.join(", "))]
    UnsupportedFormat { ext: String },

    #[error("file `{0}` is not a valid image")]
    NotAnImage(String),

    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Lowercased extension of an image file name, if supported.
///
/// # Errors
///
/// Returns `UploadError::MissingExtension` or `UploadError::UnsupportedFormat`.
pub fn image_extension(filename: &str) -> Result<String, UploadError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| UploadError::MissingExtension(filename.to_owned()))?;

    if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
        return Err(UploadError::UnsupportedFormat { ext });
    }
    Ok(ext)
}

fn looks_like(ext: &str, data: &[u8]) -> bool {
    match ext {
        "png" => data.starts_with(b"\x89PNG\r\n\x1a\n"),
        "jpg" | "jpeg" => data.starts_with(&[0xFF, 0xD8, 0xFF]),
        "gif" => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
        "webp" => data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP".as_slice()),
        _ => false,
    }
}

/// Validate an uploaded image and return its extension.
///
/// # Errors
///
/// Returns an `UploadError` describing the first check that fails.
pub fn validate_image(filename: &str, data: &[u8]) -> Result<String, UploadError> {
    if data.is_empty() {
        return Err(UploadError::Empty(filename.to_owned()));
    }
    if data.len() > MAX_IMAGE_SIZE {
        return Err(UploadError::TooLarge {
            name: filename.to_owned(),
            max: MAX_IMAGE_SIZE,
        });
    }

    let ext = image_extension(filename)?;
    if !looks_like(&ext, data) {
        return Err(UploadError::NotAnImage(filename.to_owned()));
    }
    Ok(ext)
}

/// Validate and store an image, returning its public URL path.
///
/// # Errors
///
/// Returns a validation error, or `UploadError::Io` if the file can't be written.
pub async fn save_image(
    upload_dir: &Path,
    filename: &str,
    data: &[u8],
) -> Result<String, UploadError> {
    let ext = validate_image(filename, data)?;

    tokio::fs::create_dir_all(upload_dir).await?;
    let stored_name = format!("{}.{ext}", Uuid::new_v4());
    tokio::fs::write(upload_dir.join(&stored_name), data).await?;

    tracing::debug!(original = %filename, stored = %stored_name, size = data.len(), "Stored upload");
    Ok(format!("{PUBLIC_PREFIX}/{stored_name}"))
}

/// Delete images previously returned by [`save_image`].
///
/// Anything that isn't a bare file name under [`PUBLIC_PREFIX`] is skipped.
/// Failures are logged, not returned.
pub async fn remove_images(upload_dir: &Path, urls: &[String]) {
    for url in urls {
        let Some(name) = url
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && Path::new(name).file_name() == Some(name.as_ref()))
        else {
            continue;
        };
        if let Err(e) = tokio::fs::remove_file(upload_dir.join(name)).await {
            tracing::warn!(url = %url, error = %e, "Failed to remove stored upload");
        }
    }
}
