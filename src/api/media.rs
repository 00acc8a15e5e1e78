//! Storage of uploaded walk photos under the configured upload root.
//!
//! Files live at `walk_photos/<session_id>/<uuid>.<ext>` relative to the
//! upload root; that relative path is what gets stored on the photo row and
//! what `/media/` serves.

use std::path::{Path, PathBuf};
use thiserror::Error;

use super::error::ApiError;

/// Image extensions accepted for walk photos
const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "heic"];

const PHOTO_DIR: &str = "walk_photos";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unsupported image type '{0}'. Supported: jpeg, png, gif, webp, heic")]
    UnsupportedType(String),

    #[error("The submitted file is empty.")]
    Empty,

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnsupportedType(_) | MediaError::Empty => {
                ApiError::validation_field("image", err.to_string())
            }
            MediaError::Io(ref e) => {
                tracing::error!(error = %e, "Media storage error");
                ApiError::internal("Failed to store uploaded file")
            }
        }
    }
}

/// Pick the stored extension for an upload.
///
/// The file name's extension wins when it is an accepted image type;
/// otherwise the declared content type is mapped through `mime_guess`.
pub fn image_extension(
    file_name: Option<&str>,
    content_type: Option<&str>,
) -> Result<String, MediaError> {
    if let Some(content_type) = content_type {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        if !essence.starts_with("image/") && essence != "application/octet-stream" {
            return Err(MediaError::UnsupportedType(essence.to_string()));
        }
    }

    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    if let Some(ref ext) = from_name {
        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(ext.clone());
        }
    }

    let from_type = content_type
        .map(|ct| ct.split(';').next().unwrap_or_default().trim())
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|exts| exts.iter().find(|ext| ALLOWED_EXTENSIONS.contains(*ext)));

    match (from_type, from_name) {
        (Some(ext), _) => Ok(ext.to_string()),
        (None, Some(ext)) => Err(MediaError::UnsupportedType(ext)),
        (None, None) => Err(MediaError::UnsupportedType(
            content_type.unwrap_or("unknown").to_string(),
        )),
    }
}

/// Relative path for a new photo of a session
pub fn photo_path(session_id: i64, ext: &str) -> String {
    format!("{}/{}/{}.{}", PHOTO_DIR, session_id, uuid::Uuid::new_v4(), ext)
}

/// Write an upload below `upload_dir`, creating directories as needed.
///
/// Returns the relative path that was written.
pub async fn save_photo(
    upload_dir: &Path,
    session_id: i64,
    ext: &str,
    data: &[u8],
) -> Result<String, MediaError> {
    if data.is_empty() {
        return Err(MediaError::Empty);
    }

    let relative = photo_path(session_id, ext);
    let full = upload_dir.join(&relative);
    if let Some(parent) = full.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&full, data).await?;

    tracing::debug!(session_id, path = %full.display(), bytes = data.len(), "Stored photo");
    Ok(relative)
}

/// Delete stored files. Failures are logged and otherwise ignored.
pub async fn remove_files(upload_dir: &Path, relative_paths: &[String]) {
    for relative in relative_paths {
        let full: PathBuf = upload_dir.join(relative);
        if let Err(e) = tokio::fs::remove_file(&full).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %full.display(), error = %e, "Failed to remove photo file");
            }
        }
    }
}
