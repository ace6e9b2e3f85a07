//! On-disk storage for complaint images.
//!
//! Files land under `<data_dir>/uploads` with a generated
//! `<millis>-<uuid>.<ext>` name and are served read-only at `/uploads/...`;
//! the relative URL is what gets persisted on the complaint row. Content
//! types are allow-listed and sizes bounded before anything touches disk.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// URL prefix that stored images are served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Accepted content types and the extension each is stored with. The
/// extension comes from this table, never from the client filename.
const ALLOWED_TYPES: [(&str, &str); 4] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("failed to write image")]
    Io(#[from] std::io::Error),
}

/// Map a content type to its storage extension, if allow-listed.
fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}

/// Generate a collision-resistant filename: millisecond timestamp plus a
/// random uuid, with the extension for the (already validated) type.
fn generate_filename(ext: &str) -> String {
    format!(
        "{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4(),
        ext
    )
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and persist an uploaded image, returning the relative URL
    /// path to store on the complaint row.
    pub async fn save(&self, content_type: &str, data: &[u8]) -> Result<String, UploadError> {
        let ext = extension_for(content_type)
            .ok_or_else(|| UploadError::UnsupportedType(content_type.to_string()))?;

        if data.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: data.len(),
                max: self.max_bytes,
            });
        }

        let filename = generate_filename(ext);
        tokio::fs::write(self.dir.join(&filename), data).await?;

        Ok(format!("{}/{}", PUBLIC_PREFIX, filename))
    }

    /// Best-effort removal of a previously stored image. Paths that do not
    /// point at a plain file directly under the uploads directory are
    /// ignored.
    pub async fn remove(&self, url_path: &str) {
        let Some(filename) = url_path.strip_prefix(&format!("{}/", PUBLIC_PREFIX)) else {
            return;
        };
        if filename.is_empty() || filename.contains('/') || filename.contains("..") {
            return;
        }

        if let Err(e) = tokio::fs::remove_file(self.dir.join(filename)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %url_path, error = %e, "Failed to remove stored image");
            }
        }
    }
}
