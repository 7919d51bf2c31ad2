//! Image Attachments
//!
//! Loads an image from disk into the inline-data form the chat backend accepts.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading an attachment
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File has no content
    #[error("{0} is empty")]
    Empty(PathBuf),

    /// File exceeds the configured limit
    #[error("{path} is {size} bytes (limit {limit})")]
    TooLarge {
        /// Offending path
        path: PathBuf,
        /// Actual size
        size: u64,
        /// Configured limit
        limit: u64,
    },

    /// Extension is not a supported image type
    #[error("{0} is not a supported image type")]
    UnsupportedType(PathBuf),
}

/// An image ready to be sent as inline data
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// MIME type inferred from the extension
    pub mime_type: String,
    /// Base64 encoded bytes
    pub data: String,
    /// Source file name, for display
    pub file_name: String,
}

impl ImageAttachment {
    /// Read and encode an image file
    pub async fn load(path: &Path, max_bytes: u64) -> Result<Self, AttachmentError> {
        let mime_type =
            mime_for_path(path).ok_or_else(|| AttachmentError::UnsupportedType(path.to_path_buf()))?;

        let io_err = |source| AttachmentError::Io {
            path: path.to_path_buf(),
            source,
        };
        let size = tokio::fs::metadata(path).await.map_err(io_err)?.len();
        if size > max_bytes {
            return Err(AttachmentError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: max_bytes,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(io_err)?;
        if bytes.is_empty() {
            return Err(AttachmentError::Empty(path.to_path_buf()));
        }

        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        tracing::debug!(file = %file_name, mime = mime_type, bytes = bytes.len(), "Loaded attachment");
        Ok(Self::from_bytes(mime_type, &bytes, file_name))
    }

    /// Encode raw bytes
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8], file_name: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
            file_name: file_name.into(),
        }
    }

    /// `data:` URL form
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// MIME type for a supported image extension
#[must_use]
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "tower.PNG", b"\x89PNG fake");

        let image = ImageAttachment::load(&path, 1024).await.unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.file_name, "tower.PNG");
        assert_eq!(image.data, STANDARD.encode(b"\x89PNG fake"));
        assert!(image.data_url().starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write_file(&dir, "empty.jpg", b"");
        let big = write_file(&dir, "big.jpeg", &[0u8; 64]);
        let text = write_file(&dir, "notes.txt", b"hello");

        assert!(matches!(
            ImageAttachment::load(&empty, 1024).await,
            Err(AttachmentError::Empty(_))
        ));
        assert!(matches!(
            ImageAttachment::load(&big, 16).await,
            Err(AttachmentError::TooLarge { size: 64, limit: 16, .. })
        ));
        assert!(matches!(
            ImageAttachment::load(&text, 1024).await,
            Err(AttachmentError::UnsupportedType(_))
        ));
        assert!(matches!(
            ImageAttachment::load(&dir.path().join("missing.png"), 1024).await,
            Err(AttachmentError::Io { .. })
        ));
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.webp")), Some("image/webp"));
        assert_eq!(mime_for_path(Path::new("a.HEIF")), Some("image/heif"));
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }
}
