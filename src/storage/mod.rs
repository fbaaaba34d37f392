//! Image storage for post attachments.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// URL prefix under which the local store's files are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty upload")]
    Empty,
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Storage(e.to_string())
    }
}

/// An uploaded image, as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl ImageUpload {
    /// Declared content type, falling back to a guess from the file name.
    pub fn mime(&self) -> Option<String> {
        self.content_type.clone().or_else(|| {
            self.file_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|m| m.to_string())
        })
    }

    pub fn is_image(&self) -> bool {
        self.mime()
            .map(|m| m.starts_with("image/"))
            .unwrap_or(false)
    }

    fn extension(&self) -> String {
        let from_mime = self
            .mime()
            .and_then(|m| mime_guess::get_mime_extensions_str(&m))
            .and_then(|exts| exts.first().copied());
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
        from_name
            .or(from_mime)
            .unwrap_or("bin")
            .to_ascii_lowercase()
    }
}

/// Where post images live. Returns a URL the client can load the image from.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, upload: ImageUpload) -> Result<String, StorageError>;
}

/// Stores images as files in a directory served at [`UPLOADS_ROUTE`].
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
}

impl LocalImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(&self, upload: ImageUpload) -> Result<String, StorageError> {
        if upload.data.is_empty() {
            return Err(StorageError::Empty);
        }

        let name = format!("{}.{}", uuid::Uuid::now_v7(), upload.extension());
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), &upload.data).await?;

        tracing::debug!("Stored image {} ({} bytes)", name, upload.data.len());
        Ok(format!("{}/{}", UPLOADS_ROUTE, name))
    }
}
