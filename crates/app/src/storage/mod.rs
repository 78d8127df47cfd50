//! External image storage.
//!
//! Uploaded files are pushed to an image host and only the returned URL and
//! public id are kept in the database. The [`ImageStorage`] trait is the seam
//! between intake and the host; production uses [`CloudinaryStorage`].

mod cloudinary;

use thiserror::Error;

pub use cloudinary::CloudinaryStorage;

/// Errors from the image host.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host answered with an error status.
    #[error("upload rejected: {0}")]
    Rejected(String),

    /// The host's response could not be read.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One file read from a multipart submission.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Where a stored file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Durable HTTPS URL.
    pub url: String,
    /// Host-side identifier, used for deletion.
    pub public_id: String,
}

/// Image storage backend.
#[async_trait::async_trait]
pub trait ImageStorage: Send + Sync {
    /// Upload one file.
    async fn upload(&self, file: &UploadFile) -> Result<StoredImage, StorageError>;

    /// Delete a stored file by public id.
    async fn delete(&self, public_id: &str) -> Result<(), StorageError>;
}
