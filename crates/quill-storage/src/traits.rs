//! Storage abstraction traits
//!
//! `Storage` is implemented by every backend (GitHub, S3, local filesystem).
//! `CanonicalStore` marks the store of record for posts and media and adds build
//! notification handling on top.

use async_trait::async_trait;
use quill_core::{AppError, Post, StoreError};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Storage operation timed out: {0}")]
    Timeout(String),

    #[error("Invalid build payload: {0}")]
    InvalidPayload(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend kind, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Github,
    S3,
    Local,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Github => "github",
            StorageBackend::S3 => "s3",
            StorageBackend::Local => "local",
        }
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `storage_key`, replacing any existing object.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Write `data` at `storage_key` only if nothing is stored there yet.
    ///
    /// Fails with [`StorageError::AlreadyExists`] when the key is taken; the
    /// existing object is left untouched. The check and the write are one step.
    async fn upload_new(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// The durable store of record.
#[async_trait]
pub trait CanonicalStore: Storage {
    /// Handle a build/push notification and return the posts it touched.
    ///
    /// Paths that are gone from the store by the time they are read are skipped.
    async fn process_build(&self, payload: &serde_json::Value) -> StorageResult<Vec<Post>> {
        let mut posts = Vec::new();
        for path in crate::push::changed_post_paths(payload)? {
            let data = match self.download(&path).await {
                Ok(data) => data,
                Err(StorageError::NotFound(_)) => {
                    tracing::warn!(path = %path, "Built post is not in the canonical store");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let post = serde_json::from_slice::<Post>(&data).map_err(|e| {
                StorageError::BackendError(format!("Stored post {} is not valid: {}", path, e))
            })?;
            posts.push(post);
        }
        Ok(posts)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let store = match err {
            StorageError::UploadFailed(msg) => StoreError::CanonicalWrite(msg),
            StorageError::AlreadyExists(key) => {
                StoreError::CanonicalWrite(format!("{} already exists", key))
            }
            StorageError::Timeout(msg) => StoreError::Timeout(msg),
            StorageError::InvalidPayload(msg) => StoreError::Build(msg),
            StorageError::DownloadFailed(msg)
            | StorageError::NotFound(msg)
            | StorageError::InvalidKey(msg)
            | StorageError::BackendError(msg) => StoreError::Read(msg),
            StorageError::IoError(err) => StoreError::Read(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => return AppError::Internal(msg),
        };
        AppError::Store(store)
    }
}
