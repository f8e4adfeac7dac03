//! Dual-write media pipeline.
//!
//! In production an upload is committed to the canonical store first and then
//! mirrored to the public CDN bucket. Outside production it goes to local disk
//! only. The returned URL is always `MEDIA_URL` joined with `file/{key}`.

use crate::keys::StorageKey;
use crate::traits::{CanonicalStore, Storage, StorageError};
use quill_core::{AppError, MirrorFailurePolicy, StoreError, UploadedFile};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum MediaError {
    /// The store of record rejected the write; nothing was mirrored.
    #[error("Canonical write failed: {0}")]
    Canonical(StorageError),

    /// The canonical copy exists but the public mirror does not.
    #[error("Mirror write failed for {url}: {source}")]
    Mirror { url: String, source: StorageError },

    #[error("Local write failed: {0}")]
    Local(StorageError),

    #[error("Invalid media URL: {0}")]
    InvalidUrl(String),
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Canonical(StorageError::Timeout(msg)) => {
                AppError::Store(StoreError::Timeout(msg))
            }
            MediaError::Canonical(e) => AppError::Store(StoreError::CanonicalWrite(e.to_string())),
            MediaError::Mirror { url, source } => AppError::Store(StoreError::MirrorWrite {
                url,
                message: source.to_string(),
            }),
            MediaError::Local(e) => AppError::Store(StoreError::LocalWrite(e.to_string())),
            MediaError::InvalidUrl(msg) => AppError::Internal(msg),
        }
    }
}

/// Where uploads are written.
pub enum MediaRoute {
    Production {
        canonical: Arc<dyn CanonicalStore>,
        mirror: Arc<dyn Storage>,
        policy: MirrorFailurePolicy,
    },
    Local {
        storage: Arc<dyn Storage>,
    },
}

pub struct MediaStore {
    route: MediaRoute,
    base_url: Url,
    timeout: Duration,
}

impl MediaStore {
    pub fn new(route: MediaRoute, media_url: &str, timeout: Duration) -> Result<Self, MediaError> {
        // Url::join drops the last segment of a base without a trailing slash
        let normalized = if media_url.ends_with('/') {
            media_url.to_string()
        } else {
            format!("{}/", media_url)
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| MediaError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            route,
            base_url,
            timeout,
        })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.route, MediaRoute::Production { .. })
    }

    /// Save one file and return its public URL.
    ///
    /// `dir` is recorded for logging only; it does not affect the key.
    pub async fn save(&self, file: &UploadedFile, dir: &str) -> Result<String, MediaError> {
        let key = StorageKey::generate(&file.original_filename);
        let path = key.relative_path();
        let url = self
            .base_url
            .join(&path)
            .map_err(|e| MediaError::InvalidUrl(e.to_string()))?
            .to_string();

        match &self.route {
            MediaRoute::Production {
                canonical,
                mirror,
                policy,
            } => {
                self.write(canonical.as_ref(), &path, file)
                    .await
                    .map_err(MediaError::Canonical)?;

                if let Err(e) = self.write(mirror.as_ref(), &path, file).await {
                    match policy {
                        MirrorFailurePolicy::Fail => {
                            tracing::error!(
                                error = %e,
                                path = %path,
                                "Media mirror write failed after canonical write"
                            );
                            return Err(MediaError::Mirror { url, source: e });
                        }
                        MirrorFailurePolicy::Degrade => {
                            tracing::warn!(
                                error = %e,
                                path = %path,
                                "Media mirror write failed, serving canonical copy only"
                            );
                        }
                    }
                }
            }
            MediaRoute::Local { storage } => {
                self.write(storage.as_ref(), &path, file)
                    .await
                    .map_err(MediaError::Local)?;
            }
        }

        tracing::info!(
            original_filename = %file.original_filename,
            dir = %dir,
            key = %key,
            size_bytes = file.size(),
            url = %url,
            "Media saved"
        );

        Ok(url)
    }

    /// Save files one after another, returning URLs in input order. Files saved
    /// before a failure stay persisted.
    pub async fn upload_files(
        &self,
        files: &[UploadedFile],
        dir: &str,
    ) -> Result<Vec<String>, MediaError> {
        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            urls.push(self.save(file, dir).await?);
        }
        Ok(urls)
    }

    async fn write<S: Storage + ?Sized>(
        &self,
        store: &S,
        path: &str,
        file: &UploadedFile,
    ) -> Result<(), StorageError> {
        let upload = store.upload_with_key(path, file.content.clone(), &file.content_type);
        match tokio::time::timeout(self.timeout, upload).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(format!(
                "{} write of {} exceeded {}ms",
                store.backend_type().as_str(),
                path,
                self.timeout.as_millis()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageBackend;
    use crate::StorageResult;
    use async_trait::async_trait;
    use quill_core::ErrorMetadata;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockStorage {
        objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
        fail: bool,
        stall: bool,
    }

    impl MockStorage {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        /// Never completes a write.
        fn stalled() -> Self {
            Self {
                stall: true,
                ..Default::default()
            }
        }

        fn keys(&self) -> Vec<String> {
            self.objects.lock().unwrap().keys().cloned().collect()
        }
    }

    #[async_trait]
    impl Storage for MockStorage {
        async fn upload_with_key(
            &self,
            storage_key: &str,
            data: Vec<u8>,
            content_type: &str,
        ) -> StorageResult<()> {
            if self.stall {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(StorageError::UploadFailed("mock failure".to_string()));
            }
            self.objects
                .lock()
                .unwrap()
                .insert(storage_key.to_string(), (data, content_type.to_string()));
            Ok(())
        }

        async fn upload_new(
            &self,
            storage_key: &str,
            data: Vec<u8>,
            content_type: &str,
        ) -> StorageResult<()> {
            if self.objects.lock().unwrap().contains_key(storage_key) {
                return Err(StorageError::AlreadyExists(storage_key.to_string()));
            }
            self.upload_with_key(storage_key, data, content_type).await
        }

        async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
            self.objects
                .lock()
                .unwrap()
                .get(storage_key)
                .map(|(data, _)| data.clone())
                .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
        }

        async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
            Ok(self.objects.lock().unwrap().contains_key(storage_key))
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }
    }

    impl CanonicalStore for MockStorage {}

    fn photo() -> UploadedFile {
        UploadedFile::new("photo.JPG", "image/jpeg", vec![0xff, 0xd8, 0xff])
    }

    fn production(
        canonical: Arc<MockStorage>,
        mirror: Arc<MockStorage>,
        policy: MirrorFailurePolicy,
    ) -> MediaStore {
        production_with_timeout(canonical, mirror, policy, Duration::from_secs(5))
    }

    fn production_with_timeout(
        canonical: Arc<MockStorage>,
        mirror: Arc<MockStorage>,
        policy: MirrorFailurePolicy,
        timeout: Duration,
    ) -> MediaStore {
        MediaStore::new(
            MediaRoute::Production {
                canonical,
                mirror,
                policy,
            },
            "https://media.example.com",
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_production_writes_both_stores() {
        let canonical = Arc::new(MockStorage::default());
        let mirror = Arc::new(MockStorage::default());
        let store = production(canonical.clone(), mirror.clone(), MirrorFailurePolicy::Fail);

        let url = store.save(&photo(), "photo").await.unwrap();

        assert!(url.starts_with("https://media.example.com/file/"));
        assert!(url.ends_with(".JPG"));
        assert_eq!(canonical.keys(), mirror.keys());
        let key = &canonical.keys()[0];
        assert!(url.ends_with(key.as_str()));
        let (_, content_type) = mirror.objects.lock().unwrap()[key].clone();
        assert_eq!(content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_mirror_failure_keeps_canonical_copy() {
        let canonical = Arc::new(MockStorage::default());
        let mirror = Arc::new(MockStorage::failing());
        let store = production(canonical.clone(), mirror, MirrorFailurePolicy::Fail);

        let err = store.save(&photo(), "photo").await.unwrap_err();
        assert!(matches!(err, MediaError::Mirror { .. }));

        let keys = canonical.keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(
            canonical.download(&keys[0]).await.unwrap(),
            vec![0xff, 0xd8, 0xff]
        );

        let app: AppError = err.into();
        assert_eq!(app.error_type(), "mirror_write_failed");
        assert_eq!(app.http_status_code(), 502);
    }

    #[tokio::test]
    async fn test_mirror_failure_degrades_when_configured() {
        let canonical = Arc::new(MockStorage::default());
        let mirror = Arc::new(MockStorage::failing());
        let store = production(canonical.clone(), mirror, MirrorFailurePolicy::Degrade);

        let url = store.save(&photo(), "photo").await.unwrap();
        assert!(url.ends_with(&canonical.keys()[0]));
    }

    #[tokio::test]
    async fn test_canonical_failure_skips_mirror() {
        let canonical = Arc::new(MockStorage::failing());
        let mirror = Arc::new(MockStorage::default());
        let store = production(canonical, mirror.clone(), MirrorFailurePolicy::Fail);

        let err = store.save(&photo(), "photo").await.unwrap_err();
        assert!(matches!(err, MediaError::Canonical(_)));
        assert!(mirror.keys().is_empty());

        let app: AppError = err.into();
        assert_eq!(app.error_type(), "canonical_write_failed");
    }

    #[tokio::test]
    async fn test_stalled_canonical_write_times_out() {
        let canonical = Arc::new(MockStorage::stalled());
        let mirror = Arc::new(MockStorage::default());
        let store = production_with_timeout(
            canonical,
            mirror.clone(),
            MirrorFailurePolicy::Fail,
            Duration::from_millis(50),
        );

        let err = store.save(&photo(), "photo").await.unwrap_err();
        assert!(matches!(err, MediaError::Canonical(StorageError::Timeout(_))));
        assert!(mirror.keys().is_empty());

        let app: AppError = err.into();
        assert_eq!(app.error_type(), "store_timeout");
        assert_eq!(app.http_status_code(), 504);
    }

    #[tokio::test]
    async fn test_stalled_mirror_write_keeps_canonical_copy() {
        let canonical = Arc::new(MockStorage::default());
        let mirror = Arc::new(MockStorage::stalled());
        let store = production_with_timeout(
            canonical.clone(),
            mirror,
            MirrorFailurePolicy::Fail,
            Duration::from_millis(50),
        );

        let err = store.save(&photo(), "photo").await.unwrap_err();
        match &err {
            MediaError::Mirror { source, .. } => {
                assert!(matches!(source, StorageError::Timeout(_)))
            }
            other => panic!("Expected mirror error, got {:?}", other),
        }
        assert_eq!(canonical.keys().len(), 1);

        let app: AppError = err.into();
        assert_eq!(app.error_type(), "mirror_write_failed");
    }

    #[tokio::test]
    async fn test_local_route_and_base_url_with_path() {
        let storage = Arc::new(MockStorage::default());
        let store = MediaStore::new(
            MediaRoute::Local {
                storage: storage.clone(),
            },
            "http://localhost:4000/media",
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!store.is_production());

        let url = store
            .save(&UploadedFile::new("notes", "text/plain", b"x".to_vec()), "photo")
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:4000/media/file/"));
        assert!(!url.rsplit('/').next().unwrap().contains('.'));
        assert_eq!(storage.keys().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_files_preserves_order_and_partial_success() {
        let storage = Arc::new(MockStorage::default());
        let store = MediaStore::new(
            MediaRoute::Local { storage },
            "https://media.example.com/",
            Duration::from_secs(5),
        )
        .unwrap();

        let files = vec![
            UploadedFile::new("a.png", "image/png", vec![1]),
            UploadedFile::new("b.gif", "image/gif", vec![2]),
        ];
        let urls = store.upload_files(&files, "photo").await.unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].ends_with(".png"));
        assert!(urls[1].ends_with(".gif"));

        let canonical = Arc::new(MockStorage::default());
        let failing = production(
            canonical.clone(),
            Arc::new(MockStorage::failing()),
            MirrorFailurePolicy::Fail,
        );
        assert!(failing.upload_files(&files, "photo").await.is_err());
        // The first file reached the canonical store before the batch stopped
        assert_eq!(canonical.keys().len(), 1);
    }
}
