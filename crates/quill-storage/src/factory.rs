#[cfg(feature = "storage-github")]
use crate::GithubStorage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::media::{MediaError, MediaRoute, MediaStore};
use crate::{CanonicalStore, StorageError, StorageResult};
use quill_core::constants::LOCAL_MEDIA_DIR;
use quill_core::Config;
use std::sync::Arc;
use std::time::Duration;

/// Create the store of record: the GitHub repository in production, the
/// content directory otherwise.
pub async fn create_canonical_store(config: &Config) -> StorageResult<Arc<dyn CanonicalStore>> {
    if config.is_production() {
        create_github_store(config)
    } else {
        create_local_store(config).await
    }
}

#[cfg(feature = "storage-github")]
fn create_github_store(config: &Config) -> StorageResult<Arc<dyn CanonicalStore>> {
    let repo = config
        .github_repo
        .clone()
        .ok_or_else(|| StorageError::ConfigError("GITHUB_REPO not configured".to_string()))?;
    let token = config.github_access_token.clone().ok_or_else(|| {
        StorageError::ConfigError("GITHUB_ACCESS_TOKEN not configured".to_string())
    })?;

    let storage = GithubStorage::new(
        repo,
        config.github_branch.clone(),
        token,
        Duration::from_secs(config.http_client_timeout_secs),
    )?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-github"))]
fn create_github_store(_config: &Config) -> StorageResult<Arc<dyn CanonicalStore>> {
    Err(StorageError::ConfigError(
        "GitHub storage backend not available (storage-github feature not enabled)".to_string(),
    ))
}

#[cfg(feature = "storage-local")]
async fn create_local_store(config: &Config) -> StorageResult<Arc<dyn CanonicalStore>> {
    let storage = LocalStorage::new(config.content_dir.clone()).await?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-local"))]
async fn create_local_store(_config: &Config) -> StorageResult<Arc<dyn CanonicalStore>> {
    Err(StorageError::ConfigError(
        "Local storage backend not available (storage-local feature not enabled)".to_string(),
    ))
}

/// Create the media pipeline. Production dual-writes to `canonical` and the S3
/// mirror; development writes under `CONTENT_DIR/media`.
pub async fn create_media_store(
    config: &Config,
    canonical: Arc<dyn CanonicalStore>,
) -> StorageResult<MediaStore> {
    let route = if config.is_production() {
        MediaRoute::Production {
            canonical,
            mirror: create_mirror_store(config).await?,
            policy: config.mirror_failure_policy,
        }
    } else {
        MediaRoute::Local {
            storage: create_local_media_store(config).await?,
        }
    };

    MediaStore::new(
        route,
        &config.media_url,
        Duration::from_secs(config.store_timeout_secs),
    )
    .map_err(|e| match e {
        MediaError::InvalidUrl(msg) => StorageError::ConfigError(format!("MEDIA_URL: {}", msg)),
        other => StorageError::ConfigError(other.to_string()),
    })
}

#[cfg(feature = "storage-s3")]
async fn create_mirror_store(config: &Config) -> StorageResult<Arc<dyn crate::Storage>> {
    let bucket = config
        .s3_bucket
        .clone()
        .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
    let region = config.s3_region.clone().ok_or_else(|| {
        StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
    })?;

    let storage = S3Storage::new(bucket, region, config.s3_endpoint.clone()).await?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-s3"))]
async fn create_mirror_store(_config: &Config) -> StorageResult<Arc<dyn crate::Storage>> {
    Err(StorageError::ConfigError(
        "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
    ))
}

#[cfg(feature = "storage-local")]
async fn create_local_media_store(config: &Config) -> StorageResult<Arc<dyn crate::Storage>> {
    let storage = LocalStorage::new(config.content_dir.join(LOCAL_MEDIA_DIR)).await?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-local"))]
async fn create_local_media_store(_config: &Config) -> StorageResult<Arc<dyn crate::Storage>> {
    Err(StorageError::ConfigError(
        "Local storage backend not available (storage-local feature not enabled)".to_string(),
    ))
}
