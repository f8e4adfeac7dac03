//! GitHub repository storage, the canonical store in production.
//!
//! Objects are files in the repository, read and written through the contents
//! API. Every write is a commit on the configured branch.

use crate::traits::{CanonicalStore, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("quill/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Clone)]
pub struct GithubStorage {
    client: Client,
    api_base: String,
    repo: String,
    branch: String,
    access_token: String,
}

impl GithubStorage {
    pub fn new(
        repo: String,
        branch: String,
        access_token: String,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: GITHUB_API_BASE.to_string(),
            repo,
            branch,
            access_token,
        })
    }

    /// Point the client at another API host (GitHub Enterprise, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn contents_url(&self, storage_key: &str) -> StorageResult<String> {
        if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/')
        {
            return Err(StorageError::InvalidKey(storage_key.to_string()));
        }
        Ok(format!(
            "{}/repos/{}/contents/{}",
            self.api_base, self.repo, storage_key
        ))
    }

    /// Fetch the current file, or `None` if it does not exist on the branch.
    async fn fetch(&self, storage_key: &str) -> StorageResult<Option<ContentsResponse>> {
        let url = self.contents_url(storage_key)?;

        let response = self
            .client
            .get(&url)
            .query(&[("ref", self.branch.as_str())])
            .bearer_auth(&self.access_token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| map_transport_error(e, storage_key))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.json::<ContentsResponse>().await.map_err(|e| {
                    StorageError::DownloadFailed(format!("Invalid contents response: {}", e))
                })?;
                Ok(Some(body))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(StorageError::BackendError(format!(
                    "GitHub returned {} for {}: {}",
                    status, storage_key, text
                )))
            }
        }
    }
}

fn map_transport_error(err: reqwest::Error, storage_key: &str) -> StorageError {
    if err.is_timeout() {
        StorageError::Timeout(storage_key.to_string())
    } else {
        StorageError::BackendError(err.to_string())
    }
}

enum PutMode {
    /// Replace the file at this blob sha, or create it when `None`.
    Overwrite(Option<String>),
    /// Create only. GitHub refuses a sha-less PUT over an existing file.
    Create,
}

impl GithubStorage {
    async fn put(&self, storage_key: &str, data: Vec<u8>, mode: PutMode) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let size = data.len();

        let (sha, message) = match mode {
            PutMode::Overwrite(Some(sha)) => (Some(sha), format!("Update {}", storage_key)),
            PutMode::Overwrite(None) | PutMode::Create => {
                (None, format!("Create {}", storage_key))
            }
        };
        let create_only = sha.is_none();

        let body = PutContentsRequest {
            message,
            content: general_purpose::STANDARD.encode(&data),
            branch: &self.branch,
            sha,
        };

        let response = self
            .client
            .put(self.contents_url(storage_key)?)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| match map_transport_error(e, storage_key) {
                StorageError::BackendError(msg) => StorageError::UploadFailed(msg),
                other => other,
            })?;

        let status = response.status();
        if create_only
            && matches!(status, StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT)
        {
            tracing::debug!(repo = %self.repo, key = %storage_key, "GitHub file already exists");
            return Err(StorageError::AlreadyExists(storage_key.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(
                repo = %self.repo,
                key = %storage_key,
                status = %status,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "GitHub commit failed"
            );
            return Err(StorageError::UploadFailed(format!(
                "GitHub returned {}: {}",
                status, text
            )));
        }

        tracing::info!(
            repo = %self.repo,
            branch = %self.branch,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GitHub commit successful"
        );

        Ok(())
    }
}

#[async_trait]
impl Storage for GithubStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        // Updating an existing file requires its blob sha
        let sha = self.fetch(storage_key).await?.map(|existing| existing.sha);
        match self.put(storage_key, data, PutMode::Overwrite(sha)).await {
            Err(StorageError::AlreadyExists(key)) => Err(StorageError::UploadFailed(format!(
                "{} was created concurrently",
                key
            ))),
            other => other,
        }
    }

    async fn upload_new(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<()> {
        self.put(storage_key, data, PutMode::Create).await
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let existing = self
            .fetch(storage_key)
            .await?
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))?;

        let encoded: String = existing
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| StorageError::DownloadFailed(format!("Invalid base64 content: {}", e)))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.fetch(storage_key).await?.is_some())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Github
    }
}

impl CanonicalStore for GithubStorage {}
