//! Post persistence.
//!
//! Posts are JSON documents in the canonical store at
//! `posts/{yyyy}/{mm}/{slug}.json`, published at `{ROOT_URL}/{yyyy}/{mm}/{slug}`.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use quill_core::constants::POST_PATH_PREFIX;
use quill_core::{AppError, CreateRequest, MutateRequest, Post, Properties, StoreError};
use quill_storage::{CanonicalStore, StorageError};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

const SLUG_MAX_WORDS: usize = 6;
const SLUG_MAX_LEN: usize = 60;
const MAX_SLUG_ATTEMPTS: u32 = 20;

static SLUG_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9]+").expect("slug separator pattern is valid")
});

/// Domain post operations.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, request: &CreateRequest) -> Result<Post, AppError>;

    /// Apply an update, delete or undelete to an existing post.
    async fn apply_action(&self, request: &MutateRequest) -> Result<Post, AppError>;

    async fn exists_by_url(&self, url: &str) -> Result<bool, AppError>;

    async fn find_by_url(&self, url: &str) -> Result<Option<Post>, AppError>;

    async fn save(&self, post: &Post) -> Result<(), AppError>;
}

pub struct CanonicalPostRepository {
    store: Arc<dyn CanonicalStore>,
    root_url: String,
    timeout: Duration,
}

impl CanonicalPostRepository {
    pub fn new(store: Arc<dyn CanonicalStore>, root_url: &str, timeout: Duration) -> Self {
        Self {
            store,
            root_url: root_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Store key for a post URL, or `None` if the URL is not a post on this site.
    pub fn path_for_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.root_url)?.trim_matches('/');
        let segments: Vec<&str> = rest.split('/').collect();
        match segments.as_slice() {
            [year, month, slug]
                if is_digits(year, 4) && is_digits(month, 2) && is_slug(slug) =>
            {
                Some(format!("{}/{}/{}/{}.json", POST_PATH_PREFIX, year, month, slug))
            }
            _ => None,
        }
    }

    fn url_for(&self, published: &DateTime<Utc>, slug: &str) -> String {
        format!(
            "{}/{:04}/{:02}/{}",
            self.root_url,
            published.year(),
            published.month(),
            slug
        )
    }

    async fn with_timeout<T, F>(&self, operation: &str, fut: F) -> Result<T, AppError>
    where
        F: std::future::Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::Store(StoreError::Timeout(format!(
                "post {} exceeded {}s",
                operation,
                self.timeout.as_secs()
            )))),
        }
    }

    async fn load(&self, url: &str) -> Result<Option<Post>, AppError> {
        let Some(path) = self.path_for_url(url) else {
            return Ok(None);
        };
        if !self.with_timeout("lookup", self.store.exists(&path)).await? {
            return Ok(None);
        }
        let data = self.with_timeout("read", self.store.download(&path)).await?;
        let post = serde_json::from_slice::<Post>(&data).map_err(|e| {
            AppError::Store(StoreError::Read(format!("Corrupt post at {}: {}", path, e)))
        })?;
        Ok(Some(post))
    }

    /// Write a new post at the first free `{slug}`, `{slug}-2`, ... URL.
    ///
    /// Each candidate is claimed with a create-only write, so concurrent
    /// creates with the same slug land on distinct URLs.
    async fn insert_new(
        &self,
        published: &DateTime<Utc>,
        slug: &str,
        kind: &str,
        properties: Properties,
    ) -> Result<Post, AppError> {
        let mut post = Post::new(self.url_for(published, slug), kind, properties);
        for attempt in 2..=MAX_SLUG_ATTEMPTS + 1 {
            let path = self.path_for_url(&post.url).ok_or_else(|| {
                AppError::Internal(format!("Post URL outside site root: {}", post.url))
            })?;
            let data = serde_json::to_vec_pretty(&post)
                .map_err(|e| AppError::Internal(format!("Failed to serialize post: {}", e)))?;

            let write = self.store.upload_new(&path, data, "application/json");
            match tokio::time::timeout(self.timeout, write).await {
                Ok(Ok(())) => return Ok(post),
                Ok(Err(StorageError::AlreadyExists(_))) => {
                    tracing::debug!(url = %post.url, "Post URL taken, trying next suffix");
                    post.url = self.url_for(published, &format!("{}-{}", slug, attempt));
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(AppError::Store(StoreError::Timeout(format!(
                        "post write exceeded {}s",
                        self.timeout.as_secs()
                    ))))
                }
            }
        }
        Err(AppError::InvalidRequest(format!(
            "Could not find a free URL for slug '{}'.",
            slug
        )))
    }
}

#[async_trait]
impl PostRepository for CanonicalPostRepository {
    async fn create(&self, request: &CreateRequest) -> Result<Post, AppError> {
        let published = Utc::now();
        let mut properties = request.properties.clone();

        let slug = slug_for(&properties, &published);
        // mp-* parameters are commands to the server, not post content
        properties.retain(|name, _| !name.starts_with("mp-"));
        properties
            .entry("published".to_string())
            .or_insert_with(|| vec![Value::String(published.to_rfc3339())]);

        let post = self
            .insert_new(&published, &slug, &request.kind, properties)
            .await?;

        tracing::info!(url = %post.url, kind = %request.kind, "Post created");
        Ok(post)
    }

    async fn apply_action(&self, request: &MutateRequest) -> Result<Post, AppError> {
        let mut post = self.load(&request.url).await?.ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "The specified URL ('{}') could not be found.",
                request.url
            ))
        })?;

        post.apply(request.action, &request.changes);
        if request.changes.is_empty() && request.action == quill_core::Action::Update {
            tracing::debug!(url = %post.url, "Update without changes");
        }
        self.save(&post).await?;

        tracing::info!(url = %post.url, action = %request.action, "Post mutated");
        Ok(post)
    }

    async fn exists_by_url(&self, url: &str) -> Result<bool, AppError> {
        let Some(path) = self.path_for_url(url) else {
            return Ok(false);
        };
        self.with_timeout("lookup", self.store.exists(&path)).await
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Post>, AppError> {
        self.load(url).await
    }

    async fn save(&self, post: &Post) -> Result<(), AppError> {
        let path = self.path_for_url(&post.url).ok_or_else(|| {
            AppError::Internal(format!("Post URL outside site root: {}", post.url))
        })?;
        let data = serde_json::to_vec_pretty(post)
            .map_err(|e| AppError::Internal(format!("Failed to serialize post: {}", e)))?;
        self.with_timeout(
            "write",
            self.store.upload_with_key(&path, data, "application/json"),
        )
        .await
    }
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn first_text(value: Option<&Vec<Value>>) -> Option<String> {
    match value?.first()? {
        Value::String(s) => Some(s.clone()),
        // JSON content may be {"html": ..., "value": ...}
        Value::Object(map) => map
            .get("value")
            .or_else(|| map.get("html"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

/// `mp-slug`, else the name, else the opening words of the content, else the
/// time of day.
pub fn slug_for(properties: &Properties, published: &DateTime<Utc>) -> String {
    let candidates = [
        first_text(properties.get("mp-slug")),
        first_text(properties.get("name")),
        first_text(properties.get("content")).map(|content| {
            content
                .split_whitespace()
                .take(SLUG_MAX_WORDS)
                .collect::<Vec<_>>()
                .join(" ")
        }),
    ];

    for text in candidates.into_iter().flatten() {
        let slug = slugify(&text);
        if !slug.is_empty() {
            return slug;
        }
    }
    published.format("%H%M%S").to_string()
}

pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let slug = SLUG_SEPARATORS.replace_all(&lowered, "-");
    let mut slug = slug.trim_matches('-').to_string();
    if slug.len() > SLUG_MAX_LEN {
        slug.truncate(SLUG_MAX_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }
    slug
}
