//! Syndication to third-party services.

use async_trait::async_trait;
use quill_core::{Post, SyndicationTarget};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Delivers a post to the named targets and returns the URLs of the copies.
#[async_trait]
pub trait Syndicator: Send + Sync {
    async fn syndicate(&self, post: &Post, targets: &[String]) -> Vec<String>;
}

/// Read the target descriptors once at startup. A missing file means no targets.
pub fn load_syndication_targets(path: &Path) -> Result<Vec<SyndicationTarget>, anyhow::Error> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "No syndication targets file, syndication disabled");
        return Ok(Vec::new());
    }

    let data = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let targets: Vec<SyndicationTarget> = serde_json::from_slice(&data)
        .map_err(|e| anyhow::anyhow!("Invalid syndication targets in {}: {}", path.display(), e))?;

    tracing::info!(count = targets.len(), "Syndication targets loaded");
    Ok(targets)
}

#[derive(Debug, Deserialize)]
struct SyndicationResponse {
    url: Option<String>,
}

/// Posts `{url, type, properties}` to each target's endpoint. The copy's URL is
/// taken from the `Location` header, or a `url` field in the JSON body.
pub struct HttpSyndicator {
    client: reqwest::Client,
    targets: Arc<Vec<SyndicationTarget>>,
}

impl HttpSyndicator {
    pub fn new(
        targets: Arc<Vec<SyndicationTarget>>,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self { client, targets })
    }

    async fn deliver(&self, post: &Post, endpoint: &str) -> Result<Option<String>, String> {
        let response = self
            .client
            .post(endpoint)
            .json(&serde_json::json!({
                "url": post.url,
                "type": post.kind,
                "properties": post.properties,
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("endpoint returned {}", status));
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if location.is_some() {
            return Ok(location);
        }

        Ok(response
            .json::<SyndicationResponse>()
            .await
            .ok()
            .and_then(|body| body.url))
    }
}

#[async_trait]
impl Syndicator for HttpSyndicator {
    async fn syndicate(&self, post: &Post, targets: &[String]) -> Vec<String> {
        let mut urls = Vec::new();

        for uid in targets {
            let Some(target) = self.targets.iter().find(|t| &t.uid == uid) else {
                tracing::warn!(target = %uid, url = %post.url, "Unknown syndication target");
                continue;
            };
            let Some(endpoint) = target.endpoint.as_deref() else {
                tracing::warn!(target = %uid, "Syndication target has no endpoint");
                continue;
            };

            match self.deliver(post, endpoint).await {
                Ok(Some(url)) => {
                    tracing::info!(target = %uid, url = %post.url, syndicated = %url, "Post syndicated");
                    urls.push(url);
                }
                Ok(None) => {
                    tracing::info!(target = %uid, url = %post.url, "Post syndicated without a copy URL");
                }
                Err(e) => {
                    tracing::warn!(target = %uid, url = %post.url, error = %e, "Syndication failed");
                }
            }
        }

        urls
    }
}
