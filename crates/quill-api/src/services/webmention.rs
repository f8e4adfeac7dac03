//! Webmention intake and verification.

use crate::services::notifier::Notifier;
use crate::utils::ssrf_validation::validate_url_for_ssrf;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use quill_core::{AppError, ErrorMetadata, WebmentionError};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Verifies that `source` really mentions `target`.
#[async_trait]
pub trait WebmentionVerifier: Send + Sync {
    async fn verify(&self, source: &str, target: &str) -> Result<(), WebmentionError>;
}

/// Largest source document read while looking for the link.
const MAX_SOURCE_BYTES: usize = 1024 * 1024;
const MAX_REDIRECTS: usize = 5;

/// Fetches the source page and checks that it links to the target.
///
/// Redirects are followed by hand so every hop passes the SSRF check.
pub struct HttpWebmentionVerifier {
    client: reqwest::Client,
    root_url: String,
    allow_private_hosts: bool,
    max_body_bytes: usize,
}

impl HttpWebmentionVerifier {
    pub fn new(root_url: &str, timeout: Duration) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            client,
            root_url: root_url.trim_end_matches('/').to_string(),
            allow_private_hosts: false,
            max_body_bytes: MAX_SOURCE_BYTES,
        })
    }

    async fn fetch(&self, source: &str, source_url: Url) -> Result<Vec<u8>, WebmentionError> {
        let mut url = source_url;
        for _ in 0..=MAX_REDIRECTS {
            validate_url_for_ssrf(&url, self.allow_private_hosts)
                .await
                .map_err(|reason| {
                    tracing::warn!(source = %source, url = %url, reason = %reason, "Webmention source refused");
                    WebmentionError::InvalidSource(source.to_string())
                })?;

            let mut response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| WebmentionError::SourceUnavailable(e.to_string()))?;

            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| {
                        WebmentionError::SourceNotFound(format!(
                            "{} redirected without a location",
                            source
                        ))
                    })?;
                url = url
                    .join(location)
                    .map_err(|_| WebmentionError::InvalidSource(source.to_string()))?;
                continue;
            }
            if !status.is_success() {
                return Err(WebmentionError::SourceNotFound(format!(
                    "{} returned {}",
                    source, status
                )));
            }

            let too_large = || {
                WebmentionError::SourceNotFound(format!(
                    "{} is larger than {} bytes",
                    source, self.max_body_bytes
                ))
            };
            if response
                .content_length()
                .is_some_and(|len| len > self.max_body_bytes as u64)
            {
                return Err(too_large());
            }

            let mut body = Vec::new();
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| WebmentionError::SourceUnavailable(e.to_string()))?
            {
                if body.len() + chunk.len() > self.max_body_bytes {
                    return Err(too_large());
                }
                body.extend_from_slice(&chunk);
            }
            return Ok(body);
        }

        Err(WebmentionError::SourceNotFound(format!(
            "{} redirected more than {} times",
            source, MAX_REDIRECTS
        )))
    }
}

#[async_trait]
impl WebmentionVerifier for HttpWebmentionVerifier {
    async fn verify(&self, source: &str, target: &str) -> Result<(), WebmentionError> {
        let source_url = Url::parse(source)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| WebmentionError::InvalidSource(source.to_string()))?;

        let on_site = target
            .strip_prefix(&self.root_url)
            .is_some_and(|rest| rest.starts_with('/'));
        if !on_site {
            return Err(WebmentionError::TargetNotSupported(target.to_string()));
        }

        let body = self.fetch(source, source_url).await?;

        if !String::from_utf8_lossy(&body).contains(target) {
            return Err(WebmentionError::NoLinkFound(target.to_string()));
        }

        Ok(())
    }
}

pub struct WebmentionIntake {
    root_url: String,
    verifier: Arc<dyn WebmentionVerifier>,
    notifier: Arc<dyn Notifier>,
}

impl WebmentionIntake {
    pub fn new(
        root_url: &str,
        verifier: Arc<dyn WebmentionVerifier>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            root_url: root_url.trim_end_matches('/').to_string(),
            verifier,
            notifier,
        }
    }

    /// Accept a webmention and return the target, to be sent back as `Location`.
    ///
    /// Parameter checks run before the verifier and do not notify. A verifier
    /// failure is reported to the notifier in the background.
    pub async fn receive(
        &self,
        source: Option<&str>,
        target: Option<&str>,
    ) -> Result<String, AppError> {
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(WebmentionError::MissingSource)?;
        let target = target
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(WebmentionError::MissingTarget)?;

        if source == target {
            return Err(WebmentionError::SelfReference.into());
        }
        if target.trim_end_matches('/') == self.root_url {
            return Err(WebmentionError::RootTarget(target.to_string()).into());
        }

        if let Err(e) = self.verifier.verify(source, target).await {
            let notifier = self.notifier.clone();
            let subject = format!("Webmention failed: {}", e.error_type());
            let message = e.to_string();
            let context = source.to_string();
            tokio::spawn(async move {
                notifier.send(&subject, &message, &context).await;
            });
            return Err(e.into());
        }

        tracing::info!(source = %source, target = %target, "Webmention accepted");
        Ok(target.to_string())
    }
}
