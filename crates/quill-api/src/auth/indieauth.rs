use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// External token validity predicate.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn is_valid_token(&self, token: &str) -> bool;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    me: Option<String>,
}

/// Verifies tokens against an IndieAuth token endpoint. A token is valid when
/// the endpoint accepts it and it was issued for this site.
pub struct IndieAuthTokenValidator {
    client: reqwest::Client,
    token_endpoint: String,
    me: String,
}

impl IndieAuthTokenValidator {
    pub fn new(
        token_endpoint: impl Into<String>,
        root_url: &str,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            token_endpoint: token_endpoint.into(),
            me: root_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TokenValidator for IndieAuthTokenValidator {
    async fn is_valid_token(&self, token: &str) -> bool {
        let response = match self
            .client
            .get(&self.token_endpoint)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, endpoint = %self.token_endpoint, "Token endpoint unreachable");
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "Token endpoint rejected token");
            return false;
        }

        match response.json::<TokenInfo>().await {
            Ok(TokenInfo { me: Some(me) }) => me.trim_end_matches('/') == self.me,
            Ok(TokenInfo { me: None }) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Token endpoint returned an unreadable body");
                false
            }
        }
    }
}
