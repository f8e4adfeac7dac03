use super::TokenValidator;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use quill_core::AppError;
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

pub struct AuthGate {
    enforce: bool,
    validator: Arc<dyn TokenValidator>,
}

impl AuthGate {
    /// `enforce` is false outside production, where every request passes.
    pub fn new(enforce: bool, validator: Arc<dyn TokenValidator>) -> Self {
        Self { enforce, validator }
    }

    /// Validate the request token. Every call re-validates; nothing is cached.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        access_token: Option<&str>,
    ) -> Result<(), AppError> {
        if !self.enforce {
            return Ok(());
        }
        self.check(&extract_token(authorization(headers), access_token))
            .await
    }

    /// Decide from the `Authorization` header alone, before any body is read.
    ///
    /// Returns `HeaderAuth::Absent` only when enforcement is on and the header
    /// is missing, in which case the token can still come from the body.
    pub async fn authorize_header(&self, headers: &HeaderMap) -> Result<HeaderAuth, AppError> {
        if !self.enforce {
            return Ok(HeaderAuth::Passed);
        }
        let Some(header) = authorization(headers) else {
            return Ok(HeaderAuth::Absent);
        };
        self.check(&extract_token(Some(header), None)).await?;
        Ok(HeaderAuth::Passed)
    }

    async fn check(&self, token: &str) -> Result<(), AppError> {
        if token.is_empty() {
            return Err(AppError::NoToken);
        }

        if !self.validator.is_valid_token(token).await {
            tracing::debug!("Token rejected by token endpoint");
            return Err(AppError::Forbidden);
        }

        Ok(())
    }
}

/// Outcome of [`AuthGate::authorize_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAuth {
    Passed,
    Absent,
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// The Authorization header wins over the `access_token` parameter. A leading
/// `Bearer ` is stripped.
pub fn extract_token(authorization: Option<&str>, access_token: Option<&str>) -> String {
    let raw = authorization.or(access_token).unwrap_or("");
    raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw).trim().to_string()
}
