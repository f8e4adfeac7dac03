use super::HeaderAuth;
use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::micropub_params::MicropubParams;
use axum::{
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};
use quill_core::AppError;
use std::sync::Arc;

/// Micropub parameters from a request that passed the auth gate.
///
/// A bearer header is checked before the body is touched. Without one the
/// token must be the `access_token` body field, so form and JSON bodies are
/// parsed first; a body that fails to parse is reported as a missing token.
/// Multipart bodies without a header are refused unread.
pub struct AuthorizedParams(pub MicropubParams);

impl FromRequest<Arc<AppState>> for AuthorizedParams {
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if state.auth.authorize_header(req.headers()).await? == HeaderAuth::Passed {
            return Ok(Self(MicropubParams::from_request(req, state).await?));
        }

        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_lowercase().starts_with("multipart/"));
        if is_multipart {
            tracing::debug!("Multipart request without bearer header refused");
            return Err(AppError::NoToken.into());
        }

        let headers = req.headers().clone();
        let params = MicropubParams::from_request(req, state)
            .await
            .map_err(|_| HttpAppError(AppError::NoToken))?;
        state
            .auth
            .authorize(&headers, params.access_token.as_deref())
            .await?;

        Ok(Self(params))
    }
}
