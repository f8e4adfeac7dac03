use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::micropub_params::form_value;
use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
};
use quill_core::{AppError, StoreError};
use serde_json::Value;
use std::sync::Arc;

/// Build notification from the canonical store (a push webhook).
#[tracing::instrument(skip(state, headers, body), fields(operation = "built"))]
pub async fn built(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HttpAppError> {
    let payload = parse_payload(&headers, &body)?;
    let posts = state.canonical.process_build(&payload).await?;

    let urls: Vec<&str> = posts.iter().map(|post| post.url.as_str()).collect();
    tracing::info!(count = posts.len(), urls = ?urls, "Build notification processed");
    Ok(StatusCode::OK)
}

/// JSON body, or a form body carrying the JSON in `payload`.
fn parse_payload(headers: &HeaderMap, body: &[u8]) -> Result<Value, AppError> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_lowercase().starts_with("application/json"));

    let parsed: Result<Value, serde_json::Error> = if is_json {
        serde_json::from_slice(body)
    } else {
        let payload = form_value(body, "payload")
            .ok_or_else(|| StoreError::Build("missing payload".to_string()))?;
        serde_json::from_str(&payload)
    };

    parsed.map_err(|e| StoreError::Build(e.to_string()).into())
}
