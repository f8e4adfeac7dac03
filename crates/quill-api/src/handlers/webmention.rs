use crate::error::HttpAppError;
use crate::state::AppState;
use crate::utils::micropub_params::form_value;
use axum::{
    body::Bytes,
    extract::State,
    http::{header::LOCATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

pub async fn webmention_endpoint() -> &'static str {
    "Webmention endpoint"
}

#[tracing::instrument(skip(state, headers, body), fields(operation = "webmention"))]
pub async fn receive_webmention(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, HttpAppError> {
    state
        .auth
        .authorize(&headers, form_value(&body, "access_token").as_deref())
        .await?;

    let location = state
        .webmention
        .receive(
            form_value(&body, "source").as_deref(),
            form_value(&body, "target").as_deref(),
        )
        .await?;

    Ok((StatusCode::ACCEPTED, [(LOCATION, location)]).into_response())
}
