use crate::auth::AuthorizedParams;
use crate::error::HttpAppError;
use crate::services::{MicropubOutcome, QueryResponse};
use crate::state::AppState;
use crate::utils::micropub_params::QueryParams;
use axum::{
    extract::{RawQuery, State},
    http::{
        header::{CONTENT_TYPE, LOCATION},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

#[tracing::instrument(skip(state, params), fields(operation = "micropub_post"))]
pub async fn post_micropub(
    State(state): State<Arc<AppState>>,
    AuthorizedParams(params): AuthorizedParams,
) -> Result<Response, HttpAppError> {
    let (request, files) = params.into_request()?;

    match state.micropub.handle(request, files).await? {
        MicropubOutcome::Created { location } => {
            tracing::info!(location = %location, "Post created");
            Ok((StatusCode::CREATED, [(LOCATION, location)]).into_response())
        }
        MicropubOutcome::Mutated => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// `GET /micropub`. Without `q` this only identifies the endpoint.
#[tracing::instrument(skip(state, headers, query), fields(operation = "micropub_query"))]
pub async fn get_micropub(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Result<Response, HttpAppError> {
    let params = QueryParams::parse(query.as_deref().unwrap_or(""));
    let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) else {
        return Ok("Micropub endpoint".into_response());
    };

    state
        .auth
        .authorize(&headers, params.access_token.as_deref())
        .await?;

    match state
        .query
        .respond(q, params.url.as_deref(), &params.properties)
        .await?
    {
        QueryResponse::Json(body) => Ok(Json(body).into_response()),
        QueryResponse::Empty => Ok(([(CONTENT_TYPE, "application/json")], ()).into_response()),
    }
}
