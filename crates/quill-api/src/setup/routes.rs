//! Route configuration and setup

use crate::error::HttpAppError;
use crate::handlers;
use crate::state::AppState;
use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    routing::{get, post},
    BoxError, Router,
};
use quill_core::{AppError, Config};
use std::sync::Arc;
use std::time::Duration;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub async fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    tracing::debug!(
        max_upload_size_bytes = config.max_upload_size_bytes,
        request_timeout_secs = config.request_timeout_secs,
        "Configuring routes"
    );

    let request_timeout_secs = config.request_timeout_secs;

    let app = Router::new()
        .route("/", get(handlers::root::index))
        .route(
            "/micropub",
            get(handlers::micropub::get_micropub).post(handlers::micropub::post_micropub),
        )
        .route("/micropub/media", post(handlers::media::upload_media))
        .route(
            "/webmention",
            get(handlers::webmention::webmention_endpoint)
                .post(handlers::webmention::receive_webmention),
        )
        .route("/built", post(handlers::built::built))
        .layer(DefaultBodyLimit::max(config.max_upload_size_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(config.max_upload_size_bytes))
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    timeout_error(err, request_timeout_secs)
                }))
                .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_secs))),
        )
        .with_state(state);

    Ok(app)
}

/// Render middleware failures in the same error body as handler failures.
fn timeout_error(err: BoxError, request_timeout_secs: u64) -> HttpAppError {
    if err.is::<Elapsed>() {
        AppError::RequestTimeout(request_timeout_secs).into()
    } else {
        AppError::Internal(format!("Unhandled middleware error: {}", err)).into()
    }
}
