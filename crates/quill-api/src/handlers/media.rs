use crate::auth::AuthorizedParams;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};
use quill_core::constants::DEFAULT_MEDIA_DIR;
use quill_core::AppError;
use std::sync::Arc;

const FILE_FIELD: &str = "file";

/// Media endpoint: exactly one multipart field named `file`.
#[tracing::instrument(skip(state, params), fields(operation = "media_upload"))]
pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    AuthorizedParams(mut params): AuthorizedParams,
) -> Result<Response, HttpAppError> {
    if params.files.iter().filter(|f| f.property == FILE_FIELD).count() > 1 {
        return Err(AppError::InvalidRequest(
            "Multiple file fields are not allowed; send exactly one field named 'file'"
                .to_string(),
        )
        .into());
    }

    let file = params
        .take_file(FILE_FIELD)
        .ok_or_else(|| AppError::InvalidRequest("No file provided".to_string()))?;

    tracing::debug!(
        filename = %file.original_filename,
        content_type = %file.content_type,
        size_bytes = file.size(),
        "Media upload received"
    );

    let location = state.media.save(&file, DEFAULT_MEDIA_DIR).await?;

    Ok((StatusCode::CREATED, [(LOCATION, location)]).into_response())
}
