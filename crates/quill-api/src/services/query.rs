use crate::services::posts::PostRepository;
use quill_core::{AppError, SyndicationTarget};
use serde_json::{json, Value};
use std::sync::Arc;

/// Body of a `GET /micropub?q=...` response.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    Json(Value),
    /// Unsupported query: answered with an empty body rather than an error.
    Empty,
}

pub struct QueryResponder {
    posts: Arc<dyn PostRepository>,
    targets: Arc<Vec<SyndicationTarget>>,
    media_endpoint: String,
}

impl QueryResponder {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        targets: Arc<Vec<SyndicationTarget>>,
        media_endpoint: String,
    ) -> Self {
        Self {
            posts,
            targets,
            media_endpoint,
        }
    }

    pub async fn respond(
        &self,
        query: &str,
        url: Option<&str>,
        properties: &[String],
    ) -> Result<QueryResponse, AppError> {
        match query {
            "source" => self.source(url.unwrap_or(""), properties).await,
            "config" => Ok(QueryResponse::Json(json!({
                "media-endpoint": self.media_endpoint,
                "syndicate-to": self.targets.as_slice(),
            }))),
            "syndicate-to" => Ok(QueryResponse::Json(json!({
                "syndicate-to": self.targets.as_slice(),
            }))),
            other => {
                tracing::debug!(query = %other, "Unsupported micropub query");
                Ok(QueryResponse::Empty)
            }
        }
    }

    async fn source(&self, url: &str, properties: &[String]) -> Result<QueryResponse, AppError> {
        let post = match url {
            "" => None,
            url => self.posts.find_by_url(url).await?,
        }
        .ok_or_else(|| {
            AppError::InvalidRequest(format!("The specified URL ('{}') could not be found.", url))
        })?;

        Ok(QueryResponse::Json(post.source(properties)))
    }
}
