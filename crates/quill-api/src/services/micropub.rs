//! Micropub action dispatch.
//!
//! Requests arrive already classified. A create saves any attached media,
//! creates the post and answers 201 with its URL; a mutation checks the post
//! exists, applies the action and answers 204. Both then syndicate.

use crate::services::posts::PostRepository;
use crate::services::syndication::Syndicator;
use quill_core::constants::MEDIA_PROPERTIES;
use quill_core::{
    AppError, CreateRequest, MicropubRequest, MutateRequest, Post, UploadedFile,
};
use quill_storage::MediaStore;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MicropubOutcome {
    Created { location: String },
    Mutated,
}

/// A file attached to a create request, keyed by the property it belongs to.
#[derive(Debug, Clone)]
pub struct AttachedFile {
    pub property: String,
    pub file: UploadedFile,
}

pub struct MicropubService {
    posts: Arc<dyn PostRepository>,
    syndicator: Arc<dyn Syndicator>,
    media: Arc<MediaStore>,
}

impl MicropubService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        syndicator: Arc<dyn Syndicator>,
        media: Arc<MediaStore>,
    ) -> Self {
        Self {
            posts,
            syndicator,
            media,
        }
    }

    pub async fn handle(
        &self,
        request: MicropubRequest,
        files: Vec<AttachedFile>,
    ) -> Result<MicropubOutcome, AppError> {
        tracing::debug!(kind = request.label(), "Handling micropub request");

        match request {
            MicropubRequest::Create(create) => self.create(create, files).await,
            MicropubRequest::Mutate(mutate) => {
                if !files.is_empty() {
                    tracing::debug!(count = files.len(), "Ignoring files on mutation request");
                }
                self.mutate(mutate).await
            }
        }
    }

    async fn create(
        &self,
        mut request: CreateRequest,
        files: Vec<AttachedFile>,
    ) -> Result<MicropubOutcome, AppError> {
        for property in MEDIA_PROPERTIES {
            let batch: Vec<UploadedFile> = files
                .iter()
                .filter(|attached| attached.property == property)
                .map(|attached| attached.file.clone())
                .collect();
            if batch.is_empty() {
                continue;
            }

            let urls = self.media.upload_files(&batch, property).await?;
            request
                .properties
                .entry(property.to_string())
                .or_default()
                .extend(urls.into_iter().map(Value::String));
        }

        let post = self.posts.create(&request).await?;
        let location = post.url.clone();
        self.syndicate(post, &request.syndicate_to).await;

        Ok(MicropubOutcome::Created { location })
    }

    async fn mutate(&self, request: MutateRequest) -> Result<MicropubOutcome, AppError> {
        if !self.posts.exists_by_url(&request.url).await? {
            return Err(AppError::InvalidRequest(format!(
                "The specified URL ('{}') could not be found.",
                request.url
            )));
        }

        let post = self.posts.apply_action(&request).await?;
        self.syndicate(post, &request.syndicate_to).await;

        Ok(MicropubOutcome::Mutated)
    }

    /// Opportunistic: never fails the request.
    async fn syndicate(&self, mut post: Post, targets: &[String]) {
        if targets.is_empty() {
            return;
        }

        let urls = self.syndicator.syndicate(&post, targets).await;
        if urls.is_empty() {
            return;
        }

        post.add_syndication(&urls);
        if let Err(e) = self.posts.save(&post).await {
            tracing::warn!(error = %e, url = %post.url, "Failed to record syndication URLs");
        }
    }
}
