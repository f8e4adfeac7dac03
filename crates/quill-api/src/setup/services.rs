//! Collaborator construction

use crate::auth::{AuthGate, IndieAuthTokenValidator, TokenValidator};
use crate::services::{
    create_notifier, load_syndication_targets, CanonicalPostRepository, HttpSyndicator,
    HttpWebmentionVerifier, MicropubService, Notifier, PostRepository, QueryResponder,
    Syndicator, WebmentionIntake, WebmentionVerifier,
};
use crate::state::AppState;
use anyhow::{Context, Result};
use quill_core::{Config, SyndicationTarget};
use quill_storage::{create_canonical_store, create_media_store, CanonicalStore, MediaStore};
use std::sync::Arc;
use std::time::Duration;

/// Everything the handlers depend on. Built once per process; tests assemble
/// one from mocks.
pub struct Collaborators {
    pub canonical: Arc<dyn CanonicalStore>,
    pub media: Arc<MediaStore>,
    pub posts: Arc<dyn PostRepository>,
    pub validator: Arc<dyn TokenValidator>,
    pub verifier: Arc<dyn WebmentionVerifier>,
    pub notifier: Arc<dyn Notifier>,
    pub syndicator: Arc<dyn Syndicator>,
    pub targets: Arc<Vec<SyndicationTarget>>,
}

pub async fn initialize_services(config: &Config) -> Result<Collaborators> {
    let store_timeout = Duration::from_secs(config.store_timeout_secs);
    let http_timeout = Duration::from_secs(config.http_client_timeout_secs);

    let canonical = create_canonical_store(config)
        .await
        .context("Failed to create canonical store")?;
    tracing::info!(
        backend = canonical.backend_type().as_str(),
        "Canonical store initialized"
    );

    let media = Arc::new(
        create_media_store(config, canonical.clone())
            .await
            .context("Failed to create media store")?,
    );

    let targets_path = config.syndication_targets_path();
    let targets = Arc::new(load_syndication_targets(&targets_path)?);
    tracing::info!(
        count = targets.len(),
        path = %targets_path.display(),
        "Syndication targets loaded"
    );

    let posts: Arc<dyn PostRepository> = Arc::new(CanonicalPostRepository::new(
        canonical.clone(),
        &config.root_url,
        store_timeout,
    ));

    let validator = Arc::new(IndieAuthTokenValidator::new(
        config.token_endpoint.clone(),
        &config.root_url,
        http_timeout,
    )?);
    let verifier = Arc::new(HttpWebmentionVerifier::new(&config.root_url, http_timeout)?);
    let syndicator = Arc::new(HttpSyndicator::new(targets.clone(), http_timeout)?);

    Ok(Collaborators {
        canonical,
        media,
        posts,
        validator,
        verifier,
        notifier: create_notifier(config),
        syndicator,
        targets,
    })
}

pub fn build_state(config: &Config, collaborators: Collaborators) -> Arc<AppState> {
    let Collaborators {
        canonical,
        media,
        posts,
        validator,
        verifier,
        notifier,
        syndicator,
        targets,
    } = collaborators;

    let media_endpoint = format!("{}/micropub/media", config.root_url_trimmed());
    if !config.is_production() {
        tracing::warn!("Token enforcement disabled outside production");
    }

    Arc::new(AppState {
        auth: AuthGate::new(config.is_production(), validator),
        micropub: MicropubService::new(posts.clone(), syndicator, media.clone()),
        query: QueryResponder::new(posts, targets, media_endpoint),
        webmention: WebmentionIntake::new(&config.root_url, verifier, notifier),
        media,
        canonical,
    })
}
