//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p quill-api`.

#![allow(dead_code)]

pub mod mocks;

use axum_test::TestServer;
use mocks::{MockNotifier, MockPosts, MockStorage, MockSyndicator, MockValidator, MockVerifier};
use quill_api::services::{CanonicalPostRepository, PostRepository};
use quill_api::setup::{routes, services};
use quill_core::{Config, Environment, MirrorFailurePolicy, SyndicationTarget};
use quill_storage::{create_canonical_store, create_media_store, MediaRoute, MediaStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const ROOT_URL: &str = "https://example.com/";
pub const MEDIA_URL: &str = "https://media.example.com/";
pub const VALID_TOKEN: &str = "valid-token";

pub fn test_config(environment: Environment, content_dir: &Path) -> Config {
    Config {
        environment,
        server_port: 4000,
        root_url: ROOT_URL.to_string(),
        media_url: MEDIA_URL.to_string(),
        content_dir: content_dir.to_path_buf(),
        config_dir: content_dir.to_path_buf(),
        token_endpoint: "https://tokens.example.com/token".to_string(),
        github_access_token: None,
        github_repo: None,
        github_branch: "main".to_string(),
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        mirror_failure_policy: MirrorFailurePolicy::Fail,
        store_timeout_secs: 5,
        http_client_timeout_secs: 5,
        request_timeout_secs: 30,
        max_upload_size_bytes: 1024 * 1024,
        smtp: None,
    }
}

pub fn syndication_targets() -> Vec<SyndicationTarget> {
    vec![SyndicationTarget {
        uid: "https://social.example/".to_string(),
        name: "Social".to_string(),
        endpoint: Some("https://social.example/api/notes".to_string()),
    }]
}

#[derive(Clone, Copy)]
pub struct TestOptions {
    pub environment: Environment,
    pub canonical_fails: bool,
    pub mirror_fails: bool,
    pub policy: MirrorFailurePolicy,
    pub request_timeout_secs: u64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            canonical_fails: false,
            mirror_fails: false,
            policy: MirrorFailurePolicy::Fail,
            request_timeout_secs: 30,
        }
    }
}

impl TestOptions {
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            ..Default::default()
        }
    }
}

/// Test application: server plus handles on every mock collaborator.
pub struct TestApp {
    pub server: TestServer,
    pub posts: Arc<MockPosts>,
    /// Canonical store in production, the local media store otherwise.
    pub canonical: Arc<MockStorage>,
    pub mirror: Arc<MockStorage>,
    pub validator: Arc<MockValidator>,
    pub verifier: Arc<MockVerifier>,
    pub notifier: Arc<MockNotifier>,
    pub syndicator: Arc<MockSyndicator>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(TestOptions::default()).await
}

pub async fn setup_test_app_with(options: TestOptions) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = test_config(options.environment, temp_dir.path());
    config.mirror_failure_policy = options.policy;
    config.request_timeout_secs = options.request_timeout_secs;

    let canonical = Arc::new(if options.canonical_fails {
        MockStorage::failing()
    } else {
        MockStorage::default()
    });
    let mirror = Arc::new(if options.mirror_fails {
        MockStorage::failing()
    } else {
        MockStorage::default()
    });

    let route = if config.is_production() {
        MediaRoute::Production {
            canonical: canonical.clone(),
            mirror: mirror.clone(),
            policy: options.policy,
        }
    } else {
        MediaRoute::Local {
            storage: canonical.clone(),
        }
    };
    let media = Arc::new(
        MediaStore::new(route, MEDIA_URL, Duration::from_secs(5))
            .expect("Failed to create media store"),
    );

    let posts = Arc::new(MockPosts::default());
    let validator = Arc::new(MockValidator::accepting(VALID_TOKEN));
    let verifier = Arc::new(MockVerifier::default());
    let notifier = Arc::new(MockNotifier::default());
    let syndicator = Arc::new(MockSyndicator::default());

    let state = services::build_state(
        &config,
        services::Collaborators {
            canonical: canonical.clone(),
            media,
            posts: posts.clone(),
            validator: validator.clone(),
            verifier: verifier.clone(),
            notifier: notifier.clone(),
            syndicator: syndicator.clone(),
            targets: Arc::new(syndication_targets()),
        },
    );

    let app = routes::setup_routes(&config, state)
        .await
        .expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        posts,
        canonical,
        mirror,
        validator,
        verifier,
        notifier,
        syndicator,
        _temp_dir: temp_dir,
    }
}

/// Development app wired with the real local stores and post repository.
pub struct LocalApp {
    pub server: TestServer,
    pub temp_dir: TempDir,
}

pub async fn setup_local_app() -> LocalApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(Environment::Development, temp_dir.path());

    let canonical = create_canonical_store(&config)
        .await
        .expect("Failed to create canonical store");
    let media = Arc::new(
        create_media_store(&config, canonical.clone())
            .await
            .expect("Failed to create media store"),
    );
    let posts: Arc<dyn PostRepository> = Arc::new(CanonicalPostRepository::new(
        canonical.clone(),
        &config.root_url,
        Duration::from_secs(5),
    ));

    let state = services::build_state(
        &config,
        services::Collaborators {
            canonical,
            media,
            posts,
            validator: Arc::new(MockValidator::accepting(VALID_TOKEN)),
            verifier: Arc::new(MockVerifier::default()),
            notifier: Arc::new(MockNotifier::default()),
            syndicator: Arc::new(MockSyndicator::default()),
            targets: Arc::new(Vec::new()),
        },
    );

    let app = routes::setup_routes(&config, state)
        .await
        .expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    LocalApp { server, temp_dir }
}

/// `Authorization` header value carrying the accepted token.
pub fn bearer() -> String {
    format!("Bearer {}", VALID_TOKEN)
}
