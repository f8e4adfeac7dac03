//! Recording mock collaborators.

use async_trait::async_trait;
use quill_api::auth::TokenValidator;
use quill_api::services::{Notifier, PostRepository, Syndicator, WebmentionVerifier};
use quill_core::{AppError, CreateRequest, MutateRequest, Post, WebmentionError};
use quill_storage::{CanonicalStore, Storage, StorageBackend, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    fail: AtomicBool,
}

impl MockStorage {
    pub fn failing() -> Self {
        let storage = Self::default();
        storage.fail.store(true, Ordering::SeqCst);
        storage
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, content_type)| content_type.clone())
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("mock failure".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn upload_new(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        if self.objects.lock().unwrap().contains_key(storage_key) {
            return Err(StorageError::AlreadyExists(storage_key.to_string()));
        }
        self.upload_with_key(storage_key, data, content_type).await
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

impl CanonicalStore for MockStorage {}

/// In-memory posts. URLs are `https://example.com/2024/01/post-{n}`.
#[derive(Default)]
pub struct MockPosts {
    posts: Mutex<HashMap<String, Post>>,
    created: Mutex<Vec<CreateRequest>>,
    mutations: Mutex<Vec<MutateRequest>>,
    exists_calls: AtomicUsize,
    saves: AtomicUsize,
    stall: AtomicBool,
}

impl MockPosts {
    /// Make `create` hang forever.
    pub fn stall(&self) {
        self.stall.store(true, Ordering::SeqCst);
    }

    pub fn insert(&self, post: Post) {
        self.posts.lock().unwrap().insert(post.url.clone(), post);
    }

    pub fn get(&self, url: &str) -> Option<Post> {
        self.posts.lock().unwrap().get(url).cloned()
    }

    pub fn created(&self) -> Vec<CreateRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<MutateRequest> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostRepository for MockPosts {
    async fn create(&self, request: &CreateRequest) -> Result<Post, AppError> {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        let url = format!("{}2024/01/post-{}", super::ROOT_URL, created.len());
        let post = Post::new(url, &request.kind, request.properties.clone());
        self.posts
            .lock()
            .unwrap()
            .insert(post.url.clone(), post.clone());
        Ok(post)
    }

    async fn apply_action(&self, request: &MutateRequest) -> Result<Post, AppError> {
        self.mutations.lock().unwrap().push(request.clone());
        let mut posts = self.posts.lock().unwrap();
        let post = posts.get_mut(&request.url).ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "The specified URL ('{}') could not be found.",
                request.url
            ))
        })?;
        post.apply(request.action, &request.changes);
        Ok(post.clone())
    }

    async fn exists_by_url(&self, url: &str) -> Result<bool, AppError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.posts.lock().unwrap().contains_key(url))
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Post>, AppError> {
        Ok(self.get(url))
    }

    async fn save(&self, post: &Post) -> Result<(), AppError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.insert(post.clone());
        Ok(())
    }
}

pub struct MockValidator {
    valid: String,
    calls: AtomicUsize,
}

impl MockValidator {
    pub fn accepting(token: &str) -> Self {
        Self {
            valid: token.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenValidator for MockValidator {
    async fn is_valid_token(&self, token: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        token == self.valid
    }
}

#[derive(Default)]
pub struct MockVerifier {
    calls: AtomicUsize,
    fail_with: Mutex<Option<WebmentionError>>,
}

impl MockVerifier {
    pub fn fail_with(&self, error: WebmentionError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebmentionVerifier for MockVerifier {
    async fn verify(&self, _source: &str, _target: &str) -> Result<(), WebmentionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl MockNotifier {
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Notifications are spawned; wait briefly for them to land.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, String, String)> {
        for _ in 0..50 {
            if self.sent.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, subject: &str, message: &str, context: &str) {
        self.sent.lock().unwrap().push((
            subject.to_string(),
            message.to_string(),
            context.to_string(),
        ));
    }
}

/// Returns `https://social.example/{uid-tail}/{n}` for every requested target.
#[derive(Default)]
pub struct MockSyndicator {
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockSyndicator {
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Syndicator for MockSyndicator {
    async fn syndicate(&self, post: &Post, targets: &[String]) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((post.url.clone(), targets.to_vec()));
        targets
            .iter()
            .enumerate()
            .map(|(i, _)| format!("https://social.example/notes/{}-{}", calls.len(), i))
            .collect()
    }
}
