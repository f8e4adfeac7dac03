//! Quill Storage Library
//!
//! Storage abstraction and backends for posts and media, plus the dual-write
//! media pipeline.
//!
//! # Layout
//!
//! Every backend uses the same relative keys:
//!
//! - **Media**: `file/{date}-{random}.{ext}` (see the `keys` module)
//! - **Posts**: `posts/{yyyy}/{mm}/{slug}.json`
//!
//! Keys must not contain `..` or a leading `/`.

pub mod factory;
#[cfg(feature = "storage-github")]
pub mod github;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod media;
pub mod push;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::{create_canonical_store, create_media_store};
#[cfg(feature = "storage-github")]
pub use github::GithubStorage;
pub use keys::StorageKey;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use media::{MediaError, MediaRoute, MediaStore};
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{CanonicalStore, Storage, StorageBackend, StorageError, StorageResult};
