//! Quill Core Library
//!
//! This crate provides the domain models, error taxonomy, and configuration
//! shared by the storage and HTTP layers of the Micropub/Webmention endpoint.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, Environment, MirrorFailurePolicy, SmtpConfig};
pub use error::{AppError, ErrorMetadata, LogLevel, StoreError, WebmentionError};
pub use models::{
    Action, CreateRequest, MicropubRequest, MutateRequest, Post, PostChanges, Properties,
    SyndicationTarget, UploadedFile,
};
