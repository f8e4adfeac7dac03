//! Quill API Library
//!
//! This crate provides the Micropub and Webmention HTTP surface: handlers, the
//! auth gate, request classification, collaborators and application setup.

mod handlers;
mod telemetry;
mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
pub use utils::micropub_params::MicropubParams;
