//! Application state shared by every handler.
//!
//! Collaborators are built once at startup (see `setup::services`) and never
//! replaced; the syndication targets inside them are read-only.

use crate::auth::AuthGate;
use crate::services::{MicropubService, QueryResponder, WebmentionIntake};
use quill_storage::{CanonicalStore, MediaStore};
use std::sync::Arc;

pub struct AppState {
    pub auth: AuthGate,
    pub micropub: MicropubService,
    pub query: QueryResponder,
    pub webmention: WebmentionIntake,
    pub media: Arc<MediaStore>,
    /// Store of record, also receives build notifications.
    pub canonical: Arc<dyn CanonicalStore>,
}
