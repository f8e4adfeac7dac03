//! Error types module
//!
//! Every failure that can reach a client is one of the `AppError` variants. The
//! webmention and store families carry their own subtypes so that each one maps
//! to a distinct protocol error type and HTTP status. `ErrorMetadata` is the only
//! place where a variant is turned into wire-level values; the HTTP layer renders
//! `{"error": error_type, "error_description": client_message}` from it.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for failures caused by remote parties
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Protocol error type (e.g., "invalid_request")
    fn error_type(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Webmention-specific failures, raised either by the intake preconditions or by
/// the verifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebmentionError {
    #[error("The source parameter is missing or empty.")]
    MissingSource,

    #[error("The target parameter is missing or empty.")]
    MissingTarget,

    #[error("The source and target must be different URLs.")]
    SelfReference,

    #[error("Webmentions targeting the site root ('{0}') are not accepted.")]
    RootTarget(String),

    #[error("The source URL ('{0}') is not a valid http(s) URL.")]
    InvalidSource(String),

    #[error("The target URL ('{0}') is not on this site.")]
    TargetNotSupported(String),

    #[error("The source URL could not be retrieved: {0}")]
    SourceNotFound(String),

    #[error("The source does not link to the target ('{0}').")]
    NoLinkFound(String),

    #[error("The source URL could not be reached: {0}")]
    SourceUnavailable(String),
}

/// Store failures. Canonical and mirror writes are reported distinctly so the
/// caller can tell whether the durable copy exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Canonical store write failed: {0}")]
    CanonicalWrite(String),

    #[error("Media mirror write failed for {url}: {message}")]
    MirrorWrite { url: String, message: String },

    #[error("Local media write failed: {0}")]
    LocalWrite(String),

    #[error("Store read failed: {0}")]
    Read(String),

    #[error("Store operation timed out: {0}")]
    Timeout(String),

    #[error("Build notification could not be processed: {0}")]
    Build(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Micropub endpoint did not return an access token.")]
    NoToken,

    #[error("The authenticated user does not have permission to perform this request.")]
    Forbidden,

    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Webmention(#[from] WebmentionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("The request was not completed within {0} seconds.")]
    RequestTimeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidRequest(format!("The request body is not valid JSON: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_type, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, LogLevel) {
    match err {
        AppError::NoToken => (401, "unauthorized", LogLevel::Debug),
        AppError::Forbidden => (403, "forbidden", LogLevel::Debug),
        AppError::InvalidRequest(_) => (400, "invalid_request", LogLevel::Debug),
        AppError::Webmention(e) => webmention_static_metadata(e),
        AppError::Store(e) => store_static_metadata(e),
        AppError::RequestTimeout(_) => (408, "request_timeout", LogLevel::Warn),
        AppError::Internal(_) => (500, "server_error", LogLevel::Error),
    }
}

fn webmention_static_metadata(err: &WebmentionError) -> (u16, &'static str, LogLevel) {
    match err {
        WebmentionError::MissingSource => (400, "invalid_source", LogLevel::Debug),
        WebmentionError::MissingTarget => (400, "invalid_target", LogLevel::Debug),
        WebmentionError::SelfReference => (400, "invalid_target", LogLevel::Debug),
        WebmentionError::RootTarget(_) => (400, "target_not_supported", LogLevel::Debug),
        WebmentionError::InvalidSource(_) => (400, "invalid_source", LogLevel::Warn),
        WebmentionError::TargetNotSupported(_) => (400, "target_not_supported", LogLevel::Warn),
        WebmentionError::SourceNotFound(_) => (400, "source_not_found", LogLevel::Warn),
        WebmentionError::NoLinkFound(_) => (400, "no_link_found", LogLevel::Warn),
        WebmentionError::SourceUnavailable(_) => (502, "source_unavailable", LogLevel::Warn),
    }
}

fn store_static_metadata(err: &StoreError) -> (u16, &'static str, LogLevel) {
    match err {
        StoreError::CanonicalWrite(_) => (500, "canonical_write_failed", LogLevel::Error),
        StoreError::MirrorWrite { .. } => (502, "mirror_write_failed", LogLevel::Error),
        StoreError::LocalWrite(_) => (500, "local_write_failed", LogLevel::Error),
        StoreError::Read(_) => (500, "store_read_failed", LogLevel::Error),
        StoreError::Timeout(_) => (504, "store_timeout", LogLevel::Error),
        StoreError::Build(_) => (400, "invalid_build", LogLevel::Warn),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_type(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn client_message(&self) -> String {
        match self {
            // Internal details stay in the logs
            AppError::Internal(_) => "An internal error occurred.".to_string(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }
}

impl ErrorMetadata for WebmentionError {
    fn http_status_code(&self) -> u16 {
        webmention_static_metadata(self).0
    }

    fn error_type(&self) -> &'static str {
        webmention_static_metadata(self).1
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        webmention_static_metadata(self).2
    }
}
