//! Protocol and layout constants.

/// Micropub actions accepted on a mutation request, in the order they are advertised.
pub const VALID_ACTIONS: [&str; 3] = ["update", "delete", "undelete"];

/// Directory passed to the media pipeline when the caller does not name one.
pub const DEFAULT_MEDIA_DIR: &str = "photo";

/// Prefix of every media path, relative to the media base URL.
pub const MEDIA_PATH_PREFIX: &str = "file";

/// Subdirectory of the content directory holding media written in development.
pub const LOCAL_MEDIA_DIR: &str = "media";

/// Prefix of post documents inside the canonical store.
pub const POST_PATH_PREFIX: &str = "posts";

/// File name of the syndication target descriptors inside the config directory.
pub const SYNDICATION_TARGETS_FILE: &str = "syndication_targets.json";

/// Multipart fields that carry media for a create request.
pub const MEDIA_PROPERTIES: [&str; 3] = ["photo", "video", "audio"];

/// Post type used when a create request does not name one.
pub const DEFAULT_POST_TYPE: &str = "entry";
