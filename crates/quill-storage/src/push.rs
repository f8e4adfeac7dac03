//! Build notifications.
//!
//! The canonical repository posts a push payload to `/built` once the site has
//! been rebuilt. Only the list of post files touched by the push is extracted.

use crate::traits::{StorageError, StorageResult};
use quill_core::constants::POST_PATH_PREFIX;
use serde_json::Value;

/// Post files added or modified by a push, in commit order, without duplicates.
pub fn changed_post_paths(payload: &Value) -> StorageResult<Vec<String>> {
    let commits = payload
        .get("commits")
        .and_then(Value::as_array)
        .ok_or_else(|| StorageError::InvalidPayload("missing commits array".to_string()))?;

    let mut paths: Vec<String> = Vec::new();
    for commit in commits {
        for field in ["added", "modified"] {
            let Some(files) = commit.get(field).and_then(Value::as_array) else {
                continue;
            };
            for file in files.iter().filter_map(Value::as_str) {
                if is_post_path(file) && !paths.iter().any(|p| p == file) {
                    paths.push(file.to_string());
                }
            }
        }
    }

    Ok(paths)
}

fn is_post_path(path: &str) -> bool {
    path.strip_prefix(POST_PATH_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|rest| rest.ends_with(".json") && !rest.contains(".."))
}
