use serde::{Deserialize, Serialize};

/// A syndication target as described in `syndication_targets.json`.
///
/// Only `uid` and `name` are part of the Micropub `syndicate-to` response; the
/// delivery endpoint stays server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyndicationTarget {
    pub uid: String,
    pub name: String,
    #[serde(default, skip_serializing)]
    pub endpoint: Option<String>,
}
