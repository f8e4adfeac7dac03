//! Classified Micropub requests.
//!
//! A request is decided once at the HTTP boundary to be either a create or a
//! mutation of an existing post, and travels downstream as that variant.

use crate::constants::VALID_ACTIONS;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Microformats properties: every property is a list of values.
pub type Properties = BTreeMap<String, Vec<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Update,
    Delete,
    Undelete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Undelete => "undelete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "undelete" => Ok(Action::Undelete),
            other => Err(AppError::InvalidRequest(format!(
                "The specified action ('{}') is not supported. Valid actions are: {}.",
                other,
                VALID_ACTIONS.join(", ")
            ))),
        }
    }
}

/// Property changes carried by an `update` action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostChanges {
    pub replace: Properties,
    pub add: Properties,
    /// Individual values to remove from a property.
    pub delete: Properties,
    /// Properties to remove entirely.
    pub delete_properties: Vec<String>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.replace.is_empty()
            && self.add.is_empty()
            && self.delete.is_empty()
            && self.delete_properties.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    /// Post type without the `h-` prefix, e.g. `entry`.
    pub kind: String,
    pub properties: Properties,
    pub syndicate_to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutateRequest {
    pub action: Action,
    pub url: String,
    pub changes: PostChanges,
    pub syndicate_to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MicropubRequest {
    Create(CreateRequest),
    Mutate(MutateRequest),
}

impl MicropubRequest {
    pub fn label(&self) -> &'static str {
        match self {
            MicropubRequest::Create(_) => "create",
            MicropubRequest::Mutate(req) => req.action.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorMetadata;

    #[test]
    fn test_valid_actions_parse() {
        assert_eq!("update".parse::<Action>().unwrap(), Action::Update);
        assert_eq!("delete".parse::<Action>().unwrap(), Action::Delete);
        assert_eq!("undelete".parse::<Action>().unwrap(), Action::Undelete);
    }

    #[test]
    fn test_unknown_action_names_value_and_options() {
        let err = "bogus".parse::<Action>().unwrap_err();
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_type(), "invalid_request");
        let message = err.client_message();
        assert!(message.contains("'bogus'"));
        assert!(message.ends_with("Valid actions are: update, delete, undelete."));
    }

    #[test]
    fn test_action_is_case_sensitive() {
        assert!("Update".parse::<Action>().is_err());
    }

    #[test]
    fn test_empty_changes() {
        assert!(PostChanges::default().is_empty());
        let mut changes = PostChanges::default();
        changes.delete_properties.push("category".into());
        assert!(!changes.is_empty());
    }
}
