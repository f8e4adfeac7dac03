use crate::models::micropub::{Action, PostChanges, Properties};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A post as stored in the canonical store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub url: String,
    /// Microformats type, e.g. `["h-entry"]`.
    #[serde(rename = "type")]
    pub kind: Vec<String>,
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

impl Post {
    pub fn new(url: impl Into<String>, kind: &str, properties: Properties) -> Self {
        Self {
            url: url.into(),
            kind: vec![format!("h-{}", kind)],
            properties,
            deleted: false,
        }
    }

    /// Apply a mutation. `update` applies replace, then add, then delete.
    pub fn apply(&mut self, action: Action, changes: &PostChanges) {
        match action {
            Action::Delete => self.deleted = true,
            Action::Undelete => self.deleted = false,
            Action::Update => self.apply_changes(changes),
        }
    }

    fn apply_changes(&mut self, changes: &PostChanges) {
        for (name, values) in &changes.replace {
            self.properties.insert(name.clone(), values.clone());
        }

        for (name, values) in &changes.add {
            self.properties
                .entry(name.clone())
                .or_default()
                .extend(values.iter().cloned());
        }

        for (name, values) in &changes.delete {
            if let Some(existing) = self.properties.get_mut(name) {
                existing.retain(|v| !values.contains(v));
                if existing.is_empty() {
                    self.properties.remove(name);
                }
            }
        }

        for name in &changes.delete_properties {
            self.properties.remove(name);
        }
    }

    /// Append syndication URLs, skipping ones already recorded.
    pub fn add_syndication(&mut self, urls: &[String]) {
        let entry = self.properties.entry("syndication".to_string()).or_default();
        for url in urls {
            let value = Value::String(url.clone());
            if !entry.contains(&value) {
                entry.push(value);
            }
        }
    }

    /// Micropub `q=source` body. With a property filter only the requested
    /// properties are returned and the type is omitted.
    pub fn source(&self, filter: &[String]) -> Value {
        if filter.is_empty() {
            return json!({
                "type": self.kind,
                "properties": self.properties,
            });
        }

        let properties: Map<String, Value> = self
            .properties
            .iter()
            .filter(|(name, _)| filter.contains(name))
            .map(|(name, values)| (name.clone(), Value::Array(values.clone())))
            .collect();

        json!({ "properties": properties })
    }
}
