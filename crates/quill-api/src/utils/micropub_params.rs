//! Micropub request parameters.
//!
//! Clients send form-encoded, JSON or multipart bodies. All three are read into
//! `MicropubParams`, which is then classified exactly once into a create or a
//! mutation.

use crate::error::HttpAppError;
use crate::services::AttachedFile;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use quill_core::constants::{DEFAULT_POST_TYPE, MEDIA_PROPERTIES};
use quill_core::{
    Action, AppError, CreateRequest, MicropubRequest, MutateRequest, PostChanges, Properties,
    UploadedFile,
};
use serde_json::{Map, Value};

const SYNDICATE_TO: &str = "mp-syndicate-to";

#[derive(Debug, Default)]
pub struct MicropubParams {
    /// Post type without the `h-` prefix.
    pub kind: Option<String>,
    pub action: Option<String>,
    pub url: Option<String>,
    pub access_token: Option<String>,
    pub syndicate_to: Vec<String>,
    pub properties: Properties,
    pub changes: PostChanges,
    pub files: Vec<AttachedFile>,
}

impl MicropubParams {
    pub fn from_form(body: &[u8]) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            params.push_pair(&key, value.into_owned());
        }
        params
    }

    pub fn from_json(body: &[u8]) -> Result<Self, AppError> {
        let Value::Object(mut object) = serde_json::from_slice::<Value>(body)? else {
            return Err(AppError::InvalidRequest(
                "The request body must be a JSON object.".to_string(),
            ));
        };

        let mut params = Self {
            kind: object
                .get("type")
                .and_then(|value| into_values(value.clone()).into_iter().next())
                .and_then(|value| value.as_str().map(|s| s.trim_start_matches("h-").to_string())),
            action: object.get("action").map(scalar_string),
            url: object.get("url").map(scalar_string),
            access_token: object.get("access_token").map(scalar_string),
            ..Default::default()
        };

        match object.remove("properties") {
            Some(Value::Object(properties)) => {
                for (name, value) in properties {
                    if name == SYNDICATE_TO {
                        params.syndicate_to.extend(strings(into_values(value)));
                    } else {
                        params.properties.insert(name, into_values(value));
                    }
                }
            }
            None | Some(Value::Null) => {}
            Some(_) => {
                return Err(AppError::InvalidRequest(
                    "The 'properties' value must be an object.".to_string(),
                ))
            }
        }

        if let Some(value) = object.remove(SYNDICATE_TO) {
            params.syndicate_to.extend(strings(into_values(value)));
        }

        params.changes.replace = properties_of("replace", object.remove("replace"))?;
        params.changes.add = properties_of("add", object.remove("add"))?;
        match object.remove("delete") {
            Some(Value::Object(map)) => params.changes.delete = properties_of_map(map),
            Some(Value::Array(names)) => params.changes.delete_properties = strings(names),
            Some(Value::String(name)) => params.changes.delete_properties = vec![name],
            None | Some(Value::Null) => {}
            Some(_) => {
                return Err(AppError::InvalidRequest(
                    "The 'delete' value must be an object or a list of property names."
                        .to_string(),
                ))
            }
        }

        Ok(params)
    }

    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut params = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            AppError::InvalidRequest(format!("Failed to read multipart: {}", e))
        })? {
            let name = field.name().map(str::to_string).unwrap_or_default();

            if let Some(filename) = field.file_name().map(str::to_string) {
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?;

                params.files.push(AttachedFile {
                    property: name.trim_end_matches("[]").to_string(),
                    file: UploadedFile::new(filename, content_type, data.to_vec()),
                });
                continue;
            }

            let value = field.text().await.map_err(|e| {
                AppError::InvalidRequest(format!("Failed to read multipart field: {}", e))
            })?;
            params.push_pair(&name, value);
        }

        Ok(params)
    }

    fn push_pair(&mut self, key: &str, value: String) {
        match key {
            "h" => self.kind = Some(value),
            "action" => self.action = Some(value),
            "url" => self.url = Some(value),
            "access_token" => self.access_token = Some(value),
            _ => {
                let name = key.trim_end_matches("[]");
                if name == SYNDICATE_TO {
                    if !value.is_empty() {
                        self.syndicate_to.push(value);
                    }
                } else if !name.is_empty() {
                    self.properties
                        .entry(name.to_string())
                        .or_default()
                        .push(Value::String(value));
                }
            }
        }
    }

    /// Classify into a create (no `action`) or a mutation. A mutation must name
    /// a supported action and a non-empty URL. Only files attached to media
    /// properties are kept.
    pub fn into_request(self) -> Result<(MicropubRequest, Vec<AttachedFile>), AppError> {
        let files: Vec<AttachedFile> = self
            .files
            .into_iter()
            .filter(|attached| {
                let keep = MEDIA_PROPERTIES.contains(&attached.property.as_str());
                if !keep {
                    tracing::debug!(field = %attached.property, "Ignoring file on non-media field");
                }
                keep
            })
            .collect();

        let request = match self.action {
            Some(action) => {
                let action: Action = action.parse()?;
                let url = self.url.filter(|url| !url.is_empty()).ok_or_else(|| {
                    AppError::InvalidRequest("The specified URL ('') could not be found.".to_string())
                })?;
                MicropubRequest::Mutate(MutateRequest {
                    action,
                    url,
                    changes: self.changes,
                    syndicate_to: self.syndicate_to,
                })
            }
            None => MicropubRequest::Create(CreateRequest {
                kind: self
                    .kind
                    .filter(|kind| !kind.is_empty())
                    .unwrap_or_else(|| DEFAULT_POST_TYPE.to_string()),
                properties: self.properties,
                syndicate_to: self.syndicate_to,
            }),
        };

        Ok((request, files))
    }

    /// First uploaded file sent under `field`.
    pub fn take_file(&mut self, field: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.property == field)?;
        Some(self.files.remove(index).file)
    }
}

impl<S> FromRequest<S> for MicropubParams
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await.map_err(|e| {
                AppError::InvalidRequest(format!("Invalid multipart body: {}", e.body_text()))
            })?;
            return Ok(Self::from_multipart(multipart).await?);
        }

        let body = Bytes::from_request(req, state).await.map_err(|e| {
            AppError::InvalidRequest(format!("Failed to read request body: {}", e.body_text()))
        })?;

        if content_type.starts_with("application/json") {
            Ok(Self::from_json(&body)?)
        } else {
            Ok(Self::from_form(&body))
        }
    }
}

/// Parameters of `GET /micropub`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub q: Option<String>,
    pub url: Option<String>,
    pub properties: Vec<String>,
    pub access_token: Option<String>,
}

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "q" => params.q = Some(value.into_owned()),
                "url" => params.url = Some(value.into_owned()),
                "access_token" => params.access_token = Some(value.into_owned()),
                "properties" | "properties[]" => params.properties.push(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

/// First value of `key` in a form-encoded body.
pub fn form_value(body: &[u8], key: &str) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Microformats values are always lists; a bare value becomes a one-item list.
fn into_values(value: Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn strings(values: Vec<Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        })
        .collect()
}

fn properties_of_map(map: Map<String, Value>) -> Properties {
    map.into_iter()
        .map(|(name, value)| (name, into_values(value)))
        .collect()
}

fn properties_of(field: &str, value: Option<Value>) -> Result<Properties, AppError> {
    match value {
        None | Some(Value::Null) => Ok(Properties::new()),
        Some(Value::Object(map)) => Ok(properties_of_map(map)),
        Some(_) => Err(AppError::InvalidRequest(format!(
            "The '{}' value must be an object.",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::ErrorMetadata;
    use serde_json::json;

    #[test]
    fn test_form_create() {
        let params = MicropubParams::from_form(
            b"h=entry&content=Hello+world&category[]=a&category[]=b&mp-syndicate-to=https%3A%2F%2Fsocial.example%2F&access_token=tok",
        );
        assert_eq!(params.access_token.as_deref(), Some("tok"));

        let (request, files) = params.into_request().unwrap();
        assert!(files.is_empty());
        match request {
            MicropubRequest::Create(create) => {
                assert_eq!(create.kind, "entry");
                assert_eq!(create.properties["content"], vec![json!("Hello world")]);
                assert_eq!(create.properties["category"], vec![json!("a"), json!("b")]);
                assert_eq!(create.syndicate_to, vec!["https://social.example/"]);
                assert!(!create.properties.contains_key("access_token"));
            }
            other => panic!("Expected create, got {:?}", other),
        }
    }

    #[test]
    fn test_form_without_h_defaults_to_entry() {
        let (request, _) = MicropubParams::from_form(b"content=hi")
            .into_request()
            .unwrap();
        assert!(matches!(request, MicropubRequest::Create(c) if c.kind == "entry"));
    }

    #[test]
    fn test_form_delete_action() {
        let (request, _) =
            MicropubParams::from_form(b"action=delete&url=https%3A%2F%2Fexample.com%2F2024%2F01%2Fa")
                .into_request()
                .unwrap();
        match request {
            MicropubRequest::Mutate(mutate) => {
                assert_eq!(mutate.action, Action::Delete);
                assert_eq!(mutate.url, "https://example.com/2024/01/a");
            }
            other => panic!("Expected mutation, got {:?}", other),
        }
    }

    #[test]
    fn test_action_without_url_is_invalid() {
        for body in [&b"action=update"[..], &b"action=update&url="[..]] {
            let err = MicropubParams::from_form(body).into_request().unwrap_err();
            assert_eq!(err.http_status_code(), 400);
            assert_eq!(
                err.client_message(),
                "The specified URL ('') could not be found."
            );
        }
    }

    #[test]
    fn test_bogus_action_checked_before_url() {
        let err = MicropubParams::from_form(b"action=bogus")
            .into_request()
            .unwrap_err();
        assert!(err.client_message().contains("'bogus'"));
    }

    #[test]
    fn test_json_create() {
        let body = json!({
            "type": ["h-entry"],
            "properties": {
                "content": ["hello"],
                "name": "Title",
                "mp-syndicate-to": ["https://social.example/"]
            }
        });
        let (request, _) = MicropubParams::from_json(body.to_string().as_bytes())
            .unwrap()
            .into_request()
            .unwrap();
        match request {
            MicropubRequest::Create(create) => {
                assert_eq!(create.kind, "entry");
                assert_eq!(create.properties["name"], vec![json!("Title")]);
                assert!(!create.properties.contains_key("mp-syndicate-to"));
                assert_eq!(create.syndicate_to, vec!["https://social.example/"]);
            }
            other => panic!("Expected create, got {:?}", other),
        }
    }

    #[test]
    fn test_json_update() {
        let body = json!({
            "action": "update",
            "url": "https://example.com/2024/01/a",
            "replace": {"content": ["new"]},
            "add": {"category": ["x"]},
            "delete": ["syndication"]
        });
        let (request, _) = MicropubParams::from_json(body.to_string().as_bytes())
            .unwrap()
            .into_request()
            .unwrap();
        match request {
            MicropubRequest::Mutate(mutate) => {
                assert_eq!(mutate.action, Action::Update);
                assert_eq!(mutate.changes.replace["content"], vec![json!("new")]);
                assert_eq!(mutate.changes.add["category"], vec![json!("x")]);
                assert_eq!(mutate.changes.delete_properties, vec!["syndication"]);
            }
            other => panic!("Expected mutation, got {:?}", other),
        }

        let body = json!({
            "action": "update",
            "url": "https://example.com/2024/01/a",
            "delete": {"category": ["x"]}
        });
        let params = MicropubParams::from_json(body.to_string().as_bytes()).unwrap();
        assert_eq!(params.changes.delete["category"], vec![json!("x")]);
    }

    #[test]
    fn test_json_errors() {
        assert!(MicropubParams::from_json(b"{").is_err());
        assert!(MicropubParams::from_json(b"[1]").is_err());
        assert!(MicropubParams::from_json(br#"{"replace": "x"}"#).is_err());
        assert!(MicropubParams::from_json(br#"{"delete": 3}"#).is_err());
    }

    #[test]
    fn test_non_string_action_is_unsupported() {
        let err = MicropubParams::from_json(br#"{"action": 5, "url": "x"}"#)
            .unwrap()
            .into_request()
            .unwrap_err();
        assert!(err.client_message().contains("('5')"));
    }

    #[test]
    fn test_only_media_files_kept() {
        let mut params = MicropubParams::from_form(b"content=hi");
        params.files.push(AttachedFile {
            property: "photo".to_string(),
            file: UploadedFile::new("a.jpg", "image/jpeg", vec![1]),
        });
        params.files.push(AttachedFile {
            property: "other".to_string(),
            file: UploadedFile::new("b.bin", "application/octet-stream", vec![2]),
        });
        let (_, files) = params.into_request().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].property, "photo");
    }

    #[test]
    fn test_query_params() {
        let params = QueryParams::parse(
            "q=source&url=https%3A%2F%2Fexample.com%2F2024%2F01%2Fa&properties[]=content&properties=name",
        );
        assert_eq!(params.q.as_deref(), Some("source"));
        assert_eq!(params.url.as_deref(), Some("https://example.com/2024/01/a"));
        assert_eq!(params.properties, vec!["content", "name"]);
    }

    #[test]
    fn test_form_value() {
        assert_eq!(
            form_value(b"source=a&target=b", "target").as_deref(),
            Some("b")
        );
        assert_eq!(form_value(b"source=a", "target"), None);
    }
}
