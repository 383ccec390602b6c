use std::collections::BTreeMap;
use std::fmt;

use anyhow::anyhow;
use serde_json::{Map, Value, json};
use strum::Display;

use crate::StdResult;
use crate::error::ResponseAssertionError;

/// Identify an operation of an api specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    path: String,
    method: String,
}

impl EndpointKey {
    /// `EndpointKey` factory, the query part of the path is dropped and the method lower cased.
    pub fn new<P: AsRef<str>, M: AsRef<str>>(path: P, method: M) -> Self {
        let path = path.as_ref();
        let path = path.split('?').next().unwrap_or(path);

        Self {
            path: path.to_string(),
            method: method.as_ref().to_lowercase(),
        }
    }

    /// Path of the operation, as written in the `paths` object.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lower cased http method.
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method.to_uppercase(), self.path)
    }
}

/// Version of the api specification format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SpecVersion {
    /// Swagger 2.0, responses carry a single `schema`.
    #[strum(serialize = "swagger 2.0")]
    Swagger2,
    /// OpenAPI 3.x, responses carry a `content` map keyed by media type.
    #[strum(serialize = "openapi 3")]
    OpenApi3,
}

/// A fully dereferenced api specification.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiDocument {
    document: Value,
    version: SpecVersion,
}

impl ApiDocument {
    /// Wrap an already dereferenced document, checking it looks like an api specification.
    pub fn new(document: Value) -> StdResult<Self> {
        let version = match (document.get("swagger"), document.get("openapi")) {
            (Some(Value::String(version)), _) if version == "2.0" => SpecVersion::Swagger2,
            // `swagger: 2.0` unquoted in YAML
            (Some(Value::Number(version)), _) if version.as_f64() == Some(2.0) => {
                SpecVersion::Swagger2
            }
            (_, Some(Value::String(version))) if version.starts_with("3.") => {
                SpecVersion::OpenApi3
            }
            // `openapi: 3.1` unquoted in YAML
            (_, Some(Value::Number(version))) if version.to_string().starts_with("3.") => {
                SpecVersion::OpenApi3
            }
            (Some(version), _) | (_, Some(version)) => {
                return Err(anyhow!("Unsupported specification version: {version}"));
            }
            (None, None) => {
                return Err(anyhow!(
                    "Not an api specification: missing 'swagger' or 'openapi' version field"
                ));
            }
        };

        if !document.get("paths").is_some_and(Value::is_object) {
            return Err(anyhow!("Not an api specification: 'paths' must be an object"));
        }

        Ok(Self { document, version })
    }

    /// Format version of the specification.
    pub fn version(&self) -> SpecVersion {
        self.version
    }

    /// Raw dereferenced document.
    pub fn as_value(&self) -> &Value {
        &self.document
    }

    /// Look up the operation identified by the given key.
    pub fn endpoint(&self, key: &EndpointKey) -> Result<ResolvedEndpoint, ResponseAssertionError> {
        let unknown = |reason: String| ResponseAssertionError::UnknownEndpoint {
            key: key.clone(),
            reason,
        };

        let path_item = self.document["paths"]
            .get(key.path())
            .ok_or_else(|| unknown(format!("path '{}' is not declared", key.path())))?;
        let operation = path_item
            .get(key.method())
            .and_then(Value::as_object)
            .ok_or_else(|| {
                unknown(format!(
                    "method '{}' is not declared for path '{}'",
                    key.method(),
                    key.path()
                ))
            })?;

        ResolvedEndpoint::from_operation(key.clone(), operation).map_err(|e| unknown(e.to_string()))
    }
}

/// Response contract declared for one status.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseSpec {
    /// Swagger 2.0 style, a single optional schema.
    Schema(Option<Value>),
    /// OpenAPI 3 style, an optional schema per media type.
    Content(BTreeMap<String, Option<Value>>),
}

impl ResponseSpec {
    fn from_response_object(response: &Value) -> Self {
        match response.get("content").and_then(Value::as_object) {
            Some(content) => Self::Content(
                content
                    .iter()
                    .map(|(media_type, media)| (media_type.clone(), media.get("schema").cloned()))
                    .collect(),
            ),
            None => Self::Schema(response.get("schema").cloned()),
        }
    }

    /// Media types declared by an OpenAPI 3 response, `None` for the single schema form.
    pub fn media_types(&self) -> Option<Vec<&str>> {
        match self {
            Self::Schema(_) => None,
            Self::Content(content) => Some(content.keys().map(String::as_str).collect()),
        }
    }

    /// Find the declared media type matching the given content type (exact first, then ranges).
    pub fn matching_media_type(&self, content_type: &str) -> Option<&str> {
        let Self::Content(content) = self else {
            return None;
        };
        if let Some((media_type, _)) = content.get_key_value(content_type) {
            return Some(media_type);
        }

        let main_type = content_type.split('/').next().unwrap_or(content_type);
        let type_range = format!("{main_type}/*");
        [type_range.as_str(), "*/*"]
            .into_iter()
            .find_map(|range| content.get_key_value(range).map(|(k, _)| k.as_str()))
    }

    /// Schema to validate a body with, `{}` when nothing is declared.
    pub fn schema_for(&self, content_type: Option<&str>) -> Value {
        let schema = match (self, content_type) {
            (Self::Content(content), Some(content_type)) => self
                .matching_media_type(content_type)
                .and_then(|media_type| content.get(media_type))
                .cloned()
                .flatten(),
            (Self::Content(_), None) => None,
            (Self::Schema(schema), _) => schema.clone(),
        };

        schema.unwrap_or_else(|| json!({}))
    }
}

/// The operation object of an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    key: EndpointKey,
    produces: Option<Vec<String>>,
    responses: BTreeMap<String, ResponseSpec>,
}

impl ResolvedEndpoint {
    fn from_operation(key: EndpointKey, operation: &Map<String, Value>) -> StdResult<Self> {
        let produces = match operation.get("produces") {
            None => None,
            Some(Value::Array(values)) => Some(
                values
                    .iter()
                    .map(|value| {
                        value
                            .as_str()
                            .map(str::to_string)
                            .ok_or_else(|| anyhow!("'produces' entries must be strings"))
                    })
                    .collect::<StdResult<Vec<_>>>()?,
            ),
            Some(_) => return Err(anyhow!("'produces' must be an array")),
        };
        let responses = operation
            .get("responses")
            .and_then(Value::as_object)
            .ok_or_else(|| anyhow!("the operation has no 'responses' object"))?
            .iter()
            .map(|(status, response)| (status.clone(), ResponseSpec::from_response_object(response)))
            .collect();

        Ok(Self {
            key,
            produces,
            responses,
        })
    }

    /// Key of the endpoint.
    pub fn key(&self) -> &EndpointKey {
        &self.key
    }

    /// Content types listed by a Swagger 2.0 `produces` field.
    pub fn produces(&self) -> Option<&[String]> {
        self.produces.as_deref()
    }

    /// Status keys declared in the responses map.
    pub fn status_keys(&self) -> Vec<&str> {
        self.responses.keys().map(String::as_str).collect()
    }

    /// Check the observed content type against the `produces` list.
    ///
    /// Both directions of containment are accepted so that `application/json` matches
    /// `application/json;charset=utf-8` and the like. Without `produces` any content type matches.
    pub fn produces_content_type(&self, content_type: Option<&str>) -> bool {
        match (&self.produces, content_type) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(produces), Some(content_type)) => produces.iter().any(|declared| {
                declared.contains(content_type) || content_type.contains(declared.as_str())
            }),
        }
    }

    /// Response contract for an observed status, an exact key has precedence over a `2XX` range.
    pub fn response_for_status(&self, status: u16) -> Option<&ResponseSpec> {
        let exact = status.to_string();
        let range = format!("{}XX", status / 100);

        self.responses.get(&exact).or_else(|| {
            self.responses
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(&range))
                .map(|(_, spec)| spec)
        })
    }

    /// Schema declared for the given status and content type, `{}` if none.
    pub fn response_schema(&self, status: u16, content_type: Option<&str>) -> Value {
        self.response_for_status(status)
            .map(|spec| spec.schema_for(content_type))
            .unwrap_or_else(|| json!({}))
    }
}
