use std::path::{Path, PathBuf};

use reqwest::Url;
use serde_json::{Value, json};

use crate::document::EndpointKey;

/// Where to find the api specification an assertion checks against.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    /// An in-memory OpenAPI 2 or 3 document.
    Document(Value),
    /// A YAML or JSON file.
    File(PathBuf),
    /// A YAML or JSON document served over http.
    Url(Url),
}

impl SchemaSource {
    /// Wrap a bare JSON Schema into a Swagger 2.0 document describing one endpoint.
    ///
    /// The endpoint produces `application/json` and its `200` response body must conform to the
    /// given schema.
    pub fn from_json_schema<P: AsRef<str>, M: AsRef<str>>(path: P, method: M, schema: Value) -> Self {
        let key = EndpointKey::new(path, method);

        Self::Document(json!({
            "swagger": "2.0",
            "info": { "title": "JSON Schema", "version": "1.0.0" },
            "paths": {
                key.path(): {
                    key.method(): {
                        "produces": ["application/json"],
                        "responses": {
                            "200": {
                                "description": "Response conforming to the JSON Schema",
                                "schema": schema
                            }
                        }
                    }
                }
            }
        }))
    }

    /// Short description of the source, for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Document(_) => "in-memory document".to_string(),
            Self::File(path) => format!("file '{}'", path.display()),
            Self::Url(url) => format!("url '{url}'"),
        }
    }
}

impl From<Value> for SchemaSource {
    fn from(document: Value) -> Self {
        Self::Document(document)
    }
}

impl From<PathBuf> for SchemaSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for SchemaSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<Url> for SchemaSource {
    fn from(url: Url) -> Self {
        Self::Url(url)
    }
}
