use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use warp::http::Response;
use warp::hyper::body::Bytes;

use crate::StdResult;

/// Keep only the media type of a content-type header, dropping parameters such as `charset`.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_string()
}

/// How a response body should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// As a string, for `text/*` content types.
    Text,
    /// As a parsed JSON value.
    Json,
}

impl BodyFormat {
    /// Pick the body format for a normalized content type.
    pub fn for_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(content_type) if content_type.starts_with("text/") => Self::Text,
            _ => Self::Json,
        }
    }

    /// Turn raw body bytes into a value, an empty body is read as `null`.
    pub fn parse(self, body: &[u8]) -> StdResult<Value> {
        if body.is_empty() {
            return Ok(Value::Null);
        }

        match self {
            Self::Text => String::from_utf8(body.to_vec())
                .map(Value::String)
                .with_context(|| "Response body is not a valid utf-8 text"),
            Self::Json => serde_json::from_slice(body).with_context(|| {
                format!(
                    "Response body is not a valid json: '{}'",
                    String::from_utf8_lossy(body)
                )
            }),
        }
    }
}

/// An HTTP response captured by a test.
#[async_trait]
pub trait CapturedResponse: Send + Sized {
    /// Status code of the response.
    fn status(&self) -> u16;

    /// Value of a header, looked up case insensitively.
    fn header(&self, name: &str) -> Option<String>;

    /// Consume the response to read its body.
    async fn read_body(self, format: BodyFormat) -> StdResult<Value>;

    /// Normalized content type of the response.
    fn content_type(&self) -> Option<String> {
        self.header("content-type")
            .map(|content_type| normalize_content_type(&content_type))
    }
}

/// An in-memory response whose body is already a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Value,
}

impl RawResponse {
    /// `RawResponse` factory, without headers and with a `null` body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Value::Null,
        }
    }

    /// A JSON response: the body is set and the content-type is `application/json`, except for
    /// a `204` which has neither.
    pub fn json(status: u16, body: Value) -> Self {
        if status == 204 {
            return Self::new(status);
        }

        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    /// Set a header, names are case insensitive.
    pub fn with_header<N: AsRef<str>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers
            .insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// The body of the response.
    pub fn body(&self) -> &Value {
        &self.body
    }
}

#[async_trait]
impl CapturedResponse for RawResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_lowercase()).cloned()
    }

    async fn read_body(self, _format: BodyFormat) -> StdResult<Value> {
        Ok(self.body)
    }
}

#[async_trait]
impl CapturedResponse for Response<Bytes> {
    fn status(&self) -> u16 {
        Response::status(self).as_u16()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    async fn read_body(self, format: BodyFormat) -> StdResult<Value> {
        format.parse(self.body())
    }
}

#[async_trait]
impl CapturedResponse for reqwest::Response {
    fn status(&self) -> u16 {
        reqwest::Response::status(self).as_u16()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    async fn read_body(self, format: BodyFormat) -> StdResult<Value> {
        let url = self.url().clone();
        let body = self
            .bytes()
            .await
            .with_context(|| format!("Could not download the response body from '{url}'"))?;

        format.parse(&body)
    }
}
