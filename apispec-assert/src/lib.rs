#![warn(missing_docs)]

//! Assertions checking that captured HTTP responses conform to an API specification.
//!
//! Provide:
//! - A [ResponseMatcher] that resolves the contract of an endpoint from an OpenAPI 2, OpenAPI 3
//!   or plain JSON Schema [SchemaSource] and checks a [CapturedResponse] against it (content-type,
//!   status code and body shape).
//! - A [SchemaResolver] that loads and dereferences specification documents from memory, files
//!   or urls.
//! - A [FormatRegistry] to teach the validator custom string formats, with a process-wide
//!   registry fed by [add_validation_format].
//! - The [AndNotifyWhen] adapter to bridge an assertion outcome to a completion callback.
//!
//! ```no_run
//! use apispec_assert::{RawResponse, ResponseMatcher, SchemaSource};
//! use serde_json::json;
//!
//! # async fn run() -> apispec_assert::StdResult<()> {
//! let schema = SchemaSource::from_json_schema(
//!     "/",
//!     "get",
//!     json!({ "type": "object", "properties": { "foo": { "type": "boolean" } } }),
//! );
//! let response = RawResponse::json(200, json!({ "foo": true }));
//!
//! ResponseMatcher::new()
//!     .valid_response(&schema, "/", "get", response)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod all_of;
mod assertion;
mod configuration;
mod document;
mod error;
mod formats;
mod matcher;
mod notify;
mod resolver;
mod response;
mod schema_source;
mod validator;

#[cfg(test)]
pub(crate) mod test_utils;

pub use all_of::flatten_all_of;
pub use assertion::{
    AssertionOutcome, AssertionReport, CheckKind, Expectation, ResponseAssertion,
};
pub use configuration::{ENVIRONMENT_PREFIX, MatcherConfiguration};
pub use document::{ApiDocument, EndpointKey, ResolvedEndpoint, ResponseSpec, SpecVersion};
pub use error::{AssertionFailure, AssertionFailures, ResponseAssertionError};
pub use formats::{FormatPredicate, FormatRegistry, add_validation_format};
pub use matcher::{ResponseMatcher, ResponseMatcherBuilder};
pub use notify::{AndNotifyWhen, notify_when};
pub use resolver::{
    DocumentLoader, DocumentLocation, FileAndHttpLoader, SchemaResolver, parse_document,
};
pub use response::{BodyFormat, CapturedResponse, RawResponse, normalize_content_type};
pub use schema_source::SchemaSource;
pub use validator::{SchemaValidator, ValidationOutcome, Violation};

/// Generic error type
pub type StdError = anyhow::Error;

/// Generic result type
pub type StdResult<T> = anyhow::Result<T, StdError>;
