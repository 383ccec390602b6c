use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::StdError;
use crate::assertion::CheckKind;
use crate::document::EndpointKey;

/// Error raised while asserting that a response conforms to a specification.
#[derive(Error, Debug)]
pub enum ResponseAssertionError {
    /// The schema source could not be read, parsed or dereferenced.
    #[error("Could not resolve the api specification from {source_name}")]
    SchemaResolution {
        /// Description of the schema source.
        source_name: String,
        /// Underlying cause.
        #[source]
        error: StdError,
    },

    /// The endpoint is not described by the specification.
    #[error("Unknown endpoint {key}: {reason}")]
    UnknownEndpoint {
        /// The endpoint that was looked up.
        key: EndpointKey,
        /// Why the lookup failed.
        reason: String,
    },

    /// The response under test could not be obtained.
    #[error("The response under test is not available")]
    ResponseUnavailable(#[source] StdError),

    /// The response body could not be read or parsed.
    #[error("Could not read the response body")]
    BodyRead(#[source] StdError),

    /// The schema declared for the response could not be compiled by the validator.
    #[error("Invalid response schema for {key}")]
    InvalidResponseSchema {
        /// The endpoint declaring the schema.
        key: EndpointKey,
        /// Underlying cause.
        #[source]
        error: StdError,
    },

    /// At least one check of the assertion failed.
    #[error("{0}")]
    AssertionFailed(AssertionFailures),
}

impl ResponseAssertionError {
    /// Returns the failed checks if this error is an assertion failure.
    pub fn failures(&self) -> Option<&AssertionFailures> {
        match self {
            Self::AssertionFailed(failures) => Some(failures),
            _ => None,
        }
    }
}

/// A single failed check, with the values involved for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionFailure {
    /// Which check failed.
    pub kind: CheckKind,
    /// Human readable message.
    pub message: String,
    /// What the specification declares.
    pub expected: Value,
    /// What the response provided.
    pub actual: Value,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n    expected: {}\n    actual: {}",
            self.message, self.expected, self.actual
        )
    }
}

/// Non empty list of failed checks of one assertion.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionFailures(Vec<AssertionFailure>);

impl AssertionFailures {
    pub(crate) fn new(failures: Vec<AssertionFailure>) -> Self {
        Self(failures)
    }

    /// Kinds of the failed checks, in evaluation order.
    pub fn kinds(&self) -> Vec<CheckKind> {
        self.0.iter().map(|failure| failure.kind).collect()
    }

    /// Returns `true` if a check of the given kind failed.
    pub fn contains(&self, kind: CheckKind) -> bool {
        self.0.iter().any(|failure| failure.kind == kind)
    }

    /// Iterate over the failed checks.
    pub fn iter(&self) -> impl Iterator<Item = &AssertionFailure> {
        self.0.iter()
    }

    /// Number of failed checks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for failures built by an assertion.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AssertionFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "- {failure}")?;
        }
        Ok(())
    }
}
