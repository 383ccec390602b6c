use serde_json::{Value, json};
use strum::Display;

use crate::document::{EndpointKey, ResolvedEndpoint, ResponseSpec};
use crate::error::{AssertionFailure, AssertionFailures, ResponseAssertionError};
use crate::validator::{ValidationOutcome, Violation};

/// Result of an assertion: a report when every check passed, the failed checks otherwise.
pub type AssertionOutcome = Result<AssertionReport, ResponseAssertionError>;

/// What the body is expected to do against its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expectation {
    /// The body must conform to the schema.
    #[default]
    Valid,
    /// The body must not conform to the schema.
    ///
    /// Only the schema check is negated: the content-type and the status code must still be
    /// declared by the specification.
    Invalid,
}

impl Expectation {
    /// `true` for [Expectation::Invalid].
    pub fn is_negated(self) -> bool {
        self == Self::Invalid
    }
}

/// The checks performed by an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CheckKind {
    /// The response content-type is produced by the endpoint.
    #[strum(serialize = "content-type")]
    ContentType,
    /// The response status code is declared by the endpoint.
    #[strum(serialize = "status code")]
    StatusCode,
    /// The response body conforms to the declared schema.
    #[strum(serialize = "schema validation")]
    SchemaValidation,
}

struct Check {
    kind: CheckKind,
    holds: bool,
    message: &'static str,
    /// Only set for checks that flip under a negated expectation.
    negated_message: Option<&'static str>,
    expected: Value,
    actual: Value,
}

impl Check {
    fn content_type(holds: bool, expected: Value, actual: Value) -> Self {
        Self {
            kind: CheckKind::ContentType,
            holds,
            message: "expected response to be of content-type {expected} but got {actual}",
            negated_message: None,
            expected,
            actual,
        }
    }

    fn status_code(holds: bool, expected: Value, actual: Value) -> Self {
        Self {
            kind: CheckKind::StatusCode,
            holds,
            message: "expected schema to have a status code {expected} but got {actual}",
            negated_message: None,
            expected,
            actual,
        }
    }

    fn schema_validation(holds: bool, expected: Value, actual: Value) -> Self {
        Self {
            kind: CheckKind::SchemaValidation,
            holds,
            message: "expected response schema to have no errors but got {actual}",
            negated_message: Some("expected response schema to have errors but got no errors"),
            expected,
            actual,
        }
    }

    fn evaluate(self, expectation: Expectation) -> Option<AssertionFailure> {
        let negated_message = self.negated_message.filter(|_| expectation.is_negated());
        if self.holds != negated_message.is_some() {
            return None;
        }

        let template = negated_message.unwrap_or(self.message);
        let message = template
            .replace("{expected}", &self.expected.to_string())
            .replace("{actual}", &self.actual.to_string());

        Some(AssertionFailure {
            kind: self.kind,
            message,
            expected: self.expected,
            actual: self.actual,
        })
    }
}

/// Checks of a response against a resolved endpoint, composed step by step.
///
/// Every check is evaluated even when a previous one failed, so that all the mismatches of a
/// response are reported at once by [ResponseAssertion::finish].
pub struct ResponseAssertion<'a> {
    endpoint: &'a ResolvedEndpoint,
    expectation: Expectation,
    content_type: Option<String>,
    status: Option<u16>,
    violations: Vec<Violation>,
    failures: Vec<AssertionFailure>,
}

impl<'a> ResponseAssertion<'a> {
    /// Start an assertion on the given endpoint.
    pub fn new(endpoint: &'a ResolvedEndpoint, expectation: Expectation) -> Self {
        Self {
            endpoint,
            expectation,
            content_type: None,
            status: None,
            violations: vec![],
            failures: vec![],
        }
    }

    fn record(&mut self, check: Check) {
        if let Some(failure) = check.evaluate(self.expectation) {
            self.failures.push(failure);
        }
    }

    /// Check the normalized content-type against the `produces` list of the endpoint, if any.
    pub fn content_type(mut self, content_type: Option<&str>) -> Self {
        if let Some(produces) = self.endpoint.produces() {
            let holds = self.endpoint.produces_content_type(content_type);
            self.record(Check::content_type(holds, json!(produces), json!(content_type)));
        }
        self.content_type = content_type.map(str::to_string);

        self
    }

    /// Check that the status code is declared by the endpoint.
    ///
    /// When the matching response declares media types (OpenAPI 3), the content-type given to
    /// [ResponseAssertion::content_type] must be one of them.
    pub fn status(mut self, status: u16) -> Self {
        let response = self.endpoint.response_for_status(status);
        self.record(Check::status_code(
            response.is_some(),
            json!(self.endpoint.status_keys()),
            json!(status),
        ));

        if let (Some(spec @ ResponseSpec::Content(_)), Some(content_type)) =
            (response, self.content_type.as_deref())
        {
            let holds = spec.matching_media_type(content_type).is_some();
            let expected = json!(spec.media_types());
            let actual = json!(content_type);
            self.record(Check::content_type(holds, expected, actual));
        }
        self.status = Some(status);

        self
    }

    /// Check the outcome of the body validation.
    pub fn body(mut self, outcome: ValidationOutcome) -> Self {
        let expected = if self.expectation.is_negated() {
            json!("errors")
        } else {
            json!("no errors")
        };
        let violations = outcome.into_violations();
        self.record(Check::schema_validation(
            violations.is_empty(),
            expected,
            json!(violations),
        ));
        self.violations = violations;

        self
    }

    /// Kinds of the checks that failed so far.
    pub(crate) fn failed_checks(&self) -> Vec<CheckKind> {
        self.failures.iter().map(|failure| failure.kind).collect()
    }

    /// Conclude the assertion.
    pub fn finish(self) -> AssertionOutcome {
        if !self.failures.is_empty() {
            return Err(ResponseAssertionError::AssertionFailed(
                AssertionFailures::new(self.failures),
            ));
        }

        Ok(AssertionReport {
            endpoint: self.endpoint.key().clone(),
            expectation: self.expectation,
            content_type: self.content_type,
            status: self.status,
            violations: self.violations,
        })
    }
}

/// Summary of a successful assertion.
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionReport {
    endpoint: EndpointKey,
    expectation: Expectation,
    content_type: Option<String>,
    status: Option<u16>,
    violations: Vec<Violation>,
}

impl AssertionReport {
    /// The checked endpoint.
    pub fn endpoint(&self) -> &EndpointKey {
        &self.endpoint
    }

    /// The expectation that was asserted.
    pub fn expectation(&self) -> Expectation {
        self.expectation
    }

    /// The normalized content-type of the response.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The status code of the response.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Schema violations of the body, only non empty for a passed [Expectation::Invalid].
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}
