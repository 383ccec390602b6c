use std::future::Future;
use std::sync::Arc;

use slog::{Logger, debug, o, warn};

use crate::all_of::flatten_all_of;
use crate::assertion::{AssertionOutcome, Expectation, ResponseAssertion};
use crate::configuration::MatcherConfiguration;
use crate::document::{ApiDocument, EndpointKey, ResolvedEndpoint};
use crate::error::ResponseAssertionError;
use crate::formats::FormatRegistry;
use crate::resolver::{DocumentLoader, FileAndHttpLoader, SchemaResolver};
use crate::response::{BodyFormat, CapturedResponse, normalize_content_type};
use crate::schema_source::SchemaSource;
use crate::validator::SchemaValidator;
use crate::{StdError, StdResult};

/// Checks captured responses against the endpoints of an api specification.
pub struct ResponseMatcher {
    resolver: SchemaResolver,
    validator: SchemaValidator,
    logger: Logger,
}

impl ResponseMatcher {
    /// Creates a [ResponseMatcherBuilder] to configure a `ResponseMatcher`.
    pub fn builder() -> ResponseMatcherBuilder {
        ResponseMatcherBuilder::new()
    }

    /// `ResponseMatcher` with the default configuration and the process-wide formats.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Assert that the response conforms to what the specification declares for the endpoint.
    pub async fn valid_response<R: CapturedResponse>(
        &self,
        schema: &SchemaSource,
        path: &str,
        method: &str,
        response: R,
    ) -> AssertionOutcome {
        let key = EndpointKey::new(path, method);
        self.check_response(schema, &key, response, Expectation::Valid)
            .await
    }

    /// Assert that the response body does not conform to the schema declared for the endpoint.
    ///
    /// The content-type and the status code of the response must still be declared.
    pub async fn invalid_response<R: CapturedResponse>(
        &self,
        schema: &SchemaSource,
        path: &str,
        method: &str,
        response: R,
    ) -> AssertionOutcome {
        let key = EndpointKey::new(path, method);
        self.check_response(schema, &key, response, Expectation::Invalid)
            .await
    }

    /// Resolve a schema source to a dereferenced document, so it can be checked against several
    /// times with [ResponseMatcher::check_body].
    pub async fn resolve(&self, schema: &SchemaSource) -> Result<ApiDocument, ResponseAssertionError> {
        self.resolver
            .resolve(schema)
            .await
            .map_err(|error| ResponseAssertionError::SchemaResolution {
                source_name: schema.describe(),
                error,
            })
    }

    /// Check a response against an endpoint of the specification.
    pub async fn check_response<R: CapturedResponse>(
        &self,
        schema: &SchemaSource,
        key: &EndpointKey,
        response: R,
        expectation: Expectation,
    ) -> AssertionOutcome {
        let content_type = response.content_type();
        let status = response.status();
        debug!(
            self.logger, "Checking response";
            "endpoint" => %key, "status" => status, "content_type" => ?content_type,
            "expectation" => ?expectation
        );

        let document = self.resolve(schema).await?;
        let endpoint = document.endpoint(key)?;
        let assertion = ResponseAssertion::new(&endpoint, expectation)
            .content_type(content_type.as_deref())
            .status(status);

        let body = match response
            .read_body(BodyFormat::for_content_type(content_type.as_deref()))
            .await
        {
            Ok(body) => body,
            // An unreadable body is explained by the content-type or status mismatch.
            Err(error) if !assertion.failed_checks().is_empty() => {
                debug!(
                    self.logger, "Response body not read";
                    "endpoint" => %key, "error" => ?error
                );
                return self.conclude(key, assertion);
            }
            Err(error) => return Err(ResponseAssertionError::BodyRead(error)),
        };

        self.validate_body(&endpoint, status, content_type.as_deref(), &body, assertion)
    }

    /// Check a response that is not available yet, ie: a pending http request.
    pub async fn check_eventual_response<F, R, E>(
        &self,
        schema: &SchemaSource,
        key: &EndpointKey,
        response: F,
        expectation: Expectation,
    ) -> AssertionOutcome
    where
        F: Future<Output = Result<R, E>>,
        R: CapturedResponse,
        E: Into<StdError>,
    {
        let response = response
            .await
            .map_err(|error| ResponseAssertionError::ResponseUnavailable(error.into()))?;

        self.check_response(schema, key, response, expectation)
            .await
    }

    /// Check an already read body against an already resolved specification.
    ///
    /// The content type may carry parameters, they are dropped before the checks.
    pub fn check_body(
        &self,
        document: &ApiDocument,
        key: &EndpointKey,
        status: u16,
        content_type: Option<&str>,
        body: &serde_json::Value,
        expectation: Expectation,
    ) -> AssertionOutcome {
        let content_type = content_type.map(normalize_content_type);
        let content_type = content_type.as_deref();
        let endpoint = document.endpoint(key)?;
        let assertion = ResponseAssertion::new(&endpoint, expectation)
            .content_type(content_type)
            .status(status);

        self.validate_body(&endpoint, status, content_type, body, assertion)
    }

    fn validate_body(
        &self,
        endpoint: &ResolvedEndpoint,
        status: u16,
        content_type: Option<&str>,
        body: &serde_json::Value,
        assertion: ResponseAssertion<'_>,
    ) -> AssertionOutcome {
        let key = endpoint.key();
        let schema = flatten_all_of(&endpoint.response_schema(status, content_type));
        let outcome = self.validator.validate(body, &schema).map_err(|error| {
            ResponseAssertionError::InvalidResponseSchema {
                key: key.clone(),
                error,
            }
        })?;
        debug!(
            self.logger, "Validated response body";
            "endpoint" => %key, "violations" => outcome.violations().len()
        );

        self.conclude(key, assertion.body(outcome))
    }

    fn conclude(&self, key: &EndpointKey, assertion: ResponseAssertion<'_>) -> AssertionOutcome {
        let result = assertion.finish();
        if let Err(ResponseAssertionError::AssertionFailed(failures)) = &result {
            warn!(
                self.logger, "Response does not match the specification";
                "endpoint" => %key, "failed_checks" => ?failures.kinds()
            );
        }

        result
    }
}

impl Default for ResponseMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// A builder of [ResponseMatcher]
pub struct ResponseMatcherBuilder {
    configuration: MatcherConfiguration,
    formats: FormatRegistry,
    loader: Option<Arc<dyn DocumentLoader>>,
    http_client: Option<reqwest::Client>,
    logger: Option<Logger>,
}

impl ResponseMatcherBuilder {
    /// Constructs a new `ResponseMatcherBuilder`, starting with the process-wide formats.
    //
    // This is the same as `ResponseMatcher::builder()`.
    pub fn new() -> Self {
        Self {
            configuration: MatcherConfiguration::default(),
            formats: FormatRegistry::global(),
            loader: None,
            http_client: None,
            logger: None,
        }
    }

    /// Set the [MatcherConfiguration] to use.
    pub fn with_configuration(mut self, configuration: MatcherConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    /// Read the [MatcherConfiguration] from the environment, see
    /// [MatcherConfiguration::from_environment].
    pub fn with_configuration_from_environment(self) -> StdResult<Self> {
        Ok(self.with_configuration(MatcherConfiguration::from_environment()?))
    }

    /// Register a format for this matcher only, it takes precedence over a process-wide format
    /// with the same name.
    pub fn with_format<N, F>(mut self, name: N, predicate: F) -> Self
    where
        N: Into<String>,
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.formats.register(name, predicate);
        self
    }

    /// Add every format of the given registry.
    pub fn with_formats(mut self, formats: &FormatRegistry) -> Self {
        self.formats.extend(formats);
        self
    }

    /// Set the [DocumentLoader] used to read specification files and urls.
    pub fn with_document_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Set the http client used to download specifications, ignored if a document loader is set.
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Set the [Logger] to use.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Returns a [ResponseMatcher] based on the builder configuration
    pub fn build(self) -> ResponseMatcher {
        let logger = self
            .logger
            .unwrap_or_else(|| Logger::root(slog::Discard, o!()));
        let loader = self.loader.unwrap_or_else(|| {
            Arc::new(FileAndHttpLoader::new(self.http_client.unwrap_or_default()))
        });

        ResponseMatcher {
            resolver: SchemaResolver::new(loader, logger.clone()),
            validator: SchemaValidator::from_configuration(&self.configuration, self.formats),
            logger: logger.new(o!("src" => "ResponseMatcher")),
        }
    }
}

impl Default for ResponseMatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
