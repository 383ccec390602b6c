use anyhow::Context;
use config::ConfigBuilder;
use config::builder::DefaultState;
use serde::Deserialize;

use crate::StdResult;

/// Prefix of the environment variables read by [MatcherConfiguration::from_environment].
pub const ENVIRONMENT_PREFIX: &str = "APISPEC_ASSERT";

/// Tuning of the response validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatcherConfiguration {
    /// Treat objects declaring `properties` as closed to undeclared properties, and tuples
    /// declaring `items` as closed to extra items, unless the schema says otherwise.
    pub assume_additional: bool,

    /// Validate the `format` keyword of string values.
    pub validate_formats: bool,

    /// Accept values whose `format` is neither builtin nor registered.
    pub ignore_unknown_formats: bool,
}

impl Default for MatcherConfiguration {
    fn default() -> Self {
        Self {
            assume_additional: true,
            validate_formats: true,
            ignore_unknown_formats: true,
        }
    }
}

impl MatcherConfiguration {
    /// Read the configuration from `APISPEC_ASSERT_*` environment variables.
    ///
    /// ie: `APISPEC_ASSERT_ASSUME_ADDITIONAL=false`, unset values keep their default.
    pub fn from_environment() -> StdResult<Self> {
        Self::from_config_builder(
            config::Config::builder().add_source(
                config::Environment::with_prefix(ENVIRONMENT_PREFIX).try_parsing(true),
            ),
        )
    }

    /// Read the configuration from the sources of the given builder.
    pub fn from_config_builder(builder: ConfigBuilder<DefaultState>) -> StdResult<Self> {
        builder
            .build()
            .with_context(|| "Could not build the matcher configuration")?
            .try_deserialize()
            .with_context(|| "Invalid matcher configuration")
    }
}
