use std::fmt;

use anyhow::anyhow;
use jsonschema::{Draft, ValidationOptions};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::StdResult;
use crate::configuration::MatcherConfiguration;
use crate::formats::FormatRegistry;

/// A single schema violation of a validated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// JSON Pointer to the violating value in the instance.
    pub instance_path: String,
    /// JSON Pointer to the schema keyword that triggered the error.
    pub schema_path: String,
    /// Human readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Every violation found by one validation, empty when the value conforms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    violations: Vec<Violation>,
}

impl ValidationOutcome {
    /// `ValidationOutcome` factory
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// `true` if no violation was found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Found violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the found violations.
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

/// JSON Schema validator, compiling a fresh validator for each validated value.
///
/// Schemas are interpreted as draft 4, the dialect OpenAPI 2 and 3.0 schemas derive from.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    formats: FormatRegistry,
    assume_additional: bool,
    validate_formats: bool,
    ignore_unknown_formats: bool,
}

impl SchemaValidator {
    /// `SchemaValidator` factory, using the default configuration.
    pub fn new(formats: FormatRegistry) -> Self {
        Self::from_configuration(&MatcherConfiguration::default(), formats)
    }

    /// `SchemaValidator` factory
    pub fn from_configuration(configuration: &MatcherConfiguration, formats: FormatRegistry) -> Self {
        Self {
            formats,
            assume_additional: configuration.assume_additional,
            validate_formats: configuration.validate_formats,
            ignore_unknown_formats: configuration.ignore_unknown_formats,
        }
    }

    /// Validate a value, collecting every violation instead of stopping at the first one.
    ///
    /// Fails only if the schema itself cannot be compiled.
    pub fn validate(&self, instance: &Value, schema: &Value) -> StdResult<ValidationOutcome> {
        let mut schema = schema.clone();
        if self.assume_additional {
            assume_no_additional_values(&mut schema);
        }

        let validator = self
            .build_options()
            .build(&schema)
            .map_err(|e| anyhow!("Invalid schema: {e}"))?;
        let violations = validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        Ok(ValidationOutcome::new(violations))
    }

    fn build_options(&self) -> ValidationOptions {
        let mut options = jsonschema::options();
        options
            .with_draft(Draft::Draft4)
            .should_validate_formats(self.validate_formats)
            .should_ignore_unknown_formats(self.ignore_unknown_formats);

        for (name, predicate) in self.formats.iter() {
            let predicate = predicate.clone();
            options.with_format(name, move |value: &str| predicate(value));
        }

        options
    }
}

/// Close objects declaring `properties` and tuples declaring `items` to undeclared values,
/// unless the schema says otherwise.
fn assume_no_additional_values(schema: &mut Value) {
    let Value::Object(schema) = schema else {
        return;
    };

    if (schema.contains_key("properties") || schema.contains_key("patternProperties"))
        && !schema.contains_key("additionalProperties")
    {
        schema.insert("additionalProperties".to_string(), Value::Bool(false));
    }
    if schema.get("items").is_some_and(Value::is_array) && !schema.contains_key("additionalItems") {
        schema.insert("additionalItems".to_string(), Value::Bool(false));
    }

    for (keyword, value) in schema.iter_mut() {
        match (keyword.as_str(), value) {
            ("properties" | "patternProperties" | "definitions", Value::Object(schemas)) => {
                close_each(schemas)
            }
            ("dependencies", Value::Object(dependencies)) => close_each(dependencies),
            ("allOf" | "anyOf" | "oneOf" | "items", Value::Array(schemas)) => {
                schemas.iter_mut().for_each(assume_no_additional_values)
            }
            ("items" | "additionalItems" | "additionalProperties" | "not", value) => {
                assume_no_additional_values(value)
            }
            _ => {}
        }
    }
}

fn close_each(schemas: &mut Map<String, Value>) {
    schemas.values_mut().for_each(assume_no_additional_values);
}
