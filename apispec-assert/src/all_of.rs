use serde_json::{Map, Value};

/// Merge every `allOf` combinator of a schema into its parent schema.
///
/// Branches are merged from first to last: objects are merged key by key, arrays are united
/// and any other value of a later branch replaces the previous one. The keywords written on the
/// parent itself take precedence over the merged branches. Nested schemas are flattened too.
pub fn flatten_all_of(schema: &Value) -> Value {
    match schema {
        Value::Object(object) => Value::Object(flatten_object(object)),
        other => other.clone(),
    }
}

fn flatten_object(object: &Map<String, Value>) -> Map<String, Value> {
    let mut flattened: Map<String, Value> = object
        .iter()
        .filter(|(key, _)| key.as_str() != "allOf")
        .map(|(key, value)| (key.clone(), flatten_keyword(key, value)))
        .collect();

    if let Some(Value::Array(branches)) = object.get("allOf") {
        let mut merged = Value::Object(Map::new());
        for branch in branches {
            merge(&mut merged, &flatten_all_of(branch));
        }
        fill_defaults(&mut flattened, merged);
    }

    flattened
}

/// Only the values of keywords holding subschemas are flattened, so that property names and
/// payloads such as `enum` or `example` are kept verbatim.
fn flatten_keyword(keyword: &str, value: &Value) -> Value {
    match (keyword, value) {
        ("properties" | "patternProperties" | "definitions" | "dependencies", Value::Object(schemas)) => {
            Value::Object(
                schemas
                    .iter()
                    .map(|(name, schema)| (name.clone(), flatten_all_of(schema)))
                    .collect(),
            )
        }
        ("items" | "anyOf" | "oneOf", Value::Array(schemas)) => {
            Value::Array(schemas.iter().map(flatten_all_of).collect())
        }
        ("items" | "additionalItems" | "additionalProperties" | "not", schema) => {
            flatten_all_of(schema)
        }
        (_, other) => other.clone(),
    }
}

fn merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => unite(target, source),
        (target, source) => *target = source.clone(),
    }
}

fn fill_defaults(target: &mut Map<String, Value>, defaults: Value) {
    let Value::Object(defaults) = defaults else {
        return;
    };

    for (key, default) in defaults {
        let Some(existing) = target.get_mut(&key) else {
            target.insert(key, default);
            continue;
        };

        match (existing, default) {
            (Value::Object(existing), default @ Value::Object(_)) => {
                fill_defaults(existing, default)
            }
            (Value::Array(existing), Value::Array(default)) => unite(existing, &default),
            _ => {}
        }
    }
}

fn unite(target: &mut Vec<Value>, source: &[Value]) {
    for value in source {
        if !target.contains(value) {
            target.push(value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn schema_without_all_of_is_unchanged() {
        let schema = json!({
            "type": "object",
            "properties": { "id": { "type": "string" } },
            "required": ["id"]
        });

        assert_eq!(schema, flatten_all_of(&schema));
    }

    #[test]
    fn merge_properties_and_unite_required_fields() {
        let schema = json!({
            "allOf": [
                {
                    "type": "object",
                    "properties": { "id": { "type": "string" } },
                    "required": ["id"]
                },
                {
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                    "required": ["id", "name"]
                }
            ]
        });

        assert_eq!(
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "name": { "type": "string" }
                },
                "required": ["id", "name"]
            }),
            flatten_all_of(&schema)
        );
    }

    #[test]
    fn later_branches_override_scalar_keywords() {
        let schema = json!({
            "allOf": [
                { "type": "string", "maxLength": 10 },
                { "maxLength": 5 }
            ]
        });

        assert_eq!(
            json!({ "type": "string", "maxLength": 5 }),
            flatten_all_of(&schema)
        );
    }

    #[test]
    fn parent_keywords_take_precedence_over_branches() {
        let schema = json!({
            "description": "parent",
            "properties": { "id": { "type": "integer" } },
            "allOf": [
                {
                    "description": "branch",
                    "properties": {
                        "id": { "type": "string", "minimum": 1 },
                        "name": { "type": "string" }
                    }
                }
            ]
        });

        assert_eq!(
            json!({
                "description": "parent",
                "properties": {
                    "id": { "type": "integer", "minimum": 1 },
                    "name": { "type": "string" }
                }
            }),
            flatten_all_of(&schema)
        );
    }

    #[test]
    fn keep_properties_and_payloads_named_all_of() {
        let schema = json!({
            "type": "object",
            "properties": { "allOf": { "type": "string" } },
            "required": ["allOf"],
            "enum": [{ "allOf": "x" }],
            "example": { "allOf": [{ "type": "string" }] }
        });

        assert_eq!(schema, flatten_all_of(&schema));
    }

    #[test]
    fn flatten_schemas_nested_in_combinators() {
        let schema = json!({
            "anyOf": [{ "allOf": [{ "type": "string" }, { "minLength": 1 }] }],
            "not": { "allOf": [{ "type": "integer" }] }
        });

        assert_eq!(
            json!({
                "anyOf": [{ "type": "string", "minLength": 1 }],
                "not": { "type": "integer" }
            }),
            flatten_all_of(&schema)
        );
    }

    #[test]
    fn flatten_nested_schemas() {
        let schema = json!({
            "type": "array",
            "items": {
                "allOf": [
                    { "properties": { "id": { "type": "string" } } },
                    {
                        "properties": {
                            "tags": {
                                "type": "array",
                                "items": {
                                    "allOf": [
                                        { "type": "string" },
                                        { "minLength": 1 }
                                    ]
                                }
                            }
                        }
                    }
                ]
            }
        });

        assert_eq!(
            json!({
                "type": "array",
                "items": {
                    "properties": {
                        "id": { "type": "string" },
                        "tags": {
                            "type": "array",
                            "items": { "type": "string", "minLength": 1 }
                        }
                    }
                }
            }),
            flatten_all_of(&schema)
        );
    }
}
