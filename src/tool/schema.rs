//! Tool argument schemas.
//!
//! Argument types derive [`JsonSchema`]; the generated schema is advertised to
//! the model and used to validate proposed calls before a tool runs.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use super::ToolError;

/// One declared input field of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    /// JSON type name, e.g. `string`
    pub kind: String,
    pub description: String,
    pub required: bool,
}

/// Generates the parameter schema of an argument struct.
pub fn schema_for<T: JsonSchema>() -> Value {
    let root = schemars::schema_for!(T);
    let mut value = serde_json::to_value(root).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.remove("description");
    }
    value
}

/// Deserializes validated arguments into their typed form.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Lists the declared fields of an object schema in declaration order.
pub fn fields(schema: &Value) -> Vec<SchemaField> {
    let required = required_names(schema);
    properties(schema)
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| SchemaField {
                    name: name.clone(),
                    kind: type_names(prop).join(" | "),
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    required: required.contains(&name.as_str()),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Checks a proposed argument payload against an object schema.
///
/// The payload must be an object, required fields must be present and
/// non-null, and declared fields must carry their declared JSON type.
/// Undeclared fields are ignored.
pub fn validate(schema: &Value, args: &Value) -> Result<(), ToolError> {
    let obj = args.as_object().ok_or_else(|| {
        ToolError::InvalidArguments(format!(
            "expected a JSON object of arguments, got {}",
            json_type(args)
        ))
    })?;

    let missing: Vec<&str> = required_names(schema)
        .into_iter()
        .filter(|name| obj.get(*name).is_none_or(Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(ToolError::InvalidArguments(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )));
    }

    if let Some(props) = properties(schema) {
        for (name, value) in obj {
            let Some(prop) = props.get(name) else {
                continue;
            };
            let expected = type_names(prop);
            if !expected.is_empty() && !expected.iter().any(|t| matches_type(t, value)) {
                return Err(ToolError::InvalidArguments(format!(
                    "field `{}` must be of type {}, got {}",
                    name,
                    expected.join(" | "),
                    json_type(value)
                )));
            }
        }
    }

    Ok(())
}

fn properties(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

fn required_names(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn type_names(prop: &Value) -> Vec<&str> {
    match prop.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct SampleArgs {
        /// Where the text goes
        folder_name: String,
        /// How many copies
        copies: Option<u32>,
    }

    #[test]
    fn schema_lists_fields_in_order() {
        let schema = schema_for::<SampleArgs>();
        let fields = fields(&schema);

        assert!(schema.get("$schema").is_none());
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "folder_name");
        assert_eq!(fields[0].kind, "string");
        assert_eq!(fields[0].description, "Where the text goes");
        assert!(fields[0].required);
        assert_eq!(fields[1].name, "copies");
        assert!(!fields[1].required);
    }

    #[test]
    fn validate_accepts_well_formed_payload() {
        let schema = schema_for::<SampleArgs>();
        assert!(validate(&schema, &json!({"folder_name": "Reports", "extra": 1})).is_ok());
        assert!(validate(&schema, &json!({"folder_name": "Reports", "copies": null})).is_ok());
    }

    #[test]
    fn validate_reports_missing_and_mistyped_fields() {
        let schema = schema_for::<SampleArgs>();

        let missing = validate(&schema, &json!({})).unwrap_err();
        assert!(missing.to_string().contains("folder_name"));

        let mistyped = validate(&schema, &json!({"folder_name": 3})).unwrap_err();
        assert!(mistyped.to_string().contains("must be of type string"));

        let not_object = validate(&schema, &json!("Reports")).unwrap_err();
        assert!(not_object.to_string().contains("got string"));
    }
}
