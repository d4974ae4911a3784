//! Argument validation against a tool's input schema
//!
//! Covers the subset of JSON Schema the tools use: `required`, per-property
//! `type` and `enum`. Numeric checks are lenient because agents often send
//! ids as strings and integers as floats.

use serde_json::Value;
use thiserror::Error;

use super::Args;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation error for field '{field}': {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check `args` against `schema`; the first violation wins
    pub fn validate(&self, schema: &Value, args: &Args) -> Result<(), ValidationError> {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for field in required.iter().filter_map(Value::as_str) {
                if !args.contains_key(field) {
                    return Err(ValidationError::new(field, "required field is missing"));
                }
            }
        }

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (field, prop) in properties {
                if let Some(value) = args.get(field) {
                    validate_property(field, value, prop)?;
                }
            }
        }

        Ok(())
    }
}

fn validate_property(field: &str, value: &Value, schema: &Value) -> Result<(), ValidationError> {
    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(value, expected) {
            return Err(ValidationError::new(
                field,
                format!("expected type '{expected}', got '{}'", json_type_name(value)),
            ));
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.iter().any(|candidate| values_equal(candidate, value)) {
            let listed: Vec<String> = allowed.iter().map(display_value).collect();
            return Err(ValidationError::new(
                field,
                format!("value must be one of: {}", listed.join(", ")),
            ));
        }
    }

    Ok(())
}

fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => matches!(value, Value::String(_) | Value::Number(_)),
        "integer" => match value {
            Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
            Value::String(_) => true,
            _ => false,
        },
        "number" => matches!(value, Value::Number(_) | Value::String(_)),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
