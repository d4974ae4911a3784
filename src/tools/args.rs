//! Argument coercion helpers shared by the tool handlers
//!
//! JSON decoding does not preserve whether a number was written as an
//! integer or a float, and agents frequently quote ids. These helpers accept
//! integers, integral floats and decimal strings interchangeably.

use serde_json::{Map, Value};
use thiserror::Error;

use super::Args;
use super::validator::json_type_name;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("missing required field: {0}")]
    Missing(String),

    #[error("field {field} must be {expected}, got {got}")]
    WrongType {
        field: String,
        expected: &'static str,
        got: String,
    },
}

impl ArgError {
    fn wrong_type(field: &str, expected: &'static str, value: &Value) -> Self {
        let got = match value {
            Value::String(s) => format!("string '{s}'"),
            other => json_type_name(other).to_string(),
        };
        ArgError::WrongType {
            field: field.to_string(),
            expected,
            got,
        }
    }
}

/// Coerce a JSON value to an integer
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a JSON value to a string. Integral floats print without a decimal point.
pub fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if n.is_f64() {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            } else {
                Some(n.to_string())
            }
        }
        _ => None,
    }
}

pub fn get_int(args: &Args, key: &str) -> Result<i64, ArgError> {
    let value = args
        .get(key)
        .ok_or_else(|| ArgError::Missing(key.to_string()))?;
    to_int(value).ok_or_else(|| ArgError::wrong_type(key, "an integer", value))
}

pub fn get_string(args: &Args, key: &str) -> Result<String, ArgError> {
    let value = args
        .get(key)
        .ok_or_else(|| ArgError::Missing(key.to_string()))?;
    to_string(value).ok_or_else(|| ArgError::wrong_type(key, "a string", value))
}

/// Optional string; absent, empty or non-scalar values yield `None`
pub fn get_optional_string(args: &Args, key: &str) -> Option<String> {
    args.get(key)
        .and_then(to_string)
        .filter(|s| !s.is_empty())
}

pub fn get_optional_int(args: &Args, key: &str, default: i64) -> i64 {
    args.get(key).and_then(to_int).unwrap_or(default)
}

pub fn get_bool_or(args: &Args, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

pub fn get_array<'a>(args: &'a Args, key: &str) -> Result<&'a Vec<Value>, ArgError> {
    let value = args
        .get(key)
        .ok_or_else(|| ArgError::Missing(key.to_string()))?;
    value
        .as_array()
        .ok_or_else(|| ArgError::wrong_type(key, "an array", value))
}

pub fn get_object<'a>(args: &'a Args, key: &str) -> Result<&'a Map<String, Value>, ArgError> {
    let value = args
        .get(key)
        .ok_or_else(|| ArgError::Missing(key.to_string()))?;
    value
        .as_object()
        .ok_or_else(|| ArgError::wrong_type(key, "an object", value))
}

/// Copy the listed optional string fields that are present and non-empty
pub fn collect_strings(args: &Args, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| get_optional_string(args, key).map(|v| (key.to_string(), Value::String(v))))
        .collect()
}
