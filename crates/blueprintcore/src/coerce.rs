//! Conversions between pin data types
//!
//! Every conversion yields a value of the requested type; failures fall back
//! to the type's default instead of propagating a sentinel.

use crate::{DataType, Value};

/// Convert `value` so that it inhabits `target`.
pub fn coerce(value: &Value, target: DataType) -> Value {
    match target {
        DataType::String => Value::String(to_string(value)),
        DataType::Number => Value::Number(to_number(value)),
        DataType::Boolean => Value::Bool(to_boolean(value)),
        DataType::Object | DataType::Array => to_structure(value, target),
    }
}

fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_infinite() => {
            let text = if n.is_sign_positive() { "Infinity" } else { "-Infinity" };
            text.to_string()
        }
        other => other.to_string(),
    }
}

fn to_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => *n,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::String(s) => parse_number(s.trim()),
        Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    };
    if n.is_nan() {
        0.0
    } else {
        n
    }
}

/// Decimal text to a number; blank or malformed text is 0
///
/// Only the exact spelling `Infinity`, optionally signed, yields an infinite
/// number. Rust's float parser also takes `inf` and `nan` in any case, which
/// are rejected here.
fn parse_number(text: &str) -> f64 {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits == "Infinity" {
        return sign * f64::INFINITY;
    }
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return 0.0;
    }
    digits.parse::<f64>().map_or(0.0, |n| sign * n)
}

fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn to_structure(value: &Value, target: DataType) -> Value {
    let candidate = match value {
        Value::String(text) => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(parsed) => Value::from(parsed),
            Err(_) => return target.default_value(),
        },
        other => other.clone(),
    };

    if candidate.data_type() == Some(target) {
        candidate
    } else {
        target.default_value()
    }
}
