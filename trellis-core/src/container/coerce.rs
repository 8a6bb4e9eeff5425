//! Loose scalar conversion for predefined parameter values.
//!
//! Values bound by name (route attributes, query strings, explicit action
//! arguments) usually arrive as strings. Parameters that declare a scalar
//! kind get them converted with the usual weak-typing rules: numeric
//! prefixes, truthy strings, scalars wrapped into one-element arrays.

use super::parameter::ParameterKind;
use crate::{Error, Result, Value};

/// Convert `value` to the declared parameter kind.
///
/// `Mixed` and class-typed parameters receive the value untouched.
pub fn coerce(value: Value, kind: &ParameterKind) -> Result<Value> {
    match kind {
        ParameterKind::Mixed | ParameterKind::Class(_) => Ok(value),
        ParameterKind::Bool => Ok(Value::Bool(to_bool(&value))),
        ParameterKind::Int => Ok(Value::Int(to_int(&value))),
        ParameterKind::Float => Ok(Value::Float(to_float(&value))),
        ParameterKind::Str => to_string(&value).map(Value::Str),
        ParameterKind::Array => Ok(to_array(value)),
    }
}

pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => !(s.is_empty() || s == "0"),
        Value::List(items) => !items.is_empty(),
        Value::Map(map) => !map.is_empty(),
        Value::Object(_) => true,
    }
}

pub fn to_int(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Int(i) => *i,
        Value::Float(f) => float_to_int(*f),
        Value::Str(s) => parse_int_prefix(s),
        Value::List(items) => i64::from(!items.is_empty()),
        Value::Map(map) => i64::from(!map.is_empty()),
        Value::Object(_) => 1,
    }
}

pub fn to_float(value: &Value) -> f64 {
    match value {
        Value::Float(f) => *f,
        Value::Str(s) => parse_float_prefix(s),
        other => to_int(other) as f64,
    }
}

pub fn to_string(value: &Value) -> Result<String> {
    match value {
        Value::Null | Value::Bool(false) => Ok(String::new()),
        Value::Bool(true) => Ok("1".to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(format_float(*f)),
        Value::Str(s) => Ok(s.clone()),
        Value::List(_) | Value::Map(_) => Ok("Array".to_string()),
        Value::Object(_) => Err(Error::Coercion(
            "object could not be converted to string".to_string(),
        )),
    }
}

/// Collections pass through; null and objects give an empty list; any
/// other scalar becomes a one-element list.
pub fn to_array(value: Value) -> Value {
    match value {
        Value::List(_) | Value::Map(_) => value,
        Value::Null | Value::Object(_) => Value::List(Vec::new()),
        scalar => Value::List(vec![scalar]),
    }
}

fn float_to_int(f: f64) -> i64 {
    if f.is_finite() { f.trunc() as i64 } else { 0 }
}

/// Length of the leading numeric part of `s` (after whitespace), and
/// whether it contains a fraction or exponent.
fn numeric_prefix(s: &str) -> (&str, bool) {
    let s = s.trim_start_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c']);
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut fractional = false;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
            fractional = true;
        }
    }

    if digits == 0 {
        return ("", false);
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
            fractional = true;
        }
    }

    (&s[..end], fractional)
}

fn parse_int_prefix(s: &str) -> i64 {
    match numeric_prefix(s) {
        ("", _) => 0,
        (prefix, false) => prefix.parse::<i64>().unwrap_or_else(|_| {
            if prefix.starts_with('-') { i64::MIN } else { i64::MAX }
        }),
        (prefix, true) => float_to_int(prefix.parse::<f64>().unwrap_or_default()),
    }
}

fn parse_float_prefix(s: &str) -> f64 {
    match numeric_prefix(s) {
        ("", _) => 0.0,
        (prefix, _) => prefix.parse::<f64>().unwrap_or_default(),
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "INF".to_string() } else { "-INF".to_string() }
    } else if f == f.trunc() && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}
