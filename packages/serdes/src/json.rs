//! Conversions between Value and serde_json / serde types.
//!
//! These are the plain-data edges of the wire format: they carry JSON
//! numbers exactly and never look at rich scalars. Rich values must go
//! through [`crate::SerDes`] first.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use docwire_core::{BigInt, Path, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error;
use crate::numbers::{decimal_text, float_decimal, same_decimal};

/// Convert a Rust type to a Value via serde.
pub fn to_value<T: Serialize>(data: &T) -> Result<Value, Error> {
    let json = serde_json::to_value(data)?;
    Ok(json_to_value(json))
}

/// Convert a plain Value to a Rust type via serde.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    let json = value_to_json(value)?;
    Ok(serde_json::from_value(json)?)
}

/// Convert a plain Value to serde_json::Value.
///
/// # Errors
///
/// Returns [`Error::UnsupportedValue`] for anything [`Value::is_plain`]
/// rejects, with the path of the offending node.
pub fn value_to_json(value: &Value) -> Result<serde_json::Value, Error> {
    let mut path = Path::root();
    to_json(value, &mut path)
}

fn to_json(value: &Value, path: &mut Path) -> Result<serde_json::Value, Error> {
    let json = match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => match serde_json::Number::from_f64(*f) {
            Some(n) => serde_json::Value::Number(n),
            None => return Err(unsupported(value, path, "non-finite numbers have no JSON form")),
        },
        Value::BigInt(b) => exact_number(&b.to_string(), value, path)?,
        Value::Decimal(d) => exact_number(&decimal_text(d), value, path)?,
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push(i);
                out.push(to_json(item, path)?);
                path.pop();
            }
            serde_json::Value::Array(out)
        }
        Value::Map(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                path.push(k.as_str());
                out.insert(k.clone(), to_json(v, path)?);
                path.pop();
            }
            serde_json::Value::Object(out)
        }
        other => {
            return Err(unsupported(
                other,
                path,
                "rich values must be serialized before conversion to JSON",
            ))
        }
    };
    Ok(json)
}

fn exact_number(text: &str, value: &Value, path: &Path) -> Result<serde_json::Value, Error> {
    serde_json::from_str::<serde_json::Number>(text)
        .map(serde_json::Value::Number)
        .map_err(|_| unsupported(value, path, "number text is not valid JSON"))
}

fn unsupported(value: &Value, path: &Path, message: &str) -> Error {
    Error::UnsupportedValue {
        path: path.clone(),
        kind: value.kind(),
        message: message.to_string(),
    }
}

/// Convert serde_json::Value to our Value.
///
/// Numbers become `Integer` when they fit `i64`, `Float` when `f64` holds
/// them exactly, and `BigInt` or `Decimal` otherwise.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => number_to_value(&n),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}

fn number_to_value(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::Integer(i);
    }
    let text = n.to_string();
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(b) = BigInt::from_str(&text) {
            return Value::BigInt(b);
        }
    }
    match BigDecimal::from_str(&text) {
        Ok(d) => match n.as_f64() {
            Some(f) if float_decimal(f).is_some_and(|back| same_decimal(&back, &d)) => {
                Value::Float(f)
            }
            _ => Value::Decimal(d),
        },
        // Fallback for number text neither parser accepts
        Err(_) => Value::String(text),
    }
}
