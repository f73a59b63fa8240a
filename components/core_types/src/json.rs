//! JSON interop for [`Value`].
//!
//! Used by command-line front ends and tests to describe values without an
//! engine at hand.

use crate::{BridgeError, Value};
use indexmap::IndexMap;
use serde_json::{Map, Number};

impl Value {
    /// Builds a value from parsed JSON. Object key order is preserved.
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// let value = Value::from_json(serde_json::json!({"a": [1, null]}));
    /// assert_eq!(value.type_of(), "object");
    /// ```
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect::<IndexMap<_, _>>(),
            ),
        }
    }

    /// Renders this value as JSON.
    ///
    /// `undefined` and non-finite numbers become `null`, integral numbers are
    /// written without a fraction, BigInts become decimal strings and errors
    /// become `{"name", "message"}` objects. [`Value::Unsupported`] fails with
    /// [`BridgeError::Conversion`].
    pub fn to_json(&self) -> Result<serde_json::Value, BridgeError> {
        let json = match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::BigInt(n) => serde_json::Value::String(n.to_string()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::Object(props) => {
                let mut map = Map::with_capacity(props.len());
                for (key, value) in props {
                    map.insert(key.clone(), value.to_json()?);
                }
                serde_json::Value::Object(map)
            }
            Value::Error { name, message } => serde_json::json!({
                "name": name,
                "message": message,
            }),
            Value::Unsupported(kind) => {
                return Err(BridgeError::Conversion(format!(
                    "{:?} has no JSON form",
                    kind
                )))
            }
        };
        Ok(json)
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    // -0.0 keeps its sign as a float.
    let negative_zero = n == 0.0 && n.is_sign_negative();
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 && !negative_zero {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
