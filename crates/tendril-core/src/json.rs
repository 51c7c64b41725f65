//! serde_json interop for the value domain.

use indexmap::IndexMap;

use crate::value::{Map, Value};

/// Error converting external JSON into a [`Value`].
#[derive(Debug)]
pub enum JsonError {
    Parse(serde_json::Error),
    /// serde_json's arbitrary-precision numbers that do not fit an f64.
    NonFiniteNumber,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "JSON parse error: {e}"),
            Self::NonFiniteNumber => write!(f, "number does not fit a finite f64"),
        }
    }
}

impl std::error::Error for JsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::NonFiniteNumber => None,
        }
    }
}

impl Value {
    /// Parse a JSON document into a [`Value`], preserving key order.
    pub fn from_json(json: &str) -> Result<Value, JsonError> {
        let raw: serde_json::Value = serde_json::from_str(json).map_err(JsonError::Parse)?;
        convert(raw)
    }

    /// Serialize to a compact JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Value serialization never fails")
    }
}

fn convert(raw: serde_json::Value) -> Result<Value, JsonError> {
    Ok(match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            Value::Num(n.as_f64().ok_or(JsonError::NonFiniteNumber)?)
        }
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => Value::Seq(
            items
                .into_iter()
                .map(convert)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        serde_json::Value::Object(map) => {
            let mut out: Map = IndexMap::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key, convert(value)?);
            }
            Value::Map(out)
        }
    })
}

impl From<serde_json::Value> for Value {
    fn from(raw: serde_json::Value) -> Self {
        // json! literals never carry non-finite numbers.
        convert(raw).expect("serde_json numbers are finite")
    }
}
