use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Entity payload written through to the backing store.
///
/// Supports all JSON-compatible types plus binary data. An entity is usually
/// a [`Value::Map`] of property names to values, but the write path is
/// agnostic to the shape as long as a bulk write is homogeneous (see
/// [`ValueKind`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// JSON null.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON integer (signed 64-bit).
    Int(i64),
    /// JSON floating-point (64-bit IEEE 754).
    Float(f64),
    /// JSON string (UTF-8).
    String(String),
    /// Binary data (not directly representable in JSON).
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    /// JSON array (ordered sequence of values).
    Array(Vec<Value>),
    /// Property map. Uses `BTreeMap` for deterministic iteration order.
    Map(BTreeMap<String, Value>),
}

/// Discriminant of a [`Value`], used to check that a bulk write is homogeneous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Bytes,
    Array,
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Array => "array",
            Self::Map => "map",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Array(_) => ValueKind::Array,
            Self::Map(_) => ValueKind::Map,
        }
    }

    /// Rough serialized size in bytes. Stores use it to enforce entity size limits.
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        match self {
            Self::Null | Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 8,
            Self::String(s) => s.len(),
            Self::Bytes(b) => b.len(),
            Self::Array(items) => items.iter().map(Value::estimated_size).sum(),
            Self::Map(props) => props
                .iter()
                .map(|(name, value)| name.len() + value.estimated_size())
                .sum(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(props) => {
                Self::Map(props.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
