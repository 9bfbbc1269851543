//! Conversion of caller payloads into backend document sources.
//!
//! Object payloads travel to the backend as structured maps. Every other
//! payload shape is carried as its JSON text, which the backend parses into
//! the same logical document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Source of one document write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocumentSource {
    /// Structured field map.
    Structured(Map<String, Value>),

    /// Backend-native serialized JSON text.
    Json(String),
}

impl DocumentSource {
    /// Serialize a caller payload.
    pub fn from_payload<T: Serialize + ?Sized>(payload: &T) -> Result<Self> {
        Ok(Self::from_value(serde_json::to_value(payload)?))
    }

    /// Wrap an already-serialized value.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => DocumentSource::Structured(map),
            other => DocumentSource::Json(other.to_string()),
        }
    }

    /// Parse the source back into a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        match self {
            DocumentSource::Structured(map) => Ok(Value::Object(map.clone())),
            DocumentSource::Json(text) => Ok(serde_json::from_str(text)?),
        }
    }
}
