//! Best-effort normalization of a finished job's payload.
//!
//! The service sometimes wraps the artifact in a JSON document serialized as
//! a string. [`Normalizer`] unwraps exactly one such level and otherwise hands
//! the payload back untouched; it never fails.

use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Normalizer {
    field: String,
}

impl Normalizer {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn normalize(&self, raw: Value) -> Value {
        let decoded = match &raw {
            Value::String(text) => serde_json::from_str::<Value>(text).ok(),
            _ => None,
        };

        match decoded {
            Some(Value::Object(mut map)) => match map.remove(&self.field) {
                Some(inner) => {
                    debug!(field = %self.field, "unwrapped string-encoded payload");
                    inner
                }
                None => raw,
            },
            _ => raw,
        }
    }
}
