#![deny(missing_docs)]

//! # Output
//!
//! Wraps a rendered tree for serialization, optionally tagging it with the
//! JSON Schema dialect it targets.

use crate::error::{DslError, DslResult};
use serde::Serialize;
use serde_json::{Map, Value};

/// Draft-07 dialect URI.
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// A rendered schema document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document(Value);

impl Document {
    /// Wraps a rendered tree.
    pub fn new(tree: Value) -> Self {
        Self(tree)
    }

    /// Sets `$schema` as the first key of the document.
    ///
    /// Non-object roots are left unchanged.
    pub fn with_dialect(self, dialect: impl Into<String>) -> Self {
        match self.0 {
            Value::Object(map) => {
                let mut tagged = Map::with_capacity(map.len() + 1);
                tagged.insert("$schema".to_string(), Value::String(dialect.into()));
                for (key, value) in map {
                    if key != "$schema" {
                        tagged.insert(key, value);
                    }
                }
                Self(Value::Object(tagged))
            }
            other => Self(other),
        }
    }

    /// The rendered tree.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwraps the rendered tree.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// JSON text, compact or pretty.
    pub fn to_json_string(&self, pretty: bool) -> DslResult<String> {
        let text = if pretty {
            serde_json::to_string_pretty(&self.0)
        } else {
            serde_json::to_string(&self.0)
        };
        text.map_err(|e| DslError::General(format!("JSON serialization failed: {}", e)))
    }

    /// YAML text.
    pub fn to_yaml_string(&self) -> DslResult<String> {
        serde_yaml::to_string(&self.0)
            .map_err(|e| DslError::General(format!("YAML serialization failed: {}", e)))
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Document::new(value)
    }
}
