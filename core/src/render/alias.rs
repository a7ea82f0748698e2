#![deny(missing_docs)]

//! # Alias
//!
//! Renames internal keys to their JSON Schema spelling: a fixed table first
//! (`kind` to `type`, `ref` to `$ref`), then `snake_case` to `lowerCamelCase`.
//! Property names inside `properties`-style maps are never touched.

use super::{descend, RenderContext, RenderPass};
use crate::error::DslResult;
use heck::ToLowerCamelCase;
use serde_json::{Map, Value};

/// Fixed renames applied before casing.
pub const RENAMES: &[(&str, &str)] = &[("kind", "type"), ("ref", "$ref")];

/// The key renaming pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct Alias;

impl RenderPass for Alias {
    fn name(&self) -> &str {
        "alias"
    }

    fn apply(&self, tree: Value, _ctx: &RenderContext<'_>) -> DslResult<Value> {
        visit(tree, "")
    }
}

fn visit(value: Value, path: &str) -> DslResult<Value> {
    match value {
        Value::Object(map) => {
            let map = descend(map, path, visit)?;
            Ok(Value::Object(rename_keys(map)))
        }
        other => Ok(other),
    }
}

fn rename_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (alias_key(&key), value))
        .collect()
}

/// The output spelling of a single key.
///
/// A key equal to its capitalised form (`Foo_bar`, `$ref`) is kept, as is one
/// without underscores. Everything else becomes `lowerCamelCase`.
pub fn alias_key(key: &str) -> String {
    if let Some((_, renamed)) = RENAMES.iter().find(|(from, _)| *from == key) {
        return (*renamed).to_string();
    }
    if is_capitalized(key) || !key.contains('_') {
        key.to_string()
    } else {
        key.to_lower_camel_case()
    }
}

/// First character upper case, every other one lower case.
fn is_capitalized(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    first.to_uppercase().eq([first]) && chars.all(|c| c.to_lowercase().eq([c]))
}
