#![deny(missing_docs)]

//! # Render Pipeline
//!
//! Rendering converts a [`Node`] to its plain `serde_json::Value` form and folds
//! the configured pass chain over it, front to back. A pass error aborts the
//! whole render; partial trees are never returned.

use crate::config::SchemaConfig;
use crate::error::DslResult;
use crate::kind::KindRegistry;
use crate::node::Node;
use crate::scope::Scope;
use serde_json::{Map, Value};
use std::fmt;

/// Sugar resolution pass.
pub mod desugar;

/// Exclusive-choice boxing pass.
pub mod multiplexer;

/// Key renaming and casing pass.
pub mod alias;

/// Bookkeeping and blank-value removal pass.
pub mod filter;

pub use alias::Alias;
pub use desugar::Desugar;
pub use filter::Filter;
pub use multiplexer::Multiplexer;

/// Keys whose values are maps from property names (or patterns) to schemas.
const SCHEMA_MAP_KEYS: &[&str] = &[
    "properties",
    "pattern_properties",
    "patternProperties",
    "definitions",
];

/// Keys holding caller data rather than schemas.
const LITERAL_KEYS: &[&str] = &["default", "enum", "const", "examples"];

/// What a pass sees besides the tree.
pub struct RenderContext<'a> {
    /// Registry of the session, for kind defaults.
    pub kinds: &'a KindRegistry,
    /// Enclosing scope of the render call, if any.
    pub scope: Option<&'a dyn Scope>,
}

/// One tree rewrite in the render chain.
pub trait RenderPass: fmt::Debug + Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Rewrites the whole plain tree.
    fn apply(&self, tree: Value, ctx: &RenderContext<'_>) -> DslResult<Value>;
}

/// Renders `node` with `config`'s pass chain.
pub fn render(node: &Node, config: &SchemaConfig, scope: Option<&dyn Scope>) -> DslResult<Value> {
    let ctx = RenderContext {
        kinds: config.kinds(),
        scope,
    };
    config
        .passes()
        .iter()
        .try_fold(node.to_plain(), |tree, pass| {
            tracing::debug!(pass = pass.name(), "applying render pass");
            pass.apply(tree, &ctx)
        })
}

/// Whether `key` holds a name-keyed map of schemas.
pub(crate) fn is_schema_map_key(key: &str) -> bool {
    SCHEMA_MAP_KEYS.contains(&key)
}

/// Joins a key onto a `/`-separated path.
pub(crate) fn join(path: &str, key: &str) -> String {
    format!("{}/{}", path, key)
}

/// Rebuilds `map`, passing every nested schema through `visit`.
///
/// Nested schemas are map values, members of lists whose first element is a
/// map, and the values of name-keyed schema maps (whose keys are left alone).
/// Literal payloads such as `default` and `enum` are never entered.
pub(crate) fn descend<F>(
    map: Map<String, Value>,
    path: &str,
    mut visit: F,
) -> DslResult<Map<String, Value>>
where
    F: FnMut(Value, &str) -> DslResult<Value>,
{
    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        let at = join(path, &key);
        let value = match value {
            v if LITERAL_KEYS.contains(&key.as_str()) => v,
            Value::Object(entries) if is_schema_map_key(&key) => {
                let mut rebuilt = Map::with_capacity(entries.len());
                for (name, schema) in entries {
                    let schema = visit(schema, &join(&at, &name))?;
                    rebuilt.insert(name, schema);
                }
                Value::Object(rebuilt)
            }
            v @ Value::Object(_) => visit(v, &at)?,
            Value::Array(items) if items.first().is_some_and(Value::is_object) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| visit(item, &join(&at, &i.to_string())))
                    .collect::<DslResult<Vec<_>>>()?,
            ),
            other => other,
        };
        out.insert(key, value);
    }
    Ok(out)
}

/// Empty string, empty collection or null. `false` is never blank.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
