#![deny(missing_docs)]

//! # Multiplexer
//!
//! Boxes exclusive-choice nodes. A typed node carrying `any_of`, `one_of` or
//! `all_of` becomes a generic `entity` whose list holds the original members
//! plus, when they mean something, the node's own remaining attributes.

use super::filter::filter_tree;
use super::{descend, is_blank, join, RenderContext, RenderPass};
use crate::error::DslResult;
use crate::kind::GENERIC_KIND;
use crate::node::KIND_TAG;
use serde_json::{Map, Value};

/// Checked in this order; only the first non-empty one boxes the node.
pub const MULTIPLEXER_KEYS: [&str; 3] = ["any_of", "one_of", "all_of"];

/// The boxing pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct Multiplexer;

impl RenderPass for Multiplexer {
    fn name(&self) -> &str {
        "multiplexer"
    }

    fn apply(&self, tree: Value, ctx: &RenderContext<'_>) -> DslResult<Value> {
        visit(tree, "", ctx)
    }
}

fn visit(value: Value, path: &str, ctx: &RenderContext<'_>) -> DslResult<Value> {
    let Value::Object(mut map) = value else {
        return Ok(value);
    };

    let kind = match map.get("kind") {
        Some(Value::String(kind)) if kind != GENERIC_KIND => Some(kind.clone()),
        _ => None,
    };
    let key = MULTIPLEXER_KEYS.into_iter().find(|key| {
        matches!(map.get(*key), Some(Value::Array(members)) if !members.is_empty())
    });

    match (kind, key) {
        (Some(kind), Some(key)) => {
            let at = join(path, key);
            let members = match map.shift_remove(key) {
                Some(Value::Array(members)) => members,
                _ => Vec::new(),
            };
            let mut boxed = members
                .into_iter()
                .enumerate()
                .map(|(i, member)| visit(member, &join(&at, &i.to_string()), ctx))
                .collect::<DslResult<Vec<_>>>()?;
            if carries_meaning(&kind, &map, ctx)? {
                let own = visit(Value::Object(map), &join(&at, &boxed.len().to_string()), ctx)?;
                boxed.push(own);
            }

            let mut unique: Vec<Value> = Vec::with_capacity(boxed.len());
            for member in boxed {
                if !is_blank(&member) && !unique.contains(&member) {
                    unique.push(member);
                }
            }

            let mut wrapper = Map::new();
            wrapper.insert("kind".to_string(), Value::String(GENERIC_KIND.to_string()));
            wrapper.insert(key.to_string(), Value::Array(unique));
            Ok(Value::Object(wrapper))
        }
        _ => Ok(Value::Object(descend(map, path, |v, at| visit(v, at, ctx))?)),
    }
}

/// A bare `object` container (nothing beyond its defaults and bookkeeping)
/// adds no branch of its own. Every other kind always does.
///
/// Defaults belong to the registry identifier, which differs from the emitted
/// `kind` when the plain tree carries [`KIND_TAG`].
fn carries_meaning(
    kind: &str,
    rest: &Map<String, Value>,
    ctx: &RenderContext<'_>,
) -> DslResult<bool> {
    let id = match rest.get(KIND_TAG) {
        Some(Value::String(id)) => id.as_str(),
        _ => kind,
    };
    let mut stripped = rest.clone();
    for (attribute, default) in ctx.kinds.defaults_for(id) {
        if stripped.get(&attribute) == Some(&default.to_plain()) {
            stripped.shift_remove(&attribute);
        }
    }
    let remaining = match filter_tree(Value::Object(stripped))? {
        Value::Object(map) => map.len(),
        _ => 0,
    };
    Ok(!(kind == "object" && remaining <= 1))
}
