#![deny(missing_docs)]

//! # Desugar
//!
//! Resolves construction-time sugar: `nullable` becomes an `any_of` branch,
//! `children` are grouped into `properties` / `pattern_properties`, child
//! `required: true` flags are promoted to the parent's `required` list, and a
//! single-schema `items` wrapper is collapsed.
//!
//! Unnamed children that were also passed to one of the node's multiplexer
//! lists are left to that list.

use super::multiplexer::MULTIPLEXER_KEYS;
use super::{descend, join, RenderContext, RenderPass};
use crate::error::{DslError, DslResult};
use crate::node::PATTERN_TAG;
use serde_json::{json, Map, Value};

const PASS: &str = "desugar";

/// The desugaring pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct Desugar;

impl RenderPass for Desugar {
    fn name(&self) -> &str {
        PASS
    }

    fn apply(&self, tree: Value, _ctx: &RenderContext<'_>) -> DslResult<Value> {
        visit(tree, "")
    }
}

fn visit(value: Value, path: &str) -> DslResult<Value> {
    match value {
        Value::Object(map) => {
            let map = desugar_node(map, path)?;
            Ok(Value::Object(descend(map, path, visit)?))
        }
        other => Ok(other),
    }
}

/// Rewrites one node. Children are regrouped here and desugared by the
/// descent that follows.
fn desugar_node(mut map: Map<String, Value>, path: &str) -> DslResult<Map<String, Value>> {
    apply_nullable(&mut map);

    if map.contains_key("items") {
        collapse_items(&mut map);
        return Ok(map);
    }

    if let Some(children) = map.shift_remove("children") {
        promote_children(&mut map, children, path)?;
    }
    Ok(map)
}

fn apply_nullable(map: &mut Map<String, Value>) {
    let nullable = map.get("nullable").is_some_and(is_truthy);
    if !nullable {
        return;
    }
    map.shift_remove("nullable");

    let null_branch = json!({ "kind": "null" });
    match map.get_mut("any_of") {
        Some(Value::Array(branches)) => {
            if !branches.contains(&null_branch) {
                branches.push(null_branch);
            }
        }
        _ => {
            map.insert("any_of".to_string(), Value::Array(vec![null_branch]));
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// `items` built from a block is a wrapper around the item schema. A wrapper
/// with exactly one child is replaced by it; any other wrapper stays.
fn collapse_items(map: &mut Map<String, Value>) {
    let Some(Value::Object(wrapper)) = map.get_mut("items") else {
        return;
    };
    let only = match wrapper.get_mut("children") {
        Some(Value::Array(children)) if children.len() == 1 => children.pop(),
        _ => None,
    };
    if let Some(only) = only {
        map.insert("items".to_string(), only);
    }
}

enum ChildName {
    Plain(String),
    Pattern(String),
}

fn child_name(child: &Map<String, Value>, path: &str) -> DslResult<Option<ChildName>> {
    match child.get("name") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => Ok(Some(ChildName::Plain(name.clone()))),
        Some(Value::Object(tagged)) => match tagged.get(PATTERN_TAG) {
            Some(Value::String(pattern)) => Ok(Some(ChildName::Pattern(pattern.clone()))),
            _ => Err(not_a_name(path)),
        },
        Some(_) => Err(not_a_name(path)),
    }
}

fn not_a_name(path: &str) -> DslError {
    DslError::render(PASS, path, "child name is neither a string nor a pattern")
}

/// Whether `child` is a member of one of the node's multiplexer lists.
fn is_multiplexed(map: &Map<String, Value>, child: &Value) -> bool {
    MULTIPLEXER_KEYS.iter().any(|key| {
        matches!(map.get(*key), Some(Value::Array(members)) if members.contains(child))
    })
}

fn promote_children(
    map: &mut Map<String, Value>,
    children: Value,
    path: &str,
) -> DslResult<()> {
    let children_path = join(path, "children");
    let Value::Array(children) = children else {
        return Err(DslError::render(PASS, &children_path, "children must be a list"));
    };
    if children.is_empty() {
        return Ok(());
    }

    let mut properties = Map::new();
    let mut pattern_properties = Map::new();
    let mut required = Vec::new();

    for (i, child) in children.into_iter().enumerate() {
        let at = join(&children_path, &i.to_string());
        if is_multiplexed(map, &child) && child.get("name").is_none() {
            continue;
        }
        let Value::Object(mut child) = child else {
            return Err(DslError::render(PASS, &at, "child must be a map"));
        };
        let Some(name) = child_name(&child, &at)? else {
            return Err(DslError::render(PASS, &at, "child has no name"));
        };
        let is_required = match child.get("required") {
            Some(Value::Bool(flag)) => {
                let flag = *flag;
                child.shift_remove("required");
                flag
            }
            _ => false,
        };
        match name {
            ChildName::Plain(name) => {
                if is_required {
                    required.push(name.clone());
                }
                properties.insert(name, Value::Object(child));
            }
            ChildName::Pattern(pattern) => {
                if is_required {
                    return Err(DslError::render(
                        PASS,
                        &at,
                        format!("pattern property /{}/ cannot be required", pattern),
                    ));
                }
                pattern_properties.insert(pattern, Value::Object(child));
            }
        }
    }

    if !required.is_empty() {
        merge_required(map, required, path)?;
    }
    merge_schema_map(map, "properties", properties);
    merge_schema_map(map, "pattern_properties", pattern_properties);
    Ok(())
}

/// Set union into the node's own `required` list.
fn merge_required(
    map: &mut Map<String, Value>,
    names: Vec<String>,
    path: &str,
) -> DslResult<()> {
    let at = join(path, "required");
    let mut merged: Vec<Value> = match map.shift_remove("required") {
        None | Some(Value::Null) | Some(Value::Bool(_)) => Vec::new(),
        Some(Value::Array(existing)) => {
            if let Some(bad) = existing.iter().find(|v| !v.is_string()) {
                return Err(DslError::render(
                    PASS,
                    &at,
                    format!("required entry {} is not a name", bad),
                ));
            }
            existing
        }
        Some(other) => {
            return Err(DslError::render(
                PASS,
                &at,
                format!("required must be a list of names, found {}", other),
            ))
        }
    };
    for name in names {
        let name = Value::String(name);
        if !merged.contains(&name) {
            merged.push(name);
        }
    }
    map.insert("required".to_string(), Value::Array(merged));
    Ok(())
}

fn merge_schema_map(map: &mut Map<String, Value>, key: &str, entries: Map<String, Value>) {
    if entries.is_empty() {
        return;
    }
    match map.get_mut(key) {
        Some(Value::Object(existing)) => existing.extend(entries),
        _ => {
            map.insert(key.to_string(), Value::Object(entries));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::KindRegistry;
    use serde_json::json;

    fn run(tree: Value) -> DslResult<Value> {
        let kinds = KindRegistry::builtin();
        let ctx = RenderContext {
            kinds: &kinds,
            scope: None,
        };
        Desugar.apply(tree, &ctx)
    }

    #[test]
    fn test_nullable_appends_null_branch() {
        let out = run(json!({
            "kind": "string",
            "nullable": true,
            "any_of": [ { "kind": "integer" } ]
        }))
        .unwrap();
        assert_eq!(
            out,
            json!({ "kind": "string", "any_of": [ { "kind": "integer" }, { "kind": "null" } ] })
        );
    }

    #[test]
    fn test_nullable_false_is_left_for_filter() {
        let out = run(json!({ "kind": "string", "nullable": false })).unwrap();
        assert_eq!(out, json!({ "kind": "string", "nullable": false }));
    }

    #[test]
    fn test_empty_children_produce_nothing() {
        let out = run(json!({ "kind": "object", "children": [] })).unwrap();
        assert_eq!(out, json!({ "kind": "object" }));
    }

    #[test]
    fn test_plain_and_pattern_routing() {
        let out = run(json!({
            "kind": "object",
            "children": [
                { "name": "id", "kind": "string" },
                { "name": { "$pattern": "^x" }, "kind": "integer" }
            ]
        }))
        .unwrap();
        assert_eq!(out["properties"], json!({ "id": { "name": "id", "kind": "string" } }));
        assert_eq!(
            out["pattern_properties"],
            json!({ "^x": { "name": { "$pattern": "^x" }, "kind": "integer" } })
        );
        assert!(out.get("children").is_none());
    }

    #[test]
    fn test_required_is_set_union() {
        let out = run(json!({
            "kind": "object",
            "required": ["A"],
            "children": [ { "name": "A", "kind": "string", "required": true } ]
        }))
        .unwrap();
        assert_eq!(out["required"], json!(["A"]));
        assert!(out["properties"]["A"].get("required").is_none());
    }

    #[test]
    fn test_nested_children_are_desugared() {
        let out = run(json!({
            "kind": "object",
            "children": [ {
                "name": "address",
                "kind": "object",
                "required": true,
                "children": [
                    { "name": "zip", "kind": "string", "required": true, "nullable": true }
                ]
            } ]
        }))
        .unwrap();
        assert_eq!(out["required"], json!(["address"]));
        let address = &out["properties"]["address"];
        assert_eq!(address["required"], json!(["zip"]));
        assert_eq!(address["properties"]["zip"]["any_of"], json!([ { "kind": "null" } ]));
    }

    #[test]
    fn test_items_collapse_single_child() {
        let out = run(json!({
            "kind": "array",
            "items": { "children": [ { "kind": "string", "nullable": true } ] }
        }))
        .unwrap();
        assert_eq!(
            out["items"],
            json!({ "kind": "string", "any_of": [ { "kind": "null" } ] })
        );
    }

    #[test]
    fn test_items_with_several_children_keep_their_wrapper() {
        let a = json!({ "kind": "object", "children": [ { "name": "a", "kind": "string" } ] });
        let b = json!({ "kind": "object", "children": [ { "name": "b", "kind": "number" } ] });
        let out = run(json!({
            "kind": "array",
            "items": { "kind": "object", "children": [ a.clone(), b.clone() ], "any_of": [ a, b ] }
        }))
        .unwrap();
        assert_eq!(
            out["items"],
            json!({
                "kind": "object",
                "any_of": [
                    { "kind": "object", "properties": { "a": { "name": "a", "kind": "string" } } },
                    { "kind": "object", "properties": { "b": { "name": "b", "kind": "number" } } }
                ]
            })
        );
    }

    #[test]
    fn test_multiplexed_unnamed_children_are_skipped() {
        let out = run(json!({
            "kind": "object",
            "children": [ { "kind": "null" }, { "name": "id", "kind": "string" } ],
            "one_of": [ { "kind": "null" } ]
        }))
        .unwrap();
        assert_eq!(
            out,
            json!({
                "kind": "object",
                "one_of": [ { "kind": "null" } ],
                "properties": { "id": { "name": "id", "kind": "string" } }
            })
        );
    }

    #[test]
    fn test_non_string_name_is_render_error() {
        let err = run(json!({ "kind": "object", "children": [ { "name": 7 } ] })).unwrap_err();
        assert!(matches!(
            err,
            DslError::Render { ref message, .. } if message.contains("neither a string")
        ));
    }

    #[test]
    fn test_missing_name_is_render_error() {
        let err = run(json!({ "kind": "object", "children": [ { "kind": "string" } ] }))
            .unwrap_err();
        assert!(matches!(err, DslError::Render { ref path, .. } if path == "/children/0"));
    }

    #[test]
    fn test_bad_required_entry_is_render_error() {
        let err = run(json!({
            "kind": "object",
            "required": [1],
            "children": [ { "name": "a", "required": true } ]
        }))
        .unwrap_err();
        assert!(matches!(err, DslError::Render { .. }));
    }

    #[test]
    fn test_required_pattern_is_render_error() {
        let err = run(json!({
            "kind": "object",
            "children": [ { "name": { "$pattern": "^x" }, "required": true } ]
        }))
        .unwrap_err();
        assert!(matches!(err, DslError::Render { .. }));
    }
}
