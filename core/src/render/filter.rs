#![deny(missing_docs)]

//! # Filter
//!
//! Drops construction bookkeeping (`children`, `nullable`, `name`, in either
//! casing, and the `$kind` tag) and any attribute whose value is blank.
//! `false` is a real schema value and stays.

use super::{descend, is_blank, RenderContext, RenderPass};
use crate::error::DslResult;
use crate::node::KIND_TAG;
use serde_json::{Map, Value};

/// Keys that never reach the output.
pub const BOOKKEEPING_KEYS: &[&str] = &[
    "children", "nullable", "name", "Children", "Nullable", "Name", KIND_TAG,
];

/// The stripping pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct Filter;

impl RenderPass for Filter {
    fn name(&self) -> &str {
        "filter"
    }

    fn apply(&self, tree: Value, _ctx: &RenderContext<'_>) -> DslResult<Value> {
        filter_tree(tree)
    }
}

/// Applies the filter rules to a whole tree.
pub(crate) fn filter_tree(tree: Value) -> DslResult<Value> {
    visit(tree, "")
}

fn visit(value: Value, path: &str) -> DslResult<Value> {
    match value {
        Value::Object(mut map) => {
            for key in BOOKKEEPING_KEYS {
                map.shift_remove(*key);
            }
            let map = descend(map, path, visit)?;
            Ok(Value::Object(drop_blanks(map)))
        }
        other => Ok(other),
    }
}

fn drop_blanks(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().filter(|(_, v)| !is_blank(v)).collect()
}
