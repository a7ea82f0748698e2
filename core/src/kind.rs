#![deny(missing_docs)]

//! # Kind Registry
//!
//! Kinds are data: a `KindDefinition` lists the attributes a node of that kind
//! accepts, and the `KindRegistry` maps identifiers to definitions plus the
//! default attribute values injected into every freshly built node.

use crate::error::{DslError, DslResult};
use crate::node::{normalize_attribute, AttrValue, Name};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Identifier of the generic kind. Nodes of this kind carry no `kind` value.
pub const GENERIC_KIND: &str = "entity";

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    /// Anything goes.
    Any,
    /// A string. Numbers and booleans are coerced to their text form.
    String,
    /// An integral number.
    Integer,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// A plain or pattern name.
    Name,
    /// A JSON array of literals.
    Array,
    /// A single nested schema.
    Schema,
    /// A list of nested schemas. A single node is wrapped.
    Schemas,
    /// Either one nested schema or a list of them (`items`).
    SchemaOrSchemas,
    /// A boolean or a nested schema (`additionalProperties`).
    BoolOrSchema,
    /// A keyed map of nested schemas.
    SchemaMap,
    /// `true`/`false` on a child, or a list of names on an object.
    Required,
}

impl AttrType {
    fn expected(&self) -> &'static str {
        match self {
            AttrType::Any => "any value",
            AttrType::String => "a string",
            AttrType::Integer => "an integer",
            AttrType::Number => "a number",
            AttrType::Boolean => "a boolean",
            AttrType::Name => "a name or pattern",
            AttrType::Array => "an array",
            AttrType::Schema => "a schema node",
            AttrType::Schemas => "a list of schema nodes",
            AttrType::SchemaOrSchemas => "a schema node or a list of them",
            AttrType::BoolOrSchema => "a boolean or a schema node",
            AttrType::SchemaMap => "a map of schema nodes",
            AttrType::Required => "a boolean or a list of names",
        }
    }

    /// Checks `value` against this type, applying the allowed coercions.
    pub fn coerce(&self, value: AttrValue) -> Option<AttrValue> {
        use AttrValue::{Json, Node, NodeMap, Nodes};
        match (self, value) {
            (AttrType::Any, v) => Some(v),
            (AttrType::String, Json(Value::String(s))) => Some(Json(Value::String(s))),
            (AttrType::String, Json(v @ (Value::Number(_) | Value::Bool(_)))) => {
                Some(Json(Value::String(v.to_string())))
            }
            (AttrType::String, AttrValue::Name(Name::Plain(s))) => Some(Json(Value::String(s))),
            (AttrType::String, AttrValue::Name(Name::Pattern(p))) => {
                Some(Json(Value::String(p.as_str().to_string())))
            }
            (AttrType::Integer, Json(Value::Number(n))) if n.is_i64() || n.is_u64() => {
                Some(Json(Value::Number(n)))
            }
            (AttrType::Number, Json(Value::Number(n))) => Some(Json(Value::Number(n))),
            (AttrType::Boolean, Json(Value::Bool(b))) => Some(Json(Value::Bool(b))),
            (AttrType::Name, AttrValue::Name(n)) => Some(AttrValue::Name(n)),
            (AttrType::Name, Json(Value::String(s))) => Some(AttrValue::Name(Name::Plain(s))),
            (AttrType::Array, Json(Value::Array(items))) => Some(Json(Value::Array(items))),
            (AttrType::Schema, Node(n)) => Some(Node(n)),
            (AttrType::Schemas, Nodes(ns)) => Some(Nodes(ns)),
            (AttrType::Schemas, Node(n)) => Some(Nodes(vec![n])),
            (AttrType::SchemaOrSchemas, v @ (Node(_) | Nodes(_))) => Some(v),
            (AttrType::BoolOrSchema, v @ (Json(Value::Bool(_)) | Node(_))) => Some(v),
            (AttrType::SchemaMap, NodeMap(m)) => Some(NodeMap(m)),
            (AttrType::Required, Json(Value::Bool(b))) => Some(Json(Value::Bool(b))),
            (AttrType::Required, Json(Value::Array(items)))
                if items.iter().all(Value::is_string) =>
            {
                Some(Json(Value::Array(items)))
            }
            _ => None,
        }
    }
}

/// Attributes every kind accepts.
fn common_attributes() -> IndexMap<String, AttrType> {
    [
        ("kind", AttrType::String),
        ("name", AttrType::Name),
        ("title", AttrType::String),
        ("description", AttrType::String),
        ("default", AttrType::Any),
        ("enum", AttrType::Array),
        ("all_of", AttrType::Schemas),
        ("any_of", AttrType::Schemas),
        ("one_of", AttrType::Schemas),
        ("children", AttrType::Schemas),
        ("nullable", AttrType::Boolean),
        ("required", AttrType::Required),
        ("ref", AttrType::String),
        ("definitions", AttrType::SchemaMap),
        ("not", AttrType::Schema),
    ]
    .into_iter()
    .map(|(k, t)| (k.to_string(), t))
    .collect()
}

/// The attribute schema of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct KindDefinition {
    id: String,
    type_name: Option<String>,
    attributes: IndexMap<String, AttrType>,
}

impl KindDefinition {
    /// A kind whose nodes render with `type: <id>`.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            type_name: Some(id.clone()),
            id,
            attributes: common_attributes(),
        }
    }

    /// A kind whose nodes carry no `type` of their own.
    pub fn generic(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: None,
            attributes: common_attributes(),
        }
    }

    /// Overrides the `type` value emitted for this kind.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Declares an extra attribute.
    pub fn attribute(mut self, name: &str, ty: AttrType) -> Self {
        self.attributes.insert(normalize_attribute(name), ty);
        self
    }

    /// Registry identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Value seeded into the `kind` attribute, `None` for generic kinds.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Declared type of `name`, if the kind accepts it.
    pub fn attribute_type(&self, name: &str) -> Option<AttrType> {
        self.attributes.get(&normalize_attribute(name)).copied()
    }

    /// Names of all accepted attributes.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Validates a write. `Ok(None)` means "remove the attribute".
    pub(crate) fn check(&self, attribute: &str, value: AttrValue) -> DslResult<Option<AttrValue>> {
        let ty = self
            .attributes
            .get(attribute)
            .ok_or_else(|| DslError::UnknownAttribute {
                kind: self.id.clone(),
                attribute: attribute.to_string(),
            })?;
        if value.is_null() {
            return Ok(None);
        }
        ty.coerce(value)
            .map(Some)
            .ok_or_else(|| DslError::InvalidAttribute {
                kind: self.id.clone(),
                attribute: attribute.to_string(),
                expected: ty.expected().to_string(),
            })
    }
}

/// The numeric attribute set. `numeric` and `number` both emit `type: "number"`.
fn numeric(id: &str, type_name: &str) -> KindDefinition {
    KindDefinition::new(id)
        .with_type_name(type_name)
        .attribute("multiple_of", AttrType::Number)
        .attribute("minimum", AttrType::Number)
        .attribute("maximum", AttrType::Number)
        .attribute("exclusive_minimum", AttrType::Any)
        .attribute("exclusive_maximum", AttrType::Any)
}

fn builtin_kinds() -> Vec<KindDefinition> {
    vec![
        KindDefinition::generic(GENERIC_KIND),
        KindDefinition::new("null"),
        KindDefinition::new("boolean"),
        KindDefinition::new("string")
            .attribute("min_length", AttrType::Integer)
            .attribute("max_length", AttrType::Integer)
            .attribute("pattern", AttrType::String)
            .attribute("format", AttrType::String),
        numeric("numeric", "number"),
        numeric("number", "number"),
        numeric("integer", "integer"),
        KindDefinition::new("array")
            .attribute("unique_items", AttrType::Boolean)
            .attribute("additional_items", AttrType::BoolOrSchema)
            .attribute("min_items", AttrType::Integer)
            .attribute("max_items", AttrType::Integer)
            .attribute("items", AttrType::SchemaOrSchemas),
        KindDefinition::new("object")
            .attribute("pattern_properties", AttrType::SchemaMap)
            .attribute("min_properties", AttrType::Integer)
            .attribute("max_properties", AttrType::Integer)
            .attribute("additional_properties", AttrType::BoolOrSchema),
    ]
}

/// Maps kind identifiers to definitions and per-kind defaults.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: IndexMap<String, Arc<KindDefinition>>,
    defaults: HashMap<String, IndexMap<String, AttrValue>>,
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KindRegistry {
    /// The built-in kind set with no defaults.
    pub fn builtin() -> Self {
        let kinds = builtin_kinds()
            .into_iter()
            .map(|def| (def.id().to_string(), Arc::new(def)))
            .collect();
        Self {
            kinds,
            defaults: HashMap::new(),
        }
    }

    /// Adds or replaces a kind.
    pub fn register(&mut self, definition: KindDefinition) {
        tracing::debug!(kind = definition.id(), "registering kind");
        self.kinds
            .insert(definition.id().to_string(), Arc::new(definition));
    }

    /// Looks up a kind definition.
    pub fn get(&self, kind: &str) -> Option<&Arc<KindDefinition>> {
        self.kinds.get(kind)
    }

    /// Like [`KindRegistry::get`] but fails with `UnknownKind`.
    pub fn require(&self, kind: &str) -> DslResult<&Arc<KindDefinition>> {
        self.get(kind)
            .ok_or_else(|| DslError::UnknownKind(kind.to_string()))
    }

    /// Whether `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Registered identifiers in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// The defaults for `kind`. Empty when none were set.
    pub fn defaults_for(&self, kind: &str) -> IndexMap<String, AttrValue> {
        self.defaults.get(kind).cloned().unwrap_or_default()
    }

    /// Merges `partial` into `kind`'s defaults; later values win.
    ///
    /// Each value is validated against the kind's attribute schema.
    pub fn set_defaults<I, K>(&mut self, kind: &str, partial: I) -> DslResult<()>
    where
        I: IntoIterator<Item = (K, AttrValue)>,
        K: AsRef<str>,
    {
        let definition = Arc::clone(self.require(kind)?);
        let mut staged = Vec::new();
        for (key, value) in partial {
            let key = normalize_attribute(key.as_ref());
            let checked = definition.check(&key, value)?;
            staged.push((key, checked));
        }
        tracing::debug!(kind, count = staged.len(), "merging kind defaults");
        let entry = self.defaults.entry(kind.to_string()).or_default();
        for (key, value) in staged {
            match value {
                Some(v) => {
                    entry.insert(key, v);
                }
                None => {
                    entry.shift_remove(&key);
                }
            }
        }
        Ok(())
    }

    /// Clears every defaults map.
    pub fn reset_defaults(&mut self) {
        self.defaults.clear();
    }

    /// Restores the built-in kind set, dropping runtime kinds and all defaults.
    pub fn reset(&mut self) {
        *self = Self::builtin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_kinds() {
        let registry = KindRegistry::builtin();
        let kinds: Vec<&str> = registry.kinds().collect();
        assert_eq!(
            kinds,
            vec![
                "entity", "null", "boolean", "string", "numeric", "number", "integer", "array",
                "object"
            ]
        );
        assert_eq!(registry.get("entity").unwrap().type_name(), None);
        assert_eq!(registry.get("integer").unwrap().type_name(), Some("integer"));
        let numeric = registry.get("numeric").unwrap();
        assert_eq!(numeric.type_name(), Some("number"));
        assert_eq!(numeric.attribute_type("multipleOf"), Some(AttrType::Number));
        assert_eq!(
            numeric.attribute_names().collect::<Vec<_>>(),
            registry.get("number").unwrap().attribute_names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_defaults_for_unknown_is_empty() {
        let registry = KindRegistry::builtin();
        assert!(registry.defaults_for("nope").is_empty());
    }

    #[test]
    fn test_set_defaults_accumulates() {
        let mut registry = KindRegistry::builtin();
        registry
            .set_defaults("object", vec![("additionalProperties", AttrValue::from(false))])
            .unwrap();
        registry
            .set_defaults("object", vec![("title", AttrValue::from("T"))])
            .unwrap();
        registry
            .set_defaults("object", vec![("additional_properties", AttrValue::from(true))])
            .unwrap();
        let defaults = registry.defaults_for("object");
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults["additional_properties"], AttrValue::from(true));
    }

    #[test]
    fn test_set_defaults_validates() {
        let mut registry = KindRegistry::builtin();
        let err = registry
            .set_defaults("string", vec![("minimum", AttrValue::from(1))])
            .unwrap_err();
        assert!(matches!(err, DslError::UnknownAttribute { .. }));
        assert!(matches!(
            registry.set_defaults("ghost", Vec::<(String, AttrValue)>::new()),
            Err(DslError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_reset_restores_builtins() {
        let mut registry = KindRegistry::builtin();
        registry.register(KindDefinition::new("uuid").attribute("format", AttrType::String));
        registry
            .set_defaults("uuid", vec![("format", AttrValue::from("uuid"))])
            .unwrap();
        assert!(registry.contains("uuid"));
        registry.reset();
        assert!(!registry.contains("uuid"));
        assert!(registry.defaults_for("uuid").is_empty());
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(
            AttrType::String.coerce(AttrValue::from(5)),
            Some(AttrValue::from("5"))
        );
        assert_eq!(AttrType::Integer.coerce(AttrValue::from(1.5)), None);
        assert_eq!(
            AttrType::Required.coerce(AttrValue::from(json!(["a", 1]))),
            None
        );
    }
}
