#![deny(missing_docs)]

//! # Schema Nodes
//!
//! The immutable tree model. A `Node` is an `Arc`-shared record of a kind
//! definition plus an ordered attribute map. Every write goes through
//! [`Node::update`] and yields a new node; children are shared, never copied.
//!
//! The "plain" form produced by [`Node::to_plain`] is the `serde_json::Value`
//! tree the render passes operate on.

use crate::config;
use crate::error::DslResult;
use crate::kind::KindDefinition;
use crate::render;
use heck::ToSnakeCase;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Key used to tag pattern names in the plain tree.
pub const PATTERN_TAG: &str = "$pattern";

/// Carries the registry identifier of a kind whose emitted type differs from it.
pub const KIND_TAG: &str = "$kind";

/// Ordered attribute list as supplied by a caller.
pub type Attributes = Vec<(String, AttrValue)>;

/// Shorthand for one `(attribute, value)` entry of [`Attributes`].
pub fn attr(name: impl Into<String>, value: impl Into<AttrValue>) -> (String, AttrValue) {
    (name.into(), value.into())
}

/// Canonicalizes an attribute name to its `snake_case` form.
///
/// `minLength` and `min_length` address the same attribute; `$ref` maps to `ref`.
pub fn normalize_attribute(name: &str) -> String {
    if name.chars().any(|c| c.is_ascii_uppercase() || c == '$') {
        name.to_snake_case()
    } else {
        name.to_string()
    }
}

/// A regular expression used as a property name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern(String);

impl Pattern {
    /// Validates `source` as a regular expression.
    pub fn new(source: impl Into<String>) -> DslResult<Self> {
        let source = source.into();
        Regex::new(&source)?;
        Ok(Self(source))
    }

    /// The expression source.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.0)
    }
}

/// Identifies a node inside its parent's property maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// Lands in `properties`.
    Plain(String),
    /// Lands in `patternProperties`.
    Pattern(Pattern),
}

impl Name {
    /// Plain-tree encoding: a string, or `{"$pattern": source}`.
    pub fn to_plain(&self) -> Value {
        match self {
            Name::Plain(s) => Value::String(s.clone()),
            Name::Pattern(p) => {
                let mut map = Map::new();
                map.insert(PATTERN_TAG.to_string(), Value::String(p.as_str().to_string()));
                Value::Object(map)
            }
        }
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::Plain(value.to_string())
    }
}

impl From<String> for Name {
    fn from(value: String) -> Self {
        Name::Plain(value)
    }
}

impl From<Pattern> for Name {
    fn from(value: Pattern) -> Self {
        Name::Pattern(value)
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Scalars, literal lists (`enum`, `required`) and `default` payloads.
    Json(Value),
    /// A node name.
    Name(Name),
    /// A nested schema.
    Node(Node),
    /// An ordered list of nested schemas.
    Nodes(Vec<Node>),
    /// A keyed map of nested schemas (`definitions`, `pattern_properties`).
    NodeMap(IndexMap<String, Node>),
}

impl AttrValue {
    /// Depth-first conversion to the plain tree.
    pub fn to_plain(&self) -> Value {
        match self {
            AttrValue::Json(v) => v.clone(),
            AttrValue::Name(n) => n.to_plain(),
            AttrValue::Node(n) => n.to_plain(),
            AttrValue::Nodes(nodes) => Value::Array(nodes.iter().map(Node::to_plain).collect()),
            AttrValue::NodeMap(map) => Value::Object(
                map.iter()
                    .map(|(k, n)| (k.clone(), n.to_plain()))
                    .collect(),
            ),
        }
    }

    /// True for `Json(Null)`, which means "unset".
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Json(Value::Null))
    }

    /// Returns the node if this value holds exactly one.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            AttrValue::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the scalar payload, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            AttrValue::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        AttrValue::Json(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Json(Value::String(value.to_string()))
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Json(Value::String(value))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Json(Value::Bool(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Json(Value::from(value))
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Json(Value::from(value))
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        AttrValue::Json(Value::from(value))
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        AttrValue::Json(Value::from(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Json(Value::from(value))
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(value: Vec<&str>) -> Self {
        AttrValue::Json(Value::from(value))
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::Json(Value::from(value))
    }
}

impl From<Name> for AttrValue {
    fn from(value: Name) -> Self {
        AttrValue::Name(value)
    }
}

impl From<Pattern> for AttrValue {
    fn from(value: Pattern) -> Self {
        AttrValue::Name(Name::Pattern(value))
    }
}

impl From<Node> for AttrValue {
    fn from(value: Node) -> Self {
        AttrValue::Node(value)
    }
}

impl From<Vec<Node>> for AttrValue {
    fn from(value: Vec<Node>) -> Self {
        AttrValue::Nodes(value)
    }
}

impl From<IndexMap<String, Node>> for AttrValue {
    fn from(value: IndexMap<String, Node>) -> Self {
        AttrValue::NodeMap(value)
    }
}

#[derive(Debug, PartialEq)]
struct NodeData {
    definition: Arc<KindDefinition>,
    attributes: IndexMap<String, AttrValue>,
}

/// An immutable schema node.
///
/// Cloning is cheap and shares the record. Equality is structural.
#[derive(Debug, Clone, PartialEq)]
pub struct Node(Arc<NodeData>);

impl Node {
    /// Creates a node of `definition`'s kind from `attributes`, in order.
    ///
    /// Fails on the first attribute that is unknown to the kind or whose value
    /// does not fit the declared type.
    pub fn construct<I, K>(definition: Arc<KindDefinition>, attributes: I) -> DslResult<Self>
    where
        I: IntoIterator<Item = (K, AttrValue)>,
        K: AsRef<str>,
    {
        let mut node = Node(Arc::new(NodeData {
            definition,
            attributes: IndexMap::new(),
        }));
        for (key, value) in attributes {
            node = node.update(key.as_ref(), value)?;
        }
        Ok(node)
    }

    /// Returns a copy with `attribute` set to `value`.
    ///
    /// A `null` value removes the attribute. Nothing else changes; nested nodes
    /// are shared with `self`.
    pub fn update(&self, attribute: &str, value: impl Into<AttrValue>) -> DslResult<Self> {
        let key = normalize_attribute(attribute);
        let checked = self.0.definition.check(&key, value.into())?;
        let mut attributes = self.0.attributes.clone();
        match checked {
            Some(v) => {
                attributes.insert(key, v);
            }
            None => {
                attributes.shift_remove(&key);
            }
        }
        Ok(Node(Arc::new(NodeData {
            definition: Arc::clone(&self.0.definition),
            attributes,
        })))
    }

    /// Returns a copy with `child` appended to `children`, unless a
    /// structurally identical child is already present.
    pub fn with_child(&self, child: Node) -> DslResult<Self> {
        let mut children = self.children().to_vec();
        if children.contains(&child) {
            return Ok(self.clone());
        }
        children.push(child);
        self.update("children", AttrValue::Nodes(children))
    }

    /// Registry identifier of this node's kind.
    pub fn kind(&self) -> &str {
        self.0.definition.id()
    }

    /// The kind definition the node was validated against.
    pub fn definition(&self) -> &Arc<KindDefinition> {
        &self.0.definition
    }

    /// Reads an attribute (either casing).
    pub fn get(&self, attribute: &str) -> Option<&AttrValue> {
        self.0.attributes.get(&normalize_attribute(attribute))
    }

    /// The node's name, if one was given.
    pub fn name(&self) -> Option<&Name> {
        match self.0.attributes.get("name") {
            Some(AttrValue::Name(n)) => Some(n),
            _ => None,
        }
    }

    /// Construction-time children.
    pub fn children(&self) -> &[Node] {
        match self.0.attributes.get("children") {
            Some(AttrValue::Nodes(nodes)) => nodes,
            _ => &[],
        }
    }

    /// All set attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Converts the node, and every node reachable through its attributes, to
    /// plain maps and lists.
    ///
    /// A kind registered under another identifier than the type it emits also
    /// leaves its identifier under [`KIND_TAG`].
    pub fn to_plain(&self) -> Value {
        let mut map: Map<String, Value> = self
            .0
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_plain()))
            .collect();
        let definition = &self.0.definition;
        if definition
            .type_name()
            .is_some_and(|type_name| type_name != definition.id())
        {
            map.insert(KIND_TAG.to_string(), Value::String(definition.id().to_string()));
        }
        Value::Object(map)
    }

    /// Renders the node with the process-wide configuration and no scope.
    pub fn render(&self) -> DslResult<Value> {
        render::render(self, &config::snapshot(), None)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_plain().serialize(serializer)
    }
}
