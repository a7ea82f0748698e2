#![deny(missing_docs)]

//! # Builder
//!
//! A `Builder` is the cursor over one in-progress node. Attribute writes and
//! child additions replace its current node with an updated copy; construction
//! blocks receive the builder as their receiver, so nested calls land on the
//! same node.
//!
//! Kinds are data, so child construction is one generic operation keyed by
//! kind identifier ([`Builder::child`]); the typed methods (`string`,
//! `object`, ...) are thin shorthands over it. [`Builder::invoke`] is the
//! dynamic entry point used by hosts that dispatch on operation names.

use crate::config::SchemaConfig;
use crate::error::{DslError, DslResult};
use crate::kind::GENERIC_KIND;
use crate::node::{normalize_attribute, AttrValue, Attributes, Name, Node, Pattern};
use crate::render;
use crate::scope::{Scope, ScopeValue};
use serde_json::Value;

/// Kind of a nested node written through an attribute without an explicit kind.
const NESTED_KIND: &str = "object";

/// A construction block.
pub type Block<'b> = Box<dyn FnOnce(&mut Builder<'_>) -> DslResult<()> + 'b>;

/// Arguments of one DSL operation: `name`, `attributes` and a block, plus the
/// forms only attribute setters and scope helpers use.
#[derive(Default)]
pub struct Call<'b> {
    name: Option<Name>,
    attributes: Attributes,
    block: Option<Block<'b>>,
    value: Option<AttrValue>,
    kind: Option<String>,
    args: Vec<AttrValue>,
}

impl<'b> Call<'b> {
    /// No name, no attributes, no block.
    pub fn new() -> Self {
        Self::default()
    }

    /// A call naming the node it builds.
    pub fn named(name: impl Into<Name>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Adds an attribute, applied in insertion order before the block.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Appends several attributes.
    pub fn attrs(mut self, attributes: Attributes) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Sets the construction block.
    pub fn block<F>(mut self, block: F) -> Self
    where
        F: FnOnce(&mut Builder<'_>) -> DslResult<()> + 'b,
    {
        self.block = Some(Box::new(block));
        self
    }

    /// The literal value for an attribute write.
    pub fn value(mut self, value: impl Into<AttrValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Type-only qualifier: an attribute write builds a nested node of `kind`.
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Positional argument for a scope helper.
    pub fn arg(mut self, value: impl Into<AttrValue>) -> Self {
        self.args.push(value.into());
        self
    }

    fn is_read(&self) -> bool {
        self.value.is_none() && !self.builds_node()
    }

    /// Attributes, a block or a kind all describe a nested node.
    fn builds_node(&self) -> bool {
        self.block.is_some() || self.kind.is_some() || !self.attributes.is_empty()
    }
}

impl From<&str> for Call<'_> {
    fn from(name: &str) -> Self {
        Call::named(name)
    }
}

impl From<String> for Call<'_> {
    fn from(name: String) -> Self {
        Call::named(name)
    }
}

impl From<Pattern> for Call<'_> {
    fn from(pattern: Pattern) -> Self {
        Call::named(pattern)
    }
}

impl From<Name> for Call<'_> {
    fn from(name: Name) -> Self {
        Call::named(name)
    }
}

/// Result of a dynamically dispatched operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// An attribute's value after the read or write.
    Value(Option<AttrValue>),
    /// A child node that was added to the current node.
    Node(Node),
    /// A scope helper's non-renderable result.
    Raw(Value),
}

/// Cursor over one in-progress node.
pub struct Builder<'a> {
    node: Node,
    config: &'a SchemaConfig,
    scope: Option<&'a dyn Scope>,
}

impl<'a> Builder<'a> {
    /// Builds a node of `kind`.
    ///
    /// An explicit `kind` attribute overrides `kind`. The fresh node is seeded
    /// with the name, the kind's type and the kind's defaults; then the call's
    /// attributes are applied in order, then its block runs.
    pub fn build(
        config: &'a SchemaConfig,
        scope: Option<&'a dyn Scope>,
        kind: &str,
        call: Call<'_>,
    ) -> DslResult<Node> {
        let Call {
            name,
            attributes,
            block,
            ..
        } = call;

        let kind = attributes
            .iter()
            .rev()
            .find(|(key, _)| normalize_attribute(key) == "kind")
            .and_then(|(_, value)| value.as_json())
            .and_then(Value::as_str)
            .unwrap_or(kind)
            .to_string();
        let definition = config.kinds().require(&kind)?;

        let mut seed: Attributes = Vec::new();
        if let Some(name) = name {
            seed.push(("name".to_string(), AttrValue::Name(name)));
        }
        if let Some(type_name) = definition.type_name() {
            seed.push(("kind".to_string(), AttrValue::from(type_name)));
        }
        seed.extend(
            config
                .kinds()
                .defaults_for(&kind)
                .into_iter()
                .filter(|(key, _)| key != "name" && key != "kind"),
        );
        seed.extend(attributes);

        let mut builder = Builder {
            node: Node::construct(definition.clone(), seed)?,
            config,
            scope,
        };
        if let Some(block) = block {
            block(&mut builder)?;
        }
        Ok(builder.node)
    }

    /// The node as built so far.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Consumes the builder.
    pub fn into_node(self) -> Node {
        self.node
    }

    /// Renders the current node with the builder's configuration and scope.
    pub fn render(&self) -> DslResult<Value> {
        render::render(&self.node, self.config, self.scope)
    }

    /// Reads an attribute. Fails if the kind does not declare it.
    pub fn get(&self, attribute: &str) -> DslResult<Option<&AttrValue>> {
        self.declared(attribute)?;
        Ok(self.node.get(attribute))
    }

    /// Writes an attribute.
    pub fn set(&mut self, attribute: &str, value: impl Into<AttrValue>) -> DslResult<&mut Self> {
        self.node = self.node.update(attribute, value)?;
        Ok(self)
    }

    /// Writes an attribute whose value is a freshly built nested node.
    ///
    /// The nested node is of the call's `kind` (`object` when absent) and is
    /// shaped by the call's attributes and block.
    pub fn set_schema<'b>(
        &mut self,
        attribute: &str,
        call: impl Into<Call<'b>>,
    ) -> DslResult<&mut Self> {
        self.declared(attribute)?;
        let mut call = call.into();
        let kind = call.kind.take().unwrap_or_else(|| NESTED_KIND.to_string());
        let nested = Builder::build(self.config, self.scope, &kind, call)?;
        self.set(attribute, nested)
    }

    /// Adds a child of `kind` and returns it.
    ///
    /// Adding a structurally identical child twice keeps one copy.
    pub fn child<'b>(&mut self, kind: &str, call: impl Into<Call<'b>>) -> DslResult<Node> {
        let child = Builder::build(self.config, self.scope, kind, call.into())?;
        self.adopt(child.clone())?;
        Ok(child)
    }

    /// Appends an already built node to `children`.
    pub fn adopt(&mut self, child: Node) -> DslResult<&mut Self> {
        self.node = self.node.with_child(child)?;
        Ok(self)
    }

    /// Whether [`Builder::invoke`] would find `operation`.
    pub fn responds_to(&self, operation: &str) -> bool {
        self.node.definition().attribute_type(operation).is_some()
            || self.config.kinds().contains(operation)
            || self.scope.is_some_and(|scope| scope.responds_to(operation))
    }

    /// Dispatches `operation` by name.
    ///
    /// Attributes come first, then registered kinds, then the scope. An
    /// attribute call with a value writes it, a bare call reads it, and a call
    /// with attributes, a kind or a block writes a nested node built from them.
    /// Mixing a value with a nested description is rejected.
    pub fn invoke<'b>(
        &mut self,
        operation: &str,
        call: impl Into<Call<'b>>,
    ) -> DslResult<Outcome> {
        let mut call = call.into();
        let attribute = normalize_attribute(operation);

        if self.node.definition().attribute_type(&attribute).is_some() {
            if call.is_read() {
                return Ok(Outcome::Value(self.node.get(&attribute).cloned()));
            }
            match call.value.take() {
                Some(_) if call.builds_node() => {
                    return Err(DslError::InvalidAttribute {
                        kind: self.node.kind().to_string(),
                        attribute,
                        expected: "either a value or a nested schema".to_string(),
                    });
                }
                Some(value) => {
                    self.set(&attribute, value)?;
                }
                None => {
                    self.set_schema(&attribute, call)?;
                }
            }
            return Ok(Outcome::Value(self.node.get(&attribute).cloned()));
        }

        if self.config.kinds().contains(operation) {
            return self.child(operation, call).map(Outcome::Node);
        }

        self.delegate(operation, &call.args)
    }

    fn delegate(&mut self, operation: &str, args: &[AttrValue]) -> DslResult<Outcome> {
        let scope = self
            .scope
            .filter(|scope| scope.responds_to(operation))
            .ok_or_else(|| DslError::NoSuchOperation(operation.to_string()))?;
        match scope.try_invoke(operation, args) {
            Some(Ok(ScopeValue::Node(node))) => {
                self.adopt(node.clone())?;
                Ok(Outcome::Node(node))
            }
            Some(Ok(ScopeValue::Raw(value))) => Ok(Outcome::Raw(value)),
            Some(Err(err)) => Err(err),
            None => Err(DslError::NoSuchOperation(operation.to_string())),
        }
    }

    fn declared(&self, attribute: &str) -> DslResult<()> {
        let definition = self.node.definition();
        match definition.attribute_type(attribute) {
            Some(_) => Ok(()),
            None => Err(DslError::UnknownAttribute {
                kind: definition.id().to_string(),
                attribute: normalize_attribute(attribute),
            }),
        }
    }

    /// Adds a generic child.
    pub fn entity<'b>(&mut self, call: impl Into<Call<'b>>) -> DslResult<Node> {
        self.child(GENERIC_KIND, call)
    }

    /// Adds a `null` child.
    pub fn null<'b>(&mut self, call: impl Into<Call<'b>>) -> DslResult<Node> {
        self.child("null", call)
    }

    /// Adds a `boolean` child.
    pub fn boolean<'b>(&mut self, call: impl Into<Call<'b>>) -> DslResult<Node> {
        self.child("boolean", call)
    }

    /// Adds a `string` child.
    pub fn string<'b>(&mut self, call: impl Into<Call<'b>>) -> DslResult<Node> {
        self.child("string", call)
    }

    /// Adds a `numeric` child.
    pub fn numeric<'b>(&mut self, call: impl Into<Call<'b>>) -> DslResult<Node> {
        self.child("numeric", call)
    }

    /// Adds a `number` child.
    pub fn number<'b>(&mut self, call: impl Into<Call<'b>>) -> DslResult<Node> {
        self.child("number", call)
    }

    /// Adds an `integer` child.
    pub fn integer<'b>(&mut self, call: impl Into<Call<'b>>) -> DslResult<Node> {
        self.child("integer", call)
    }

    /// Adds an `array` child.
    pub fn array<'b>(&mut self, call: impl Into<Call<'b>>) -> DslResult<Node> {
        self.child("array", call)
    }

    /// Adds an `object` child.
    pub fn object<'b>(&mut self, call: impl Into<Call<'b>>) -> DslResult<Node> {
        self.child("object", call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::kind::KindDefinition;
    use crate::scope::HelperScope;
    use serde_json::json;

    #[test]
    fn test_build_seeds_name_kind_and_attributes() {
        let config = SchemaConfig::new();
        let node = Builder::build(
            &config,
            None,
            "string",
            Call::named("id").attr("format", "uuid"),
        )
        .unwrap();
        assert_eq!(
            node.to_plain(),
            json!({ "name": "id", "kind": "string", "format": "uuid" })
        );
    }

    #[test]
    fn test_explicit_kind_attribute_wins() {
        let config = SchemaConfig::new();
        let node = Builder::build(&config, None, "entity", Call::new().attr("kind", "integer"))
            .unwrap();
        assert_eq!(node.kind(), "integer");
        assert!(node.definition().attribute_type("minimum").is_some());
    }

    #[test]
    fn test_unknown_kind_fails() {
        let config = SchemaConfig::new();
        let err = Builder::build(&config, None, "date", Call::new()).unwrap_err();
        assert!(matches!(err, DslError::UnknownKind(ref k) if k == "date"));
    }

    #[test]
    fn test_defaults_are_seeded_and_overridable() {
        let mut config = SchemaConfig::new();
        config
            .set_kind_defaults(
                "object",
                vec![
                    ("additional_properties", AttrValue::from(false)),
                    ("name", AttrValue::from("x")),
                ],
            )
            .unwrap();
        let node = Builder::build(&config, None, "object", Call::named("o")).unwrap();
        assert_eq!(
            node.to_plain(),
            json!({ "name": "o", "kind": "object", "additional_properties": false })
        );
        let node = Builder::build(
            &config,
            None,
            "object",
            Call::new().attr("additionalProperties", true),
        )
        .unwrap();
        assert_eq!(node.get("additional_properties"), Some(&AttrValue::from(true)));
    }

    #[test]
    fn test_block_and_children() {
        let config = SchemaConfig::new();
        let mut captured = None;
        let node = Builder::build(
            &config,
            None,
            "object",
            Call::new().block(|o| {
                o.set("title", "User")?.set("min_properties", 1)?;
                let id = o.string(Call::named("id").attr("required", true))?;
                captured = Some(id);
                o.integer("age")?;
                Ok(())
            }),
        )
        .unwrap();
        let names: Vec<_> = node.children().iter().filter_map(Node::name).collect();
        assert_eq!(names, vec![&Name::from("id"), &Name::from("age")]);
        assert_eq!(captured.as_ref(), Some(&node.children()[0]));
    }

    #[test]
    fn test_get_and_invoke_read() {
        let config = SchemaConfig::new();
        let node = Builder::build(&config, None, "string", Call::new().attr("max_length", 5))
            .unwrap();
        let mut builder = Builder {
            node,
            config: &config,
            scope: None,
        };
        assert_eq!(builder.get("maxLength").unwrap(), Some(&AttrValue::from(5)));
        assert!(builder.get("minimum").is_err());
        assert_eq!(
            builder.invoke("max_length", Call::new()).unwrap(),
            Outcome::Value(Some(AttrValue::from(5)))
        );
        assert_eq!(
            builder.invoke("min_length", Call::new().value(2)).unwrap(),
            Outcome::Value(Some(AttrValue::from(2)))
        );
    }

    #[test]
    fn test_set_schema_builds_nested_node() {
        let config = SchemaConfig::new();
        let node = Builder::build(
            &config,
            None,
            "array",
            Call::new().block(|a| {
                a.set_schema("items", Call::new().block(|i| {
                    i.string(Call::new())?;
                    Ok(())
                }))?;
                a.set_schema("additional_items", Call::new().kind("boolean"))?;
                Ok(())
            }),
        )
        .unwrap();
        assert_eq!(
            node.to_plain(),
            json!({
                "kind": "array",
                "items": { "kind": "object", "children": [ { "kind": "string" } ] },
                "additional_items": { "kind": "boolean" }
            })
        );
    }

    #[test]
    fn test_invoke_with_attributes_builds_nested_node() {
        let config = SchemaConfig::new();
        let mut builder = Builder {
            node: Builder::build(&config, None, "object", Call::new()).unwrap(),
            config: &config,
            scope: None,
        };
        let outcome = builder
            .invoke("not", Call::new().attr("title", "Empty"))
            .unwrap();
        let Outcome::Value(Some(AttrValue::Node(nested))) = outcome else {
            panic!("expected a nested node");
        };
        assert_eq!(nested.to_plain(), json!({ "kind": "object", "title": "Empty" }));

        let err = builder
            .invoke("max_properties", Call::new().attr("title", "x"))
            .unwrap_err();
        assert!(matches!(
            err,
            DslError::InvalidAttribute { ref attribute, .. } if attribute == "max_properties"
        ));

        let err = builder
            .invoke("title", Call::new().value("T").attr("title", "x"))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Construction);
        assert!(builder.node().get("title").is_none());
    }

    #[test]
    fn test_numeric_shorthand() {
        let config = SchemaConfig::new();
        let node = Builder::build(
            &config,
            None,
            "object",
            Call::new().block(|o| {
                o.numeric(Call::named("ratio").attr("maximum", 1.5))?;
                Ok(())
            }),
        )
        .unwrap();
        let ratio = &node.children()[0];
        assert_eq!(ratio.kind(), "numeric");
        assert_eq!(ratio.get("maximum"), Some(&AttrValue::from(1.5)));
    }

    #[test]
    fn test_invoke_routes_kinds_and_registry_changes() {
        let config = SchemaConfig::new().with_kind(KindDefinition::new("date"));
        let mut builder = Builder {
            node: Builder::build(&config, None, "object", Call::new()).unwrap(),
            config: &config,
            scope: None,
        };
        assert!(builder.responds_to("date"));
        let outcome = builder.invoke("date", "born").unwrap();
        assert!(matches!(outcome, Outcome::Node(ref n) if n.kind() == "date"));
        assert_eq!(builder.node().children().len(), 1);

        let plain = SchemaConfig::new();
        let builder = Builder {
            node: Builder::build(&plain, None, "object", Call::new()).unwrap(),
            config: &plain,
            scope: None,
        };
        assert!(!builder.responds_to("date"));
    }

    #[test]
    fn test_scope_delegation() {
        let config = SchemaConfig::new();
        let helper_config = config.clone();
        let scope = HelperScope::new()
            .with_helper("uuid", move |args: &[AttrValue]| {
                let name = args
                    .first()
                    .and_then(AttrValue::as_json)
                    .and_then(Value::as_str)
                    .unwrap_or("id")
                    .to_string();
                let call = Call::named(name).attr("format", "uuid");
                Builder::build(&helper_config, None, "string", call)
            })
            .with_helper("version", |_| Ok(json!("1.0")));

        let mut builder = Builder {
            node: Builder::build(&config, Some(&scope), "object", Call::new()).unwrap(),
            config: &config,
            scope: Some(&scope),
        };
        assert!(builder.responds_to("uuid"));
        let added = builder.invoke("uuid", Call::new().arg("user_id")).unwrap();
        assert!(matches!(added, Outcome::Node(_)));
        assert_eq!(builder.node().children()[0].name(), Some(&Name::from("user_id")));

        let raw = builder.invoke("version", Call::new()).unwrap();
        assert_eq!(raw, Outcome::Raw(json!("1.0")));
        assert_eq!(builder.node().children().len(), 1);

        let err = builder.invoke("missing", Call::new()).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::NoSuchOperation);
    }
}
