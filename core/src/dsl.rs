#![deny(missing_docs)]

//! # DSL Surface
//!
//! Top-level construction operations. `Dsl` pairs a configuration with an
//! optional host scope and exposes one operation per registered kind, either
//! by identifier ([`Dsl::render`], [`Dsl::node`]) or through the typed
//! shorthands for the built-in kinds. Inside blocks the same operations are
//! available on [`Builder`].

use crate::builder::{Builder, Call};
use crate::config::{self, SchemaConfig};
use crate::error::DslResult;
use crate::kind::GENERIC_KIND;
use crate::node::Node;
use crate::output::Document;
use crate::render;
use crate::scope::Scope;
use serde_json::Value;
use std::borrow::Cow;

/// Entry point for building schemas.
pub struct Dsl<'a> {
    config: Cow<'a, SchemaConfig>,
    scope: Option<&'a dyn Scope>,
}

impl Default for Dsl<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Dsl<'static> {
    /// Uses a snapshot of the process-wide configuration.
    pub fn new() -> Self {
        Self {
            config: Cow::Owned(config::snapshot()),
            scope: None,
        }
    }
}

impl<'a> Dsl<'a> {
    /// Uses an explicit configuration.
    pub fn with_config(config: &'a SchemaConfig) -> Self {
        Self {
            config: Cow::Borrowed(config),
            scope: None,
        }
    }

    /// Makes `scope`'s helpers callable from every block.
    pub fn with_scope(mut self, scope: &'a dyn Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Whether `kind` has a construction operation.
    pub fn responds_to(&self, kind: &str) -> bool {
        self.config.kinds().contains(kind)
    }

    /// Builds a raw node of `kind`.
    pub fn node<'b>(&self, kind: &str, call: impl Into<Call<'b>>) -> DslResult<Node> {
        Builder::build(&self.config, self.scope, kind, call.into())
    }

    /// Builds and renders a node of `kind`.
    pub fn render<'b>(&self, kind: &str, call: impl Into<Call<'b>>) -> DslResult<Value> {
        let node = self.node(kind, call)?;
        render::render(&node, &self.config, self.scope)
    }

    /// Builds and renders a node of `kind` into a [`Document`].
    pub fn document<'b>(&self, kind: &str, call: impl Into<Call<'b>>) -> DslResult<Document> {
        self.render(kind, call).map(Document::new)
    }

    /// Renders a generic node.
    pub fn entity<'b>(&self, call: impl Into<Call<'b>>) -> DslResult<Value> {
        self.render(GENERIC_KIND, call)
    }

    /// Renders a `null` node.
    pub fn null<'b>(&self, call: impl Into<Call<'b>>) -> DslResult<Value> {
        self.render("null", call)
    }

    /// Renders a `boolean` node.
    pub fn boolean<'b>(&self, call: impl Into<Call<'b>>) -> DslResult<Value> {
        self.render("boolean", call)
    }

    /// Renders a `string` node.
    pub fn string<'b>(&self, call: impl Into<Call<'b>>) -> DslResult<Value> {
        self.render("string", call)
    }

    /// Renders a `numeric` node.
    pub fn numeric<'b>(&self, call: impl Into<Call<'b>>) -> DslResult<Value> {
        self.render("numeric", call)
    }

    /// Renders a `number` node.
    pub fn number<'b>(&self, call: impl Into<Call<'b>>) -> DslResult<Value> {
        self.render("number", call)
    }

    /// Renders an `integer` node.
    pub fn integer<'b>(&self, call: impl Into<Call<'b>>) -> DslResult<Value> {
        self.render("integer", call)
    }

    /// Renders an `array` node.
    pub fn array<'b>(&self, call: impl Into<Call<'b>>) -> DslResult<Value> {
        self.render("array", call)
    }

    /// Renders an `object` node.
    pub fn object<'b>(&self, call: impl Into<Call<'b>>) -> DslResult<Value> {
        self.render("object", call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DslError;
    use crate::kind::KindDefinition;
    use crate::node::AttrValue;
    use serde_json::json;

    #[test]
    fn test_render_by_identifier() {
        let config = SchemaConfig::new();
        let dsl = Dsl::with_config(&config);
        let out = dsl
            .render("string", Call::new().attr("min_length", 2).attr("nullable", false))
            .unwrap();
        assert_eq!(out, json!({ "type": "string", "minLength": 2 }));
    }

    #[test]
    fn test_numeric_renders_as_number() {
        let config = SchemaConfig::new();
        let dsl = Dsl::with_config(&config);
        let out = dsl
            .numeric(Call::new().attr("minimum", 0).attr("multiple_of", 0.5))
            .unwrap();
        assert_eq!(out, json!({ "type": "number", "minimum": 0, "multipleOf": 0.5 }));
        assert_eq!(dsl.number(Call::new()).unwrap(), json!({ "type": "number" }));
    }

    #[test]
    fn test_registered_kind_gets_an_operation() {
        let config = SchemaConfig::new()
            .with_kind(KindDefinition::new("date").with_type_name("string"));
        let dsl = Dsl::with_config(&config);
        assert!(dsl.responds_to("date"));
        let out = dsl.render("date", Call::new()).unwrap();
        assert_eq!(out, json!({ "type": "string" }));
    }

    #[test]
    fn test_reset_kinds_retracts_operations() {
        let mut config = SchemaConfig::new().with_kind(KindDefinition::new("date"));
        config.reset_kinds();
        let dsl = Dsl::with_config(&config);
        assert!(!dsl.responds_to("date"));
        assert!(matches!(dsl.node("date", Call::new()), Err(DslError::UnknownKind(_))));
    }

    #[test]
    fn test_kind_defaults_apply_to_later_builds_only() {
        let mut config = SchemaConfig::new();
        let before = Dsl::with_config(&config).node("object", Call::new()).unwrap();
        config
            .set_kind_defaults("object", vec![("additional_properties", AttrValue::from(false))])
            .unwrap();
        let after = Dsl::with_config(&config).node("object", Call::new()).unwrap();
        assert!(before.get("additional_properties").is_none());
        assert_eq!(after.get("additional_properties"), Some(&AttrValue::from(false)));
    }
}
