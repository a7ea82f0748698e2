#![deny(missing_docs)]

//! # Scope Delegation
//!
//! A construction block may call helpers defined by its host. Builders consult
//! the scope only after their own attributes and kinds; node results are folded
//! into the tree like any other child.

use crate::error::DslResult;
use crate::node::{AttrValue, Node};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// What a helper produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeValue {
    /// A renderable node; adopted as a child of the calling builder.
    Node(Node),
    /// Anything else; handed back to the caller untouched.
    Raw(Value),
}

impl From<Node> for ScopeValue {
    fn from(value: Node) -> Self {
        ScopeValue::Node(value)
    }
}

impl From<Value> for ScopeValue {
    fn from(value: Value) -> Self {
        ScopeValue::Raw(value)
    }
}

/// Capability implemented by the host environment.
pub trait Scope {
    /// Whether `operation` can be invoked.
    fn responds_to(&self, operation: &str) -> bool;

    /// Invokes `operation`. `None` means the scope has no such operation.
    fn try_invoke(&self, operation: &str, args: &[AttrValue]) -> Option<DslResult<ScopeValue>>;
}

type Helper = Box<dyn Fn(&[AttrValue]) -> DslResult<ScopeValue> + Send + Sync>;

/// A scope made of named closures.
#[derive(Default)]
pub struct HelperScope {
    helpers: HashMap<String, Helper>,
}

impl fmt::Debug for HelperScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.helpers.keys().collect();
        names.sort();
        f.debug_struct("HelperScope").field("helpers", &names).finish()
    }
}

impl HelperScope {
    /// An empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a helper.
    pub fn with_helper<F, R>(mut self, name: impl Into<String>, helper: F) -> Self
    where
        F: Fn(&[AttrValue]) -> DslResult<R> + Send + Sync + 'static,
        R: Into<ScopeValue>,
    {
        self.helpers
            .insert(name.into(), Box::new(move |args: &[AttrValue]| helper(args).map(Into::into)));
        self
    }
}

impl Scope for HelperScope {
    fn responds_to(&self, operation: &str) -> bool {
        self.helpers.contains_key(operation)
    }

    fn try_invoke(&self, operation: &str, args: &[AttrValue]) -> Option<DslResult<ScopeValue>> {
        let helper = self.helpers.get(operation)?;
        tracing::trace!(operation, args = args.len(), "invoking scope helper");
        Some(helper(args))
    }
}
