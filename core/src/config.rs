#![deny(missing_docs)]

//! # Configuration
//!
//! `SchemaConfig` bundles the kind registry and the render pass chain. Every
//! builder and render call takes one explicitly; the process-wide instance
//! below is a convenience for callers that do not need isolation.
//!
//! Mutating the global instance takes a write lock, so concurrent setup does
//! not tear, but builders only see changes made before they took their
//! [`snapshot`].

use crate::error::DslResult;
use crate::kind::{KindDefinition, KindRegistry};
use crate::node::AttrValue;
use crate::render::{Alias, Desugar, Filter, Multiplexer, RenderPass};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

/// The default chain: Desugar, Multiplexer, Alias, Filter.
pub fn default_passes() -> Vec<Arc<dyn RenderPass>> {
    vec![
        Arc::new(Desugar),
        Arc::new(Multiplexer),
        Arc::new(Alias),
        Arc::new(Filter),
    ]
}

/// Kind registry plus render pass chain.
#[derive(Debug, Clone)]
pub struct SchemaConfig {
    kinds: KindRegistry,
    passes: Vec<Arc<dyn RenderPass>>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            kinds: KindRegistry::builtin(),
            passes: default_passes(),
        }
    }
}

impl SchemaConfig {
    /// Built-in kinds and the default pass chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the kind registry.
    pub fn with_kinds(mut self, kinds: KindRegistry) -> Self {
        self.kinds = kinds;
        self
    }

    /// Registers one more kind.
    pub fn with_kind(mut self, definition: KindDefinition) -> Self {
        self.kinds.register(definition);
        self
    }

    /// Replaces the pass chain.
    pub fn with_passes(mut self, passes: Vec<Arc<dyn RenderPass>>) -> Self {
        self.passes = passes;
        self
    }

    /// The kind registry.
    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    /// The pass chain, in application order.
    pub fn passes(&self) -> &[Arc<dyn RenderPass>] {
        &self.passes
    }

    /// Adds or replaces a kind.
    pub fn register_kind(&mut self, definition: KindDefinition) {
        self.kinds.register(definition);
    }

    /// Restores the built-in kinds (and drops all defaults).
    pub fn reset_kinds(&mut self) {
        self.kinds.reset();
    }

    /// Merges `partial` into the defaults of `kind`.
    pub fn set_kind_defaults<I, K>(&mut self, kind: &str, partial: I) -> DslResult<()>
    where
        I: IntoIterator<Item = (K, AttrValue)>,
        K: AsRef<str>,
    {
        self.kinds.set_defaults(kind, partial)
    }

    /// Clears every kind's defaults.
    pub fn reset_kind_defaults(&mut self) {
        self.kinds.reset_defaults();
    }

    /// Replaces the pass chain.
    pub fn set_render_passes(&mut self, passes: Vec<Arc<dyn RenderPass>>) {
        tracing::debug!(
            passes = ?passes.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            "replacing render passes"
        );
        self.passes = passes;
    }

    /// Restores the default pass chain.
    pub fn reset_render_passes(&mut self) {
        self.passes = default_passes();
    }

    /// Restores built-in kinds, no defaults and the default pass chain.
    pub fn reset(&mut self) {
        tracing::debug!("resetting schema configuration");
        *self = Self::default();
    }
}

static GLOBAL: LazyLock<RwLock<SchemaConfig>> =
    LazyLock::new(|| RwLock::new(SchemaConfig::default()));

fn with_global<T>(f: impl FnOnce(&mut SchemaConfig) -> T) -> T {
    let mut guard = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

/// A copy of the process-wide configuration.
pub fn snapshot() -> SchemaConfig {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Registers a kind process-wide.
pub fn register_kind(definition: KindDefinition) {
    with_global(|config| config.register_kind(definition));
}

/// Restores the built-in kinds process-wide.
pub fn reset_kinds() {
    with_global(SchemaConfig::reset_kinds);
}

/// Merges defaults for `kind` process-wide.
pub fn set_kind_defaults<I, K>(kind: &str, partial: I) -> DslResult<()>
where
    I: IntoIterator<Item = (K, AttrValue)>,
    K: AsRef<str>,
{
    with_global(|config| config.set_kind_defaults(kind, partial))
}

/// Clears all kind defaults process-wide.
pub fn reset_kind_defaults() {
    with_global(SchemaConfig::reset_kind_defaults);
}

/// Replaces the process-wide pass chain.
pub fn set_render_passes(passes: Vec<Arc<dyn RenderPass>>) {
    with_global(|config| config.set_render_passes(passes));
}

/// Restores the default pass chain process-wide.
pub fn reset_render_passes() {
    with_global(SchemaConfig::reset_render_passes);
}

/// Restores the whole process-wide configuration.
pub fn reset() {
    with_global(SchemaConfig::reset);
}
