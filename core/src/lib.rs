#![deny(missing_docs)]

//! # Schema DSL Core
//!
//! Describe a document shape with nested builder calls and compile it into a
//! JSON Schema document.
//!
//! ```
//! use schema_dsl_core::{Call, Dsl};
//!
//! let schema = Dsl::new()
//!     .object(Call::new().attr("additional_properties", false).block(|o| {
//!         o.string(Call::named("name").attr("required", true))?;
//!         Ok(())
//!     }))
//!     .unwrap();
//! assert_eq!(schema["required"][0], "name");
//! ```

/// Shared error types.
pub mod error;

/// Immutable schema nodes.
pub mod node;

/// Kind definitions and the kind registry.
pub mod kind;

/// Registry and pass-chain configuration.
pub mod config;

/// Host scope delegation.
pub mod scope;

/// The node builder.
pub mod builder;

/// Tree-rewriting render passes.
pub mod render;

/// Top-level construction operations.
pub mod dsl;

/// Serialization of rendered documents.
pub mod output;

pub use builder::{Block, Builder, Call, Outcome};
pub use config::{
    default_passes, register_kind, reset, reset_kind_defaults, reset_kinds, reset_render_passes,
    set_kind_defaults, set_render_passes, SchemaConfig,
};
pub use dsl::Dsl;
pub use error::{DslError, DslResult, ErrorCategory};
pub use kind::{AttrType, KindDefinition, KindRegistry, GENERIC_KIND};
pub use node::{attr, AttrValue, Attributes, Name, Node, Pattern, KIND_TAG, PATTERN_TAG};
pub use output::Document;
pub use render::{render, Alias, Desugar, Filter, Multiplexer, RenderContext, RenderPass};
pub use scope::{HelperScope, Scope, ScopeValue};
