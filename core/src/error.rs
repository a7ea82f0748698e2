#![deny(missing_docs)]

//! # Error Handling
//!
//! Provides the unified `DslError` enum used by construction, dispatch and rendering.

use derive_more::{Display, From};

/// Broad failure classes a host can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad attribute, bad attribute value or unknown kind at build time.
    Construction,
    /// A builder operation that nothing could answer.
    NoSuchOperation,
    /// A render pass met a tree shape it cannot interpret.
    Render,
    /// Anything else (serialization, helper failures).
    General,
}

/// The Global Error Enum.
///
/// Only `General` and `InvalidPattern` get `From` conversions; every other
/// variant must be built explicitly so that it carries the offending key.
#[derive(Debug, Display, From)]
pub enum DslError {
    /// The attribute is not declared for the kind (nor in the common set).
    #[from(ignore)]
    #[display("Unknown attribute '{attribute}' for kind '{kind}'")]
    UnknownAttribute {
        /// Kind identifier of the node being built.
        kind: String,
        /// The rejected attribute name.
        attribute: String,
    },

    /// The attribute exists but the value does not fit its declared type.
    #[from(ignore)]
    #[display("Invalid value for '{attribute}' on kind '{kind}': expected {expected}")]
    InvalidAttribute {
        /// Kind identifier of the node being built.
        kind: String,
        /// The attribute being written.
        attribute: String,
        /// Human readable description of the accepted type.
        expected: String,
    },

    /// The kind identifier is not in the registry.
    #[from(ignore)]
    #[display("Unknown kind '{_0}'")]
    UnknownKind(String),

    /// A pattern name that is not a valid regular expression.
    #[display("Invalid pattern: {_0}")]
    InvalidPattern(regex::Error),

    /// Neither an attribute, a registered kind, nor a scope helper.
    #[from(ignore)]
    #[display("No such operation '{_0}'")]
    NoSuchOperation(String),

    /// A render pass aborted.
    #[from(ignore)]
    #[display("Render Error in {pass} at '{path}': {message}")]
    Render {
        /// Name of the failing pass.
        pass: String,
        /// Key path of the offending node, `/`-separated.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

impl DslError {
    /// Classifies the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            DslError::UnknownAttribute { .. }
            | DslError::InvalidAttribute { .. }
            | DslError::UnknownKind(_)
            | DslError::InvalidPattern(_) => ErrorCategory::Construction,
            DslError::NoSuchOperation(_) => ErrorCategory::NoSuchOperation,
            DslError::Render { .. } => ErrorCategory::Render,
            DslError::General(_) => ErrorCategory::General,
        }
    }

    pub(crate) fn render(pass: &str, path: &str, message: impl Into<String>) -> Self {
        DslError::Render {
            pass: pass.to_string(),
            path: if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            },
            message: message.into(),
        }
    }
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for DslError {}

/// Helper type alias for Result using DslError.
pub type DslResult<T> = Result<T, DslError>;
