use thiserror::Error;

/// Errors that can occur while converting markdown into a document tree.
///
/// None of these reach the caller of the conversion entry point: they are
/// folded into an error document at the outermost boundary.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A plugin returned an error or panicked while handling a match.
    #[error("Plugin `{name}` failed: {message}")]
    Plugin {
        /// Plugin name
        name: String,
        /// Failure description
        message: String,
    },
    /// A node attribute fell outside the schema's allowed range.
    #[error("Invalid `{attribute}` on {node}: {value}")]
    InvalidAttribute {
        /// Node type tag
        node: String,
        /// Attribute name
        attribute: String,
        /// Offending value
        value: String,
    },
    /// A serialized document violated the fixed root shape.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The pipeline panicked outside any plugin step.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Create an attribute range error
    pub fn invalid_attribute(
        node: impl Into<String>,
        attribute: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self::InvalidAttribute {
            node: node.into(),
            attribute: attribute.into(),
            value: value.to_string(),
        }
    }

    /// Attach a plugin name to a plugin failure
    pub fn from_plugin(name: impl Into<String>, err: PluginError) -> Self {
        Self::Plugin {
            name: name.into(),
            message: err.to_string(),
        }
    }
}

/// Errors returned by node-type plugins from their parse and render steps.
///
/// The registry logs and skips a plugin that returns one of these; the rest
/// of the pass continues.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The matched text does not follow the plugin's syntax.
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),
    /// An attribute value was rejected.
    #[error("invalid attribute `{key}`: {value}")]
    InvalidAttribute {
        /// Attribute name
        key: String,
        /// Offending value
        value: String,
    },
    /// The rendered node failed the plugin's own validator.
    #[error("rendered node failed validation: {0}")]
    Validation(String),
    /// Converting nested content failed.
    #[error("nested conversion failed: {0}")]
    Nested(#[from] ConvertError),
}

impl PluginError {
    /// Create a syntax error
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::InvalidSyntax(message.into())
    }

    /// Create an attribute error
    pub fn attribute(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            key: key.into(),
            value: value.into(),
        }
    }
}
