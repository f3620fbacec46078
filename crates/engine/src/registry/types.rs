//! Plugin interface: how a node type is detected, parsed, rendered, and checked.

use adfmark_core::directives::DirectiveOpening;
use adfmark_core::{Attrs, ConvertError, Node, PluginError};
use regex::{Captures, Regex};

use crate::config::Limits;

/// What a plugin's detection pattern matched.
#[derive(Debug)]
pub enum PluginInput<'a> {
    /// A `:::name` directive block whose opener matched the block pattern.
    Block {
        /// Parsed opener line.
        opening: &'a DirectiveOpening,
        /// Raw body between the opener and its closer.
        body: &'a str,
    },
    /// An inline pattern match inside a run of text.
    Inline {
        /// Captures of the plugin's inline pattern.
        captures: &'a Captures<'a>,
        /// Text the pattern was run against.
        haystack: &'a str,
    },
}

/// Output of a plugin's parse step, consumed by its render step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    /// Attributes destined for the rendered node.
    pub attrs: Attrs,
    /// Text payload: nested markdown for containers, label text for leaves.
    pub body: String,
}

impl Parsed {
    /// Creates parsed output with a body and no attributes.
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            attrs: Attrs::new(),
            body: body.into(),
        }
    }

    /// Sets an attribute, returning self.
    pub fn attr(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// Reads a string attribute.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(serde_json::Value::as_str)
    }
}

/// A piece of text after the inline plugin pass.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineSegment {
    /// Text no plugin claimed.
    Text(String),
    /// A node rendered by a plugin.
    Node(Node),
}

/// Services a plugin may call while rendering.
///
/// Container plugins use `render_blocks` for their body; it tracks nesting
/// depth and returns a truncation notice instead of descending past the limit.
pub trait RenderContext {
    /// Converts nested markdown into block nodes, one nesting level deeper.
    fn render_blocks(&mut self, markdown: &str) -> Result<Vec<Node>, ConvertError>;

    /// Converts a run of inline text into leaf nodes.
    fn render_inline(&mut self, text: &str) -> Vec<Node>;

    /// Active truncation limits.
    fn limits(&self) -> &Limits;

    /// Current nesting depth (0 at the document root).
    fn depth(&self) -> usize;
}

/// A node-type handler.
///
/// Plugins are stateless and shared across threads. A plugin claims block
/// input, inline input, or both, by returning a pattern.
pub trait Plugin: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    /// Pattern tested against a trimmed `:::name …` opener line.
    fn block_pattern(&self) -> Option<&Regex> {
        None
    }

    /// Pattern searched for in runs of inline text.
    fn inline_pattern(&self) -> Option<&Regex> {
        None
    }

    /// Extracts attributes and payload. `Ok(None)` declines the match, which
    /// leaves the text as it was.
    fn parse(&self, input: PluginInput<'_>) -> Result<Option<Parsed>, PluginError>;

    /// Builds the node.
    fn render(&self, parsed: Parsed, ctx: &mut dyn RenderContext) -> Result<Node, PluginError>;

    /// Checks a rendered node against the schema rules this plugin owns.
    fn validate(&self, _node: &Node) -> Result<(), PluginError> {
        Ok(())
    }

    /// True when the plugin handles `:::` blocks.
    fn is_block(&self) -> bool {
        self.block_pattern().is_some()
    }

    /// True when the plugin handles inline text.
    fn is_inline(&self) -> bool {
        self.inline_pattern().is_some()
    }
}

impl std::fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .field("block", &self.is_block())
            .field("inline", &self.is_inline())
            .finish()
    }
}
