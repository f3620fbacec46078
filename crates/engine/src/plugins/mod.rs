//! Built-in node-type plugins.
//!
//! Block plugins (panel, expand, media, layout) claim `:::name` directives.
//! Inline plugins (status, date, mention, emoji) claim patterns inside text.
//! The node constructors are shared with the sentinel path in the inline
//! parser, so `{status:green}x{status}` and `{status:color=green}x{/status}`
//! produce the same node.

mod date;
mod emoji;
mod expand;
mod layout;
mod media;
mod mention;
mod panel;
mod status;

pub use date::{DatePlugin, date_node};
pub use emoji::{EmojiPlugin, emoji_glyph, emoji_node};
pub use expand::{DEFAULT_EXPAND_TITLE, ExpandPlugin};
pub use layout::LayoutPlugin;
pub use media::MediaPlugin;
pub use mention::{MentionPlugin, mention_id, mention_node};
pub use panel::{PANEL_TYPES, PanelPlugin, normalize_panel_type, panel_node};
pub use status::{StatusPlugin, normalize_status_color, status_node};

use adfmark_core::{Node, NodeType, PluginError};

/// Fails unless `node` has the expected type.
pub(crate) fn expect_type(node: &Node, expected: NodeType) -> Result<(), PluginError> {
    if node.node_type == expected {
        Ok(())
    } else {
        Err(PluginError::Validation(format!(
            "expected `{expected}`, found `{}`",
            node.node_type
        )))
    }
}

/// Fails when a container has no children.
pub(crate) fn expect_children(node: &Node) -> Result<(), PluginError> {
    if node.children().is_empty() {
        Err(PluginError::Validation(format!(
            "`{}` needs at least one child",
            node.node_type
        )))
    } else {
        Ok(())
    }
}

/// Container content, or a single filler paragraph when it is empty.
pub(crate) fn or_filler(content: Vec<Node>) -> Vec<Node> {
    if content.is_empty() {
        vec![Node::empty_paragraph()]
    } else {
        content
    }
}
