//! `:::panel type="warning"` … `:::`

use adfmark_core::{Node, NodeType, PluginError};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{expect_children, expect_type, or_filler};
use crate::registry::{Parsed, Plugin, PluginInput, RenderContext};

/// Panel types the document format accepts.
pub const PANEL_TYPES: &[&str] = &["info", "note", "warning", "success", "error"];

static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:{3,}\s*panel(?:$|[\s\[{])").expect("valid panel regex"));

/// Maps a requested type onto [`PANEL_TYPES`]; unknown types become `info`.
pub fn normalize_panel_type(raw: &str) -> &'static str {
    let raw = raw.trim();
    PANEL_TYPES
        .iter()
        .copied()
        .find(|t| t.eq_ignore_ascii_case(raw))
        .unwrap_or("info")
}

/// Builds a panel node; empty content gets a filler paragraph.
pub fn panel_node(panel_type: &str, content: Vec<Node>) -> Node {
    Node::container(NodeType::Panel, or_filler(content))
        .with_attr("panelType", normalize_panel_type(panel_type))
}

/// Colored callout box.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanelPlugin;

impl Plugin for PanelPlugin {
    fn name(&self) -> &str {
        "panel"
    }

    fn block_pattern(&self) -> Option<&Regex> {
        Some(&BLOCK_RE)
    }

    fn parse(&self, input: PluginInput<'_>) -> Result<Option<Parsed>, PluginError> {
        let PluginInput::Block { opening, body } = input else {
            return Ok(None);
        };
        let panel_type = normalize_panel_type(opening.attr("type").unwrap_or("info"));
        Ok(Some(Parsed::with_body(body).attr("panelType", panel_type)))
    }

    fn render(&self, parsed: Parsed, ctx: &mut dyn RenderContext) -> Result<Node, PluginError> {
        let content = ctx.render_blocks(&parsed.body)?;
        Ok(panel_node(
            parsed.attr_str("panelType").unwrap_or("info"),
            content,
        ))
    }

    fn validate(&self, node: &Node) -> Result<(), PluginError> {
        expect_type(node, NodeType::Panel)?;
        expect_children(node)?;
        match node.attr_str("panelType") {
            Some(t) if PANEL_TYPES.contains(&t) => Ok(()),
            other => Err(PluginError::attribute(
                "panelType",
                other.unwrap_or("<missing>"),
            )),
        }
    }
}
