//! `:::expand title="More"` … `:::`

use adfmark_core::{Node, NodeType, PluginError};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{expect_children, expect_type, or_filler};
use crate::registry::{Parsed, Plugin, PluginInput, RenderContext};

/// Title used when the directive names none.
pub const DEFAULT_EXPAND_TITLE: &str = "Click to expand";

static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:{3,}\s*expand(?:$|[\s\[{])").expect("valid expand regex"));

/// Collapsible section.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpandPlugin;

impl Plugin for ExpandPlugin {
    fn name(&self) -> &str {
        "expand"
    }

    fn block_pattern(&self) -> Option<&Regex> {
        Some(&BLOCK_RE)
    }

    fn parse(&self, input: PluginInput<'_>) -> Result<Option<Parsed>, PluginError> {
        let PluginInput::Block { opening, body } = input else {
            return Ok(None);
        };
        let title = opening
            .title()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_EXPAND_TITLE);
        Ok(Some(Parsed::with_body(body).attr("title", title)))
    }

    fn render(&self, parsed: Parsed, ctx: &mut dyn RenderContext) -> Result<Node, PluginError> {
        let content = ctx.render_blocks(&parsed.body)?;
        let title = parsed.attr_str("title").unwrap_or(DEFAULT_EXPAND_TITLE);
        Ok(Node::container(NodeType::Expand, or_filler(content)).with_attr("title", title))
    }

    fn validate(&self, node: &Node) -> Result<(), PluginError> {
        expect_type(node, NodeType::Expand)?;
        expect_children(node)?;
        if node.attr_str("title").is_none() {
            return Err(PluginError::attribute("title", "<missing>"));
        }
        Ok(())
    }
}
