//! `{status:color=green}Done{/status}`

use adfmark_core::{Node, NodeType, PluginError};
use once_cell::sync::Lazy;
use regex::Regex;

use super::expect_type;
use crate::registry::{Parsed, Plugin, PluginInput, RenderContext};

static INLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{status:color=([A-Za-z]+)\}(.*?)\{/status\}").expect("valid status regex")
});

/// Maps a requested color onto the lozenge palette.
pub fn normalize_status_color(raw: &str) -> &'static str {
    match raw.trim().to_ascii_lowercase().as_str() {
        "green" | "success" => "green",
        "yellow" | "orange" | "warning" => "yellow",
        "red" | "error" => "red",
        "blue" | "info" => "blue",
        "purple" => "purple",
        _ => "neutral",
    }
}

/// Builds a status lozenge.
pub fn status_node(text: &str, color: &str) -> Node {
    Node::leaf(NodeType::Status)
        .with_attr("text", text.trim())
        .with_attr("color", normalize_status_color(color))
}

/// Colored status lozenge.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusPlugin;

impl Plugin for StatusPlugin {
    fn name(&self) -> &str {
        "status"
    }

    fn inline_pattern(&self) -> Option<&Regex> {
        Some(&INLINE_RE)
    }

    fn parse(&self, input: PluginInput<'_>) -> Result<Option<Parsed>, PluginError> {
        let PluginInput::Inline { captures, .. } = input else {
            return Ok(None);
        };
        Ok(Some(
            Parsed::with_body(captures[2].trim())
                .attr("color", normalize_status_color(&captures[1])),
        ))
    }

    fn render(&self, parsed: Parsed, _ctx: &mut dyn RenderContext) -> Result<Node, PluginError> {
        Ok(status_node(
            &parsed.body,
            parsed.attr_str("color").unwrap_or("neutral"),
        ))
    }

    fn validate(&self, node: &Node) -> Result<(), PluginError> {
        expect_type(node, NodeType::Status)?;
        if node.attr_str("text").is_none() {
            return Err(PluginError::attribute("text", "<missing>"));
        }
        Ok(())
    }
}
