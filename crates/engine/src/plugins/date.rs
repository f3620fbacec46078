//! `{date:2024-03-01}`

use adfmark_core::{DateValue, Node, NodeType, PluginError};
use once_cell::sync::Lazy;
use regex::Regex;

use super::expect_type;
use crate::registry::{Parsed, Plugin, PluginInput, RenderContext};

static INLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{date:([^}\n]*)\}").expect("valid date regex"));

/// Builds a date node; the timestamp attribute is epoch milliseconds as a string.
pub fn date_node(value: DateValue) -> Node {
    Node::leaf(NodeType::Date).with_attr("timestamp", value.timestamp_millis().to_string())
}

/// Calendar date chip.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatePlugin;

impl Plugin for DatePlugin {
    fn name(&self) -> &str {
        "date"
    }

    fn inline_pattern(&self) -> Option<&Regex> {
        Some(&INLINE_RE)
    }

    fn parse(&self, input: PluginInput<'_>) -> Result<Option<Parsed>, PluginError> {
        let PluginInput::Inline { captures, .. } = input else {
            return Ok(None);
        };
        Ok(Some(Parsed::with_body(captures[1].trim())))
    }

    fn render(&self, parsed: Parsed, _ctx: &mut dyn RenderContext) -> Result<Node, PluginError> {
        Ok(date_node(DateValue::parse(&parsed.body)))
    }

    fn validate(&self, node: &Node) -> Result<(), PluginError> {
        expect_type(node, NodeType::Date)?;
        match node.attr_str("timestamp") {
            Some(ts) if ts.parse::<i64>().is_ok() => Ok(()),
            other => Err(PluginError::attribute(
                "timestamp",
                other.unwrap_or("<missing>"),
            )),
        }
    }
}
