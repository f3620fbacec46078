//! `@alice` and `@[Ada Lovelace]`

use adfmark_core::{Node, NodeType, PluginError};
use once_cell::sync::Lazy;
use regex::Regex;

use super::expect_type;
use crate::registry::{Parsed, Plugin, PluginInput, RenderContext};

static INLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@(?:\[([^\]\n]+)\]|([A-Za-z][A-Za-z0-9_]*(?:[.\-][A-Za-z0-9_]+)*))")
        .expect("valid mention regex")
});

/// Lowercased name with each space replaced by a dot.
pub fn mention_id(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', ".")
}

/// Builds a mention node.
pub fn mention_node(name: &str) -> Node {
    let name = name.trim();
    Node::leaf(NodeType::Mention)
        .with_attr("id", mention_id(name))
        .with_attr("text", format!("@{name}"))
}

/// User mention.
#[derive(Debug, Default, Clone, Copy)]
pub struct MentionPlugin;

impl Plugin for MentionPlugin {
    fn name(&self) -> &str {
        "mention"
    }

    fn inline_pattern(&self) -> Option<&Regex> {
        Some(&INLINE_RE)
    }

    fn parse(&self, input: PluginInput<'_>) -> Result<Option<Parsed>, PluginError> {
        let PluginInput::Inline { captures, haystack } = input else {
            return Ok(None);
        };
        let Some(whole) = captures.get(0) else {
            return Ok(None);
        };
        // `a@b.com` is an address, not a mention
        let preceding = haystack[..whole.start()].chars().next_back();
        if preceding.is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return Ok(None);
        }
        let name = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Some(Parsed::with_body(name)))
    }

    fn render(&self, parsed: Parsed, _ctx: &mut dyn RenderContext) -> Result<Node, PluginError> {
        Ok(mention_node(&parsed.body))
    }

    fn validate(&self, node: &Node) -> Result<(), PluginError> {
        expect_type(node, NodeType::Mention)?;
        match node.attr_str("id") {
            Some(id) if !id.is_empty() => Ok(()),
            _ => Err(PluginError::attribute("id", "<empty>")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_from_full_name() {
        assert_eq!(mention_id("Ada Lovelace"), "ada.lovelace");
        assert_eq!(mention_id("bob"), "bob");
    }

    #[test]
    fn every_space_becomes_a_dot() {
        assert_eq!(mention_id("Ada  Lovelace"), "ada..lovelace");
        assert_eq!(mention_id(" Grace Brewster Hopper "), "grace.brewster.hopper");
    }

    #[test]
    fn node_text_keeps_case() {
        let node = mention_node("Ada Lovelace");
        assert_eq!(node.attr_str("id"), Some("ada.lovelace"));
        assert_eq!(node.attr_str("text"), Some("@Ada Lovelace"));
    }

    #[test]
    fn email_addresses_are_declined() {
        let text = "mail a@b.com";
        let caps = INLINE_RE.captures(text).unwrap();
        let parsed = MentionPlugin
            .parse(PluginInput::Inline {
                captures: &caps,
                haystack: text,
            })
            .unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn dotted_handles_match_whole() {
        let caps = INLINE_RE.captures("hi @jane.doe!").unwrap();
        assert_eq!(&caps[2], "jane.doe");
    }
}
