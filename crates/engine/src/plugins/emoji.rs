//! `:shortname:` from a fixed table. Unknown names stay literal.

use adfmark_core::{Node, NodeType, PluginError};
use once_cell::sync::Lazy;
use regex::Regex;

use super::expect_type;
use crate::registry::{Parsed, Plugin, PluginInput, RenderContext};

static INLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([a-z0-9_+\-]+):").expect("valid emoji regex"));

const EMOJI: &[(&str, &str)] = &[
    ("smile", "😄"),
    ("grinning", "😀"),
    ("laughing", "😆"),
    ("wink", "😉"),
    ("heart", "❤️"),
    ("thumbsup", "👍"),
    ("+1", "👍"),
    ("thumbsdown", "👎"),
    ("-1", "👎"),
    ("tada", "🎉"),
    ("rocket", "🚀"),
    ("fire", "🔥"),
    ("star", "⭐"),
    ("warning", "⚠️"),
    ("check", "✔️"),
    ("white_check_mark", "✅"),
    ("x", "❌"),
    ("bulb", "💡"),
    ("eyes", "👀"),
    ("clap", "👏"),
    ("pray", "🙏"),
    ("thinking", "🤔"),
    ("cry", "😢"),
    ("joy", "😂"),
    ("sunglasses", "😎"),
    ("100", "💯"),
    ("sparkles", "✨"),
    ("bug", "🐛"),
    ("memo", "📝"),
    ("lock", "🔒"),
    ("question", "❓"),
    ("info", "ℹ️"),
];

/// Looks up the glyph for a short name (without colons).
pub fn emoji_glyph(short_name: &str) -> Option<&'static str> {
    EMOJI
        .iter()
        .find(|(name, _)| *name == short_name)
        .map(|(_, glyph)| *glyph)
}

/// Hex code points joined by `-`, variation selectors dropped.
fn emoji_id(glyph: &str) -> String {
    glyph
        .chars()
        .filter(|c| *c != '\u{FE0F}')
        .map(|c| format!("{:x}", c as u32))
        .collect::<Vec<_>>()
        .join("-")
}

/// Builds an emoji node for a known short name.
pub fn emoji_node(short_name: &str, glyph: &str) -> Node {
    Node::leaf(NodeType::Emoji)
        .with_attr("shortName", format!(":{short_name}:"))
        .with_attr("id", emoji_id(glyph))
        .with_attr("text", glyph)
}

/// Emoji short names.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmojiPlugin;

impl Plugin for EmojiPlugin {
    fn name(&self) -> &str {
        "emoji"
    }

    fn inline_pattern(&self) -> Option<&Regex> {
        Some(&INLINE_RE)
    }

    fn parse(&self, input: PluginInput<'_>) -> Result<Option<Parsed>, PluginError> {
        let PluginInput::Inline { captures, .. } = input else {
            return Ok(None);
        };
        let short_name = &captures[1];
        Ok(emoji_glyph(short_name)
            .map(|glyph| Parsed::with_body(short_name).attr("text", glyph)))
    }

    fn render(&self, parsed: Parsed, _ctx: &mut dyn RenderContext) -> Result<Node, PluginError> {
        let glyph = parsed
            .attr_str("text")
            .ok_or_else(|| PluginError::attribute("text", "<missing>"))?;
        Ok(emoji_node(&parsed.body, glyph))
    }

    fn validate(&self, node: &Node) -> Result<(), PluginError> {
        expect_type(node, NodeType::Emoji)?;
        match node.attr_str("shortName") {
            Some(name) if name.len() > 2 && name.starts_with(':') && name.ends_with(':') => Ok(()),
            other => Err(PluginError::attribute(
                "shortName",
                other.unwrap_or("<missing>"),
            )),
        }
    }
}
