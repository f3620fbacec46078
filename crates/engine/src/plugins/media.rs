//! `:::media` with a `key: value` body.
//!
//! ```text
//! :::media
//! id: 6e7c1c3a
//! collection: uploads
//! width: 640
//! layout: wide
//! :::
//! ```

use adfmark_core::{Attrs, Node, NodeType, PluginError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::expect_type;
use crate::registry::{Parsed, Plugin, PluginInput, RenderContext};

static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:{3,}\s*media(?:$|[\s\[{])").expect("valid media regex"));

const DEFAULT_LAYOUT: &str = "center";

/// Embedded file or external image, wrapped in `mediaSingle`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MediaPlugin;

/// Digits-only values become numbers; everything else stays a string.
fn coerce(raw: &str) -> Value {
    if !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && let Ok(n) = raw.parse::<u64>()
    {
        return Value::from(n);
    }
    Value::from(raw)
}

fn insert_pair(attrs: &mut Attrs, key: &str, value: &str) {
    let key = key.trim();
    if !key.is_empty() {
        attrs.insert(key.to_string(), coerce(value.trim()));
    }
}

impl Plugin for MediaPlugin {
    fn name(&self) -> &str {
        "media"
    }

    fn block_pattern(&self) -> Option<&Regex> {
        Some(&BLOCK_RE)
    }

    fn parse(&self, input: PluginInput<'_>) -> Result<Option<Parsed>, PluginError> {
        let PluginInput::Block { opening, body } = input else {
            return Ok(None);
        };

        let mut attrs = Attrs::new();
        for (key, value) in &opening.attrs {
            insert_pair(&mut attrs, key, value);
        }
        for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some((key, value)) = line.split_once(':') else {
                return Err(PluginError::syntax(format!("expected `key: value`, got `{line}`")));
            };
            insert_pair(&mut attrs, key, value);
        }

        if !attrs.contains_key("type") {
            let kind = if attrs.contains_key("url") { "external" } else { "file" };
            attrs.insert("type".into(), Value::from(kind));
        }

        Ok(Some(Parsed {
            attrs,
            body: String::new(),
        }))
    }

    fn render(&self, parsed: Parsed, _ctx: &mut dyn RenderContext) -> Result<Node, PluginError> {
        let mut attrs = parsed.attrs;
        let layout = match attrs.remove("layout") {
            Some(Value::String(layout)) if !layout.is_empty() => layout,
            _ => DEFAULT_LAYOUT.to_string(),
        };

        let mut media = Node::leaf(NodeType::Media);
        media.attrs = attrs;
        Ok(Node::container(NodeType::MediaSingle, vec![media]).with_attr("layout", layout))
    }

    fn validate(&self, node: &Node) -> Result<(), PluginError> {
        expect_type(node, NodeType::MediaSingle)?;
        let [media] = node.children() else {
            return Err(PluginError::Validation(
                "`mediaSingle` holds exactly one `media`".into(),
            ));
        };
        expect_type(media, NodeType::Media)?;
        let required = match media.attr_str("type") {
            Some("external") => "url",
            Some(_) => "id",
            None => return Err(PluginError::attribute("type", "<missing>")),
        };
        if media.attr(required).is_none() {
            return Err(PluginError::attribute(required, "<missing>"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adfmark_core::directives::parse_opening_directive;
    use serde_json::json;

    fn parse(body: &str) -> Result<Option<Parsed>, PluginError> {
        let opening = parse_opening_directive(":::media").unwrap();
        MediaPlugin.parse(PluginInput::Block {
            opening: &opening,
            body,
        })
    }

    #[test]
    fn numeric_coercion_is_digits_only() {
        assert_eq!(coerce("640"), json!(640));
        assert_eq!(coerce("-5"), json!("-5"));
        assert_eq!(coerce("1.5"), json!("1.5"));
        assert_eq!(coerce(""), json!(""));
    }

    #[test]
    fn url_implies_external() {
        let parsed = parse("url: https://example.com/a.png").unwrap().unwrap();
        assert_eq!(parsed.attr_str("type"), Some("external"));
        let parsed = parse("id: abc").unwrap().unwrap();
        assert_eq!(parsed.attr_str("type"), Some("file"));
    }

    #[test]
    fn lines_without_colon_are_rejected() {
        assert!(parse("just words").is_err());
    }

    #[test]
    fn validate_requires_identifier() {
        let node = Node::container(
            NodeType::MediaSingle,
            vec![Node::leaf(NodeType::Media).with_attr("type", "file")],
        );
        assert!(MediaPlugin.validate(&node).is_err());
        let node = Node::container(
            NodeType::MediaSingle,
            vec![
                Node::leaf(NodeType::Media)
                    .with_attr("type", "file")
                    .with_attr("id", "x"),
            ],
        );
        assert!(MediaPlugin.validate(&node).is_ok());
    }
}
