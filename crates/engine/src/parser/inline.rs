//! Inline parser: a run of text to leaf nodes.
//!
//! Passes, each working on what the previous one left as plain text:
//!
//! 1. sentinel tokens become status, mention and date nodes
//! 2. `[text](href "title")` links
//! 3. backtick code spans
//! 4. `**strong**`, `*em*`, `~~strike~~` (and `__`/`_`)
//! 5. inline plugins on the remaining plain runs
//!
//! Adjacent text nodes with identical marks are merged at the end.

use adfmark_core::code_fence::code_span_ranges;
use adfmark_core::{LinkAttrs, Mark, Node, Segment, Sentinel, split_sentinels};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::plugins::{date_node, mention_node, status_node};
use crate::registry::{InlineSegment, PluginRegistry, RenderContext};

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([^\[\]]+)\]\(([^()\s]+)(?:\s+"([^"]*)")?\)"#).expect("valid link regex")
});

/// Parses inline text into nodes. Empty input yields no nodes.
pub fn parse_inline(
    text: &str,
    registry: &PluginRegistry,
    ctx: &mut dyn RenderContext,
) -> Vec<Node> {
    let mut out = Vec::new();
    for segment in split_sentinels(text) {
        match segment {
            Segment::Text(run) => links(run, &[], registry, ctx, &mut out),
            Segment::Sentinel(token) => out.extend(sentinel_node(token)),
        }
    }
    merge_text(out)
}

/// Node for an inline token; panel markers have none.
fn sentinel_node(token: Sentinel) -> Option<Node> {
    match token {
        Sentinel::Status { color, text } => Some(status_node(&text, &color)),
        Sentinel::Mention { name } => Some(mention_node(&name)),
        Sentinel::Date { value } => Some(date_node(value)),
        Sentinel::PanelStart { .. } | Sentinel::PanelEnd => None,
    }
}

fn links(
    text: &str,
    marks: &[Mark],
    registry: &PluginRegistry,
    ctx: &mut dyn RenderContext,
    out: &mut Vec<Node>,
) {
    let mut last = 0;
    for caps in LINK_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        code_spans(&text[last..whole.start()], marks, registry, ctx, out);

        let mut link_marks = marks.to_vec();
        link_marks.push(Mark::Link {
            attrs: LinkAttrs {
                href: caps[2].to_string(),
                title: caps.get(3).map(|m| m.as_str().to_string()),
            },
        });
        code_spans(&caps[1], &link_marks, registry, ctx, out);
        last = whole.end();
    }
    code_spans(&text[last..], marks, registry, ctx, out);
}

fn code_spans(
    text: &str,
    marks: &[Mark],
    registry: &PluginRegistry,
    ctx: &mut dyn RenderContext,
    out: &mut Vec<Node>,
) {
    let mut last = 0;
    for span in code_span_ranges(text) {
        emphasis(&text[last..span.start], marks, registry, ctx, out);

        let raw = &text[span.clone()];
        let ticks = raw.bytes().take_while(|b| *b == b'`').count();
        let mut inner = &raw[ticks..raw.len() - ticks];
        if inner.len() >= 2
            && inner.starts_with(' ')
            && inner.ends_with(' ')
            && !inner.trim().is_empty()
        {
            inner = &inner[1..inner.len() - 1];
        }
        if !inner.is_empty() {
            let mut code_marks = marks.to_vec();
            code_marks.push(Mark::Code);
            out.push(Node::text_with_marks(inner, &code_marks));
        }
        last = span.end;
    }
    emphasis(&text[last..], marks, registry, ctx, out);
}

#[derive(Clone, Copy)]
struct Delimiter {
    token: &'static str,
    mark: Emphasis,
}

#[derive(Clone, Copy)]
enum Emphasis {
    Strong,
    Em,
    Strike,
}

impl Emphasis {
    fn mark(self) -> Mark {
        match self {
            Emphasis::Strong => Mark::Bold,
            Emphasis::Em => Mark::Italic,
            Emphasis::Strike => Mark::Strike,
        }
    }
}

const DELIMITERS: [Delimiter; 5] = [
    Delimiter {
        token: "**",
        mark: Emphasis::Strong,
    },
    Delimiter {
        token: "__",
        mark: Emphasis::Strong,
    },
    Delimiter {
        token: "~~",
        mark: Emphasis::Strike,
    },
    Delimiter {
        token: "*",
        mark: Emphasis::Em,
    },
    Delimiter {
        token: "_",
        mark: Emphasis::Em,
    },
];

impl Delimiter {
    fn underscore(&self) -> bool {
        self.token.starts_with('_')
    }
}

/// Delimiter that can open emphasis at byte `at`, with its index in
/// [`DELIMITERS`].
fn opener_at(text: &str, at: usize) -> Option<(usize, Delimiter)> {
    let rest = &text[at..];
    let previous = text[..at].chars().next_back();
    DELIMITERS.into_iter().enumerate().find(|(_, d)| {
        rest.starts_with(d.token)
            && rest[d.token.len()..]
                .chars()
                .next()
                .is_some_and(|c| !c.is_whitespace())
            && !(d.underscore() && previous.is_some_and(char::is_alphanumeric))
    })
}

/// Byte offset of the delimiter closing one opened at `open`.
fn closer_for(text: &str, open: usize, delimiter: Delimiter) -> Option<usize> {
    let token = delimiter.token;
    let content_start = open + token.len();
    let mut from = content_start + text[content_start..].chars().next()?.len_utf8();

    while let Some(found) = text.get(from..).and_then(|rest| rest.find(token)) {
        let mut at = from + found;
        // `***` after `**bold *both` closes the inner `*` first
        let run = text[at..]
            .bytes()
            .take_while(|b| Some(b) == token.as_bytes().first())
            .count();
        if token.len() == 2 && run > 2 {
            at += run - 2;
        }
        let before = text[..at].chars().next_back();
        let after = text[at + token.len()..].chars().next();

        let flanking = before.is_some_and(|c| !c.is_whitespace());
        let single_star_ok = token != "*" || (before != Some('*') && after != Some('*'));
        let underscore_ok = !delimiter.underscore() || !after.is_some_and(char::is_alphanumeric);

        if flanking && single_star_ok && underscore_ok {
            return Some(at);
        }
        from = from + found + 1;
    }
    None
}

fn emphasis(
    text: &str,
    marks: &[Mark],
    registry: &PluginRegistry,
    ctx: &mut dyn RenderContext,
    out: &mut Vec<Node>,
) {
    let mut last = 0;
    let mut cursor = 0;
    // a closer is judged by its own neighbours only, so once a token finds
    // none from some position it finds none from any later one
    let mut exhausted = [false; DELIMITERS.len()];

    while cursor < text.len() {
        if let Some((slot, delimiter)) = opener_at(text, cursor) {
            let close = if exhausted[slot] {
                None
            } else {
                closer_for(text, cursor, delimiter)
            };
            if let Some(close) = close {
                plain(&text[last..cursor], marks, registry, ctx, out);

                let mut inner_marks = marks.to_vec();
                inner_marks.push(delimiter.mark.mark());
                let inner = &text[cursor + delimiter.token.len()..close];
                emphasis(inner, &inner_marks, registry, ctx, out);

                cursor = close + delimiter.token.len();
                last = cursor;
                continue;
            }
            exhausted[slot] = true;
            cursor += delimiter.token.len();
            continue;
        }
        cursor += text[cursor..].chars().next().map_or(1, char::len_utf8);
    }

    plain(&text[last..], marks, registry, ctx, out);
}

/// Runs the inline plugins over an unmarked stretch of text.
fn plain(
    text: &str,
    marks: &[Mark],
    registry: &PluginRegistry,
    ctx: &mut dyn RenderContext,
    out: &mut Vec<Node>,
) {
    if text.is_empty() {
        return;
    }
    for segment in registry.process_inline_text(text, ctx) {
        match segment {
            InlineSegment::Text(run) if !run.is_empty() => {
                out.push(Node::text_with_marks(run, marks));
            }
            InlineSegment::Text(_) => {}
            InlineSegment::Node(node) => out.push(node),
        }
    }
}

/// Joins neighbouring text nodes that carry the same marks.
fn merge_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let Some(previous) = merged.last_mut()
            && previous.text.is_some()
            && node.text.is_some()
            && previous.marks == node.marks
        {
            if let (Some(prev), Some(next)) = (previous.text.as_mut(), node.text.as_deref()) {
                prev.push_str(next);
            }
            continue;
        }
        merged.push(node);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use adfmark_core::{ConvertError, NodeType, marks_are_valid};
    use serde_json::json;

    struct Ctx(Limits);

    impl RenderContext for Ctx {
        fn render_blocks(&mut self, _markdown: &str) -> Result<Vec<Node>, ConvertError> {
            Ok(Vec::new())
        }
        fn render_inline(&mut self, _text: &str) -> Vec<Node> {
            Vec::new()
        }
        fn limits(&self) -> &Limits {
            &self.0
        }
        fn depth(&self) -> usize {
            0
        }
    }

    fn inline(text: &str) -> Vec<Node> {
        parse_inline(text, &PluginRegistry::with_builtins(), &mut Ctx(Limits::default()))
    }

    fn json(text: &str) -> serde_json::Value {
        serde_json::to_value(inline(text)).unwrap()
    }

    #[test]
    fn empty_input_has_no_nodes() {
        assert!(inline("").is_empty());
    }

    #[test]
    fn plain_text_is_one_node() {
        assert_eq!(json("just words"), json!([{"type": "text", "text": "just words"}]));
    }

    #[test]
    fn links_with_titles() {
        assert_eq!(
            json(r#"see [docs](https://example.com "Docs") now"#),
            json!([
                {"type": "text", "text": "see "},
                {"type": "text", "text": "docs", "marks": [
                    {"type": "link", "attrs": {"href": "https://example.com", "title": "Docs"}}
                ]},
                {"type": "text", "text": " now"}
            ])
        );
    }

    #[test]
    fn code_spans_are_not_parsed_further() {
        assert_eq!(
            json("run `**x** :smile:` now"),
            json!([
                {"type": "text", "text": "run "},
                {"type": "text", "text": "**x** :smile:", "marks": [{"type": "code"}]},
                {"type": "text", "text": " now"}
            ])
        );
    }

    #[test]
    fn emphasis_marks() {
        assert_eq!(
            json("**b** *i* ~~s~~ __u__"),
            json!([
                {"type": "text", "text": "b", "marks": [{"type": "strong"}]},
                {"type": "text", "text": " "},
                {"type": "text", "text": "i", "marks": [{"type": "em"}]},
                {"type": "text", "text": " "},
                {"type": "text", "text": "s", "marks": [{"type": "strike"}]},
                {"type": "text", "text": " "},
                {"type": "text", "text": "u", "marks": [{"type": "strong"}]}
            ])
        );
    }

    #[test]
    fn nested_emphasis() {
        assert_eq!(
            json("**bold *both***"),
            json!([
                {"type": "text", "text": "bold ", "marks": [{"type": "strong"}]},
                {"type": "text", "text": "both", "marks": [{"type": "strong"}, {"type": "em"}]}
            ])
        );
    }

    #[test]
    fn unmatched_or_spaced_delimiters_are_literal() {
        assert_eq!(json("2 * 3 * 4"), json!([{"type": "text", "text": "2 * 3 * 4"}]));
        assert_eq!(json("**open"), json!([{"type": "text", "text": "**open"}]));
        assert_eq!(json("snake_case_name"), json!([{"type": "text", "text": "snake_case_name"}]));
    }

    #[test]
    fn link_inside_emphasis_keeps_both_marks() {
        let nodes = inline("[**x**](http://a)");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].marks.len(), 2);
        assert!(marks_are_valid(&nodes[0].marks));
    }

    #[test]
    fn code_in_link_keeps_link() {
        let nodes = inline("[`x`](http://a)");
        assert_eq!(nodes[0].marks.iter().map(Mark::tag).collect::<Vec<_>>(), vec!["link", "code"]);
    }

    #[test]
    fn sentinels_become_nodes() {
        let token = Sentinel::Status {
            color: "green".into(),
            text: "Done".into(),
        }
        .encode();
        let nodes = inline(&format!("state: {token}"));
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].node_type, NodeType::Status);
        assert_eq!(nodes[1].attr_str("color"), Some("green"));
    }

    #[test]
    fn plugins_run_on_plain_text() {
        let nodes = inline("ship it :rocket: @alice");
        let types: Vec<NodeType> = nodes.iter().map(|n| n.node_type).collect();
        assert_eq!(
            types,
            vec![NodeType::Text, NodeType::Emoji, NodeType::Text, NodeType::Mention]
        );
        assert_eq!(nodes[3].attr_str("id"), Some("alice"));
    }

    #[test]
    fn plugins_inside_emphasis() {
        let nodes = inline("**hi :tada:**");
        assert_eq!(nodes[0].marks, vec![Mark::Bold]);
        assert_eq!(nodes[1].node_type, NodeType::Emoji);
    }

    #[test]
    fn unknown_emoji_stays_literal() {
        assert_eq!(json("a :nope: b"), json!([{"type": "text", "text": "a :nope: b"}]));
    }

    #[test]
    fn unclosed_openers_scan_linearly() {
        let text = "*a ".repeat(30_000);
        let started = std::time::Instant::now();
        let nodes = inline(&text);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text.as_deref(), Some(text.as_str()));
        assert!(nodes[0].marks.is_empty());
    }

    #[test]
    fn exhausted_token_does_not_block_others() {
        assert_eq!(
            json("*a *b **c**"),
            json!([
                {"type": "text", "text": "*a *b "},
                {"type": "text", "text": "c", "marks": [{"type": "strong"}]}
            ])
        );
    }
}
