//! Directive block syntax: `:::name[Title] key="value"` … `:::`.
//!
//! Container plugins (panel, expand, media, layout) share this fenced
//! syntax. This module only recognizes the delimiters and splits attributes;
//! what a directive means is up to the plugin that claims its name.

use std::ops::Range;

use crate::code_fence::{FenceState, advance_fence_state};

/// Parsed representation of a directive opening line (e.g. `:::panel type="note"`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectiveOpening {
    /// Lowercased directive name (panel/expand/layout/...).
    pub name: String,
    /// Optional title captured from bracket syntax `[...]`.
    pub bracket_title: Option<String>,
    /// Attributes in source order, quotes removed.
    pub attrs: Vec<(String, String)>,
}

impl DirectiveOpening {
    /// Looks up an attribute by case-insensitive key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Title resolution: bracket title wins over a `title` attribute.
    pub fn title(&self) -> Option<&str> {
        self.bracket_title.as_deref().or_else(|| self.attr("title"))
    }
}

/// A directive nested directly inside another directive's body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildDirective {
    /// The child's opening line.
    pub opening: DirectiveOpening,
    /// Line indices of the child's body, relative to the slice searched.
    pub body: Range<usize>,
}

/// Parse an opening directive line like `:::panel type="info"` or `::: column`.
///
/// Returns `None` for closers, indented code, and lines without a name.
pub fn parse_opening_directive(line: &str) -> Option<DirectiveOpening> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 || line.starts_with('\t') {
        return None;
    }

    let trimmed = line.trim();
    let after_colons = trimmed.strip_prefix(":::")?;
    let after_colons = after_colons.trim_start_matches(':').trim_start();
    let mut chars = after_colons.chars().peekable();

    let mut name = String::new();
    if let Some(&ch) = chars.peek()
        && ch.is_ascii_alphabetic()
    {
        while let Some(&ch) = chars.peek() {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                name.push(ch.to_ascii_lowercase());
                chars.next();
            } else {
                break;
            }
        }
    }

    if name.is_empty() {
        return None;
    }

    let mut bracket_title = None;
    if let Some(&'[') = chars.peek() {
        chars.next();
        let mut title = String::new();
        for ch in chars.by_ref() {
            if ch == ']' {
                bracket_title = Some(title.trim().to_string());
                break;
            }
            title.push(ch);
        }
    }

    let remaining: String = chars.collect();
    let attrs = parse_attrs(remaining.trim());

    Some(DirectiveOpening {
        name,
        bracket_title,
        attrs,
    })
}

/// Check if a line is a directive closer (`:::`).
pub fn is_directive_closer(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == ':')
}

/// Finds the line that closes the directive opened at `open`.
///
/// Nested openers are balanced against closers; lines inside code fences
/// are ignored. Returns `None` when the directive is never closed.
pub fn find_directive_close<S: AsRef<str>>(lines: &[S], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut fence_state = FenceState::default();

    for (index, line) in lines.iter().enumerate().skip(open + 1) {
        let line = line.as_ref();
        let outcome = advance_fence_state(line, fence_state);
        fence_state = outcome.next_state;
        if outcome.verbatim {
            continue;
        }

        if parse_opening_directive(line).is_some() {
            depth += 1;
        } else if is_directive_closer(line) {
            if depth == 0 {
                return Some(index);
            }
            depth -= 1;
        }
    }

    None
}

/// Splits a directive body into its directly nested child directives.
///
/// Lines outside any child are not returned. Unclosed children are skipped.
pub fn child_directives<S: AsRef<str>>(lines: &[S]) -> Vec<ChildDirective> {
    let mut children = Vec::new();
    let mut fence_state = FenceState::default();
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index].as_ref();
        let outcome = advance_fence_state(line, fence_state);
        fence_state = outcome.next_state;

        if !outcome.verbatim
            && let Some(opening) = parse_opening_directive(line)
            && let Some(close) = find_directive_close(lines, index)
        {
            children.push(ChildDirective {
                opening,
                body: index + 1..close,
            });
            index = close + 1;
            continue;
        }

        index += 1;
    }

    children
}

/// Splits `key="value"` pairs; bare keys get an empty value.
fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    // remark-directive style braces: {key="value"}
    let raw = raw
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(raw);

    tokenize_attrs(raw)
        .into_iter()
        .filter_map(|tok| {
            let (key, value) = match tok.split_once('=') {
                Some((k, v)) => (k.trim(), unquote(v.trim())),
                None => (tok.trim(), ""),
            };
            if key.is_empty() {
                None
            } else {
                Some((key.to_ascii_lowercase(), value.to_string()))
            }
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Tokenize attributes respecting quoted values.
/// Splits on whitespace but keeps quoted strings intact.
fn tokenize_attrs(attrs: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut token_start: Option<usize> = None;
    let mut in_quotes = false;
    let mut quote_char = '"';

    for (i, c) in attrs.char_indices() {
        match c {
            '"' | '\'' if !in_quotes => {
                if token_start.is_none() {
                    token_start = Some(i);
                }
                in_quotes = true;
                quote_char = c;
            }
            c if c == quote_char && in_quotes => {
                in_quotes = false;
            }
            c if c.is_whitespace() && !in_quotes => {
                if let Some(start) = token_start {
                    let token = &attrs[start..i];
                    if !token.is_empty() {
                        tokens.push(token);
                    }
                    token_start = None;
                }
            }
            _ => {
                if token_start.is_none() {
                    token_start = Some(i);
                }
            }
        }
    }

    if let Some(start) = token_start {
        let token = &attrs[start..];
        if !token.is_empty() {
            tokens.push(token);
        }
    }

    tokens
}
