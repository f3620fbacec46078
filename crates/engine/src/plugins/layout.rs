//! `:::layout columns=N` holding `::: column` children.
//!
//! Every column gets the same width. Missing columns are padded with empty
//! ones; a body with no `column` children fills the first column.

use adfmark_core::directives::child_directives;
use adfmark_core::{Node, NodeType, PluginError};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{expect_children, expect_type, or_filler};
use crate::registry::{Parsed, Plugin, PluginInput, RenderContext};

static BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:{3,}\s*layout(?:$|[\s\[{])").expect("valid layout regex"));

/// Upper bound on columns in one section.
pub const MAX_COLUMNS: usize = 10;

/// Multi-column section.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutPlugin;

/// Equal share of 100, rounded to two decimals.
fn column_width(count: usize) -> f64 {
    (10_000.0 / count as f64).round() / 100.0
}

impl Plugin for LayoutPlugin {
    fn name(&self) -> &str {
        "layout"
    }

    fn block_pattern(&self) -> Option<&Regex> {
        Some(&BLOCK_RE)
    }

    fn parse(&self, input: PluginInput<'_>) -> Result<Option<Parsed>, PluginError> {
        let PluginInput::Block { opening, body } = input else {
            return Ok(None);
        };
        let columns = match opening.attr("columns") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| PluginError::attribute("columns", raw))?,
            None => 0,
        };
        Ok(Some(Parsed::with_body(body).attr("columns", columns)))
    }

    fn render(&self, parsed: Parsed, ctx: &mut dyn RenderContext) -> Result<Node, PluginError> {
        let lines: Vec<&str> = parsed.body.lines().collect();
        let mut bodies: Vec<String> = child_directives(&lines)
            .into_iter()
            .filter(|child| child.opening.name == "column")
            .map(|child| lines[child.body].join("\n"))
            .collect();
        if bodies.is_empty() && !parsed.body.trim().is_empty() {
            bodies.push(parsed.body.clone());
        }

        let requested = parsed
            .attrs
            .get("columns")
            .and_then(Value::as_u64)
            .map_or(0, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let mut count = requested.max(bodies.len()).max(1);
        if count > MAX_COLUMNS {
            debug!("layout clamped from {count} to {MAX_COLUMNS} columns");
            count = MAX_COLUMNS;
            bodies.truncate(MAX_COLUMNS);
        }
        let width = column_width(count);

        let mut columns = Vec::with_capacity(count);
        for body in &bodies {
            let content = ctx.render_blocks(body)?;
            columns.push(
                Node::container(NodeType::LayoutColumn, or_filler(content)).with_attr("width", width),
            );
        }
        while columns.len() < count {
            columns.push(
                Node::container(NodeType::LayoutColumn, or_filler(Vec::new()))
                    .with_attr("width", width),
            );
        }

        Ok(Node::container(NodeType::LayoutSection, columns))
    }

    fn validate(&self, node: &Node) -> Result<(), PluginError> {
        expect_type(node, NodeType::LayoutSection)?;
        expect_children(node)?;
        for column in node.children() {
            expect_type(column, NodeType::LayoutColumn)?;
            let width = column.attr("width").and_then(Value::as_f64);
            match width {
                Some(w) if (0.0..=100.0).contains(&w) => {}
                _ => {
                    let shown = width.map_or_else(|| "<missing>".to_string(), |w| w.to_string());
                    return Err(PluginError::attribute("width", shown));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_round_to_two_places() {
        assert_eq!(column_width(1), 100.0);
        assert_eq!(column_width(2), 50.0);
        assert_eq!(column_width(3), 33.33);
        assert_eq!(column_width(7), 14.29);
    }

    #[test]
    fn validate_rejects_empty_section() {
        let node = Node::container(NodeType::LayoutSection, Vec::new());
        assert!(LayoutPlugin.validate(&node).is_err());
    }

    #[test]
    fn validate_checks_width_range() {
        let column = |w: f64| {
            Node::container(NodeType::LayoutColumn, vec![Node::empty_paragraph()]).with_attr("width", w)
        };
        let ok = Node::container(NodeType::LayoutSection, vec![column(50.0), column(50.0)]);
        assert!(LayoutPlugin.validate(&ok).is_ok());
        let bad = Node::container(NodeType::LayoutSection, vec![column(150.0)]);
        assert!(LayoutPlugin.validate(&bad).is_err());
    }
}
