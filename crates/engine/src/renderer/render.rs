//! Block record rendering functions.

use adfmark_core::{ConvertError, Node, NodeType};
use log::debug;

use super::{Context, depth_notice, notice};
use crate::parser::{BlockRecord, ListItemRecord};
use crate::plugins::panel_node;
use crate::registry::RenderContext;

/// Renders one block record. Most records yield one node; an empty paragraph
/// yields none and an unclaimed directive falls back to several.
pub fn render_record(
    record: BlockRecord,
    ctx: &mut Context<'_>,
) -> Result<Vec<Node>, ConvertError> {
    let nodes = match record {
        BlockRecord::Heading { level, text } => {
            vec![Node::heading(level, ctx.render_inline(&text))?]
        }
        BlockRecord::Paragraph { lines } => {
            let content = ctx.render_inline(&lines.join(" "));
            if content.is_empty() {
                Vec::new()
            } else {
                vec![Node::paragraph(content)]
            }
        }
        BlockRecord::CodeBlock { language, lines } => vec![code_block(language, &lines)],
        BlockRecord::BulletList { items } | BlockRecord::OrderedList { items, .. } => {
            if items.is_empty() {
                Vec::new()
            } else {
                vec![render_list(&items, ctx)?]
            }
        }
        BlockRecord::Blockquote { lines } => {
            let mut content = ctx.render_blocks(&lines.join("\n"))?;
            if content.is_empty() {
                content.push(Node::empty_paragraph());
            }
            vec![Node::container(NodeType::Blockquote, content)]
        }
        BlockRecord::Rule => vec![Node::leaf(NodeType::Rule)],
        BlockRecord::Table { rows, has_header } => vec![render_table(&rows, has_header, ctx)],
        BlockRecord::Panel { panel_type, lines } => {
            let content = ctx.render_blocks(&lines.join("\n"))?;
            vec![panel_node(&panel_type, content)]
        }
        BlockRecord::Directive {
            opening,
            opener,
            body,
        } => {
            let body = body.join("\n");
            let registry = ctx.registry();
            match registry.process_block_text(&opening, &opener, &body, ctx) {
                Some(node) => vec![node],
                None => literal_directive(&opener, &body, ctx)?,
            }
        }
    };
    Ok(nodes)
}

fn code_block(language: Option<String>, lines: &[String]) -> Node {
    let text = lines.join("\n");
    let content = if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    };
    let node = Node::container(NodeType::CodeBlock, content);
    match language {
        Some(language) => node.with_attr("language", language),
        None => node,
    }
}

/// A directive every plugin declined: opener and closer become text.
///
/// The body counts as one nesting level, like a container's.
fn literal_directive(
    opener: &str,
    body: &str,
    ctx: &mut Context<'_>,
) -> Result<Vec<Node>, ConvertError> {
    let mut nodes = vec![Node::paragraph(ctx.render_inline(opener))];
    nodes.extend(ctx.render_blocks(body)?);
    nodes.push(Node::paragraph(vec![Node::text(":::")]));
    Ok(nodes)
}

/// Renders a list whose first item sets the base indent; deeper items
/// become a nested list inside the preceding item.
fn render_list(items: &[ListItemRecord], ctx: &mut Context<'_>) -> Result<Node, ConvertError> {
    let base = items.first().map_or(0, |item| item.indent);

    let mut groups: Vec<(&ListItemRecord, &[ListItemRecord])> = Vec::new();
    let mut index = 0;
    while index < items.len() {
        let head = &items[index];
        let mut end = index + 1;
        while end < items.len() && items[end].indent > base {
            end += 1;
        }
        groups.push((head, &items[index + 1..end]));
        index = end;
    }

    let limit = ctx.limits().max_list_items;
    let mut list_items = Vec::with_capacity(groups.len().min(limit) + 1);
    for (head, children) in groups.iter().take(limit) {
        let mut content = vec![Node::paragraph(ctx.render_inline(&head.text))];
        if !children.is_empty() {
            match ctx.descend(|ctx| render_list(children, ctx)) {
                Some(nested) => content.push(nested?),
                None => content.push(depth_notice(ctx.limits().max_nesting_depth)),
            }
        }
        list_items.push(Node::container(NodeType::ListItem, content));
    }

    if groups.len() > limit {
        let hidden = groups.len() - limit;
        debug!("list truncated: {hidden} items over the limit of {limit}");
        list_items.push(Node::container(
            NodeType::ListItem,
            vec![notice(format!("[Truncated: {hidden} more items]"))],
        ));
    }

    let first = &items[0];
    Ok(if first.ordered {
        Node::container(NodeType::OrderedList, list_items).with_attr("order", first.number)
    } else {
        Node::container(NodeType::BulletList, list_items)
    })
}

fn render_table(rows: &[Vec<String>], has_header: bool, ctx: &mut Context<'_>) -> Node {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let limit = ctx.limits().max_table_rows;

    let mut table_rows = Vec::with_capacity(rows.len().min(limit) + 1);
    for (index, row) in rows.iter().take(limit).enumerate() {
        let cell_type = if has_header && index == 0 {
            NodeType::TableHeader
        } else {
            NodeType::TableCell
        };
        let mut cells: Vec<Node> = row
            .iter()
            .map(|text| table_cell(cell_type, text, ctx))
            .collect();
        while cells.len() < columns {
            cells.push(table_cell(cell_type, "", ctx));
        }
        table_rows.push(Node::container(NodeType::TableRow, cells));
    }

    if rows.len() > limit {
        let hidden = rows.len() - limit;
        debug!("table truncated: {hidden} rows over the limit of {limit}");
        let cell = Node::container(
            NodeType::TableCell,
            vec![notice(format!("[Truncated: {hidden} more rows]"))],
        )
        .with_attr("colspan", columns);
        table_rows.push(Node::container(NodeType::TableRow, vec![cell]));
    }

    Node::container(NodeType::Table, table_rows)
        .with_attr("isNumberColumnEnabled", false)
        .with_attr("layout", "default")
}

fn table_cell(cell_type: NodeType, text: &str, ctx: &mut Context<'_>) -> Node {
    Node::container(cell_type, vec![Node::paragraph(ctx.render_inline(text))])
}
