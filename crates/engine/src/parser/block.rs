//! Block scanner: one forward pass turning preprocessed text into block records.
//!
//! At each non-blank line the block-start predicates in [`BLOCK_STARTS`] are
//! tried in order; the first that matches consumes its lines. A line no
//! predicate claims starts a paragraph, which runs until a blank line or the
//! next block start. Containers keep their raw body lines; the converter
//! parses them again one nesting level deeper.

use adfmark_core::Sentinel;
use adfmark_core::code_fence::{closes_fence, fence_opener};
use adfmark_core::directives::{DirectiveOpening, find_directive_close, parse_opening_directive};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::registry::PluginRegistry;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*))?$").expect("valid heading regex"));
static RULE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(?:-{3,}|\*{3,}|_{3,})[ \t]*$").expect("valid rule regex")
});
static BLOCKQUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}> ?(.*)$").expect("valid blockquote regex"));
static SEPARATOR_CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:?-+:?$").expect("valid table separator regex"));

/// One list item line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItemRecord {
    /// Leading whitespace width (tabs count as 4).
    pub indent: usize,
    /// `1.` / `1)` style marker.
    pub ordered: bool,
    /// Number of an ordered marker; 0 for bullets.
    pub number: u64,
    /// Item text with continuation lines joined by spaces.
    pub text: String,
}

/// Typed block produced by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRecord {
    /// ATX heading.
    Heading {
        /// 1 to 6.
        level: u8,
        /// Inline text, closing `#`s removed.
        text: String,
    },
    /// Consecutive text lines.
    Paragraph {
        /// Trimmed source lines.
        lines: Vec<String>,
    },
    /// Fenced code.
    CodeBlock {
        /// First word of the info string.
        language: Option<String>,
        /// Verbatim body lines.
        lines: Vec<String>,
    },
    /// `-`, `*` or `+` items, with any nested items.
    BulletList {
        /// Items in source order.
        items: Vec<ListItemRecord>,
    },
    /// `1.` or `1)` items, with any nested items.
    OrderedList {
        /// Number of the first item.
        start: u64,
        /// Items in source order.
        items: Vec<ListItemRecord>,
    },
    /// `>` lines with the marker removed.
    Blockquote {
        /// Dedented body lines.
        lines: Vec<String>,
    },
    /// `---`, `***` or `___`.
    Rule,
    /// Consecutive `|` lines.
    Table {
        /// Cell text per row, separator row removed.
        rows: Vec<Vec<String>>,
        /// Whether row 0 was followed by a `---` separator.
        has_header: bool,
    },
    /// Region between panel sentinel lines.
    Panel {
        /// Type as written in the macro.
        panel_type: String,
        /// Body lines.
        lines: Vec<String>,
    },
    /// `:::name` block claimed by a registered block plugin.
    Directive {
        /// Parsed opener.
        opening: DirectiveOpening,
        /// Opener line as written.
        opener: String,
        /// Body lines between opener and closer.
        body: Vec<String>,
    },
}

impl BlockRecord {
    /// Short name of the record kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BlockRecord::Heading { .. } => "heading",
            BlockRecord::Paragraph { .. } => "paragraph",
            BlockRecord::CodeBlock { .. } => "code",
            BlockRecord::BulletList { .. } => "bullet",
            BlockRecord::OrderedList { .. } => "ordered",
            BlockRecord::Blockquote { .. } => "blockquote",
            BlockRecord::Rule => "rule",
            BlockRecord::Table { .. } => "table",
            BlockRecord::Panel { .. } => "panel",
            BlockRecord::Directive { .. } => "directive",
        }
    }
}

/// A recognized block and the index of the first line after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    /// The record.
    pub record: BlockRecord,
    /// First unconsumed line.
    pub next: usize,
}

/// Lines under scan plus the registry that decides which `:::` blocks exist.
pub struct Scan<'a> {
    lines: Vec<&'a str>,
    registry: &'a PluginRegistry,
}

impl<'a> Scan<'a> {
    /// Splits `text` into lines.
    pub fn new(text: &'a str, registry: &'a PluginRegistry) -> Self {
        Self {
            lines: text.lines().collect(),
            registry,
        }
    }

    fn line(&self, index: usize) -> Option<&'a str> {
        self.lines.get(index).copied()
    }

    fn is_blank(&self, index: usize) -> bool {
        self.line(index).is_none_or(|l| l.trim().is_empty())
    }
}

/// A block-start predicate.
pub type BlockStart = fn(&Scan<'_>, usize) -> Option<Matched>;

/// Block-start predicates in priority order.
pub const BLOCK_STARTS: [(&str, BlockStart); 9] = [
    ("panel", panel as BlockStart),
    ("directive", directive as BlockStart),
    ("heading", heading as BlockStart),
    ("code", fenced_code as BlockStart),
    ("bullet", bullet_list as BlockStart),
    ("ordered", ordered_list as BlockStart),
    ("blockquote", blockquote as BlockStart),
    ("rule", rule as BlockStart),
    ("table", table as BlockStart),
];

/// Splits text into block records. Never fails.
pub fn parse_blocks(text: &str, registry: &PluginRegistry) -> Vec<BlockRecord> {
    let scan = Scan::new(text, registry);
    let mut records = Vec::new();
    let mut index = 0;

    while index < scan.lines.len() {
        if scan.is_blank(index) {
            index += 1;
            continue;
        }
        let matched = block_start(&scan, index).unwrap_or_else(|| paragraph(&scan, index));
        records.push(matched.record);
        index = matched.next.max(index + 1);
    }

    records
}

/// First block-start predicate that matches at `index`.
pub fn block_start(scan: &Scan<'_>, index: usize) -> Option<Matched> {
    BLOCK_STARTS
        .iter()
        .find_map(|(_, predicate)| predicate(scan, index))
}

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| (*l).to_string()).collect()
}

/// Leading whitespace width, tabs counting as 4.
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn panel(scan: &Scan<'_>, index: usize) -> Option<Matched> {
    let Some(Sentinel::PanelStart { panel_type }) = Sentinel::from_line(scan.line(index)?) else {
        return None;
    };

    let mut depth = 0usize;
    for (offset, line) in scan.lines[index + 1..].iter().enumerate() {
        match Sentinel::from_line(line) {
            Some(Sentinel::PanelStart { .. }) => depth += 1,
            Some(Sentinel::PanelEnd) if depth == 0 => {
                let close = index + 1 + offset;
                return Some(Matched {
                    record: BlockRecord::Panel {
                        panel_type,
                        lines: owned(&scan.lines[index + 1..close]),
                    },
                    next: close + 1,
                });
            }
            Some(Sentinel::PanelEnd) => depth -= 1,
            _ => {}
        }
    }
    None
}

fn directive(scan: &Scan<'_>, index: usize) -> Option<Matched> {
    let line = scan.line(index)?;
    let opening = parse_opening_directive(line)?;
    if !scan.registry.claims_block(line) {
        return None;
    }
    let close = find_directive_close(&scan.lines, index)?;
    Some(Matched {
        record: BlockRecord::Directive {
            opening,
            opener: line.trim().to_string(),
            body: owned(&scan.lines[index + 1..close]),
        },
        next: close + 1,
    })
}

fn heading(scan: &Scan<'_>, index: usize) -> Option<Matched> {
    let caps = HEADING_RE.captures(scan.line(index)?)?;
    let level = u8::try_from(caps[1].len()).ok()?;
    let raw = caps.get(2).map_or("", |m| m.as_str()).trim();

    // closing sequence: `## Title ##`
    let without_hashes = raw.trim_end_matches('#');
    let text = if without_hashes.is_empty() || without_hashes.ends_with([' ', '\t']) {
        without_hashes.trim_end()
    } else {
        raw
    };

    Some(Matched {
        record: BlockRecord::Heading {
            level,
            text: text.to_string(),
        },
        next: index + 1,
    })
}

fn fenced_code(scan: &Scan<'_>, index: usize) -> Option<Matched> {
    let line = scan.line(index)?;
    let opener = fence_opener(line)?;
    let indent = indent_width(line);

    let mut body = Vec::new();
    let mut next = scan.lines.len();
    for (offset, candidate) in scan.lines[index + 1..].iter().enumerate() {
        if closes_fence(candidate, opener.marker, opener.length) {
            next = index + 2 + offset;
            break;
        }
        body.push(strip_indent(candidate, indent).to_string());
    }

    Some(Matched {
        record: BlockRecord::CodeBlock {
            language: opener.language().map(str::to_string),
            lines: body,
        },
        next,
    })
}

/// Removes up to `width` leading spaces.
fn strip_indent(line: &str, width: usize) -> &str {
    let spaces = line.bytes().take(width).take_while(|b| *b == b' ').count();
    &line[spaces..]
}

/// Parses a list marker line.
pub fn list_item(line: &str) -> Option<ListItemRecord> {
    let indent = indent_width(line);
    let rest = line.trim_start_matches([' ', '\t']);

    let (ordered, number, after) = match rest.chars().next()? {
        '-' | '*' | '+' => (false, 0, &rest[1..]),
        c if c.is_ascii_digit() => {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 9 {
                return None;
            }
            let after_digits = &rest[digits..];
            let after = after_digits
                .strip_prefix('.')
                .or_else(|| after_digits.strip_prefix(')'))?;
            (true, rest[..digits].parse().ok()?, after)
        }
        _ => return None,
    };

    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }

    Some(ListItemRecord {
        indent,
        ordered,
        number,
        text: after.trim().to_string(),
    })
}

fn bullet_list(scan: &Scan<'_>, index: usize) -> Option<Matched> {
    let first = list_item(scan.line(index)?).filter(|item| !item.ordered)?;
    Some(collect_list(scan, index, first))
}

fn ordered_list(scan: &Scan<'_>, index: usize) -> Option<Matched> {
    let first = list_item(scan.line(index)?).filter(|item| item.ordered)?;
    let start = first.number;
    let mut matched = collect_list(scan, index, first);
    if let BlockRecord::BulletList { items } = matched.record {
        matched.record = BlockRecord::OrderedList { start, items };
    }
    Some(matched)
}

/// Gathers items of one list plus deeper-indented items of any kind.
///
/// Produces a `BulletList` record; the ordered predicate relabels it.
fn collect_list(scan: &Scan<'_>, index: usize, first: ListItemRecord) -> Matched {
    let base = first.indent;
    let ordered = first.ordered;
    let mut items = vec![first];
    let mut cursor = index + 1;

    while let Some(line) = scan.line(cursor) {
        if line.trim().is_empty() {
            // a blank line ends the list unless the list resumes after it
            let resume = (cursor + 1..scan.lines.len()).find(|&i| !scan.is_blank(i));
            match resume {
                Some(next) if continues_list(scan.lines[next], base, ordered) => {
                    cursor = next;
                    continue;
                }
                _ => break,
            }
        }

        if let Some(item) = list_item(line) {
            if item.indent <= base && item.ordered != ordered {
                break;
            }
            items.push(item);
        } else if indent_width(line) > base || block_start(scan, cursor).is_none() {
            if let Some(last) = items.last_mut() {
                if !last.text.is_empty() {
                    last.text.push(' ');
                }
                last.text.push_str(line.trim());
            }
        } else {
            break;
        }
        cursor += 1;
    }

    Matched {
        record: BlockRecord::BulletList { items },
        next: cursor,
    }
}

fn continues_list(line: &str, base: usize, ordered: bool) -> bool {
    match list_item(line) {
        Some(item) => item.indent > base || item.ordered == ordered,
        None => indent_width(line) > base,
    }
}

fn blockquote(scan: &Scan<'_>, index: usize) -> Option<Matched> {
    let mut lines = Vec::new();
    let mut cursor = index;
    while let Some(caps) = scan.line(cursor).and_then(|l| BLOCKQUOTE_RE.captures(l)) {
        lines.push(caps[1].to_string());
        cursor += 1;
    }
    if lines.is_empty() {
        return None;
    }
    Some(Matched {
        record: BlockRecord::Blockquote { lines },
        next: cursor,
    })
}

fn rule(scan: &Scan<'_>, index: usize) -> Option<Matched> {
    RULE_RE.is_match(scan.line(index)?).then_some(Matched {
        record: BlockRecord::Rule,
        next: index + 1,
    })
}

fn is_table_line(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

fn table(scan: &Scan<'_>, index: usize) -> Option<Matched> {
    if !is_table_line(scan.line(index)?) || !scan.line(index + 1).is_some_and(is_table_line) {
        return None;
    }

    let mut rows = Vec::new();
    let mut cursor = index;
    while let Some(line) = scan.line(cursor).filter(|l| is_table_line(l)) {
        rows.push(split_cells(line));
        cursor += 1;
    }

    let has_header = rows.get(1).is_some_and(|row| is_separator_row(row));
    if has_header {
        rows.remove(1);
    }

    Some(Matched {
        record: BlockRecord::Table { rows, has_header },
        next: cursor,
    })
}

fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty() && cells.iter().all(|c| SEPARATOR_CELL_RE.is_match(c))
}

/// Splits `| a | b |` into trimmed cells; `\|` is a literal pipe.
pub fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = match inner.strip_suffix('|') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => inner,
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn paragraph(scan: &Scan<'_>, index: usize) -> Matched {
    let mut lines = Vec::new();
    let mut cursor = index;
    while let Some(line) = scan.line(cursor) {
        if line.trim().is_empty() || (cursor > index && block_start(scan, cursor).is_some()) {
            break;
        }
        lines.push(line.trim().to_string());
        cursor += 1;
    }
    Matched {
        record: BlockRecord::Paragraph { lines },
        next: cursor,
    }
}
