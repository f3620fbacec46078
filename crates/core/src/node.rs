//! Document format tree: the `doc` root, typed nodes, and text marks.
//!
//! The JSON produced by serializing these types is what the content
//! platform's write APIs accept.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConvertError;
use crate::marks::validate_marks;

/// Attribute map carried by a node.
pub type Attrs = Map<String, Value>;

/// Schema version of every produced document.
pub const DOCUMENT_VERSION: u32 = 1;

/// Closed set of node type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    /// `paragraph` node.
    Paragraph,
    /// `heading` node.
    Heading,
    /// `codeBlock` node.
    CodeBlock,
    /// `bulletList` node.
    BulletList,
    /// `orderedList` node.
    OrderedList,
    /// `listItem` node.
    ListItem,
    /// `table` node.
    Table,
    /// `tableRow` node.
    TableRow,
    /// `tableCell` node.
    TableCell,
    /// `tableHeader` node.
    TableHeader,
    /// `blockquote` node.
    Blockquote,
    /// `rule` node.
    Rule,
    /// `panel` node.
    Panel,
    /// `expand` node.
    Expand,
    /// `media` node.
    Media,
    /// `mediaSingle` node.
    MediaSingle,
    /// `layoutSection` node.
    LayoutSection,
    /// `layoutColumn` node.
    LayoutColumn,
    /// `status` node.
    Status,
    /// `date` node.
    Date,
    /// `mention` node.
    Mention,
    /// `emoji` node.
    Emoji,
    /// `text` node.
    Text,
}

impl NodeType {
    /// The tag as it appears in the JSON `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::CodeBlock => "codeBlock",
            NodeType::BulletList => "bulletList",
            NodeType::OrderedList => "orderedList",
            NodeType::ListItem => "listItem",
            NodeType::Table => "table",
            NodeType::TableRow => "tableRow",
            NodeType::TableCell => "tableCell",
            NodeType::TableHeader => "tableHeader",
            NodeType::Blockquote => "blockquote",
            NodeType::Rule => "rule",
            NodeType::Panel => "panel",
            NodeType::Expand => "expand",
            NodeType::Media => "media",
            NodeType::MediaSingle => "mediaSingle",
            NodeType::LayoutSection => "layoutSection",
            NodeType::LayoutColumn => "layoutColumn",
            NodeType::Status => "status",
            NodeType::Date => "date",
            NodeType::Mention => "mention",
            NodeType::Emoji => "emoji",
            NodeType::Text => "text",
        }
    }

    /// Inline leaf types that may sit inside a paragraph.
    pub fn is_inline(self) -> bool {
        matches!(
            self,
            NodeType::Text | NodeType::Status | NodeType::Date | NodeType::Mention | NodeType::Emoji
        )
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of a link mark.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkAttrs {
    /// Link target.
    pub href: String,
    /// Optional link title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Attributes of a color mark.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorAttrs {
    /// CSS hex color, e.g. `#ff5630`.
    pub color: String,
}

/// A decoration attached to a text node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    /// Bold text.
    #[serde(rename = "strong")]
    Bold,
    /// Italic text.
    #[serde(rename = "em")]
    Italic,
    /// Inline code.
    Code,
    /// Struck-through text.
    Strike,
    /// Hyperlink.
    Link {
        /// Target and title.
        attrs: LinkAttrs,
    },
    /// Foreground color.
    TextColor {
        /// Color value.
        attrs: ColorAttrs,
    },
    /// Background highlight.
    BackgroundColor {
        /// Color value.
        attrs: ColorAttrs,
    },
}

impl Mark {
    /// Creates a link mark without a title.
    pub fn link(href: impl Into<String>) -> Self {
        Mark::Link {
            attrs: LinkAttrs {
                href: href.into(),
                title: None,
            },
        }
    }

    /// Creates a text color mark.
    pub fn text_color(color: impl Into<String>) -> Self {
        Mark::TextColor {
            attrs: ColorAttrs {
                color: color.into(),
            },
        }
    }

    /// Creates a background color mark.
    pub fn background_color(color: impl Into<String>) -> Self {
        Mark::BackgroundColor {
            attrs: ColorAttrs {
                color: color.into(),
            },
        }
    }

    /// The mark's JSON tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Mark::Bold => "strong",
            Mark::Italic => "em",
            Mark::Code => "code",
            Mark::Strike => "strike",
            Mark::Link { .. } => "link",
            Mark::TextColor { .. } => "textColor",
            Mark::BackgroundColor { .. } => "backgroundColor",
        }
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Type tag.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Type-specific attributes.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Attrs,
    /// Ordered children; `None` for leaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Node>>,
    /// Text payload of `text` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Marks of `text` nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    /// Creates a leaf node with no attributes.
    pub fn leaf(node_type: NodeType) -> Self {
        Self {
            node_type,
            attrs: Attrs::new(),
            content: None,
            text: None,
            marks: Vec::new(),
        }
    }

    /// Creates a container node holding `content`.
    pub fn container(node_type: NodeType, content: Vec<Node>) -> Self {
        Self {
            content: Some(content),
            ..Self::leaf(node_type)
        }
    }

    /// Creates a plain text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::leaf(NodeType::Text)
        }
    }

    /// Creates a text node; the marks are filtered through [`validate_marks`].
    pub fn text_with_marks(text: impl Into<String>, marks: &[Mark]) -> Self {
        Self {
            marks: validate_marks(marks),
            ..Self::text(text)
        }
    }

    /// Creates a paragraph around inline content.
    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::container(NodeType::Paragraph, content)
    }

    /// Creates the filler paragraph used where a container needs a child.
    pub fn empty_paragraph() -> Self {
        Self::paragraph(Vec::new())
    }

    /// Creates a heading, rejecting levels outside 1..=6.
    pub fn heading(level: u8, content: Vec<Node>) -> Result<Self, ConvertError> {
        if !(1..=6).contains(&level) {
            return Err(ConvertError::invalid_attribute("heading", "level", level));
        }
        Ok(Self::container(NodeType::Heading, content).with_attr("level", level))
    }

    /// Sets an attribute, returning the node.
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// Looks up an attribute.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Looks up a string attribute.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    /// Children, empty for leaves.
    pub fn children(&self) -> &[Node] {
        self.content.as_deref().unwrap_or(&[])
    }

    /// True for a paragraph with no inline content.
    pub fn is_empty_paragraph(&self) -> bool {
        self.node_type == NodeType::Paragraph && self.children().is_empty()
    }

    /// Visits this node and every descendant in document order.
    pub fn walk<F: FnMut(&Node)>(&self, f: &mut F) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |node| {
            if let Some(text) = &node.text {
                out.push_str(text);
            }
        });
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum DocTag {
    #[serde(rename = "doc")]
    Doc,
}

/// Root of the document tree: always `{version: 1, type: "doc", content}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DocumentRepr")]
pub struct Document {
    version: u32,
    #[serde(rename = "type")]
    tag: DocTag,
    /// Top-level block nodes.
    pub content: Vec<Node>,
}

#[derive(Deserialize)]
struct DocumentRepr {
    version: u32,
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    content: Vec<Node>,
}

impl TryFrom<DocumentRepr> for Document {
    type Error = ConvertError;

    fn try_from(repr: DocumentRepr) -> Result<Self, Self::Error> {
        if repr.version != DOCUMENT_VERSION {
            return Err(ConvertError::InvalidDocument(format!(
                "unsupported version {}",
                repr.version
            )));
        }
        if repr.tag != "doc" {
            return Err(ConvertError::InvalidDocument(format!(
                "root type must be `doc`, found `{}`",
                repr.tag
            )));
        }
        Ok(Document::new(repr.content))
    }
}

impl Document {
    /// Creates a document around top-level blocks.
    pub fn new(content: Vec<Node>) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            tag: DocTag::Doc,
            content,
        }
    }

    /// The document with no content.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Schema version (always 1).
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Root type tag (always `doc`).
    pub fn doc_type(&self) -> &'static str {
        "doc"
    }

    /// True when the document has no top-level blocks.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Visits every node in document order.
    pub fn walk<F: FnMut(&Node)>(&self, mut f: F) {
        for node in &self.content {
            node.walk(&mut f);
        }
    }

    /// Number of nodes of each type, text nodes included.
    pub fn node_type_counts(&self) -> BTreeMap<NodeType, u64> {
        let mut counts = BTreeMap::new();
        self.walk(|node| *counts.entry(node.node_type).or_insert(0) += 1);
        counts
    }

    /// Serializes to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }

    /// Serializes to indented JSON.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| String::from("{}"))
    }

    /// Serializes to a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_shape() {
        let doc = Document::empty();
        assert_eq!(
            doc.to_value(),
            json!({"version": 1, "type": "doc", "content": []})
        );
    }

    #[test]
    fn text_node_serializes_marks() {
        let node = Node::text_with_marks("hi", &[Mark::Bold, Mark::link("https://x.io")]);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "type": "text",
                "text": "hi",
                "marks": [
                    {"type": "strong"},
                    {"type": "link", "attrs": {"href": "https://x.io"}}
                ]
            })
        );
    }

    #[test]
    fn empty_attrs_are_omitted() {
        let node = Node::paragraph(vec![Node::text("a")]);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type": "paragraph", "content": [{"type": "text", "text": "a"}]})
        );
    }

    #[test]
    fn heading_level_is_bounded() {
        assert!(Node::heading(0, Vec::new()).is_err());
        assert!(Node::heading(7, Vec::new()).is_err());
        let h = Node::heading(6, Vec::new()).unwrap();
        assert_eq!(h.attr("level"), Some(&json!(6)));
    }

    #[test]
    fn deserialize_rejects_wrong_root() {
        let bad = r#"{"version": 2, "type": "doc", "content": []}"#;
        assert!(serde_json::from_str::<Document>(bad).is_err());

        let bad = r#"{"version": 1, "type": "page", "content": []}"#;
        assert!(serde_json::from_str::<Document>(bad).is_err());

        let good = r#"{"version": 1, "type": "doc", "content": [{"type": "rule"}]}"#;
        let doc: Document = serde_json::from_str(good).unwrap();
        assert_eq!(doc.content[0].node_type, NodeType::Rule);
    }

    #[test]
    fn walk_visits_in_document_order() {
        let doc = Document::new(vec![
            Node::paragraph(vec![Node::text("a"), Node::text("b")]),
            Node::leaf(NodeType::Rule),
        ]);
        let mut seen = Vec::new();
        doc.walk(|n| seen.push(n.node_type));
        assert_eq!(
            seen,
            vec![
                NodeType::Paragraph,
                NodeType::Text,
                NodeType::Text,
                NodeType::Rule
            ]
        );
    }

    #[test]
    fn node_type_counts_include_text() {
        let doc = Document::new(vec![
            Node::paragraph(vec![Node::text("a"), Node::text("b")]),
            Node::paragraph(vec![]),
        ]);
        let counts = doc.node_type_counts();
        assert_eq!(counts.get(&NodeType::Paragraph), Some(&2));
        assert_eq!(counts.get(&NodeType::Text), Some(&2));
        assert_eq!(counts.get(&NodeType::Rule), None);
    }
}
