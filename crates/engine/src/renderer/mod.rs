//! Block converter: block records to document nodes.
//!
//! # Module Structure
//!
//! - `context` - per-conversion state and the depth counter
//! - `render` - one function per block record kind

mod context;
pub mod render;

pub use context::Context;

use adfmark_core::{ConvertError, Document, Mark, Node, preprocess};

use crate::config::Limits;
use crate::registry::PluginRegistry;

/// Converts markdown into a document (entry point, no caching or recovery).
///
/// # Examples
///
/// ```
/// use adfmark_engine::config::Limits;
/// use adfmark_engine::registry::PluginRegistry;
/// use adfmark_engine::renderer::render_document;
///
/// let registry = PluginRegistry::with_builtins();
/// let doc = render_document("# Hi", &registry, Limits::default()).unwrap();
/// assert_eq!(doc.content[0].attr("level"), Some(&serde_json::json!(1)));
/// ```
pub fn render_document(
    markdown: &str,
    registry: &PluginRegistry,
    limits: Limits,
) -> Result<Document, ConvertError> {
    let source = preprocess(markdown);
    let mut ctx = Context::new(registry, limits);
    let content = ctx.convert_blocks(&source)?;
    Ok(Document::new(content))
}

/// Paragraph carrying an italic notice.
pub fn notice(message: impl Into<String>) -> Node {
    Node::paragraph(vec![Node::text_with_marks(message, &[Mark::Italic])])
}

/// Stands in for content nested past the depth limit.
pub fn depth_notice(max_depth: usize) -> Node {
    notice(format!(
        "[Truncated: maximum nesting depth of {max_depth} reached]"
    ))
}
