#![deny(missing_docs)]
//! adfmark core: the document model, macro preprocessing, and mark validation.
//!
//! Everything here is a pure function of its input. The conversion engine
//! (parsers, plugin registry, cache) lives in `adfmark-engine`.

/// Code fence and code span detection.
pub mod code_fence;
/// Directive block syntax (`:::name attrs` … `:::`).
pub mod directives;
/// Conversion and plugin error types.
pub mod error;
/// Legal mark combinations.
pub mod marks;
/// Document tree types.
pub mod node;
/// Macro rewriting into sentinel tokens.
pub mod preprocess;
/// Sentinel token codec.
pub mod sentinel;

pub use error::{ConvertError, PluginError};
pub use marks::{marks_are_valid, validate_marks};
pub use node::{Attrs, ColorAttrs, DOCUMENT_VERSION, Document, LinkAttrs, Mark, Node, NodeType};
pub use preprocess::preprocess;
pub use sentinel::{DateValue, Segment, Sentinel, split_sentinels};
