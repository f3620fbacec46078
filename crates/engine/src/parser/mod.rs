//! Block and inline parsing of preprocessed text.

pub mod block;
pub mod inline;

pub use block::{BlockRecord, ListItemRecord, parse_blocks};
pub use inline::parse_inline;
