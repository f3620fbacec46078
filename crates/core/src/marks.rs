//! Legal mark combinations.
//!
//! The document format rejects text nodes whose marks conflict. The filter
//! below is total and idempotent, so it can run wherever a text node is built.

use crate::node::Mark;

/// Filters a mark list down to a legal combination.
///
/// - `code` excludes everything except `link`.
/// - `link` excludes `textColor`.
/// - A mark type appears at most once; the first occurrence wins.
///
/// Input order is otherwise preserved.
pub fn validate_marks(marks: &[Mark]) -> Vec<Mark> {
    let has_code = marks.iter().any(|m| matches!(m, Mark::Code));
    let has_link = marks.iter().any(|m| matches!(m, Mark::Link { .. }));

    let mut out: Vec<Mark> = Vec::with_capacity(marks.len());
    for mark in marks {
        let allowed = match mark {
            Mark::Code | Mark::Link { .. } => true,
            _ if has_code => false,
            Mark::TextColor { .. } => !has_link,
            _ => true,
        };
        if allowed && !out.iter().any(|kept| kept.tag() == mark.tag()) {
            out.push(mark.clone());
        }
    }
    out
}

/// True when `marks` is already a legal combination.
pub fn marks_are_valid(marks: &[Mark]) -> bool {
    validate_marks(marks).as_slice() == marks
}
