//! Code fence and code span detection.
//!
//! Macro rewriting and block scanning both need to know which parts of the
//! input are literal code. Fences are tracked line by line; inline code spans
//! are located per line.

use std::ops::Range;

/// Fence parsing phases tracked across lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FencePhase {
    /// Not currently inside a fence.
    #[default]
    Outside,
    /// Within fence contents.
    InsideFence,
}

/// Current fence state (phase, marker, indent, and length).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceState {
    /// Current fence phase.
    pub phase: FencePhase,
    /// Fence marker character (``` or ~~~).
    pub marker: Option<char>,
    /// Leading whitespace count captured at opening.
    pub indent: usize,
    /// Length of the opening fence (number of ` or ~ characters).
    pub length: usize,
}

impl Default for FenceState {
    fn default() -> Self {
        FenceState {
            phase: FencePhase::Outside,
            marker: None,
            indent: 0,
            length: 0,
        }
    }
}

/// Outcome of processing a single line for fence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineParseOutcome {
    /// State to carry into the next line.
    pub next_state: FenceState,
    /// Whether the line belongs to a fence (opener, body, or closer).
    pub verbatim: bool,
}

/// An opening fence line: marker, run length and the info string after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceOpener<'a> {
    /// Fence marker character.
    pub marker: char,
    /// Number of marker characters in the run.
    pub length: usize,
    /// Trimmed info string (`rust` in ```` ```rust ````); empty when absent.
    pub info: &'a str,
}

impl FenceOpener<'_> {
    /// First word of the info string, used as the code language.
    pub fn language(&self) -> Option<&str> {
        self.info.split_whitespace().next()
    }
}

/// Advance fence state based on a single line of text.
pub fn advance_fence_state(line: &str, state: FenceState) -> LineParseOutcome {
    let (visual_indent, byte_offset) = leading_whitespace_info(line);
    let after_indent = &line[byte_offset..];

    let mut next_state = state;
    let mut verbatim = matches!(state.phase, FencePhase::InsideFence);

    if matches!(state.phase, FencePhase::Outside) && visual_indent <= 3 {
        // 4+ columns of indentation is never a fence opener
        if let Some((marker, length)) = detect_fence_marker_with_length(after_indent) {
            next_state = FenceState {
                phase: FencePhase::InsideFence,
                marker: Some(marker),
                indent: visual_indent,
                length,
            };
            verbatim = true;
        }
    } else if matches!(state.phase, FencePhase::InsideFence)
        && visual_indent <= 3
        && is_closing_fence(after_indent)
    {
        if let Some((marker, closer_len)) = detect_fence_marker_with_length(after_indent)
            && Some(marker) == state.marker
            && closer_len >= state.length
        {
            next_state = FenceState::default();
            verbatim = true;
        }
    }

    LineParseOutcome {
        next_state,
        verbatim,
    }
}

/// Parses a fence opener line, returning `None` when the line does not open a fence.
///
/// Backtick fences may not carry a backtick in their info string.
pub fn fence_opener(line: &str) -> Option<FenceOpener<'_>> {
    let (visual_indent, byte_offset) = leading_whitespace_info(line);
    if visual_indent > 3 {
        return None;
    }
    let after_indent = &line[byte_offset..];
    let (marker, length) = detect_fence_marker_with_length(after_indent)?;
    let info = after_indent[length * marker.len_utf8()..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some(FenceOpener {
        marker,
        length,
        info,
    })
}

/// Returns true when `line` closes a fence opened with `marker` repeated `length` times.
pub fn closes_fence(line: &str, marker: char, length: usize) -> bool {
    let (visual_indent, byte_offset) = leading_whitespace_info(line);
    let after_indent = &line[byte_offset..];
    visual_indent <= 3
        && is_closing_fence(after_indent)
        && detect_fence_marker_with_length(after_indent)
            .is_some_and(|(m, len)| m == marker && len >= length)
}

/// Marks every line of `lines` that sits inside a fence (delimiters included).
pub fn verbatim_lines<S: AsRef<str>>(lines: &[S]) -> Vec<bool> {
    let mut state = FenceState::default();
    lines
        .iter()
        .map(|line| {
            let outcome = advance_fence_state(line.as_ref(), state);
            state = outcome.next_state;
            outcome.verbatim
        })
        .collect()
}

/// Byte ranges of inline code spans in `text`, delimiters included.
///
/// A span opens with a run of backticks and closes with the next run of the
/// same length. Unmatched runs are plain text.
pub fn code_span_ranges(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let open_start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - open_start;

        let mut j = i;
        let mut close_end = None;
        while j < bytes.len() {
            if bytes[j] != b'`' {
                j += 1;
                continue;
            }
            let close_start = j;
            while j < bytes.len() && bytes[j] == b'`' {
                j += 1;
            }
            if j - close_start == run {
                close_end = Some(j);
                break;
            }
        }

        match close_end {
            Some(end) => {
                spans.push(open_start..end);
                i = end;
            }
            None => {
                // no closer for this run length; the run is literal
            }
        }
    }

    spans
}

/// Returns (visual_columns, byte_offset) for leading whitespace.
/// Tabs expand to the next 4-column boundary.
fn leading_whitespace_info(line: &str) -> (usize, usize) {
    let mut col = 0;
    let mut bytes = 0;
    for b in line.bytes() {
        match b {
            b' ' => {
                col += 1;
                bytes += 1;
            }
            b'\t' => {
                col += 4 - (col % 4);
                bytes += 1;
            }
            _ => break,
        }
    }
    (col, bytes)
}

fn detect_fence_marker_with_length(after_indent: &str) -> Option<(char, usize)> {
    let mut chars = after_indent.chars();
    let first = chars.next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run_len = 1 + chars.take_while(|c| *c == first).count();
    if run_len >= 3 {
        Some((first, run_len))
    } else {
        None
    }
}

/// A closing fence has only fence markers followed by optional whitespace.
fn is_closing_fence(after_indent: &str) -> bool {
    let mut chars = after_indent.chars();
    let first = match chars.next() {
        Some(c) if c == '`' || c == '~' => c,
        _ => return false,
    };
    let mut count = 1;
    for c in chars.by_ref() {
        if c == first {
            count += 1;
        } else {
            return count >= 3 && c.is_whitespace() && chars.all(|c| c.is_whitespace());
        }
    }
    count >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_and_closes_backtick_fence() {
        let start = advance_fence_state("```js", FenceState::default());
        assert!(start.verbatim);
        assert_eq!(start.next_state.phase, FencePhase::InsideFence);
        assert_eq!(start.next_state.marker, Some('`'));

        let inner = advance_fence_state("{date:2024-01-01}", start.next_state);
        assert!(inner.verbatim);

        let end = advance_fence_state("```", inner.next_state);
        assert!(end.verbatim);
        assert_eq!(end.next_state.phase, FencePhase::Outside);
    }

    #[test]
    fn deeply_indented_fence_not_opened() {
        let outcome = advance_fence_state("    ```js", FenceState::default());
        assert!(!outcome.verbatim);
        assert_eq!(outcome.next_state.phase, FencePhase::Outside);
    }

    #[test]
    fn ignores_mismatched_marker() {
        let start = advance_fence_state("~~~ts", FenceState::default());
        let still_inside = advance_fence_state("```", start.next_state);
        assert!(still_inside.verbatim);
        assert_eq!(still_inside.next_state.marker, Some('~'));
    }

    #[test]
    fn four_backtick_fence_contains_three_backtick() {
        let start = advance_fence_state("````markdown", FenceState::default());
        assert_eq!(start.next_state.length, 4);

        let inner_open = advance_fence_state("```js", start.next_state);
        let inner_close = advance_fence_state("```", inner_open.next_state);
        assert_eq!(inner_close.next_state.phase, FencePhase::InsideFence);

        let outer_close = advance_fence_state("````", inner_close.next_state);
        assert_eq!(outer_close.next_state.phase, FencePhase::Outside);
    }

    #[test]
    fn opener_reports_language() {
        let opener = fence_opener("```rust title=\"main.rs\"").unwrap();
        assert_eq!(opener.marker, '`');
        assert_eq!(opener.length, 3);
        assert_eq!(opener.language(), Some("rust"));

        let bare = fence_opener("~~~~").unwrap();
        assert_eq!(bare.length, 4);
        assert_eq!(bare.language(), None);

        assert!(fence_opener("``not a fence").is_none());
        assert!(fence_opener("``` a`b").is_none());
    }

    #[test]
    fn closer_must_be_long_enough() {
        assert!(closes_fence("````", '`', 3));
        assert!(!closes_fence("```", '`', 4));
        assert!(!closes_fence("~~~", '`', 3));
        assert!(!closes_fence("``` rust", '`', 3));
    }

    #[test]
    fn verbatim_mask_covers_fence_lines() {
        let lines = ["intro", "```", "code", "```", "outro"];
        assert_eq!(
            verbatim_lines(&lines),
            vec![false, true, true, true, false]
        );
    }

    #[test]
    fn finds_code_spans() {
        let text = "a `b` c ``d ` e`` f";
        let spans = code_span_ranges(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[0].clone()], "`b`");
        assert_eq!(&text[spans[1].clone()], "``d ` e``");
    }

    #[test]
    fn unmatched_backticks_are_literal() {
        assert!(code_span_ranges("it`s fine").is_empty());
        assert!(code_span_ranges("``a`").is_empty());
    }
}
