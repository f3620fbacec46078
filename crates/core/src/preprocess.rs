//! Macro preprocessing.
//!
//! Rewrites the wiki-style macros into sentinel tokens before block parsing:
//!
//! ```text
//! {panel:warning}          →  ⟨panel warning⟩ (own line)
//! Careful.                     Careful.
//! {panel}                  →  ⟨/panel⟩ (own line)
//!
//! {status:green}Done{status}   →  ⟨status green Done⟩
//! @[Ada Lovelace]              →  ⟨mention Ada Lovelace⟩
//! {date:2024-03-01}            →  ⟨date 2024-03-01⟩   (invalid days become ⟨date now⟩)
//! ```
//!
//! Code fences and inline code spans are left untouched, and syntax without
//! a matching partner stays verbatim.

use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::code_fence::{code_span_ranges, verbatim_lines};
use crate::sentinel::{DateValue, Sentinel, strip_reserved};

static PANEL_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\{panel:(?:type=)?([A-Za-z]+)\}(.*)$").expect("valid panel opener regex")
});
static PANEL_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\{panel\}\s*$").expect("valid panel closer regex"));
static PANEL_INLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\{panel:(?:type=)?([A-Za-z]+)\}(.*?)\{panel\}\s*$")
        .expect("valid inline panel regex")
});
static STATUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{status:([A-Za-z]+)\}(.*?)\{status\}").expect("valid status regex")
});
static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\[([^\]\n]+)\]").expect("valid mention regex"));
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{date:([^}\n]*)\}").expect("valid date regex"));

/// How a source line takes part in a panel region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PanelRole {
    None,
    Open,
    Close,
    Inline,
}

/// Rewrites macro syntax into sentinel tokens. Never fails.
pub fn preprocess(input: &str) -> String {
    let cleaned = strip_reserved(input);
    let lines: Vec<&str> = cleaned.lines().collect();
    let verbatim = verbatim_lines(&lines);
    let roles = pair_panels(&lines, &verbatim);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        if verbatim[index] {
            out.push((*line).to_string());
            continue;
        }

        match roles[index] {
            PanelRole::None => out.push(rewrite_inline(line)),
            PanelRole::Inline => {
                if let Some(caps) = PANEL_INLINE_RE.captures(line) {
                    out.push(panel_start(&caps[1]));
                    push_nonblank(&mut out, rewrite_inline(caps[2].trim()));
                    out.push(Sentinel::PanelEnd.encode());
                }
            }
            PanelRole::Open => {
                if let Some(caps) = PANEL_OPEN_RE.captures(line) {
                    out.push(panel_start(&caps[1]));
                    push_nonblank(&mut out, rewrite_inline(caps[2].trim()));
                }
            }
            PanelRole::Close => {
                if let Some(caps) = PANEL_CLOSE_RE.captures(line) {
                    push_nonblank(&mut out, rewrite_inline(caps[1].trim()));
                    out.push(Sentinel::PanelEnd.encode());
                }
            }
        }
    }

    out.join("\n")
}

/// Pairs panel openers with closers; unpaired delimiters keep role `None`.
fn pair_panels(lines: &[&str], verbatim: &[bool]) -> Vec<PanelRole> {
    let mut roles = vec![PanelRole::None; lines.len()];
    let mut open: Vec<usize> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if verbatim[index] {
            continue;
        }
        if PANEL_INLINE_RE.is_match(line) {
            roles[index] = PanelRole::Inline;
        } else if PANEL_OPEN_RE.is_match(line) {
            open.push(index);
        } else if PANEL_CLOSE_RE.is_match(line)
            && let Some(opener) = open.pop()
        {
            roles[opener] = PanelRole::Open;
            roles[index] = PanelRole::Close;
        }
    }

    if !open.is_empty() {
        debug!("{} panel opener(s) without a closer left verbatim", open.len());
    }
    roles
}

fn panel_start(panel_type: &str) -> String {
    Sentinel::PanelStart {
        panel_type: panel_type.to_ascii_lowercase(),
    }
    .encode()
}

fn push_nonblank(out: &mut Vec<String>, line: String) {
    if !line.trim().is_empty() {
        out.push(line);
    }
}

/// Applies the inline macro rewrites outside code spans.
fn rewrite_inline(line: &str) -> String {
    let spans = code_span_ranges(line);
    if spans.is_empty() {
        return rewrite_segment(line);
    }

    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for span in spans {
        out.push_str(&rewrite_segment(&line[last..span.start]));
        out.push_str(&line[span.clone()]);
        last = span.end;
    }
    out.push_str(&rewrite_segment(&line[last..]));
    out
}

fn rewrite_segment(text: &str) -> String {
    let text = STATUS_RE.replace_all(text, |caps: &Captures<'_>| {
        Sentinel::Status {
            color: caps[1].to_ascii_lowercase(),
            text: caps[2].trim().to_string(),
        }
        .encode()
    });
    let text = MENTION_RE.replace_all(&text, |caps: &Captures<'_>| {
        let name = caps[1].trim();
        if name.is_empty() {
            caps[0].to_string()
        } else {
            Sentinel::Mention {
                name: name.to_string(),
            }
            .encode()
        }
    });
    let text = DATE_RE.replace_all(&text, |caps: &Captures<'_>| {
        Sentinel::Date {
            value: DateValue::parse(&caps[1]),
        }
        .encode()
    });
    text.into_owned()
}
