//! Sentinel tokens: in-band markers that carry a recognized macro's payload
//! from the preprocessor to the parsers.
//!
//! A token is `OPEN tag (SEP field)* CLOSE`, built from Unicode private-use
//! code points that never survive preprocessing in user text.

use chrono::NaiveDate;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Starts a sentinel token.
pub const OPEN: char = '\u{E000}';
/// Separates the tag and payload fields.
pub const SEP: char = '\u{E001}';
/// Ends a sentinel token.
pub const CLOSE: char = '\u{E002}';

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E000}([^\u{E000}\u{E002}]*)\u{E002}").expect("valid sentinel regex"));

/// Calendar day carried by a date sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateValue {
    /// A valid `YYYY-MM-DD` day.
    Day(NaiveDate),
    /// The input was not a valid day; resolve to the current time.
    Now,
}

impl DateValue {
    /// Parses `YYYY-MM-DD`; anything else becomes [`DateValue::Now`].
    pub fn parse(raw: &str) -> Self {
        parse_day(raw).map_or(DateValue::Now, DateValue::Day)
    }

    /// Milliseconds since the Unix epoch (midnight UTC for a day).
    pub fn timestamp_millis(&self) -> i64 {
        match self {
            DateValue::Day(day) => day
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc().timestamp_millis())
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
            DateValue::Now => chrono::Utc::now().timestamp_millis(),
        }
    }

    fn encode(&self) -> String {
        match self {
            DateValue::Day(day) => day.format("%Y-%m-%d").to_string(),
            DateValue::Now => String::from("now"),
        }
    }
}

/// Strict `YYYY-MM-DD` parsing.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// A decoded sentinel token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sentinel {
    /// Opens a `{panel:type}` region; stands alone on its line.
    PanelStart {
        /// Requested panel type, as written.
        panel_type: String,
    },
    /// Closes the innermost open panel region.
    PanelEnd,
    /// `{status:color}text{status}`.
    Status {
        /// Requested color, as written.
        color: String,
        /// Lozenge text.
        text: String,
    },
    /// `@[Full Name]`.
    Mention {
        /// Display name.
        name: String,
    },
    /// `{date:YYYY-MM-DD}`.
    Date {
        /// Resolved day or `Now`.
        value: DateValue,
    },
}

impl Sentinel {
    /// Encodes the token; payload fields are stripped of reserved characters.
    pub fn encode(&self) -> String {
        let fields: Vec<String> = match self {
            Sentinel::PanelStart { panel_type } => vec!["panel".into(), clean(panel_type)],
            Sentinel::PanelEnd => vec!["/panel".into()],
            Sentinel::Status { color, text } => vec!["status".into(), clean(color), clean(text)],
            Sentinel::Mention { name } => vec!["mention".into(), clean(name)],
            Sentinel::Date { value } => vec!["date".into(), value.encode()],
        };
        let mut out = String::new();
        out.push(OPEN);
        out.push_str(&fields.join(&SEP.to_string()));
        out.push(CLOSE);
        out
    }

    /// Decodes the body between `OPEN` and `CLOSE`.
    pub fn decode(body: &str) -> Option<Self> {
        let mut fields = body.split(SEP);
        let tag = fields.next()?;
        let sentinel = match tag {
            "panel" => Sentinel::PanelStart {
                panel_type: fields.next()?.to_string(),
            },
            "/panel" => Sentinel::PanelEnd,
            "status" => Sentinel::Status {
                color: fields.next()?.to_string(),
                text: fields.next()?.to_string(),
            },
            "mention" => Sentinel::Mention {
                name: fields.next()?.to_string(),
            },
            "date" => Sentinel::Date {
                value: DateValue::parse(fields.next()?),
            },
            _ => return None,
        };
        if fields.next().is_some() {
            return None;
        }
        Some(sentinel)
    }

    /// Decodes a line consisting of exactly one token.
    pub fn from_line(line: &str) -> Option<Self> {
        let body = line.trim().strip_prefix(OPEN)?.strip_suffix(CLOSE)?;
        if body.contains(OPEN) || body.contains(CLOSE) {
            return None;
        }
        Self::decode(body)
    }
}

/// A slice of inline text: plain text or a decoded token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text between tokens.
    Text(&'a str),
    /// A decoded token.
    Sentinel(Sentinel),
}

/// Splits text on sentinel tokens. Undecodable tokens are dropped.
pub fn split_sentinels(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in TOKEN_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            segments.push(Segment::Text(&text[last..whole.start()]));
        }
        match caps.get(1).and_then(|body| Sentinel::decode(body.as_str())) {
            Some(sentinel) => segments.push(Segment::Sentinel(sentinel)),
            None => debug!("dropping undecodable sentinel token at byte {}", whole.start()),
        }
        last = whole.end();
    }

    if last < text.len() {
        segments.push(Segment::Text(&text[last..]));
    }
    segments
}

/// Removes reserved code points so user text cannot forge a token.
pub fn strip_reserved(text: &str) -> String {
    text.chars().filter(|c| !is_reserved(*c)).collect()
}

/// True for the code points used to frame tokens.
pub fn is_reserved(c: char) -> bool {
    matches!(c, OPEN | SEP | CLOSE)
}

fn clean(field: &str) -> String {
    strip_reserved(field)
}
