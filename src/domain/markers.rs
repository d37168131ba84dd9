//! Provenance markers for AI-generated spans inside a document.
//!
//! A marked span looks like:
//!
//! ```text
//! <!-- AI-GENERATED-START: 2024-01-01T00:00:00.000Z -->
//! generated text
//! <!-- AI-GENERATED-END -->
//! ```
//!
//! The token syntax is persisted in user documents and must stay bit-exact.
//! Extraction is non-greedy, left-to-right and non-nested. Nested or dangling
//! markers are not an error for the lenient operations (they match whatever the
//! scan finds); use [`validate`] to reject them explicitly.

use crate::domain::DomainError;
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;

pub const MARKER_START: &str = "<!-- AI-GENERATED-START:";
pub const MARKER_END: &str = "<!-- AI-GENERATED-END -->";

static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!-- AI-GENERATED-START: (.*?) -->\n((?s:.*?))\n<!-- AI-GENERATED-END -->")
        .expect("section regex")
});
static START_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!-- AI-GENERATED-START:.*? -->\n").expect("start line regex"));
static END_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n<!-- AI-GENERATED-END -->").expect("end line regex"));
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<start><!-- AI-GENERATED-START:.*? -->)|(?P<end><!-- AI-GENERATED-END -->)")
        .expect("token regex")
});

/// One AI-attributed region found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedSection {
    /// Timestamp exactly as written in the start marker.
    pub timestamp: String,
    /// Text between the markers, without the framing newlines.
    pub content: String,
    /// The whole matched marker block.
    pub raw: String,
    /// Byte range of `raw` in the scanned text.
    pub range: Range<usize>,
}

impl MarkedSection {
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Character statistics for AI vs manual content.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStats {
    pub total_sections: usize,
    /// Length of the whole text, markers included.
    pub total_characters: usize,
    /// Sum of section content lengths, markers excluded.
    pub ai_characters: usize,
    pub manual_characters: usize,
    /// `ai / total * 100`, one decimal; `0.0` for empty text.
    pub ai_percentage: f64,
}

/// Render a marker timestamp: RFC 3339, UTC, millisecond precision, `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Wrap `text` in markers stamped with the current time.
pub fn wrap(text: &str) -> String {
    wrap_at(text, Utc::now())
}

/// Wrap `text` in markers stamped with `ts`.
pub fn wrap_at(text: &str, ts: DateTime<Utc>) -> String {
    format!(
        "\n{} {} -->\n{}\n{}\n",
        MARKER_START,
        format_timestamp(ts),
        text,
        MARKER_END
    )
}

pub fn has_markers(text: &str) -> bool {
    text.contains(MARKER_START)
}

/// All marked sections, in document order.
pub fn extract_sections(text: &str) -> Vec<MarkedSection> {
    SECTION_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(MarkedSection {
                timestamp: caps.get(1)?.as_str().to_string(),
                content: caps.get(2)?.as_str().to_string(),
                raw: whole.as_str().to_string(),
                range: whole.range(),
            })
        })
        .collect()
}

/// Remove every start line and every end line, keeping the wrapped content.
pub fn strip_markers(text: &str) -> String {
    let without_start = START_LINE_RE.replace_all(text, "");
    END_LINE_RE.replace_all(&without_start, "").into_owned()
}

/// Replace each marker pair with a `div` carrying the timestamp, for preview rendering.
pub fn annotate(text: &str) -> String {
    SECTION_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let timestamp = &caps[1];
            let human = parse_timestamp(timestamp)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| timestamp.to_string());
            format!(
                "<div class=\"ai-generated-section\" data-timestamp=\"{}\" title=\"AI-generated on {}\">\n{}\n</div>",
                escape_attr(timestamp),
                escape_attr(&human),
                &caps[2]
            )
        })
        .into_owned()
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Lengths are counted in Unicode scalar values.
pub fn stats(text: &str) -> MarkerStats {
    let sections = extract_sections(text);
    let total_characters = text.chars().count();
    let ai_characters: usize = sections.iter().map(|s| s.content.chars().count()).sum();
    let ai_percentage = if total_characters == 0 {
        0.0
    } else {
        (ai_characters as f64 / total_characters as f64 * 1000.0).round() / 10.0
    };

    MarkerStats {
        total_sections: sections.len(),
        total_characters,
        ai_characters,
        manual_characters: total_characters - ai_characters,
        ai_percentage,
    }
}

/// Check that markers form well-framed, non-nested, terminated pairs.
pub fn validate(text: &str) -> Result<(), DomainError> {
    let mut open: Option<usize> = None;

    for caps in TOKEN_RE.captures_iter(text) {
        if let Some(start) = caps.name("start") {
            if let Some(outer) = open {
                return Err(malformed(
                    start.start(),
                    format!("start marker nested inside section opened at byte {}", outer),
                ));
            }
            let token = start.as_str();
            let ts = token
                .strip_prefix(MARKER_START)
                .and_then(|rest| rest.strip_prefix(' '))
                .and_then(|rest| rest.strip_suffix(" -->"))
                .unwrap_or("");
            if ts.is_empty() {
                return Err(malformed(start.start(), "start marker has no timestamp"));
            }
            if !text[start.end()..].starts_with('\n') {
                return Err(malformed(start.end(), "start marker not followed by newline"));
            }
            open = Some(start.start());
        } else if let Some(end) = caps.name("end") {
            if open.take().is_none() {
                return Err(malformed(end.start(), "end marker without matching start"));
            }
            if !text[..end.start()].ends_with('\n') {
                return Err(malformed(end.start(), "end marker not preceded by newline"));
            }
        }
    }

    match open {
        Some(offset) => Err(malformed(offset, "unterminated start marker")),
        None => Ok(()),
    }
}

fn malformed(offset: usize, reason: impl Into<String>) -> DomainError {
    DomainError::MalformedMarkers {
        offset,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_wrap_exact_syntax() {
        let wrapped = wrap_at("Hello", fixed_ts());
        assert_eq!(
            wrapped,
            "\n<!-- AI-GENERATED-START: 2024-01-01T12:30:00.000Z -->\nHello\n<!-- AI-GENERATED-END -->\n"
        );
    }

    #[test]
    fn test_extract_recovers_content_and_timestamp() {
        let text = "  line one\n\ttabbed  ";
        let doc = format!("Intro.{}Outro.", wrap_at(text, fixed_ts()));

        let sections = extract_sections(&doc);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, text);
        assert_eq!(sections[0].timestamp, "2024-01-01T12:30:00.000Z");
        assert_eq!(sections[0].parsed_timestamp(), Some(fixed_ts()));
        assert_eq!(&doc[sections[0].range.clone()], sections[0].raw);
    }

    #[test]
    fn test_extract_empty_content() {
        let sections = extract_sections(&wrap_at("", fixed_ts()));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "");
    }

    #[test]
    fn test_extract_multiple_in_document_order() {
        let doc = format!(
            "a{}b{}c",
            wrap_at("first", fixed_ts()),
            wrap("second")
        );
        let contents: Vec<_> = extract_sections(&doc)
            .into_iter()
            .map(|s| s.content)
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn test_wrap_uses_current_time() {
        let before = Utc::now();
        let sections = extract_sections(&wrap("x"));
        let ts = sections[0].parsed_timestamp().unwrap();
        assert!(ts >= before - chrono::Duration::milliseconds(1));
        assert!(ts <= Utc::now());
    }

    #[test]
    fn test_strip_round_trip() {
        let t = "para 1\n\npara 2";
        assert_eq!(strip_markers(&wrap(t)), format!("\n{}\n", t));
    }

    #[test]
    fn test_strip_leaves_plain_text_alone() {
        let plain = "# Title\n<!-- a normal comment -->\nbody";
        assert_eq!(strip_markers(plain), plain);
    }

    #[test]
    fn test_has_markers() {
        assert!(has_markers(&wrap("x")));
        assert!(!has_markers("nothing here"));
        assert!(has_markers("<!-- AI-GENERATED-START: unterminated"));
    }

    #[test]
    fn test_annotate() {
        let doc = format!("Before{}After", wrap_at("Body", fixed_ts()));
        let html = annotate(&doc);
        assert_eq!(
            html,
            "Before\n<div class=\"ai-generated-section\" data-timestamp=\"2024-01-01T12:30:00.000Z\" title=\"AI-generated on 2024-01-01 12:30:00 UTC\">\nBody\n</div>\nAfter"
        );
    }

    #[test]
    fn test_annotate_unparsable_timestamp_is_escaped() {
        let doc = "<!-- AI-GENERATED-START: \"yesterday\" -->\nx\n<!-- AI-GENERATED-END -->";
        let html = annotate(doc);
        assert!(html.contains("data-timestamp=\"&quot;yesterday&quot;\""));
        assert!(html.contains("\nx\n</div>"));
    }

    #[test]
    fn test_stats() {
        let doc = format!("Manual.{}", wrap_at("0123456789", fixed_ts()));
        let s = stats(&doc);
        assert_eq!(s.total_sections, 1);
        assert_eq!(s.total_characters, doc.chars().count());
        assert_eq!(s.ai_characters, 10);
        assert_eq!(s.ai_characters + s.manual_characters, s.total_characters);
        let expected = (10.0 / doc.chars().count() as f64 * 1000.0).round() / 10.0;
        assert_eq!(s.ai_percentage, expected);
    }

    #[test]
    fn test_stats_empty() {
        let s = stats("");
        assert_eq!(s.total_characters, 0);
        assert_eq!(s.ai_characters, 0);
        assert_eq!(s.manual_characters, 0);
        assert_eq!(s.ai_percentage, 0.0);
    }

    #[test]
    fn test_stats_counts_chars_not_bytes() {
        let s = stats("héllo");
        assert_eq!(s.total_characters, 5);
        assert_eq!(s.manual_characters, 5);
    }

    #[test]
    fn test_validate_accepts_wrapped() {
        let doc = format!("x{}y{}", wrap("a"), wrap_at("", fixed_ts()));
        assert_eq!(validate(&doc), Ok(()));
        assert_eq!(validate("no markers"), Ok(()));
    }

    #[test]
    fn test_validate_rejects_nested() {
        let inner = wrap_at("inner", fixed_ts());
        let doc = wrap_at(&inner, fixed_ts());
        assert!(matches!(
            validate(&doc),
            Err(DomainError::MalformedMarkers { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_orphan_end() {
        let doc = "text\n<!-- AI-GENERATED-END -->\n";
        assert_eq!(
            validate(doc),
            Err(DomainError::MalformedMarkers {
                offset: 5,
                reason: "end marker without matching start".into()
            })
        );
    }

    #[test]
    fn test_validate_rejects_unterminated() {
        let doc = "\n<!-- AI-GENERATED-START: 2024-01-01T12:30:00.000Z -->\nbody";
        assert_eq!(
            validate(doc),
            Err(DomainError::MalformedMarkers {
                offset: 1,
                reason: "unterminated start marker".into()
            })
        );
    }
}
