//! Locates the first embedded tag in a reply.

use std::ops::Range;

/// Byte ranges of a matched tag inside the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagMatch {
    /// Whole tag, from `[` through the closing `]`.
    pub(crate) span: Range<usize>,
    /// The JSON object between the braces, braces included.
    pub(crate) body: Range<usize>,
}

/// Result of scanning a reply for its first tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TagScan {
    /// No marker followed by an object.
    Absent,
    /// A complete `[<tag>: {...}]`.
    Complete(TagMatch),
    /// A marker followed by `{` whose object never balances or whose tag is
    /// not closed by `]`. Holds the offset of the marker.
    Incomplete(usize),
}

/// Find the first `[<tag>: {...}]` occurrence.
///
/// After the marker come optional whitespace, an object whose braces balance
/// (braces inside JSON strings are ignored), optional whitespace and `]`. The
/// first marker followed by `{` decides the outcome; markers without an
/// object after them are skipped.
pub(crate) fn find_tag(text: &str, tag: &str) -> TagScan {
    let marker = format!("[{tag}:");
    let mut from = 0;
    while let Some(offset) = text[from..].find(&marker) {
        let start = from + offset;
        let body_start = skip_whitespace(text, start + marker.len());
        if text[body_start..].starts_with('{') {
            return match close_tag(text, start, body_start) {
                Some(found) => TagScan::Complete(found),
                None => TagScan::Incomplete(start),
            };
        }
        // `[` is one byte, so this stays on a char boundary.
        from = start + 1;
    }
    TagScan::Absent
}

fn close_tag(text: &str, start: usize, body_start: usize) -> Option<TagMatch> {
    let body_end = object_end(text, body_start)?;
    let close = skip_whitespace(text, body_end);
    if !text[close..].starts_with(']') {
        return None;
    }
    Some(TagMatch {
        span: start..close + 1,
        body: body_start..body_end,
    })
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, ch)| !ch.is_whitespace())
        .map(|(idx, _)| from + idx)
        .unwrap_or(text.len())
}

/// Offset just past the `}` that closes the object opening at `start`.
fn object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    // Structural bytes are ASCII and never occur inside multi-byte UTF-8.
    for (idx, byte) in text.as_bytes()[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if *byte == b'\\' {
                escaped = true;
            } else if *byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{TagScan, find_tag};
    use pretty_assertions::assert_eq;

    fn matched(text: &str) -> Option<(&str, &str)> {
        match find_tag(text, "SAVE_DATA") {
            TagScan::Complete(found) => Some((&text[found.span], &text[found.body])),
            _ => None,
        }
    }

    #[test]
    fn nested_braces_balance() {
        let text = r#"ok [SAVE_DATA: {"a": {"b": {}}, "c": 1}] tail"#;
        assert_eq!(
            matched(text),
            Some((
                r#"[SAVE_DATA: {"a": {"b": {}}, "c": 1}]"#,
                r#"{"a": {"b": {}}, "c": 1}"#
            ))
        );
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let text = r#"[SAVE_DATA: {"summary": "use } and { and \" freely"}]"#;
        assert_eq!(matched(text).map(|(span, _)| span), Some(text));
    }

    #[test]
    fn whitespace_is_optional_around_the_object() {
        assert!(matched(r#"[SAVE_DATA:{"a":1}]"#).is_some());
        assert!(matched("[SAVE_DATA:\n  {\"a\":1}\n]").is_some());
    }

    #[test]
    fn unbalanced_object_is_incomplete() {
        assert_eq!(
            find_tag(r#"[SAVE_DATA: {"a": {"b": 1}]"#, "SAVE_DATA"),
            TagScan::Incomplete(0)
        );
        assert_eq!(
            find_tag(r#"x [SAVE_DATA: {"a": "unterminated}]"#, "SAVE_DATA"),
            TagScan::Incomplete(2)
        );
        assert_eq!(
            find_tag(r#"[SAVE_DATA: {"a": 1} no bracket"#, "SAVE_DATA"),
            TagScan::Incomplete(0)
        );
    }

    #[test]
    fn incomplete_object_stops_the_scan() {
        let text = r#"a [SAVE_DATA: {"s": {"b": 1}] b [SAVE_DATA: {"a":1}]"#;
        assert_eq!(find_tag(text, "SAVE_DATA"), TagScan::Incomplete(2));
    }

    #[test]
    fn marker_without_object_is_skipped_for_a_later_one() {
        let text = r#"[SAVE_DATA: nope] then [SAVE_DATA: {"a":1}]"#;
        assert_eq!(
            matched(text).map(|(span, _)| span),
            Some(r#"[SAVE_DATA: {"a":1}]"#)
        );
    }

    #[test]
    fn no_marker_is_absent() {
        assert_eq!(find_tag("plain [SAVE_DATA] text", "SAVE_DATA"), TagScan::Absent);
    }

    #[test]
    fn first_complete_tag_wins() {
        let text = r#"[SAVE_DATA: {"n":1}] and [SAVE_DATA: {"n":2}]"#;
        assert_eq!(matched(text).map(|(_, body)| body), Some(r#"{"n":1}"#));
    }

    #[test]
    fn multibyte_text_keeps_char_boundaries() {
        let text = "よく頑張ったね！[SAVE_DATA: {\"s\":\"数学\"}]";
        let TagScan::Complete(found) = find_tag(text, "SAVE_DATA") else {
            panic!("expected a complete tag");
        };
        assert_eq!(&text[..found.span.start], "よく頑張ったね！");
        assert_eq!(found.span.end, text.len());
    }
}
