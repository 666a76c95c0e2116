//! Reader for text-format attribute lists.
//!
//! Mobly runs leave their result and build attributes next to the summary
//! file as a text-format protocol buffer:
//!
//! ```text
//! attribute {
//!   key: "start"
//!   value: "1700000000000"
//! }
//! attribute { key: "devices" value: "serial" }
//! ```
//!
//! Only this shape is understood. `#` line comments and blank space
//! between blocks are allowed; anything else is rejected.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use xts_report_core::Attributes;

static ATTRIBUTE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"attribute\s*:?\s*\{((?:[^{}"]|"(?:[^"\\]|\\.)*")*)\}"#)
        .expect("static regex must compile")
});

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s*(\w+)\s*:\s*"((?:[^"\\]|\\.)*)"\s*;?"#).expect("static regex must compile")
});

/// Text-format attribute list errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextProtoError {
    /// Content that is not an `attribute { ... }` block.
    #[error("unexpected content at byte {offset}: {snippet:?}")]
    UnexpectedContent { offset: usize, snippet: String },
    /// A field other than `key` or `value` inside a block.
    #[error("unknown attribute field: {0}")]
    UnknownField(String),
}

/// Parses a text-format attribute list.
///
/// # Examples
///
/// ```
/// use xts_report_parser::textproto::parse_attribute_list;
///
/// let attrs = parse_attribute_list(r#"attribute { key: "a" value: "say \"hi\"" }"#).unwrap();
/// assert_eq!(attrs.get("a"), Some("say \"hi\""));
/// ```
pub fn parse_attribute_list(text: &str) -> Result<Attributes, TextProtoError> {
    let mut attributes = Attributes::new();
    let mut cursor = 0;

    for block in ATTRIBUTE_BLOCK.captures_iter(text) {
        let (Some(whole), Some(body)) = (block.get(0), block.get(1)) else {
            continue;
        };
        check_blank(text, cursor, whole.start())?;
        cursor = whole.end();

        let (key, value) = parse_block(body.as_str(), body.start())?;
        attributes.push(key, value);
    }
    check_blank(text, cursor, text.len())?;

    Ok(attributes)
}

fn parse_block(body: &str, offset: usize) -> Result<(String, String), TextProtoError> {
    let mut key = String::new();
    let mut value = String::new();
    let mut cursor = 0;

    for field in FIELD.captures_iter(body) {
        let (Some(whole), Some(name), Some(raw)) = (field.get(0), field.get(1), field.get(2))
        else {
            continue;
        };
        check_blank(body, cursor, whole.start()).map_err(|err| shift(err, offset))?;
        cursor = whole.end();

        match name.as_str() {
            "key" => key = unescape(raw.as_str()),
            "value" => value = unescape(raw.as_str()),
            other => return Err(TextProtoError::UnknownField(other.to_string())),
        }
    }
    check_blank(body, cursor, body.len()).map_err(|err| shift(err, offset))?;

    Ok((key, value))
}

/// Accepts whitespace and `#` line comments between `start` and `end`.
fn check_blank(text: &str, start: usize, end: usize) -> Result<(), TextProtoError> {
    let gap = &text[start..end];
    let mut in_comment = false;
    for (pos, c) in gap.char_indices() {
        match c {
            '\n' => in_comment = false,
            '#' => in_comment = true,
            _ if in_comment || c.is_whitespace() => {}
            _ => {
                return Err(TextProtoError::UnexpectedContent {
                    offset: start + pos,
                    snippet: gap[pos..].chars().take(32).collect(),
                });
            }
        }
    }
    Ok(())
}

fn shift(err: TextProtoError, by: usize) -> TextProtoError {
    match err {
        TextProtoError::UnexpectedContent { offset, snippet } => {
            TextProtoError::UnexpectedContent {
                offset: offset + by,
                snippet,
            }
        }
        other => other,
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_multi_line_blocks_in_order() {
        let text = r#"
# result attributes
attribute {
  key: "start"
  value: "1700000000000"
}
attribute {
  key: "devices"
  value: "serial-1"
}
"#;
        let attrs = parse_attribute_list(text).unwrap();
        assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["start", "devices"]);
        assert_eq!(attrs.get("devices"), Some("serial-1"));
    }

    #[test]
    fn test_missing_value_defaults_to_empty() {
        let attrs = parse_attribute_list(r#"attribute { key: "empty" }"#).unwrap();
        assert_eq!(attrs.get("empty"), Some(""));
    }

    #[test]
    fn test_braces_inside_strings_are_allowed() {
        let attrs = parse_attribute_list(r#"attribute { key: "json" value: "{\"a\": 1}" }"#).unwrap();
        assert_eq!(attrs.get("json"), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_escapes_are_decoded() {
        let attrs = parse_attribute_list(r#"attribute { key: "k" value: "a\nb\\c" }"#).unwrap();
        assert_eq!(attrs.get("k"), Some("a\nb\\c"));
    }

    #[test]
    fn test_empty_input_is_empty_list() {
        assert!(parse_attribute_list("").unwrap().is_empty());
        assert!(parse_attribute_list("  \n# nothing\n").unwrap().is_empty());
    }

    #[test]
    fn test_hash_inside_value_is_kept() {
        let text = "attribute { key: \"k\" value: \"a#b\" } # trailing comment\n";
        let attrs = parse_attribute_list(text).unwrap();
        assert_eq!(attrs.get("k"), Some("a#b"));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = parse_attribute_list("this is not a proto").unwrap_err();
        assert!(matches!(err, TextProtoError::UnexpectedContent { offset: 0, .. }));

        let err = parse_attribute_list(r#"attribute { key: "a" } trailing"#).unwrap_err();
        assert!(matches!(err, TextProtoError::UnexpectedContent { .. }));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = parse_attribute_list(r#"attribute { name: "a" }"#).unwrap_err();
        assert_eq!(err, TextProtoError::UnknownField("name".to_string()));
    }
}
