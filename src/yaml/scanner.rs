//! Line scanner for the YAML codec.
//!
//! Splits a document into indented logical lines, carving trailing comments
//! while respecting quoted scalars. The original text of every line is kept
//! so comments and block scalar bodies can be reproduced verbatim.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub(crate) struct Line {
    /// 1-based source line number.
    pub number: usize,
    /// The original line, without its newline.
    pub raw: String,
    /// Count of leading spaces.
    pub indent: usize,
    /// Text after the indent and before any trailing comment, right-trimmed.
    pub content: String,
    /// Trailing comment including the `#`, if any.
    pub comment: Option<String>,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.content.is_empty() && self.comment.is_none()
    }

    pub fn is_comment_only(&self) -> bool {
        self.content.is_empty() && self.comment.is_some()
    }
}

pub(crate) fn scan(input: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    for (idx, raw) in input.lines().enumerate() {
        let number = idx + 1;
        let indent = raw.chars().take_while(|c| *c == ' ').count();
        let rest = &raw[indent..];
        if rest.starts_with('\t') {
            return Err(Error::parse(number, "tabs are not allowed in indentation"));
        }

        let (content, comment) = split_comment(rest);
        lines.push(Line {
            number,
            raw: raw.to_string(),
            indent,
            content: content.trim_end().to_string(),
            comment,
        });
    }
    Ok(lines)
}

/// Splits `text` into content and a trailing comment. A `#` opens a comment
/// only at the start of the text or after whitespace, and only outside
/// quoted scalars.
fn split_comment(text: &str) -> (&str, Option<String>) {
    let mut in_single = false;
    let mut in_double = false;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' if !in_double => {
                if in_single {
                    // '' is an escaped quote inside a single-quoted scalar.
                    if matches!(chars.peek(), Some((_, '\''))) {
                        chars.next();
                    } else {
                        in_single = false;
                    }
                } else {
                    in_single = true;
                }
            }
            '"' if !in_single => {
                if in_double {
                    if prev != Some('\\') {
                        in_double = false;
                    }
                } else {
                    in_double = true;
                }
            }
            '#' if !in_single && !in_double => {
                if i == 0 || matches!(prev, Some(' ') | Some('\t')) {
                    return (&text[..i], Some(text[i..].trim_end().to_string()));
                }
            }
            _ => {}
        }
        prev = Some(c);
    }
    (text, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_indent_and_content() {
        let lines = scan("a: 1\n  b: 2\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].indent, 0);
        assert_eq!(lines[0].content, "a: 1");
        assert_eq!(lines[1].indent, 2);
        assert_eq!(lines[1].content, "b: 2");
    }

    #[test]
    fn carves_trailing_comments() {
        let lines = scan("a: 1 # note\n# full\n\n").unwrap();
        assert_eq!(lines[0].content, "a: 1");
        assert_eq!(lines[0].comment.as_deref(), Some("# note"));
        assert!(lines[1].is_comment_only());
        assert!(lines[2].is_blank());
    }

    #[test]
    fn hash_inside_quotes_is_content() {
        let lines = scan("a: \"x # y\"\nb: 'it''s # here'\n").unwrap();
        assert_eq!(lines[0].content, "a: \"x # y\"");
        assert!(lines[0].comment.is_none());
        assert_eq!(lines[1].content, "b: 'it''s # here'");
        assert!(lines[1].comment.is_none());
    }

    #[test]
    fn hash_without_leading_space_is_content() {
        let lines = scan("a: b#c\n").unwrap();
        assert_eq!(lines[0].content, "a: b#c");
        assert!(lines[0].comment.is_none());
    }

    #[test]
    fn rejects_tab_indentation() {
        assert!(scan("a:\n\tb: 1\n").is_err());
    }
}
