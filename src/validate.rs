//! Strict-mode pre-check of component tag balance.

use crate::error::{FormatError, Result};
use crate::syntax::tag::{is_capitalized, lex_open_tag, LexError};
use crate::syntax::protected_lines;
use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`\n]+`").unwrap());

/// Check that every capitalized tag outside code is well formed and closed
/// by a matching tag.
pub fn validate_mdx(text: &str) -> Result<()> {
    let source = strip_code(text);
    let bytes = source.as_bytes();
    let mut open: Vec<String> = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        if source[i..].starts_with("<!--") {
            i = source[i..].find("-->").map_or(bytes.len(), |p| i + p + 3);
            continue;
        }
        if let Some(rest) = source[i + 1..].strip_prefix('/') {
            let name: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
                .collect();
            if is_capitalized(&name) {
                match open.pop() {
                    Some(expected) if expected == name => {}
                    Some(expected) => {
                        return Err(FormatError::Validation(format!(
                            "Mismatched JSX tags. Expected </{}> but found </{}>",
                            expected, name
                        )))
                    }
                    None => {
                        return Err(FormatError::Validation(format!(
                            "Unexpected closing tag </{}>",
                            name
                        )))
                    }
                }
            }
            i += 2 + name.len();
            continue;
        }
        if !bytes.get(i + 1).is_some_and(u8::is_ascii_uppercase) {
            i += 1;
            continue;
        }

        match lex_open_tag(&source, i) {
            Ok(tag) => {
                if !tag.self_closing {
                    open.push(tag.name);
                }
                i = tag.end;
            }
            Err(LexError::UnterminatedQuote { .. }) => {
                return Err(FormatError::Validation("Unclosed attribute quotes".to_string()))
            }
            Err(LexError::Unterminated { name }) => {
                return Err(FormatError::Validation(format!("Unterminated tag <{}>", name)))
            }
            Err(LexError::NotATag) => i += 1,
        }
    }

    if open.is_empty() {
        Ok(())
    } else {
        Err(FormatError::Validation(format!(
            "Unclosed JSX tags: {}",
            open.join(", ")
        )))
    }
}

/// Blank out frontmatter, fenced code and inline code spans.
fn strip_code(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let protected = protected_lines(&lines);
    let kept: Vec<&str> = lines
        .iter()
        .zip(protected)
        .map(|(line, protected)| if protected { "" } else { *line })
        .collect();
    let joined = kept.join("\n");
    INLINE_CODE
        .replace_all(&joined, |caps: &regex::Captures| " ".repeat(caps[0].len()))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> String {
        match validate_mdx(text) {
            Err(FormatError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_balanced_document() {
        assert!(validate_mdx("# T\n\n<Card title=\"a\">\n\n<Img src=\"x\" />\n\n</Card>\n").is_ok());
    }

    #[test]
    fn test_mismatched_tags() {
        assert_eq!(
            message("<A>\n<B>\n</A>\n</B>"),
            "Mismatched JSX tags. Expected </B> but found </A>"
        );
    }

    #[test]
    fn test_unclosed_tags() {
        assert_eq!(message("<A>\n<B>\ntext"), "Unclosed JSX tags: A, B");
    }

    #[test]
    fn test_unclosed_quote() {
        assert_eq!(message("<Img src=\"a.png />\n"), "Unclosed attribute quotes");
    }

    #[test]
    fn test_code_is_ignored() {
        assert!(validate_mdx("```jsx\n<Open>\n```\n\nUse `<Tabs>` here.\n").is_ok());
    }

    #[test]
    fn test_html_is_not_checked() {
        assert!(validate_mdx("<div>\n<p>unclosed\n").is_ok());
    }
}
