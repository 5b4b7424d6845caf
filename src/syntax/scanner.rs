//! Flow scanner for MDX constructs.
//!
//! Walks the document line by line, carving out frontmatter, admonitions,
//! ESM statements and flow-level component/HTML elements. Everything in
//! between is handed to the CommonMark parser as a prose run.

use super::markdown::parse_run;
use super::tag::{find_closing_tag, is_capitalized, lex_open_tag, LexError, TagKind};
use super::{protected_lines, Element, ElementBody, FenceTracker, NodeKind, SyntaxNode};
use crate::document::Document;
use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;

static ADJACENT_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"/><[A-Z]").unwrap());

/// Parse the whole document.
pub fn parse_document(doc: &Document) -> Result<SyntaxNode, ParseError> {
    let scanner = FlowScanner { doc };
    let children = scanner.parse_flow(0, doc.line_count(), 0)?;
    Ok(SyntaxNode::with_children(
        NodeKind::Root,
        doc.span(0, doc.text().len()),
        children,
    ))
}

/// Parse, and on failure retry once after joining stray `/>` lines onto
/// the tag they belong to. Returns the document that was actually parsed.
pub fn parse_with_recovery(doc: Document) -> Result<(Document, SyntaxNode), ParseError> {
    match parse_document(&doc) {
        Ok(tree) => Ok((doc, tree)),
        Err(err) => {
            let fixed = fix_standalone_closing_tags(doc.text());
            if fixed == doc.text() {
                return Err(err);
            }
            log::debug!("Parse failed ({}), retrying with `/>` joined", err);
            let fixed = Document::new(&fixed);
            let tree = parse_document(&fixed)?;
            Ok((fixed, tree))
        }
    }
}

/// Move every `/>` that sits alone on a line (outside code) onto the
/// previous non-blank line.
pub fn fix_standalone_closing_tags(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut fences = FenceTracker::default();

    for line in text.split('\n') {
        if fences.step(line) || line.trim() != "/>" {
            out.push(line.to_string());
            continue;
        }
        let Some(prev) = out.iter_mut().rev().find(|l| !l.trim().is_empty()) else {
            out.push(line.to_string());
            continue;
        };
        let trimmed = prev.trim_end().to_string();
        *prev = if trimmed.ends_with("/>") {
            trimmed
        } else if let Some(head) = trimmed.strip_suffix('>') {
            format!("{} />", head.trim_end())
        } else {
            format!("{} />", trimmed)
        };
    }
    out.join("\n")
}

/// Put component tags glued as `<A /><B />` on separate lines, with a blank
/// line between them. Code fences, frontmatter and inline code are skipped.
pub fn split_adjacent_tags(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let protected = protected_lines(&lines);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for (line, protected) in lines.iter().zip(protected) {
        if protected {
            out.push(line.to_string());
            continue;
        }
        let indent = &line[..line.len() - line.trim_start().len()];
        let mut current = line.to_string();
        while let Some(split) = glued_tag_split(&current) {
            let rest = format!("{}{}", indent, &current[split..]);
            current.truncate(split);
            out.push(current);
            out.push(String::new());
            current = rest;
        }
        out.push(current);
    }
    out.join("\n")
}

/// Offset just past the first `/>` directly followed by a component tag
/// outside inline code.
fn glued_tag_split(line: &str) -> Option<usize> {
    ADJACENT_TAGS
        .find_iter(line)
        .find(|m| line[..m.start()].matches('`').count() % 2 == 0)
        .map(|m| m.start() + 2)
}

pub fn is_esm_line(line: &str) -> bool {
    line.starts_with("import ") || line.starts_with("export ")
}

/// Kind of a `:::kind` opener, if `line` is one.
fn admonition_kind(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix(":::")?;
    let rest = rest.trim_start_matches(':');
    let kind_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_')
        .unwrap_or(rest.len());
    if kind_len == 0 || !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(&rest[..kind_len])
}

fn is_admonition_close(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.bytes().all(|b| b == b':')
}

struct FlowScanner<'a> {
    doc: &'a Document,
}

impl<'a> FlowScanner<'a> {
    /// Parse lines `start..end` as flow content at nesting `depth`.
    fn parse_flow(&self, start: usize, end: usize, depth: usize) -> Result<Vec<SyntaxNode>, ParseError> {
        let doc = self.doc;
        let mut nodes = Vec::new();
        let mut i = start;

        while i < end {
            if doc.is_blank(i) {
                i += 1;
                continue;
            }
            if depth == 0 && i == 0 {
                if let Some(close) = self.frontmatter_end() {
                    nodes.push(SyntaxNode::new(
                        NodeKind::Frontmatter,
                        doc.line_span(0, close),
                    ));
                    i = close + 1;
                    continue;
                }
            }
            if let Some(node) = self.flow_construct(i, end, depth)? {
                i = node.span.end_line() + 1;
                nodes.push(node);
                continue;
            }
            if depth == 0 && is_esm_line(doc.line(i)) {
                let mut j = i;
                while j + 1 < end && !doc.is_blank(j + 1) {
                    j += 1;
                }
                nodes.push(SyntaxNode::new(NodeKind::Esm, doc.line_span(i, j)));
                i = j + 1;
                continue;
            }

            let (run_end, next) = self.prose_run(i, end, depth)?;
            let mut last = run_end - 1;
            while last > i && doc.is_blank(last) {
                last -= 1;
            }
            nodes.extend(parse_run(doc, i, last));
            i = run_end;
            if let Some(node) = next {
                i = node.span.end_line() + 1;
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn frontmatter_end(&self) -> Option<usize> {
        let doc = self.doc;
        if doc.line(0).trim_end() != "---" {
            return None;
        }
        (1..doc.line_count()).find(|&j| doc.line(j).trim_end() == "---")
    }

    /// Admonition or flow element starting at line `i`.
    fn flow_construct(&self, i: usize, end: usize, depth: usize) -> Result<Option<SyntaxNode>, ParseError> {
        if let Some(node) = self.admonition(i, end, depth)? {
            return Ok(Some(node));
        }
        self.flow_element(i, end, depth)
    }

    /// Extent of the prose run starting at `i`, plus the flow construct
    /// that terminated it, if any.
    fn prose_run(
        &self,
        i: usize,
        end: usize,
        depth: usize,
    ) -> Result<(usize, Option<SyntaxNode>), ParseError> {
        let doc = self.doc;
        let mut fences = FenceTracker::default();
        let mut j = i;

        while j < end {
            let line = doc.line(j);
            if fences.step(line) {
                j += 1;
                continue;
            }
            if j > i {
                if let Some(node) = self.flow_construct(j, end, depth)? {
                    return Ok((j, Some(node)));
                }
                if depth == 0 && doc.is_blank(j - 1) && is_esm_line(line) {
                    return Ok((j, None));
                }
            }
            if line.trim() == "/>" {
                return Err(ParseError::StrayClosingSlash { line: j });
            }
            j += 1;
        }
        Ok((j, None))
    }

    fn admonition(&self, i: usize, end: usize, depth: usize) -> Result<Option<SyntaxNode>, ParseError> {
        let doc = self.doc;
        let Some(kind) = admonition_kind(doc.line(i)) else {
            return Ok(None);
        };

        let mut fences = FenceTracker::default();
        let mut open = 1usize;
        for j in i + 1..end {
            let line = doc.line(j);
            if fences.step(line) {
                continue;
            }
            if admonition_kind(line).is_some() {
                open += 1;
            } else if is_admonition_close(line) {
                open -= 1;
                if open == 0 {
                    let children = self.parse_flow(i + 1, j, depth + 1)?;
                    return Ok(Some(SyntaxNode::with_children(
                        NodeKind::Admonition {
                            kind: kind.to_string(),
                        },
                        doc.line_span(i, j),
                        children,
                    )));
                }
            }
        }
        Ok(None)
    }

    /// Component tag or HTML element that owns whole lines starting at `i`.
    ///
    /// Unparseable or unclosed capitalized tags are errors; lowercase tags
    /// that do not form a flow element are left to the prose parser.
    fn flow_element(&self, i: usize, end: usize, depth: usize) -> Result<Option<SyntaxNode>, ParseError> {
        let doc = self.doc;
        let text = doc.text();
        let line = doc.line(i);
        let rest = line.trim_start();
        if !rest.starts_with('<') {
            return Ok(None);
        }

        if let Some(closing) = rest.strip_prefix("</") {
            let name: String = closing
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '.')
                .collect();
            if is_capitalized(&name) {
                return Err(ParseError::UnexpectedClosingTag { name, line: i });
            }
            return Ok(None);
        }

        let offset = doc.line_start(i) + (line.len() - rest.len());
        let tag = match lex_open_tag(text, offset) {
            Ok(tag) => tag,
            Err(LexError::UnterminatedQuote { name }) if is_capitalized(&name) => {
                return Err(ParseError::UnterminatedQuote { name, line: i })
            }
            Err(LexError::Unterminated { name }) if is_capitalized(&name) => {
                return Err(ParseError::UnterminatedTag { name, line: i })
            }
            Err(_) => return Ok(None),
        };
        let strict = is_capitalized(&tag.name);
        let unclosed = || {
            if strict {
                Err(ParseError::UnclosedTag {
                    name: tag.name.clone(),
                    line: i,
                })
            } else {
                Ok(None)
            }
        };

        let open_end_line = doc.line_of(tag.end - 1);
        if open_end_line >= end {
            return if strict {
                Err(ParseError::UnterminatedTag {
                    name: tag.name.clone(),
                    line: i,
                })
            } else {
                Ok(None)
            };
        }
        let open = doc.span(tag.start, tag.end);

        if tag.is_leaf() {
            if !text[tag.end..doc.line_end(open_end_line)].trim().is_empty() {
                return Ok(None);
            }
            let element = Element {
                tag: tag.clone(),
                body: ElementBody::Empty,
                open,
                close: None,
            };
            return Ok(Some(SyntaxNode::new(element_kind(element), open)));
        }

        let Some((close_start, close_end)) = find_closing_tag(text, &tag.name, tag.end) else {
            return unclosed();
        };
        let close_line = doc.line_of(close_start);
        if close_line >= end {
            return unclosed();
        }
        if !text[close_end..doc.line_end(close_line)].trim().is_empty() {
            return Ok(None);
        }

        let after_open = &text[tag.end..doc.line_end(open_end_line)];
        let before_close = &text[doc.line_start(close_line)..close_start];
        let flow = close_line > open_end_line
            && after_open.trim().is_empty()
            && before_close.trim().is_empty();

        let (body, children) = if flow {
            let children = if tag.kind() == TagKind::ComponentTag {
                self.parse_flow(open_end_line + 1, close_line, depth + 1)?
            } else {
                Vec::new()
            };
            (ElementBody::Flow, children)
        } else {
            (
                ElementBody::Inline(text[tag.end..close_start].to_string()),
                Vec::new(),
            )
        };

        let span = doc.span(tag.start, close_end);
        let element = Element {
            tag,
            body,
            open,
            close: Some(doc.span(close_start, close_end)),
        };
        Ok(Some(SyntaxNode::with_children(
            element_kind(element),
            span,
            children,
        )))
    }
}

fn element_kind(element: Element) -> NodeKind {
    match element.tag.kind() {
        TagKind::HtmlElement => NodeKind::HtmlElement(element),
        TagKind::ComponentTag => NodeKind::ComponentTag(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_text(text: &str) -> SyntaxNode {
        parse_document(&Document::new(text)).unwrap()
    }

    fn top_kinds(tree: &SyntaxNode) -> Vec<String> {
        tree.children
            .iter()
            .map(|n| match &n.kind {
                NodeKind::ComponentTag(el) => format!("component:{}", el.name()),
                NodeKind::HtmlElement(el) => format!("html:{}", el.name()),
                other => format!("{:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_mixed_document() {
        let text = "---\ntitle: x\n---\n\nimport A from './a'\n\n# Title\n\n<InfoBox>\n\nBody\n\n</InfoBox>\n\n<dl>\n<dt>T</dt>\n</dl>\n\n:::note\nInside\n:::\n";
        let tree = parse_text(text);
        assert_eq!(
            top_kinds(&tree),
            vec![
                "Frontmatter",
                "Esm",
                "Heading { depth: 1 }",
                "component:InfoBox",
                "html:dl",
                "Admonition { kind: \"note\" }",
            ]
        );
        let infobox = &tree.children[3];
        assert_eq!(infobox.span.start_line(), 8);
        assert_eq!(infobox.span.end_line(), 12);
        assert_eq!(infobox.children.len(), 1);
        assert_eq!(infobox.children[0].kind, NodeKind::Paragraph);
        assert_eq!(infobox.children[0].span.start_line(), 10);
    }

    #[test]
    fn test_inline_body_and_leaf() {
        let tree = parse_text("<InfoBox>Note</InfoBox>\n<ExImg\n  src=\"a\"\n/>\n");
        let first = tree.children[0].element().unwrap();
        assert_eq!(first.body, ElementBody::Inline("Note".to_string()));
        let second = &tree.children[1];
        assert_eq!(second.element().unwrap().body, ElementBody::Empty);
        assert_eq!(second.span.start_line(), 1);
        assert_eq!(second.span.end_line(), 3);
    }

    #[test]
    fn test_inline_tag_stays_in_paragraph() {
        let tree = parse_text("<Badge>new</Badge> feature text\n");
        assert_eq!(tree.children[0].kind, NodeKind::Paragraph);
    }

    #[test]
    fn test_fenced_tags_are_not_elements() {
        let tree = parse_text("```jsx\n<Broken\n</Nope>\n```\n");
        assert_eq!(top_kinds(&tree).len(), 1);
        assert!(matches!(tree.children[0].kind, NodeKind::CodeFence { .. }));
    }

    #[test]
    fn test_unclosed_component_is_error() {
        let err = parse_document(&Document::new("<InfoBox>\ntext\n")).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnclosedTag {
                name: "InfoBox".to_string(),
                line: 0
            }
        );
    }

    #[test]
    fn test_unclosed_lowercase_is_prose() {
        let tree = parse_text("<div>\ntext\n");
        assert!(tree.children.iter().all(|n| n.element().is_none()));
    }

    #[test]
    fn test_fix_standalone_closing_tags() {
        assert_eq!(
            fix_standalone_closing_tags("<Img src=\"a\">\n/>\ntext"),
            "<Img src=\"a\" />\ntext"
        );
        assert_eq!(
            fix_standalone_closing_tags("<Img src=\"a\"\n\n/>"),
            "<Img src=\"a\" />\n"
        );
        assert_eq!(fix_standalone_closing_tags("```\n/>\n```"), "```\n/>\n```");
    }

    #[test]
    fn test_split_adjacent_tags() {
        assert_eq!(
            split_adjacent_tags("  <A /><B /><C />"),
            "  <A />\n\n  <B />\n\n  <C />"
        );
        let code = "Use `<A /><B />` here\n```\n<A /><B />\n```";
        assert_eq!(split_adjacent_tags(code), code);
    }

    #[test]
    fn test_recovery_retries() {
        let doc = Document::new("Text\n\n<Img src=\"a\" alt=\"b\">\n/>\n");
        let (fixed, tree) = parse_with_recovery(doc).unwrap();
        assert_eq!(fixed.text(), "Text\n\n<Img src=\"a\" alt=\"b\" />\n");
        assert!(tree.children[1].is_component());
    }

    #[test]
    fn test_stray_slash_without_fix_fails() {
        let err = parse_with_recovery(Document::new("/>\n")).unwrap_err();
        assert_eq!(err, ParseError::StrayClosingSlash { line: 0 });
    }
}
