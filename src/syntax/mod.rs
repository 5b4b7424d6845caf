//! Structural parser.
//!
//! Produces a read-only tree over the source with exact spans on every node.
//! The tree indexes the original text; rules slice the source through it and
//! never rebuild content from nodes.
//!
//! ## Layers
//!
//! - `scanner`: MDX flow constructs (frontmatter, admonitions, component and
//!   HTML flow elements, ESM lines) and the `/>` recovery retry
//! - `markdown`: prose runs between those constructs, parsed by pulldown-cmark
//!   and mapped back to absolute positions
//! - `tag`: opening-tag lexer and the `TagKind` classification

pub mod markdown;
pub mod scanner;
pub mod tag;

use crate::document::{Document, Span};
use crate::error::ParseError;
pub use scanner::{fix_standalone_closing_tags, parse_document, parse_with_recovery, split_adjacent_tags};
pub use tag::{Attribute, TagKind, TagSyntax};

/// Body layout of an element with a closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementBody {
    /// Written `/>` or a void HTML element.
    Empty,
    /// Opening and closing tags stand on their own lines; children are flow content.
    Flow,
    /// Content shares a line with the opening or closing tag.
    Inline(String),
}

/// A flow-level component tag or HTML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: TagSyntax,
    pub body: ElementBody,
    /// Span of the opening tag only.
    pub open: Span,
    /// Span of the closing tag, if one was written.
    pub close: Option<Span>,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.tag.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Frontmatter,
    Heading { depth: u8 },
    Paragraph,
    BlockQuote,
    Table,
    List { ordered: bool, start: Option<u64> },
    ListItem,
    CodeFence { info: Option<String>, fenced: bool },
    ComponentTag(Element),
    /// A component tag used inside prose, e.g. `text <Badge /> text`.
    InlineComponent { name: String },
    HtmlElement(Element),
    Admonition { kind: String },
    Esm,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: NodeKind, span: Span, children: Vec<SyntaxNode>) -> Self {
        Self {
            kind,
            span,
            children,
        }
    }

    /// Component tag or HTML element payload of a flow element.
    pub fn element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::ComponentTag(el) | NodeKind::HtmlElement(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self.kind, NodeKind::ComponentTag(_))
    }
}

/// Parse `doc` into a syntax tree rooted at `NodeKind::Root`.
pub fn parse(doc: &Document) -> Result<SyntaxNode, ParseError> {
    parse_document(doc)
}

/// Tracks fenced code blocks line by line.
#[derive(Debug, Default, Clone)]
pub struct FenceTracker {
    open: Option<(u8, usize)>,
}

impl FenceTracker {
    /// Advance over `line`. Returns true if the line is a fence marker or
    /// lies inside a fenced block.
    pub fn step(&mut self, line: &str) -> bool {
        let marker = fence_marker(line);
        match (self.open, marker) {
            (Some((ch, len)), Some((m_ch, m_len, rest))) => {
                if m_ch == ch && m_len >= len && rest.trim().is_empty() {
                    self.open = None;
                }
                true
            }
            (Some(_), None) => true,
            (None, Some((ch, len, _))) => {
                self.open = Some((ch, len));
                true
            }
            (None, None) => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

/// Fence character, run length and the text after the run, for lines that
/// open or close a fenced code block.
pub fn fence_marker(line: &str) -> Option<(u8, usize, &str)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let ch = *rest.as_bytes().first()?;
    if ch != b'`' && ch != b'~' {
        return None;
    }
    let len = rest.bytes().take_while(|&b| b == ch).count();
    if len < 3 {
        return None;
    }
    let after = &rest[len..];
    if ch == b'`' && after.contains('`') {
        return None;
    }
    Some((ch, len, after))
}

/// Per-line flag: true for fence markers, fenced code, and the leading
/// frontmatter block.
pub fn protected_lines(lines: &[&str]) -> Vec<bool> {
    let mut protected = vec![false; lines.len()];
    let mut start = 0;
    if lines.first().map(|l| l.trim_end()) == Some("---") {
        if let Some(close) = lines
            .iter()
            .skip(1)
            .position(|l| l.trim_end() == "---")
            .map(|p| p + 1)
        {
            protected[..=close].iter_mut().for_each(|p| *p = true);
            start = close + 1;
        }
    }
    let mut fences = FenceTracker::default();
    for (i, line) in lines.iter().enumerate().skip(start) {
        protected[i] = fences.step(line);
    }
    protected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_tracker() {
        let mut fences = FenceTracker::default();
        assert!(!fences.step("text"));
        assert!(fences.step("````md"));
        assert!(fences.step("```"));
        assert!(fences.is_open());
        assert!(fences.step("````"));
        assert!(!fences.is_open());
        assert!(!fences.step("after"));
    }

    #[test]
    fn test_fence_marker_rejects_inline_code() {
        assert!(fence_marker("```js").is_some());
        assert!(fence_marker("~~~").is_some());
        assert!(fence_marker("``` a ` b").is_none());
        assert!(fence_marker("    ```").is_none());
    }

    #[test]
    fn test_protected_lines() {
        let lines = vec!["---", "a: 1", "---", "text", "```", "code", "```", "end"];
        assert_eq!(
            protected_lines(&lines),
            vec![true, true, true, false, true, true, true, false]
        );
    }
}
