//! Prose runs via pulldown-cmark.
//!
//! A run is a range of lines between MDX flow constructs. pulldown-cmark
//! reports byte ranges relative to the run; they are shifted back to
//! document offsets so every node slices the original text.

use super::{NodeKind, SyntaxNode};
use crate::document::Document;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use std::ops::Range;

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

fn block_kind(tag: &Tag) -> Option<NodeKind> {
    match tag {
        Tag::Heading { level, .. } => Some(NodeKind::Heading {
            depth: *level as u8,
        }),
        Tag::Paragraph => Some(NodeKind::Paragraph),
        Tag::BlockQuote(_) => Some(NodeKind::BlockQuote),
        Tag::Table(_) => Some(NodeKind::Table),
        Tag::List(start) => Some(NodeKind::List {
            ordered: start.is_some(),
            start: *start,
        }),
        Tag::Item => Some(NodeKind::ListItem),
        Tag::CodeBlock(kind) => Some(match kind {
            CodeBlockKind::Fenced(info) => NodeKind::CodeFence {
                info: Some(info.to_string()).filter(|s| !s.is_empty()),
                fenced: true,
            },
            CodeBlockKind::Indented => NodeKind::CodeFence {
                info: None,
                fenced: false,
            },
        }),
        _ => None,
    }
}

/// Name of a capitalized tag at the start of an inline HTML fragment.
fn inline_component_name(html: &str) -> Option<String> {
    let rest = html.strip_prefix('<')?;
    if !rest.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
        .collect();
    Some(name)
}

struct Frame {
    kind: Option<NodeKind>,
    range: Range<usize>,
    children: Vec<SyntaxNode>,
}

/// Parse lines `first..=last` of `doc` as CommonMark.
pub fn parse_run(doc: &Document, first: usize, last: usize) -> Vec<SyntaxNode> {
    let base = doc.line_start(first);
    let end = doc.line_end(last);
    let source = &doc.text()[base..end];
    let span = |range: &Range<usize>| doc.span(base + range.start, base + range.end);

    let mut stack = vec![Frame {
        kind: None,
        range: 0..source.len(),
        children: Vec::new(),
    }];

    for (event, range) in Parser::new_ext(source, parser_options()).into_offset_iter() {
        match event {
            Event::Start(tag) => stack.push(Frame {
                kind: block_kind(&tag),
                range,
                children: Vec::new(),
            }),
            Event::End(_) => {
                if stack.len() < 2 {
                    continue;
                }
                let Some(frame) = stack.pop() else { continue };
                let Some(parent) = stack.last_mut() else { continue };
                match frame.kind {
                    Some(kind) => parent.children.push(SyntaxNode::with_children(
                        kind,
                        span(&frame.range),
                        frame.children,
                    )),
                    // inline containers (emphasis, links) are flattened
                    None => parent.children.extend(frame.children),
                }
            }
            Event::Text(_) | Event::Code(_) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(SyntaxNode::new(NodeKind::Text, span(&range)));
                }
            }
            Event::InlineHtml(html) => {
                if let (Some(name), Some(parent)) = (inline_component_name(&html), stack.last_mut())
                {
                    parent.children.push(SyntaxNode::new(
                        NodeKind::InlineComponent { name },
                        span(&range),
                    ));
                }
            }
            _ => {}
        }
    }

    stack
        .into_iter()
        .next()
        .map(|root| root.children)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(nodes: &[SyntaxNode]) -> Vec<NodeKind> {
        nodes.iter().map(|n| n.kind.clone()).collect()
    }

    #[test]
    fn test_blocks_with_positions() {
        let doc = Document::new("intro\n\n# Title\ntext\n\n- a\n- b");
        let nodes = parse_run(&doc, 2, 6);
        assert_eq!(
            kinds(&nodes),
            vec![
                NodeKind::Heading { depth: 1 },
                NodeKind::Paragraph,
                NodeKind::List {
                    ordered: false,
                    start: None
                },
            ]
        );
        assert_eq!(nodes[0].span.start_line(), 2);
        assert_eq!(nodes[1].span.start_line(), 3);
        assert_eq!(nodes[2].span.start_line(), 5);
        assert_eq!(nodes[2].span.end_line(), 6);
        assert_eq!(nodes[2].children.len(), 2);
        assert_eq!(nodes[2].children[1].span.start.column, 0);
    }

    #[test]
    fn test_code_fence_info() {
        let doc = Document::new("```rust\nfn main() {}\n```");
        let nodes = parse_run(&doc, 0, 2);
        assert_eq!(
            nodes[0].kind,
            NodeKind::CodeFence {
                info: Some("rust".to_string()),
                fenced: true
            }
        );
        assert_eq!(nodes[0].span.end_line(), 2);
    }

    #[test]
    fn test_inline_component() {
        let doc = Document::new("Status: <Badge type=\"new\" /> today");
        let nodes = parse_run(&doc, 0, 0);
        let para = &nodes[0];
        assert!(para
            .children
            .iter()
            .any(|n| n.kind == NodeKind::InlineComponent { name: "Badge".to_string() }));
    }
}
