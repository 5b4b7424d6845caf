//! Blank lines between flow elements.

use super::{FormatRule, RuleContext};
use crate::edits::EditOperation;
use crate::syntax::{fence_marker, NodeKind, SyntaxNode};
use once_cell::sync::Lazy;
use regex::Regex;

static ORDERED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)]").unwrap());

pub struct SpacingRule;

impl FormatRule for SpacingRule {
    fn name(&self) -> &'static str {
        "element-spacing"
    }

    fn is_enabled(&self, ctx: &RuleContext) -> bool {
        ctx.settings.add_empty_line_between_elements.enabled
    }

    fn collect(&self, ctx: &RuleContext) -> Vec<EditOperation> {
        let mut ops = Vec::new();
        ctx.visit_flow_siblings(&mut |siblings| {
            for (idx, node) in siblings.iter().enumerate() {
                let previous = idx.checked_sub(1).map(|p| &siblings[p]);
                if let Some(line) = blank_line_needed(ctx, node, previous, siblings.get(idx + 1)) {
                    ops.push(EditOperation::insert_blank(line));
                }
            }
        });
        ops
    }
}

/// Line before which a blank line belongs, if `node` is missing one.
fn blank_line_needed(
    ctx: &RuleContext,
    node: &SyntaxNode,
    previous: Option<&SyntaxNode>,
    next: Option<&SyntaxNode>,
) -> Option<usize> {
    match &node.kind {
        NodeKind::Heading { .. } => {
            let line = node.span.end_line() + 1;
            let follows = line < ctx.line_count()
                && !ctx.is_blank(line)
                && !ctx.line(line).trim_start().starts_with('#');
            follows.then_some(line)
        }
        NodeKind::List { .. } => {
            let start = node.span.start_line();
            let glued = previous.is_some_and(|p| {
                p.kind == NodeKind::Paragraph && p.span.end_line() + 1 == start
            });
            glued.then_some(start)
        }
        NodeKind::ComponentTag(el) | NodeKind::HtmlElement(el) => {
            let line = node.span.end_line() + 1;
            if line >= ctx.line_count() || ctx.is_blank(line) {
                return None;
            }
            let repeated_sibling = ctx.settings.add_empty_lines_in_block_jsx.is_sibling(el.name())
                && next.is_some_and(|n| {
                    n.span.start_line() == line
                        && n.element().is_some_and(|other| other.name() == el.name())
                });
            (repeated_sibling || is_plain_text(ctx.line(line))).then_some(line)
        }
        _ => None,
    }
}

/// Whether `line` starts ordinary prose rather than markup that may follow
/// an element directly (headings, list items, tags, admonitions, fences).
fn is_plain_text(line: &str) -> bool {
    let trimmed = line.trim_start();
    !(trimmed.starts_with(['#', '-', '*', '+', '<'])
        || trimmed.starts_with(":::")
        || fence_marker(line).is_some()
        || ORDERED_MARKER.is_match(trimmed))
}
