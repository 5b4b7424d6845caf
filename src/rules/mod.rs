//! Formatting rules.
//!
//! Every rule reads the same parse tree, the original lines and the
//! session's settings, and proposes `EditOperation`s. Rules never see each
//! other's output; the applier resolves overlaps.

pub mod container;
pub mod frontmatter;
pub mod html_blocks;
pub mod jsx;
pub mod lists;
pub mod spacing;
pub mod yaml;

use crate::document::Document;
use crate::edits::EditOperation;
use crate::settings::RuleSettings;
use crate::syntax::{NodeKind, SyntaxNode};

/// Read-only inputs shared by every rule in one formatting session.
pub struct RuleContext<'a> {
    pub doc: &'a Document,
    pub tree: &'a SyntaxNode,
    pub settings: &'a RuleSettings,
    /// MDX-only rules (component tags, containers) run only when set.
    pub mdx: bool,
}

impl<'a> RuleContext<'a> {
    pub fn line(&self, index: usize) -> &'a str {
        self.doc.line(index)
    }

    pub fn is_blank(&self, index: usize) -> bool {
        self.doc.is_blank(index)
    }

    pub fn line_count(&self) -> usize {
        self.doc.line_count()
    }

    /// Leading whitespace of line `index`.
    pub fn indent_of(&self, index: usize) -> &'a str {
        let line = self.doc.line(index);
        &line[..line.len() - line.trim_start().len()]
    }

    /// Whether the walker descends into `node`'s children.
    fn descends(&self, node: &SyntaxNode) -> bool {
        match &node.kind {
            NodeKind::Admonition { .. } => !self.settings.preserve_admonitions.enabled,
            NodeKind::ComponentTag(el) => !self.settings.format_multi_line_jsx.is_ignored(el.name()),
            _ => true,
        }
    }

    /// Visit every node reachable under the preservation settings.
    pub fn visit(&self, f: &mut impl FnMut(&'a SyntaxNode)) {
        fn go<'a>(
            ctx: &RuleContext<'a>,
            node: &'a SyntaxNode,
            f: &mut impl FnMut(&'a SyntaxNode),
        ) {
            f(node);
            if ctx.descends(node) {
                for child in &node.children {
                    go(ctx, child, f);
                }
            }
        }
        go(self, self.tree, f);
    }

    /// Visit every sequence of flow-level siblings: the document root,
    /// component bodies and (unless preserved) admonition bodies.
    pub fn visit_flow_siblings(&self, f: &mut impl FnMut(&'a [SyntaxNode])) {
        self.visit(&mut |node| {
            let flow_parent = matches!(
                node.kind,
                NodeKind::Root | NodeKind::ComponentTag(_) | NodeKind::Admonition { .. }
            );
            if flow_parent && self.descends(node) && !node.children.is_empty() {
                f(&node.children);
            }
        });
    }
}

/// One formatting pass.
pub trait FormatRule {
    fn name(&self) -> &'static str;

    fn is_enabled(&self, ctx: &RuleContext) -> bool;

    fn collect(&self, ctx: &RuleContext) -> Vec<EditOperation>;
}

/// All rules in proposal order. Earlier rules win duplicate edits.
pub fn all_rules() -> Vec<Box<dyn FormatRule>> {
    vec![
        Box::new(jsx::JsxTagRule),
        Box::new(container::ContainerRule),
        Box::new(spacing::SpacingRule),
        Box::new(frontmatter::FrontmatterRule),
        Box::new(html_blocks::HtmlBlockRule),
        Box::new(lists::ListRule),
    ]
}

/// Run every enabled rule and gather their proposals.
pub fn collect_operations(ctx: &RuleContext) -> Vec<EditOperation> {
    let mut operations = Vec::new();
    for rule in all_rules() {
        if !rule.is_enabled(ctx) {
            continue;
        }
        let ops = rule.collect(ctx);
        log::debug!("{} proposed {} edit(s)", rule.name(), ops.len());
        operations.extend(ops);
    }
    operations
}
