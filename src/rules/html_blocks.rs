use super::{FormatRule, RuleContext};
use crate::edits::EditOperation;
use crate::html::format_html_block;
use crate::syntax::NodeKind;

/// Re-lays out flow-level HTML elements in MDX documents.
pub struct HtmlBlockRule;

impl FormatRule for HtmlBlockRule {
    fn name(&self) -> &'static str {
        "html-blocks"
    }

    fn is_enabled(&self, ctx: &RuleContext) -> bool {
        ctx.mdx && ctx.settings.format_html_blocks_in_mdx.enabled
    }

    fn collect(&self, ctx: &RuleContext) -> Vec<EditOperation> {
        let settings = &ctx.settings.format_html_blocks_in_mdx;
        let mut ops = Vec::new();

        ctx.visit(&mut |node| {
            let NodeKind::HtmlElement(el) = &node.kind else {
                return;
            };
            if settings
                .preserve_tags
                .iter()
                .any(|t| t.eq_ignore_ascii_case(el.name()))
            {
                return;
            }

            let start = node.span.start_line();
            let end = node.span.end_line();
            let base = ctx.indent_of(start);
            let formatted = format_html_block(ctx.doc.slice(&node.span), base, settings);
            let lines: Vec<String> = formatted.split('\n').map(str::to_string).collect();
            let original: Vec<&str> = (start..=end).map(|i| ctx.line(i)).collect();
            if lines != original {
                ops.push(EditOperation::ReplaceRawSpan { start, end, lines });
            }
        });
        ops
    }
}
