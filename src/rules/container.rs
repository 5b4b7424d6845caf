//! Blank-line padding inside block containers.
//!
//! Components listed in `blockComponents` hold Markdown, so their content
//! is separated from the tags by one blank line on each side. A body written
//! on the same line as the tags is moved onto its own lines first.

use super::{jsx, FormatRule, RuleContext};
use crate::edits::EditOperation;
use crate::syntax::{ElementBody, NodeKind};

pub struct ContainerRule;

impl FormatRule for ContainerRule {
    fn name(&self) -> &'static str {
        "block-containers"
    }

    fn is_enabled(&self, ctx: &RuleContext) -> bool {
        ctx.mdx && ctx.settings.add_empty_lines_in_block_jsx.enabled
    }

    fn collect(&self, ctx: &RuleContext) -> Vec<EditOperation> {
        let containers = &ctx.settings.add_empty_lines_in_block_jsx;
        let mut ops = Vec::new();

        ctx.visit(&mut |node| {
            let NodeKind::ComponentTag(el) = &node.kind else {
                return;
            };
            if !containers.is_block(el.name())
                || ctx.settings.format_multi_line_jsx.is_ignored(el.name())
            {
                return;
            }
            let Some(close) = el.close else {
                return;
            };

            match &el.body {
                ElementBody::Flow => {
                    let first = el.open.end_line() + 1;
                    let close_line = close.start_line();
                    if (first..close_line).all(|i| ctx.is_blank(i)) {
                        return;
                    }
                    if !ctx.is_blank(first) {
                        ops.push(EditOperation::insert_blank(first));
                    }
                    if !ctx.is_blank(close_line - 1) {
                        ops.push(EditOperation::insert_blank(close_line));
                    }
                }
                ElementBody::Inline(content) => {
                    let content = content.trim();
                    if content.is_empty() {
                        return;
                    }
                    let base = ctx.indent_of(el.open.start_line());
                    let mut lines = jsx::open_tag_lines(ctx, el);
                    lines.push(String::new());
                    for (i, line) in content.split('\n').enumerate() {
                        let line = line.trim_end();
                        lines.push(if i == 0 {
                            format!("{}{}", base, line)
                        } else {
                            line.to_string()
                        });
                    }
                    lines.push(String::new());
                    lines.push(format!("{}</{}>", base, el.name()));
                    ops.push(EditOperation::ReplaceLineRange {
                        start: node.span.start_line(),
                        end: node.span.end_line(),
                        lines,
                    });
                }
                ElementBody::Empty => {}
            }
        });
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::run_rule;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pads_flow_body() {
        assert_eq!(
            run_rule(&ContainerRule, "<InfoBox>\nText\n</InfoBox>"),
            "<InfoBox>\n\nText\n\n</InfoBox>"
        );
    }

    #[test]
    fn test_already_padded() {
        let input = "<InfoBox>\n\nText\n\n</InfoBox>";
        assert_eq!(run_rule(&ContainerRule, input), input);
    }

    #[test]
    fn test_empty_container_untouched() {
        let input = "<InfoBox>\n</InfoBox>";
        assert_eq!(run_rule(&ContainerRule, input), input);
    }

    #[test]
    fn test_inline_body_moved() {
        assert_eq!(
            run_rule(&ContainerRule, "<InfoBox>Note this</InfoBox>"),
            "<InfoBox>\n\nNote this\n\n</InfoBox>"
        );
    }

    #[test]
    fn test_inline_body_with_expanded_open_tag() {
        assert_eq!(
            run_rule(
                &ContainerRule,
                "<Column width=\"50%\" align=\"left\">Left side</Column>"
            ),
            "<Column\n  width=\"50%\"\n  align=\"left\"\n>\n\nLeft side\n\n</Column>"
        );
    }

    #[test]
    fn test_non_block_component_untouched() {
        let input = "<Card>\nText\n</Card>";
        assert_eq!(run_rule(&ContainerRule, input), input);
    }

    #[test]
    fn test_nested_items() {
        let input = "<LayoutDivide>\n<LayoutDivideItem>\nLeft\n</LayoutDivideItem>\n</LayoutDivide>";
        assert_eq!(
            run_rule(&ContainerRule, input),
            "<LayoutDivide>\n<LayoutDivideItem>\n\nLeft\n\n</LayoutDivideItem>\n</LayoutDivide>"
        );
    }
}
