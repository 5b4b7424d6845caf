//! Component tag layout.
//!
//! Opening tags that span several lines, or that carry at least the
//! configured number of attributes, are laid out one attribute per line:
//!
//! ```text
//! <ExImg
//!   src="/img/board.png"
//!   alt="Board"
//! />
//! ```

use super::{FormatRule, RuleContext};
use crate::edits::EditOperation;
use crate::syntax::{Attribute, Element, ElementBody, NodeKind, TagSyntax};

pub struct JsxTagRule;

impl FormatRule for JsxTagRule {
    fn name(&self) -> &'static str {
        "jsx-tags"
    }

    fn is_enabled(&self, ctx: &RuleContext) -> bool {
        ctx.mdx
            && (ctx.settings.format_multi_line_jsx.enabled
                || ctx.settings.expand_single_line_jsx.enabled)
    }

    fn collect(&self, ctx: &RuleContext) -> Vec<EditOperation> {
        let mut ops = Vec::new();
        ctx.visit(&mut |node| {
            let NodeKind::ComponentTag(el) = &node.kind else {
                return;
            };
            // inline bodies are laid out by the container rule or left alone
            if matches!(el.body, ElementBody::Inline(_)) {
                return;
            }
            let start = el.open.start_line();
            let end = el.open.end_line();
            let Some(target) = reformatted_open_tag(ctx, el) else {
                return;
            };
            let original: Vec<&str> = (start..=end).map(|i| ctx.line(i)).collect();
            if target != original {
                ops.push(EditOperation::ReplaceLineRange {
                    start,
                    end,
                    lines: target,
                });
            }
        });
        ops
    }
}

/// Canonical one-attribute-per-line layout of `tag` at indentation `base`.
pub fn canonical_open_tag(tag: &TagSyntax, base: &str, unit: &str) -> Vec<String> {
    if tag.attributes.is_empty() {
        let close = if tag.self_closing { " />" } else { ">" };
        return vec![format!("{}<{}{}", base, tag.name, close)];
    }

    let attr_indent = format!("{}{}", base, unit);
    let mut lines = vec![format!("{}<{}", base, tag.name)];
    for attr in &tag.attributes {
        lines.extend(attribute_lines(attr, &attr_indent, unit));
    }
    lines.push(format!(
        "{}{}",
        base,
        if tag.self_closing { "/>" } else { ">" }
    ));
    lines
}

/// Lines for one attribute. Multi-line expression values keep their
/// relative nesting: interior lines sit one unit deeper than the attribute,
/// a final closing-bracket line sits at the attribute's level.
pub fn attribute_lines(attr: &Attribute, indent: &str, unit: &str) -> Vec<String> {
    let rendered = attr.render();
    let mut parts = rendered.split('\n');
    let first = parts.next().unwrap_or_default().trim_end();
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        return vec![format!("{}{}", indent, first)];
    }

    let is_expression = attr.value.as_deref().is_some_and(|v| v.starts_with('{'));
    if !is_expression || rendered.contains('`') {
        // string contents are significant, keep them as written
        let mut lines = vec![format!("{}{}", indent, first)];
        lines.extend(rest.iter().map(|l| l.to_string()));
        return lines;
    }

    let width = |l: &str| l.len() - l.trim_start().len();
    let Some((&last, interior)) = rest.split_last() else {
        return vec![format!("{}{}", indent, first)];
    };
    let base_width = interior
        .iter()
        .chain(std::iter::once(&last))
        .copied()
        .filter(|l| !l.trim().is_empty() && !starts_with_closer(l))
        .map(width)
        .min()
        .unwrap_or(0);

    let nested = |l: &str| {
        let extra = width(l).saturating_sub(base_width);
        format!("{}{}{}{}", indent, unit, " ".repeat(extra), l.trim())
    };

    let mut lines = vec![format!("{}{}", indent, first)];
    for line in interior {
        if line.trim().is_empty() {
            lines.push(String::new());
        } else {
            lines.push(nested(line));
        }
    }
    if starts_with_closer(last) {
        lines.push(format!("{}{}", indent, last.trim()));
    } else {
        lines.push(nested(last));
    }
    lines
}

fn starts_with_closer(line: &str) -> bool {
    line.trim_start().starts_with([']', '}', ')'])
}

/// Replacement lines for the opening tag of `el`, or `None` when the tag
/// is exempt or below the expansion threshold.
pub fn reformatted_open_tag(ctx: &RuleContext, el: &Element) -> Option<Vec<String>> {
    let jsx = &ctx.settings.format_multi_line_jsx;
    let expand = &ctx.settings.expand_single_line_jsx;
    if jsx.is_ignored(el.name()) {
        return None;
    }
    let applies = if el.open.is_single_line() {
        expand.enabled && el.tag.attributes.len() >= expand.props_threshold
    } else {
        jsx.enabled
    };
    if !applies {
        return None;
    }
    let base = ctx.indent_of(el.open.start_line());
    Some(canonical_open_tag(&el.tag, base, &jsx.indent_unit()))
}

/// Opening tag lines of `el` as they will appear after formatting.
pub fn open_tag_lines(ctx: &RuleContext, el: &Element) -> Vec<String> {
    if let Some(lines) = reformatted_open_tag(ctx, el) {
        return lines;
    }
    let base = ctx.indent_of(el.open.start_line());
    let source = ctx.doc.slice(&el.open);
    source
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{}{}", base, line)
            } else {
                line.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{run_rule, run_rule_with};
    use crate::settings::RuleSettings;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_attribute_unchanged() {
        let input = "<Component prop1=\"value1\" />";
        assert_eq!(run_rule(&JsxTagRule, input), input);
    }

    #[test]
    fn test_expand_at_threshold() {
        let input = "<Component prop1=\"v1\" prop2=\"v2\" />";
        assert_eq!(
            run_rule(&JsxTagRule, input),
            "<Component\n  prop1=\"v1\"\n  prop2=\"v2\"\n/>"
        );
    }

    #[test]
    fn test_expansion_disabled() {
        let mut settings = RuleSettings::default();
        settings.expand_single_line_jsx.enabled = false;
        let input = "<Component prop1=\"v1\" prop2=\"v2\" />";
        assert_eq!(run_rule_with(&JsxTagRule, input, &settings), input);
    }

    #[test]
    fn test_multiline_normalized() {
        let input = "<ExImg    src=\"/a.png\"\n      alt=\"A\"   />";
        assert_eq!(
            run_rule(&JsxTagRule, input),
            "<ExImg\n  src=\"/a.png\"\n  alt=\"A\"\n/>"
        );
    }

    #[test]
    fn test_already_formatted_is_noop() {
        let input = "<ExImg\n  src=\"/a.png\"\n  alt=\"A\"\n/>";
        assert_eq!(run_rule(&JsxTagRule, input), input);
    }

    #[test]
    fn test_zero_attributes_collapsed() {
        assert_eq!(run_rule(&JsxTagRule, "<Divider\n/>"), "<Divider />");
    }

    #[test]
    fn test_container_open_tag_only() {
        let input = "<Card title=\"A\" href=\"/a\">\n\nBody\n\n</Card>";
        assert_eq!(
            run_rule(&JsxTagRule, input),
            "<Card\n  title=\"A\"\n  href=\"/a\"\n>\n\nBody\n\n</Card>"
        );
    }

    #[test]
    fn test_nested_tag_keeps_base_indent() {
        let input = "<Tabs>\n  <Tab label=\"a\" value=\"b\">\n\n  x\n\n  </Tab>\n</Tabs>";
        assert_eq!(
            run_rule(&JsxTagRule, input),
            "<Tabs>\n  <Tab\n    label=\"a\"\n    value=\"b\"\n  >\n\n  x\n\n  </Tab>\n</Tabs>"
        );
    }

    #[test]
    fn test_multiline_array_reindented() {
        let input = "<Gallery\nsrcs={[\n\"a\",\n\"b\"\n]}\n/>";
        assert_eq!(
            run_rule(&JsxTagRule, input),
            "<Gallery\n  srcs={[\n    \"a\",\n    \"b\"\n  ]}\n/>"
        );
    }

    #[test]
    fn test_ignored_component() {
        let input = "<CodeBlock lang=\"js\" title=\"x\" />";
        assert_eq!(run_rule(&JsxTagRule, input), input);
    }

    #[test]
    fn test_attribute_lines_keep_relative_nesting() {
        let attr = Attribute {
            name: "items".to_string(),
            value: Some("{[\n      { a: 1,\n        b: 2 },\n    ]}".to_string()),
        };
        assert_eq!(
            attribute_lines(&attr, "  ", "  "),
            vec!["  items={[", "    { a: 1,", "      b: 2 },", "  ]}"]
        );
    }
}
