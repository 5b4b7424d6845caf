//! List marker normalization.
//!
//! Unordered markers become the configured bullet and `1)` becomes `1.`.
//! With `fixIndentation`, nested items are moved to the content column of
//! their parent item and their continuation lines follow.

use super::{FormatRule, RuleContext};
use crate::edits::EditOperation;
use crate::syntax::{NodeKind, SyntaxNode};

pub struct ListRule;

impl FormatRule for ListRule {
    fn name(&self) -> &'static str {
        "lists"
    }

    fn is_enabled(&self, ctx: &RuleContext) -> bool {
        ctx.settings.normalize_lists.enabled
    }

    fn collect(&self, ctx: &RuleContext) -> Vec<EditOperation> {
        let settings = &ctx.settings.normalize_lists;
        let mut ops = Vec::new();
        let mut top_level = Vec::new();

        ctx.visit(&mut |node| {
            if let NodeKind::List { ordered, .. } = node.kind {
                for item in &node.children {
                    if let Some(op) = normalize_marker(ctx, item, ordered, settings.bullet) {
                        ops.push(op);
                    }
                }
            }
            for child in &node.children {
                if matches!(child.kind, NodeKind::List { .. })
                    && !matches!(node.kind, NodeKind::ListItem)
                {
                    top_level.push(child);
                }
            }
        });

        if settings.fix_indentation {
            for list in top_level {
                reindent_list(ctx, list, None, &mut ops);
            }
        }
        ops
    }
}

/// Byte range of the list marker on `line`, looking from `column`.
fn marker_at(line: &str, column: usize) -> Option<(usize, usize)> {
    let rest = line.get(column..)?;
    let start = column + (rest.len() - rest.trim_start_matches(' ').len());
    let bytes = line.as_bytes();
    let end = match *bytes.get(start)? {
        b'-' | b'*' | b'+' => start + 1,
        b'0'..=b'9' => {
            let digits = bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count();
            match bytes.get(start + digits) {
                Some(b'.') | Some(b')') => start + digits + 1,
                _ => return None,
            }
        }
        _ => return None,
    };
    match bytes.get(end) {
        None | Some(b' ') | Some(b'\t') => Some((start, end)),
        _ => None,
    }
}

fn normalize_marker(
    ctx: &RuleContext,
    item: &SyntaxNode,
    ordered: bool,
    bullet: char,
) -> Option<EditOperation> {
    let index = item.span.start_line();
    let line = ctx.line(index);
    let (start, end) = marker_at(line, item.span.start.column)?;
    if line[end..].trim().is_empty() {
        return None;
    }

    let marker = &line[start..end];
    let replacement = if ordered {
        let digits = marker.strip_suffix(')')?;
        format!("{}.", digits)
    } else {
        if marker.starts_with(bullet) {
            return None;
        }
        bullet.to_string()
    };

    Some(EditOperation::ReplaceLineRange {
        start: index,
        end: index,
        lines: vec![format!("{}{}{}", &line[..start], replacement, &line[end..])],
    })
}

fn leading_spaces(line: &str) -> Option<usize> {
    let width = line.len() - line.trim_start_matches(|c: char| c == ' ' || c == '\t').len();
    line[..width].bytes().all(|b| b == b' ').then_some(width)
}

/// Move each item of `list` so its marker sits at the content column of
/// the parent item. `parent_column` is the parent's content column after
/// reindentation, `None` for top-level lists.
fn reindent_list(
    ctx: &RuleContext,
    list: &SyntaxNode,
    parent_column: Option<usize>,
    ops: &mut Vec<EditOperation>,
) {
    for item in &list.children {
        let first = item.span.start_line();
        let line = ctx.line(first);
        let (Some(indent), Some((_, marker_end))) =
            (leading_spaces(line), marker_at(line, item.span.start.column))
        else {
            continue;
        };
        // an item sharing its line with the parent marker stays put
        let shares_line = item.span.start.column > indent;
        let delta = match parent_column {
            Some(column) if !shares_line => column as isize - indent as isize,
            _ => 0,
        };

        let gap = line[marker_end..]
            .bytes()
            .take_while(|&b| b == b' ')
            .count();
        let gap = if (1..=4).contains(&gap) && marker_end + gap < line.len() {
            gap
        } else {
            1
        };
        let content_column = ((marker_end + gap) as isize + delta).max(0) as usize;

        let nested: Vec<&SyntaxNode> = item
            .children
            .iter()
            .filter(|c| matches!(c.kind, NodeKind::List { .. }))
            .collect();

        if delta != 0 {
            for index in first..=item.span.end_line() {
                let in_nested = nested
                    .iter()
                    .any(|n| (n.span.start_line()..=n.span.end_line()).contains(&index));
                if in_nested || ctx.is_blank(index) {
                    continue;
                }
                let Some(width) = leading_spaces(ctx.line(index)) else {
                    continue;
                };
                let target = (width as isize + delta).max(0) as usize;
                ops.push(EditOperation::IndentLine {
                    line: index,
                    indent: " ".repeat(target),
                });
            }
        }

        for child in nested {
            reindent_list(ctx, child, Some(content_column), ops);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{run_rule, run_rule_with};
    use crate::settings::RuleSettings;
    use pretty_assertions::assert_eq;

    fn fixing() -> RuleSettings {
        let mut settings = RuleSettings::default();
        settings.normalize_lists.fix_indentation = true;
        settings
    }

    #[test]
    fn test_bullets_unified() {
        assert_eq!(
            run_rule(&ListRule, "* Item 1\n+ Item 2\n- Item 3"),
            "- Item 1\n- Item 2\n- Item 3"
        );
    }

    #[test]
    fn test_ordered_delimiter() {
        assert_eq!(run_rule(&ListRule, "1) one\n2) two"), "1. one\n2. two");
    }

    #[test]
    fn test_nested_bullets() {
        assert_eq!(
            run_rule(&ListRule, "* a\n  * b\n* c"),
            "- a\n  - b\n- c"
        );
    }

    #[test]
    fn test_emphasis_not_a_marker() {
        let input = "*emphasis* text\n\n**bold** text";
        assert_eq!(run_rule(&ListRule, input), input);
    }

    #[test]
    fn test_thematic_break_untouched() {
        let input = "text\n\n* * *\n\nmore";
        assert_eq!(run_rule(&ListRule, input), input);
    }

    #[test]
    fn test_indentation_left_alone_by_default() {
        let input = "- a\n    - b";
        assert_eq!(run_rule(&ListRule, input), input);
    }

    #[test]
    fn test_fix_indentation_to_parent_content() {
        assert_eq!(
            run_rule_with(&ListRule, "- a\n    - b\n      more\n- c", &fixing()),
            "- a\n  - b\n    more\n- c"
        );
    }

    #[test]
    fn test_fix_indentation_under_ordered_parent() {
        assert_eq!(
            run_rule_with(&ListRule, "1. a\n     - b", &fixing()),
            "1. a\n   - b"
        );
    }

    #[test]
    fn test_marker_at() {
        assert_eq!(marker_at("  - x", 0), Some((2, 3)));
        assert_eq!(marker_at("10. x", 0), Some((0, 3)));
        assert_eq!(marker_at("-x", 0), None);
        assert_eq!(marker_at("> * x", 2), Some((2, 3)));
    }
}
