use super::{yaml, FormatRule, RuleContext};
use crate::edits::EditOperation;
use crate::syntax::NodeKind;

/// Rewrites the leading `---` block through the YAML emitter.
///
/// Frontmatter with comments is left alone since a load/emit cycle would
/// drop them. Invalid YAML is logged and skipped.
pub struct FrontmatterRule;

impl FormatRule for FrontmatterRule {
    fn name(&self) -> &'static str {
        "yaml-frontmatter"
    }

    fn is_enabled(&self, ctx: &RuleContext) -> bool {
        ctx.settings.format_yaml_frontmatter.enabled
    }

    fn collect(&self, ctx: &RuleContext) -> Vec<EditOperation> {
        let Some(node) = ctx
            .tree
            .children
            .first()
            .filter(|n| n.kind == NodeKind::Frontmatter)
        else {
            return Vec::new();
        };
        let close = node.span.end_line();
        if close < 2 {
            return Vec::new();
        }

        let original: Vec<&str> = (1..close).map(|i| ctx.line(i)).collect();
        if original.iter().any(|l| l.trim_start().starts_with('#')) {
            log::debug!("Frontmatter has comments, leaving it as written");
            return Vec::new();
        }
        let content = original.join("\n");
        if content.trim().is_empty() {
            return Vec::new();
        }

        match yaml::reformat(&content, &ctx.settings.format_yaml_frontmatter) {
            Ok(Some(lines)) if lines != original => vec![EditOperation::ReplaceLineRange {
                start: 1,
                end: close - 1,
                lines,
            }],
            Ok(_) => Vec::new(),
            Err(e) => {
                log::warn!("Skipping frontmatter: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::run_rule;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reformats_frontmatter() {
        let input = "---\ntitle: \"Test Article\"\n\ndescription:   A long description\ntags: [tag1, tag2]\n---\n\n# Body";
        assert_eq!(
            run_rule(&FrontmatterRule, input),
            "---\ntitle: Test Article\ndescription: A long description\ntags:\n  - tag1\n  - tag2\n---\n\n# Body"
        );
    }

    #[test]
    fn test_comments_preserved() {
        let input = "---\n# draft\ntitle:   \"A\"\n---";
        assert_eq!(run_rule(&FrontmatterRule, input), input);
    }

    #[test]
    fn test_invalid_yaml_untouched() {
        let input = "---\ntitle: [oops\n---\ntext";
        assert_eq!(run_rule(&FrontmatterRule, input), input);
    }

    #[test]
    fn test_empty_frontmatter() {
        let input = "---\n---\ntext";
        assert_eq!(run_rule(&FrontmatterRule, input), input);
    }

    #[test]
    fn test_formatted_frontmatter_is_noop() {
        let input = "---\ntitle: A\ntags:\n  - x\n---";
        assert_eq!(run_rule(&FrontmatterRule, input), input);
    }
}
