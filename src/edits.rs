//! Edit operations and the single-pass applier.
//!
//! Rules propose edits against the original line array. The applier sorts
//! them bottom-up so that applying one never shifts the lines another one
//! refers to, drops duplicates, and rewrites a copy of the lines once.

use crate::syntax::protected_lines;
use std::cmp::Reverse;
use std::collections::HashSet;

/// A queued text mutation. Line indices refer to the original document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    /// Insert `content` before line `line`.
    InsertLine { line: usize, content: String },
    /// Replace lines `start..=end` with `lines`.
    ReplaceLineRange {
        start: usize,
        end: usize,
        lines: Vec<String>,
    },
    /// Replace the leading whitespace of `line` with `indent`.
    IndentLine { line: usize, indent: String },
    /// Replace lines `start..=end` holding one raw HTML block.
    ReplaceRawSpan {
        start: usize,
        end: usize,
        lines: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum OperationKind {
    Replace = 1,
    Insert = 2,
    Indent = 3,
    RawSpan = 4,
}

impl EditOperation {
    pub fn insert_blank(line: usize) -> Self {
        EditOperation::InsertLine {
            line,
            content: String::new(),
        }
    }

    pub fn start_line(&self) -> usize {
        match self {
            EditOperation::InsertLine { line, .. } | EditOperation::IndentLine { line, .. } => *line,
            EditOperation::ReplaceLineRange { start, .. }
            | EditOperation::ReplaceRawSpan { start, .. } => *start,
        }
    }

    pub fn end_line(&self) -> usize {
        match self {
            EditOperation::InsertLine { line, .. } | EditOperation::IndentLine { line, .. } => *line,
            EditOperation::ReplaceLineRange { end, .. } | EditOperation::ReplaceRawSpan { end, .. } => {
                *end
            }
        }
    }

    fn kind(&self) -> OperationKind {
        match self {
            EditOperation::ReplaceLineRange { .. } => OperationKind::Replace,
            EditOperation::InsertLine { .. } => OperationKind::Insert,
            EditOperation::IndentLine { .. } => OperationKind::Indent,
            EditOperation::ReplaceRawSpan { .. } => OperationKind::RawSpan,
        }
    }

    fn key(&self) -> (OperationKind, usize, usize) {
        (self.kind(), self.start_line(), self.end_line())
    }
}

/// Order operations for application: descending start line, then
/// replace < insert < indent < raw span. The sort is stable so ties keep
/// the order in which rules proposed them.
pub fn sort_operations(ops: &mut [EditOperation]) {
    ops.sort_by_key(|op| (Reverse(op.start_line()), op.kind()));
}

/// Keep the first operation for every (kind, start, end) key.
pub fn dedupe_operations(ops: Vec<EditOperation>) -> Vec<EditOperation> {
    let mut seen = HashSet::new();
    ops.into_iter().filter(|op| seen.insert(op.key())).collect()
}

/// Apply `ops` to `lines` and collapse runs of blank lines outside code.
pub fn apply_edits(lines: &[&str], mut ops: Vec<EditOperation>) -> Vec<String> {
    sort_operations(&mut ops);
    let ops = dedupe_operations(ops);
    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();

    for op in ops {
        match op {
            EditOperation::InsertLine { line, content } => {
                let at = line.min(out.len());
                out.insert(at, content);
            }
            EditOperation::ReplaceLineRange { start, end, lines }
            | EditOperation::ReplaceRawSpan { start, end, lines } => {
                if start >= out.len() {
                    log::debug!("Dropping replacement past end of document at line {}", start);
                    continue;
                }
                let end = end.min(out.len() - 1).max(start);
                out.splice(start..=end, lines);
            }
            EditOperation::IndentLine { line, indent } => {
                if let Some(target) = out.get_mut(line) {
                    let content = target.trim_start_matches(|c: char| c == ' ' || c == '\t').to_string();
                    *target = format!("{}{}", indent, content);
                }
            }
        }
    }

    collapse_blank_lines(out)
}

/// Reduce every run of two or more blank lines to a single blank line,
/// leaving fenced code and frontmatter untouched.
pub fn collapse_blank_lines(lines: Vec<String>) -> Vec<String> {
    let protected = {
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        protected_lines(&refs)
    };
    let mut out = Vec::with_capacity(lines.len());
    let mut previous_blank = false;

    for (line, protected) in lines.into_iter().zip(protected) {
        let blank = line.trim().is_empty();
        if blank && previous_blank && !protected {
            continue;
        }
        previous_blank = blank && !protected;
        out.push(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(text: &str) -> Vec<&str> {
        text.split('\n').collect()
    }

    #[test]
    fn test_sort_order() {
        let mut ops = vec![
            EditOperation::insert_blank(1),
            EditOperation::ReplaceRawSpan {
                start: 3,
                end: 4,
                lines: vec![],
            },
            EditOperation::IndentLine {
                line: 3,
                indent: String::new(),
            },
            EditOperation::insert_blank(3),
            EditOperation::ReplaceLineRange {
                start: 3,
                end: 3,
                lines: vec![],
            },
        ];
        sort_operations(&mut ops);
        let kinds: Vec<(usize, OperationKind)> =
            ops.iter().map(|op| (op.start_line(), op.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                (3, OperationKind::Replace),
                (3, OperationKind::Insert),
                (3, OperationKind::Indent),
                (3, OperationKind::RawSpan),
                (1, OperationKind::Insert),
            ]
        );
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let ops = vec![
            EditOperation::InsertLine {
                line: 2,
                content: "first".to_string(),
            },
            EditOperation::InsertLine {
                line: 2,
                content: "second".to_string(),
            },
        ];
        let kept = dedupe_operations(ops);
        assert_eq!(kept.len(), 1);
        assert_eq!(
            kept[0],
            EditOperation::InsertLine {
                line: 2,
                content: "first".to_string()
            }
        );
    }

    #[test]
    fn test_positions_refer_to_original_lines() {
        let source = lines("a\nb\nc\nd");
        let ops = vec![
            EditOperation::insert_blank(1),
            EditOperation::ReplaceLineRange {
                start: 2,
                end: 2,
                lines: vec!["c1".to_string(), "c2".to_string()],
            },
            EditOperation::insert_blank(3),
        ];
        assert_eq!(
            apply_edits(&source, ops),
            vec!["a", "", "b", "c1", "c2", "", "d"]
        );
    }

    #[test]
    fn test_replace_then_insert_on_same_line() {
        let source = lines("# T\n<A b=\"1\" c=\"2\" />");
        let ops = vec![
            EditOperation::insert_blank(1),
            EditOperation::ReplaceLineRange {
                start: 1,
                end: 1,
                lines: vec!["<A".to_string(), "/>".to_string()],
            },
        ];
        assert_eq!(apply_edits(&source, ops), vec!["# T", "", "<A", "/>"]);
    }

    #[test]
    fn test_indent_line() {
        let source = lines("- a\n   - b");
        let ops = vec![EditOperation::IndentLine {
            line: 1,
            indent: "  ".to_string(),
        }];
        assert_eq!(apply_edits(&source, ops), vec!["- a", "  - b"]);
    }

    #[test]
    fn test_collapse_skips_code() {
        let source = lines("a\n\n\n\nb\n```\n\n\n```");
        assert_eq!(
            apply_edits(&source, Vec::new()),
            vec!["a", "", "b", "```", "", "", "```"]
        );
    }
}
