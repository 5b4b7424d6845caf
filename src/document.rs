//! Source document and position mapping.

use serde::Serialize;

/// A point in the document. Lines and columns are zero-based, columns and
/// offsets count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// Half-open byte range with resolved line/column endpoints.
///
/// `end.line` is the line holding the last byte of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn start_line(&self) -> usize {
        self.start.line
    }

    pub fn end_line(&self) -> usize {
        self.end.line
    }

    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }
}

/// Normalized source text plus its line table.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    line_starts: Vec<usize>,
}

impl Document {
    /// Build a document, normalizing `\r\n` and lone `\r` to `\n`.
    pub fn new(source: &str) -> Self {
        let text = if source.contains('\r') {
            source.replace("\r\n", "\n").replace('\r', "\n")
        } else {
            source.to_string()
        };
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line `index` without its terminator. Out-of-range lines are empty.
    pub fn line(&self, index: usize) -> &str {
        let Some(&start) = self.line_starts.get(index) else {
            return "";
        };
        let end = self
            .line_starts
            .get(index + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        &self.text[start..end]
    }

    pub fn lines(&self) -> Vec<&str> {
        (0..self.line_count()).map(|i| self.line(i)).collect()
    }

    pub fn is_blank(&self, index: usize) -> bool {
        self.line(index).trim().is_empty()
    }

    pub fn line_start(&self, index: usize) -> usize {
        self.line_starts
            .get(index)
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Offset just past the last byte of line `index` (before its `\n`).
    pub fn line_end(&self, index: usize) -> usize {
        self.line_start(index) + self.line(index).len()
    }

    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = self.line_of(offset);
        Position {
            line,
            column: offset - self.line_starts[line],
            offset,
        }
    }

    /// Span for `start..end`, with trailing line breaks excluded from the end.
    pub fn span(&self, start: usize, end: usize) -> Span {
        let mut last = end.max(start + 1).min(self.text.len().max(start + 1)) - 1;
        let bytes = self.text.as_bytes();
        while last > start && bytes.get(last) == Some(&b'\n') {
            last -= 1;
        }
        let mut end_pos = self.position(last);
        end_pos.offset = (last + 1).min(self.text.len()).max(start);
        end_pos.column = end_pos.offset - self.line_starts[end_pos.line];
        Span {
            start: self.position(start),
            end: end_pos,
        }
    }

    /// Span covering whole lines `first..=last`.
    pub fn line_span(&self, first: usize, last: usize) -> Span {
        self.span(self.line_start(first), self.line_end(last))
    }

    pub fn slice(&self, span: &Span) -> &str {
        &self.text[span.start.offset..span.end.offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_and_offsets() {
        let doc = Document::new("ab\ncd\n\nef");
        assert_eq!(doc.line_count(), 4);
        assert_eq!(doc.line(1), "cd");
        assert_eq!(doc.line(2), "");
        assert_eq!(doc.line_start(3), 7);
        assert_eq!(doc.line_of(4), 1);
        assert_eq!(doc.position(8).column, 1);
    }

    #[test]
    fn test_crlf_normalized() {
        let doc = Document::new("a\r\nb\r\n");
        assert_eq!(doc.text(), "a\nb\n");
        assert_eq!(doc.lines(), vec!["a", "b", ""]);
    }

    #[test]
    fn test_span_trims_trailing_newline() {
        let doc = Document::new("# Title\ntext\n");
        let span = doc.span(0, 8);
        assert_eq!(span.start_line(), 0);
        assert_eq!(span.end_line(), 0);
        assert_eq!(doc.slice(&span), "# Title");
    }

    #[test]
    fn test_line_span() {
        let doc = Document::new("a\nbb\nccc");
        let span = doc.line_span(1, 2);
        assert_eq!(doc.slice(&span), "bb\nccc");
        assert_eq!(span.end.column, 3);
    }
}
