//! Canonical YAML emitter for frontmatter.
//!
//! Values are loaded with serde_yaml and written back in block style:
//! plain scalars where they read back unchanged, double quotes otherwise,
//! literal blocks for multi-line strings and folded blocks for long prose.

use crate::error::Result;
use crate::settings::FrontmatterSettings;
use serde_yaml::{Mapping, Value};

struct Emitter<'a> {
    style: &'a FrontmatterSettings,
    out: Vec<String>,
}

/// Reformat a frontmatter body. Returns `Ok(None)` for content this emitter
/// does not rewrite: non-mapping documents, tagged values and complex keys.
pub fn reformat(content: &str, style: &FrontmatterSettings) -> Result<Option<Vec<String>>> {
    let value: Value = serde_yaml::from_str(content)?;
    let Value::Mapping(map) = &value else {
        return Ok(None);
    };
    if !is_emittable(&value) {
        return Ok(None);
    }
    let mut emitter = Emitter {
        style,
        out: Vec::new(),
    };
    emitter.mapping(map, "");
    Ok(Some(emitter.out))
}

fn is_emittable(value: &Value) -> bool {
    match value {
        Value::Tagged(_) => false,
        Value::Sequence(items) => items.iter().all(is_emittable),
        Value::Mapping(map) => map
            .iter()
            .all(|(k, v)| is_scalar(k) && is_emittable(v)),
        _ => true,
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
    )
}

impl Emitter<'_> {
    fn child_pad(&self, pad: &str) -> String {
        format!("{}{}", pad, " ".repeat(self.style.indent.max(1)))
    }

    fn mapping(&mut self, map: &Mapping, pad: &str) {
        for (key, value) in map {
            let prefix = format!("{}{}:", pad, render_key(key));
            match value {
                Value::Mapping(inner) if !inner.is_empty() => {
                    self.out.push(prefix);
                    let child = self.child_pad(pad);
                    self.mapping(inner, &child);
                }
                Value::Sequence(items) if !items.is_empty() => {
                    self.out.push(prefix);
                    let child = self.child_pad(pad);
                    self.sequence(items, &child);
                }
                _ => {
                    let child = self.child_pad(pad);
                    self.scalar(&prefix, value, &child);
                }
            }
        }
    }

    fn sequence(&mut self, items: &[Value], pad: &str) {
        let nested_pad = format!("{}  ", pad);
        for item in items {
            match item {
                Value::Mapping(inner) if !inner.is_empty() => {
                    let from = self.out.len();
                    self.mapping(inner, &nested_pad);
                    self.mark_item(from, pad);
                }
                Value::Sequence(inner) if !inner.is_empty() => {
                    let from = self.out.len();
                    self.sequence(inner, &nested_pad);
                    self.mark_item(from, pad);
                }
                _ => self.scalar(&format!("{}-", pad), item, &nested_pad),
            }
        }
    }

    /// Turn the first line emitted since `from` into a `- ` item line.
    fn mark_item(&mut self, from: usize, pad: &str) {
        if let Some(first) = self.out.get_mut(from) {
            *first = format!("{}- {}", pad, first.trim_start());
        }
    }

    /// Emit `prefix` followed by a scalar or empty collection.
    fn scalar(&mut self, prefix: &str, value: &Value, child_pad: &str) {
        match value {
            Value::Null => self.out.push(prefix.to_string()),
            Value::Bool(b) => self.out.push(format!("{} {}", prefix, b)),
            Value::Number(n) => self.out.push(format!("{} {}", prefix, n)),
            Value::Mapping(_) => self.out.push(format!("{} {{}}", prefix)),
            Value::Sequence(_) => self.out.push(format!("{} []", prefix)),
            Value::String(s) => self.string(prefix, s, child_pad),
            Value::Tagged(_) => {}
        }
    }

    fn string(&mut self, prefix: &str, s: &str, child_pad: &str) {
        if s.contains('\n') && literal_ok(s) {
            let indicator = if s.ends_with("\n\n") {
                "|+"
            } else if s.ends_with('\n') {
                "|"
            } else {
                "|-"
            };
            self.out.push(format!("{} {}", prefix, indicator));
            let body = s.strip_suffix('\n').unwrap_or(s);
            for line in body.split('\n') {
                self.out.push(if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", child_pad, line)
                });
            }
            return;
        }

        if prefix.len() + 1 + s.len() > self.style.line_width && fold_ok(s) {
            self.out.push(format!("{} >-", prefix));
            let width = self.style.line_width.saturating_sub(child_pad.len()).max(20);
            for line in fill(s, width) {
                self.out.push(format!("{}{}", child_pad, line));
            }
            return;
        }

        if is_plain(s) {
            self.out.push(format!("{} {}", prefix, s));
        } else {
            self.out.push(format!("{} {}", prefix, double_quote(s)));
        }
    }
}

fn render_key(key: &Value) -> String {
    match key {
        Value::String(s) if is_plain(s) => s.clone(),
        Value::String(s) => double_quote(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => "null".to_string(),
    }
}

/// Whether `s` can be written unquoted and still load as the same string.
fn is_plain(s: &str) -> bool {
    if s.is_empty() || s.trim() != s || s.contains(['\n', '\t', '\r']) {
        return false;
    }
    if s.starts_with([
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
        '`',
    ]) {
        return false;
    }
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return false;
    }
    matches!(serde_yaml::from_str::<Value>(s), Ok(Value::String(ref loaded)) if loaded == s)
}

/// Literal blocks cannot express leading spaces on the first line or
/// carriage returns.
fn literal_ok(s: &str) -> bool {
    !s.starts_with([' ', '\t']) && !s.contains('\r') && !s.trim().is_empty()
}

/// Folding joins lines with single spaces, so only single-spaced text folds.
fn fold_ok(s: &str) -> bool {
    s.contains(' ')
        && s.trim() == s
        && !s.contains("  ")
        && !s.contains(['\n', '\t', '\r'])
}

/// Greedy word fill to `width` columns.
fn fill(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split(' ') {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn double_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn emit(content: &str) -> String {
        reformat(content, &FrontmatterSettings::default())
            .unwrap()
            .unwrap()
            .join("\n")
    }

    #[test]
    fn test_quotes_and_flow_sequences() {
        assert_eq!(
            emit("title: \"Test Article\"\n\ndescription:   A long description\ntags: [tag1, tag2]"),
            "title: Test Article\ndescription: A long description\ntags:\n  - tag1\n  - tag2"
        );
    }

    #[test]
    fn test_ambiguous_strings_stay_quoted() {
        assert_eq!(
            emit("a: \"true\"\nb: \"123\"\nc: \"x: y\"\nd: \"\"\ne: \"2024-01-01\""),
            "a: \"true\"\nb: \"123\"\nc: \"x: y\"\nd: \"\"\ne: 2024-01-01"
        );
    }

    #[test]
    fn test_nested_collections() {
        assert_eq!(
            emit("authors:\n    - name: A\n      url: /a\n    - name: B\nmeta: {draft: true, order: 3}\nempty: []\nnone:"),
            "authors:\n  - name: A\n    url: /a\n  - name: B\nmeta:\n  draft: true\n  order: 3\nempty: []\nnone:"
        );
    }

    #[test]
    fn test_literal_block() {
        assert_eq!(
            emit("note: \"line one\\nline two\\n\""),
            "note: |\n  line one\n  line two"
        );
    }

    #[test]
    fn test_long_text_folds() {
        let words = vec!["word"; 30].join(" ");
        let out = emit(&format!("description: {}", words));
        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines[0], "description: >-");
        assert!(lines[1..].iter().all(|l| l.starts_with("  ") && l.len() <= 100));
        let reloaded: Value = serde_yaml::from_str(&out).unwrap();
        assert_eq!(reloaded["description"], Value::String(words));
    }

    #[test]
    fn test_output_is_stable() {
        let once = emit("title: 'It''s here'\nlist: [a, 'b: c']\nn: 1.5");
        assert_eq!(emit(&once), once);
    }

    #[test]
    fn test_non_mapping_is_skipped() {
        let settings = FrontmatterSettings::default();
        assert_eq!(reformat("- a\n- b", &settings).unwrap(), None);
        assert_eq!(reformat("x: !custom 1", &settings).unwrap(), None);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(reformat("a: [unclosed", &FrontmatterSettings::default()).is_err());
    }
}
