//! HTML block formatter.
//!
//! Lays out a flow-level HTML element with one block child per line, each
//! nested level indented by one unit. Children that are all inline stay on
//! the line of their parent. Text inside `<pre>`, `<script>`, `<style>` and
//! `<textarea>`, comments, embedded components and preserved tags are
//! copied verbatim. A block whose body holds Markdown (a code fence or a
//! blank line between text) is left as written, as is any block with a
//! structural problem.

use crate::settings::HtmlSettings;
use crate::syntax::fence_marker;
use crate::syntax::tag::{find_closing_tag, is_void_element, lex_open_tag, TagKind, TagSyntax};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "br", "button", "cite", "code", "del", "em", "i", "img", "input", "ins",
    "kbd", "label", "mark", "q", "s", "small", "span", "strong", "sub", "sup", "time", "u",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["pre", "script", "style", "textarea"];

const DEFINITION_ELEMENTS: &[&str] = &["dd", "dt"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HtmlError {
    #[error("<{0}> is never closed")]
    Unclosed(String),
    #[error("unexpected </{0}>")]
    UnexpectedClose(String),
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("<{0}> holds Markdown")]
    MarkdownBody(String),
}

#[derive(Debug)]
enum HtmlNode {
    Element {
        tag: TagSyntax,
        children: Vec<HtmlNode>,
        leaf: bool,
    },
    Text(String),
    /// Copied verbatim. `block` raws always start a line of their own,
    /// prefixed with `indent` when set and the current padding otherwise.
    Raw {
        text: String,
        block: bool,
        indent: Option<String>,
    },
}

impl HtmlNode {
    fn is_inline(&self) -> bool {
        match self {
            HtmlNode::Text(_) => true,
            HtmlNode::Raw { block, .. } => !block,
            HtmlNode::Element { tag, children, .. } => {
                INLINE_ELEMENTS.contains(&tag.name.to_ascii_lowercase().as_str())
                    && children.iter().all(HtmlNode::is_inline)
            }
        }
    }
}

/// Format one HTML block. Lines the formatter lays out are prefixed with
/// `base`; continuation lines of verbatim content keep their original text.
pub fn format_html_block(source: &str, base: &str, settings: &HtmlSettings) -> String {
    match try_format_html(source, base, settings) {
        Ok(formatted) => formatted,
        Err(e) => {
            log::debug!("Leaving HTML block as written: {}", e);
            prefix_first_line(source, base)
        }
    }
}

fn prefix_first_line(source: &str, base: &str) -> String {
    format!("{}{}", base, source)
}

fn try_format_html(source: &str, base: &str, settings: &HtmlSettings) -> Result<String, HtmlError> {
    let parser = HtmlParser {
        text: source,
        preserve: &settings.preserve_tags,
    };
    let nodes = parser.parse(0, source.len())?;
    let mut printer = Printer {
        unit: settings.formatter_config.indent_unit(),
        base,
        out: Vec::new(),
    };
    printer.block_children(&nodes, 0);
    Ok(printer.out.join("\n"))
}

struct HtmlParser<'a> {
    text: &'a str,
    preserve: &'a [String],
}

impl HtmlParser<'_> {
    fn parse(&self, start: usize, end: usize) -> Result<Vec<HtmlNode>, HtmlError> {
        let text = self.text;
        let mut nodes = Vec::new();
        let mut pending = String::new();
        let mut i = start;

        while i < end {
            let rest = &text[i..end];
            let Some(lt) = rest.find('<') else {
                pending.push_str(rest);
                break;
            };
            pending.push_str(&rest[..lt]);
            i += lt;
            let rest = &text[i..end];

            if rest.starts_with("<!--") {
                let close = rest.find("-->").ok_or(HtmlError::UnterminatedComment)?;
                flush_text(&mut pending, &mut nodes);
                nodes.push(HtmlNode::Raw {
                    text: rest[..close + 3].to_string(),
                    block: true,
                    indent: None,
                });
                i += close + 3;
                continue;
            }
            if let Some(closing) = rest.strip_prefix("</") {
                let name: String = closing
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '.')
                    .collect();
                return Err(HtmlError::UnexpectedClose(name));
            }
            let Ok(tag) = lex_open_tag(text, i) else {
                pending.push('<');
                i += 1;
                continue;
            };
            if tag.end > end {
                return Err(HtmlError::Unclosed(tag.name));
            }

            flush_text(&mut pending, &mut nodes);
            let (node, next) = self.element(tag, end)?;
            nodes.push(node);
            i = next;
        }
        flush_text(&mut pending, &mut nodes);
        Ok(nodes)
    }

    fn element(&self, tag: TagSyntax, end: usize) -> Result<(HtmlNode, usize), HtmlError> {
        let lower = tag.name.to_ascii_lowercase();
        let leaf = tag.self_closing || is_void_element(&tag.name);
        let verbatim = tag.kind() == TagKind::ComponentTag
            || RAW_TEXT_ELEMENTS.contains(&lower.as_str())
            || self.preserve.iter().any(|p| p.eq_ignore_ascii_case(&lower));

        if leaf {
            let node = if verbatim {
                self.raw(&tag, tag.end)
            } else {
                HtmlNode::Element {
                    tag: tag.clone(),
                    children: Vec::new(),
                    leaf: true,
                }
            };
            return Ok((node, tag.end));
        }

        let (close_start, close_end) = find_closing_tag(self.text, &tag.name, tag.end)
            .filter(|&(_, close_end)| close_end <= end)
            .ok_or_else(|| HtmlError::Unclosed(tag.name.clone()))?;

        if verbatim {
            return Ok((self.raw(&tag, close_end), close_end));
        }

        let mut children = self.parse(tag.end, close_start)?;
        if holds_markdown(&children) {
            return Err(HtmlError::MarkdownBody(tag.name));
        }
        if DEFINITION_ELEMENTS.contains(&lower.as_str()) && !contains_raw(&children) {
            // short definitions fit on one line
            let inner = WHITESPACE_RUN.replace_all(&self.text[tag.end..close_start], " ");
            let inner = inner.trim();
            children = if inner.is_empty() {
                Vec::new()
            } else {
                vec![HtmlNode::Text(inner.to_string())]
            };
        }
        Ok((
            HtmlNode::Element {
                tag,
                children,
                leaf: false,
            },
            close_end,
        ))
    }

    fn raw(&self, tag: &TagSyntax, end: usize) -> HtmlNode {
        let text = self.text[tag.start..end].to_string();
        if tag.kind() == TagKind::ComponentTag {
            if let Some(indent) = self.own_line_indent(tag.start, end) {
                return HtmlNode::Raw {
                    text,
                    block: true,
                    indent: Some(indent),
                };
            }
        }
        let block = text.contains('\n') || tag.kind() == TagKind::HtmlElement;
        HtmlNode::Raw {
            text,
            block,
            indent: None,
        }
    }

    /// Leading whitespace of the line holding `start..end`, when nothing
    /// else shares its first and last lines.
    fn own_line_indent(&self, start: usize, end: usize) -> Option<String> {
        let line_start = self.text[..start].rfind('\n').map_or(0, |i| i + 1);
        let before = &self.text[line_start..start];
        let after = &self.text[end..];
        let after = &after[..after.find('\n').unwrap_or(after.len())];
        let alone = before.chars().all(|c| c == ' ' || c == '\t') && after.trim().is_empty();
        alone.then(|| before.to_string())
    }
}

/// Direct text with a fence line or a blank line between text lines.
fn holds_markdown(nodes: &[HtmlNode]) -> bool {
    nodes.iter().any(|node| {
        let HtmlNode::Text(text) = node else {
            return false;
        };
        if text.trim().is_empty() {
            return false;
        }
        let lines: Vec<&str> = text.split('\n').collect();
        lines.iter().any(|line| fence_marker(line).is_some())
            || (1..lines.len().saturating_sub(1)).any(|i| lines[i].trim().is_empty())
    })
}

fn contains_raw(nodes: &[HtmlNode]) -> bool {
    nodes.iter().any(|node| match node {
        HtmlNode::Raw { .. } => true,
        HtmlNode::Element { children, .. } => contains_raw(children),
        HtmlNode::Text(_) => false,
    })
}

fn flush_text(pending: &mut String, nodes: &mut Vec<HtmlNode>) {
    if !pending.is_empty() {
        nodes.push(HtmlNode::Text(std::mem::take(pending)));
    }
}

/// Opening tag with single-spaced attributes.
fn render_open(tag: &TagSyntax) -> String {
    let mut out = format!("<{}", tag.name);
    for attr in &tag.attributes {
        out.push(' ');
        out.push_str(&attr.render());
    }
    out.push_str(if tag.self_closing { " />" } else { ">" });
    out
}

fn render_inline(nodes: &[HtmlNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Raw { text, .. } => out.push_str(text),
            HtmlNode::Element {
                tag,
                children,
                leaf,
            } => {
                out.push_str(&render_open(tag));
                if !leaf {
                    out.push_str(&render_inline(children));
                    out.push_str(&format!("</{}>", tag.name));
                }
            }
        }
    }
    out
}

struct Printer<'a> {
    unit: String,
    base: &'a str,
    out: Vec<String>,
}

impl Printer<'_> {
    fn pad(&self, depth: usize) -> String {
        format!("{}{}", self.base, self.unit.repeat(depth))
    }

    fn block_children(&mut self, nodes: &[HtmlNode], depth: usize) {
        let start = self.out.len();
        let mut pending_blank = false;
        let mut i = 0;

        while i < nodes.len() {
            if nodes[i].is_inline() {
                let run_end = nodes[i..]
                    .iter()
                    .position(|n| !n.is_inline())
                    .map_or(nodes.len(), |p| i + p);
                let text = render_inline(&nodes[i..run_end]);
                let segments: Vec<&str> = text.split('\n').collect();
                for (k, segment) in segments.iter().enumerate() {
                    let trimmed = segment.trim();
                    if trimmed.is_empty() {
                        if k > 0 && k + 1 < segments.len() {
                            pending_blank = true;
                        }
                        continue;
                    }
                    if pending_blank && self.out.len() > start {
                        self.out.push(String::new());
                    }
                    pending_blank = false;
                    let line = format!("{}{}", self.pad(depth), trimmed);
                    self.out.push(line);
                }
                i = run_end;
                continue;
            }

            if pending_blank && self.out.len() > start {
                self.out.push(String::new());
            }
            pending_blank = false;
            self.block_node(&nodes[i], depth);
            i += 1;
        }
    }

    fn block_node(&mut self, node: &HtmlNode, depth: usize) {
        let pad = self.pad(depth);
        match node {
            HtmlNode::Text(text) => {
                let line = format!("{}{}", pad, text.trim());
                self.out.push(line);
            }
            HtmlNode::Raw { text, indent, .. } => {
                let lead = indent.as_deref().unwrap_or(pad.as_str());
                let mut lines = text.split('\n');
                if let Some(first) = lines.next() {
                    self.out.push(format!("{}{}", lead, first.trim_start()));
                }
                self.out.extend(lines.map(str::to_string));
            }
            HtmlNode::Element {
                tag,
                children,
                leaf,
            } => {
                let open = render_open(tag);
                if *leaf {
                    self.out.push(format!("{}{}", pad, open));
                    return;
                }
                let close = format!("</{}>", tag.name);
                if children.iter().all(HtmlNode::is_inline) {
                    let inline = render_inline(children);
                    if !inline.contains('\n') {
                        self.out
                            .push(format!("{}{}{}{}", pad, open, inline.trim(), close));
                        return;
                    }
                }
                self.out.push(format!("{}{}", pad, open));
                self.block_children(children, depth + 1);
                self.out.push(format!("{}{}", pad, close));
            }
        }
    }
}
