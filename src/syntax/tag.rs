//! Tag classification and the JSX/HTML opening-tag lexer.

use super::FenceTracker;

/// Standard HTML vocabulary. Anything outside it is a component tag.
pub const HTML_ELEMENTS: &[&str] = &[
    // structure
    "html", "head", "body", "div", "span", "section", "article", "aside", "header", "footer",
    "main", "nav", "figure", "figcaption",
    // text
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "code", "em", "strong", "i",
    "b", "u", "s", "mark", "small", "del", "ins", "sub", "sup", "cite", "q", "abbr", "address",
    "time",
    // lists
    "ul", "ol", "li", "dl", "dt", "dd",
    // tables
    "table", "thead", "tbody", "tfoot", "tr", "td", "th", "caption", "colgroup", "col",
    // forms
    "form", "input", "textarea", "button", "select", "option", "optgroup", "label", "fieldset",
    "legend", "datalist", "output", "progress", "meter",
    // media
    "img", "audio", "video", "source", "track", "picture", "iframe", "embed", "object", "param",
    "canvas", "svg",
    // other
    "a", "br", "hr", "details", "summary", "dialog", "menu", "menuitem", "script", "noscript",
    "template", "slot",
];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Whether a tag is literal HTML or an author-defined component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    HtmlElement,
    ComponentTag,
}

impl TagKind {
    pub fn classify(name: &str) -> Self {
        match name.chars().next() {
            Some(first) if first.is_ascii_lowercase() && HTML_ELEMENTS.contains(&name) => {
                TagKind::HtmlElement
            }
            _ => TagKind::ComponentTag,
        }
    }
}

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
}

/// True for names written with a leading capital, the MDX component convention.
pub fn is_capitalized(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// One attribute as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Empty for `{...spread}` attributes.
    pub name: String,
    /// Raw value including its quotes or braces.
    pub value: Option<String>,
}

impl Attribute {
    /// Canonical source text: `name`, `name=value` or the spread expression.
    pub fn render(&self) -> String {
        match (&self.value, self.name.is_empty()) {
            (Some(value), true) => value.clone(),
            (Some(value), false) => format!("{}={}", self.name, value),
            (None, _) => self.name.clone(),
        }
    }
}

/// A lexed opening tag. Offsets are byte offsets into the lexed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSyntax {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
    pub start: usize,
    /// One past the closing `>`.
    pub end: usize,
}

impl TagSyntax {
    pub fn kind(&self) -> TagKind {
        TagKind::classify(&self.name)
    }

    /// No closing tag follows: written `/>` or an HTML void element.
    pub fn is_leaf(&self) -> bool {
        self.self_closing || (self.kind() == TagKind::HtmlElement && is_void_element(&self.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// `<` is not followed by a tag name.
    NotATag,
    /// Input ended inside a quoted attribute value.
    UnterminatedQuote { name: String },
    /// Input ended, or another `<` began, before the tag was closed.
    Unterminated { name: String },
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b'.' | b':')
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Index just past the `}` balancing the `{` at `open`, honoring string
/// literals inside the expression.
pub fn scan_braces(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let c = bytes[i];
        if let Some(q) = quote {
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
        } else {
            match c {
                b'"' | b'\'' | b'`' => quote = Some(c),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Lex the opening tag whose `<` sits at `start`.
pub fn lex_open_tag(text: &str, start: usize) -> Result<TagSyntax, LexError> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'<') || !bytes.get(start + 1).is_some_and(u8::is_ascii_alphabetic)
    {
        return Err(LexError::NotATag);
    }

    let mut i = start + 1;
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }
    let name = text[start + 1..i].to_string();
    let unterminated = |name: &str| LexError::Unterminated {
        name: name.to_string(),
    };

    let mut attributes = Vec::new();
    loop {
        i = skip_whitespace(bytes, i);
        let Some(&c) = bytes.get(i) else {
            return Err(unterminated(&name));
        };
        match c {
            b'>' => {
                return Ok(TagSyntax {
                    name,
                    attributes,
                    self_closing: false,
                    start,
                    end: i + 1,
                })
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                return Ok(TagSyntax {
                    name,
                    attributes,
                    self_closing: true,
                    start,
                    end: i + 2,
                })
            }
            b'/' => i += 1,
            b'<' | b'"' | b'\'' | b'=' => return Err(unterminated(&name)),
            b'{' => {
                let end = scan_braces(bytes, i).ok_or_else(|| unterminated(&name))?;
                attributes.push(Attribute {
                    name: String::new(),
                    value: Some(text[i..end].to_string()),
                });
                i = end;
            }
            _ => {
                let name_start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/' | b'{' | b'"' | b'\'' | b'<')
                {
                    i += 1;
                }
                let attr_name = text[name_start..i].to_string();

                let after = skip_whitespace(bytes, i);
                if bytes.get(after) != Some(&b'=') {
                    attributes.push(Attribute {
                        name: attr_name,
                        value: None,
                    });
                    continue;
                }

                let value_start = skip_whitespace(bytes, after + 1);
                let value_end = match bytes.get(value_start) {
                    Some(&q @ (b'"' | b'\'')) => bytes[value_start + 1..]
                        .iter()
                        .position(|&b| b == q)
                        .map(|p| value_start + 1 + p + 1)
                        .ok_or_else(|| LexError::UnterminatedQuote { name: name.clone() })?,
                    Some(b'{') => {
                        scan_braces(bytes, value_start).ok_or_else(|| unterminated(&name))?
                    }
                    Some(_) => {
                        let mut j = value_start;
                        while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>'
                        {
                            j += 1;
                        }
                        j
                    }
                    None => return Err(unterminated(&name)),
                };
                attributes.push(Attribute {
                    name: attr_name,
                    value: Some(text[value_start..value_end].to_string()),
                });
                i = value_end;
            }
        }
    }
}

/// Find the `</name>` that closes an element whose opening tag ended at
/// `from`. Nested same-name elements, fenced code and inline code spans are
/// skipped. Returns the offsets of `<` and one past `>`.
pub fn find_closing_tag(text: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut fences = FenceTracker::default();
    let mut i = from;
    let mut at_line_start = from == 0 || bytes.get(from.wrapping_sub(1)) == Some(&b'\n');

    while i < bytes.len() {
        if at_line_start {
            at_line_start = false;
            let line_end = text[i..].find('\n').map(|p| i + p).unwrap_or(text.len());
            if fences.step(&text[i..line_end]) {
                i = line_end + 1;
                at_line_start = true;
                continue;
            }
        }

        match bytes[i] {
            b'\n' => {
                at_line_start = true;
                i += 1;
            }
            b'`' => {
                let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
                let ticks = &text[i..i + run];
                let rest = i + run;
                i = match text[rest..].find(ticks) {
                    // inline code never spans a blank line
                    Some(p) if !text[rest..rest + p].contains("\n\n") => rest + p + run,
                    _ => rest,
                };
            }
            b'<' if bytes.get(i + 1) == Some(&b'/') => {
                let name_start = i + 2;
                let name_end = name_start + name.len();
                let matches = text.get(name_start..name_end) == Some(name)
                    && !bytes.get(name_end).copied().is_some_and(is_name_char);
                if matches {
                    let close = skip_whitespace(bytes, name_end);
                    if bytes.get(close) == Some(&b'>') {
                        if depth == 0 {
                            return Some((i, close + 1));
                        }
                        depth -= 1;
                        i = close + 1;
                        continue;
                    }
                }
                i += 1;
            }
            b'<' => {
                let name_end = i + 1 + name.len();
                let same_name = text.get(i + 1..name_end) == Some(name)
                    && !bytes.get(name_end).copied().is_some_and(is_name_char);
                match lex_open_tag(text, i) {
                    Ok(tag) if same_name => {
                        if !tag.is_leaf() {
                            depth += 1;
                        }
                        i = tag.end;
                    }
                    _ => i += 1,
                }
            }
            _ => i += 1,
        }
    }
    None
}
