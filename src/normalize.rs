//! Text-level normalization applied after structural edits.
//!
//! Works on the lines outside fenced code and frontmatter, with inline code
//! spans masked so their contents never change.

use crate::settings::TextSettings;
use crate::syntax::protected_lines;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`\n]+`").unwrap());
static CODE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new("\u{E000}(\\d+)\u{E001}").unwrap());

static ANGLE_AUTOLINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(https?://[^>\s]+)>").unwrap());
static GLUED_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z0-9])(https?://)").unwrap());
static GLUED_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z0-9])(\[[^\]^\n][^\]\n]*\]\()").unwrap());
static COLON_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r":(https?://)").unwrap());
static ESCAPED_COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^\n\\])\\:").unwrap());

static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#[xX]([0-9A-Fa-f]{4});|&#(\d{4,5});").unwrap());

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[。！？.!?）\]】A-Za-z0-9]$").unwrap());
static COMPONENT_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*<[A-Z]").unwrap());
static HEADING_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6} ").unwrap());
static ESM_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(import\s.+\sfrom\s|import\s+['"]|export\s+(const|let|var|function|default|class)\b)"#)
        .unwrap()
});
static JAPANESE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([。！？])([こそたなはまやらわがざだばぱ])").unwrap());

/// Normalize `text`. `mdx` enables rewrites that only make sense in MDX,
/// such as unwrapping `<https://…>` autolinks that MDX would read as JSX.
pub fn normalize_text(text: &str, settings: &TextSettings, mdx: bool) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let protected = protected_lines(&lines);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut chunk: Vec<&str> = Vec::new();

    for (line, protected) in lines.iter().zip(protected) {
        if protected {
            flush_chunk(&mut chunk, &mut out, settings, mdx);
            out.push(line.to_string());
        } else {
            chunk.push(line);
        }
    }
    flush_chunk(&mut chunk, &mut out, settings, mdx);
    out.join("\n")
}

fn flush_chunk(chunk: &mut Vec<&str>, out: &mut Vec<String>, settings: &TextSettings, mdx: bool) {
    if chunk.is_empty() {
        return;
    }
    let normalized = normalize_chunk(&chunk.join("\n"), settings, mdx);
    out.extend(normalized.split('\n').map(str::to_string));
    chunk.clear();
}

fn normalize_chunk(chunk: &str, settings: &TextSettings, mdx: bool) -> String {
    let mut spans = Vec::new();
    let masked = INLINE_CODE.replace_all(chunk, |caps: &Captures| {
        spans.push(caps[0].to_string());
        format!("\u{E000}{}\u{E001}", spans.len() - 1)
    });

    let mut text = masked.into_owned();
    if mdx {
        text = ANGLE_AUTOLINK.replace_all(&text, "$1").into_owned();
    }
    text = COLON_URL.replace_all(&text, ": $1").into_owned();
    text = GLUED_URL.replace_all(&text, "$1 $2").into_owned();
    text = GLUED_LINK.replace_all(&text, "$1 $2").into_owned();
    text = ESCAPED_COLON.replace_all(&text, "$1:").into_owned();
    text = NUMERIC_ENTITY.replace_all(&text, decode_japanese_entity).into_owned();

    let lines: Vec<String> = text.split('\n').map(fix_bold_spacing).collect();
    let mut lines = separate_blocks(lines);
    if settings.japanese_sentence_breaks {
        lines = lines
            .into_iter()
            .map(|line| {
                if line.trim_start().starts_with(['#', '<', '|']) {
                    line
                } else {
                    JAPANESE_BREAK.replace_all(&line, "$1\n$2").into_owned()
                }
            })
            .collect();
    }

    let joined = lines.join("\n");
    CODE_PLACEHOLDER
        .replace_all(&joined, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| spans.get(i).cloned())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Decode numeric references to kana and common kanji; leave others as written.
fn decode_japanese_entity(caps: &Captures) -> String {
    let code = match (caps.get(1), caps.get(2)) {
        (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
        (_, Some(dec)) => dec.as_str().parse().ok(),
        _ => None,
    };
    let japanese = |c: u32| {
        (0x3040..=0x309F).contains(&c) || (0x30A0..=0x30FF).contains(&c) || (0x4E00..=0x9FAF).contains(&c)
    };
    code.filter(|&c| japanese(c))
        .and_then(char::from_u32)
        .map(String::from)
        .unwrap_or_else(|| caps[0].to_string())
}

/// Tidy `**bold**` spacing on one line: no whitespace just inside the
/// markers, and a space separating the markers from adjacent word or
/// operator characters.
fn fix_bold_spacing(line: &str) -> String {
    let trimmed = line.trim_start();
    if trimmed.starts_with('<') || line.contains("***") {
        return line.to_string();
    }
    let markers: Vec<usize> = line.match_indices("**").map(|(i, _)| i).collect();
    if markers.is_empty() || markers.len() % 2 != 0 {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + 4);
    let mut cursor = 0;
    for pair in markers.chunks(2) {
        let (open, close) = (pair[0], pair[1]);
        let inner = line[open + 2..close].trim();
        if inner.is_empty() {
            continue;
        }
        let before = &line[cursor..open];
        out.push_str(before);
        let glued_before = out
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '+' | '-' | '='));
        if glued_before {
            out.push(' ');
        }
        out.push_str("**");
        out.push_str(inner);
        out.push_str("**");
        cursor = close + 2;
        if line[cursor..].starts_with(['+', '-', '=']) {
            out.push(' ');
        }
    }
    out.push_str(&line[cursor..]);
    out
}

/// Insert a blank line between a finished line of prose and a following
/// component, heading or ESM statement.
fn separate_blocks(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    for i in 0..lines.len() {
        out.push(lines[i].clone());
        let Some(next) = lines.get(i + 1) else {
            continue;
        };
        if needs_blank(&lines[i], next) {
            out.push(String::new());
        }
    }
    out
}

fn needs_blank(current: &str, next: &str) -> bool {
    let trimmed = current.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with('|')
        || ESM_START.is_match(current)
        || !SENTENCE_END.is_match(trimmed)
    {
        return false;
    }
    COMPONENT_START.is_match(next) || HEADING_START.is_match(next) || ESM_START.is_match(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalize(text: &str) -> String {
        normalize_text(text, &TextSettings::default(), true)
    }

    #[test]
    fn test_autolinks_unwrapped() {
        assert_eq!(
            normalize("See <https://example.com/a> now"),
            "See https://example.com/a now"
        );
    }

    #[test]
    fn test_autolinks_kept_in_markdown() {
        let text = "See <https://example.com/a> now";
        assert_eq!(normalize_text(text, &TextSettings::default(), false), text);
    }

    #[test]
    fn test_glued_urls_separated() {
        assert_eq!(
            normalize("Docshttps://a.io and URL:https://b.io"),
            "Docs https://a.io and URL: https://b.io"
        );
        assert_eq!(normalize("see[docs](/d) and[^1]"), "see [docs](/d) and[^1]");
    }

    #[test]
    fn test_escaped_colon() {
        assert_eq!(normalize("Note\\: read this"), "Note: read this");
    }

    #[test]
    fn test_inline_code_untouched() {
        let text = "Run `curl<https://x.io>` and `a\\:b`";
        assert_eq!(normalize(text), text);
    }

    #[test]
    fn test_fenced_code_untouched() {
        let text = "```\nDocshttps://a.io\n**a **\n```";
        assert_eq!(normalize(text), text);
    }

    #[test]
    fn test_bold_spacing() {
        assert_eq!(fix_bold_spacing("**bold **text"), "**bold**text");
        assert_eq!(fix_bold_spacing("a**b**+c"), "a **b** +c");
        assert_eq!(fix_bold_spacing("odd ** count"), "odd ** count");
        assert_eq!(fix_bold_spacing("***both***"), "***both***");
        assert_eq!(fix_bold_spacing("Already **fine** here"), "Already **fine** here");
    }

    #[test]
    fn test_japanese_entities_decoded() {
        assert_eq!(normalize("&#x3042;&#12354;&#x00E9;"), "ああ&#x00E9;");
    }

    #[test]
    fn test_blank_before_component_heading_and_esm() {
        assert_eq!(
            normalize("Some text.\n<Card />\nMore\n## Next\nEnd\nexport const a = 1"),
            "Some text.\n\n<Card />\nMore\n\n## Next\nEnd\n\nexport const a = 1"
        );
    }

    #[test]
    fn test_no_blank_before_closing_tag() {
        let text = "<InfoBox>\n\nText\n</InfoBox>";
        assert_eq!(normalize(text), text);
    }

    #[test]
    fn test_japanese_breaks_opt_in() {
        let text = "今日は晴れ。そして明日";
        assert_eq!(normalize(text), text);
        let settings = TextSettings {
            enabled: true,
            japanese_sentence_breaks: true,
        };
        assert_eq!(
            normalize_text(text, &settings, true),
            "今日は晴れ。\nそして明日"
        );
    }

    #[test]
    fn test_idempotent() {
        let text = "Intro**bold**\nLinkhttps://a.io\n<A /><B />\n# Title";
        let once = normalize(text);
        assert_eq!(normalize(&once), once);
    }
}
