//! Formatting entry points.
//!
//! One call formats one document: detect indentation into a session copy of
//! the settings, split glued `<A /><B />` tags onto their own lines, parse
//! (retrying once after `/>` recovery), collect edits
//! from every enabled rule, apply them in a single pass, normalize text and
//! finish with exactly one trailing newline.

use crate::document::Document;
use crate::edits::apply_edits;
use crate::error::Result;
use crate::indent::IndentProfile;
use crate::normalize::normalize_text;
use crate::rules::{collect_operations, RuleContext};
use crate::settings::{default_settings, RuleSettings};
use crate::syntax::{parse_with_recovery, split_adjacent_tags};
use crate::validate::validate_mdx;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

static MDX_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^import\s+").unwrap());
static MDX_EXPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^export\s+").unwrap());
static MDX_COMPONENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[A-Z]\w*[^>]*>").unwrap());
static FRONTMATTER_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*---\s*$").unwrap());

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    /// Force MDX handling on or off. Detected from the content when unset.
    pub mdx: Option<bool>,
    /// Validate component tag balance first and fail instead of degrading.
    pub strict: bool,
    /// Settings for this call. The shared defaults are used when unset.
    pub settings: Option<RuleSettings>,
}

impl FormatOptions {
    pub fn with_settings(settings: RuleSettings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }
}

/// Heuristic MDX detection: ESM lines, capitalized tags or a `---` line.
pub fn detect_mdx(text: &str) -> bool {
    MDX_IMPORT.is_match(text)
        || MDX_EXPORT.is_match(text)
        || MDX_COMPONENT.is_match(text)
        || FRONTMATTER_FENCE.is_match(text)
}

/// Format `text`. Never fails: on any error the input is returned unchanged.
pub fn format(text: &str, options: &FormatOptions) -> String {
    match try_format(text, options) {
        Ok(formatted) => formatted,
        Err(e) => {
            log::warn!("Returning input unchanged: {}", e);
            text.to_string()
        }
    }
}

/// Format `text`, surfacing parse and validation errors.
pub fn try_format(text: &str, options: &FormatOptions) -> Result<String> {
    if options.strict {
        validate_mdx(text)?;
    }

    let mut settings = options
        .settings
        .clone()
        .unwrap_or_else(|| default_settings().clone());
    let detected = IndentProfile::detect(text);
    let profile = settings.adopt_indent(&detected);
    log::debug!(
        "Indentation: {:?} x{} (confidence {:.2})",
        profile.unit,
        profile.size,
        detected.confidence
    );

    let mdx = options.mdx.unwrap_or_else(|| detect_mdx(text));
    let (doc, tree) = parse_with_recovery(Document::new(&split_adjacent_tags(text)))?;

    let ctx = RuleContext {
        doc: &doc,
        tree: &tree,
        settings: &settings,
        mdx,
    };
    let operations = collect_operations(&ctx);
    log::debug!("Applying {} edit(s)", operations.len());
    let mut result = apply_edits(&doc.lines(), operations).join("\n");

    if settings.normalize_text.enabled {
        result = normalize_text(&result, &settings.normalize_text, mdx);
    }
    Ok(finalize(&result))
}

/// Exactly one trailing newline; empty input stays empty.
fn finalize(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

/// Format `text` the way `options` asks: strict runs surface errors,
/// lenient runs fall back to the input.
pub fn format_source(text: &str, options: &FormatOptions) -> Result<String> {
    if options.strict {
        try_format(text, options)
    } else {
        Ok(format(text, options))
    }
}

/// Options for formatting the file at `path`: MDX is forced for `.mdx`
/// files and detected otherwise.
fn options_for(path: &Path, options: &FormatOptions) -> FormatOptions {
    let mut options = options.clone();
    if options.mdx.is_none() && path.extension().is_some_and(|ext| ext == "mdx") {
        options.mdx = Some(true);
    }
    options
}

/// Formatted content of the file at `path`, read fresh from disk.
pub fn formatted_content(path: &Path, options: &FormatOptions) -> Result<(String, String)> {
    let original = fs::read_to_string(path)?;
    let formatted = format_source(&original, &options_for(path, options))?;
    Ok((original, formatted))
}

/// Format a file in place with default options. Returns whether it changed.
pub fn format_file(path: &Path) -> Result<bool> {
    format_file_with(path, &FormatOptions::default())
}

/// Format a file in place. The file is only written when its content changes.
pub fn format_file_with(path: &Path, options: &FormatOptions) -> Result<bool> {
    let (original, formatted) = formatted_content(path, options)?;
    if formatted == original {
        return Ok(false);
    }
    fs::write(path, formatted)?;
    Ok(true)
}

/// Whether the file at `path` needs formatting. The file is never written.
pub fn check_file(path: &Path) -> Result<bool> {
    check_file_with(path, &FormatOptions::default())
}

pub fn check_file_with(path: &Path, options: &FormatOptions) -> Result<bool> {
    let (original, formatted) = formatted_content(path, options)?;
    Ok(formatted != original)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fmt(text: &str) -> String {
        format(text, &FormatOptions::default())
    }

    #[test]
    fn test_detect_mdx() {
        assert!(detect_mdx("import A from './a'\n"));
        assert!(detect_mdx("text <Card /> text"));
        assert!(detect_mdx("---\ntitle: a\n---\n"));
        assert!(!detect_mdx("# Plain\n\nmarkdown <b>bold</b>\n"));
    }

    #[test]
    fn test_trailing_newline() {
        assert_eq!(fmt("text"), "text\n");
        assert_eq!(fmt("text\n\n\n"), "text\n");
        assert_eq!(fmt(""), "");
        assert_eq!(fmt("\n\n"), "");
    }

    #[test]
    fn test_heading_spacing() {
        assert_eq!(fmt("# Heading\nContent"), "# Heading\n\nContent\n");
    }

    #[test]
    fn test_crlf_input() {
        assert_eq!(fmt("# Heading\r\nContent\r\n"), "# Heading\n\nContent\n");
    }

    #[test]
    fn test_parse_failure_returns_input() {
        let input = "<Card>\nnever closed\n";
        assert_eq!(fmt(input), input);
        let err = try_format(input, &FormatOptions::default()).unwrap_err();
        assert!(matches!(err, FormatError::Parse(_)));
    }

    #[test]
    fn test_strict_validation() {
        let options = FormatOptions {
            strict: true,
            ..FormatOptions::default()
        };
        let err = try_format("<A>\n<B>\n</A>\n</B>\n", &options).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid MDX: Mismatched JSX tags. Expected </B> but found </A>"
        );
    }

    #[test]
    fn test_format_source_strictness() {
        let unclosed = "<Card>\nnever closed\n";
        assert_eq!(
            format_source(unclosed, &FormatOptions::default()).unwrap(),
            unclosed
        );
        let strict = FormatOptions {
            strict: true,
            ..FormatOptions::default()
        };
        assert!(format_source("<A>\n<B>\n</A>\n</B>\n", &strict).is_err());
        assert_eq!(
            format_source("# Title\nText", &strict).unwrap(),
            "# Title\n\nText\n"
        );
    }

    #[test]
    fn test_markdown_skips_component_rules() {
        let options = FormatOptions {
            mdx: Some(false),
            ..FormatOptions::default()
        };
        let input = "<Comp a=\"1\" b=\"2\" />\n";
        assert_eq!(format(input, &options), input);
    }

    #[test]
    fn test_detected_indent_does_not_leak() {
        let tabbed = "<Tabs>\n\t<Tab>\n\n\tA\n\n\t</Tab>\n</Tabs>\n";
        format(tabbed, &FormatOptions::default());
        let defaults = default_settings();
        assert!(!defaults.format_multi_line_jsx.use_tabs);
        assert_eq!(defaults.format_multi_line_jsx.indent_size, 2);
    }

    #[test]
    fn test_format_and_check_file() {
        let mut file = tempfile::Builder::new().suffix(".mdx").tempfile().unwrap();
        write!(file, "# Title\nText").unwrap();
        let path = file.path().to_path_buf();

        assert!(check_file(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Title\nText");
        assert!(format_file(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Title\n\nText\n");
        assert!(!check_file(&path).unwrap());
        assert!(!format_file(&path).unwrap());
    }

    #[test]
    fn test_glued_components_split() {
        assert_eq!(
            fmt("<A /><B x=\"1\" y=\"2\" />"),
            "<A />\n\n<B\n  x=\"1\"\n  y=\"2\"\n/>\n"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("missing");
        assert!(matches!(format_file(&path), Err(FormatError::Io(_))));
    }
}
