//! Rule configuration.
//!
//! `RuleSettings` enumerates every formatting rule with its enabled flag and
//! parameters. The process-wide defaults are immutable; a formatting session
//! clones them and only ever writes detected indentation into its own copy.

use crate::error::Result;
use crate::indent::{IndentProfile, IndentUnit};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = ".mdx-fmt.toml";

static DEFAULT_SETTINGS: Lazy<RuleSettings> = Lazy::new(RuleSettings::default);

/// Shared read-only defaults. Sessions clone this value before adapting it.
pub fn default_settings() -> &'static RuleSettings {
    &DEFAULT_SETTINGS
}

// ============================================================================
// Rule settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleSettings {
    pub add_empty_line_between_elements: SpacingSettings,
    pub format_multi_line_jsx: JsxSettings,
    pub expand_single_line_jsx: ExpandSettings,
    pub add_empty_lines_in_block_jsx: ContainerSettings,
    pub format_yaml_frontmatter: FrontmatterSettings,
    pub format_html_blocks_in_mdx: HtmlSettings,
    pub normalize_lists: ListSettings,
    pub normalize_text: TextSettings,
    pub preserve_admonitions: Toggle,
    pub auto_detect_indent: AutoDetectSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Toggle {
    pub enabled: bool,
}

impl Default for Toggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpacingSettings {
    pub enabled: bool,
}

impl Default for SpacingSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsxSettings {
    pub enabled: bool,
    pub indent_size: usize,
    pub use_tabs: bool,
    /// Component names that are never reformatted.
    pub ignore_components: Vec<String>,
}

impl Default for JsxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            indent_size: 2,
            use_tabs: false,
            ignore_components: vec!["CodeBlock".to_string()],
        }
    }
}

impl JsxSettings {
    /// One level of indentation for attribute lines.
    pub fn indent_unit(&self) -> String {
        if self.use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(self.indent_size)
        }
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore_components.iter().any(|c| c == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExpandSettings {
    pub enabled: bool,
    /// Minimum attribute count before a single-line tag is expanded.
    pub props_threshold: usize,
}

impl Default for ExpandSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            props_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerSettings {
    pub enabled: bool,
    /// Containers that get a blank line after the opening and before the closing tag.
    pub block_components: Vec<String>,
    /// Sibling tags that are always separated by a blank line.
    pub sibling_components: Vec<String>,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            block_components: ["Outro", "InfoBox", "LayoutDivideItem", "Column"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sibling_components: vec!["LayoutDivideItem".to_string()],
        }
    }
}

impl ContainerSettings {
    pub fn is_block(&self, name: &str) -> bool {
        self.block_components.iter().any(|c| c == name)
    }

    pub fn is_sibling(&self, name: &str) -> bool {
        self.sibling_components.iter().any(|c| c == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrontmatterSettings {
    pub enabled: bool,
    pub indent: usize,
    pub line_width: usize,
}

impl Default for FrontmatterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            indent: 2,
            line_width: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HtmlFormatterConfig {
    pub tab_width: usize,
    pub use_tabs: bool,
}

impl Default for HtmlFormatterConfig {
    fn default() -> Self {
        Self {
            tab_width: 2,
            use_tabs: false,
        }
    }
}

impl HtmlFormatterConfig {
    pub fn indent_unit(&self) -> String {
        if self.use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(self.tab_width)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HtmlSettings {
    pub enabled: bool,
    pub formatter_config: HtmlFormatterConfig,
    /// Elements returned verbatim by the HTML sub-formatter.
    pub preserve_tags: Vec<String>,
}

impl Default for HtmlSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            formatter_config: HtmlFormatterConfig::default(),
            preserve_tags: vec!["details".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListSettings {
    pub enabled: bool,
    pub bullet: char,
    /// Re-indent nested items to the content column of their parent.
    pub fix_indentation: bool,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bullet: '-',
            fix_indentation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextSettings {
    pub enabled: bool,
    pub japanese_sentence_breaks: bool,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            japanese_sentence_breaks: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoDetectSettings {
    pub enabled: bool,
    pub min_confidence: f64,
    pub fallback_indent_size: usize,
    pub fallback_indent_type: IndentUnit,
}

impl Default for AutoDetectSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.7,
            fallback_indent_size: 2,
            fallback_indent_type: IndentUnit::Space,
        }
    }
}

impl AutoDetectSettings {
    pub fn fallback_profile(&self) -> IndentProfile {
        let size = match self.fallback_indent_type {
            IndentUnit::Tab => 1,
            IndentUnit::Space => self.fallback_indent_size.max(1),
        };
        IndentProfile {
            unit: self.fallback_indent_type,
            size,
            confidence: 1.0,
        }
    }
}

// ============================================================================
// Loading and session adaptation
// ============================================================================

impl RuleSettings {
    /// Parse settings from TOML. Missing tables and keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load `.mdx-fmt.toml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Pick the indent profile for this session and write it into every
    /// indentation-sensitive rule.
    ///
    /// With detection disabled the configured indentation is kept as is.
    /// Otherwise the detected profile wins when its confidence reaches the
    /// configured minimum.
    pub fn adopt_indent(&mut self, detected: &IndentProfile) -> IndentProfile {
        let auto = &self.auto_detect_indent;
        if !auto.enabled {
            return self.configured_profile();
        }
        let profile = if detected.confidence >= auto.min_confidence {
            detected.clone()
        } else {
            auto.fallback_profile()
        };

        let use_tabs = profile.unit == IndentUnit::Tab;
        self.format_multi_line_jsx.use_tabs = use_tabs;
        self.format_html_blocks_in_mdx.formatter_config.use_tabs = use_tabs;
        if !use_tabs {
            self.format_multi_line_jsx.indent_size = profile.size;
            self.format_html_blocks_in_mdx.formatter_config.tab_width = profile.size;
            self.format_yaml_frontmatter.indent = profile.size;
        }
        profile
    }

    fn configured_profile(&self) -> IndentProfile {
        let jsx = &self.format_multi_line_jsx;
        let (unit, size) = if jsx.use_tabs {
            (IndentUnit::Tab, 1)
        } else {
            (IndentUnit::Space, jsx.indent_size)
        };
        IndentProfile {
            unit,
            size,
            confidence: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RuleSettings::default();
        assert_eq!(settings.format_multi_line_jsx.indent_size, 2);
        assert_eq!(settings.expand_single_line_jsx.props_threshold, 2);
        assert!(settings.format_multi_line_jsx.is_ignored("CodeBlock"));
        assert!(settings.add_empty_lines_in_block_jsx.is_block("InfoBox"));
        assert!(!settings.add_empty_lines_in_block_jsx.is_block("LayoutDivide"));
        assert!(!settings.normalize_lists.fix_indentation);
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[formatMultiLineJsx]
indentSize = 4
ignoreComponents = ["CodeBlock", "Raw"]

[expandSingleLineJsx]
enabled = false
"#;
        let settings = RuleSettings::from_toml_str(toml).unwrap();
        assert_eq!(settings.format_multi_line_jsx.indent_size, 4);
        assert!(settings.format_multi_line_jsx.is_ignored("Raw"));
        assert!(!settings.expand_single_line_jsx.enabled);
        // untouched tables keep defaults
        assert_eq!(settings.format_yaml_frontmatter.line_width, 100);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(RuleSettings::from_toml_str("formatMultiLineJsx = 3").is_err());
    }

    #[test]
    fn test_adopt_confident_profile() {
        let mut settings = RuleSettings::default();
        let detected = IndentProfile {
            unit: IndentUnit::Space,
            size: 4,
            confidence: 0.9,
        };
        let adopted = settings.adopt_indent(&detected);
        assert_eq!(adopted.size, 4);
        assert_eq!(settings.format_multi_line_jsx.indent_unit(), "    ");
        assert_eq!(settings.format_yaml_frontmatter.indent, 4);
    }

    #[test]
    fn test_adopt_falls_back_on_low_confidence() {
        let mut settings = RuleSettings::default();
        let detected = IndentProfile {
            unit: IndentUnit::Space,
            size: 4,
            confidence: 0.3,
        };
        let adopted = settings.adopt_indent(&detected);
        assert_eq!(adopted.size, 2);
        assert_eq!(settings.format_multi_line_jsx.indent_unit(), "  ");
    }

    #[test]
    fn test_adopt_disabled_keeps_configured_indent() {
        let toml = "[autoDetectIndent]\nenabled = false\n\n[formatMultiLineJsx]\nindentSize = 4\n";
        let mut settings = RuleSettings::from_toml_str(toml).unwrap();
        let adopted = settings.adopt_indent(&IndentProfile {
            unit: IndentUnit::Space,
            size: 2,
            confidence: 1.0,
        });
        assert_eq!(adopted.size, 4);
        assert_eq!(settings.format_multi_line_jsx.indent_unit(), "    ");
        assert_eq!(settings.format_yaml_frontmatter.indent, 2);
        assert_eq!(settings.format_html_blocks_in_mdx.formatter_config.tab_width, 2);
    }

    #[test]
    fn test_adopt_does_not_touch_defaults() {
        let mut session = default_settings().clone();
        session.adopt_indent(&IndentProfile {
            unit: IndentUnit::Tab,
            size: 1,
            confidence: 1.0,
        });
        assert!(session.format_multi_line_jsx.use_tabs);
        assert!(!default_settings().format_multi_line_jsx.use_tabs);
    }
}
