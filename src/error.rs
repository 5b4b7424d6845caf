use thiserror::Error;

/// Failures of the structural parser.
///
/// Lines are zero-based indices into the normalized document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unterminated tag <{name}> starting on line {line}")]
    UnterminatedTag { name: String, line: usize },

    #[error("unterminated attribute quote in <{name}> on line {line}")]
    UnterminatedQuote { name: String, line: usize },

    #[error("unclosed component tag <{name}> opened on line {line}")]
    UnclosedTag { name: String, line: usize },

    #[error("unexpected closing tag </{name}> on line {line}")]
    UnexpectedClosingTag { name: String, line: usize },

    #[error("unexpected closing slash `/>` on line {line}")]
    StrayClosingSlash { line: usize },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnterminatedTag { line, .. }
            | ParseError::UnterminatedQuote { line, .. }
            | ParseError::UnclosedTag { line, .. }
            | ParseError::UnexpectedClosingTag { line, .. }
            | ParseError::StrayClosingSlash { line } => *line,
        }
    }
}

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid MDX: {0}")]
    Validation(String),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("Task error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, FormatError>;
