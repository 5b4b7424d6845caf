//! Selective formatter for MDX and Markdown documents.
//!
//! Formatting parses the document once, lets each enabled rule propose
//! position-addressed edits against the original lines, and applies them
//! in a single pass. Code fences are never touched and the result is
//! idempotent.
//!
//! ```no_run
//! use mdx_fmt::{format, FormatOptions};
//!
//! let formatted = format("# Title\nText", &FormatOptions::default());
//! assert_eq!(formatted, "# Title\n\nText\n");
//! ```

pub mod batch;
pub mod document;
pub mod edits;
pub mod error;
pub mod formatter;
pub mod html;
pub mod indent;
pub mod normalize;
pub mod rules;
pub mod settings;
pub mod syntax;
pub mod validate;

pub use error::{FormatError, ParseError, Result};
pub use formatter::{
    check_file, detect_mdx, format, format_file, format_source, try_format, FormatOptions,
};
pub use indent::IndentProfile;
pub use settings::RuleSettings;
