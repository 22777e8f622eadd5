use serde::{Deserialize, Serialize};

use crate::parser::LanguageTag;

/// A single classified line from fusion source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Physical line number (1-indexed)
    pub number: usize,
    /// What kind of line this is
    pub kind: LineKind,
}

impl Line {
    /// Creates a new classified line
    pub fn new(number: usize, kind: LineKind) -> Self {
        Line { number, kind }
    }
}

/// Classification of a physical source line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LineKind {
    /// Directive line: `#name "value"`
    Directive {
        /// Directive name (without the leading `#`)
        name: String,
        /// Unquoted directive value
        value: String,
    },

    /// Tagged code line: `<tag>.<code>`
    Code {
        /// Recognized language tag
        tag: LanguageTag,
        /// Column of the tag (count of leading whitespace characters)
        indent: usize,
        /// Code text after the `tag.` prefix, untrimmed
        text: String,
    },

    /// Comment line (`//...` or part of a `/* ... */` span), discarded
    /// before block assembly
    Comment,

    /// Blank or whitespace-only line
    Blank,
}
