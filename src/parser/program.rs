use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed set of recognized language tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageTag {
    /// Python-like native language, executed in-process
    Py,
    /// C++ via g++
    Cpp,
    /// JavaScript via Node.js
    Js,
    /// Java via javac/java
    Java,
    /// PHP via the php interpreter
    Php,
    /// Rust via rustc
    Rust,
}

impl LanguageTag {
    /// Parses a tag string, returning `None` for unrecognized tags
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "py" => Some(LanguageTag::Py),
            "cpp" => Some(LanguageTag::Cpp),
            "js" => Some(LanguageTag::Js),
            "java" => Some(LanguageTag::Java),
            "php" => Some(LanguageTag::Php),
            "rust" => Some(LanguageTag::Rust),
            _ => None,
        }
    }

    /// The tag as it appears in source
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageTag::Py => "py",
            LanguageTag::Cpp => "cpp",
            LanguageTag::Js => "js",
            LanguageTag::Java => "java",
            LanguageTag::Php => "php",
            LanguageTag::Rust => "rust",
        }
    }

    /// True for the one language with first-class access to the shared
    /// environment
    pub fn is_native(&self) -> bool {
        matches!(self, LanguageTag::Py)
    }

    /// File extension used when extracting per-language sources into a
    /// package
    pub fn file_ext(&self) -> &'static str {
        match self {
            LanguageTag::Py => "py",
            LanguageTag::Cpp => "cpp",
            LanguageTag::Js => "js",
            LanguageTag::Java => "java",
            LanguageTag::Php => "php",
            LanguageTag::Rust => "rs",
        }
    }

    /// All recognized tags, in dispatch-frequency order
    pub fn all() -> [LanguageTag; 6] {
        [
            LanguageTag::Py,
            LanguageTag::Cpp,
            LanguageTag::Js,
            LanguageTag::Java,
            LanguageTag::Php,
            LanguageTag::Rust,
        ]
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `#name "value"` configuration entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    /// Source line (1-indexed)
    pub line: usize,
    /// Directive name without the leading `#`
    pub name: String,
    /// Unquoted value
    pub value: String,
}

/// A logical code block assembled from one or more tagged lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// First physical source line of the block (1-indexed)
    pub line: usize,
    /// Language the block belongs to
    #[serde(rename = "type")]
    pub tag: LanguageTag,
    /// Logical content: fragments joined by `\n` with the tag prefix
    /// stripped and indentation preserved relative to the first line
    pub content: String,
    /// Original `(line, post-tag text)` fragments, in source order
    #[serde(default)]
    pub raw_fragments: Vec<(usize, String)>,
}

/// Source statistics recorded alongside the parsed program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgramStats {
    /// Physical lines in the source
    pub total_lines: usize,
    /// Directive count (duplicates included)
    pub directive_count: usize,
    /// Assembled code block count
    pub code_block_count: usize,
}

/// The canonical parsed representation of a fusion source file
///
/// `blocks` order is preserved from source and is authoritative for
/// execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Directives grouped by name; declaration order and duplicates are
    /// preserved within each group
    pub directives: BTreeMap<String, Vec<Directive>>,
    /// Code blocks in source order
    #[serde(rename = "code_blocks")]
    pub blocks: Vec<CodeBlock>,
    /// Truncated SHA-256 digest of the normalized source
    pub source_hash: String,
    /// Wall-clock seconds spent parsing
    pub parse_time: f64,
    /// Source statistics
    pub stats: ProgramStats,
}

impl Program {
    /// All directives with the given name, in declaration order
    pub fn directive_values(&self, name: &str) -> Vec<&str> {
        self.directives
            .get(name)
            .map(|ds| ds.iter().map(|d| d.value.as_str()).collect())
            .unwrap_or_default()
    }

    /// Field-for-field equality ignoring `parse_time`, for round-trip
    /// checks
    pub fn same_content(&self, other: &Program) -> bool {
        self.directives == other.directives
            && self.blocks == other.blocks
            && self.source_hash == other.source_hash
            && self.stats == other.stats
    }
}
