//! Source structure analysis
//!
//! Line-level statistics over fusion source, computed from the lexer's
//! classification rather than raw prefix matching so comment state and
//! directive syntax are handled the same way compilation handles them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lexer::{LineKind, LineScanner};
use crate::parser::LanguageTag;

/// Structure statistics for one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAnalysis {
    /// Total physical lines
    pub total_lines: usize,
    /// Directive lines
    pub directive_count: usize,
    /// Comment lines (including block-comment interiors)
    pub comment_count: usize,
    /// Blank lines
    pub blank_count: usize,
    /// Tagged code lines per language
    pub code_lines: BTreeMap<LanguageTag, usize>,
}

impl SourceAnalysis {
    /// Total tagged code lines across all languages
    pub fn code_line_count(&self) -> usize {
        self.code_lines.values().sum()
    }
}

/// Analyzes fusion source without compiling it
pub fn analyze(source: &str) -> Result<SourceAnalysis> {
    let lines = LineScanner::new(source).scan_lines()?;

    let mut analysis = SourceAnalysis {
        total_lines: lines.len(),
        directive_count: 0,
        comment_count: 0,
        blank_count: 0,
        code_lines: BTreeMap::new(),
    };

    for line in &lines {
        match &line.kind {
            LineKind::Directive { .. } => analysis.directive_count += 1,
            LineKind::Comment => analysis.comment_count += 1,
            LineKind::Blank => analysis.blank_count += 1,
            LineKind::Code { tag, .. } => {
                *analysis.code_lines.entry(*tag).or_insert(0) += 1;
            }
        }
    }

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let source = "#name \"Demo\"\n// comment\n\npy.x = 1\npy.y = 2\ncpp.printf(\"hi\");";
        let analysis = analyze(source).unwrap();

        assert_eq!(analysis.total_lines, 6);
        assert_eq!(analysis.directive_count, 1);
        assert_eq!(analysis.comment_count, 1);
        assert_eq!(analysis.blank_count, 1);
        assert_eq!(analysis.code_lines[&LanguageTag::Py], 2);
        assert_eq!(analysis.code_lines[&LanguageTag::Cpp], 1);
        assert_eq!(analysis.code_line_count(), 3);
    }

    #[test]
    fn test_block_comment_lines_counted_as_comments() {
        let analysis = analyze("/* a\nb\nc */\npy.x = 1").unwrap();
        assert_eq!(analysis.comment_count, 3);
        assert_eq!(analysis.code_line_count(), 1);
    }

    #[test]
    fn test_invalid_source_is_error() {
        assert!(analyze("ruby.puts 1").is_err());
    }
}
