use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::program::Directive;
use crate::error::{Error, Result};

/// Directive names the compiler understands. Anything else is collected
/// as a warning for forward compatibility, never rejected.
pub const KNOWN_DIRECTIVES: &[&str] = &["name", "version", "author", "description", "native_import"];

lazy_static! {
    static ref MODULE_NAME: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_.]*$").unwrap();
}

/// A non-fatal directive diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveWarning {
    /// Source line of the directive
    pub line: usize,
    /// Directive name
    pub name: String,
    /// Human-readable explanation
    pub message: String,
}

/// Accumulates directives in declaration order, validating names and
/// `native_import` values
#[derive(Debug, Default)]
pub struct DirectiveProcessor {
    directives: BTreeMap<String, Vec<Directive>>,
    warnings: Vec<DirectiveWarning>,
    count: usize,
}

impl DirectiveProcessor {
    /// Creates an empty processor
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one directive. Unknown names warn; invalid module names
    /// in `native_import` fail.
    pub fn process(&mut self, name: &str, value: &str, line: usize) -> Result<()> {
        if !KNOWN_DIRECTIVES.contains(&name) {
            self.warnings.push(DirectiveWarning {
                line,
                name: name.to_string(),
                message: format!("unknown directive '#{}' ignored", name),
            });
        }

        if name == "native_import" && !MODULE_NAME.is_match(value) {
            return Err(Error::SyntaxError {
                line,
                message: format!("invalid module name '{}' in #native_import", value),
            });
        }

        // Repeats are retained in declaration order; deduplication happens
        // only when imports are loaded at run start.
        self.directives.entry(name.to_string()).or_default().push(Directive {
            line,
            name: name.to_string(),
            value: value.to_string(),
        });
        self.count += 1;
        Ok(())
    }

    /// Total directives recorded, duplicates included
    pub fn count(&self) -> usize {
        self.count
    }

    /// Consumes the processor, yielding the grouped directives and any
    /// warnings
    pub fn finish(self) -> (BTreeMap<String, Vec<Directive>>, Vec<DirectiveWarning>) {
        (self.directives, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_directive() {
        let mut proc = DirectiveProcessor::new();
        proc.process("name", "Demo", 1).unwrap();
        let (map, warnings) = proc.finish();
        assert_eq!(map["name"][0].value, "Demo");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_directive_warns_but_keeps() {
        let mut proc = DirectiveProcessor::new();
        proc.process("licence", "MIT", 3).unwrap();
        let (map, warnings) = proc.finish();
        assert_eq!(map["licence"].len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 3);
    }

    #[test]
    fn test_repeated_imports_preserved_in_order() {
        let mut proc = DirectiveProcessor::new();
        proc.process("native_import", "math", 1).unwrap();
        proc.process("native_import", "random", 2).unwrap();
        proc.process("native_import", "math", 3).unwrap();
        let (map, _) = proc.finish();
        let values: Vec<_> = map["native_import"].iter().map(|d| d.value.as_str()).collect();
        assert_eq!(values, vec!["math", "random", "math"]);
    }

    #[test]
    fn test_invalid_module_name() {
        let mut proc = DirectiveProcessor::new();
        let err = proc.process("native_import", "../etc/passwd", 4).unwrap_err();
        assert!(matches!(err, Error::SyntaxError { line: 4, .. }));
    }
}
