//! Parsing for fusion source
//!
//! Folds classified lines into the canonical [`Program`] representation:
//! the block assembler reconstructs multi-line guest-language constructs
//! from the line-tagged stream, and the directive processor validates
//! `#name "value"` configuration entries.

mod assembler;
mod directive;
mod program;

pub use assembler::BlockAssembler;
pub use directive::{DirectiveProcessor, DirectiveWarning, KNOWN_DIRECTIVES};
pub use program::{CodeBlock, Directive, LanguageTag, Program, ProgramStats};
