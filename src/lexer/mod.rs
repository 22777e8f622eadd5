//! Lexical analysis for fusion source
//!
//! Classifies raw source text into a stream of tagged lines. The fusion
//! format is line-oriented: every physical line is a directive, a tagged
//! code fragment, a comment, or blank. Guest-language grammar is never
//! consulted here; reassembling multi-line constructs is the block
//! assembler's job.

mod line_scanner;
mod token;

pub use line_scanner::LineScanner;
pub use token::{Line, LineKind};
