//! # Fusion source compiler
//!
//! Compiles `.lf` fusion source into the persisted LSF artifact:
//!
//! ```text
//! Source text → Lines → (Directives, Blocks) → Program → Artifact
//! ```
//!
//! The artifact is the unit consumed by both the security scanner and
//! the execution dispatcher; it round-trips through JSON and is keyed by
//! a normalized source hash so identical sources compiled on different
//! platforms hash identically.

mod artifact;
mod cache;
mod package;

pub use artifact::{Artifact, ArtifactMetadata, FORMAT_VERSION};
pub use cache::ArtifactCache;
pub use package::{load_package, package, PackageManifest, PACKAGE_FORMAT_VERSION};

use std::time::Instant;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::lexer::{LineKind, LineScanner};
use crate::parser::{BlockAssembler, DirectiveProcessor, DirectiveWarning, Program, ProgramStats};
use crate::security::SecurityLevel;

/// Identifier recorded in artifact metadata
pub const COMPILER_ID: &str = "fuselang-compiler-v3";

/// Number of hex characters kept from the SHA-256 digest
const HASH_LEN: usize = 16;

/// Compilation options
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Security level recorded in the artifact
    pub security_level: SecurityLevel,
    /// Optimization level recorded in the artifact (metadata only)
    pub optimization_level: u8,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            security_level: SecurityLevel::Medium,
            optimization_level: 2,
        }
    }
}

/// A successful compilation: the artifact plus non-fatal diagnostics
#[derive(Debug, Clone)]
pub struct Compilation {
    /// The compiled artifact
    pub artifact: Artifact,
    /// Directive warnings collected during parsing
    pub warnings: Vec<DirectiveWarning>,
}

/// Fusion source compiler
#[derive(Debug, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Creates a compiler with the given options
    pub fn new(options: CompileOptions) -> Self {
        Compiler { options }
    }

    /// Compiles fusion source into an artifact.
    ///
    /// `source_name` is recorded in artifact metadata; it is typically
    /// the `.lf` file name.
    pub fn compile(&self, source: &str, source_name: &str) -> Result<Compilation> {
        let start = Instant::now();

        let lines = LineScanner::new(source).scan_lines()?;

        let mut directives = DirectiveProcessor::new();
        for line in &lines {
            if let LineKind::Directive { name, value } = &line.kind {
                directives.process(name, value, line.number)?;
            }
        }
        let directive_count = directives.count();
        let (directives, warnings) = directives.finish();

        let blocks = BlockAssembler::assemble(&lines);

        let stats = ProgramStats {
            total_lines: lines.len(),
            directive_count,
            code_block_count: blocks.len(),
        };

        let program = Program {
            directives,
            blocks,
            source_hash: source_digest(source),
            parse_time: start.elapsed().as_secs_f64(),
            stats,
        };

        let artifact = Artifact::new(
            program,
            ArtifactMetadata::now(
                source_name,
                self.options.security_level,
                self.options.optimization_level,
            ),
        );

        Ok(Compilation { artifact, warnings })
    }
}

/// Computes the truncated SHA-256 digest of the normalized source.
///
/// Normalization makes the hash stable across platforms: line endings
/// become `\n` and trailing whitespace is trimmed per line.
pub fn source_digest(source: &str) -> String {
    let normalized: String = source
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..HASH_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LanguageTag;

    #[test]
    fn test_compile_directives_and_blocks() {
        let source = "#name \"Demo\"\n#native_import \"math\"\npy.x = 1\ncpp.printf(\"hi\");";
        let compilation = Compiler::default().compile(source, "demo.lf").unwrap();
        let program = &compilation.artifact.program;

        assert_eq!(program.directive_values("name"), vec!["Demo"]);
        assert_eq!(program.blocks.len(), 2);
        assert_eq!(program.blocks[0].tag, LanguageTag::Py);
        assert_eq!(program.blocks[1].tag, LanguageTag::Cpp);
        assert_eq!(program.stats.directive_count, 2);
        assert_eq!(program.stats.code_block_count, 2);
    }

    #[test]
    fn test_hash_ignores_line_endings_and_trailing_ws() {
        let a = source_digest("py.x = 1\npy.y = 2\n");
        let b = source_digest("py.x = 1  \r\npy.y = 2\r\n");
        assert_eq!(a, b);
        assert_eq!(a.len(), HASH_LEN);
    }

    #[test]
    fn test_hash_differs_on_content_change() {
        assert_ne!(source_digest("py.x = 1"), source_digest("py.x = 2"));
    }

    #[test]
    fn test_unknown_tag_aborts_compilation() {
        let err = Compiler::default()
            .compile("ruby.puts 1", "bad.lf")
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::UnknownLanguage { .. }));
    }
}
