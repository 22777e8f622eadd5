//! # Fuselang - A Multi-Language Fusion Runtime
//!
//! Fuselang compiles and executes `.lf` fusion source: a single file
//! interleaving tagged blocks of several languages (`py.`, `cpp.`,
//! `js.`, `java.`, `php.`, `rust.`) that share one global namespace.
//! Variables defined in native blocks flow into every later block,
//! whatever language it is written in.
//!
//! ## Quick Start
//!
//! ```rust
//! use fuselang::{Compiler, Dispatcher, SecurityLevel};
//!
//! # fn main() -> fuselang::Result<()> {
//! let source = r#"#name "Hello"
//! py.message = "Hi"
//! py.print(message)
//! "#;
//!
//! let compilation = Compiler::default().compile(source, "hello.lf")?;
//! let result = Dispatcher::new().run(&compilation.artifact, SecurityLevel::Medium)?;
//!
//! assert_eq!(result.output, "Hi\n");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Source → LineScanner → Lines → BlockAssembler → Program → Artifact
//!                                                     │
//!                                      SecurityScanner┤
//!                                                     │
//!                                            Dispatcher → Executors → Output
//! ```
//!
//! ### Main Components
//!
//! - [`Compiler`] - Parses fusion source into a persisted [`Artifact`]
//! - [`security::scan`] - Pure denylist + structural scan of a program
//! - [`Dispatcher`] - Runs blocks in source order over the shared
//!   environment
//! - [`Value`] / [`ExecutionEnvironment`] - The runtime value model and
//!   the single-writer global namespace
//! - [`ExecutorRegistry`] - Language tag → executor; the native language
//!   runs in-process, everything else as a subprocess with a stub
//!   fallback when the toolchain is absent
//!
//! ## Artifacts and Packages
//!
//! Compiled programs round-trip through JSON (`.lsf`) and can be bundled
//! into a zip package with per-language extracted sources and a
//! manifest:
//!
//! ```rust
//! use fuselang::{package, load_package, Compiler};
//!
//! # fn main() -> fuselang::Result<()> {
//! let artifact = Compiler::default()
//!     .compile("py.x = 1", "pkg.lf")?
//!     .artifact;
//!
//! let bytes = package(&artifact)?;
//! let (restored, manifest) = load_package(&bytes)?;
//!
//! assert!(restored.program.same_content(&artifact.program));
//! assert_eq!(manifest.metadata.source_hash, artifact.program.source_hash);
//! # Ok(())
//! # }
//! ```
//!
//! ## Security
//!
//! Every run is gated by the scanner unless explicitly bypassed:
//!
//! ```rust
//! use fuselang::{Compiler, Error, Dispatcher, SecurityLevel};
//!
//! let compilation = Compiler::default()
//!     .compile("py.import subprocess", "bad.lf")
//!     .unwrap();
//!
//! match Dispatcher::new().run(&compilation.artifact, SecurityLevel::Medium) {
//!     Err(Error::SecurityViolation { .. }) => {}
//!     other => panic!("expected a security violation, got {other:?}"),
//! }
//! ```

/// Version of the Fuselang runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod analysis;
pub mod compiler;
pub mod error;
pub mod exec;
pub mod lexer;
pub mod native;
pub mod parser;
pub mod runtime;
pub mod security;

// Re-export main types
pub use analysis::{analyze, SourceAnalysis};
pub use compiler::{
    load_package, package, source_digest, Artifact, ArtifactCache, Compilation, CompileOptions,
    Compiler, PackageManifest,
};
pub use error::{Error, ErrorSeverity, Result};
pub use exec::{ExecutionOutcome, ExecutionStatus, ExecutorRegistry, LanguageExecutor};
pub use parser::{CodeBlock, Directive, LanguageTag, Program, ProgramStats};
pub use runtime::{
    Dispatcher, EnvSnapshot, ExecutionEnvironment, ExecutionResult, NativeModule, Value,
};
pub use security::{scan, Finding, SecurityLevel, SecurityReport, Severity, Verdict};
