//! Execution dispatcher
//!
//! Owns the shared environment for the duration of one run and walks
//! the program's blocks in source order. Native failures are fatal:
//! the native language is the only writer of the environment, so a
//! failed native block poisons everything after it. Guest-language
//! failures and timeouts are recorded per block and the run continues.

use std::time::{Duration, Instant};

use crate::compiler::Artifact;
use crate::error::{Error, ErrorSeverity, Result};
use crate::exec::{ExecutionStatus, ExecutorRegistry, DEFAULT_TIMEOUT};
use crate::parser::{LanguageTag, Program};
use crate::runtime::format::resolve_placeholders;
use crate::runtime::{ExecutionEnvironment, NativeModule, Value};
use crate::security::{scan, SecurityLevel};

/// Outcome of one block, in program order
#[derive(Debug, Clone)]
pub struct BlockOutcome {
    /// Block index in the program
    pub index: usize,
    /// Language of the block
    pub tag: LanguageTag,
    /// First fusion-source line of the block
    pub line: usize,
    /// How the block finished
    pub status: ExecutionStatus,
    /// Output the block contributed
    pub stdout: String,
}

/// A non-fatal problem recorded during a run
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Fusion-source line the diagnostic refers to
    pub line: usize,
    /// Description
    pub message: String,
}

/// Result of one complete run
#[derive(Debug)]
pub struct ExecutionResult {
    /// Per-block outcomes in execution order
    pub outcomes: Vec<BlockOutcome>,
    /// Concatenated output of all blocks
    pub output: String,
    /// Warnings and per-block failures
    pub diagnostics: Vec<Diagnostic>,
    /// Variables defined when the run ended
    pub var_count: usize,
    /// Functions defined when the run ended
    pub function_count: usize,
    /// Wall-clock run time in seconds
    pub elapsed: f64,
}

/// Runs compiled programs block by block
pub struct Dispatcher {
    registry: ExecutorRegistry,
    timeout: Duration,
}

impl Dispatcher {
    /// A dispatcher with the default executor set and timeout
    pub fn new() -> Self {
        Dispatcher {
            registry: ExecutorRegistry::with_defaults(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A dispatcher with a custom registry and per-block timeout
    pub fn with_registry(registry: ExecutorRegistry, timeout: Duration) -> Self {
        Dispatcher { registry, timeout }
    }

    /// Scans the artifact's program and runs it if nothing blocks.
    ///
    /// A blocked scan is a fatal [`Error::SecurityViolation`]; no block
    /// executes.
    pub fn run(&self, artifact: &Artifact, level: SecurityLevel) -> Result<ExecutionResult> {
        let report = scan(&artifact.program, level);
        if let Some(violation) = report.to_violation() {
            return Err(violation);
        }
        self.run_unchecked(&artifact.program)
    }

    /// Runs a program without a security scan
    pub fn run_unchecked(&self, program: &Program) -> Result<ExecutionResult> {
        let start = Instant::now();
        let mut env = ExecutionEnvironment::new();
        let mut outcomes = Vec::new();
        let mut output = String::new();
        let mut diagnostics = Vec::new();

        self.load_native_imports(program, &mut env, &mut diagnostics);

        for (index, block) in program.blocks.iter().enumerate() {
            let Some(executor) = self.registry.get(block.tag) else {
                diagnostics.push(Diagnostic {
                    line: block.line,
                    message: format!("no executor registered for {}", block.tag),
                });
                continue;
            };

            // Guest blocks get placeholders resolved first; the native
            // language reads the environment directly.
            let code = if block.tag.is_native() {
                block.content.clone()
            } else {
                match resolve_placeholders(&block.content, &env) {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        let err = Error::execution(block.tag, block.line, e.to_string());
                        diagnostics.push(Diagnostic {
                            line: block.line,
                            message: err.to_string(),
                        });
                        outcomes.push(BlockOutcome {
                            index,
                            tag: block.tag,
                            line: block.line,
                            status: ExecutionStatus::Failed,
                            stdout: String::new(),
                        });
                        continue;
                    }
                }
            };

            match executor.execute(&code, &mut env, self.timeout) {
                Ok(outcome) => {
                    if outcome.status == ExecutionStatus::Stubbed {
                        diagnostics.push(Diagnostic {
                            line: block.line,
                            message: format!(
                                "{} toolchain unavailable; block rendered as stub",
                                block.tag
                            ),
                        });
                    }
                    if outcome.status == ExecutionStatus::Failed && !outcome.stderr.is_empty() {
                        diagnostics.push(Diagnostic {
                            line: block.line,
                            message: format!("{} block failed: {}", block.tag, outcome.stderr.trim()),
                        });
                    }
                    output.push_str(&outcome.stdout);
                    outcomes.push(BlockOutcome {
                        index,
                        tag: block.tag,
                        line: block.line,
                        status: outcome.status,
                        stdout: outcome.stdout,
                    });
                }
                Err(e) => {
                    let err = match e {
                        already @ Error::Execution { .. } => already,
                        other => Error::execution(block.tag, block.line, other.to_string()),
                    };
                    // Severity decides whether the rest of the run
                    // happens: a failed native block poisons the shared
                    // environment.
                    if err.classify() == ErrorSeverity::Fatal {
                        return Err(err);
                    }
                    diagnostics.push(Diagnostic {
                        line: block.line,
                        message: err.to_string(),
                    });
                    outcomes.push(BlockOutcome {
                        index,
                        tag: block.tag,
                        line: block.line,
                        status: ExecutionStatus::Failed,
                        stdout: String::new(),
                    });
                }
            }
        }

        tracing::debug!(
            blocks = outcomes.len(),
            diagnostics = diagnostics.len(),
            "run finished"
        );

        Ok(ExecutionResult {
            outcomes,
            output,
            diagnostics,
            var_count: env.var_count(),
            function_count: env.function_count(),
            elapsed: start.elapsed().as_secs_f64(),
        })
    }

    /// Loads `native_import` directives into the environment.
    ///
    /// Deduplicated; failures are warnings, not errors.
    fn load_native_imports(
        &self,
        program: &Program,
        env: &mut ExecutionEnvironment,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let mut seen = Vec::new();
        for directive in program
            .directives
            .get("native_import")
            .map(|d| d.as_slice())
            .unwrap_or_default()
        {
            let name = directive.value.clone();
            if seen.contains(&name) {
                continue;
            }
            seen.push(name.clone());

            match NativeModule::parse(&name) {
                Some(module) => {
                    env.define(name, Value::Module(module));
                }
                None => {
                    tracing::warn!(module = %name, "native import failed");
                    diagnostics.push(Diagnostic {
                        line: directive.line,
                        message: format!("failed to import module '{}'", name),
                    });
                }
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::compiler::Compiler;
    use crate::exec::{ExecutionOutcome, LanguageExecutor, NativeExecutor};

    fn compile(source: &str) -> Artifact {
        Compiler::default().compile(source, "t.lf").unwrap().artifact
    }

    /// Executor for a host with no toolchain: always stubs, like
    /// [`SubprocessExecutor`] when its probe fails.
    struct OfflineExecutor(LanguageTag);

    impl LanguageExecutor for OfflineExecutor {
        fn tag(&self) -> LanguageTag {
            self.0
        }

        fn available(&self) -> bool {
            false
        }

        fn execute(
            &self,
            code: &str,
            _env: &mut ExecutionEnvironment,
            _timeout: Duration,
        ) -> Result<ExecutionOutcome> {
            Ok(ExecutionOutcome::stubbed(format!("{}\n", code.trim_end())))
        }
    }

    #[test]
    fn test_native_blocks_share_environment() {
        let artifact = compile("py.x = 10\npy.y = x * 2\npy.print(y)");
        let result = Dispatcher::new().run_unchecked(&artifact.program).unwrap();
        assert_eq!(result.output, "20\n");
        assert_eq!(result.var_count, 2);
    }

    #[test]
    fn test_native_error_is_fatal() {
        let artifact = compile("py.x = 1\npy.boom()\npy.y = 2");
        let err = Dispatcher::new()
            .run_unchecked(&artifact.program)
            .unwrap_err();
        assert!(matches!(err, Error::Execution { line: 2, .. }));
    }

    #[test]
    fn test_security_gating_blocks_run() {
        let artifact = compile("py.import subprocess");
        let err = Dispatcher::new()
            .run(&artifact, SecurityLevel::Medium)
            .unwrap_err();
        assert!(matches!(err, Error::SecurityViolation { .. }));
    }

    #[test]
    fn test_low_level_reports_but_runs() {
        let artifact = compile("py.x = 1");
        let result = Dispatcher::new().run(&artifact, SecurityLevel::Low).unwrap();
        assert_eq!(result.outcomes.len(), 1);
    }

    #[test]
    fn test_native_import_directive() {
        let artifact = compile("#native_import \"math\"\npy.r = math.sqrt(4)\npy.print(r)");
        let result = Dispatcher::new().run_unchecked(&artifact.program).unwrap();
        assert_eq!(result.output, "2.0\n");
    }

    #[test]
    fn test_unknown_native_import_is_warning() {
        let artifact = compile("#native_import \"numpy\"\npy.x = 1");
        let result = Dispatcher::new().run_unchecked(&artifact.program).unwrap();
        assert_eq!(result.outcomes.len(), 1);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("numpy")));
    }

    #[test]
    fn test_missing_toolchain_stubs_and_continues() {
        let mut registry = ExecutorRegistry::new();
        registry.register(Arc::new(NativeExecutor::new()));
        registry.register(Arc::new(OfflineExecutor(LanguageTag::Cpp)));
        let dispatcher = Dispatcher::with_registry(registry, DEFAULT_TIMEOUT);

        let artifact = compile("py.x = 10\ncpp.printf(\"x is %d\", x);\npy.print(x)");
        let result = dispatcher.run_unchecked(&artifact.program).unwrap();

        // Placeholders were resolved before the stub rendering.
        assert_eq!(result.outcomes[1].status, ExecutionStatus::Stubbed);
        assert!(result.outcomes[1].stdout.contains("x is 10"));
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.line == 2 && d.message.contains("stub")));
        // The run continued past the stubbed block.
        assert!(result.output.ends_with("10\n"));
    }

    #[test]
    fn test_placeholder_failure_is_per_block() {
        // `missing` is never defined; the cpp block fails but the later
        // native block still runs.
        let artifact = compile("cpp.printf(\"%d\", missing);\npy.x = 1\npy.print(x)");
        let result = Dispatcher::new().run_unchecked(&artifact.program).unwrap();
        assert_eq!(result.outcomes[0].status, ExecutionStatus::Failed);
        assert!(result.output.contains("1\n"));
    }
}
