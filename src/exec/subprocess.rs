//! Subprocess executors for guest languages
//!
//! Each execution generates a scratch program in a temporary directory:
//! the marshalled environment snapshot as a declaration prelude, then
//! the (already placeholder-resolved) block content inside the target
//! language's entry-point boilerplate. The toolchain is probed at run
//! time; when absent, the executor renders the resolved block text as a
//! stub instead of failing.
//!
//! Children are waited on with a polling deadline: `try_wait` in a
//! short-sleep loop, `kill` once the deadline passes. Stdout and stderr
//! are drained on reader threads started before the wait, so a child
//! whose output exceeds the OS pipe buffer never blocks.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::exec::{ExecutionOutcome, ExecutionStatus, LanguageExecutor, COMPILE_TIMEOUT};
use crate::parser::LanguageTag;
use crate::runtime::{marshal, EnvSnapshot, ExecutionEnvironment};

/// Poll interval while waiting on a child
const WAIT_POLL: Duration = Duration::from_millis(5);

/// Executes one guest language by spawning its toolchain
pub struct SubprocessExecutor {
    tag: LanguageTag,
}

impl SubprocessExecutor {
    /// Creates an executor for one guest language.
    ///
    /// Panics if given the native tag; the native language has its own
    /// in-process executor.
    pub fn new(tag: LanguageTag) -> Self {
        assert!(!tag.is_native(), "native blocks run in-process");
        SubprocessExecutor { tag }
    }

    /// The commands this language needs on `PATH`
    fn toolchain(&self) -> &'static [&'static str] {
        match self.tag {
            LanguageTag::Cpp => &["g++"],
            LanguageTag::Js => &["node"],
            LanguageTag::Java => &["javac", "java"],
            LanguageTag::Php => &["php"],
            LanguageTag::Rust => &["rustc"],
            LanguageTag::Py => &[],
        }
    }

    /// Renders the complete scratch program for this language
    fn generate_program(&self, code: &str, snapshot: &EnvSnapshot) -> Result<String> {
        let prelude = marshal(self.tag, snapshot)?;
        let code = code.trim();

        Ok(match self.tag {
            LanguageTag::Cpp => format!(
                "#include <iostream>\n#include <string>\n#include <vector>\n\
                 #include <map>\n#include <cmath>\n#include <cstdio>\n\n\
                 using namespace std;\n\n{}\nint main() {{\n{}\n    return 0;\n}}\n",
                prelude,
                indent(code, 4),
            ),
            LanguageTag::Js => format!("{}\n{}\n", prelude, code),
            LanguageTag::Java => format!(
                "public class Scratch {{\n    public static void main(String[] args) {{\n{}{}\n    }}\n}}\n",
                indent(&prelude, 8),
                indent(code, 8),
            ),
            LanguageTag::Php => format!("<?php\n{}\n{}\n?>\n", prelude, code),
            LanguageTag::Rust => format!(
                "fn main() {{\n{}{}\n}}\n",
                indent(&prelude, 4),
                indent(code, 4),
            ),
            LanguageTag::Py => unreachable!("native blocks run in-process"),
        })
    }

    fn run_scratch(&self, program: &str, timeout: Duration) -> Result<ExecutionOutcome> {
        let dir = tempfile::tempdir()
            .map_err(|e| Error::runtime(format!("scratch dir creation failed: {}", e)))?;

        let source = dir.path().join(match self.tag {
            LanguageTag::Cpp => "scratch.cpp",
            LanguageTag::Js => "scratch.js",
            LanguageTag::Java => "Scratch.java",
            LanguageTag::Php => "scratch.php",
            LanguageTag::Rust => "scratch.rs",
            LanguageTag::Py => unreachable!(),
        });
        std::fs::write(&source, program)
            .map_err(|e| Error::runtime(format!("scratch write failed: {}", e)))?;

        let binary = dir.path().join("scratch.bin");

        // Compile step, where the language has one.
        let compile = match self.tag {
            LanguageTag::Cpp => {
                let mut cmd = Command::new("g++");
                cmd.arg(&source).arg("-o").arg(&binary).args(["-std=c++11", "-O2"]);
                Some(cmd)
            }
            LanguageTag::Java => {
                let mut cmd = Command::new("javac");
                cmd.arg(&source);
                Some(cmd)
            }
            LanguageTag::Rust => {
                let mut cmd = Command::new("rustc");
                cmd.arg(&source).arg("-o").arg(&binary);
                Some(cmd)
            }
            _ => None,
        };

        if let Some(mut cmd) = compile {
            let compiled = run_command(&mut cmd, COMPILE_TIMEOUT)?;
            if compiled.status != ExecutionStatus::Completed {
                return Ok(ExecutionOutcome {
                    stdout: String::new(),
                    stderr: compiled.stderr,
                    status: ExecutionStatus::Failed,
                });
            }
        }

        let mut run = match self.tag {
            LanguageTag::Cpp | LanguageTag::Rust => Command::new(&binary),
            LanguageTag::Js => {
                let mut cmd = Command::new("node");
                cmd.arg(&source);
                cmd
            }
            LanguageTag::Java => {
                let mut cmd = Command::new("java");
                cmd.arg("-cp").arg(dir.path()).arg("Scratch");
                cmd
            }
            LanguageTag::Php => {
                let mut cmd = Command::new("php");
                cmd.arg(&source);
                cmd
            }
            LanguageTag::Py => unreachable!(),
        };

        run_command(&mut run, timeout)
    }
}

impl LanguageExecutor for SubprocessExecutor {
    fn tag(&self) -> LanguageTag {
        self.tag
    }

    fn available(&self) -> bool {
        self.toolchain().iter().all(|tool| probe(tool))
    }

    fn execute(
        &self,
        code: &str,
        env: &mut ExecutionEnvironment,
        timeout: Duration,
    ) -> Result<ExecutionOutcome> {
        let snapshot = env.snapshot();

        if !self.available() {
            tracing::warn!(
                language = %self.tag,
                "toolchain unavailable, rendering stub output"
            );
            return Ok(ExecutionOutcome::stubbed(format!("{}\n", code.trim_end())));
        }

        let program = self.generate_program(code, &snapshot)?;
        self.run_scratch(&program, timeout)
    }
}

/// Checks whether a command exists and responds to `--version`
fn probe(tool: &str) -> bool {
    Command::new(tool)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Runs a command to completion under a wall-clock deadline
fn run_command(cmd: &mut Command, timeout: Duration) -> Result<ExecutionOutcome> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::runtime(format!("spawn failed: {}", e)))?;

    // Readers must start before the wait; a kill on deadline closes the
    // pipes and lets them finish.
    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let waited = wait_with_deadline(&mut child, timeout);
    let stdout = collect(stdout_reader);
    let stderr = collect(stderr_reader);
    let status = waited?;

    Ok(ExecutionOutcome {
        stdout,
        stderr,
        status: if status.success() {
            ExecutionStatus::Completed
        } else {
            ExecutionStatus::Failed
        },
    })
}

/// Reads a pipe to the end on its own thread
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<String>>) -> String {
    reader.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Polls `try_wait` until the child exits or the deadline passes; kills
/// on deadline.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|e| Error::runtime(format!("wait failed: {}", e)))?
        {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Timeout(timeout));
        }
        std::thread::sleep(WAIT_POLL);
    }
}

fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}
