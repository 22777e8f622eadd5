//! Block executors
//!
//! One executor per language, behind the [`LanguageExecutor`] trait.
//! The native executor runs in-process and is the only writer of the
//! shared environment; every other language runs as a subprocess over a
//! marshalled snapshot. New languages are added by registering an
//! executor, not by editing the dispatcher.

mod native;
mod subprocess;

pub use native::NativeExecutor;
pub use subprocess::SubprocessExecutor;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::parser::LanguageTag;
use crate::runtime::ExecutionEnvironment;

/// Default per-block execution deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline for toolchain compilation steps (rustc and javac are slow)
pub const COMPILE_TIMEOUT: Duration = Duration::from_secs(60);

/// How one block finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Ran to completion
    Completed,
    /// Toolchain absent; the resolved block text was rendered instead
    Stubbed,
    /// Ran but failed (non-zero exit, compile error)
    Failed,
}

/// Result of executing one block
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Completion status
    pub status: ExecutionStatus,
}

impl ExecutionOutcome {
    /// A completed outcome with the given stdout
    pub fn completed(stdout: String, stderr: String) -> Self {
        ExecutionOutcome {
            stdout,
            stderr,
            status: ExecutionStatus::Completed,
        }
    }

    /// A stubbed outcome rendering the resolved block text
    pub fn stubbed(rendered: String) -> Self {
        ExecutionOutcome {
            stdout: rendered,
            stderr: String::new(),
            status: ExecutionStatus::Stubbed,
        }
    }
}

/// Executes blocks of one language
pub trait LanguageExecutor: Send + Sync {
    /// The language this executor handles
    fn tag(&self) -> LanguageTag;

    /// Whether the required toolchain is present. Probed at run time;
    /// never assumed at compile time.
    fn available(&self) -> bool;

    /// Executes one block.
    ///
    /// `code` has already been through placeholder resolution. Only the
    /// native executor mutates `env`; subprocess executors read a
    /// snapshot of it.
    fn execute(
        &self,
        code: &str,
        env: &mut ExecutionEnvironment,
        timeout: Duration,
    ) -> Result<ExecutionOutcome>;
}

/// Registry mapping language tags to executors
pub struct ExecutorRegistry {
    executors: HashMap<LanguageTag, Arc<dyn LanguageExecutor>>,
}

impl ExecutorRegistry {
    /// An empty registry
    pub fn new() -> Self {
        ExecutorRegistry {
            executors: HashMap::new(),
        }
    }

    /// The standard set: native in-process plus one subprocess executor
    /// per guest language.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NativeExecutor::new()));
        for tag in LanguageTag::all() {
            if !tag.is_native() {
                registry.register(Arc::new(SubprocessExecutor::new(tag)));
            }
        }
        registry
    }

    /// Registers an executor under its own tag, replacing any previous
    /// one for that language.
    pub fn register(&mut self, executor: Arc<dyn LanguageExecutor>) {
        self.executors.insert(executor.tag(), executor);
    }

    /// Looks up the executor for a language
    pub fn get(&self, tag: LanguageTag) -> Option<Arc<dyn LanguageExecutor>> {
        self.executors.get(&tag).cloned()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_all_languages() {
        let registry = ExecutorRegistry::with_defaults();
        for tag in LanguageTag::all() {
            assert!(registry.get(tag).is_some(), "missing executor for {}", tag);
        }
    }

    #[test]
    fn test_native_executor_always_available() {
        let registry = ExecutorRegistry::with_defaults();
        let native = registry.get(LanguageTag::Py).unwrap();
        assert!(native.available());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ExecutorRegistry::new();
        registry.register(Arc::new(NativeExecutor::new()));
        registry.register(Arc::new(NativeExecutor::new()));
        assert!(registry.get(LanguageTag::Py).is_some());
    }
}
