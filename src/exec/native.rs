use std::time::Duration;

use crate::error::Result;
use crate::exec::{ExecutionOutcome, LanguageExecutor};
use crate::native::NativeEvaluator;
use crate::parser::LanguageTag;
use crate::runtime::ExecutionEnvironment;

/// In-process executor for the native language.
///
/// Always available; the only executor that writes into the shared
/// environment. The timeout parameter is unused: native blocks run on
/// the dispatcher thread and are bounded by the evaluator's own loop
/// and recursion limits.
#[derive(Debug, Default)]
pub struct NativeExecutor;

impl NativeExecutor {
    /// Creates the native executor
    pub fn new() -> Self {
        NativeExecutor
    }
}

impl LanguageExecutor for NativeExecutor {
    fn tag(&self) -> LanguageTag {
        LanguageTag::Py
    }

    fn available(&self) -> bool {
        true
    }

    fn execute(
        &self,
        code: &str,
        env: &mut ExecutionEnvironment,
        _timeout: Duration,
    ) -> Result<ExecutionOutcome> {
        let mut evaluator = NativeEvaluator::new(env);
        evaluator.run_source(code)?;
        Ok(ExecutionOutcome::completed(
            evaluator.take_output(),
            String::new(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{ExecutionStatus, DEFAULT_TIMEOUT};
    use crate::runtime::Value;

    #[test]
    fn test_executes_and_mutates_env() {
        let executor = NativeExecutor::new();
        let mut env = ExecutionEnvironment::new();
        let outcome = executor
            .execute("x = 2 + 3\nprint(x)", &mut env, DEFAULT_TIMEOUT)
            .unwrap();

        assert_eq!(outcome.status, ExecutionStatus::Completed);
        assert_eq!(outcome.stdout, "5\n");
        assert_eq!(env.get("x").unwrap(), Value::Int(5));
    }

    #[test]
    fn test_error_propagates() {
        let executor = NativeExecutor::new();
        let mut env = ExecutionEnvironment::new();
        assert!(executor
            .execute("boom(", &mut env, DEFAULT_TIMEOUT)
            .is_err());
    }
}
