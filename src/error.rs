//! Error types for the Fuselang compiler and runtime

use thiserror::Error;

use crate::parser::LanguageTag;

/// Fuselang errors
#[derive(Error, Debug, Clone)]
pub enum Error {
    // Compile-time errors
    /// Syntax error in fusion source
    ///
    /// **Triggered by:** malformed directives (unquoted or unterminated
    /// values), invalid `native_import` module names
    #[error("Syntax error at line {line}: {message}")]
    SyntaxError {
        /// Source line where the error occurred (1-indexed)
        line: usize,
        /// Error description
        message: String,
    },

    /// A code line used a tag outside the recognized language set
    #[error("Unknown language tag '{tag}' at line {line}")]
    UnknownLanguage {
        /// The unrecognized tag text
        tag: String,
        /// Source line where the tag appeared
        line: usize,
    },

    // Scan-time errors
    /// A security finding at or above the configured threshold blocked the run
    #[error("Security violation: {count} finding(s) at or above level {level} (first: {first})")]
    SecurityViolation {
        /// Number of blocking findings
        count: usize,
        /// The configured threshold level
        level: String,
        /// Message of the first blocking finding
        first: String,
    },

    // Run-time errors
    /// Block execution failed
    ///
    /// Fatal when `tag` is the native language; recorded per-block and
    /// skipped otherwise.
    #[error("Execution error in {tag} block at line {line}: {message}")]
    Execution {
        /// Language of the failing block
        tag: LanguageTag,
        /// First source line of the failing block
        line: usize,
        /// Failure description
        message: String,
    },

    /// Reference to a name never defined in the shared environment
    #[error("Undefined variable: {name}")]
    UndefinedVariable {
        /// Variable name
        name: String,
    },

    /// Type mismatch during native evaluation or placeholder resolution
    #[error("Type error: expected {expected}, got {got}")]
    TypeError {
        /// Expected type
        expected: String,
        /// Actual type
        got: String,
    },

    /// A value could not be represented in a target guest language
    #[error("Cannot marshal {type_name} value '{name}' for {target}")]
    Marshal {
        /// Variable name being marshalled
        name: String,
        /// Runtime type of the value
        type_name: String,
        /// Target language
        target: LanguageTag,
    },

    /// A subprocess block exceeded its execution deadline
    #[error("Timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Division by zero in native code
    #[error("Division by zero")]
    DivisionByZero,

    /// Array index out of bounds in native code
    #[error("Index out of bounds: {index} for length {length}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Collection length
        length: usize,
    },

    // Artifact errors
    /// Artifact source hash does not match its content
    #[error("Integrity error: artifact hash {recorded} does not match computed {computed}")]
    Integrity {
        /// Hash recorded in the artifact
        recorded: String,
        /// Hash recomputed from artifact content
        computed: String,
    },

    /// Artifact or package could not be decoded
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// General runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

/// Error severity classification, used by the dispatcher to decide
/// whether the remaining blocks still run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Fatal error: the run stops
    Fatal,
    /// Recoverable error: recorded per-block, execution continues
    Recoverable,
    /// Warning that never prevents execution
    Warning,
}

impl Error {
    /// Create a runtime error with a message
    pub fn runtime(msg: impl Into<String>) -> Self {
        Error::RuntimeError(msg.into())
    }

    /// Create an execution error scoped to a block
    pub fn execution(tag: LanguageTag, line: usize, msg: impl Into<String>) -> Self {
        Error::Execution {
            tag,
            line,
            message: msg.into(),
        }
    }

    /// Classify error severity
    pub fn classify(&self) -> ErrorSeverity {
        match self {
            Error::SyntaxError { .. } => ErrorSeverity::Fatal,
            Error::UnknownLanguage { .. } => ErrorSeverity::Fatal,
            Error::SecurityViolation { .. } => ErrorSeverity::Fatal,
            Error::Integrity { .. } => ErrorSeverity::Fatal,
            Error::Artifact(_) => ErrorSeverity::Fatal,

            // Native blocks own the shared environment, so their failures
            // poison everything downstream.
            Error::Execution { tag, .. } if tag.is_native() => ErrorSeverity::Fatal,
            Error::Execution { .. } => ErrorSeverity::Recoverable,

            Error::Timeout(_) => ErrorSeverity::Recoverable,
            Error::Marshal { .. } => ErrorSeverity::Recoverable,
            Error::UndefinedVariable { .. } => ErrorSeverity::Recoverable,
            Error::TypeError { .. } => ErrorSeverity::Recoverable,
            Error::DivisionByZero => ErrorSeverity::Fatal,
            Error::IndexOutOfBounds { .. } => ErrorSeverity::Fatal,
            Error::RuntimeError(_) => ErrorSeverity::Recoverable,
        }
    }
}

/// Result type for Fuselang operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_execution_errors_are_fatal() {
        let native = Error::execution(LanguageTag::Py, 3, "boom");
        let guest = Error::execution(LanguageTag::Cpp, 3, "boom");
        assert_eq!(native.classify(), ErrorSeverity::Fatal);
        assert_eq!(guest.classify(), ErrorSeverity::Recoverable);
    }

    #[test]
    fn test_timeouts_are_recoverable() {
        let err = Error::Timeout(std::time::Duration::from_secs(10));
        assert_eq!(err.classify(), ErrorSeverity::Recoverable);
    }
}
