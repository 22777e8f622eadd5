//! Shared runtime: values, the execution environment, marshalling, the
//! printf sub-protocol, and the dispatcher that ties them together.

mod dispatcher;
mod environment;
pub mod format;
mod marshal;
pub mod value;

pub use dispatcher::{BlockOutcome, Diagnostic, Dispatcher, ExecutionResult};
pub use environment::{EnvSnapshot, ExecutionEnvironment};
pub use marshal::marshal;
pub use value::{NativeModule, Value};
