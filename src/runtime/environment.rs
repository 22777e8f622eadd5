use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::runtime::Value;

/// The shared global environment for one run.
///
/// Created empty at run start, exclusively owned by the dispatcher, and
/// mutated only through the native executor; every other executor sees
/// an immutable [`EnvSnapshot`]. Destroyed when the run ends.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEnvironment {
    /// Global variables
    variables: HashMap<String, Value>,
    /// Global function table (holds `Value::Function` entries)
    functions: HashMap<String, Value>,
}

impl ExecutionEnvironment {
    /// Creates an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines or overwrites a global variable
    pub fn define(&mut self, name: String, value: Value) {
        self.variables.insert(name, value);
    }

    /// Gets a variable by name
    pub fn get(&self, name: &str) -> Result<Value> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UndefinedVariable {
                name: name.to_string(),
            })
    }

    /// Checks for a variable without cloning
    pub fn exists(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Registers a function in the callable table
    pub fn define_function(&mut self, name: String, func: Value) {
        self.functions.insert(name, func);
    }

    /// Looks up a function by name
    pub fn get_function(&self, name: &str) -> Option<Value> {
        self.functions.get(name).cloned()
    }

    /// Number of defined variables
    pub fn var_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of defined functions
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Produces the read-only, data-only snapshot handed to non-native
    /// executors. Functions and module objects never cross the boundary.
    pub fn snapshot(&self) -> EnvSnapshot {
        let values = self
            .variables
            .iter()
            .filter(|(_, v)| v.is_data())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        EnvSnapshot { values }
    }
}

/// Immutable, ordered snapshot of the environment's data values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvSnapshot {
    values: BTreeMap<String, Value>,
}

impl EnvSnapshot {
    /// Looks up a value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Iterates entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the snapshot carries no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
