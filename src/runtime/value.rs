use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Runtime value representation shared across the language boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    // Primitives
    /// Null value (`None` in native syntax)
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer value
    Int(i64),
    /// 64-bit floating-point value
    Float(f64),
    /// String value
    Str(String),

    // Collections (Arc'd: snapshots clone freely)
    /// Sequence of values
    Array(Arc<Vec<Value>>),
    /// Mapping with string keys
    Object(Arc<HashMap<String, Value>>),

    // Native-only values; excluded from environment snapshots and
    // rejected by every marshalling adapter
    /// User-defined native function
    Function {
        /// Function name
        name: String,
        /// Parameter names
        params: Vec<String>,
        /// Function body
        body: Arc<Vec<crate::native::Stmt>>,
        /// Source line of the `def` inside its block
        line: usize,
    },
    /// Imported native module object
    Module(NativeModule),
}

/// The whitelisted modules the native language may import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeModule {
    /// Mathematical constants and functions
    Math,
    /// Pseudo-random numbers
    Random,
    /// Date and time formatting
    Datetime,
    /// Epoch clock
    Time,
}

impl NativeModule {
    /// Resolves a module name against the whitelist
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "math" => Some(NativeModule::Math),
            "random" => Some(NativeModule::Random),
            "datetime" => Some(NativeModule::Datetime),
            "time" => Some(NativeModule::Time),
            _ => None,
        }
    }

    /// Module name as imported
    pub fn name(&self) -> &'static str {
        match self {
            NativeModule::Math => "math",
            NativeModule::Random => "random",
            NativeModule::Datetime => "datetime",
            NativeModule::Time => "time",
        }
    }
}

impl Value {
    /// Creates an array value
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Arc::new(values))
    }

    /// Creates an object value
    pub fn object(fields: HashMap<String, Value>) -> Self {
        Value::Object(Arc::new(fields))
    }

    /// Human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Array(_) => "list",
            Value::Object(_) => "dict",
            Value::Function { .. } => "function",
            Value::Module(_) => "module",
        }
    }

    /// Truthiness following the native language's rules
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            Value::Function { .. } | Value::Module(_) => true,
        }
    }

    /// True for values a snapshot may carry across the language boundary
    pub fn is_data(&self) -> bool {
        !matches!(self, Value::Function { .. } | Value::Module(_))
    }

    /// Numeric coercion to float
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Int(n) => Ok(*n as f64),
            Value::Float(f) => Ok(*f),
            other => Err(Error::TypeError {
                expected: "number".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    /// Integer extraction
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(Error::TypeError {
                expected: "int".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    /// Converts a data value to JSON for JS-style marshalling. Returns
    /// `None` for native-only values.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Int(n) => Some(serde_json::Value::from(*n)),
            Value::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number),
            Value::Str(s) => Some(serde_json::Value::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|v| v.to_json())
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array),
            Value::Object(fields) => {
                let mut map = serde_json::Map::new();
                for (k, v) in fields.iter() {
                    map.insert(k.clone(), v.to_json()?);
                }
                Some(serde_json::Value::Object(map))
            }
            Value::Function { .. } | Value::Module(_) => None,
        }
    }

    /// Source-like representation, used for `%s` substitution and
    /// nested collection display
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.repr()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Object(fields) => {
                // Sorted for stable display; HashMap order is arbitrary.
                let mut keys: Vec<_> = fields.keys().collect();
                keys.sort();
                let parts: Vec<String> = keys
                    .iter()
                    .map(|k| format!("'{}': {}", k, fields[k.as_str()].repr()))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Function { name, .. } => write!(f, "<function {}>", name),
            Value::Module(m) => write!(f, "<module {}>", m.name()),
        }
    }
}
