//! Marshalling environment snapshots into guest-language preludes
//!
//! Each adapter renders the shared variables as declarations prepended
//! to a generated scratch program. The contracts differ per target and
//! are deliberate:
//!
//! - C++ and Java: scalars and (for C++) flat numeric lists; entries the
//!   target cannot express are skipped.
//! - JavaScript and PHP: every data value is expressible; a non-finite
//!   float is a [`Error::Marshal`] rather than a stringified `NaN`.
//! - Rust: scalars only; collections are skipped.
//!
//! Snapshots are data-only by construction, so functions and module
//! objects never reach an adapter.

use std::fmt::Write;

use crate::error::{Error, Result};
use crate::parser::LanguageTag;
use crate::runtime::{EnvSnapshot, Value};

/// Renders the declaration prelude for one target language
pub fn marshal(target: LanguageTag, snapshot: &EnvSnapshot) -> Result<String> {
    if target.is_native() {
        // Native blocks read the environment directly.
        return Err(Error::runtime("native blocks are not marshalled"));
    }

    let mut out = String::new();
    for (name, value) in snapshot.iter() {
        let decl = match target {
            LanguageTag::Cpp => cpp_decl(name, value),
            LanguageTag::Js => Some(js_decl(name, value)?),
            LanguageTag::Java => java_decl(name, value),
            LanguageTag::Php => Some(php_decl(name, value)?),
            LanguageTag::Rust => rust_decl(name, value),
            LanguageTag::Py => unreachable!(),
        };
        if let Some(decl) = decl {
            let _ = writeln!(out, "{}", decl);
        }
    }
    Ok(out)
}

fn cpp_decl(name: &str, value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(format!("bool {} = {};", name, b)),
        Value::Int(n) => Some(format!("int {} = {};", name, n)),
        Value::Float(x) if x.is_finite() => Some(format!("double {} = {};", name, float_repr(*x))),
        Value::Str(s) => Some(format!("string {} = \"{}\";", name, escape(s))),
        Value::Array(items) if items.iter().all(|v| matches!(v, Value::Int(_))) => {
            let elements: Vec<String> = items.iter().map(|v| v.to_string()).collect();
            Some(format!("vector<int> {} = {{{}}};", name, elements.join(", ")))
        }
        Value::Array(items)
            if !items.is_empty() && items.iter().all(|v| v.as_float().is_ok()) =>
        {
            let elements: Vec<String> = items
                .iter()
                .map(|v| float_repr(v.as_float().unwrap_or(0.0)))
                .collect();
            Some(format!(
                "vector<double> {} = {{{}}};",
                name,
                elements.join(", ")
            ))
        }
        // Dicts, nested lists, null: no C++ shape.
        _ => None,
    }
}

fn js_decl(name: &str, value: &Value) -> Result<String> {
    let json = value.to_json().ok_or_else(|| Error::Marshal {
        name: name.to_string(),
        type_name: value.type_name().to_string(),
        target: LanguageTag::Js,
    })?;
    Ok(format!("const {} = {};", name, json))
}

fn java_decl(name: &str, value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(format!("boolean {} = {};", name, b)),
        Value::Int(n) => Some(format!("int {} = {};", name, n)),
        Value::Float(x) if x.is_finite() => Some(format!("double {} = {};", name, float_repr(*x))),
        Value::Str(s) => Some(format!("String {} = \"{}\";", name, escape(s))),
        _ => None,
    }
}

fn php_decl(name: &str, value: &Value) -> Result<String> {
    Ok(format!("${} = {};", name, php_literal(name, value)?))
}

fn php_literal(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Float(x) if x.is_finite() => Ok(float_repr(*x)),
        Value::Str(s) => Ok(format!("\"{}\"", escape(s))),
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(|v| php_literal(name, v))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("array({})", parts.join(", ")))
        }
        Value::Object(fields) => {
            let mut keys: Vec<_> = fields.keys().collect();
            keys.sort();
            let parts = keys
                .iter()
                .map(|k| Ok(format!("\"{}\" => {}", escape(k), php_literal(name, &fields[k.as_str()])?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("array({})", parts.join(", ")))
        }
        other => Err(Error::Marshal {
            name: name.to_string(),
            type_name: other.type_name().to_string(),
            target: LanguageTag::Php,
        }),
    }
}

fn rust_decl(name: &str, value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(format!("let {} = {};", name, b)),
        Value::Int(n) => Some(format!("let {}: i64 = {};", name, n)),
        Value::Float(x) if x.is_finite() => {
            Some(format!("let {}: f64 = {};", name, float_repr(*x)))
        }
        Value::Str(s) => Some(format!("let {} = \"{}\";", name, escape(s))),
        _ => None,
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Float rendering that keeps the value readable as a float literal
fn float_repr(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        x.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ExecutionEnvironment;

    fn snapshot_with(values: &[(&str, Value)]) -> EnvSnapshot {
        let mut env = ExecutionEnvironment::new();
        for (name, value) in values {
            env.define(name.to_string(), value.clone());
        }
        env.snapshot()
    }

    #[test]
    fn test_cpp_scalars() {
        let snap = snapshot_with(&[
            ("count", Value::Int(3)),
            ("name", Value::Str("world".into())),
            ("ratio", Value::Float(1.5)),
        ]);
        let prelude = marshal(LanguageTag::Cpp, &snap).unwrap();
        assert!(prelude.contains("int count = 3;"));
        assert!(prelude.contains("string name = \"world\";"));
        assert!(prelude.contains("double ratio = 1.5;"));
    }

    #[test]
    fn test_cpp_skips_dicts() {
        let snap = snapshot_with(&[
            ("d", Value::object(Default::default())),
            ("x", Value::Int(1)),
        ]);
        let prelude = marshal(LanguageTag::Cpp, &snap).unwrap();
        assert!(!prelude.contains('d'));
        assert!(prelude.contains("int x = 1;"));
    }

    #[test]
    fn test_cpp_int_list_is_vector() {
        let snap = snapshot_with(&[("xs", Value::array(vec![Value::Int(1), Value::Int(2)]))]);
        let prelude = marshal(LanguageTag::Cpp, &snap).unwrap();
        assert_eq!(prelude.trim(), "vector<int> xs = {1, 2};");
    }

    #[test]
    fn test_js_uses_json() {
        let snap = snapshot_with(&[(
            "cfg",
            Value::object(
                [("key".to_string(), Value::Str("v".into()))]
                    .into_iter()
                    .collect(),
            ),
        )]);
        let prelude = marshal(LanguageTag::Js, &snap).unwrap();
        assert_eq!(prelude.trim(), r#"const cfg = {"key":"v"};"#);
    }

    #[test]
    fn test_js_non_finite_float_fails() {
        let snap = snapshot_with(&[("x", Value::Float(f64::NAN))]);
        let err = marshal(LanguageTag::Js, &snap).unwrap_err();
        assert!(matches!(err, Error::Marshal { .. }));
    }

    #[test]
    fn test_java_string_escaping() {
        let snap = snapshot_with(&[("msg", Value::Str("say \"hi\"".into()))]);
        let prelude = marshal(LanguageTag::Java, &snap).unwrap();
        assert!(prelude.contains(r#"String msg = "say \"hi\"";"#));
    }

    #[test]
    fn test_php_collections() {
        let snap = snapshot_with(&[("xs", Value::array(vec![Value::Int(1), Value::Str("a".into())]))]);
        let prelude = marshal(LanguageTag::Php, &snap).unwrap();
        assert_eq!(prelude.trim(), "$xs = array(1, \"a\");");
    }

    #[test]
    fn test_rust_scalars_only() {
        let snap = snapshot_with(&[
            ("n", Value::Int(7)),
            ("xs", Value::array(vec![Value::Int(1)])),
        ]);
        let prelude = marshal(LanguageTag::Rust, &snap).unwrap();
        assert!(prelude.contains("let n: i64 = 7;"));
        assert!(!prelude.contains("xs"));
    }

    #[test]
    fn test_native_target_rejected() {
        let snap = snapshot_with(&[]);
        assert!(marshal(LanguageTag::Py, &snap).is_err());
    }
}
