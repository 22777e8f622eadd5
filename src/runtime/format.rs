//! Printf-style placeholder resolution
//!
//! Before a non-native block runs (or is stubbed), placeholders inside
//! its printf-style calls are resolved against the current environment:
//! `printf("x is %d", x)` becomes `printf("x is 10")`. Placeholders are
//! replaced left to right, one per argument; arguments are evaluated as
//! native expressions, so `len(xs)` and arithmetic work.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Result;
use crate::native;
use crate::runtime::{ExecutionEnvironment, Value};

lazy_static! {
    /// The placeholder forms the protocol recognizes
    static ref PLACEHOLDER: Regex =
        Regex::new(r"%[0-9.]*[sdfFgGeExXoOc]").expect("invalid placeholder pattern");
}

/// Call heads whose string arguments take placeholders
const FORMAT_CALLS: &[&str] = &["printf", "console.log", "System.out.printf"];

/// Resolves the format arguments of one call: the leading quoted format
/// string plus the comma-separated parameter expressions.
pub fn render_format_args(inner: &str, env: &ExecutionEnvironment) -> Result<String> {
    let inner = inner.trim();
    let Some(rest) = inner.strip_prefix('"') else {
        return Ok(inner.to_string());
    };
    let Some(end) = rest.find('"') else {
        return Ok(inner.to_string());
    };

    let format_str = &rest[..end];
    let params_str = rest[end + 1..].trim_start();

    let Some(params_str) = params_str.strip_prefix(',') else {
        return Ok(unescape(format_str));
    };

    let mut result = unescape(format_str);
    for param in split_params(params_str) {
        let value = evaluate_param(&param, env)?;
        let Some(m) = PLACEHOLDER.find(&result) else {
            break;
        };
        let rendered = format_value(m.as_str(), &value);
        result.replace_range(m.range(), &rendered);
    }
    Ok(result)
}

/// Rewrites every recognized format call in a block so its argument
/// list collapses to the single resolved string literal.
pub fn resolve_placeholders(code: &str, env: &ExecutionEnvironment) -> Result<String> {
    let mut result = String::new();
    let mut rest = code;

    loop {
        let earliest = FORMAT_CALLS
            .iter()
            .filter_map(|head| rest.find(&format!("{}(", head)).map(|pos| (pos, *head)))
            .min_by_key(|(pos, _)| *pos);
        let Some((pos, head)) = earliest else {
            result.push_str(rest);
            break;
        };
        let open = pos + head.len();
        let Some(close) = matching_paren(rest, open) else {
            result.push_str(rest);
            break;
        };

        let inner = &rest[open + 1..close];
        if PLACEHOLDER.is_match(inner) {
            let resolved = render_format_args(inner, env)?;
            result.push_str(&rest[..open + 1]);
            result.push('"');
            result.push_str(&escape(&resolved));
            result.push('"');
        } else {
            result.push_str(&rest[..close]);
        }
        rest = &rest[close..];
    }

    Ok(result)
}

/// Finds the index of the `)` matching the `(` at `open`
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string: Option<u8> = None;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        match in_string {
            Some(quote) => {
                if b == quote && (i == 0 || bytes[i - 1] != b'\\') {
                    in_string = None;
                }
            }
            None => match b {
                b'"' | b'\'' => in_string = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Splits a parameter list on top-level commas, respecting nesting and
/// string literals.
pub fn split_params(params: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;

    for c in params.chars() {
        match in_string {
            Some(quote) => {
                if c == quote {
                    in_string = None;
                }
            }
            None => match c {
                '"' | '\'' => in_string = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                ',' if depth == 0 => {
                    result.push(current.trim().to_string());
                    current.clear();
                    continue;
                }
                _ => {}
            },
        }
        current.push(c);
    }

    if !current.trim().is_empty() {
        result.push(current.trim().to_string());
    }
    result
}

/// Evaluates one parameter expression against the environment.
///
/// Fast paths mirror the protocol: bare variable, quoted literal,
/// numeric literal. Everything else is parsed and evaluated as a
/// native expression.
fn evaluate_param(expr: &str, env: &ExecutionEnvironment) -> Result<Value> {
    let expr = expr.trim();

    if let Ok(value) = env.get(expr) {
        return Ok(value);
    }

    if expr.len() >= 2 {
        let bytes = expr.as_bytes();
        let quoted = (bytes[0] == b'"' && bytes[expr.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[expr.len() - 1] == b'\'');
        if quoted {
            return Ok(Value::Str(expr[1..expr.len() - 1].to_string()));
        }
    }

    if let Ok(n) = expr.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    if let Ok(x) = expr.parse::<f64>() {
        return Ok(Value::Float(x));
    }

    native::eval_expression(expr, env)
}

/// Renders a value for one placeholder
fn format_value(spec: &str, value: &Value) -> String {
    let conversion = spec.chars().last().unwrap_or('s');
    match conversion {
        'd' => match value {
            Value::Int(n) => n.to_string(),
            Value::Float(x) => (*x as i64).to_string(),
            Value::Bool(b) => (*b as i64).to_string(),
            other => other.to_string(),
        },
        'f' | 'F' => {
            let x = match value {
                Value::Int(n) => *n as f64,
                Value::Float(x) => *x,
                other => return other.to_string(),
            };
            match precision(spec) {
                Some(p) => format!("{:.*}", p, x),
                None => format!("{:.6}", x),
            }
        }
        'x' => match value {
            Value::Int(n) => format!("{:x}", n),
            other => other.to_string(),
        },
        'X' => match value {
            Value::Int(n) => format!("{:X}", n),
            other => other.to_string(),
        },
        'o' | 'O' => match value {
            Value::Int(n) => format!("{:o}", n),
            other => other.to_string(),
        },
        'e' => match value.as_float() {
            Ok(x) => format!("{:e}", x),
            Err(_) => value.to_string(),
        },
        'E' => match value.as_float() {
            Ok(x) => format!("{:E}", x),
            Err(_) => value.to_string(),
        },
        _ => value.to_string(),
    }
}

fn precision(spec: &str) -> Option<usize> {
    let dot = spec.find('.')?;
    spec[dot + 1..spec.len() - 1].parse().ok()
}

fn unescape(s: &str) -> String {
    s.replace("\\n", "\n").replace("\\t", "\t").replace("\\\"", "\"")
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn env_with(values: &[(&str, Value)]) -> ExecutionEnvironment {
        let mut env = ExecutionEnvironment::new();
        for (name, value) in values {
            env.define(name.to_string(), value.clone());
        }
        env
    }

    #[test]
    fn test_render_simple_substitution() {
        let env = env_with(&[("x", Value::Int(10))]);
        let out = render_format_args(r#""x is %d\n", x"#, &env).unwrap();
        assert_eq!(out, "x is 10\n");
    }

    #[test]
    fn test_render_multiple_placeholders() {
        let env = env_with(&[("a", Value::Int(1)), ("b", Value::Str("two".into()))]);
        let out = render_format_args(r#""%d and %s", a, b"#, &env).unwrap();
        assert_eq!(out, "1 and two");
    }

    #[test]
    fn test_render_precision() {
        let env = env_with(&[("pi", Value::Float(3.14159))]);
        let out = render_format_args(r#""%.2f", pi"#, &env).unwrap();
        assert_eq!(out, "3.14");
    }

    #[test]
    fn test_render_len_expression() {
        let env = env_with(&[("xs", Value::array(vec![Value::Int(1), Value::Int(2)]))]);
        let out = render_format_args(r#""n=%d", len(xs)"#, &env).unwrap();
        assert_eq!(out, "n=2");
    }

    #[test]
    fn test_render_arithmetic_expression() {
        let env = env_with(&[("x", Value::Int(4))]);
        let out = render_format_args(r#""%d", x * 2 + 1"#, &env).unwrap();
        assert_eq!(out, "9");
    }

    #[test]
    fn test_render_without_params_returns_format() {
        let env = env_with(&[]);
        let out = render_format_args(r#""plain text\n""#, &env).unwrap();
        assert_eq!(out, "plain text\n");
    }

    #[test]
    fn test_unknown_name_is_error() {
        let env = env_with(&[]);
        let err = render_format_args(r#""%d", missing"#, &env).unwrap_err();
        assert!(matches!(err, Error::UndefinedVariable { .. }));
    }

    #[test]
    fn test_split_params_nested() {
        assert_eq!(
            split_params("a, f(b, c), [d, e]"),
            vec!["a", "f(b, c)", "[d, e]"]
        );
    }

    #[test]
    fn test_split_params_strings_with_commas() {
        assert_eq!(split_params(r#""a,b", c"#), vec![r#""a,b""#, "c"]);
    }

    #[test]
    fn test_resolve_placeholders_rewrites_call() {
        let env = env_with(&[("x", Value::Int(10))]);
        let code = r#"printf("x is %d\n", x);"#;
        let resolved = resolve_placeholders(code, &env).unwrap();
        assert_eq!(resolved, "printf(\"x is 10\\n\");");
    }

    #[test]
    fn test_resolve_placeholders_console_log() {
        let env = env_with(&[("msg", Value::Str("Hi".into()))]);
        let code = r#"console.log("%s", msg);"#;
        let resolved = resolve_placeholders(code, &env).unwrap();
        assert!(resolved.contains("\"Hi\""));
    }

    #[test]
    fn test_resolve_leaves_plain_calls_alone() {
        let env = env_with(&[]);
        let code = r#"printf("no placeholders");"#;
        assert_eq!(resolve_placeholders(code, &env).unwrap(), code);
    }

    #[test]
    fn test_hex_conversion() {
        let env = env_with(&[("n", Value::Int(255))]);
        let out = render_format_args(r#""%x", n"#, &env).unwrap();
        assert_eq!(out, "ff");
    }
}
