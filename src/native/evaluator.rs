//! Tree-walking evaluator for the native language
//!
//! Runs against the shared [`ExecutionEnvironment`]; the native executor
//! is the only writer of that environment, so everything here takes
//! `&mut`. Captured `print` output accumulates in an internal buffer
//! instead of going to the process stdout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::native::ast::{BinOp, BoolOp, CmpOp, Expr, Module, Stmt, Target, UnaryOp};
use crate::native::parser;
use crate::runtime::{ExecutionEnvironment, NativeModule, Value};

/// Maximum user-function call depth
const MAX_CALL_DEPTH: usize = 100;

/// Iteration cap for `while` and `for` loops
const MAX_LOOP_ITERATIONS: usize = 1_000_000;

/// Control-flow signal threaded through statement execution
enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Evaluates native modules against the shared environment
pub struct NativeEvaluator<'a> {
    env: &'a mut ExecutionEnvironment,
    /// Local frames for user-function calls, innermost last
    locals: Vec<HashMap<String, Value>>,
    output: String,
    rng: u64,
}

impl<'a> NativeEvaluator<'a> {
    /// Creates an evaluator writing into the given environment
    pub fn new(env: &'a mut ExecutionEnvironment) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as u64 ^ d.as_secs())
            .unwrap_or(0x9e3779b9)
            | 1;
        NativeEvaluator {
            env,
            locals: Vec::new(),
            output: String::new(),
            rng: seed,
        }
    }

    /// Parses and runs native block content
    pub fn run_source(&mut self, source: &str) -> Result<()> {
        let module = parser::parse(source)?;
        self.run(&module)
    }

    /// Runs a parsed module
    pub fn run(&mut self, module: &Module) -> Result<()> {
        for stmt in &module.body {
            if !matches!(self.exec(stmt)?, Flow::Normal) {
                return Err(Error::runtime("'return', 'break' or 'continue' outside of function or loop"));
            }
        }
        Ok(())
    }

    /// Captured `print` output
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Takes the captured output, leaving the buffer empty
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    // --- statements ---

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
                Ok(Flow::Normal)
            }
            Stmt::Expr { value, .. } => {
                self.eval(value)?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                branches,
                else_body,
            } => {
                for (cond, body) in branches {
                    if self.eval(cond)?.is_truthy() {
                        return self.exec_body(body);
                    }
                }
                self.exec_body(else_body)
            }
            Stmt::While { cond, body } => {
                let mut iterations = 0;
                while self.eval(cond)?.is_truthy() {
                    iterations += 1;
                    if iterations > MAX_LOOP_ITERATIONS {
                        return Err(Error::runtime("loop iteration limit exceeded"));
                    }
                    match self.exec_body(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For { var, iter, body } => {
                let items = self.iterate(iter)?;
                if items.len() > MAX_LOOP_ITERATIONS {
                    return Err(Error::runtime("loop iteration limit exceeded"));
                }
                for item in items {
                    self.bind(var.clone(), item);
                    match self.exec_body(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::FunctionDef {
                name,
                params,
                body,
                line,
            } => {
                let func = Value::Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: Arc::new(body.clone()),
                    line: *line,
                };
                if let Some(frame) = self.locals.last_mut() {
                    frame.insert(name.clone(), func);
                } else {
                    self.env.define_function(name.clone(), func);
                }
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Import {
                module,
                alias,
                line,
            } => {
                let root = module.split('.').next().unwrap_or(module);
                let resolved = NativeModule::parse(root).ok_or_else(|| {
                    Error::execution(
                        crate::parser::LanguageTag::Py,
                        *line,
                        format!("module '{}' is not available", module),
                    )
                })?;
                let name = alias.clone().unwrap_or_else(|| root.to_string());
                self.bind(name, Value::Module(resolved));
                Ok(Flow::Normal)
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Pass => Ok(Flow::Normal),
        }
    }

    fn exec_body(&mut self, body: &[Stmt]) -> Result<Flow> {
        for stmt in body {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn assign(&mut self, target: &Target, value: Value) -> Result<()> {
        match target {
            Target::Name(name) => {
                self.bind(name.clone(), value);
                Ok(())
            }
            Target::Index {
                value: container,
                index,
            } => {
                // Write-back is only possible through a named binding.
                let Expr::Name(name) = container else {
                    return Err(Error::runtime("index assignment target must be a variable"));
                };
                let index = self.eval(index)?;
                let mut current = self.lookup(name)?;
                match (&mut current, &index) {
                    (Value::Array(items), Value::Int(i)) => {
                        let items = Arc::make_mut(items);
                        let idx = normalize_index(*i, items.len())?;
                        items[idx] = value;
                    }
                    (Value::Object(fields), Value::Str(key)) => {
                        Arc::make_mut(fields).insert(key.clone(), value);
                    }
                    (container, index) => {
                        return Err(Error::TypeError {
                            expected: "indexable collection".to_string(),
                            got: format!("{}[{}]", container.type_name(), index.type_name()),
                        })
                    }
                }
                self.bind(name.clone(), current);
                Ok(())
            }
        }
    }

    fn bind(&mut self, name: String, value: Value) {
        if let Some(frame) = self.locals.last_mut() {
            frame.insert(name, value);
        } else if matches!(value, Value::Function { .. }) {
            self.env.define_function(name, value);
        } else {
            self.env.define(name, value);
        }
    }

    fn lookup(&self, name: &str) -> Result<Value> {
        if let Some(frame) = self.locals.last() {
            if let Some(value) = frame.get(name) {
                return Ok(value.clone());
            }
        }
        if let Ok(value) = self.env.get(name) {
            return Ok(value);
        }
        if let Some(func) = self.env.get_function(name) {
            return Ok(func);
        }
        Err(Error::UndefinedVariable {
            name: name.to_string(),
        })
    }

    // --- expressions ---

    /// Evaluates a single expression
    pub fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(x) => Ok(Value::Float(*x)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::None => Ok(Value::Null),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::array(values))
            }
            Expr::Dict(pairs) => {
                let mut fields = HashMap::new();
                for (key, value) in pairs {
                    let key = match self.eval(key)? {
                        Value::Str(s) => s,
                        other => {
                            return Err(Error::TypeError {
                                expected: "str key".to_string(),
                                got: other.type_name().to_string(),
                            })
                        }
                    };
                    fields.insert(key, self.eval(value)?);
                }
                Ok(Value::object(fields))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        Value::Int(n) => Ok(Value::Int(-n)),
                        Value::Float(x) => Ok(Value::Float(-x)),
                        other => Err(Error::TypeError {
                            expected: "number".to_string(),
                            got: other.type_name().to_string(),
                        }),
                    },
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary_op(*op, left, right)
            }
            Expr::BoolOp { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.is_truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Compare { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                compare_op(*op, left, right)
            }
            Expr::Call { func, args } => self.eval_call(func, args),
            Expr::Attribute { value, attr } => {
                let base = self.eval(value)?;
                match base {
                    Value::Module(module) => module_attribute(module, attr),
                    other => Err(Error::runtime(format!(
                        "{} has no attribute '{}'",
                        other.type_name(),
                        attr
                    ))),
                }
            }
            Expr::Index { value, index } => {
                let container = self.eval(value)?;
                let index = self.eval(index)?;
                index_value(&container, &index)
            }
        }
    }

    fn eval_call(&mut self, func: &Expr, args: &[Expr]) -> Result<Value> {
        if let Expr::Attribute { value, attr } = func {
            let args = self.eval_args(args)?;
            let base = self.eval(value)?;
            return match base {
                Value::Module(module) => self.call_module(module, attr, &args),
                other => self.call_method(value, other, attr, args),
            };
        }

        // Name calls resolve user definitions first, then builtins.
        if let Expr::Name(name) = func {
            if let Ok(value) = self.lookup(name) {
                let args = self.eval_args(args)?;
                return self.call_value(value, args);
            }
            let args = self.eval_args(args)?;
            return self.call_builtin(name, args);
        }

        let callee = self.eval(func)?;
        let args = self.eval_args(args)?;
        self.call_value(callee, args)
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>) -> Result<Value> {
        let (name, params, body, line) = match callee {
            Value::Function {
                name,
                params,
                body,
                line,
            } => (name, params, body, line),
            other => {
                return Err(Error::TypeError {
                    expected: "function".to_string(),
                    got: other.type_name().to_string(),
                })
            }
        };

        if args.len() != params.len() {
            return Err(Error::runtime(format!(
                "{}() takes {} argument(s), got {}",
                name,
                params.len(),
                args.len()
            )));
        }
        if self.locals.len() >= MAX_CALL_DEPTH {
            return Err(Error::runtime(format!(
                "maximum call depth exceeded in {}() (line {})",
                name, line
            )));
        }

        let frame: HashMap<String, Value> = params.into_iter().zip(args).collect();
        self.locals.push(frame);
        let result = self.exec_body(&body);
        self.locals.pop();

        match result? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }

    fn call_builtin(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        match name {
            "print" => {
                let parts: Vec<String> = args.iter().map(|v| v.to_string()).collect();
                self.output.push_str(&parts.join(" "));
                self.output.push('\n');
                Ok(Value::Null)
            }
            "len" => {
                let [arg] = one(name, args)?;
                match arg {
                    Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                    Value::Array(items) => Ok(Value::Int(items.len() as i64)),
                    Value::Object(fields) => Ok(Value::Int(fields.len() as i64)),
                    other => Err(Error::TypeError {
                        expected: "sized value".to_string(),
                        got: other.type_name().to_string(),
                    }),
                }
            }
            "str" => {
                let [arg] = one(name, args)?;
                Ok(Value::Str(arg.to_string()))
            }
            "int" => {
                let [arg] = one(name, args)?;
                match arg {
                    Value::Int(n) => Ok(Value::Int(n)),
                    Value::Float(x) => Ok(Value::Int(x.trunc() as i64)),
                    Value::Bool(b) => Ok(Value::Int(b as i64)),
                    Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| {
                        Error::runtime(format!("invalid literal for int(): '{}'", s))
                    }),
                    other => Err(Error::TypeError {
                        expected: "number or str".to_string(),
                        got: other.type_name().to_string(),
                    }),
                }
            }
            "float" => {
                let [arg] = one(name, args)?;
                match arg {
                    Value::Int(n) => Ok(Value::Float(n as f64)),
                    Value::Float(x) => Ok(Value::Float(x)),
                    Value::Str(s) => s.trim().parse().map(Value::Float).map_err(|_| {
                        Error::runtime(format!("invalid literal for float(): '{}'", s))
                    }),
                    other => Err(Error::TypeError {
                        expected: "number or str".to_string(),
                        got: other.type_name().to_string(),
                    }),
                }
            }
            "abs" => {
                let [arg] = one(name, args)?;
                match arg {
                    Value::Int(n) => Ok(Value::Int(n.abs())),
                    Value::Float(x) => Ok(Value::Float(x.abs())),
                    other => Err(Error::TypeError {
                        expected: "number".to_string(),
                        got: other.type_name().to_string(),
                    }),
                }
            }
            "min" | "max" => {
                let items = if args.len() == 1 {
                    match &args[0] {
                        Value::Array(items) => items.as_ref().clone(),
                        other => {
                            return Err(Error::TypeError {
                                expected: "list".to_string(),
                                got: other.type_name().to_string(),
                            })
                        }
                    }
                } else {
                    args
                };
                if items.is_empty() {
                    return Err(Error::runtime(format!("{}() of empty sequence", name)));
                }
                let mut best = items[0].clone();
                for item in &items[1..] {
                    let take = compare_op(CmpOp::Lt, item.clone(), best.clone())?.is_truthy();
                    if take == (name == "min") {
                        best = item.clone();
                    }
                }
                Ok(best)
            }
            "sum" => {
                let [arg] = one(name, args)?;
                let items = match arg {
                    Value::Array(items) => items,
                    other => {
                        return Err(Error::TypeError {
                            expected: "list".to_string(),
                            got: other.type_name().to_string(),
                        })
                    }
                };
                let mut total = Value::Int(0);
                for item in items.iter() {
                    total = binary_op(BinOp::Add, total, item.clone())?;
                }
                Ok(total)
            }
            "range" => {
                let (start, stop, step) = match args.len() {
                    1 => (0, args[0].as_int()?, 1),
                    2 => (args[0].as_int()?, args[1].as_int()?, 1),
                    3 => (args[0].as_int()?, args[1].as_int()?, args[2].as_int()?),
                    n => {
                        return Err(Error::runtime(format!(
                            "range() takes 1 to 3 arguments, got {}",
                            n
                        )))
                    }
                };
                if step == 0 {
                    return Err(Error::runtime("range() step must not be zero"));
                }
                let mut items = Vec::new();
                let mut i = start;
                while (step > 0 && i < stop) || (step < 0 && i > stop) {
                    items.push(Value::Int(i));
                    if items.len() > MAX_LOOP_ITERATIONS {
                        return Err(Error::runtime("range() too large"));
                    }
                    i += step;
                }
                Ok(Value::array(items))
            }
            "sorted" => {
                let [arg] = one(name, args)?;
                let items = match arg {
                    Value::Array(items) => items,
                    other => {
                        return Err(Error::TypeError {
                            expected: "list".to_string(),
                            got: other.type_name().to_string(),
                        })
                    }
                };
                let mut sorted = items.as_ref().clone();
                let mut failed = None;
                sorted.sort_by(|a, b| {
                    match compare_op(CmpOp::Lt, a.clone(), b.clone()) {
                        Ok(v) if v.is_truthy() => std::cmp::Ordering::Less,
                        Ok(_) => std::cmp::Ordering::Greater,
                        Err(e) => {
                            failed.get_or_insert(e);
                            std::cmp::Ordering::Equal
                        }
                    }
                });
                match failed {
                    Some(e) => Err(e),
                    None => Ok(Value::array(sorted)),
                }
            }
            "round" => {
                let (x, digits) = match args.len() {
                    1 => (args[0].as_float()?, 0),
                    2 => (args[0].as_float()?, args[1].as_int()?),
                    n => {
                        return Err(Error::runtime(format!(
                            "round() takes 1 or 2 arguments, got {}",
                            n
                        )))
                    }
                };
                let factor = 10f64.powi(digits as i32);
                let rounded = (x * factor).round() / factor;
                if digits <= 0 {
                    Ok(Value::Int(rounded as i64))
                } else {
                    Ok(Value::Float(rounded))
                }
            }
            "type" => {
                let [arg] = one(name, args)?;
                Ok(Value::Str(arg.type_name().to_string()))
            }
            _ => Err(Error::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }

    fn call_module(&mut self, module: NativeModule, attr: &str, args: &[Value]) -> Result<Value> {
        match (module, attr) {
            (NativeModule::Math, "sqrt") => Ok(Value::Float(float_arg(attr, args)?.sqrt())),
            (NativeModule::Math, "floor") => Ok(Value::Int(float_arg(attr, args)?.floor() as i64)),
            (NativeModule::Math, "ceil") => Ok(Value::Int(float_arg(attr, args)?.ceil() as i64)),
            (NativeModule::Math, "sin") => Ok(Value::Float(float_arg(attr, args)?.sin())),
            (NativeModule::Math, "cos") => Ok(Value::Float(float_arg(attr, args)?.cos())),
            (NativeModule::Math, "tan") => Ok(Value::Float(float_arg(attr, args)?.tan())),
            (NativeModule::Math, "log") => Ok(Value::Float(float_arg(attr, args)?.ln())),
            (NativeModule::Math, "exp") => Ok(Value::Float(float_arg(attr, args)?.exp())),
            (NativeModule::Math, "fabs") => Ok(Value::Float(float_arg(attr, args)?.abs())),
            (NativeModule::Math, "pow") => {
                let (a, b) = two_floats(attr, args)?;
                Ok(Value::Float(a.powf(b)))
            }
            (NativeModule::Random, "random") => Ok(Value::Float(self.next_float())),
            (NativeModule::Random, "uniform") => {
                let (a, b) = two_floats(attr, args)?;
                Ok(Value::Float(a + self.next_float() * (b - a)))
            }
            (NativeModule::Random, "randint") => {
                let (a, b) = match args {
                    [a, b] => (a.as_int()?, b.as_int()?),
                    _ => return Err(Error::runtime("randint() takes 2 arguments")),
                };
                if a > b {
                    return Err(Error::runtime("randint() empty range"));
                }
                let span = (b - a + 1) as u64;
                Ok(Value::Int(a + (self.next_u64() % span) as i64))
            }
            (NativeModule::Random, "choice") => match args {
                [Value::Array(items)] if !items.is_empty() => {
                    let idx = (self.next_u64() % items.len() as u64) as usize;
                    Ok(items[idx].clone())
                }
                [Value::Array(_)] => Err(Error::runtime("choice() from empty sequence")),
                _ => Err(Error::runtime("choice() takes a non-empty list")),
            },
            (NativeModule::Datetime, "now") => {
                Ok(Value::Str(chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()))
            }
            (NativeModule::Time, "time") => {
                let secs = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);
                Ok(Value::Float(secs))
            }
            (module, attr) => Err(Error::runtime(format!(
                "module '{}' has no function '{}'",
                module.name(),
                attr
            ))),
        }
    }

    fn call_method(
        &mut self,
        base_expr: &Expr,
        base: Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        match (&base, method) {
            (Value::Str(s), "upper") => Ok(Value::Str(s.to_uppercase())),
            (Value::Str(s), "lower") => Ok(Value::Str(s.to_lowercase())),
            (Value::Str(s), "strip") => Ok(Value::Str(s.trim().to_string())),
            (Value::Str(s), "split") => {
                let parts: Vec<Value> = match args.first() {
                    Some(Value::Str(sep)) => {
                        s.split(sep.as_str()).map(|p| Value::Str(p.to_string())).collect()
                    }
                    None => s.split_whitespace().map(|p| Value::Str(p.to_string())).collect(),
                    Some(other) => {
                        return Err(Error::TypeError {
                            expected: "str separator".to_string(),
                            got: other.type_name().to_string(),
                        })
                    }
                };
                Ok(Value::array(parts))
            }
            (Value::Str(s), "replace") => match args.as_slice() {
                [Value::Str(from), Value::Str(to)] => Ok(Value::Str(s.replace(from, to))),
                _ => Err(Error::runtime("replace() takes two str arguments")),
            },
            (Value::Str(s), "startswith") => match args.as_slice() {
                [Value::Str(prefix)] => Ok(Value::Bool(s.starts_with(prefix))),
                _ => Err(Error::runtime("startswith() takes a str argument")),
            },
            (Value::Str(s), "endswith") => match args.as_slice() {
                [Value::Str(suffix)] => Ok(Value::Bool(s.ends_with(suffix))),
                _ => Err(Error::runtime("endswith() takes a str argument")),
            },
            (Value::Str(s), "join") => match args.as_slice() {
                [Value::Array(items)] => {
                    let parts = items
                        .iter()
                        .map(|item| match item {
                            Value::Str(part) => Ok(part.clone()),
                            other => Err(Error::TypeError {
                                expected: "str".to_string(),
                                got: other.type_name().to_string(),
                            }),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Value::Str(parts.join(s)))
                }
                _ => Err(Error::runtime("join() takes a list argument")),
            },
            (Value::Array(_), "append") => {
                let Expr::Name(name) = base_expr else {
                    return Err(Error::runtime("append() target must be a variable"));
                };
                let [item] = one(method, args)?;
                let mut current = self.lookup(name)?;
                if let Value::Array(items) = &mut current {
                    Arc::make_mut(items).push(item);
                }
                self.bind(name.clone(), current);
                Ok(Value::Null)
            }
            (Value::Object(fields), "keys") => {
                // Sorted for deterministic iteration.
                let mut keys: Vec<_> = fields.keys().cloned().collect();
                keys.sort();
                Ok(Value::array(keys.into_iter().map(Value::Str).collect()))
            }
            (Value::Object(fields), "values") => {
                let mut keys: Vec<_> = fields.keys().cloned().collect();
                keys.sort();
                Ok(Value::array(
                    keys.iter().map(|k| fields[k].clone()).collect(),
                ))
            }
            (Value::Object(fields), "get") => match args.as_slice() {
                [Value::Str(key)] => Ok(fields.get(key).cloned().unwrap_or(Value::Null)),
                [Value::Str(key), default] => {
                    Ok(fields.get(key).cloned().unwrap_or_else(|| default.clone()))
                }
                _ => Err(Error::runtime("get() takes a str key")),
            },
            (base, method) => Err(Error::runtime(format!(
                "{} has no method '{}'",
                base.type_name(),
                method
            ))),
        }
    }

    fn iterate(&mut self, iter: &Expr) -> Result<Vec<Value>> {
        match self.eval(iter)? {
            Value::Array(items) => Ok(items.as_ref().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Object(fields) => {
                let mut keys: Vec<_> = fields.keys().cloned().collect();
                keys.sort();
                Ok(keys.into_iter().map(Value::Str).collect())
            }
            other => Err(Error::TypeError {
                expected: "iterable".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    // xorshift64; enough for the whitelisted random module
    fn next_u64(&mut self) -> u64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        x
    }

    fn next_float(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Evaluates a standalone expression against a read-only view of the
/// environment. Used by the dispatcher's placeholder resolution; the
/// environment is cloned so nothing the expression does leaks back.
pub fn eval_expression(source: &str, env: &ExecutionEnvironment) -> Result<Value> {
    let expr = parser::parse_expression(source)?;
    let mut scratch = env.clone();
    let mut evaluator = NativeEvaluator::new(&mut scratch);
    evaluator.eval(&expr)
}

/// Non-call attribute lookup on a module object (`math.pi`)
fn module_attribute(module: NativeModule, attr: &str) -> Result<Value> {
    match (module, attr) {
        (NativeModule::Math, "pi") => Ok(Value::Float(std::f64::consts::PI)),
        (NativeModule::Math, "e") => Ok(Value::Float(std::f64::consts::E)),
        (module, attr) => Err(Error::runtime(format!(
            "module '{}' has no attribute '{}'",
            module.name(),
            attr
        ))),
    }
}

// --- operators ---

fn binary_op(op: BinOp, left: Value, right: Value) -> Result<Value> {
    match op {
        BinOp::Add => match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (Value::Array(a), Value::Array(b)) => {
                let mut items = a.as_ref().clone();
                items.extend(b.iter().cloned());
                Ok(Value::array(items))
            }
            (a, b) => numeric(a, b, |x, y| x + y),
        },
        BinOp::Sub => match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(b))),
            (a, b) => numeric(a, b, |x, y| x - y),
        },
        BinOp::Mul => match (left, right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(b))),
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                Ok(Value::Str(s.repeat(n.max(0) as usize)))
            }
            (Value::Array(items), Value::Int(n)) => {
                let mut repeated = Vec::new();
                for _ in 0..n.max(0) {
                    repeated.extend(items.iter().cloned());
                }
                Ok(Value::array(repeated))
            }
            (a, b) => numeric(a, b, |x, y| x * y),
        },
        BinOp::Div => {
            let b = right.as_float()?;
            if b == 0.0 {
                return Err(Error::DivisionByZero);
            }
            Ok(Value::Float(left.as_float()? / b))
        }
        BinOp::FloorDiv => match (left, right) {
            (_, Value::Int(0)) => Err(Error::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.div_euclid(b))),
            (a, b) => {
                let b = b.as_float()?;
                if b == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Value::Float((a.as_float()? / b).floor()))
            }
        },
        BinOp::Mod => match (left, right) {
            (_, Value::Int(0)) => Err(Error::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.rem_euclid(b))),
            (a, b) => {
                let b = b.as_float()?;
                if b == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Value::Float(a.as_float()?.rem_euclid(b)))
            }
        },
        BinOp::Pow => match (left, right) {
            (Value::Int(a), Value::Int(b)) if b >= 0 => a
                .checked_pow(b.min(u32::MAX as i64) as u32)
                .map(Value::Int)
                .ok_or_else(|| Error::runtime("integer overflow in power")),
            (a, b) => Ok(Value::Float(a.as_float()?.powf(b.as_float()?))),
        },
    }
}

fn numeric(a: Value, b: Value, op: impl Fn(f64, f64) -> f64) -> Result<Value> {
    Ok(Value::Float(op(a.as_float()?, b.as_float()?)))
}

fn compare_op(op: CmpOp, left: Value, right: Value) -> Result<Value> {
    let result = match op {
        CmpOp::Eq => values_equal(&left, &right),
        CmpOp::NotEq => !values_equal(&left, &right),
        CmpOp::In => return contains(&right, &left).map(Value::Bool),
        ordering => {
            let cmp = match (&left, &right) {
                (Value::Str(a), Value::Str(b)) => a.cmp(b),
                (a, b) => a
                    .as_float()?
                    .partial_cmp(&b.as_float()?)
                    .ok_or_else(|| Error::runtime("unordered float comparison"))?,
            };
            match ordering {
                CmpOp::Lt => cmp.is_lt(),
                CmpOp::LtEq => cmp.is_le(),
                CmpOp::Gt => cmp.is_gt(),
                CmpOp::GtEq => cmp.is_ge(),
                _ => unreachable!(),
            }
        }
    };
    Ok(Value::Bool(result))
}

/// Equality with int/float coercion, as in the source language
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        _ => a == b,
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool> {
    match container {
        Value::Array(items) => Ok(items.iter().any(|v| values_equal(v, item))),
        Value::Str(s) => match item {
            Value::Str(needle) => Ok(s.contains(needle.as_str())),
            other => Err(Error::TypeError {
                expected: "str".to_string(),
                got: other.type_name().to_string(),
            }),
        },
        Value::Object(fields) => match item {
            Value::Str(key) => Ok(fields.contains_key(key)),
            other => Err(Error::TypeError {
                expected: "str key".to_string(),
                got: other.type_name().to_string(),
            }),
        },
        other => Err(Error::TypeError {
            expected: "container".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn index_value(container: &Value, index: &Value) -> Result<Value> {
    match (container, index) {
        (Value::Array(items), Value::Int(i)) => {
            let idx = normalize_index(*i, items.len())?;
            Ok(items[idx].clone())
        }
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = normalize_index(*i, chars.len())?;
            Ok(Value::Str(chars[idx].to_string()))
        }
        (Value::Object(fields), Value::Str(key)) => {
            fields.get(key).cloned().ok_or_else(|| {
                Error::runtime(format!("key '{}' not found", key))
            })
        }
        (container, index) => Err(Error::TypeError {
            expected: "indexable collection".to_string(),
            got: format!("{}[{}]", container.type_name(), index.type_name()),
        }),
    }
}

/// Resolves a possibly-negative index against a length
fn normalize_index(index: i64, length: usize) -> Result<usize> {
    let resolved = if index < 0 {
        index + length as i64
    } else {
        index
    };
    if resolved < 0 || resolved as usize >= length {
        return Err(Error::IndexOutOfBounds { index, length });
    }
    Ok(resolved as usize)
}

fn one(name: &str, args: Vec<Value>) -> Result<[Value; 1]> {
    <[Value; 1]>::try_from(args)
        .map_err(|args| Error::runtime(format!("{}() takes 1 argument, got {}", name, args.len())))
}

fn float_arg(name: &str, args: &[Value]) -> Result<f64> {
    match args {
        [arg] => arg.as_float(),
        _ => Err(Error::runtime(format!(
            "{}() takes 1 argument, got {}",
            name,
            args.len()
        ))),
    }
}

fn two_floats(name: &str, args: &[Value]) -> Result<(f64, f64)> {
    match args {
        [a, b] => Ok((a.as_float()?, b.as_float()?)),
        _ => Err(Error::runtime(format!(
            "{}() takes 2 arguments, got {}",
            name,
            args.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> (ExecutionEnvironment, String) {
        let mut env = ExecutionEnvironment::new();
        let mut evaluator = NativeEvaluator::new(&mut env);
        evaluator.run_source(source).unwrap();
        let output = evaluator.take_output();
        (env, output)
    }

    #[test]
    fn test_arithmetic_and_print() {
        let (env, output) = run("x = 10\ny = x * 2 + 1\nprint(y)");
        assert_eq!(env.get("y").unwrap(), Value::Int(21));
        assert_eq!(output, "21\n");
    }

    #[test]
    fn test_true_division_is_float() {
        let (env, _) = run("q = 7 / 2\nf = 7 // 2");
        assert_eq!(env.get("q").unwrap(), Value::Float(3.5));
        assert_eq!(env.get("f").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_function_call_and_return() {
        let (env, _) = run("def square(n):\n    return n * n\nresult = square(6)");
        assert_eq!(env.get("result").unwrap(), Value::Int(36));
    }

    #[test]
    fn test_locals_do_not_leak() {
        let (env, _) = run("def f():\n    tmp = 99\n    return tmp\nx = f()");
        assert!(!env.exists("tmp"));
        assert_eq!(env.get("x").unwrap(), Value::Int(99));
    }

    #[test]
    fn test_while_with_break() {
        let (env, _) = run("i = 0\nwhile True:\n    i += 1\n    if i == 5:\n        break");
        assert_eq!(env.get("i").unwrap(), Value::Int(5));
    }

    #[test]
    fn test_for_over_range() {
        let (env, _) = run("total = 0\nfor i in range(1, 5):\n    total += i");
        assert_eq!(env.get("total").unwrap(), Value::Int(10));
    }

    #[test]
    fn test_list_index_and_append() {
        let (env, _) = run("xs = [1, 2]\nxs.append(3)\nxs[0] = 10\nfirst = xs[0]\nn = len(xs)");
        assert_eq!(env.get("first").unwrap(), Value::Int(10));
        assert_eq!(env.get("n").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_negative_index() {
        let (env, _) = run("xs = [1, 2, 3]\nlast = xs[-1]");
        assert_eq!(env.get("last").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_dict_access() {
        let (env, _) = run("d = {'a': 1}\nd['b'] = 2\nv = d['b']\ng = d.get('missing', 0)");
        assert_eq!(env.get("v").unwrap(), Value::Int(2));
        assert_eq!(env.get("g").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_string_methods() {
        let (env, _) = run("s = ' Hello '\nt = s.strip().upper()\nparts = 'a,b'.split(',')");
        assert_eq!(env.get("t").unwrap(), Value::Str("HELLO".to_string()));
        assert_eq!(
            env.get("parts").unwrap(),
            Value::array(vec![Value::Str("a".into()), Value::Str("b".into())])
        );
    }

    #[test]
    fn test_math_module() {
        let (env, _) = run("import math\nr = math.sqrt(16)\np = math.pi");
        assert_eq!(env.get("r").unwrap(), Value::Float(4.0));
        assert_eq!(env.get("p").unwrap(), Value::Float(std::f64::consts::PI));
    }

    #[test]
    fn test_import_alias_binds_alias() {
        let (env, _) = run("import math as m\nx = m.floor(2.9)");
        assert_eq!(env.get("x").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_unknown_module_is_execution_error() {
        let mut env = ExecutionEnvironment::new();
        let err = NativeEvaluator::new(&mut env)
            .run_source("import os")
            .unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
    }

    #[test]
    fn test_division_by_zero() {
        let mut env = ExecutionEnvironment::new();
        let err = NativeEvaluator::new(&mut env)
            .run_source("x = 1 / 0")
            .unwrap_err();
        assert!(matches!(err, Error::DivisionByZero));
    }

    #[test]
    fn test_undefined_variable() {
        let mut env = ExecutionEnvironment::new();
        let err = NativeEvaluator::new(&mut env)
            .run_source("x = missing + 1")
            .unwrap_err();
        assert!(matches!(err, Error::UndefinedVariable { .. }));
    }

    #[test]
    fn test_recursion_depth_limit() {
        let mut env = ExecutionEnvironment::new();
        let err = NativeEvaluator::new(&mut env)
            .run_source("def f():\n    return f()\nf()")
            .unwrap_err();
        assert!(matches!(err, Error::RuntimeError(_)));
    }

    #[test]
    fn test_recursive_fibonacci() {
        let src = "def fib(n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\nx = fib(10)";
        let (env, _) = run(src);
        assert_eq!(env.get("x").unwrap(), Value::Int(55));
    }

    #[test]
    fn test_builtin_shadowed_by_user_function() {
        let (env, _) = run("def len(x):\n    return 42\nn = len('abc')");
        assert_eq!(env.get("n").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_eval_expression_read_only() {
        let mut env = ExecutionEnvironment::new();
        env.define("x".to_string(), Value::Int(5));
        let value = eval_expression("x * 2", &env).unwrap();
        assert_eq!(value, Value::Int(10));
        assert_eq!(env.var_count(), 1);
    }

    #[test]
    fn test_comparison_chaining_not_supported_but_single_works() {
        let (env, _) = run("ok = 3 < 5\nbad = 5 < 3");
        assert_eq!(env.get("ok").unwrap(), Value::Bool(true));
        assert_eq!(env.get("bad").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_in_operator() {
        let (env, _) = run("a = 2 in [1, 2]\nb = 'ell' in 'hello'\nc = 'k' in {'k': 1}");
        assert_eq!(env.get("a").unwrap(), Value::Bool(true));
        assert_eq!(env.get("b").unwrap(), Value::Bool(true));
        assert_eq!(env.get("c").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_min_max_sum_sorted() {
        let (env, _) = run(
            "xs = [3, 1, 2]\nlo = min(xs)\nhi = max(xs)\ns = sum(xs)\nordered = sorted(xs)",
        );
        assert_eq!(env.get("lo").unwrap(), Value::Int(1));
        assert_eq!(env.get("hi").unwrap(), Value::Int(3));
        assert_eq!(env.get("s").unwrap(), Value::Int(6));
        assert_eq!(
            env.get("ordered").unwrap(),
            Value::array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }
}
