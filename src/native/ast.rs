//! Abstract syntax tree for the native language
//!
//! Shared between the evaluator and the security scanner's structural
//! analysis.

/// A parsed native code block
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Top-level statements
    pub body: Vec<Stmt>,
}

/// Statement node
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `target = value` (or augmented assignment, desugared)
    Assign {
        /// Assignment target
        target: Target,
        /// Right-hand side
        value: Expr,
        /// Source line inside the block (1-indexed)
        line: usize,
    },
    /// Bare expression statement
    Expr {
        /// The expression
        value: Expr,
        /// Source line inside the block
        line: usize,
    },
    /// `if`/`elif`/`else` chain
    If {
        /// `(condition, body)` pairs for the `if` and each `elif`
        branches: Vec<(Expr, Vec<Stmt>)>,
        /// `else` body (empty when absent)
        else_body: Vec<Stmt>,
    },
    /// `while` loop
    While {
        /// Loop condition
        cond: Expr,
        /// Loop body
        body: Vec<Stmt>,
    },
    /// `for var in iterable` loop
    For {
        /// Loop variable
        var: String,
        /// Iterated expression
        iter: Expr,
        /// Loop body
        body: Vec<Stmt>,
    },
    /// `def name(params):` definition
    FunctionDef {
        /// Function name
        name: String,
        /// Parameter names
        params: Vec<String>,
        /// Function body
        body: Vec<Stmt>,
        /// Source line of the `def`
        line: usize,
    },
    /// `return` with optional value
    Return {
        /// Returned expression, when present
        value: Option<Expr>,
        /// Source line
        line: usize,
    },
    /// `import module` / `import module as alias`
    Import {
        /// Imported module name (dotted names allowed)
        module: String,
        /// Optional alias
        alias: Option<String>,
        /// Source line
        line: usize,
    },
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `pass`
    Pass,
}

/// Assignment target
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Plain name
    Name(String),
    /// `container[index]`
    Index {
        /// Container expression
        value: Expr,
        /// Index expression
        index: Expr,
    },
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal
    Str(String),
    /// Boolean literal
    Bool(bool),
    /// `None`
    None,
    /// Name reference
    Name(String),
    /// List literal
    List(Vec<Expr>),
    /// Dict literal
    Dict(Vec<(Expr, Expr)>),
    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Binary arithmetic
    Binary {
        /// Operator
        op: BinOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Short-circuit `and`/`or`
    BoolOp {
        /// Operator
        op: BoolOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Comparison
    Compare {
        /// Operator
        op: CmpOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Call with positional arguments
    Call {
        /// Called expression (a name or attribute chain)
        func: Box<Expr>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `value.attr`
    Attribute {
        /// Base expression
        value: Box<Expr>,
        /// Attribute name
        attr: String,
    },
    /// `value[index]`
    Index {
        /// Container expression
        value: Box<Expr>,
        /// Index expression
        index: Box<Expr>,
    },
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Numeric negation
    Neg,
    /// Logical `not`
    Not,
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` (always float)
    Div,
    /// `//` (floor division)
    FloorDiv,
    /// `%`
    Mod,
    /// `**`
    Pow,
}

/// Short-circuit boolean operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    /// `and`
    And,
    /// `or`
    Or,
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `in`
    In,
}

impl Module {
    /// Walks every statement, recursing into nested bodies
    pub fn walk_stmts<'a>(&'a self, f: &mut impl FnMut(&'a Stmt)) {
        fn walk<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Stmt)) {
            for stmt in stmts {
                f(stmt);
                match stmt {
                    Stmt::If {
                        branches,
                        else_body,
                    } => {
                        for (_, body) in branches {
                            walk(body, f);
                        }
                        walk(else_body, f);
                    }
                    Stmt::While { body, .. }
                    | Stmt::For { body, .. }
                    | Stmt::FunctionDef { body, .. } => walk(body, f),
                    _ => {}
                }
            }
        }
        walk(&self.body, f);
    }

    /// Walks every expression in the module, recursing into
    /// sub-expressions
    pub fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        self.walk_stmts(&mut |stmt| {
            let mut visit = |expr: &'a Expr| walk_expr(expr, f);
            match stmt {
                Stmt::Assign { target, value, .. } => {
                    if let Target::Index { value, index } = target {
                        visit(value);
                        visit(index);
                    }
                    visit(value);
                }
                Stmt::Expr { value, .. } => visit(value),
                Stmt::If { branches, .. } => {
                    for (cond, _) in branches {
                        visit(cond);
                    }
                }
                Stmt::While { cond, .. } => visit(cond),
                Stmt::For { iter, .. } => visit(iter),
                Stmt::Return {
                    value: Some(expr), ..
                } => visit(expr),
                _ => {}
            }
        });
    }
}

fn walk_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(expr);
    match expr {
        Expr::List(items) => {
            for item in items {
                walk_expr(item, f);
            }
        }
        Expr::Dict(pairs) => {
            for (k, v) in pairs {
                walk_expr(k, f);
                walk_expr(v, f);
            }
        }
        Expr::Unary { operand, .. } => walk_expr(operand, f),
        Expr::Binary { left, right, .. }
        | Expr::BoolOp { left, right, .. }
        | Expr::Compare { left, right, .. } => {
            walk_expr(left, f);
            walk_expr(right, f);
        }
        Expr::Call { func, args } => {
            walk_expr(func, f);
            for arg in args {
                walk_expr(arg, f);
            }
        }
        Expr::Attribute { value, .. } => walk_expr(value, f),
        Expr::Index { value, index } => {
            walk_expr(value, f);
            walk_expr(index, f);
        }
        _ => {}
    }
}
