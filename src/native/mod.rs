//! In-process interpreter for the native language
//!
//! Native blocks are the only ones that mutate the shared execution
//! environment, so they run inside the host process rather than as
//! subprocesses: scanner → tokens → parser → AST → tree-walking
//! evaluator. The AST is also what the security scanner walks for its
//! structural checks.

mod ast;
mod evaluator;
mod parser;
mod scanner;
mod token;

pub use ast::{BinOp, BoolOp, CmpOp, Expr, Module, Stmt, Target, UnaryOp};
pub use evaluator::{eval_expression, NativeEvaluator};
pub use parser::{parse, parse_expression};
pub use scanner::Scanner;
pub use token::{Token, TokenKind};
