//! Structural scan of native blocks
//!
//! Textual patterns miss aliased imports (`import os as o` followed by
//! `o.system(...)`) and spaced-out formatting. Parsing the block with
//! the native parser and walking the tree catches those. Alias tracking
//! is bounded to one level: the import statement's `as` name maps back
//! to the module; no data-flow analysis beyond that.

use std::collections::HashMap;

use crate::native;
use crate::native::{Expr, Stmt};
use crate::parser::CodeBlock;
use crate::security::{Finding, Severity};

/// Modules the native language must not import
const DENIED_MODULES: &[&str] = &[
    "os",
    "subprocess",
    "sys",
    "shutil",
    "socket",
    "urllib",
    "requests",
];

/// Builtins the native language must not call
const DENIED_CALLS: &[&str] = &["exec", "eval", "compile", "open", "__import__"];

/// Scans one native block structurally
pub fn scan_native(block_index: usize, block: &CodeBlock) -> Vec<Finding> {
    let module = match native::parse(&block.content) {
        Ok(module) => module,
        Err(_) => {
            // An unparseable block cannot be vouched for.
            return vec![Finding {
                block_index,
                line: block.line,
                rule_id: "native.syntax-error".to_string(),
                severity: Severity::Medium,
                message: "native block failed to parse; structural scan skipped".to_string(),
            }];
        }
    };

    let mut findings = Vec::new();

    // First pass: imports, building the alias table.
    let mut aliases: HashMap<String, String> = HashMap::new();
    module.walk_stmts(&mut |stmt| {
        if let Stmt::Import {
            module: name,
            alias,
            ..
        } = stmt
        {
            let root = name.split('.').next().unwrap_or(name).to_string();
            let bound = alias.clone().unwrap_or_else(|| root.clone());
            if DENIED_MODULES.contains(&root.as_str()) {
                findings.push(Finding {
                    block_index,
                    line: block.line,
                    rule_id: "native.denied-import".to_string(),
                    severity: Severity::High,
                    message: format!("import of denied module '{}'", root),
                });
            }
            aliases.insert(bound, root);
        }
    });

    // Second pass: calls, resolving attribute bases through the aliases.
    module.walk_exprs(&mut |expr| {
        let Expr::Call { func, .. } = expr else {
            return;
        };
        match func.as_ref() {
            Expr::Name(name) if DENIED_CALLS.contains(&name.as_str()) => {
                findings.push(Finding {
                    block_index,
                    line: block.line,
                    rule_id: "native.denied-call".to_string(),
                    severity: Severity::High,
                    message: format!("call to denied builtin '{}'", name),
                });
            }
            Expr::Attribute { value, attr } => {
                if let Expr::Name(base) = value.as_ref() {
                    let module = aliases.get(base).map(String::as_str).unwrap_or(base);
                    if DENIED_MODULES.contains(&module) {
                        findings.push(Finding {
                            block_index,
                            line: block.line,
                            rule_id: "native.denied-capability".to_string(),
                            severity: Severity::High,
                            message: format!(
                                "call to '{}.{}' via denied module '{}'",
                                base, attr, module
                            ),
                        });
                    }
                }
            }
            _ => {}
        }
    });

    findings
}
