//! Security scanner for compiled programs
//!
//! Runs before dispatch and never executes anything: per-language regex
//! denylists over every block, plus a structural walk of native block
//! syntax trees to catch what textual patterns miss (aliasing,
//! formatting). The scan is pure: the same program, rule set and level
//! always produce the same report.

mod ast_scan;
mod rules;

pub use rules::{rules_for, Rule};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::parser::Program;

/// Severity of a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Low,
    /// Suspicious but not directly harmful
    Medium,
    /// Dangerous capability
    High,
    /// Directly destructive
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// Configured scanning strictness.
///
/// The stricter the level, the lower the severity that blocks: `Low`
/// blocks only critical findings, while `Strict` blocks on any finding
/// at all. Below-threshold findings are always reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Block only critical findings
    Low,
    /// Block high and critical findings
    #[default]
    Medium,
    /// Block medium and above
    High,
    /// Block every finding
    Strict,
}

impl SecurityLevel {
    /// The minimum severity that blocks execution at this level
    pub fn blocking_severity(&self) -> Severity {
        match self {
            SecurityLevel::Low => Severity::Critical,
            SecurityLevel::Medium => Severity::High,
            SecurityLevel::High => Severity::Medium,
            SecurityLevel::Strict => Severity::Low,
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SecurityLevel::Low => "low",
            SecurityLevel::Medium => "medium",
            SecurityLevel::High => "high",
            SecurityLevel::Strict => "strict",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SecurityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(SecurityLevel::Low),
            "medium" => Ok(SecurityLevel::Medium),
            "high" => Ok(SecurityLevel::High),
            "strict" => Ok(SecurityLevel::Strict),
            other => Err(Error::runtime(format!("unknown security level '{}'", other))),
        }
    }
}

/// One detected issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Index of the block in program order
    pub block_index: usize,
    /// First fusion-source line of the block
    pub line: usize,
    /// Stable rule identifier
    pub rule_id: String,
    /// Severity of the finding
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
}

/// Scan verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// No finding reached the threshold
    Allowed,
    /// At least one finding at or above the threshold
    Blocked,
}

/// Result of scanning one program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    /// All findings, in block order
    pub findings: Vec<Finding>,
    /// Level the scan ran under
    pub level: SecurityLevel,
    /// Overall verdict
    pub verdict: Verdict,
}

impl SecurityReport {
    /// True when the verdict blocks execution
    pub fn is_blocked(&self) -> bool {
        self.verdict == Verdict::Blocked
    }

    /// Findings at or above the blocking threshold
    pub fn blocking_findings(&self) -> impl Iterator<Item = &Finding> {
        let threshold = self.level.blocking_severity();
        self.findings.iter().filter(move |f| f.severity >= threshold)
    }

    /// Converts a blocked report into the fatal error the dispatcher
    /// raises. Returns `None` for allowed reports.
    pub fn to_violation(&self) -> Option<Error> {
        let blocking: Vec<_> = self.blocking_findings().collect();
        let first = blocking.first()?;
        Some(Error::SecurityViolation {
            count: blocking.len(),
            level: self.level.to_string(),
            first: first.message.clone(),
        })
    }
}

/// Scans every block of a program against the denylists and, for native
/// blocks, the structural AST rules.
pub fn scan(program: &Program, level: SecurityLevel) -> SecurityReport {
    let mut findings = Vec::new();

    for (index, block) in program.blocks.iter().enumerate() {
        for rule in rules_for(block.tag) {
            if rule.pattern.is_match(&block.content) {
                findings.push(Finding {
                    block_index: index,
                    line: block.line,
                    rule_id: rule.id.to_string(),
                    severity: rule.severity,
                    message: rule.message.to_string(),
                });
            }
        }

        if block.tag.is_native() {
            findings.extend(ast_scan::scan_native(index, block));
        }
    }

    let threshold = level.blocking_severity();
    let verdict = if findings.iter().any(|f| f.severity >= threshold) {
        Verdict::Blocked
    } else {
        Verdict::Allowed
    };

    if verdict == Verdict::Blocked {
        tracing::warn!(
            findings = findings.len(),
            level = %level,
            "security scan blocked program"
        );
    }

    SecurityReport {
        findings,
        level,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;

    fn scan_source(source: &str, level: SecurityLevel) -> SecurityReport {
        let artifact = Compiler::default().compile(source, "t.lf").unwrap().artifact;
        scan(&artifact.program, level)
    }

    #[test]
    fn test_clean_program_allowed() {
        let report = scan_source("py.x = 1\npy.print(x)", SecurityLevel::Strict);
        assert!(report.findings.is_empty());
        assert_eq!(report.verdict, Verdict::Allowed);
    }

    #[test]
    fn test_process_spawn_blocked_at_medium() {
        let source = "py.import subprocess\npy.subprocess.run(['ls'])";
        assert!(scan_source(source, SecurityLevel::Medium).is_blocked());
        assert!(scan_source(source, SecurityLevel::High).is_blocked());
        assert!(scan_source(source, SecurityLevel::Strict).is_blocked());
    }

    #[test]
    fn test_process_spawn_reported_but_allowed_at_low() {
        let source = "py.import subprocess\npy.subprocess.run(['ls'])";
        let report = scan_source(source, SecurityLevel::Low);
        assert!(!report.findings.is_empty());
        assert_eq!(report.verdict, Verdict::Allowed);
    }

    #[test]
    fn test_js_eval_flagged() {
        let report = scan_source("js.eval('alert(1)')", SecurityLevel::Medium);
        assert!(report.is_blocked());
        assert!(report.findings.iter().any(|f| f.rule_id.starts_with("js.")));
    }

    #[test]
    fn test_cpp_system_flagged() {
        let report = scan_source("cpp.system(\"ls\");", SecurityLevel::Medium);
        assert!(report.is_blocked());
    }

    #[test]
    fn test_verdict_deterministic() {
        let source = "py.import os\npy.os.system('ls')";
        let a = scan_source(source, SecurityLevel::Medium);
        let b = scan_source(source, SecurityLevel::Medium);
        assert_eq!(a, b);
    }

    #[test]
    fn test_to_violation_carries_first_message() {
        let report = scan_source("js.eval('x')", SecurityLevel::Medium);
        let err = report.to_violation().unwrap();
        assert!(matches!(err, Error::SecurityViolation { .. }));
    }

    #[test]
    fn test_level_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(SecurityLevel::Strict.blocking_severity(), Severity::Low);
    }
}
