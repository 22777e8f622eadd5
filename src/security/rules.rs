//! Per-language denylist rules
//!
//! Textual patterns with severities. Rule ids are stable: `<lang>.<slug>`.

use lazy_static::lazy_static;
use regex::Regex;

use super::Severity;
use crate::parser::LanguageTag;

/// One denylist rule
pub struct Rule {
    /// Stable identifier (`py.process-spawn`, `js.dynamic-eval`, ...)
    pub id: &'static str,
    /// Severity assigned to matches
    pub severity: Severity,
    /// Human-readable description
    pub message: &'static str,
    /// Compiled pattern, matched case-insensitively
    pub pattern: Regex,
}

fn rule(id: &'static str, severity: Severity, message: &'static str, pattern: &str) -> Rule {
    Rule {
        id,
        severity,
        message,
        // Patterns are static; a bad one is a programming error.
        pattern: Regex::new(&format!("(?i){}", pattern)).expect("invalid denylist pattern"),
    }
}

lazy_static! {
    static ref PY_RULES: Vec<Rule> = vec![
        rule(
            "py.process-spawn",
            Severity::High,
            "process-spawning capability (subprocess/os.system)",
            r"\bsubprocess\b|\bos\s*\.\s*system\b|\bos\s*\.\s*popen\b",
        ),
        rule(
            "py.os-import",
            Severity::High,
            "import of the os module",
            r"\bimport\b.*\bos\b|\bos\b\s*\.",
        ),
        rule(
            "py.sys-access",
            Severity::Medium,
            "access to the sys module",
            r"\bsys\b\s*\.",
        ),
        rule(
            "py.dynamic-eval",
            Severity::High,
            "dynamic code evaluation (exec/eval/compile)",
            r"\bexec\s*\(|\beval\s*\(|\bcompile\s*\(",
        ),
        rule(
            "py.dynamic-import",
            Severity::High,
            "dynamic import machinery",
            r"\bimportlib\b|\b__import__\b",
        ),
        rule(
            "py.path-traversal",
            Severity::High,
            "file open with path traversal",
            r"\bopen\s*\(\s*[^)]*\.\./",
        ),
        rule(
            "py.file-write",
            Severity::Medium,
            "filesystem manipulation (shutil)",
            r"\bshutil\b",
        ),
        rule(
            "py.network",
            Severity::Medium,
            "network capability (socket/requests/urllib)",
            r"\bsocket\b|\brequests\b|\burllib\b|\bhttplib\b|\bftplib\b|\bxmlrpc\b",
        ),
        rule(
            "py.serialization",
            Severity::Medium,
            "unsafe deserialization (pickle/marshal)",
            r"\bpickle\b|\bcpickle\b|\bshelve\b|\bmarshal\b",
        ),
        rule(
            "py.dunder-access",
            Severity::Medium,
            "double-underscore attribute access",
            r"\b__[a-z]+__\b",
        ),
        rule(
            "py.obfuscation-module",
            Severity::Low,
            "obfuscation-capable module (codecs/zlib/bz2/lzma)",
            r"\bcodecs\b|\bzlib\b|\bbz2\b|\blzma\b",
        ),
        rule(
            "py.archive-module",
            Severity::Low,
            "archive module (zipfile/tarfile)",
            r"\bzipfile\b|\btarfile\b",
        ),
        rule(
            "py.browser",
            Severity::Low,
            "browser control (webbrowser)",
            r"\bwebbrowser\b",
        ),
    ];

    static ref JS_RULES: Vec<Rule> = vec![
        rule(
            "js.process-spawn",
            Severity::High,
            "child process module",
            r#"require\s*\(\s*["']child_process["']\s*\)"#,
        ),
        rule(
            "js.filesystem",
            Severity::High,
            "filesystem module",
            r#"require\s*\(\s*["']fs["']\s*\)"#,
        ),
        rule(
            "js.network",
            Severity::Medium,
            "network module (http/https/net/dgram/tls)",
            r#"require\s*\(\s*["'](?:http|https|net|dgram|tls)["']\s*\)"#,
        ),
        rule(
            "js.worker",
            Severity::Medium,
            "cluster or worker threads module",
            r#"require\s*\(\s*["'](?:cluster|worker_threads)["']\s*\)"#,
        ),
        rule(
            "js.dynamic-eval",
            Severity::High,
            "dynamic code evaluation (eval/Function)",
            r"\beval\s*\(|\bFunction\s*\(",
        ),
        rule(
            "js.dynamic-import",
            Severity::High,
            "dynamic import",
            r"\bimport\s*\(",
        ),
    ];

    static ref CPP_RULES: Vec<Rule> = vec![
        rule(
            "cpp.process-spawn",
            Severity::High,
            "process-spawning call (system/popen/exec)",
            r"\bsystem\s*\(|\bpopen\s*\(|\bexec[lv]p?e?\s*\(",
        ),
        rule(
            "cpp.win-process",
            Severity::High,
            "Windows process creation",
            r"\bWinExec\s*\(|\bCreateProcess\b|\bShellExecute\b",
        ),
        rule(
            "cpp.process-include",
            Severity::Medium,
            "process header include",
            r"#include\s*<(?:process\.h|cstdlib)>",
        ),
        rule(
            "cpp.raw-fs",
            Severity::Medium,
            "direct file manipulation (remove/unlink)",
            r"\bremove\s*\(|\bunlink\s*\(",
        ),
    ];

    static ref JAVA_RULES: Vec<Rule> = vec![
        rule(
            "java.process-spawn",
            Severity::High,
            "process-spawning call (Runtime.exec/ProcessBuilder)",
            r"Runtime\s*\.\s*getRuntime\s*\(\s*\)\s*\.\s*exec|\bProcessBuilder\b",
        ),
        rule(
            "java.reflection",
            Severity::Medium,
            "reflective class loading",
            r"Class\s*\.\s*forName\s*\(",
        ),
        rule(
            "java.file-io",
            Severity::Medium,
            "file I/O (java.io.File/java.nio.file)",
            r"\bjava\s*\.\s*io\s*\.\s*File\b|\bjava\s*\.\s*nio\s*\.\s*file\b",
        ),
        rule(
            "java.network",
            Severity::Medium,
            "network socket",
            r"\bjava\s*\.\s*net\s*\.\s*Socket\b|\bServerSocket\b",
        ),
    ];

    static ref PHP_RULES: Vec<Rule> = vec![
        rule(
            "php.process-spawn",
            Severity::High,
            "process-spawning call (exec/shell_exec/system/proc_open)",
            r"\bexec\s*\(|\bshell_exec\s*\(|\bsystem\s*\(|\bproc_open\s*\(|\bpassthru\s*\(",
        ),
        rule(
            "php.dynamic-eval",
            Severity::High,
            "dynamic code evaluation (eval/assert)",
            r"\beval\s*\(|\bassert\s*\(",
        ),
        rule(
            "php.remote-include",
            Severity::High,
            "file content fetch (file_get_contents/include with URL)",
            r"\bfile_get_contents\s*\(\s*['\x22]https?://",
        ),
        rule(
            "php.file-write",
            Severity::Medium,
            "file write (file_put_contents/fopen)",
            r"\bfile_put_contents\s*\(|\bfopen\s*\(",
        ),
    ];

    static ref RUST_RULES: Vec<Rule> = vec![
        rule(
            "rust.process-spawn",
            Severity::High,
            "process-spawning call (std::process::Command)",
            r"std\s*::\s*process\b|\bCommand\s*::\s*new\s*\(",
        ),
        rule(
            "rust.filesystem",
            Severity::Medium,
            "filesystem access (std::fs)",
            r"std\s*::\s*fs\s*::",
        ),
        rule(
            "rust.network",
            Severity::Medium,
            "network access (std::net)",
            r"std\s*::\s*net\s*::",
        ),
        rule(
            "rust.unsafe",
            Severity::Low,
            "unsafe block",
            r"\bunsafe\b",
        ),
    ];
}

/// The denylist rules for one language
pub fn rules_for(tag: LanguageTag) -> &'static [Rule] {
    match tag {
        LanguageTag::Py => &PY_RULES,
        LanguageTag::Js => &JS_RULES,
        LanguageTag::Cpp => &CPP_RULES,
        LanguageTag::Java => &JAVA_RULES,
        LanguageTag::Php => &PHP_RULES,
        LanguageTag::Rust => &RUST_RULES,
    }
}
