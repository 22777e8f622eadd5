use super::program::{CodeBlock, LanguageTag};
use crate::lexer::{Line, LineKind};

/// Folds consecutive same-tag code lines into logical blocks.
///
/// The continuation predicate is deliberately not guest-language-aware
/// beyond "ends with block-opening or continuation punctuation, is
/// indented deeper than the block's first line, or consists only of
/// closing brackets". A tag change, a blank line, a comment, or a
/// directive always ends the current block.
pub struct BlockAssembler;

/// Block being accumulated
struct OpenBlock {
    tag: LanguageTag,
    first_line: usize,
    base_indent: usize,
    prev_text: String,
    fragments: Vec<(usize, String)>,
    content_lines: Vec<String>,
}

impl OpenBlock {
    fn start(tag: LanguageTag, line: usize, indent: usize, text: String) -> Self {
        OpenBlock {
            tag,
            first_line: line,
            base_indent: indent,
            prev_text: text.clone(),
            fragments: vec![(line, text.clone())],
            content_lines: vec![text],
        }
    }

    /// Whether a same-tag line at `indent` with `text` continues this block
    fn continues(&self, indent: usize, text: &str) -> bool {
        opens_construct(self.tag, &self.prev_text)
            || indent > self.base_indent
            || closes_construct(text)
    }

    fn push(&mut self, line: usize, indent: usize, text: String) {
        let rel = indent.saturating_sub(self.base_indent);
        self.content_lines.push(format!("{}{}", " ".repeat(rel), text));
        self.prev_text = text.clone();
        self.fragments.push((line, text));
    }

    fn finish(self) -> CodeBlock {
        CodeBlock {
            line: self.first_line,
            tag: self.tag,
            content: self.content_lines.join("\n"),
            raw_fragments: self.fragments,
        }
    }
}

/// True when `code` ends with punctuation implying the construct is not
/// finished: a trailing colon for the indentation-based native language,
/// or an unfinished bracket/continuation in any language.
fn opens_construct(tag: LanguageTag, code: &str) -> bool {
    let trimmed = code.trim_end();
    let Some(last) = trimmed.chars().last() else {
        return false;
    };
    match last {
        '{' | '(' | '[' | ',' | '\\' => true,
        ':' => tag.is_native(),
        _ => false,
    }
}

/// True when `code` is nothing but closing brackets and semicolons. A
/// lone `}` or `});` line belongs to the construct above it, whatever
/// its indentation.
fn closes_construct(code: &str) -> bool {
    let trimmed = code.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| matches!(c, '}' | ')' | ']' | ';'))
}

impl BlockAssembler {
    /// Assembles classified lines into code blocks, in source order
    pub fn assemble(lines: &[Line]) -> Vec<CodeBlock> {
        let mut blocks = Vec::new();
        let mut open: Option<OpenBlock> = None;

        for line in lines {
            match &line.kind {
                LineKind::Code { tag, indent, text } => {
                    match open.take() {
                        Some(mut cur) if cur.tag == *tag && cur.continues(*indent, text) => {
                            cur.push(line.number, *indent, text.clone());
                            open = Some(cur);
                        }
                        prev => {
                            if let Some(done) = prev {
                                blocks.push(done.finish());
                            }
                            open = Some(OpenBlock::start(*tag, line.number, *indent, text.clone()));
                        }
                    }
                }
                // Any non-code line is a block boundary.
                LineKind::Blank | LineKind::Comment | LineKind::Directive { .. } => {
                    if let Some(done) = open.take() {
                        blocks.push(done.finish());
                    }
                }
            }
        }

        if let Some(done) = open {
            blocks.push(done.finish());
        }

        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::LineScanner;

    fn assemble(source: &str) -> Vec<CodeBlock> {
        let lines = LineScanner::new(source).scan_lines().unwrap();
        BlockAssembler::assemble(&lines)
    }

    #[test]
    fn test_single_line_blocks() {
        let blocks = assemble("py.x = 1\npy.y = 2");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].content, "x = 1");
        assert_eq!(blocks[1].content, "y = 2");
    }

    #[test]
    fn test_indented_function_body_forms_one_block() {
        let source = "py.def f(x):\n    py.y = x * 2\n    py.return y\npy.z = f(3)";
        let blocks = assemble(source);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].content, "def f(x):\n    y = x * 2\n    return y");
        assert_eq!(blocks[0].line, 1);
        assert_eq!(blocks[0].raw_fragments.len(), 3);
        assert_eq!(blocks[1].content, "z = f(3)");
        assert_eq!(blocks[1].line, 4);
    }

    #[test]
    fn test_trailing_comma_continues_at_same_indent() {
        let source = "py.items = [1,\npy.2, 3]";
        let blocks = assemble(source);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "items = [1,\n2, 3]");
    }

    #[test]
    fn test_tag_change_ends_block() {
        let source = "py.def f():\n    py.return 1\ncpp.printf(\"hi\");";
        let blocks = assemble(source);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].tag, LanguageTag::Py);
        assert_eq!(blocks[1].tag, LanguageTag::Cpp);
    }

    #[test]
    fn test_blank_line_ends_block() {
        let source = "py.total = [1,\n\npy.x = 2";
        let blocks = assemble(source);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_comment_line_ends_block() {
        let source = "py.def f():\n// interruption\n    py.x = 1";
        let blocks = assemble(source);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_brace_continuation_for_cpp() {
        let source = "cpp.for (int i = 0; i < 3; i++) {\n    cpp.printf(\"%d\", i);\ncpp.}";
        let blocks = assemble(source);
        // The closing `}` rejoins the block even at base indent.
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].raw_fragments.len(), 3);
        assert_eq!(
            blocks[0].content,
            "for (int i = 0; i < 3; i++) {\n    printf(\"%d\", i);\n}"
        );
    }

    #[test]
    fn test_code_after_closing_brace_starts_new_block() {
        let source = "js.function f() {\n    js.return 1;\njs.}\njs.f()";
        let blocks = assemble(source);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].content.ends_with("}"));
        assert_eq!(blocks[1].content, "f()");
    }

    #[test]
    fn test_relative_indentation_preserved() {
        let source = "py.if a:\n    py.if b:\n        py.x = 1";
        let blocks = assemble(source);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "if a:\n    if b:\n        x = 1");
    }
}
