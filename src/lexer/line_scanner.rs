use super::token::{Line, LineKind};
use crate::error::{Error, Result};
use crate::parser::LanguageTag;

/// Scanner for line-tagged fusion source
pub struct LineScanner<'a> {
    /// Source lines, split on `\n`
    lines: Vec<&'a str>,
    /// Whether the scanner is inside a `/* ... */` span
    in_block_comment: bool,
}

impl<'a> LineScanner<'a> {
    /// Creates a new scanner from source text
    pub fn new(source: &'a str) -> Self {
        LineScanner {
            lines: source.lines().collect(),
            in_block_comment: false,
        }
    }

    /// Classifies every source line
    pub fn scan_lines(&mut self) -> Result<Vec<Line>> {
        let mut out = Vec::with_capacity(self.lines.len());

        // Indexed loop: classify needs `&mut self` for the block-comment
        // state.
        for idx in 0..self.lines.len() {
            let raw = self.lines[idx];
            let number = idx + 1;
            let kind = self.classify(raw, number)?;
            out.push(Line::new(number, kind));
        }

        Ok(out)
    }

    fn classify(&mut self, raw: &str, number: usize) -> Result<LineKind> {
        let trimmed = raw.trim();

        if self.in_block_comment {
            // Anything after the terminator on the same line is ignored;
            // the format treats comment lines as whole-line.
            if trimmed.contains("*/") {
                self.in_block_comment = false;
            }
            return Ok(LineKind::Comment);
        }

        if trimmed.is_empty() {
            return Ok(LineKind::Blank);
        }

        if trimmed.starts_with("//") {
            return Ok(LineKind::Comment);
        }

        if trimmed.starts_with("/*") {
            if !trimmed[2..].contains("*/") {
                self.in_block_comment = true;
            }
            return Ok(LineKind::Comment);
        }

        if trimmed.starts_with('#') {
            return self.scan_directive(trimmed, number);
        }

        self.scan_code(raw, number)
    }

    /// Parses `#name "value"`, allowing a trailing `//` comment after the
    /// closing quote.
    fn scan_directive(&self, trimmed: &str, number: usize) -> Result<LineKind> {
        let body = &trimmed[1..];
        let name: String = body
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();

        if name.is_empty() {
            return Err(Error::SyntaxError {
                line: number,
                message: "directive name expected after '#'".to_string(),
            });
        }

        let rest = body[name.len()..].trim_start();
        if !rest.starts_with('"') {
            return Err(Error::SyntaxError {
                line: number,
                message: format!("directive '{}' value must be a double-quoted string", name),
            });
        }

        let value_body = &rest[1..];
        let Some(end) = value_body.find('"') else {
            return Err(Error::SyntaxError {
                line: number,
                message: format!("unterminated string in directive '{}'", name),
            });
        };

        let value = value_body[..end].to_string();
        let tail = value_body[end + 1..].trim();
        if !tail.is_empty() && !tail.starts_with("//") {
            return Err(Error::SyntaxError {
                line: number,
                message: format!("unexpected text after directive '{}' value", name),
            });
        }

        Ok(LineKind::Directive { name, value })
    }

    /// Parses `<tag>.<code>`, recording the tag column as the line indent.
    fn scan_code(&self, raw: &str, number: usize) -> Result<LineKind> {
        let indent = raw.chars().take_while(|c| c.is_whitespace()).count();
        let rest: String = raw.chars().skip(indent).collect();

        let tag_text: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();

        if tag_text.is_empty() || !rest[tag_text.len()..].starts_with('.') {
            return Err(Error::SyntaxError {
                line: number,
                message: format!("unparseable line: '{}'", raw.trim()),
            });
        }

        let Some(tag) = LanguageTag::parse(&tag_text) else {
            return Err(Error::UnknownLanguage {
                tag: tag_text,
                line: number,
            });
        };

        let text = rest[tag_text.len() + 1..].to_string();
        Ok(LineKind::Code { tag, indent, text })
    }
}
