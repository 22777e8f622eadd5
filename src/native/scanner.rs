//! Tokenizer for the native language
//!
//! Line-oriented: indentation is tracked with a stack and surfaced as
//! `Indent`/`Dedent` tokens, and logical lines end with `Newline`.
//! Inside brackets lines join implicitly, as in Python.

use crate::error::{Error, Result};
use crate::native::token::{Token, TokenKind};

/// Tokenizes native source into a flat token stream
pub struct Scanner<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    indents: Vec<usize>,
    bracket_depth: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner over native block content
    pub fn new(source: &'a str) -> Self {
        Scanner {
            source,
            tokens: Vec::new(),
            indents: vec![0],
            bracket_depth: 0,
        }
    }

    /// Scans the whole input, producing tokens ending in `Eof`
    pub fn scan_tokens(mut self) -> Result<Vec<Token>> {
        for (idx, raw) in self.source.lines().enumerate() {
            let line = idx + 1;
            self.scan_line(raw, line)?;
        }

        let last_line = self.source.lines().count().max(1);
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, last_line);
        }
        self.push(TokenKind::Eof, last_line);
        Ok(self.tokens)
    }

    fn scan_line(&mut self, raw: &str, line: usize) -> Result<()> {
        let trimmed = raw.trim_start();
        // Blank and comment-only lines carry no layout information.
        if self.bracket_depth == 0 && (trimmed.is_empty() || trimmed.starts_with('#')) {
            return Ok(());
        }

        if self.bracket_depth == 0 {
            let indent = raw.len() - trimmed.len();
            self.handle_indent(indent, line)?;
        }

        self.scan_tokens_on_line(trimmed, line)?;

        if self.bracket_depth == 0 {
            self.push(TokenKind::Newline, line);
        }
        Ok(())
    }

    fn handle_indent(&mut self, indent: usize, line: usize) -> Result<()> {
        let current = *self.indents.last().unwrap_or(&0);
        if indent > current {
            self.indents.push(indent);
            self.push(TokenKind::Indent, line);
        } else if indent < current {
            while *self.indents.last().unwrap_or(&0) > indent {
                self.indents.pop();
                self.push(TokenKind::Dedent, line);
            }
            if *self.indents.last().unwrap_or(&0) != indent {
                return Err(Error::SyntaxError {
                    line,
                    message: "inconsistent indentation".to_string(),
                });
            }
        }
        Ok(())
    }

    fn scan_tokens_on_line(&mut self, text: &str, line: usize) -> Result<()> {
        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0;

        while pos < chars.len() {
            let c = chars[pos];
            match c {
                ' ' | '\t' => pos += 1,
                '#' => break,
                '\'' | '"' => pos = self.scan_string(&chars, pos, line)?,
                '0'..='9' => pos = self.scan_number(&chars, pos, line)?,
                c if c.is_alphabetic() || c == '_' => pos = self.scan_word(&chars, pos, line),
                _ => pos = self.scan_operator(&chars, pos, line)?,
            }
        }
        Ok(())
    }

    fn scan_string(&mut self, chars: &[char], start: usize, line: usize) -> Result<usize> {
        let quote = chars[start];
        let mut value = String::new();
        let mut pos = start + 1;

        while pos < chars.len() {
            match chars[pos] {
                '\\' if pos + 1 < chars.len() => {
                    value.push(match chars[pos + 1] {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' => '\\',
                        '\'' => '\'',
                        '"' => '"',
                        '0' => '\0',
                        other => other,
                    });
                    pos += 2;
                }
                c if c == quote => {
                    self.push(TokenKind::Str(value), line);
                    return Ok(pos + 1);
                }
                c => {
                    value.push(c);
                    pos += 1;
                }
            }
        }

        Err(Error::SyntaxError {
            line,
            message: "unterminated string literal".to_string(),
        })
    }

    fn scan_number(&mut self, chars: &[char], start: usize, line: usize) -> Result<usize> {
        let mut pos = start;
        let mut is_float = false;

        while pos < chars.len() {
            match chars[pos] {
                '0'..='9' => pos += 1,
                '.' if !is_float
                    && pos + 1 < chars.len()
                    && chars[pos + 1].is_ascii_digit() =>
                {
                    is_float = true;
                    pos += 1;
                }
                _ => break,
            }
        }

        let text: String = chars[start..pos].iter().collect();
        let kind = if is_float {
            TokenKind::Float(text.parse().map_err(|_| Error::SyntaxError {
                line,
                message: format!("invalid float literal '{}'", text),
            })?)
        } else {
            TokenKind::Int(text.parse().map_err(|_| Error::SyntaxError {
                line,
                message: format!("invalid integer literal '{}'", text),
            })?)
        };
        self.push(kind, line);
        Ok(pos)
    }

    fn scan_word(&mut self, chars: &[char], start: usize, line: usize) -> usize {
        let mut pos = start;
        while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
            pos += 1;
        }
        let word: String = chars[start..pos].iter().collect();
        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Name(word));
        self.push(kind, line);
        pos
    }

    fn scan_operator(&mut self, chars: &[char], pos: usize, line: usize) -> Result<usize> {
        let c = chars[pos];
        let next = chars.get(pos + 1).copied();

        let (kind, len) = match (c, next) {
            ('*', Some('*')) => (TokenKind::DoubleStar, 2),
            ('/', Some('/')) => (TokenKind::DoubleSlash, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::LtEq, 2),
            ('>', Some('=')) => (TokenKind::GtEq, 2),
            ('+', Some('=')) => (TokenKind::PlusAssign, 2),
            ('-', Some('=')) => (TokenKind::MinusAssign, 2),
            ('*', Some('=')) => (TokenKind::StarAssign, 2),
            ('/', Some('=')) => (TokenKind::SlashAssign, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('=', _) => (TokenKind::Assign, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('(', _) => {
                self.bracket_depth += 1;
                (TokenKind::LParen, 1)
            }
            (')', _) => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                (TokenKind::RParen, 1)
            }
            ('[', _) => {
                self.bracket_depth += 1;
                (TokenKind::LBracket, 1)
            }
            (']', _) => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                (TokenKind::RBracket, 1)
            }
            ('{', _) => {
                self.bracket_depth += 1;
                (TokenKind::LBrace, 1)
            }
            ('}', _) => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                (TokenKind::RBrace, 1)
            }
            (',', _) => (TokenKind::Comma, 1),
            (':', _) => (TokenKind::Colon, 1),
            ('.', _) => (TokenKind::Dot, 1),
            _ => {
                return Err(Error::SyntaxError {
                    line,
                    message: format!("unexpected character '{}'", c),
                })
            }
        };

        self.push(kind, line);
        Ok(pos + len)
    }

    fn push(&mut self, kind: TokenKind, line: usize) {
        self.tokens.push(Token { kind, line });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .scan_tokens()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            kinds("x = 42"),
            vec![
                TokenKind::Name("x".to_string()),
                TokenKind::Assign,
                TokenKind::Int(42),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_indent_dedent_pairing() {
        let toks = kinds("if x:\n    y = 1\nz = 2");
        let indents = toks.iter().filter(|k| **k == TokenKind::Indent).count();
        let dedents = toks.iter().filter(|k| **k == TokenKind::Dedent).count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn test_trailing_dedents_at_eof() {
        let toks = kinds("def f():\n    if x:\n        return 1");
        let dedents = toks.iter().filter(|k| **k == TokenKind::Dedent).count();
        assert_eq!(dedents, 2);
        assert_eq!(toks.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn test_implicit_line_joining_in_brackets() {
        let toks = kinds("x = [1,\n     2]");
        let newlines = toks.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
        assert!(!toks.contains(&TokenKind::Indent));
    }

    #[test]
    fn test_string_escapes() {
        assert!(kinds("s = 'a\\nb'").contains(&TokenKind::Str("a\nb".to_string())));
    }

    #[test]
    fn test_two_char_operators() {
        let toks = kinds("a // b ** c != d");
        assert!(toks.contains(&TokenKind::DoubleSlash));
        assert!(toks.contains(&TokenKind::DoubleStar));
        assert!(toks.contains(&TokenKind::NotEq));
    }

    #[test]
    fn test_unterminated_string_is_syntax_error() {
        let err = Scanner::new("s = 'oops").scan_tokens().unwrap_err();
        assert!(matches!(err, Error::SyntaxError { line: 1, .. }));
    }

    #[test]
    fn test_comment_lines_skipped() {
        let toks = kinds("# heading\nx = 1  # trailing");
        let newlines = toks.iter().filter(|k| **k == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }
}
