//! Recursive-descent parser for the native language
//!
//! Consumes the scanner's token stream, using `Indent`/`Dedent` tokens
//! to delimit suites. Augmented assignments (`+=` and friends) are
//! desugared into plain assignments during parsing.

use crate::error::{Error, Result};
use crate::native::ast::{BinOp, BoolOp, CmpOp, Expr, Module, Stmt, Target, UnaryOp};
use crate::native::scanner::Scanner;
use crate::native::token::{Token, TokenKind};

/// Parses native block content into a [`Module`]
pub fn parse(source: &str) -> Result<Module> {
    let tokens = Scanner::new(source).scan_tokens()?;
    Parser::new(tokens).parse_module()
}

/// Parses a single expression, as used by placeholder resolution
pub fn parse_expression(source: &str) -> Result<Expr> {
    let tokens = Scanner::new(source).scan_tokens()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.expression()?;
    parser.eat(TokenKind::Newline);
    parser.expect(TokenKind::Eof)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn parse_module(mut self) -> Result<Module> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        Ok(Module { body })
    }

    // --- statements ---

    fn statement(&mut self) -> Result<Stmt> {
        match &self.peek().kind {
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Def => self.def_statement(),
            _ => {
                let stmt = self.simple_statement()?;
                self.end_of_statement()?;
                Ok(stmt)
            }
        }
    }

    fn simple_statement(&mut self) -> Result<Stmt> {
        let line = self.peek().line;
        match &self.peek().kind {
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Newline) || self.check(&TokenKind::Eof) {
                    None
                } else {
                    Some(self.expression()?)
                };
                Ok(Stmt::Return { value, line })
            }
            TokenKind::Import => self.import_statement(line),
            TokenKind::Break => {
                self.advance();
                Ok(Stmt::Break)
            }
            TokenKind::Continue => {
                self.advance();
                Ok(Stmt::Continue)
            }
            TokenKind::Pass => {
                self.advance();
                Ok(Stmt::Pass)
            }
            _ => self.expr_or_assignment(line),
        }
    }

    fn import_statement(&mut self, line: usize) -> Result<Stmt> {
        self.advance();
        let module = self.dotted_name()?;
        let alias = if self.eat(TokenKind::As) {
            Some(self.name()?)
        } else {
            None
        };
        Ok(Stmt::Import {
            module,
            alias,
            line,
        })
    }

    fn dotted_name(&mut self) -> Result<String> {
        let mut name = self.name()?;
        while self.eat(TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.name()?);
        }
        Ok(name)
    }

    fn expr_or_assignment(&mut self, line: usize) -> Result<Stmt> {
        let expr = self.expression()?;

        let aug = match &self.peek().kind {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(BinOp::Add),
            TokenKind::MinusAssign => Some(BinOp::Sub),
            TokenKind::StarAssign => Some(BinOp::Mul),
            TokenKind::SlashAssign => Some(BinOp::Div),
            _ => return Ok(Stmt::Expr { value: expr, line }),
        };
        self.advance();

        let target = match &expr {
            Expr::Name(name) => Target::Name(name.clone()),
            Expr::Index { value, index } => Target::Index {
                value: (**value).clone(),
                index: (**index).clone(),
            },
            _ => {
                return Err(Error::SyntaxError {
                    line,
                    message: "invalid assignment target".to_string(),
                })
            }
        };

        let rhs = self.expression()?;
        let value = match aug {
            Some(op) => Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(rhs),
            },
            None => rhs,
        };

        Ok(Stmt::Assign {
            target,
            value,
            line,
        })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.advance();
        let mut branches = vec![(self.expression()?, self.suite()?)];
        let mut else_body = Vec::new();

        loop {
            if self.eat(TokenKind::Elif) {
                branches.push((self.expression()?, self.suite()?));
            } else if self.eat(TokenKind::Else) {
                else_body = self.suite()?;
                break;
            } else {
                break;
            }
        }

        Ok(Stmt::If {
            branches,
            else_body,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.advance();
        let cond = self.expression()?;
        let body = self.suite()?;
        Ok(Stmt::While { cond, body })
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.advance();
        let var = self.name()?;
        self.expect(TokenKind::In)?;
        let iter = self.expression()?;
        let body = self.suite()?;
        Ok(Stmt::For { var, iter, body })
    }

    fn def_statement(&mut self) -> Result<Stmt> {
        let line = self.peek().line;
        self.advance();
        let name = self.name()?;

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.name()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = self.suite()?;
        Ok(Stmt::FunctionDef {
            name,
            params,
            body,
            line,
        })
    }

    /// Parses `: NEWLINE INDENT stmt+ DEDENT`, or an inline simple
    /// statement after the colon.
    fn suite(&mut self) -> Result<Vec<Stmt>> {
        self.expect(TokenKind::Colon)?;

        if !self.eat(TokenKind::Newline) {
            let line = self.peek().line;
            let stmt = self.simple_statement()?;
            self.end_of_statement().map_err(|_| Error::SyntaxError {
                line,
                message: "expected end of line after inline statement".to_string(),
            })?;
            return Ok(vec![stmt]);
        }

        self.expect(TokenKind::Indent)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.check(&TokenKind::Eof) {
            body.push(self.statement()?);
        }
        self.eat(TokenKind::Dedent);
        Ok(body)
    }

    fn end_of_statement(&mut self) -> Result<()> {
        if self.eat(TokenKind::Newline) || self.check(&TokenKind::Eof) {
            return Ok(());
        }
        let token = self.peek();
        Err(Error::SyntaxError {
            line: token.line,
            message: format!("unexpected {}", token.kind.describe()),
        })
    }

    // --- expressions, by descending precedence ---

    fn expression(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        while self.eat(TokenKind::Or) {
            let right = self.and_expr()?;
            left = Expr::BoolOp {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.not_expr()?;
        while self.eat(TokenKind::And) {
            let right = self.not_expr()?;
            left = Expr::BoolOp {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr> {
        if self.eat(TokenKind::Not) {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.additive()?;
        let op = match &self.peek().kind {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::NotEq,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::LtEq => CmpOp::LtEq,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::GtEq => CmpOp::GtEq,
            TokenKind::In => CmpOp::In,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.additive()?;
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match &self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(TokenKind::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.postfix()?;
        if self.eat(TokenKind::DoubleStar) {
            // Right-associative.
            let exp = self.unary()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exp),
            });
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.atom()?;
        loop {
            expr = match &self.peek().kind {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    Expr::Call {
                        func: Box::new(expr),
                        args,
                    }
                }
                TokenKind::Dot => {
                    self.advance();
                    let attr = self.name()?;
                    Expr::Attribute {
                        value: Box::new(expr),
                        attr,
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    Expr::Index {
                        value: Box::new(expr),
                        index: Box::new(index),
                    }
                }
                _ => return Ok(expr),
            };
        }
    }

    fn atom(&mut self) -> Result<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Int(n))
            }
            TokenKind::Float(x) => {
                self.advance();
                Ok(Expr::Float(x))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::None)
            }
            TokenKind::Name(name) => {
                self.advance();
                Ok(Expr::Name(name))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.list_literal(),
            TokenKind::LBrace => self.dict_literal(),
            other => Err(Error::SyntaxError {
                line: token.line,
                message: format!("unexpected {}", other.describe()),
            }),
        }
    }

    fn list_literal(&mut self) -> Result<Expr> {
        self.advance();
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            items.push(self.expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::List(items))
    }

    fn dict_literal(&mut self) -> Result<Expr> {
        self.advance();
        let mut pairs = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = self.expression()?;
            self.expect(TokenKind::Colon)?;
            let value = self.expression()?;
            pairs.push((key, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Dict(pairs))
    }

    // --- token helpers ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let token = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(Error::SyntaxError {
                line: token.line,
                message: format!(
                    "expected {}, found {}",
                    kind.describe(),
                    token.kind.describe()
                ),
            })
        }
    }

    fn name(&mut self) -> Result<String> {
        let token = self.peek().clone();
        if let TokenKind::Name(name) = token.kind {
            self.advance();
            Ok(name)
        } else {
            Err(Error::SyntaxError {
                line: token.line,
                message: format!("expected name, found {}", token.kind.describe()),
            })
        }
    }
}
