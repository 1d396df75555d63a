/// Recursive descent parser for Pal
use crate::ast::{Binding, Expr, FnKind, Id, Program, SourceLoc};
use crate::parser::lexer::{Lexer, Token, TokenKind};
use log::trace;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Parse error at {}:{}: {message}", .line + 1, .column + 1)]
pub struct ParseError {
    pub message: String,
    /// 0-based
    pub line: usize,
    /// 0-based
    pub column: usize,
}

impl ParseError {
    pub fn loc(&self) -> SourceLoc {
        SourceLoc::new(self.line, self.column)
    }
}

pub const MAX_NESTING_DEPTH: usize = 256;

/// One parameter as written, before the body kind is known
enum Param {
    /// `x: T`, `x:` or `:T`
    Explicit { id: Option<Id>, ty: Option<Expr> },
    /// A lone expression: the type of a Pi or the name of a lambda argument
    Ambiguous(Expr),
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    nesting_depth: usize,
    /// Counter for `_N` hole names, reset for every top-level expression
    holes: usize,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self::from_tokens(Lexer::new(input).tokenize())
    }

    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let (line, column) = tokens
                .last()
                .map(|t| (t.line, t.column + t.lexeme.chars().count()))
                .unwrap_or((0, 0));
            tokens.push(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                line,
                column,
            });
        }
        Parser {
            tokens,
            current: 0,
            nesting_depth: 0,
            holes: 0,
        }
    }

    /// Helper: Create SourceLoc from current token
    fn current_loc(&self) -> SourceLoc {
        let token = self.peek();
        SourceLoc::new(token.line, token.column)
    }

    /// Parse modules of bindings; a run of `-` tokens starts a new module
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut program = vec![Vec::new()];

        while !self.is_at_end() {
            if self.check(TokenKind::Dash) {
                while self.check(TokenKind::Dash) {
                    self.advance();
                }
                program.push(Vec::new());
                continue;
            }
            let binding = self.parse_binding()?;
            if let Some(module) = program.last_mut() {
                module.push(binding);
            }
        }

        trace!("parsed {} module(s)", program.len());
        Ok(program)
    }

    /// Parse the whole input as a single expression
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_top_expr()?;
        if !self.is_at_end() {
            return Err(self.error(&format!(
                "Unexpected token '{}' after expression",
                self.peek().lexeme
            )));
        }
        Ok(expr)
    }

    fn parse_binding(&mut self) -> Result<Binding, ParseError> {
        let id = self.consume_ident("Expected binding name")?;

        let ty = if self.check(TokenKind::Colon) {
            self.advance();
            Some(self.parse_top_expr()?)
        } else {
            None
        };

        let value = if self.check(TokenKind::Equals) {
            self.advance();
            Some(self.parse_top_expr()?)
        } else {
            None
        };

        Ok(Binding { id, ty, value })
    }

    fn parse_top_expr(&mut self) -> Result<Expr, ParseError> {
        self.holes = 0;
        self.parse_expr()
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.enter_nesting()?;
        let result = self.parse_expr_inner();
        self.exit_nesting();
        result
    }

    fn parse_expr_inner(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_loc();
        let head = match self.peek().kind {
            TokenKind::Underscore => {
                self.advance();
                self.fresh_hole(loc)
            }
            TokenKind::LeftParen | TokenKind::LeftAngle => {
                let implicit = self.check(TokenKind::LeftAngle);
                self.advance();
                self.parse_fn(implicit, loc)?.0
            }
            TokenKind::Ident => {
                let id = self.advance().lexeme.clone();
                Expr::Var { id, loc: Some(loc) }
            }
            TokenKind::Eof => return Err(self.error("Unexpected end of input")),
            _ => {
                let lexeme = self.peek().lexeme.clone();
                return Err(self.error(&format!("Unexpected token '{lexeme}'")));
            }
        };

        self.parse_applications(head)
    }

    /// `f(a, b)<c>`: each argument list applies left to right
    fn parse_applications(&mut self, mut func: Expr) -> Result<Expr, ParseError> {
        while self.check(TokenKind::LeftParen) || self.check(TokenKind::LeftAngle) {
            let implicit = self.check(TokenKind::LeftAngle);
            let close = closing(implicit);
            self.advance();

            loop {
                let loc = self.current_loc();
                let arg = self.parse_expr()?;
                func = Expr::App {
                    implicit,
                    func: Box::new(func),
                    arg: Box::new(arg),
                    loc: Some(loc),
                };

                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    self.consume(close, &format!("Expected ',' or '{close}'"))?;
                    break;
                }
            }
        }
        Ok(func)
    }

    /// Parse a binder after its opening bracket
    ///
    /// Every parameter of a list becomes its own nested `Fn`; the kind
    /// of the whole chain is decided by the body bracket at the end.
    fn parse_fn(&mut self, implicit: bool, loc: SourceLoc) -> Result<(Expr, FnKind), ParseError> {
        self.enter_nesting()?;
        let result = self.parse_fn_inner(implicit, loc);
        self.exit_nesting();
        result
    }

    fn parse_fn_inner(
        &mut self,
        implicit: bool,
        loc: SourceLoc,
    ) -> Result<(Expr, FnKind), ParseError> {
        let close = closing(implicit);
        let param = self.parse_param(close)?;

        let (result, kind) = if self.check(TokenKind::Comma) {
            self.advance();
            let next = self.current_loc();
            self.parse_fn(implicit, next)?
        } else {
            self.consume(close, &format!("Expected ',' or '{close}'"))?;
            self.parse_fn_continuation(implicit)?
        };

        let (arg_id, arg_type) = match param {
            Param::Explicit { id, ty } => (id, ty),
            Param::Ambiguous(expr) => match kind {
                FnKind::Type => (None, Some(expr)),
                FnKind::Def => match expr {
                    Expr::Var { id, .. } => (Some(id), None),
                    other => {
                        let at = other.loc().unwrap_or(loc);
                        return Err(ParseError {
                            message: "Expected a parameter name".to_string(),
                            line: at.line,
                            column: at.column,
                        });
                    }
                },
            },
        };

        // Numbered after the body so inner holes come first
        let arg_type = match arg_type {
            Some(ty) => ty,
            None => self.fresh_hole(loc),
        };

        let func = Expr::Fn {
            kind,
            implicit,
            arg_id,
            arg_type: Box::new(arg_type),
            result: Box::new(result),
            loc: Some(loc),
        };
        Ok((func, kind))
    }

    /// After a closing bracket: another parameter list or the body
    fn parse_fn_continuation(&mut self, implicit: bool) -> Result<(Expr, FnKind), ParseError> {
        let loc = self.current_loc();
        match self.peek().kind {
            TokenKind::LeftParen => {
                self.advance();
                self.parse_fn(false, loc)
            }
            TokenKind::LeftAngle if implicit => {
                self.advance();
                self.parse_fn(true, loc)
            }
            TokenKind::LeftBrace => {
                self.advance();
                let body = self.parse_expr()?;
                self.consume(TokenKind::RightBrace, "Expected '}'")?;
                Ok((body, FnKind::Def))
            }
            TokenKind::LeftBracket => {
                self.advance();
                let body = self.parse_expr()?;
                self.consume(TokenKind::RightBracket, "Expected ']'")?;
                Ok((body, FnKind::Type))
            }
            _ => Err(self.error("Expected '{' or '[' after parameter list")),
        }
    }

    fn parse_param(&mut self, close: TokenKind) -> Result<Param, ParseError> {
        if self.check(TokenKind::Colon) {
            self.advance();
            let ty = self.parse_expr()?;
            return Ok(Param::Explicit {
                id: None,
                ty: Some(ty),
            });
        }

        let maybe = self.parse_expr()?;

        if self.check(TokenKind::Colon) {
            let Expr::Var { id, .. } = maybe else {
                return Err(self.error("Expected a parameter name before ':'"));
            };
            self.advance();
            let ty = if self.check(TokenKind::Comma) || self.check(close) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            Ok(Param::Explicit { id: Some(id), ty })
        } else if self.check(TokenKind::Comma) || self.check(close) {
            Ok(Param::Ambiguous(maybe))
        } else {
            let lexeme = self.peek().lexeme.clone();
            Err(self.error(&format!("Unexpected token '{lexeme}' in parameter list")))
        }
    }

    fn fresh_hole(&mut self, loc: SourceLoc) -> Expr {
        let id = format!("_{}", self.holes);
        self.holes += 1;
        Expr::Var { id, loc: Some(loc) }
    }

    // Helper methods

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    fn check(&self, kind: TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().kind == kind
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn consume_ident(&mut self, message: &str) -> Result<String, ParseError> {
        if self.peek().kind == TokenKind::Ident {
            let lexeme = self.peek().lexeme.clone();
            self.advance();
            Ok(lexeme)
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> ParseError {
        let token = self.peek();
        ParseError {
            message: message.to_string(),
            line: token.line,
            column: token.column,
        }
    }

    fn enter_nesting(&mut self) -> Result<(), ParseError> {
        self.nesting_depth += 1;
        if self.nesting_depth > MAX_NESTING_DEPTH {
            Err(ParseError {
                message: format!("Maximum nesting depth of {} exceeded", MAX_NESTING_DEPTH),
                line: self.peek().line,
                column: self.peek().column,
            })
        } else {
            Ok(())
        }
    }

    fn exit_nesting(&mut self) {
        self.nesting_depth = self.nesting_depth.saturating_sub(1);
    }
}

fn closing(implicit: bool) -> TokenKind {
    if implicit {
        TokenKind::RightAngle
    } else {
        TokenKind::RightParen
    }
}

/// Parse a token stream into a program
pub fn parse_program(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::from_tokens(tokens).parse()
}

/// Parse a token stream holding exactly one expression
pub fn parse_expr(tokens: Vec<Token>) -> Result<Expr, ParseError> {
    Parser::from_tokens(tokens).parse_expression()
}
