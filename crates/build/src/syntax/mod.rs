//! Front end for the pass DSL
//!
//! A hand-written lexer feeds two recursive-descent parsers: one for pass files,
//! producing an immutable [`ast::PassFile`], and one for the frame graph ordering
//! file, producing the ordered list of pass names. Neither parser recovers from
//! errors; the first problem is reported with its line and column.

pub mod ast;
mod frame_graph_parser;
mod lexer;
mod pass_parser;

pub use frame_graph_parser::parse_frame_graph;
pub use lexer::{Lexer, Span, Token, TokenKind, Tokens};
pub use pass_parser::parse_pass;

/// Grammar error with the position it was detected at
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, col {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { line, column, message: message.into() }
    }

    pub fn at(span: Span, message: impl Into<String>) -> Self {
        Self::new(span.line, span.column, message)
    }
}

/// Read position over a token list
pub(crate) struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
    eof: Span,
}

impl<'t> Cursor<'t> {
    pub fn new(tokens: &'t Tokens) -> Self {
        Self { tokens: &tokens.tokens, pos: 0, eof: tokens.eof }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    pub fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Span of the next token, or the end of input
    pub fn span(&self) -> Span {
        self.peek().map_or(self.eof, |t| t.span)
    }

    /// Span of the most recently consumed token
    pub fn prev_span(&self) -> Span {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)).map_or(self.eof, |t| t.span)
    }

    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::at(self.span(), message)
    }

    /// Describes the next token for error messages
    pub fn describe_next(&self) -> String {
        match self.peek().map(|t| &t.kind) {
            None => "end of input".to_string(),
            Some(TokenKind::Ident(name)) => format!("'{name}'"),
            Some(TokenKind::Int(value)) => format!("'{value}'"),
            Some(TokenKind::Float(value)) => format!("'{value}'"),
            Some(TokenKind::Str(value)) => format!("\"{value}\""),
            Some(TokenKind::RawBlock(_)) => "raw block".to_string(),
            Some(TokenKind::Symbol(c)) => format!("'{c}'"),
        }
    }

    pub fn peek_symbol(&self, c: char) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Symbol(s), .. }) if *s == c)
    }

    pub fn eat_symbol(&mut self, c: char) -> bool {
        if self.peek_symbol(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect_symbol(&mut self, c: char) -> Result<Span, ParseError> {
        if self.eat_symbol(c) {
            Ok(self.prev_span())
        } else {
            Err(self.error(format!("expected '{c}', found {}", self.describe_next())))
        }
    }

    pub fn peek_ident(&self) -> Option<&'t str> {
        match self.peek() {
            Some(Token { kind: TokenKind::Ident(name), .. }) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn expect_ident(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Some(Token { kind: TokenKind::Ident(name), span }) => {
                self.pos += 1;
                Ok((name.clone(), *span))
            }
            _ => Err(self.error(format!("expected {what}, found {}", self.describe_next()))),
        }
    }

    pub fn expect_keyword(&mut self, keyword: &str) -> Result<Span, ParseError> {
        if self.peek_ident() == Some(keyword) {
            self.pos += 1;
            Ok(self.prev_span())
        } else {
            Err(self.error(format!("expected '{keyword}', found {}", self.describe_next())))
        }
    }

    pub fn expect_int(&mut self, what: &str) -> Result<(i64, Span), ParseError> {
        match self.peek() {
            Some(Token { kind: TokenKind::Int(value), span }) => {
                self.pos += 1;
                Ok((*value, *span))
            }
            _ => Err(self.error(format!("expected {what}, found {}", self.describe_next()))),
        }
    }

    pub fn expect_raw_block(&mut self, what: &str) -> Result<&'t Token, ParseError> {
        match self.peek() {
            Some(token @ Token { kind: TokenKind::RawBlock(_), .. }) => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error(format!("expected {what} enclosed in '<[ ]>', found {}", self.describe_next()))),
        }
    }
}
