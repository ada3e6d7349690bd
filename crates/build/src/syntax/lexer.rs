//! Tokenizer for pass and frame graph files
//!
//! Produces a flat token list with byte spans and line/column positions. Shader
//! bodies and root signature text are enclosed in `<[ ... ]>` raw blocks and are
//! kept verbatim. A raw block ends at the first `]>` whose `]` does not close a
//! `[` opened inside the block, so `arr[i]>0` stays part of the content. An
//! unbalanced `[` inside a comment or string still needs a matching `]`.

use super::ParseError;

/// Location of a token in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// 1-based line of the first character
    pub line: usize,
    /// 1-based column of the first character
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f32),
    Str(String),
    /// Content between `<[` and `]>`
    RawBlock(String),
    /// Any other single character
    Symbol(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Position of the first character inside a raw block
    pub fn raw_origin(&self) -> (usize, usize, usize) {
        (self.span.start + 2, self.span.line, self.span.column + 2)
    }
}

/// Result of tokenizing: the tokens and the position just past the input
#[derive(Debug, Clone)]
pub struct Tokens {
    pub tokens: Vec<Token>,
    pub eof: Span,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    base: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::with_origin(src, 0, 1, 1)
    }

    /// Lexer for a fragment that starts at `base` bytes, `line` and `column` of a larger file
    pub fn with_origin(src: &'a str, base: usize, line: usize, column: usize) -> Self {
        Self { src, pos: 0, base, line, column }
    }

    pub fn tokenize(mut self) -> Result<Tokens, ParseError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia()?;
            let Some(c) = self.peek() else {
                break;
            };

            let (start, line, column) = (self.pos, self.line, self.column);
            let kind = if c.is_ascii_alphabetic() || c == '_' {
                TokenKind::Ident(self.take_while(|c| c.is_ascii_alphanumeric() || c == '_').to_string())
            } else if c.is_ascii_digit() {
                self.number(line, column)?
            } else if c == '"' {
                self.string(line, column)?
            } else if c == '<' && self.peek_second() == Some('[') {
                self.raw_block(line, column)?
            } else {
                self.bump();
                TokenKind::Symbol(c)
            };

            tokens.push(Token {
                kind,
                span: Span {
                    start: self.base + start,
                    end: self.base + self.pos,
                    line,
                    column,
                },
            });
        }

        let eof = Span {
            start: self.base + self.pos,
            end: self.base + self.pos,
            line: self.line,
            column: self.column,
        };
        Ok(Tokens { tokens, eof })
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(&predicate) {
            self.bump();
        }
        &src[start..self.pos]
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    self.take_while(|c| c != '\n');
                }
                (Some('/'), Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_second()) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => return Err(ParseError::new(line, column, "unterminated block comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn number(&mut self, line: usize, column: usize) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.take_while(|c| c.is_ascii_digit());
        let is_float = self.peek() == Some('.');
        if is_float {
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }

        let text = &self.src[start..self.pos];
        if is_float {
            text.parse::<f32>()
                .map(TokenKind::Float)
                .map_err(|e| ParseError::new(line, column, format!("invalid float literal '{text}': {e}")))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|e| ParseError::new(line, column, format!("invalid integer literal '{text}': {e}")))
        }
    }

    fn string(&mut self, line: usize, column: usize) -> Result<TokenKind, ParseError> {
        self.bump();
        let content = self.take_while(|c| c != '"' && c != '\n').to_string();
        if self.bump() != Some('"') {
            return Err(ParseError::new(line, column, "unterminated string literal"));
        }
        Ok(TokenKind::Str(content))
    }

    fn raw_block(&mut self, line: usize, column: usize) -> Result<TokenKind, ParseError> {
        self.bump();
        self.bump();

        let Some(len) = raw_block_len(&self.src[self.pos..]) else {
            return Err(ParseError::new(line, column, "unterminated raw block, expected ']>'"));
        };

        let content_end = self.pos + len;
        let content = self.src[self.pos..content_end].to_string();
        while self.pos < content_end {
            self.bump();
        }
        self.bump();
        self.bump();

        Ok(TokenKind::RawBlock(content))
    }
}

/// Length of raw block content up to its closing `]>`, skipping brackets opened inside
fn raw_block_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' if depth == 0 && bytes.get(i + 1) == Some(&b'>') => return Some(i),
            b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_int_and_float_are_distinguished() {
        assert_eq!(kinds("1 1.0 0.5 1920"), vec![TokenKind::Int(1), TokenKind::Float(1.0), TokenKind::Float(0.5), TokenKind::Int(1920)]);
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = kinds("// line comment\nPassInput /* block\n comment */ : UI");
        assert_eq!(
            tokens,
            vec![TokenKind::Ident("PassInput".to_string()), TokenKind::Symbol(':'), TokenKind::Ident("UI".to_string())]
        );
    }

    #[test]
    fn test_raw_block_is_verbatim() {
        let tokens = kinds("RootSig <[ CBV(b0),\n  DescriptorTable(SRV(t0)) ]>");
        assert_eq!(tokens[1], TokenKind::RawBlock(" CBV(b0),\n  DescriptorTable(SRV(t0)) ".to_string()));
    }

    #[test]
    fn test_raw_block_keeps_indexed_comparison() {
        let tokens = kinds("Shader PS <[ if (arr[i]>0) { return 1; } ]> ShaderDefs");
        assert_eq!(tokens[2], TokenKind::RawBlock(" if (arr[i]>0) { return 1; } ".to_string()));
        assert_eq!(tokens[3], TokenKind::Ident("ShaderDefs".to_string()));
    }

    #[test]
    fn test_positions_track_lines() {
        let tokens = Lexer::new("A\n  B").tokenize().unwrap().tokens;
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 3));
        assert_eq!((tokens[1].span.start, tokens[1].span.end), (4, 5));
    }

    #[test]
    fn test_origin_offsets_positions() {
        let tokens = Lexer::with_origin("X", 10, 3, 7).tokenize().unwrap().tokens;
        assert_eq!(tokens[0].span, Span { start: 10, end: 11, line: 3, column: 7 });
    }

    #[test]
    fn test_unterminated_raw_block_reports_position() {
        let err = Lexer::new("\n  <[ never closed").tokenize().unwrap_err();
        assert_eq!((err.line, err.column), (2, 3));
    }
}
