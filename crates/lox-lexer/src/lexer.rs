//! Core Lox lexer: converts source text to a token stream.
//!
//! Features:
//! - All Lox tokens (16 reserved words, operators, punctuation, literals)
//! - Single-line comments stripped (`//`)
//! - Multi-line string literals, no escape sequences
//! - Error recovery: reports the bad character or string and keeps scanning

use lox_types::{Diagnostics, ErrorCode, LoxError, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// The Lox lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting errors
/// along the way instead of stopping at the first one.
pub struct Lexer<'src> {
    /// The full source text.
    text: &'src str,
    /// The same text as bytes, for cheap peeking.
    source: &'src [u8],
    /// Source file for error reporting.
    source_file: &'src SourceFile,
    /// Byte offset where the current token starts.
    start: usize,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
    errors: Diagnostics,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: Diagnostics,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            text: &source_file.source,
            source: source_file.source.as_bytes(),
            source_file,
            start: 0,
            pos: 0,
            line: 1,
            col: 1,
            errors: Diagnostics::empty(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if !is_utf8_continuation(ch) {
            self.col += 1;
        }
        Some(ch)
    }

    /// Consume the next byte if it equals `expected`.
    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn lexeme(&self) -> &'src str {
        &self.text[self.start..self.pos]
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let err = LoxError::at(self.source_file, code, message, span);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace (newlines included) and `//` comments.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.advance();
                }
                b'/' if self.peek_at(1) == Some(b'/') => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    fn scan_token(&mut self) -> Token {
        loop {
            self.skip_trivia();
            self.start = self.pos;
            let start_line = self.line;
            let start_col = self.col;

            let Some(ch) = self.advance() else {
                return Token::new(TokenKind::Eof, Span::point(self.line, self.col));
            };

            let kind = match ch {
                b'(' => TokenKind::LParen,
                b')' => TokenKind::RParen,
                b'{' => TokenKind::LBrace,
                b'}' => TokenKind::RBrace,
                b',' => TokenKind::Comma,
                b'.' => TokenKind::Dot,
                b'-' => TokenKind::Minus,
                b'+' => TokenKind::Plus,
                b';' => TokenKind::Semicolon,
                b'*' => TokenKind::Star,
                b'/' => TokenKind::Slash,
                b'!' if self.eat(b'=') => TokenKind::BangEq,
                b'!' => TokenKind::Bang,
                b'=' if self.eat(b'=') => TokenKind::EqEq,
                b'=' => TokenKind::Eq,
                b'<' if self.eat(b'=') => TokenKind::LessEq,
                b'<' => TokenKind::Less,
                b'>' if self.eat(b'=') => TokenKind::GreaterEq,
                b'>' => TokenKind::Greater,
                b'"' => match self.scan_string(start_line, start_col) {
                    Some(kind) => kind,
                    None => continue,
                },
                b'0'..=b'9' => self.scan_number(),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),
                _ => {
                    self.unexpected_character(start_line, start_col);
                    // Error recovery: skip the character and try again
                    continue;
                }
            };
            return Token::new(kind, self.span_from(start_line, start_col));
        }
    }

    fn unexpected_character(&mut self, start_line: u32, start_col: u32) {
        // Swallow the rest of a multi-byte character so the next token
        // starts on a char boundary.
        while self.peek().is_some_and(is_utf8_continuation) {
            self.advance();
        }
        let ch = self.lexeme().chars().next().unwrap_or('\u{FFFD}');
        let span = self.span_from(start_line, start_col);
        self.emit_error(
            ErrorCode::UNEXPECTED_CHARACTER,
            format!("Unexpected character '{ch}'."),
            span,
        );
    }

    /// Digits with an optional fractional part. A trailing `.` is left
    /// for the parser (`123.foo` is a property access).
    fn scan_number(&mut self) -> TokenKind {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }
        // Only ASCII digits and one dot reach here, so parsing cannot fail.
        TokenKind::Number(self.lexeme().parse().unwrap_or(0.0))
    }

    fn scan_identifier(&mut self) -> TokenKind {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
        let text = self.lexeme();
        TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()))
    }

    /// Scan the rest of a string literal after its opening `"`.
    ///
    /// Returns `None` (after reporting) when the file ends first.
    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Option<TokenKind> {
        while self.peek().is_some_and(|c| c != b'"') {
            self.advance();
        }
        if self.at_end() {
            let span = self.span_from(start_line, start_col);
            self.emit_error(ErrorCode::UNTERMINATED_STRING, "Unterminated string.", span);
            return None;
        }
        self.advance(); // closing quote
        let text = self.lexeme();
        Some(TokenKind::String(text[1..text.len() - 1].to_string()))
    }
}

fn is_utf8_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}
