//! Core parser infrastructure: token cursor, node ids, error reporting.

use lox_lexer::token::{Token, TokenKind};
use lox_types::ast::{Expr, ExprId, ExprKind, Ident, Program};
use lox_types::{Diagnostics, ErrorCode, LoxError, SourceFile, Span};

/// The Lox parser.
///
/// Consumes a token stream produced by the lexer and builds an AST.
/// Collects errors and resynchronises at statement boundaries.
pub struct Parser<'src> {
    /// The token stream.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Source file for error context.
    source_file: &'src SourceFile,
    /// Collected errors.
    errors: Diagnostics,
    /// Id handed to the next expression node.
    next_id: u32,
}

/// Result of parsing.
pub struct ParseResult {
    /// Every declaration that parsed cleanly. Declarations that failed
    /// are dropped after recovery, so this is only safe to run when
    /// `errors` is empty.
    pub program: Program,
    pub errors: Diagnostics,
    /// The first id not used by `program`. Feed it back through
    /// [`Parser::with_id_base`] to keep ids unique across parses.
    pub next_id: u32,
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and source file.
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self::with_id_base(tokens, source_file, 0)
    }

    /// Like [`Parser::new`], numbering expressions from `first_id`.
    pub fn with_id_base(tokens: Vec<Token>, source_file: &'src SourceFile, first_id: u32) -> Self {
        let mut tokens = tokens;
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span).unwrap_or(Span::point(1, 1));
            tokens.push(Token::new(TokenKind::Eof, end));
        }
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: Diagnostics::empty(),
            next_id: first_id,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.at_end() {
            self.pos += 1;
        }
        token
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            Span::point(1, 1)
        }
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind, e.g. `expect(&Semicolon, "after value")`
    /// reports `Expect ';' after value.` on a mismatch.
    pub(crate) fn expect(&mut self, expected: &TokenKind, context: &str) -> Option<Token> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::EXPECTED_TOKEN,
                format!("Expect '{expected}' {context}."),
            );
            None
        }
    }

    /// Expect an identifier token, describing it as `what` on failure.
    pub(crate) fn expect_identifier(&mut self, what: &str) -> Option<Ident> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ => {
                self.error_at_current(ErrorCode::EXPECTED_TOKEN, format!("Expect {what}."));
                None
            }
        }
    }

    // ── Node Construction ─────────────────────────────────────────────────────

    /// Build an expression node with a fresh id.
    pub(crate) fn expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        Expr::new(id, kind, span)
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report an error at the current token position.
    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let token = self.peek();
        let span = token.span;
        let message = match token.kind {
            TokenKind::Eof => format!("{} (at end)", message.into()),
            _ => message.into(),
        };
        self.error_at(code, message, span);
    }

    /// Report an error at a specific span.
    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let error = LoxError::at(self.source_file, code, message, span);
        self.errors.push_error(error);
    }

    /// Returns `true` if we've hit the error limit and should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.total_errors >= lox_types::MAX_ERRORS
    }

    // ── Synchronization ───────────────────────────────────────────────────────

    /// Skip tokens until just past a `;` or just before a keyword that
    /// starts a declaration or statement.
    pub(crate) fn synchronize(&mut self) {
        if self.at_end() {
            return;
        }
        let first = self.advance();
        if first.kind == TokenKind::Semicolon {
            return;
        }
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a `Program` AST.
    pub fn parse(mut self) -> ParseResult {
        let start = self.current_span();
        let mut stmts = Vec::new();
        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if let Some(stmt) = self.parse_declaration() {
                stmts.push(stmt);
            }
        }
        let span = start.merge(self.current_span());
        ParseResult {
            program: Program { stmts, span },
            errors: self.errors,
            next_id: self.next_id,
        }
    }
}
