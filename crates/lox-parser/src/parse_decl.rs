//! Declaration parsing: classes, functions, variables.
//!
//! `parse_declaration` is the recovery point of the parser. When a
//! declaration fails, the error has already been reported and the cursor
//! is resynchronised before returning `None`.

use std::rc::Rc;

use lox_lexer::token::TokenKind;
use lox_types::ast::*;
use lox_types::ErrorCode;

use crate::parser::Parser;

/// Upper bound on parameters and call arguments.
pub(crate) const MAX_ARITY: usize = 255;

impl<'src> Parser<'src> {
    /// `declaration = classDecl | funDecl | varDecl | statement`
    pub(crate) fn parse_declaration(&mut self) -> Option<Stmt> {
        let stmt = match self.peek_kind() {
            TokenKind::Class => self.parse_class_decl(),
            TokenKind::Fun => {
                self.advance(); // eat `fun`
                self.parse_function("function").map(Stmt::Function)
            }
            TokenKind::Var => self.parse_var_decl(),
            _ => self.parse_statement(),
        };
        if stmt.is_none() {
            self.synchronize();
        }
        stmt
    }

    /// `classDecl = "class" IDENT ( "<" IDENT )? "{" function* "}"`
    fn parse_class_decl(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `class`
        let name = self.expect_identifier("class name")?;

        let superclass = if self.eat(&TokenKind::Less) {
            let ident = self.expect_identifier("superclass name")?;
            let span = ident.span;
            Some(self.expr(ExprKind::Variable(ident), span))
        } else {
            None
        };

        self.expect(&TokenKind::LBrace, "before class body")?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            methods.push(self.parse_function("method")?);
        }
        self.expect(&TokenKind::RBrace, "after class body")?;

        Some(Stmt::Class(ClassDecl {
            name,
            superclass,
            methods,
            span: start.merge(self.previous_span()),
        }))
    }

    /// `function = IDENT "(" parameters? ")" block`
    ///
    /// `kind` names what is being parsed ("function" or "method") in errors.
    pub(crate) fn parse_function(&mut self, kind: &str) -> Option<Rc<FunctionDecl>> {
        let name = self.expect_identifier(&format!("{kind} name"))?;
        let start = name.span;
        self.expect(&TokenKind::LParen, &format!("after {kind} name"))?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    self.error_at_current(
                        ErrorCode::TOO_MANY_PARAMETERS,
                        format!("Can't have more than {MAX_ARITY} parameters."),
                    );
                }
                params.push(self.expect_identifier("parameter name")?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "after parameters")?;

        if !self.check(&TokenKind::LBrace) {
            self.error_at_current(
                ErrorCode::EXPECTED_TOKEN,
                format!("Expect '{{' before {kind} body."),
            );
            return None;
        }
        let body = self.parse_block()?;

        Some(Rc::new(FunctionDecl {
            name,
            params,
            body: body.stmts,
            span: start.merge(body.span),
        }))
    }

    /// `varDecl = "var" IDENT ( "=" expression )? ";"`
    pub(crate) fn parse_var_decl(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `var`
        let name = self.expect_identifier("variable name")?;
        let initializer = if self.eat(&TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&TokenKind::Semicolon, "after variable declaration")?;
        Some(Stmt::Var(VarDecl {
            name,
            initializer,
            span: start.merge(self.previous_span()),
        }))
    }
}
