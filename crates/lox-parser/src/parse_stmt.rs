//! Statement parsing.

use lox_lexer::token::TokenKind;
use lox_types::ast::*;
use lox_types::Span;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::Print => self.parse_print_stmt(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::LBrace => self.parse_block().map(Stmt::Block),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon, "after expression")?;
                let span = expr.span.merge(self.previous_span());
                Some(Stmt::Expression(ExprStmt { expr, span }))
            }
        }
    }

    /// Parse a block of declarations: `{ decls... }`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace, "before block")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if let Some(stmt) = self.parse_declaration() {
                stmts.push(stmt);
            }
        }
        self.expect(&TokenKind::RBrace, "after block")?;
        let span = start.merge(self.previous_span());
        Some(Block { stmts, span })
    }

    /// `print expr;`
    fn parse_print_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `print`
        let expr = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon, "after value")?;
        Some(Stmt::Print(PrintStmt {
            expr,
            span: start.merge(self.previous_span()),
        }))
    }

    /// `if (cond) stmt [else stmt]`
    ///
    /// A dangling `else` binds to the nearest `if`.
    fn parse_if_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `if`
        self.expect(&TokenKind::LParen, "after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "after if condition")?;
        let then_branch = self.parse_statement()?;
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Some(Stmt::If(Box::new(IfStmt {
            condition,
            then_branch,
            else_branch,
            span: start.merge(self.previous_span()),
        })))
    }

    /// `while (cond) stmt`
    fn parse_while_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `while`
        self.expect(&TokenKind::LParen, "after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "after condition")?;
        let body = self.parse_statement()?;
        Some(Stmt::While(Box::new(WhileStmt {
            condition,
            body,
            span: start.merge(self.previous_span()),
        })))
    }

    /// `for (init; cond; incr) body`, desugared into
    /// `{ init; while (cond) { body; incr; } }`.
    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `for`
        self.expect(&TokenKind::LParen, "after 'for'")?;

        let initializer = match self.peek_kind() {
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            TokenKind::Var => Some(self.parse_var_decl()?),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon, "after loop initializer")?;
                let span = expr.span;
                Some(Stmt::Expression(ExprStmt { expr, span }))
            }
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let cond_end = self.current_span();
        self.expect(&TokenKind::Semicolon, "after loop condition")?;

        let increment = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RParen, "after for clauses")?;

        let body = self.parse_statement()?;
        let span = start.merge(self.previous_span());

        let body = match increment {
            Some(incr) => {
                let incr_span = incr.span;
                Stmt::Block(Block {
                    stmts: vec![
                        body,
                        Stmt::Expression(ExprStmt {
                            expr: incr,
                            span: incr_span,
                        }),
                    ],
                    span,
                })
            }
            None => body,
        };
        let condition = match condition {
            Some(cond) => cond,
            None => self.expr(ExprKind::Literal(Literal::Bool(true)), cond_end),
        };
        let looped = Stmt::While(Box::new(WhileStmt {
            condition,
            body,
            span,
        }));

        Some(match initializer {
            Some(init) => Stmt::Block(Block {
                stmts: vec![init, looped],
                span,
            }),
            None => looped,
        })
    }

    /// `return [expr];`
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let keyword: Span = self.advance().span;
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon, "after return value")?;
        Some(Stmt::Return(ReturnStmt {
            keyword,
            value,
            span: keyword.merge(self.previous_span()),
        }))
    }
}
