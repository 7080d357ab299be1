//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 8. `=` (assignment, right-associative)
//! 7. `or`
//! 6. `and`
//! 5. `==`, `!=`
//! 4. `<`, `>`, `<=`, `>=`
//! 3. `+`, `-`
//! 2. `*`, `/`
//! 1. unary `!`, `-`
//! 0. `()` (call), `.` (property access)

use lox_lexer::token::TokenKind;
use lox_types::ast::*;
use lox_types::ErrorCode;

use crate::parse_decl::MAX_ARITY;
use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_assignment()
    }

    /// `assignment = ( call "." )? IDENT "=" assignment | logic_or`
    ///
    /// The left side is parsed as an ordinary expression first and only
    /// then checked for being a valid target. An invalid target is
    /// reported without abandoning the statement.
    fn parse_assignment(&mut self) -> Option<Expr> {
        let target = self.parse_or()?;
        if !self.check(&TokenKind::Eq) {
            return Some(target);
        }
        let eq_span = self.advance().span;
        let value = self.parse_assignment()?;
        let span = target.span.merge(value.span);

        match target.kind {
            ExprKind::Variable(name) => Some(self.expr(
                ExprKind::Assign {
                    name,
                    value: Box::new(value),
                },
                span,
            )),
            ExprKind::Get { object, name } => Some(self.expr(
                ExprKind::Set {
                    object,
                    name,
                    value: Box::new(value),
                },
                span,
            )),
            kind => {
                self.error_at(
                    ErrorCode::INVALID_ASSIGNMENT_TARGET,
                    "Invalid assignment target.",
                    eq_span,
                );
                Some(Expr::new(target.id, kind, target.span))
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `logic_or = logic_and { "or" logic_and }`
    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            let span = left.span.merge(right.span);
            left = self.expr(
                ExprKind::Logical {
                    left: Box::new(left),
                    op: LogicalOp::Or,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `logic_and = equality { "and" equality }`
    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_equality()?;
            let span = left.span.merge(right.span);
            left = self.expr(
                ExprKind::Logical {
                    left: Box::new(left),
                    op: LogicalOp::And,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `equality = comparison { ( "!=" | "==" ) comparison }`
    fn parse_equality(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_comparison, |kind| match kind {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::BangEq => Some(BinOp::NotEq),
            _ => None,
        })
    }

    /// `comparison = term { ( ">" | ">=" | "<" | "<=" ) term }`
    fn parse_comparison(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_term, |kind| match kind {
            TokenKind::Greater => Some(BinOp::Greater),
            TokenKind::GreaterEq => Some(BinOp::GreaterEq),
            TokenKind::Less => Some(BinOp::Less),
            TokenKind::LessEq => Some(BinOp::LessEq),
            _ => None,
        })
    }

    /// `term = factor { ( "-" | "+" ) factor }`
    fn parse_term(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_factor, |kind| match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    /// `factor = unary { ( "/" | "*" ) unary }`
    fn parse_factor(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            _ => None,
        })
    }

    /// One left-associative binary precedence level.
    fn parse_binary_level(
        &mut self,
        operand: fn(&mut Self) -> Option<Expr>,
        operator: fn(&TokenKind) -> Option<BinOp>,
    ) -> Option<Expr> {
        let mut left = operand(self)?;
        while let Some(op) = operator(self.peek_kind()) {
            let op_span = self.advance().span;
            let right = operand(self)?;
            let span = left.span.merge(right.span);
            left = self.expr(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    op_span,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `unary = ( "!" | "-" ) unary | call`
    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_call(),
        };
        let op_span = self.advance().span;
        let operand = self.parse_unary()?;
        let span = op_span.merge(operand.span);
        Some(self.expr(
            ExprKind::Unary {
                op,
                op_span,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Postfix: calls and property access
    // ══════════════════════════════════════════════════════════════════════════

    /// `call = primary { "(" arguments? ")" | "." IDENT }`
    fn parse_call(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::LParen) {
                expr = self.finish_call(expr)?;
            } else if self.eat(&TokenKind::Dot) {
                let name = self.expect_identifier("property name after '.'")?;
                let span = expr.span.merge(name.span);
                expr = self.expr(
                    ExprKind::Get {
                        object: Box::new(expr),
                        name,
                    },
                    span,
                );
            } else {
                break;
            }
        }
        Some(expr)
    }

    /// Parse the argument list after `(` and build the call node.
    fn finish_call(&mut self, callee: Expr) -> Option<Expr> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                if args.len() >= MAX_ARITY {
                    self.error_at_current(
                        ErrorCode::TOO_MANY_ARGUMENTS,
                        format!("Can't have more than {MAX_ARITY} arguments."),
                    );
                }
                args.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self.expect(&TokenKind::RParen, "after arguments")?.span;
        let span = callee.span.merge(paren);
        Some(self.expr(
            ExprKind::Call {
                callee: Box::new(callee),
                paren,
                args,
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let kind = match self.peek_kind() {
            TokenKind::False => ExprKind::Literal(Literal::Bool(false)),
            TokenKind::True => ExprKind::Literal(Literal::Bool(true)),
            TokenKind::Nil => ExprKind::Literal(Literal::Nil),
            TokenKind::Number(n) => ExprKind::Literal(Literal::Number(*n)),
            TokenKind::String(s) => ExprKind::Literal(Literal::String(s.clone())),
            TokenKind::This => ExprKind::This,
            TokenKind::Identifier(name) => ExprKind::Variable(Ident::new(name.clone(), start)),
            TokenKind::Super => {
                self.advance(); // eat `super`
                self.expect(&TokenKind::Dot, "after 'super'")?;
                let method = self.expect_identifier("superclass method name")?;
                let span = start.merge(method.span);
                return Some(self.expr(ExprKind::Super { method }, span));
            }
            TokenKind::LParen => {
                self.advance(); // eat `(`
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "after expression")?;
                let span = start.merge(self.previous_span());
                return Some(self.expr(ExprKind::Grouping(Box::new(inner)), span));
            }
            _ => {
                self.error_at_current(ErrorCode::EXPECTED_EXPRESSION, "Expect expression.");
                return None;
            }
        };
        self.advance();
        Some(self.expr(kind, start))
    }
}
