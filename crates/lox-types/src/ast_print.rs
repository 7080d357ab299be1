//! Parenthesised, Lisp-style rendering of the AST.
//!
//! `-123 * (45.67)` prints as `(* (- 123) (group 45.67))`. The output is
//! meant for debugging the parser (`lox --dump-ast`), not for round-tripping.

use crate::ast::*;

/// Render a whole program, one top-level statement per line.
pub fn print_program(program: &Program) -> String {
    program
        .stmts
        .iter()
        .map(print_stmt)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expression(s) => parenthesize(";", [print_expr(&s.expr)]),
        Stmt::Print(s) => parenthesize("print", [print_expr(&s.expr)]),
        Stmt::Var(s) => match &s.initializer {
            Some(init) => parenthesize("var", [s.name.name.clone(), print_expr(init)]),
            None => parenthesize("var", [s.name.name.clone()]),
        },
        Stmt::Block(b) => parenthesize("block", b.stmts.iter().map(print_stmt)),
        Stmt::If(s) => {
            let mut parts = vec![print_expr(&s.condition), print_stmt(&s.then_branch)];
            if let Some(else_branch) = &s.else_branch {
                parts.push(print_stmt(else_branch));
            }
            parenthesize("if", parts)
        }
        Stmt::While(s) => parenthesize("while", [print_expr(&s.condition), print_stmt(&s.body)]),
        Stmt::Function(f) => print_function("fun", f),
        Stmt::Class(c) => {
            let mut head = c.name.name.clone();
            if let Some(superclass) = &c.superclass {
                head = format!("{head} < {}", print_expr(superclass));
            }
            let parts = std::iter::once(head).chain(c.methods.iter().map(|m| print_function("method", m)));
            parenthesize("class", parts)
        }
        Stmt::Return(s) => match &s.value {
            Some(value) => parenthesize("return", [print_expr(value)]),
            None => "(return)".to_string(),
        },
    }
}

fn print_function(keyword: &str, decl: &FunctionDecl) -> String {
    let params: Vec<&str> = decl.params.iter().map(|p| p.name.as_str()).collect();
    let head = [decl.name.name.clone(), format!("({})", params.join(" "))];
    parenthesize(keyword, head.into_iter().chain(decl.body.iter().map(print_stmt)))
}

pub fn print_expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(lit) => print_literal(lit),
        ExprKind::Grouping(inner) => parenthesize("group", [print_expr(inner)]),
        ExprKind::Unary { op, operand, .. } => parenthesize(op.as_str(), [print_expr(operand)]),
        ExprKind::Binary { left, op, right, .. } => {
            parenthesize(op.as_str(), [print_expr(left), print_expr(right)])
        }
        ExprKind::Logical { left, op, right } => {
            parenthesize(op.as_str(), [print_expr(left), print_expr(right)])
        }
        ExprKind::Variable(name) => name.name.clone(),
        ExprKind::Assign { name, value } => parenthesize("=", [name.name.clone(), print_expr(value)]),
        ExprKind::Call { callee, args, .. } => {
            parenthesize("call", std::iter::once(print_expr(callee)).chain(args.iter().map(print_expr)))
        }
        ExprKind::Get { object, name } => parenthesize(".", [print_expr(object), name.name.clone()]),
        ExprKind::Set { object, name, value } => {
            parenthesize("set", [print_expr(object), name.name.clone(), print_expr(value)])
        }
        ExprKind::This => "this".to_string(),
        ExprKind::Super { method } => parenthesize("super", [method.name.clone()]),
    }
}

fn print_literal(lit: &Literal) -> String {
    match lit {
        Literal::Nil => "nil".to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Number(n) => n.to_string(),
        Literal::String(s) => format!("{s:?}"),
    }
}

fn parenthesize(name: &str, parts: impl IntoIterator<Item = String>) -> String {
    let mut out = format!("({name}");
    for part in parts {
        out.push(' ');
        out.push_str(&part);
    }
    out.push(')');
    out
}
