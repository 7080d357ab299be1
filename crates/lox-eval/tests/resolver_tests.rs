//! Resolver tests.
//!
//! Covers: scope distances, globals, closures, class scopes for `this` and
//! `super`, every static error, and continuing after errors.

use lox_eval::{Resolutions, Resolver};
use lox_lexer::Lexer;
use lox_parser::Parser;
use lox_types::ast::*;
use lox_types::{Diagnostics, ErrorCode, SourceFile, Span};
use pretty_assertions::assert_eq;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn parse(source: &str) -> Program {
    let sf = SourceFile::new("test.lox", source);
    let lex = Lexer::new(&sf).lex();
    let result = Parser::new(lex.tokens, &sf).parse();
    assert!(
        !result.errors.has_errors(),
        "parse errors: {:?}",
        result.errors.errors
    );
    result.program
}

fn resolve(source: &str) -> (Program, Resolutions, Diagnostics) {
    let sf = SourceFile::new("test.lox", source);
    let program = parse(source);
    let mut errors = Diagnostics::empty();
    let resolutions = Resolver::new(&mut errors, &sf).resolve(&program.stmts);
    (program, resolutions, errors)
}

fn errors(source: &str) -> Vec<(ErrorCode, String)> {
    resolve(source)
        .2
        .iter()
        .map(|e| (e.code, e.message.clone()))
        .collect()
}

fn codes(source: &str) -> Vec<ErrorCode> {
    errors(source).into_iter().map(|(code, _)| code).collect()
}

/// Every variable-like reference (`name`, `this`, `super`) with its
/// resolved distance, in source order.
fn distances(source: &str) -> Vec<(String, Option<usize>)> {
    let (program, resolutions, errors) = resolve(source);
    assert!(!errors.has_errors(), "resolve errors: {:?}", errors.errors);
    let mut out = Vec::new();
    for stmt in &program.stmts {
        collect_stmt(stmt, &resolutions, &mut out);
    }
    out
}

fn collect_stmt(stmt: &Stmt, r: &Resolutions, out: &mut Vec<(String, Option<usize>)>) {
    match stmt {
        Stmt::Expression(s) => collect_expr(&s.expr, r, out),
        Stmt::Print(s) => collect_expr(&s.expr, r, out),
        Stmt::Var(s) => {
            if let Some(init) = &s.initializer {
                collect_expr(init, r, out);
            }
        }
        Stmt::Block(b) => b.stmts.iter().for_each(|s| collect_stmt(s, r, out)),
        Stmt::If(s) => {
            collect_expr(&s.condition, r, out);
            collect_stmt(&s.then_branch, r, out);
            if let Some(e) = &s.else_branch {
                collect_stmt(e, r, out);
            }
        }
        Stmt::While(s) => {
            collect_expr(&s.condition, r, out);
            collect_stmt(&s.body, r, out);
        }
        Stmt::Function(f) => f.body.iter().for_each(|s| collect_stmt(s, r, out)),
        Stmt::Class(c) => {
            if let Some(sup) = &c.superclass {
                collect_expr(sup, r, out);
            }
            for m in &c.methods {
                m.body.iter().for_each(|s| collect_stmt(s, r, out));
            }
        }
        Stmt::Return(s) => {
            if let Some(v) = &s.value {
                collect_expr(v, r, out);
            }
        }
    }
}

fn collect_expr(expr: &Expr, r: &Resolutions, out: &mut Vec<(String, Option<usize>)>) {
    match &expr.kind {
        ExprKind::Variable(name) => out.push((name.name.clone(), r.get(expr.id))),
        ExprKind::This => out.push(("this".into(), r.get(expr.id))),
        ExprKind::Super { .. } => out.push(("super".into(), r.get(expr.id))),
        ExprKind::Assign { name, value } => {
            collect_expr(value, r, out);
            out.push((format!("{}=", name.name), r.get(expr.id)));
        }
        ExprKind::Grouping(e) | ExprKind::Unary { operand: e, .. } => collect_expr(e, r, out),
        ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
            collect_expr(left, r, out);
            collect_expr(right, r, out);
        }
        ExprKind::Call { callee, args, .. } => {
            collect_expr(callee, r, out);
            args.iter().for_each(|a| collect_expr(a, r, out));
        }
        ExprKind::Get { object, .. } => collect_expr(object, r, out),
        ExprKind::Set { object, value, .. } => {
            collect_expr(object, r, out);
            collect_expr(value, r, out);
        }
        ExprKind::Literal(_) => {}
    }
}

fn entry(name: &str, distance: Option<usize>) -> (String, Option<usize>) {
    (name.to_string(), distance)
}

// ══════════════════════════════════════════════════════════════════════════════
// Distances
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_globals_are_left_unresolved() {
    assert_eq!(
        distances("var a = 1; print a; a = 2;"),
        vec![entry("a", None), entry("a=", None)]
    );
}

#[test]
fn test_block_locals() {
    assert_eq!(
        distances("{ var a = 1; print a; { print a; { a = 3; } } }"),
        vec![entry("a", Some(0)), entry("a", Some(1)), entry("a=", Some(2))]
    );
}

#[test]
fn test_resolution_searches_every_enclosing_scope() {
    assert_eq!(
        distances("{ var a = 1; { { { { print a; } } } } }"),
        vec![entry("a", Some(4))]
    );
}

#[test]
fn test_shadowing_picks_innermost() {
    assert_eq!(
        distances("{ var a = 1; { var a = 2; print a; } print a; }"),
        vec![entry("a", Some(0)), entry("a", Some(0))]
    );
}

#[test]
fn test_function_params_and_closures() {
    let source = "fun outer(x) { var y = x; fun inner() { return x + y; } return inner; }";
    assert_eq!(
        distances(source),
        vec![
            entry("x", Some(0)),
            entry("x", Some(1)),
            entry("y", Some(1)),
            entry("inner", Some(0)),
        ]
    );
}

#[test]
fn test_closure_binds_by_declaration_site() {
    // `a` inside show() binds to the global even though a local `a` is
    // declared later in the same block.
    let source = "var a = \"global\"; { fun show() { print a; } show(); var a = \"block\"; show(); }";
    assert_eq!(
        distances(source),
        vec![entry("a", None), entry("show", Some(0)), entry("show", Some(0))]
    );
}

#[test]
fn test_this_in_method() {
    assert_eq!(
        distances("class A { m() { return this; } }"),
        vec![entry("this", Some(1))]
    );
}

#[test]
fn test_this_in_nested_function_inside_method() {
    assert_eq!(
        distances("class A { m() { fun f() { return this; } return f; } }"),
        vec![entry("this", Some(2)), entry("f", Some(0))]
    );
}

#[test]
fn test_super_is_one_scope_beyond_this() {
    assert_eq!(
        distances("class A {} class B < A { m() { return super.m; } }"),
        vec![entry("A", None), entry("super", Some(2))]
    );
}

#[test]
fn test_local_class_and_superclass() {
    assert_eq!(
        distances("{ class A {} class B < A {} print B; }"),
        vec![entry("A", Some(0)), entry("B", Some(0))]
    );
}

#[test]
fn test_for_loop_variable_scope() {
    assert_eq!(
        distances("for (var i = 0; i < 2; i = i + 1) print i;"),
        vec![
            entry("i", Some(0)),
            entry("i", Some(1)),
            entry("i", Some(1)),
            entry("i=", Some(1)),
        ]
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Static errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_self_referential_initializer() {
    assert_eq!(
        errors("var a = 1; { var a = a; }"),
        vec![(
            ErrorCode::SELF_REFERENTIAL_INITIALIZER,
            "Can't read local variable in its own initializer.".to_string()
        )]
    );
}

#[test]
fn test_global_self_reference_is_not_a_static_error() {
    assert!(codes("var a = a;").is_empty());
}

#[test]
fn test_duplicate_local_declaration() {
    assert_eq!(
        errors("{ var a = 1; var a = 2; }"),
        vec![(
            ErrorCode::ALREADY_DECLARED,
            "Already a variable with this name in this scope.".to_string()
        )]
    );
}

#[test]
fn test_duplicate_parameter() {
    assert_eq!(codes("fun f(a, a) {}"), vec![ErrorCode::ALREADY_DECLARED]);
}

#[test]
fn test_global_redeclaration_is_allowed() {
    assert!(codes("var a = 1; var a = 2;").is_empty());
}

#[test]
fn test_return_at_top_level() {
    assert_eq!(
        errors("return 1;"),
        vec![(
            ErrorCode::RETURN_OUTSIDE_FUNCTION,
            "Can't return from top-level code.".to_string()
        )]
    );
}

#[test]
fn test_return_value_from_initializer() {
    assert_eq!(
        codes("class A { init() { return 1; } }"),
        vec![ErrorCode::RETURN_VALUE_FROM_INITIALIZER]
    );
    assert!(codes("class A { init() { return; } }").is_empty());
}

#[test]
fn test_return_value_in_function_nested_in_initializer_is_fine() {
    assert!(codes("class A { init() { fun f() { return 1; } } }").is_empty());
}

#[test]
fn test_this_outside_class() {
    assert_eq!(codes("print this;"), vec![ErrorCode::THIS_OUTSIDE_CLASS]);
    assert_eq!(codes("fun f() { return this; }"), vec![ErrorCode::THIS_OUTSIDE_CLASS]);
}

#[test]
fn test_super_outside_class() {
    assert_eq!(
        errors("super.m();"),
        vec![(
            ErrorCode::SUPER_OUTSIDE_CLASS,
            "Can't use 'super' outside of a class.".to_string()
        )]
    );
}

#[test]
fn test_super_without_superclass() {
    assert_eq!(
        errors("class A { m() { super.m(); } }"),
        vec![(
            ErrorCode::SUPER_WITHOUT_SUPERCLASS,
            "Can't use 'super' in a class with no superclass.".to_string()
        )]
    );
}

#[test]
fn test_self_inheritance() {
    let (_, _, diags) = resolve("class A < A {}");
    assert_eq!(diags.total_errors, 1);
    assert_eq!(diags.errors[0].code, ErrorCode::SELF_INHERITANCE);
    assert_eq!(diags.errors[0].message, "A class can't inherit from itself.");
    assert_eq!(diags.errors[0].span, Span::new(1, 11, 1, 11));
}

#[test]
fn test_all_errors_reported_in_one_pass() {
    let source = "return;\nprint this;\n{ var a = a; }\nclass A < A {}\n{ var b; var b; }";
    assert_eq!(
        codes(source),
        vec![
            ErrorCode::RETURN_OUTSIDE_FUNCTION,
            ErrorCode::THIS_OUTSIDE_CLASS,
            ErrorCode::SELF_REFERENTIAL_INITIALIZER,
            ErrorCode::SELF_INHERITANCE,
            ErrorCode::ALREADY_DECLARED,
        ]
    );
}

#[test]
fn test_error_carries_source_line() {
    let (_, _, diags) = resolve("var x;\n{\n  var a = a;\n}");
    let err = &diags.errors[0];
    assert_eq!(err.span.start_line, 3);
    assert_eq!(err.source_line, "  var a = a;");
}

#[test]
fn test_class_context_restored_after_class() {
    assert_eq!(
        codes("class A { m() { return this; } } print this;"),
        vec![ErrorCode::THIS_OUTSIDE_CLASS]
    );
}
