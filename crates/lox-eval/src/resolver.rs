//! Static resolution pass.
//!
//! Entry point: [`Resolver::resolve`].
//!
//! Walks the program once before execution and records, for every local
//! variable reference, how many scopes separate it from its declaration.
//! References that match no scope are left out and treated as globals.
//!
//! Error codes emitted:
//! - E200: name already declared in this scope
//! - E201: local read in its own initializer
//! - E202: `return` at top level
//! - E203: `return` with a value inside `init`
//! - E204: `this` outside a class
//! - E205: `super` outside a class
//! - E206: `super` in a class without a superclass
//! - E207: class inherits from itself

use std::collections::HashMap;

use lox_types::ast::*;
use lox_types::{Diagnostics, ErrorCode, LoxError, SourceFile, Span};
use tracing::debug;

use crate::callable::INITIALIZER;

/// Scope distances keyed by expression identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolutions {
    depths: HashMap<ExprId, usize>,
}

impl Resolutions {
    /// Distance for `id`, or `None` when it refers to a global.
    pub fn get(&self, id: ExprId) -> Option<usize> {
        self.depths.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn extend(&mut self, other: Resolutions) {
        self.depths.extend(other.depths);
    }

    fn insert(&mut self, id: ExprId, depth: usize) {
        self.depths.insert(id, depth);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

// ══════════════════════════════════════════════════════════════════════════════
// Resolver
// ══════════════════════════════════════════════════════════════════════════════

pub struct Resolver<'a> {
    errors: &'a mut Diagnostics,
    source: &'a SourceFile,
    /// Innermost scope last. `false` means declared but not yet defined.
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionKind,
    current_class: ClassKind,
    resolutions: Resolutions,
}

impl<'a> Resolver<'a> {
    pub fn new(errors: &'a mut Diagnostics, source: &'a SourceFile) -> Self {
        Self {
            errors,
            source,
            scopes: Vec::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            resolutions: Resolutions::default(),
        }
    }

    /// Resolve a whole program. Errors go to the diagnostics sink; the
    /// pass always runs to the end.
    pub fn resolve(mut self, stmts: &[Stmt]) -> Resolutions {
        let before = self.errors.total_errors;
        self.resolve_stmts(stmts);
        debug!(
            locals = self.resolutions.len(),
            errors = self.errors.total_errors - before,
            "resolution finished"
        );
        self.resolutions
    }

    // ── Scopes ────────────────────────────────────────────────────────────

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Ident) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.contains_key(&name.name) {
            self.error(
                ErrorCode::ALREADY_DECLARED,
                "Already a variable with this name in this scope.",
                name.span,
            );
            return;
        }
        scope.insert(name.name.clone(), false);
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    /// Record the distance to the nearest scope declaring `name`.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        let found = self
            .scopes
            .iter()
            .rev()
            .position(|scope| scope.contains_key(name));
        if let Some(depth) = found {
            self.resolutions.insert(id, depth);
        }
    }

    fn error(&mut self, code: ErrorCode, message: &str, span: Span) {
        self.errors
            .push_error(LoxError::at(self.source, code, message, span));
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(s) => self.resolve_expr(&s.expr),
            Stmt::Print(s) => self.resolve_expr(&s.expr),
            Stmt::Var(s) => {
                self.declare(&s.name);
                if let Some(init) = &s.initializer {
                    self.resolve_expr(init);
                }
                self.define(&s.name.name);
            }
            Stmt::Block(block) => {
                self.begin_scope();
                self.resolve_stmts(&block.stmts);
                self.end_scope();
            }
            Stmt::If(s) => {
                self.resolve_expr(&s.condition);
                self.resolve_stmt(&s.then_branch);
                if let Some(else_branch) = &s.else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(s) => {
                self.resolve_expr(&s.condition);
                self.resolve_stmt(&s.body);
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name.name);
                self.resolve_function(decl, FunctionKind::Function);
            }
            Stmt::Class(decl) => self.resolve_class(decl),
            Stmt::Return(s) => {
                if self.current_function == FunctionKind::None {
                    self.error(
                        ErrorCode::RETURN_OUTSIDE_FUNCTION,
                        "Can't return from top-level code.",
                        s.keyword,
                    );
                }
                if let Some(value) = &s.value {
                    if self.current_function == FunctionKind::Initializer {
                        self.error(
                            ErrorCode::RETURN_VALUE_FROM_INITIALIZER,
                            "Can't return a value from an initializer.",
                            s.keyword,
                        );
                    }
                    self.resolve_expr(value);
                }
            }
        }
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionKind) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(&param.name);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    fn resolve_class(&mut self, decl: &ClassDecl) {
        let enclosing = self.current_class;
        self.current_class = ClassKind::Class;

        self.declare(&decl.name);
        self.define(&decl.name.name);

        if let Some(superclass) = &decl.superclass {
            if let ExprKind::Variable(super_name) = &superclass.kind {
                if super_name.name == decl.name.name {
                    self.error(
                        ErrorCode::SELF_INHERITANCE,
                        "A class can't inherit from itself.",
                        super_name.span,
                    );
                }
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.define("super");
        }

        self.begin_scope();
        self.define("this");
        for method in &decl.methods {
            let kind = if method.name.name == INITIALIZER {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind);
        }
        self.end_scope();

        if decl.superclass.is_some() {
            self.end_scope();
        }
        self.current_class = enclosing;
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Grouping(inner) => self.resolve_expr(inner),
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Variable(name) => {
                let in_own_initializer = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.name))
                    == Some(&false);
                if in_own_initializer {
                    self.error(
                        ErrorCode::SELF_REFERENTIAL_INITIALIZER,
                        "Can't read local variable in its own initializer.",
                        name.span,
                    );
                }
                self.resolve_local(expr.id, &name.name);
            }
            ExprKind::Assign { name, value } => {
                self.resolve_expr(value);
                self.resolve_local(expr.id, &name.name);
            }
            ExprKind::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Get { object, .. } => self.resolve_expr(object),
            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            ExprKind::This => {
                if self.current_class == ClassKind::None {
                    self.error(
                        ErrorCode::THIS_OUTSIDE_CLASS,
                        "Can't use 'this' outside of a class.",
                        expr.span,
                    );
                    return;
                }
                self.resolve_local(expr.id, "this");
            }
            ExprKind::Super { .. } => {
                match self.current_class {
                    ClassKind::None => self.error(
                        ErrorCode::SUPER_OUTSIDE_CLASS,
                        "Can't use 'super' outside of a class.",
                        expr.span,
                    ),
                    ClassKind::Class => self.error(
                        ErrorCode::SUPER_WITHOUT_SUPERCLASS,
                        "Can't use 'super' in a class with no superclass.",
                        expr.span,
                    ),
                    ClassKind::Subclass => {}
                }
                self.resolve_local(expr.id, "super");
            }
        }
    }
}
