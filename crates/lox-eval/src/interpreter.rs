//! Tree-walking interpreter.
//!
//! Executes a resolved program against an environment chain. Variable
//! references with a recorded scope distance are read straight from that
//! frame; everything else is looked up in the globals.

use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use lox_types::ast::*;
use lox_types::Span;
use tracing::{debug, trace};

use crate::callable::{self, Callable, Class, Function, INITIALIZER};
use crate::env::{EnvRef, Environment};
use crate::error::{EvalResult, RuntimeError};
use crate::resolver::Resolutions;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// Default limit on nested calls. The native stack grows on demand, so
/// this only stops runaway recursion from exhausting memory.
pub const MAX_CALL_DEPTH: usize = 10_000;

/// How a statement finished.
///
/// `Return` unwinds to the innermost enclosing call, which turns it back
/// into a value. It never escapes [`Function::call`].
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// The Lox interpreter. Output of `print` goes to `W`.
pub struct Interpreter<W: Write> {
    globals: EnvRef,
    /// Frame for the statement currently executing.
    env: EnvRef,
    locals: Resolutions,
    out: W,
    call_depth: usize,
    max_call_depth: usize,
}

impl Interpreter<io::Stdout> {
    /// An interpreter printing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        let globals = Environment::new();
        let clock = callable::clock();
        globals
            .borrow_mut()
            .define(clock.name, Value::Callable(Callable::Native(Rc::new(clock))));
        Self {
            env: Rc::clone(&globals),
            globals,
            locals: Resolutions::default(),
            out,
            call_depth: 0,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }

    /// Replace the nested call limit.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Merge resolver output. Ids from earlier programs stay valid.
    pub fn add_resolutions(&mut self, resolutions: Resolutions) {
        self.locals.extend(resolutions);
    }

    /// Run a resolved program, stopping at the first runtime fault.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> EvalResult<()> {
        debug!(stmts = stmts.len(), "interpreting");
        for stmt in stmts {
            if let Flow::Return(_) = self.execute(stmt)? {
                // Top-level `return` is rejected by the resolver.
                debug!("return outside of a call, stopping");
                break;
            }
        }
        Ok(())
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    fn execute(&mut self, stmt: &Stmt) -> EvalResult<Flow> {
        match stmt {
            Stmt::Expression(s) => {
                self.evaluate(&s.expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Print(s) => {
                let value = self.evaluate(&s.expr)?;
                writeln!(self.out, "{value}").map_err(|e| RuntimeError::Output {
                    message: e.to_string(),
                    span: s.span,
                })?;
                Ok(Flow::Normal)
            }
            Stmt::Var(s) => {
                let value = match &s.initializer {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nil,
                };
                self.env.borrow_mut().define(s.name.name.as_str(), value);
                Ok(Flow::Normal)
            }
            Stmt::Block(block) => {
                let env = Environment::with_enclosing(Rc::clone(&self.env));
                self.execute_block(&block.stmts, env)
            }
            Stmt::If(s) => {
                if self.evaluate(&s.condition)?.is_truthy() {
                    self.execute(&s.then_branch)
                } else if let Some(else_branch) = &s.else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While(s) => {
                while self.evaluate(&s.condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(&s.body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(decl) => {
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.env), false);
                self.env.borrow_mut().define(
                    decl.name.name.as_str(),
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Flow::Normal)
            }
            Stmt::Class(decl) => {
                self.execute_class(decl)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(s) => {
                let value = match &s.value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    /// Run `stmts` in `env`, restoring the current frame afterwards no
    /// matter how they finish.
    pub(crate) fn execute_block(&mut self, stmts: &[Stmt], env: EnvRef) -> EvalResult<Flow> {
        let previous = mem::replace(&mut self.env, env);
        let result = self.execute_all(stmts);
        self.env = previous;
        result
    }

    fn execute_all(&mut self, stmts: &[Stmt]) -> EvalResult<Flow> {
        for stmt in stmts {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_class(&mut self, decl: &ClassDecl) -> EvalResult<()> {
        let name = decl.name.name.as_str();
        // Methods may refer to the class by name before it exists.
        self.env.borrow_mut().define(name, Value::Nil);

        let superclass = match &decl.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => return Err(RuntimeError::SuperclassNotClass { span: expr.span }),
            },
            None => None,
        };

        let enclosing = superclass.as_ref().map(|class| {
            let env = Environment::with_enclosing(Rc::clone(&self.env));
            env.borrow_mut()
                .define("super", Value::Callable(Callable::Class(Rc::clone(class))));
            mem::replace(&mut self.env, env)
        });

        let methods: HashMap<String, Rc<Function>> = decl
            .methods
            .iter()
            .map(|method| {
                let is_initializer = method.name.name == INITIALIZER;
                let function = Function::new(Rc::clone(method), Rc::clone(&self.env), is_initializer);
                (method.name.name.clone(), Rc::new(function))
            })
            .collect();

        if let Some(enclosing) = enclosing {
            self.env = enclosing;
        }

        trace!(class = name, methods = methods.len(), "class declared");
        let class = Class::new(name, superclass, methods);
        self.env
            .borrow_mut()
            .define(name, Value::Callable(Callable::Class(Rc::new(class))));
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(Value::from(lit)),
            ExprKind::Grouping(inner) => self.evaluate(inner),
            ExprKind::Unary {
                op,
                op_span,
                operand,
            } => {
                let value = self.evaluate(operand)?;
                match (op, value) {
                    (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
                    (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                    (UnaryOp::Neg, _) => Err(RuntimeError::TypeMismatch {
                        message: "Operand must be a number.",
                        span: *op_span,
                    }),
                }
            }
            ExprKind::Binary {
                left,
                op,
                op_span,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*op, left, right, *op_span)
            }
            ExprKind::Logical { left, op, right } => {
                let left = self.evaluate(left)?;
                match op {
                    LogicalOp::Or if left.is_truthy() => Ok(left),
                    LogicalOp::And if !left.is_truthy() => Ok(left),
                    _ => self.evaluate(right),
                }
            }
            ExprKind::Variable(name) => self.look_up_variable(&name.name, expr.id, name.span),
            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(expr.id) {
                    Some(distance) => Environment::assign_at(
                        &self.env,
                        distance,
                        &name.name,
                        value.clone(),
                        name.span,
                    )?,
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.name, value.clone(), name.span)?,
                }
                Ok(value)
            }
            ExprKind::Call {
                callee,
                paren,
                args,
            } => {
                let callee = self.evaluate(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate(arg)?);
                }
                self.call(callee, values, *paren)
            }
            ExprKind::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(&name.name, name.span),
                other => {
                    trace!(
                        receiver = other.type_name(),
                        property = %name.name,
                        "get on non-instance"
                    );
                    Err(RuntimeError::NotAnInstance {
                        message: "Only instances have properties.",
                        span: name.span,
                    })
                }
            },
            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let receiver = self.evaluate(object)?;
                let Value::Instance(instance) = receiver else {
                    trace!(
                        receiver = receiver.type_name(),
                        field = %name.name,
                        "set on non-instance"
                    );
                    return Err(RuntimeError::NotAnInstance {
                        message: "Only instances have fields.",
                        span: name.span,
                    });
                };
                let value = self.evaluate(value)?;
                instance.set(&name.name, value.clone());
                Ok(value)
            }
            ExprKind::This => self.look_up_variable("this", expr.id, expr.span),
            ExprKind::Super { method } => self.evaluate_super(expr, method),
        }
    }

    fn look_up_variable(&self, name: &str, id: ExprId, span: Span) -> EvalResult<Value> {
        match self.locals.get(id) {
            Some(distance) => Environment::get_at(&self.env, distance, name, span),
            None => self.globals.borrow().get(name, span),
        }
    }

    /// `super.method`: look the method up on the class bound at the
    /// recorded distance and bind it to `this`, one frame closer.
    fn evaluate_super(&self, expr: &Expr, method: &Ident) -> EvalResult<Value> {
        let distance = self
            .locals
            .get(expr.id)
            .ok_or_else(|| RuntimeError::undefined_variable("super", expr.span))?;
        let superclass = Environment::get_at(&self.env, distance, "super", expr.span)?;
        let this_distance = distance
            .checked_sub(1)
            .ok_or_else(|| RuntimeError::undefined_variable("this", expr.span))?;
        let object = Environment::get_at(&self.env, this_distance, "this", expr.span)?;

        let (Value::Callable(Callable::Class(superclass)), Value::Instance(instance)) =
            (superclass, object)
        else {
            return Err(RuntimeError::SuperclassNotClass { span: expr.span });
        };
        let function = superclass
            .find_method(&method.name)
            .ok_or_else(|| RuntimeError::UndefinedProperty {
                name: method.name.clone(),
                span: method.span,
            })?;
        Ok(Value::Callable(Callable::Function(Rc::new(
            function.bind(instance),
        ))))
    }

    fn call(&mut self, callee: Value, args: Vec<Value>, paren: Span) -> EvalResult<Value> {
        let Value::Callable(callable) = callee else {
            trace!(callee = callee.type_name(), "call on non-callable");
            return Err(RuntimeError::NotCallable { span: paren });
        };
        if args.len() != callable.arity() {
            return Err(RuntimeError::WrongArgCount {
                expected: callable.arity(),
                got: args.len(),
                span: paren,
            });
        }
        if self.call_depth >= self.max_call_depth {
            return Err(RuntimeError::StackOverflow { span: paren });
        }

        trace!(callee = %callable, args = args.len(), depth = self.call_depth, "call");
        self.call_depth += 1;
        let result = callable.call(self, args);
        self.call_depth -= 1;
        result
    }
}

fn binary(op: BinOp, left: Value, right: Value, span: Span) -> EvalResult<Value> {
    use Value::{Bool, Number};

    let numbers_only = || RuntimeError::TypeMismatch {
        message: "Operands must be numbers.",
        span,
    };
    Ok(match (op, left, right) {
        (BinOp::Eq, l, r) => Bool(l == r),
        (BinOp::NotEq, l, r) => Bool(l != r),

        (BinOp::Add, Number(a), Number(b)) => Number(a + b),
        (BinOp::Add, Value::String(a), Value::String(b)) => {
            Value::String(Rc::from(format!("{a}{b}").as_str()))
        }
        (BinOp::Add, _, _) => {
            return Err(RuntimeError::TypeMismatch {
                message: "Operands must be two numbers or two strings.",
                span,
            })
        }

        (BinOp::Sub, Number(a), Number(b)) => Number(a - b),
        (BinOp::Mul, Number(a), Number(b)) => Number(a * b),
        (BinOp::Div, Number(a), Number(b)) => Number(a / b),
        (BinOp::Less, Number(a), Number(b)) => Bool(a < b),
        (BinOp::LessEq, Number(a), Number(b)) => Bool(a <= b),
        (BinOp::Greater, Number(a), Number(b)) => Bool(a > b),
        (BinOp::GreaterEq, Number(a), Number(b)) => Bool(a >= b),
        _ => return Err(numbers_only()),
    })
}
