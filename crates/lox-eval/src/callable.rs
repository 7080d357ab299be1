//! Callables and the object model: functions, classes, instances, natives.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use lox_types::ast::FunctionDecl;
use lox_types::Span;
use tracing::trace;

use crate::env::{EnvRef, Environment};
use crate::error::{EvalResult, RuntimeError};
use crate::interpreter::{Flow, Interpreter};
use crate::value::Value;

/// Name the initializer method must have.
pub const INITIALIZER: &str = "init";

// ══════════════════════════════════════════════════════════════════════════════
// Callable
// ══════════════════════════════════════════════════════════════════════════════

/// Anything that can appear before `(`.
#[derive(Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Class(Rc<Class>),
    Native(Rc<NativeFunction>),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(f) => f.arity(),
            Callable::Class(c) => c.arity(),
            Callable::Native(n) => n.arity,
        }
    }

    /// Invoke with already-checked arguments.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        match self {
            Callable::Function(f) => f.call(interpreter, args),
            Callable::Class(c) => Class::instantiate(c, interpreter, args),
            Callable::Native(n) => Ok((n.function)(&args)),
        }
    }

    /// Identity comparison.
    pub fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(func) => write!(f, "<fn {}>", func.name()),
            Callable::Class(class) => f.write_str(&class.name),
            Callable::Native(_) => f.write_str("<native fn>"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Function
// ══════════════════════════════════════════════════════════════════════════════

/// A user-defined function or method together with its closure.
pub struct Function {
    decl: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl Function {
    pub fn new(decl: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            decl,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name.name
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    /// A copy of this method whose closure has `this` bound to `instance`.
    pub fn bind(&self, instance: Rc<Instance>) -> Function {
        let env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.borrow_mut().define("this", Value::Instance(instance));
        Function::new(Rc::clone(&self.decl), env, self.is_initializer)
    }

    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        let env = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, arg) in self.decl.params.iter().zip(args) {
            env.borrow_mut().define(param.name.as_str(), arg);
        }

        let flow = interpreter.execute_block(&self.decl.body, env)?;

        // Initializers hand back the instance whether or not they returned.
        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this", self.decl.name.span);
        }
        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Class & Instance
// ══════════════════════════════════════════════════════════════════════════════

pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Self {
            name: name.into(),
            superclass,
            methods,
        }
    }

    /// Look a method up on this class, then along the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self.superclass.as_ref()?.find_method(name),
        }
    }

    /// Arity of `init`, or 0 when there is none.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER).map_or(0, |init| init.arity())
    }

    /// Allocate an instance and run its initializer, if any.
    pub fn instantiate<W: Write>(
        class: &Rc<Class>,
        interpreter: &mut Interpreter<W>,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        trace!(class = %class.name, "instantiate");
        let instance = Rc::new(Instance::new(Rc::clone(class)));
        if let Some(init) = class.find_method(INITIALIZER) {
            init.bind(Rc::clone(&instance)).call(interpreter, args)?;
        }
        Ok(Value::Instance(instance))
    }
}

pub struct Instance {
    class: Rc<Class>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Fields shadow methods. A method comes back bound to this instance.
    pub fn get(self: &Rc<Self>, name: &str, span: Span) -> EvalResult<Value> {
        if let Some(value) = self.fields.borrow().get(name) {
            return Ok(value.clone());
        }
        match self.class.find_method(name) {
            Some(method) => Ok(Value::Callable(Callable::Function(Rc::new(
                method.bind(Rc::clone(self)),
            )))),
            None => Err(RuntimeError::UndefinedProperty {
                name: name.to_string(),
                span,
            }),
        }
    }

    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Natives
// ══════════════════════════════════════════════════════════════════════════════

/// A function implemented in Rust.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub function: fn(&[Value]) -> Value,
}

/// `clock()`: seconds since the Unix epoch.
pub(crate) fn clock() -> NativeFunction {
    NativeFunction {
        name: "clock",
        arity: 0,
        function: |_| {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            Value::Number(now)
        },
    }
}
