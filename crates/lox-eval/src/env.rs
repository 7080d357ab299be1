//! Lexical environment chain for the Lox interpreter.
//!
//! Each block or call gets a fresh [`Environment`] whose `enclosing` link
//! points at the frame it was created in. Frames are shared through
//! [`EnvRef`] so that closures keep their defining frame alive and see
//! each other's writes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use lox_types::Span;

use crate::error::{EvalResult, RuntimeError};
use crate::value::Value;

/// Shared, mutable handle to a frame.
pub type EnvRef = Rc<RefCell<Environment>>;

/// A single scope frame.
#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// Create a root frame (the globals).
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Create a child frame of `enclosing`.
    pub fn with_enclosing(enclosing: EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    /// Bind `name` in this frame, overwriting any previous binding here.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Look `name` up here, then outward through the enclosing frames.
    pub fn get(&self, name: &str, span: Span) -> EvalResult<Value> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name, span),
            None => Err(RuntimeError::undefined_variable(name, span)),
        }
    }

    /// Overwrite the nearest existing binding of `name`.
    pub fn assign(&mut self, name: &str, value: Value, span: Span) -> EvalResult<()> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value, span),
            None => Err(RuntimeError::undefined_variable(name, span)),
        }
    }

    /// Read `name` from the frame exactly `distance` links up from `env`.
    ///
    /// Only that frame is consulted. A missing binding there means the
    /// resolver and interpreter disagree, and is reported as an undefined
    /// variable rather than searched for elsewhere.
    pub fn get_at(env: &EnvRef, distance: usize, name: &str, span: Span) -> EvalResult<Value> {
        let frame = Self::ancestor(env, distance)
            .ok_or_else(|| RuntimeError::undefined_variable(name, span))?;
        let value = frame.borrow().values.get(name).cloned();
        value.ok_or_else(|| RuntimeError::undefined_variable(name, span))
    }

    /// Write `name` in the frame exactly `distance` links up from `env`.
    pub fn assign_at(
        env: &EnvRef,
        distance: usize,
        name: &str,
        value: Value,
        span: Span,
    ) -> EvalResult<()> {
        let frame = Self::ancestor(env, distance)
            .ok_or_else(|| RuntimeError::undefined_variable(name, span))?;
        let mut frame = frame.borrow_mut();
        match frame.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::undefined_variable(name, span)),
        }
    }

    fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut frame = Rc::clone(env);
        for _ in 0..distance {
            let next = frame.borrow().enclosing.clone();
            frame = next?;
        }
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::point(1, 1)
    }

    #[test]
    fn test_get_walks_outward() {
        let globals = Environment::new();
        globals.borrow_mut().define("a", Value::Number(1.0));
        let inner = Environment::with_enclosing(Rc::clone(&globals));
        assert_eq!(inner.borrow().get("a", span()), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_get_undefined_names_the_variable() {
        let env = Environment::new();
        let err = env.borrow().get("missing", Span::point(4, 2)).unwrap_err();
        assert_eq!(err.to_string(), "Undefined variable 'missing'.");
        assert_eq!(err.span(), Span::point(4, 2));
    }

    #[test]
    fn test_define_shadows_without_touching_outer() {
        let outer = Environment::new();
        outer.borrow_mut().define("a", Value::Number(1.0));
        let inner = Environment::with_enclosing(Rc::clone(&outer));
        inner.borrow_mut().define("a", Value::Number(2.0));
        assert_eq!(inner.borrow().get("a", span()), Ok(Value::Number(2.0)));
        assert_eq!(outer.borrow().get("a", span()), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_redefine_in_same_frame_overwrites() {
        let env = Environment::new();
        env.borrow_mut().define("a", Value::Number(1.0));
        env.borrow_mut().define("a", Value::Bool(true));
        assert_eq!(env.borrow().get("a", span()), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_assign_updates_nearest_binding() {
        let outer = Environment::new();
        outer.borrow_mut().define("a", Value::Number(1.0));
        let inner = Environment::with_enclosing(Rc::clone(&outer));
        inner
            .borrow_mut()
            .assign("a", Value::Number(5.0), span())
            .unwrap();
        assert_eq!(outer.borrow().get("a", span()), Ok(Value::Number(5.0)));
    }

    #[test]
    fn test_assign_undefined_fails() {
        let env = Environment::new();
        let err = env
            .borrow_mut()
            .assign("nope", Value::Nil, span())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UndefinedVariable { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_get_at_reads_exact_frame() {
        let global = Environment::new();
        global.borrow_mut().define("a", Value::Number(0.0));
        let middle = Environment::with_enclosing(Rc::clone(&global));
        middle.borrow_mut().define("a", Value::Number(1.0));
        let inner = Environment::with_enclosing(Rc::clone(&middle));
        inner.borrow_mut().define("a", Value::Number(2.0));

        assert_eq!(Environment::get_at(&inner, 0, "a", span()), Ok(Value::Number(2.0)));
        assert_eq!(Environment::get_at(&inner, 1, "a", span()), Ok(Value::Number(1.0)));
        assert_eq!(Environment::get_at(&inner, 2, "a", span()), Ok(Value::Number(0.0)));
    }

    #[test]
    fn test_get_at_does_not_search_other_frames() {
        let outer = Environment::new();
        outer.borrow_mut().define("a", Value::Number(1.0));
        let inner = Environment::with_enclosing(Rc::clone(&outer));
        assert!(Environment::get_at(&inner, 0, "a", span()).is_err());
        assert!(Environment::get_at(&inner, 5, "a", span()).is_err());
    }

    #[test]
    fn test_assign_at_writes_exact_frame() {
        let outer = Environment::new();
        outer.borrow_mut().define("a", Value::Number(1.0));
        let inner = Environment::with_enclosing(Rc::clone(&outer));
        inner.borrow_mut().define("a", Value::Number(2.0));

        Environment::assign_at(&inner, 1, "a", Value::Number(9.0), span()).unwrap();
        assert_eq!(outer.borrow().get("a", span()), Ok(Value::Number(9.0)));
        assert_eq!(inner.borrow().get("a", span()), Ok(Value::Number(2.0)));
        assert!(Environment::assign_at(&inner, 0, "b", Value::Nil, span()).is_err());
    }

    #[test]
    fn test_shared_frame_mutation_is_visible() {
        let shared = Environment::new();
        shared.borrow_mut().define("count", Value::Number(0.0));
        let a = Environment::with_enclosing(Rc::clone(&shared));
        let b = Environment::with_enclosing(Rc::clone(&shared));
        Environment::assign_at(&a, 1, "count", Value::Number(3.0), span()).unwrap();
        assert_eq!(Environment::get_at(&b, 1, "count", span()), Ok(Value::Number(3.0)));
    }
}
