//! Lox runtime core: resolver, environment chain, value model and
//! tree-walking interpreter.
//!
//! The pipeline is `Resolver::resolve` over a parsed program, then
//! `Interpreter::add_resolutions` and `Interpreter::interpret`. Never run
//! the interpreter on a program whose resolution reported errors.

pub mod callable;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod resolver;
mod stack;
pub mod value;

pub use callable::{Callable, Class, Function, Instance, NativeFunction};
pub use env::{EnvRef, Environment};
pub use error::{EvalResult, RuntimeError};
pub use interpreter::{Flow, Interpreter, MAX_CALL_DEPTH};
pub use resolver::{Resolutions, Resolver};
pub use value::Value;
