//! Shared types for the Lox interpreter.
//!
//! This crate defines the AST node types, source spans, diagnostics,
//! and the AST printer used across all pipeline stages.

mod error;
mod span;
pub mod ast;
pub mod ast_print;

pub use error::{Diagnostics, ErrorCategory, ErrorCode, LoxError, MAX_ERRORS};
pub use span::{SourceFile, Span};
