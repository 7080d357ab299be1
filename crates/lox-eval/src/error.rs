//! Runtime fault types for the Lox interpreter.

use lox_types::{ErrorCode, LoxError, SourceFile, Span};
use thiserror::Error;

/// A runtime fault. Aborts the current top-level run.
///
/// Every variant carries the span of the token that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Wrong operand kinds for an operator.
    #[error("{message}")]
    TypeMismatch { message: &'static str, span: Span },
    #[error("Can only call functions and classes.")]
    NotCallable { span: Span },
    #[error("Expected {expected} arguments but got {got}.")]
    WrongArgCount {
        expected: usize,
        got: usize,
        span: Span,
    },
    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String, span: Span },
    #[error("Undefined property '{name}'.")]
    UndefinedProperty { name: String, span: Span },
    /// Property read or write on something that is not an instance.
    #[error("{message}")]
    NotAnInstance { message: &'static str, span: Span },
    #[error("Superclass must be a class.")]
    SuperclassNotClass { span: Span },
    #[error("Stack overflow.")]
    StackOverflow { span: Span },
    /// Writing to the output channel failed.
    #[error("Could not write output: {message}")]
    Output { message: String, span: Span },
}

impl RuntimeError {
    pub(crate) fn undefined_variable(name: &str, span: Span) -> Self {
        Self::UndefinedVariable {
            name: name.to_string(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::TypeMismatch { span, .. }
            | Self::NotCallable { span }
            | Self::WrongArgCount { span, .. }
            | Self::UndefinedVariable { span, .. }
            | Self::UndefinedProperty { span, .. }
            | Self::NotAnInstance { span, .. }
            | Self::SuperclassNotClass { span }
            | Self::StackOverflow { span }
            | Self::Output { span, .. } => *span,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::TypeMismatch { .. } => ErrorCode::TYPE_MISMATCH,
            Self::NotCallable { .. } => ErrorCode::NOT_CALLABLE,
            Self::WrongArgCount { .. } => ErrorCode::WRONG_ARG_COUNT,
            Self::UndefinedVariable { .. } => ErrorCode::UNDEFINED_VARIABLE,
            Self::UndefinedProperty { .. } => ErrorCode::UNDEFINED_PROPERTY,
            Self::NotAnInstance { .. } => ErrorCode::NOT_AN_INSTANCE,
            Self::SuperclassNotClass { .. } => ErrorCode::SUPERCLASS_NOT_CLASS,
            Self::StackOverflow { .. } => ErrorCode::STACK_OVERFLOW,
            Self::Output { .. } => ErrorCode::OUTPUT_FAILED,
        }
    }

    /// Convert into a diagnostic, pulling the context line from `source`.
    pub fn to_diagnostic(&self, source: &SourceFile) -> LoxError {
        LoxError::at(source, self.code(), self.to_string(), self.span())
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use lox_types::ErrorCategory;

    #[test]
    fn test_messages() {
        let span = Span::point(1, 1);
        let cases = [
            (
                RuntimeError::WrongArgCount {
                    expected: 2,
                    got: 1,
                    span,
                },
                "Expected 2 arguments but got 1.",
            ),
            (
                RuntimeError::undefined_variable("x", span),
                "Undefined variable 'x'.",
            ),
            (
                RuntimeError::UndefinedProperty {
                    name: "y".into(),
                    span,
                },
                "Undefined property 'y'.",
            ),
            (
                RuntimeError::TypeMismatch {
                    message: "Operands must be numbers.",
                    span,
                },
                "Operands must be numbers.",
            ),
            (RuntimeError::NotCallable { span }, "Can only call functions and classes."),
            (RuntimeError::SuperclassNotClass { span }, "Superclass must be a class."),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_to_diagnostic_uses_fault_line() {
        let source = SourceFile::new("main.lox", "var a = 1;\nprint a + nil;");
        let err = RuntimeError::TypeMismatch {
            message: "Operands must be two numbers or two strings.",
            span: Span::point(2, 9),
        };
        let diag = err.to_diagnostic(&source);
        assert_eq!(diag.code, ErrorCode::TYPE_MISMATCH);
        assert_eq!(diag.category, ErrorCategory::Runtime);
        assert_eq!(diag.span.start_line, 2);
        assert_eq!(diag.source_line, "print a + nil;");
        assert_eq!(diag.message, "Operands must be two numbers or two strings.");
    }
}
