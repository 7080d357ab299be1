use crate::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of diagnostics kept per run. Later ones are only counted.
pub const MAX_ERRORS: usize = 20;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Resolution,
    Runtime,
}

/// Numeric error code (E100–E399).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_CHARACTER: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const EXPECTED_EXPRESSION: Self = Self(102);
    pub const EXPECTED_TOKEN: Self = Self(103);
    pub const INVALID_ASSIGNMENT_TARGET: Self = Self(104);
    pub const TOO_MANY_ARGUMENTS: Self = Self(105);
    pub const TOO_MANY_PARAMETERS: Self = Self(106);

    // ── Resolution errors (E200–E299) ──
    pub const ALREADY_DECLARED: Self = Self(200);
    pub const SELF_REFERENTIAL_INITIALIZER: Self = Self(201);
    pub const RETURN_OUTSIDE_FUNCTION: Self = Self(202);
    pub const RETURN_VALUE_FROM_INITIALIZER: Self = Self(203);
    pub const THIS_OUTSIDE_CLASS: Self = Self(204);
    pub const SUPER_OUTSIDE_CLASS: Self = Self(205);
    pub const SUPER_WITHOUT_SUPERCLASS: Self = Self(206);
    pub const SELF_INHERITANCE: Self = Self(207);

    // ── Runtime errors (E300–E399) ──
    pub const TYPE_MISMATCH: Self = Self(300);
    pub const NOT_CALLABLE: Self = Self(301);
    pub const WRONG_ARG_COUNT: Self = Self(302);
    pub const UNDEFINED_VARIABLE: Self = Self(303);
    pub const UNDEFINED_PROPERTY: Self = Self(304);
    pub const NOT_AN_INSTANCE: Self = Self(305);
    pub const SUPERCLASS_NOT_CLASS: Self = Self(306);
    pub const OUTPUT_FAILED: Self = Self(307);
    pub const STACK_OVERFLOW: Self = Self(308);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            200..=299 => ErrorCategory::Resolution,
            300..=399 => ErrorCategory::Runtime,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Resolution => write!(f, "resolution"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// A structured diagnostic, produced by every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoxError {
    /// Source file name.
    pub file: String,
    pub code: ErrorCode,
    /// Derived from `code`.
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The offending source line, for context.
    pub source_line: String,
}

impl LoxError {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
        }
    }

    /// Build a diagnostic, pulling the context line out of `source`.
    pub fn at(source: &SourceFile, code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        let line = source.line(span.start_line).unwrap_or("");
        Self::new(&source.name, code, message, span, line)
    }

    /// Multi-line report for terminals:
    ///
    /// ```text
    /// error[E201]: Can't read local variable in its own initializer.
    ///   --> main.lox:2:11
    ///    |
    ///  2 |   var a = a;
    ///    |           ^
    /// ```
    pub fn render(&self) -> String {
        let line_no = self.span.start_line.to_string();
        let gutter = " ".repeat(line_no.len());
        let caret_pad = " ".repeat(self.span.start_col.saturating_sub(1) as usize);
        let caret_len = if self.span.end_line == self.span.start_line {
            (self.span.end_col.saturating_sub(self.span.start_col) + 1).max(1) as usize
        } else {
            1
        };
        format!(
            "error[{code}]: {msg}\n{gutter}--> {file}:{span}\n{gutter} |\n{line_no} | {src}\n{gutter} | {caret_pad}{carets}",
            code = self.code,
            msg = self.message,
            file = self.file,
            span = self.span,
            src = self.source_line,
            carets = "^".repeat(caret_len),
        )
    }
}

impl fmt::Display for LoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.span, self.code, self.category, self.message
        )
    }
}

impl std::error::Error for LoxError {}

/// The reporting sink shared by the lexer, parser and resolver.
///
/// Stages push into it and keep going, so a single run surfaces every
/// error it can find.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<LoxError>,
    pub total_errors: usize,
}

impl Diagnostics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Record an error, keeping at most [`MAX_ERRORS`] of them.
    pub fn push_error(&mut self, error: LoxError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Append everything from `other`, preserving order.
    pub fn extend(&mut self, other: Diagnostics) {
        let dropped = other.total_errors - other.errors.len();
        for error in other.errors {
            self.push_error(error);
        }
        self.total_errors += dropped;
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoxError> {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(code: ErrorCode, line: u32) -> LoxError {
        LoxError::new("test.lox", code, "boom", Span::point(line, 1), "")
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::UNEXPECTED_CHARACTER.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::TOO_MANY_PARAMETERS.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::ALREADY_DECLARED.category(), ErrorCategory::Resolution);
        assert_eq!(ErrorCode::SELF_INHERITANCE.category(), ErrorCategory::Resolution);
        assert_eq!(ErrorCode::TYPE_MISMATCH.category(), ErrorCategory::Runtime);
        assert_eq!(ErrorCode::OUTPUT_FAILED.category(), ErrorCategory::Runtime);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::SELF_REFERENTIAL_INITIALIZER.to_string(), "E201");
        assert_eq!(ErrorCode::UNEXPECTED_CHARACTER.to_string(), "E100");
    }

    #[test]
    fn test_error_display() {
        let err = LoxError::new(
            "test.lox",
            ErrorCode::UNDEFINED_VARIABLE,
            "Undefined variable 'x'.",
            Span::new(3, 7, 3, 7),
            "print x;",
        );
        assert_eq!(err.category, ErrorCategory::Runtime);
        assert_eq!(err.to_string(), "3:7: E303 [runtime] Undefined variable 'x'.");
    }

    #[test]
    fn test_error_render_points_at_column() {
        let source = SourceFile::new("main.lox", "{\n  var a = a;\n}");
        let err = LoxError::at(
            &source,
            ErrorCode::SELF_REFERENTIAL_INITIALIZER,
            "Can't read local variable in its own initializer.",
            Span::point(2, 11),
        );
        assert_eq!(
            err.render(),
            "error[E201]: Can't read local variable in its own initializer.\n \
             --> main.lox:2:11\n  |\n2 |   var a = a;\n  |           ^"
        );
    }

    #[test]
    fn test_error_json_field_names() {
        let err = LoxError::new(
            "test.lox",
            ErrorCode::WRONG_ARG_COUNT,
            "Expected 2 arguments but got 1.",
            Span::new(12, 5, 12, 22),
            "add(1);",
        );
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"code\":302"));
        assert!(json.contains("\"category\":\"runtime\""));
        assert!(json.contains("\"line\":12"));
        assert!(json.contains("\"column\":5"));
        assert!(json.contains("\"end_line\":12"));
        assert!(json.contains("\"end_column\":22"));

        let back: LoxError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_diagnostics_max_limit() {
        let mut diags = Diagnostics::empty();
        for i in 0..25 {
            diags.push_error(sample(ErrorCode::EXPECTED_EXPRESSION, i + 1));
        }
        assert_eq!(diags.errors.len(), MAX_ERRORS);
        assert_eq!(diags.total_errors, 25);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_diagnostics_extend_keeps_counts() {
        let mut first = Diagnostics::empty();
        first.push_error(sample(ErrorCode::UNEXPECTED_CHARACTER, 1));
        let mut second = Diagnostics::empty();
        second.push_error(sample(ErrorCode::ALREADY_DECLARED, 2));
        second.push_error(sample(ErrorCode::SELF_INHERITANCE, 3));

        first.extend(second);
        assert_eq!(first.total_errors, 3);
        let codes: Vec<_> = first.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::UNEXPECTED_CHARACTER,
                ErrorCode::ALREADY_DECLARED,
                ErrorCode::SELF_INHERITANCE
            ]
        );
    }

    #[test]
    fn test_diagnostics_empty() {
        let diags = Diagnostics::empty();
        assert!(!diags.has_errors());
        assert_eq!(serde_json::to_string(&diags).unwrap(), r#"{"errors":[],"total_errors":0}"#);
    }
}
