//! Lox driver: orchestrates the full pipeline.
//!
//! ```text
//! Lox Source → Lexer → Parser → Resolver → Interpreter → output
//! ```
//!
//! A [`Session`] keeps one interpreter alive across runs, so globals defined
//! by one run stay visible to the next. The REPL and the script runner both
//! go through it.

pub mod repl;

use std::io::{self, Write};

use lox_eval::{Interpreter, Resolver};
use lox_lexer::Lexer;
use lox_parser::Parser;
use lox_types::ast::Program;
use lox_types::{ast_print, Diagnostics, LoxError, SourceFile};
use serde::Serialize;
use tracing::debug;

/// What a single run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The program ran to completion.
    Ok,
    /// Syntax or resolution errors were reported; nothing was executed.
    StaticErrors(Diagnostics),
    /// Execution stopped at a runtime fault.
    RuntimeError(LoxError),
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    /// Process exit status for this outcome, following the sysexits
    /// convention (65 data error, 70 software error).
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Ok => 0,
            Outcome::StaticErrors(_) => 65,
            Outcome::RuntimeError(_) => 70,
        }
    }

    /// Diagnostics carried by this outcome, empty on success.
    pub fn diagnostics(&self) -> Diagnostics {
        match self {
            Outcome::Ok => Diagnostics::empty(),
            Outcome::StaticErrors(errors) => errors.clone(),
            Outcome::RuntimeError(error) => {
                let mut errors = Diagnostics::empty();
                errors.push_error(error.clone());
                errors
            }
        }
    }
}

/// Machine-readable summary of a run, emitted by `--json`.
///
/// ```json
/// { "success": false, "errors": { "errors": [...], "total_errors": 1 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub success: bool,
    pub errors: Diagnostics,
}

impl From<&Outcome> for RunReport {
    fn from(outcome: &Outcome) -> Self {
        Self {
            success: outcome.is_ok(),
            errors: outcome.diagnostics(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Session
// ══════════════════════════════════════════════════════════════════════════════

pub struct Session<W: Write> {
    interpreter: Interpreter<W>,
    /// First node id handed to the next parse, so resolutions from earlier
    /// runs never collide with new nodes.
    next_id: u32,
    runs: usize,
}

impl Session<io::Stdout> {
    pub fn stdout() -> Self {
        Self::with_interpreter(Interpreter::stdout())
    }
}

impl<W: Write> Session<W> {
    pub fn new(out: W) -> Self {
        Self::with_interpreter(Interpreter::new(out))
    }

    fn with_interpreter(interpreter: Interpreter<W>) -> Self {
        Self {
            interpreter,
            next_id: 0,
            runs: 0,
        }
    }

    /// Lex, parse, resolve and execute `source` against this session's
    /// globals. Execution is skipped when any static error was reported.
    pub fn run(&mut self, source: &SourceFile) -> Outcome {
        self.runs += 1;
        let (program, errors) = self.analyze(source);
        if errors.has_errors() {
            debug!(
                file = %source.name,
                errors = errors.total_errors,
                "static errors, skipping execution"
            );
            return Outcome::StaticErrors(errors);
        }

        match self.interpreter.interpret(&program.stmts) {
            Ok(()) => Outcome::Ok,
            Err(err) => {
                debug!(file = %source.name, code = %err.code(), "runtime fault");
                Outcome::RuntimeError(err.to_diagnostic(source))
            }
        }
    }

    /// Number of runs this session has performed.
    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn output(&self) -> &W {
        self.interpreter.output()
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }

    /// Front half of the pipeline. Resolutions are handed to the
    /// interpreter only when the whole source is free of errors.
    fn analyze(&mut self, source: &SourceFile) -> (Program, Diagnostics) {
        let mut errors = Diagnostics::empty();

        let lexed = Lexer::new(source).lex();
        debug!(tokens = lexed.tokens.len(), errors = lexed.errors.total_errors, "lexed");
        errors.extend(lexed.errors);

        let parsed = Parser::with_id_base(lexed.tokens, source, self.next_id).parse();
        debug!(
            stmts = parsed.program.stmts.len(),
            errors = parsed.errors.total_errors,
            "parsed"
        );
        self.next_id = parsed.next_id;
        errors.extend(parsed.errors);

        let resolutions = Resolver::new(&mut errors, source).resolve(&parsed.program.stmts);
        if !errors.has_errors() {
            self.interpreter.add_resolutions(resolutions);
        }
        (parsed.program, errors)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// AST dump
// ══════════════════════════════════════════════════════════════════════════════

/// Parse `source` and render it with the AST printer, one top-level
/// statement per line. Syntax errors are returned instead.
pub fn dump_ast(source: &SourceFile) -> Result<String, Diagnostics> {
    let lexed = Lexer::new(source).lex();
    let parsed = Parser::new(lexed.tokens, source).parse();

    let mut errors = lexed.errors;
    errors.extend(parsed.errors);
    if errors.has_errors() {
        return Err(errors);
    }
    Ok(ast_print::print_program(&parsed.program))
}

/// Human-readable report: one rendered block per error.
pub fn render_diagnostics(errors: &Diagnostics) -> String {
    errors
        .iter()
        .map(LoxError::render)
        .collect::<Vec<_>>()
        .join("\n")
}
