//! Interactive read-eval-print loop.
//!
//! Every entry runs through one long-lived [`Session`], so variables,
//! functions and classes persist between lines. Errors are reported and
//! the loop keeps going. Input with unbalanced braces or parentheses
//! continues on the next line.

use std::io::Write;
use std::path::PathBuf;

use lox_types::SourceFile;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;
use tracing::debug;

use crate::{render_diagnostics, Outcome, Session};

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("readline error: {0}")]
    Readline(#[from] ReadlineError),
}

#[derive(Debug, Clone)]
pub struct ReplConfig {
    pub prompt: String,
    pub continuation_prompt: String,
    /// Where history is loaded from and saved to. `None` keeps it in memory.
    pub history_file: Option<PathBuf>,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            continuation_prompt: ". ".to_string(),
            history_file: Some(PathBuf::from(".lox_history")),
        }
    }
}

pub struct Repl<W: Write> {
    editor: DefaultEditor,
    session: Session<W>,
    config: ReplConfig,
    /// Emit diagnostics as JSON instead of rendered text.
    json: bool,
}

impl<W: Write> Repl<W> {
    pub fn new(session: Session<W>, config: ReplConfig, json: bool) -> Result<Self, ReplError> {
        let mut editor = DefaultEditor::new()?;
        if let Some(path) = &config.history_file {
            // A missing history file just means a fresh start.
            let _ = editor.load_history(path);
        }
        Ok(Self {
            editor,
            session,
            config,
            json,
        })
    }

    /// Run until end of input (Ctrl-D).
    pub fn run(mut self) -> Result<(), ReplError> {
        while let Some(input) = self.read_entry()? {
            if input.trim().is_empty() {
                continue;
            }
            let name = format!("<repl:{}>", self.session.runs() + 1);
            let outcome = self.session.run(&SourceFile::new(name, input));
            self.report(&outcome);
        }

        if let Some(path) = &self.config.history_file {
            if let Err(err) = self.editor.save_history(path) {
                debug!(error = %err, "could not save history");
            }
        }
        Ok(())
    }

    /// Read one complete entry, which may span several lines. `None` on EOF.
    fn read_entry(&mut self) -> Result<Option<String>, ReplError> {
        let mut entry = String::new();
        loop {
            let prompt = if entry.is_empty() {
                &self.config.prompt
            } else {
                &self.config.continuation_prompt
            };
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if !entry.is_empty() {
                        entry.push('\n');
                    }
                    entry.push_str(&line);
                    if is_complete(&entry) {
                        if !entry.trim().is_empty() {
                            self.editor.add_history_entry(entry.as_str())?;
                        }
                        return Ok(Some(entry));
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    eprintln!("^C");
                    return Ok(Some(String::new()));
                }
                Err(ReadlineError::Eof) => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn report(&self, outcome: &Outcome) {
        if outcome.is_ok() {
            return;
        }
        if self.json {
            match serde_json::to_string(&outcome.diagnostics()) {
                Ok(json) => eprintln!("{json}"),
                Err(err) => eprintln!("failed to serialise diagnostics: {err}"),
            }
        } else {
            eprintln!("{}", render_diagnostics(&outcome.diagnostics()));
        }
    }
}

/// True when every `{` and `(` outside strings and comments is closed.
pub fn is_complete(input: &str) -> bool {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            in_string = c != '"';
            continue;
        }
        match c {
            '"' => in_string = true,
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&c| c != '\n').is_some() {}
            }
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            _ => {}
        }
    }

    !in_string && depth <= 0
}
