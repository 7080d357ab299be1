use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use lox_cli::repl::{Repl, ReplConfig, ReplError};
use lox_cli::{dump_ast, render_diagnostics, Outcome, RunReport, Session};
use lox_types::SourceFile;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// sysexits: cannot open input.
const EXIT_IO: i32 = 74;

#[derive(Parser)]
#[command(name = "lox", version, about = "A tree-walking interpreter for the Lox language")]
struct Cli {
    /// Script to run. Starts an interactive session when omitted.
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Print the parsed program instead of running it
    #[arg(long)]
    dump_ast: bool,

    /// Report diagnostics as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("could not read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("--dump-ast needs a script")]
    DumpWithoutScript,

    #[error(transparent)]
    Repl(#[from] ReplError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Read { .. } => EXIT_IO,
            CliError::DumpWithoutScript => 64,
            CliError::Repl(_) => EXIT_IO,
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("lox: {err}");
            process::exit(err.exit_code());
        }
    }
}

/// Logging goes to stderr so it never mixes with program output.
/// Off unless `RUST_LOG` says otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<i32, CliError> {
    let Some(path) = cli.script else {
        if cli.dump_ast {
            return Err(CliError::DumpWithoutScript);
        }
        Repl::new(Session::stdout(), ReplConfig::default(), cli.json)?.run()?;
        return Ok(0);
    };

    let source = fs::read_to_string(&path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })?;
    let file = SourceFile::new(path.display().to_string(), source);

    if cli.dump_ast {
        return Ok(match dump_ast(&file) {
            Ok(tree) => {
                println!("{tree}");
                0
            }
            Err(errors) => {
                report(&Outcome::StaticErrors(errors), cli.json);
                65
            }
        });
    }

    let outcome = Session::stdout().run(&file);
    report(&outcome, cli.json);
    Ok(outcome.exit_code())
}

fn report(outcome: &Outcome, json: bool) {
    if json {
        match serde_json::to_string_pretty(&RunReport::from(outcome)) {
            Ok(text) => eprintln!("{text}"),
            Err(err) => eprintln!("lox: failed to serialise diagnostics: {err}"),
        }
    } else if !outcome.is_ok() {
        eprintln!("{}", render_diagnostics(&outcome.diagnostics()));
    }
}
