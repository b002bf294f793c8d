//! CLI entry point for the Rocket interpreter: reads a source file,
//! lexes and parses it, optionally prints the parsed AST, then
//! evaluates it against the default built-in catalogue.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;
use log::info;

use rocket_lang::builtins::default_builtins;
use rocket_lang::error::EvalError;
use rocket_lang::interpreter::Interpreter;
use rocket_lang::lexer;
use rocket_lang::parser::Parser;

/// Evaluate Rocket source code.
#[derive(ClapParser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the Rocket source file to run.
    path: PathBuf,

    /// Print the parsed AST's textual form before running.
    #[arg(short, long)]
    ast: bool,

    /// Raise the log level (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn log_level(verbose: u8) -> log::Level {
    match verbose {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    simple_logger::init_with_level(log_level(cli.verbose)).ok();

    let src = match fs::read_to_string(&cli.path) {
        Ok(src) => src,
        Err(e) => {
            eprintln!("could not read {}: {e}", cli.path.display());
            return ExitCode::FAILURE;
        }
    };

    let tokens = match lexer::lex(&src) {
        Ok(tokens) => tokens,
        Err(e) => {
            println!("syntax error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let ast = match Parser::new(tokens).parse() {
        Ok(ast) => ast,
        Err(e) => {
            println!("syntax error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.ast {
        println!("{ast}");
        println!();
    }

    info!("evaluating {}", cli.path.display());
    match Interpreter::evaluate(&ast, default_builtins()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(EvalError::Runtime(e)) => {
            println!("runtime error: {e}");
            ExitCode::FAILURE
        }
        Err(EvalError::Bug(e)) => {
            eprintln!("internal error: {e}");
            ExitCode::FAILURE
        }
    }
}
