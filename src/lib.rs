//! Lexer, parser, and tree-walking evaluator for the Rocket scripting
//! language: variable bindings, first-class closures, conditionals,
//! while/for loops, break/continue/return, try/catch, and calls to
//! host-provided built-in functions. No operator syntax — arithmetic
//! and comparison are ordinary calls into the built-in catalogue.

pub mod ast;
pub mod builtins;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod value;

use std::collections::HashMap;

use error::EvalError;
use value::Value;

/// Runs a whole program: lex, parse, then evaluate against the given
/// built-ins. The single entry point `main` and tests drive.
pub fn evaluate(source: &str, builtins: HashMap<String, Value>) -> Result<(), EvalError> {
    let tokens = lexer::lex(source)?;
    let ast = parser::Parser::new(tokens).parse()?;
    interpreter::Interpreter::evaluate(&ast, builtins)
}

impl From<error::SyntaxError> for EvalError {
    fn from(e: error::SyntaxError) -> Self {
        EvalError::Bug(error::EvalBug(format!("syntax error escaped parsing: {e}")))
    }
}
