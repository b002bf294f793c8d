//! Error types shared across the pipeline.
//!
//! Hand-rolled: a message plus an optional position, with `Display`
//! rendering `"{line}:{col}: {message}"`. No `thiserror`/`anyhow`.

use std::error::Error;
use std::fmt::{self, Display};

use crate::span::Position;

/// A lexical or syntactic failure. Aborts the pipeline; the first one
/// wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub position: Position,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.position.0, self.position.1, self.message)
    }
}

impl Error for SyntaxError {}

/// A user-visible failure during evaluation. Catchable by `try`/`catch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub message: String,
    pub position: Option<Position>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn without_position(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some((line, col)) => write!(f, "{line}:{col}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl Error for RuntimeError {}

/// An implementation bug: an internal control-flow transfer escaped to
/// the top level, or an invariant the evaluator relies on was broken.
/// Never caught by user `try`/`catch`, never expected to happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalBug(pub String);

impl Display for EvalBug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal error: {}", self.0)
    }
}

impl Error for EvalBug {}

/// The failure half of evaluating a statement or expression: either a
/// catchable runtime error, or a bug that must propagate through any
/// number of `try`/`catch` frames unimpeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    Runtime(RuntimeError),
    Bug(EvalBug),
}

impl From<RuntimeError> for EvalError {
    fn from(e: RuntimeError) -> Self {
        EvalError::Runtime(e)
    }
}

impl From<EvalBug> for EvalError {
    fn from(e: EvalBug) -> Self {
        EvalError::Bug(e)
    }
}

impl Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Runtime(e) => Display::fmt(e, f),
            EvalError::Bug(e) => Display::fmt(e, f),
        }
    }
}

impl Error for EvalError {}
