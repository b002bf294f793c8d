//! Shared source-position type.
//!
//! Every token and every AST node carries a `Position`: a 1-based
//! `(line, col)` pair counted in source characters, with `\n` advancing
//! the line and resetting the column to 1.

pub type Position = (usize, usize);

pub const DUMMY_POSITION: Position = (0, 0);
