use super::{FnDefinition, Statement};

/// A top-level program item: either a function definition or a bare
/// statement interleaved at the top level.
#[derive(Debug, Clone)]
pub enum Item {
    FnDefinition(FnDefinition),
    Statement(Statement),
}

/// The parser's output: the program's items in source order.
#[derive(Debug, Clone, Default)]
pub struct AstRoot {
    pub items: Vec<Item>,
}
