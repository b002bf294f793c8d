use super::{Expression, Position};

/// `{ stmt* }`. Carries its own position (the opening brace) so it can
/// be evaluated as a standalone scope (used both for literal blocks and
/// as the body of if/while/for/fn/try).
#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Block(Block),
    VarDecl {
        name: String,
        value: Expression,
        position: Position,
    },
    If {
        condition: Expression,
        then_branch: Block,
        else_branch: Option<Box<Statement>>,
        position: Position,
    },
    While {
        condition: Expression,
        body: Block,
        position: Position,
    },
    ForEach {
        binding: String,
        iterable: Expression,
        body: Block,
        position: Position,
    },
    Break {
        position: Position,
    },
    Continue {
        position: Position,
    },
    Return {
        value: Option<Expression>,
        position: Position,
    },
    Try {
        try_body: Block,
        err_binding: Option<String>,
        catch_body: Block,
        position: Position,
    },
    Expression(Expression),
}

impl Statement {
    pub fn position(&self) -> Position {
        match self {
            Statement::Block(b) => b.position,
            Statement::VarDecl { position, .. }
            | Statement::If { position, .. }
            | Statement::While { position, .. }
            | Statement::ForEach { position, .. }
            | Statement::Break { position }
            | Statement::Continue { position }
            | Statement::Return { position, .. }
            | Statement::Try { position, .. } => *position,
            Statement::Expression(e) => e.position(),
        }
    }

    /// True for the exact shape `continue;` — used by the C-style for
    /// desugaring to decide whether to append a trailing `continue`.
    pub fn is_bare_continue(&self) -> bool {
        matches!(self, Statement::Continue { .. })
    }
}
