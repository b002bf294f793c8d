use super::{Block, Position};

/// A top-level `fn name(params) { ... }` definition.
#[derive(Debug, Clone)]
pub struct FnDefinition {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
    pub position: Position,
}
