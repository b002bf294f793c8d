use super::Position;

/// An expression node. Suffixes (call, attribute, index) chain onto an
/// atom left-associatively; there is no operator syntax at all — every
/// arithmetic and comparison operation is an ordinary `Call`.
#[derive(Debug, Clone)]
pub enum Expression {
    BoolLit {
        value: bool,
        position: Position,
    },
    IntLit {
        value: i64,
        position: Position,
    },
    FloatLit {
        value: f64,
        position: Position,
    },
    StrLit {
        value: String,
        position: Position,
    },
    NullLit {
        position: Position,
    },
    ListLit {
        items: Vec<Expression>,
        position: Position,
    },
    DictLit {
        pairs: Vec<(Expression, Expression)>,
        position: Position,
    },
    Access {
        name: String,
        position: Position,
    },
    Assignment {
        name: String,
        value: Box<Expression>,
        position: Position,
    },
    AttrAccess {
        object: Box<Expression>,
        attr: String,
        position: Position,
    },
    AttrAssign {
        object: Box<Expression>,
        attr: String,
        value: Box<Expression>,
        position: Position,
    },
    ItemAccess {
        object: Box<Expression>,
        key: Box<Expression>,
        position: Position,
    },
    ItemAssign {
        object: Box<Expression>,
        key: Box<Expression>,
        value: Box<Expression>,
        position: Position,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
        position: Position,
    },
}

impl Expression {
    pub fn position(&self) -> Position {
        match self {
            Expression::BoolLit { position, .. }
            | Expression::IntLit { position, .. }
            | Expression::FloatLit { position, .. }
            | Expression::StrLit { position, .. }
            | Expression::NullLit { position }
            | Expression::ListLit { position, .. }
            | Expression::DictLit { position, .. }
            | Expression::Access { position, .. }
            | Expression::Assignment { position, .. }
            | Expression::AttrAccess { position, .. }
            | Expression::AttrAssign { position, .. }
            | Expression::ItemAccess { position, .. }
            | Expression::ItemAssign { position, .. }
            | Expression::Call { position, .. } => *position,
        }
    }
}
