//! Source-like textual reconstruction of the AST, used only for the
//! CLI's `--ast` debug flag. Deliberately not tied to the derived
//! `Debug` output: expressions render without parentheses or trailing
//! semicolons, statements render close to how they'd be typed, and
//! blocks indent their children by one tab. None of this needs to
//! round-trip byte-for-byte through the parser.

use std::fmt::{self, Display};

use super::{AstRoot, Block, Expression, FnDefinition, Item, Statement};

impl Display for AstRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

impl Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::FnDefinition(def) => write!(f, "{def}"),
            Item::Statement(stmt) => write!(f, "{stmt}"),
        }
    }
}

impl Display for FnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}({}) {}", self.name, self.params.join(", "), self.body)
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for stmt in &self.statements {
            for line in stmt.to_string().lines() {
                writeln!(f, "\t{line}")?;
            }
        }
        write!(f, "}}")
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Block(block) => write!(f, "{block}"),
            Statement::VarDecl { name, value, .. } => write!(f, "let {name} = {value};"),
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                write!(f, "if ({condition}) {then_branch}")?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else {else_branch}")?;
                }
                Ok(())
            }
            Statement::While { condition, body, .. } => write!(f, "while ({condition}) {body}"),
            Statement::ForEach {
                binding,
                iterable,
                body,
                ..
            } => write!(f, "for (let {binding} in {iterable}) {body}"),
            Statement::Break { .. } => write!(f, "break;"),
            Statement::Continue { .. } => write!(f, "continue;"),
            Statement::Return { value, .. } => match value {
                Some(value) => write!(f, "return {value};"),
                None => write!(f, "return;"),
            },
            Statement::Try {
                try_body,
                err_binding,
                catch_body,
                ..
            } => {
                write!(f, "try {try_body} catch ")?;
                if let Some(name) = err_binding {
                    write!(f, "({name}) ")?;
                }
                write!(f, "{catch_body}")
            }
            Statement::Expression(expr) => write!(f, "{expr};"),
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::BoolLit { value, .. } => write!(f, "{}", if *value { "true" } else { "false" }),
            Expression::IntLit { value, .. } => write!(f, "{value}"),
            Expression::FloatLit { value, .. } => write!(f, "{value}"),
            Expression::StrLit { value, .. } => write!(f, "{value:?}"),
            Expression::NullLit { .. } => write!(f, "null"),
            Expression::ListLit { items, .. } => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Expression::DictLit { pairs, .. } => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Expression::Access { name, .. } => write!(f, "{name}"),
            Expression::Assignment { name, value, .. } => write!(f, "{name} = {value}"),
            Expression::AttrAccess { object, attr, .. } => write!(f, "{object}.{attr}"),
            Expression::AttrAssign { object, attr, value, .. } => {
                write!(f, "{object}.{attr} = {value}")
            }
            Expression::ItemAccess { object, key, .. } => write!(f, "{object}[{key}]"),
            Expression::ItemAssign { object, key, value, .. } => {
                write!(f, "{object}[{key}] = {value}")
            }
            Expression::Call { callee, args, .. } => {
                write!(f, "{callee}(")?;
                write_joined(f, args)?;
                write!(f, ")")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, exprs: &[Expression]) -> fmt::Result {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{expr}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::lexer::lex;
    use crate::parser::Parser;

    fn print(src: &str) -> String {
        Parser::new(lex(src).unwrap()).parse().unwrap().to_string()
    }

    #[test]
    fn prints_var_decl() {
        assert_eq!(print("let x = 1;"), "let x = 1;");
    }

    #[test]
    fn prints_fn_definition_with_indented_block() {
        assert_eq!(
            print("fn add(a, b) { return a; }"),
            "fn add(a, b) {\n\treturn a;\n}"
        );
    }

    #[test]
    fn prints_if_else() {
        assert_eq!(print("if (true) { } else { }"), "if (true) {\n} else {\n}");
    }

    #[test]
    fn prints_nested_blocks_with_double_indent() {
        assert_eq!(
            print("while (true) { if (true) { break; } }"),
            "while (true) {\n\tif (true) {\n\t\tbreak;\n\t}\n}"
        );
    }

    #[test]
    fn prints_call_and_list_and_dict() {
        assert_eq!(print("f([1, 2], {\"a\": 1});"), "f([1, 2], {\"a\": 1});");
    }
}
