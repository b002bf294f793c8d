use log::debug;

use crate::ast::{AstRoot, Block, Expression, FnDefinition, Item, Statement};
use crate::error::SyntaxError;
use crate::lexer::{Token, TokenKind};
use crate::span::Position;

/// Recursive-descent parser over a fixed token sequence. There is no
/// operator precedence to track — the only ambiguities are the
/// identifier/assignment 1-token lookahead and the `for (let x in ...)`
/// vs. C-style `for` 3-token lookahead, both resolved by save/restore.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    loop_depth: usize,
    in_fn_decl: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            loop_depth: 0,
            in_fn_decl: false,
        }
    }

    pub fn parse(mut self) -> Result<AstRoot, SyntaxError> {
        let mut items = vec![];
        while !self.is_done() {
            if self.check(&TokenKind::Fn) {
                items.push(Item::FnDefinition(self.parse_fn_definition()?));
            } else {
                items.push(Item::Statement(self.parse_stmt()?));
            }
        }
        debug!("parsed {} top-level items", items.len());
        Ok(AstRoot { items })
    }

    // -- top level ----------------------------------------------------

    fn parse_fn_definition(&mut self) -> Result<FnDefinition, SyntaxError> {
        let tok = self.expect(TokenKind::Fn)?;
        let name = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::LeftParen)?;

        let mut params = vec![];
        while !self.accept(&TokenKind::RightParen) {
            if !params.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            params.push(self.expect(TokenKind::Identifier)?.text);
        }

        let prev_in_fn_decl = self.in_fn_decl;
        self.in_fn_decl = true;
        let body = self.parse_block()?;
        self.in_fn_decl = prev_in_fn_decl;

        Ok(FnDefinition {
            name,
            params,
            body,
            position: tok.position,
        })
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let tok = self.expect(TokenKind::LeftBrace)?;
        let mut statements = vec![];
        while !self.accept(&TokenKind::RightBrace) {
            statements.push(self.parse_stmt()?);
        }
        Ok(Block {
            statements,
            position: tok.position,
        })
    }

    // -- statements -----------------------------------------------------

    fn parse_stmt(&mut self) -> Result<Statement, SyntaxError> {
        while self.accept(&TokenKind::Semicolon) {}

        match self.peek().kind.clone() {
            TokenKind::For => self.parse_for(),
            TokenKind::If => self.parse_if(),
            TokenKind::Let => self.parse_var_decl(),
            TokenKind::Try => self.parse_try(),
            TokenKind::While => self.parse_while(),
            TokenKind::Break => self.parse_break(),
            TokenKind::Continue => self.parse_continue(),
            TokenKind::Return => self.parse_return(),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    fn parse_if(&mut self) -> Result<Statement, SyntaxError> {
        let tok = self.expect(TokenKind::If)?;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RightParen)?;
        let then_branch = self.parse_block()?;
        let else_branch = self.parse_else_branch()?;
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch: else_branch.map(Box::new),
            position: tok.position,
        })
    }

    fn parse_else_branch(&mut self) -> Result<Option<Statement>, SyntaxError> {
        if !self.accept(&TokenKind::Else) {
            return Ok(None);
        }
        if self.check(&TokenKind::If) {
            Ok(Some(self.parse_if()?))
        } else {
            let block = self.parse_block()?;
            Ok(Some(Statement::Block(block)))
        }
    }

    fn parse_var_decl(&mut self) -> Result<Statement, SyntaxError> {
        let tok = self.expect(TokenKind::Let)?;
        let name = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Statement::VarDecl {
            name,
            value,
            position: tok.position,
        })
    }

    fn parse_while(&mut self) -> Result<Statement, SyntaxError> {
        let tok = self.expect(TokenKind::While)?;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RightParen)?;
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        Ok(Statement::While {
            condition,
            body: body?,
            position: tok.position,
        })
    }

    fn parse_try(&mut self) -> Result<Statement, SyntaxError> {
        let tok = self.expect(TokenKind::Try)?;
        let try_body = self.parse_block()?;
        self.expect(TokenKind::Catch)?;
        let err_binding = if self.accept(&TokenKind::LeftParen) {
            let name = self.expect(TokenKind::Identifier)?.text;
            self.expect(TokenKind::RightParen)?;
            Some(name)
        } else {
            None
        };
        let catch_body = self.parse_block()?;
        Ok(Statement::Try {
            try_body,
            err_binding,
            catch_body,
            position: tok.position,
        })
    }

    fn parse_break(&mut self) -> Result<Statement, SyntaxError> {
        let tok = self.expect(TokenKind::Break)?;
        if self.loop_depth == 0 {
            return Err(SyntaxError::new("unexpected break outside of loop body", tok.position));
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(Statement::Break { position: tok.position })
    }

    fn parse_continue(&mut self) -> Result<Statement, SyntaxError> {
        let tok = self.expect(TokenKind::Continue)?;
        if self.loop_depth == 0 {
            return Err(SyntaxError::new("unexpected continue outside of loop body", tok.position));
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(Statement::Continue { position: tok.position })
    }

    fn parse_return(&mut self) -> Result<Statement, SyntaxError> {
        let tok = self.expect(TokenKind::Return)?;
        if !self.in_fn_decl {
            return Err(SyntaxError::new(
                "unexpected return outside of function declaration",
                tok.position,
            ));
        }
        if self.accept(&TokenKind::Semicolon) {
            return Ok(Statement::Return {
                value: None,
                position: tok.position,
            });
        }
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Statement::Return {
            value: Some(value),
            position: tok.position,
        })
    }

    // -- for loops & continue-rewriting desugar ------------------------

    fn parse_for(&mut self) -> Result<Statement, SyntaxError> {
        self.expect(TokenKind::For)?;
        let tok = self.expect(TokenKind::LeftParen)?;

        let mark = self.pos;
        let is_for_each = self.accept(&TokenKind::Let)
            && self.accept(&TokenKind::Identifier)
            && self.accept(&TokenKind::In);
        self.pos = mark;

        if is_for_each {
            self.parse_for_each(tok.position)
        } else {
            self.parse_c_style_for(tok.position)
        }
    }

    fn parse_for_each(&mut self, position: Position) -> Result<Statement, SyntaxError> {
        self.expect(TokenKind::Let)?;
        let binding = self.expect(TokenKind::Identifier)?.text;
        self.expect(TokenKind::In)?;
        let iterable = self.parse_expr()?;
        self.expect(TokenKind::RightParen)?;

        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;

        Ok(Statement::ForEach {
            binding,
            iterable,
            body: body?,
            position,
        })
    }

    fn parse_c_style_for(&mut self, position: Position) -> Result<Statement, SyntaxError> {
        let init = self.parse_for_init()?;
        let cond = self.parse_for_cond(position)?;
        let post = self.parse_for_post()?;
        self.expect(TokenKind::RightParen)?;

        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        let mut body = body?;

        if let Some(post) = &post {
            let already_continues = body
                .statements
                .last()
                .map(Statement::is_bare_continue)
                .unwrap_or(false);
            if !already_continues {
                body.statements.push(Statement::Continue { position: (0, 0) });
            }
            for stmt in &mut body.statements {
                rewrite_continues(stmt, post);
            }
        }

        let while_stmt = Statement::While {
            condition: cond,
            body,
            position,
        };

        let mut statements = vec![];
        if let Some(init) = init {
            statements.push(init);
        }
        statements.push(while_stmt);

        Ok(Statement::Block(Block { statements, position }))
    }

    fn parse_for_init(&mut self) -> Result<Option<Statement>, SyntaxError> {
        if self.accept(&TokenKind::Semicolon) {
            Ok(None)
        } else if self.check(&TokenKind::Let) {
            Ok(Some(self.parse_var_decl()?))
        } else {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon)?;
            Ok(Some(Statement::Expression(expr)))
        }
    }

    fn parse_for_cond(&mut self, position: Position) -> Result<Expression, SyntaxError> {
        if self.accept(&TokenKind::Semicolon) {
            Ok(Expression::BoolLit { value: true, position })
        } else {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon)?;
            Ok(expr)
        }
    }

    fn parse_for_post(&mut self) -> Result<Option<Expression>, SyntaxError> {
        if self.check(&TokenKind::RightParen) {
            Ok(None)
        } else {
            Ok(Some(self.parse_expr()?))
        }
    }

    // -- expressions ----------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expression, SyntaxError> {
        let tok = self.advance();
        let position = tok.position;

        let atom = match tok.kind {
            TokenKind::BoolLit => Expression::BoolLit {
                value: tok.text == "true",
                position,
            },
            TokenKind::FloatLit => Expression::FloatLit {
                value: tok.text.parse().map_err(|_| {
                    SyntaxError::new(format!("invalid float literal '{}'", tok.text), position)
                })?,
                position,
            },
            TokenKind::IntLit => Expression::IntLit {
                value: tok.text.parse().map_err(|_| {
                    SyntaxError::new(format!("invalid integer literal '{}'", tok.text), position)
                })?,
                position,
            },
            TokenKind::StrLit => Expression::StrLit {
                value: decode_str_lit(&tok.text, position)?,
                position,
            },
            TokenKind::NullLit => Expression::NullLit { position },
            TokenKind::LeftParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RightParen)?;
                inner
            }
            TokenKind::LeftSquareBracket => {
                self.pos -= 1;
                self.parse_list_lit()?
            }
            TokenKind::LeftBrace => {
                self.pos -= 1;
                self.parse_dict_lit()?
            }
            TokenKind::Identifier => {
                if self.check(&TokenKind::Eq) {
                    self.advance();
                    let value = self.parse_expr()?;
                    Expression::Assignment {
                        name: tok.text,
                        value: Box::new(value),
                        position,
                    }
                } else {
                    Expression::Access {
                        name: tok.text,
                        position,
                    }
                }
            }
            other => {
                return Err(SyntaxError::new(
                    format!("unexpected token {other} at start of expression"),
                    position,
                ))
            }
        };

        self.finish_expr(atom)
    }

    fn finish_expr(&mut self, mut expr: Expression) -> Result<Expression, SyntaxError> {
        loop {
            match self.peek().kind {
                TokenKind::AttrAccess => expr = self.parse_attr_suffix(expr)?,
                TokenKind::LeftSquareBracket => expr = self.parse_item_suffix(expr)?,
                TokenKind::LeftParen => expr = self.parse_call_suffix(expr)?,
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_suffix(&mut self, callee: Expression) -> Result<Expression, SyntaxError> {
        let position = callee.position();
        self.expect(TokenKind::LeftParen)?;
        let mut args = vec![];
        while !self.accept(&TokenKind::RightParen) {
            if !args.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            args.push(self.parse_expr()?);
        }
        Ok(Expression::Call {
            callee: Box::new(callee),
            args,
            position,
        })
    }

    fn parse_attr_suffix(&mut self, object: Expression) -> Result<Expression, SyntaxError> {
        let position = object.position();
        let tok = self.expect(TokenKind::AttrAccess)?;
        let attr = tok.text.trim_start_matches('.').to_string();
        if self.accept(&TokenKind::Eq) {
            let value = self.parse_expr()?;
            Ok(Expression::AttrAssign {
                object: Box::new(object),
                attr,
                value: Box::new(value),
                position,
            })
        } else {
            Ok(Expression::AttrAccess {
                object: Box::new(object),
                attr,
                position,
            })
        }
    }

    fn parse_item_suffix(&mut self, object: Expression) -> Result<Expression, SyntaxError> {
        let position = object.position();
        self.expect(TokenKind::LeftSquareBracket)?;
        let key = self.parse_expr()?;
        self.expect(TokenKind::RightSquareBracket)?;
        if self.accept(&TokenKind::Eq) {
            let value = self.parse_expr()?;
            Ok(Expression::ItemAssign {
                object: Box::new(object),
                key: Box::new(key),
                value: Box::new(value),
                position,
            })
        } else {
            Ok(Expression::ItemAccess {
                object: Box::new(object),
                key: Box::new(key),
                position,
            })
        }
    }

    fn parse_list_lit(&mut self) -> Result<Expression, SyntaxError> {
        let tok = self.expect(TokenKind::LeftSquareBracket)?;
        let mut items = vec![];
        while !self.accept(&TokenKind::RightSquareBracket) {
            if !items.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            items.push(self.parse_expr()?);
        }
        Ok(Expression::ListLit {
            items,
            position: tok.position,
        })
    }

    fn parse_dict_lit(&mut self) -> Result<Expression, SyntaxError> {
        let tok = self.expect(TokenKind::LeftBrace)?;
        let mut pairs = vec![];
        while !self.accept(&TokenKind::RightBrace) {
            if !pairs.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            let key = self.parse_expr()?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expr()?;
            pairs.push((key, value));
        }
        Ok(Expression::DictLit {
            pairs,
            position: tok.position,
        })
    }

    // -- token stream helpers -------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn accept(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        let tok = self.advance();
        if tok.kind != kind {
            return Err(SyntaxError::new(
                format!("unexpected token {}; expected {kind}", tok.kind),
                tok.position,
            ));
        }
        Ok(tok)
    }

    fn is_done(&self) -> bool {
        self.tokens[self.pos].kind == TokenKind::Eof
    }
}

/// Rewrites every `continue` reachable without crossing a nested loop
/// into `{ post; continue; }`, so the for loop's post-expression always
/// runs before restarting iteration.
fn rewrite_continues(stmt: &mut Statement, post: &Expression) {
    match stmt {
        Statement::Block(block) => {
            for s in &mut block.statements {
                rewrite_continues(s, post);
            }
        }
        Statement::If {
            then_branch,
            else_branch,
            ..
        } => {
            for s in &mut then_branch.statements {
                rewrite_continues(s, post);
            }
            if let Some(else_branch) = else_branch {
                rewrite_continues(else_branch, post);
            }
        }
        Statement::Try {
            try_body,
            catch_body,
            ..
        } => {
            for s in &mut try_body.statements {
                rewrite_continues(s, post);
            }
            for s in &mut catch_body.statements {
                rewrite_continues(s, post);
            }
        }
        Statement::Continue { position } => {
            let position = *position;
            *stmt = Statement::Block(Block {
                statements: vec![
                    Statement::Expression(post.clone()),
                    Statement::Continue { position },
                ],
                position,
            });
        }
        // While/ForEach bodies are a different loop frame; their own
        // continue belongs to that loop, not this one.
        _ => {}
    }
}

/// Strips the surrounding quotes and decodes backslash escapes. The
/// lexer only verified the literal is well-formed enough to have a
/// matching closing quote; decoding can still fail on a bad escape
/// sequence.
fn decode_str_lit(text: &str, position: Position) -> Result<String, SyntaxError> {
    let inner = &text[1..text.len() - 1];
    unescape::unescape(inner).ok_or_else(|| SyntaxError::new("invalid string literal", position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_ok(src: &str) -> AstRoot {
        Parser::new(lex(src).unwrap()).parse().unwrap()
    }

    #[test]
    fn parses_var_decl() {
        let ast = parse_ok("let x = 1;");
        assert_eq!(ast.items.len(), 1);
        assert!(matches!(ast.items[0], Item::Statement(Statement::VarDecl { .. })));
    }

    #[test]
    fn parses_fn_definition_and_call() {
        let ast = parse_ok("fn add(a, b) { return a; } add(1, 2);");
        assert_eq!(ast.items.len(), 2);
        assert!(matches!(ast.items[0], Item::FnDefinition(_)));
    }

    #[test]
    fn break_outside_loop_is_syntax_error() {
        let err = Parser::new(lex("break;").unwrap()).parse().unwrap_err();
        assert_eq!(err.message, "unexpected break outside of loop body");
    }

    #[test]
    fn return_outside_fn_is_syntax_error() {
        let err = Parser::new(lex("return 1;").unwrap()).parse().unwrap_err();
        assert_eq!(err.message, "unexpected return outside of function declaration");
    }

    #[test]
    fn for_each_vs_c_style_disambiguation() {
        let ast = parse_ok("for (let x in xs) { }");
        match &ast.items[0] {
            Item::Statement(Statement::ForEach { binding, .. }) => assert_eq!(binding, "x"),
            other => panic!("expected ForEach, got {other:?}"),
        }

        let ast = parse_ok("for (let i = 0; true; i = 1) { }");
        match &ast.items[0] {
            Item::Statement(Statement::Block(block)) => assert_eq!(block.statements.len(), 2),
            other => panic!("expected desugared block, got {other:?}"),
        }
    }

    #[test]
    fn c_style_for_rewrites_continue_to_run_post() {
        let ast = parse_ok("for (let i = 0; true; i = 1) { if (true) { continue; } }");
        let Item::Statement(Statement::Block(block)) = &ast.items[0] else {
            panic!("expected desugared block")
        };
        let Statement::While { body, .. } = &block.statements[1] else {
            panic!("expected while loop")
        };
        let Statement::If { then_branch, .. } = &body.statements[0] else {
            panic!("expected if")
        };
        assert!(matches!(then_branch.statements[0], Statement::Block(_)));
    }

    #[test]
    fn else_if_chains_without_block_wrapping() {
        let ast = parse_ok("if (true) { } else if (false) { }");
        let Item::Statement(Statement::If { else_branch, .. }) = &ast.items[0] else {
            panic!("expected if")
        };
        assert!(matches!(else_branch.as_deref(), Some(Statement::If { .. })));
    }

    #[test]
    fn attribute_and_index_suffix_chaining() {
        let ast = parse_ok("x.length[0] = 1;");
        assert!(matches!(
            &ast.items[0],
            Item::Statement(Statement::Expression(Expression::ItemAssign { .. }))
        ));
    }
}
