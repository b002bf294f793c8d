//! Tree-walking evaluator.
//!
//! Non-local control transfers (`break`/`continue`/`return`) are
//! modeled as an ordinary return value rather than host exceptions:
//! every statement evaluates to `Result<Signal, EvalError>`. This
//! keeps the catchable/non-catchable split at the type level —
//! `try`/`catch` only ever inspects the `Err` side, and `Ok(Signal::*)`
//! passes straight through every intermediate frame with no special
//! casing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, trace};

use crate::ast::{AstRoot, Block, Expression, Item, Statement};
use crate::env::Environment;
use crate::error::{EvalBug, EvalError, RuntimeError};
use crate::span::Position;
use crate::value::{Callable, UserFunction, Value};

/// The result of executing a statement: either it ran to completion
/// (`Normal`) or it's carrying a control-flow transfer up to the frame
/// that handles it.
#[derive(Debug, Clone)]
pub enum Signal {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter {
    env: Environment,
}

impl Interpreter {
    /// Runs `ast` to completion against a fresh environment seeded with
    /// `builtins`. Two-pass startup: built-ins first, then function
    /// forward-declaration, then execution in source order.
    pub fn evaluate(ast: &AstRoot, builtins: HashMap<String, Value>) -> Result<(), EvalError> {
        let mut interp = Interpreter {
            env: Environment::new(),
        };

        for (name, value) in builtins {
            interp.env.push(&name, value);
        }

        let mut forward_refs: HashMap<String, Rc<RefCell<Option<Callable>>>> = HashMap::new();
        for item in &ast.items {
            if let Item::FnDefinition(def) = item {
                if !interp.env.has(&def.name) {
                    let slot = Rc::new(RefCell::new(None));
                    interp.env.declare(
                        &def.name,
                        Value::Callable(Callable::Prototype(def.name.as_str().into(), slot.clone())),
                        def.position,
                    )?;
                    forward_refs.insert(def.name.clone(), slot);
                }
            }
        }

        for item in &ast.items {
            match item {
                Item::FnDefinition(def) => {
                    let closure = Callable::User(Rc::new(UserFunction {
                        name: def.name.clone(),
                        params: def.params.clone(),
                        body: def.body.clone(),
                        captured_env: interp.env.clone(),
                    }));
                    if let Some(slot) = forward_refs.get(&def.name) {
                        *slot.borrow_mut() = Some(closure.clone());
                    }
                    interp.env.assign(&def.name, Value::Callable(closure), def.position)?;
                }
                Item::Statement(stmt) => {
                    match interp.exec_stmt(stmt)? {
                        Signal::Normal => {}
                        other => {
                            return Err(EvalBug(format!(
                                "unhandled control-flow transfer at top level: {other:?}"
                            ))
                            .into())
                        }
                    }
                }
            }
        }

        debug!("program finished");
        Ok(())
    }

    fn exec_block(&mut self, block: &Block) -> Result<Signal, EvalError> {
        self.env.enter_scope();
        let result = self.exec_stmts(&block.statements);
        self.env.exit_scope();
        result
    }

    fn exec_stmts(&mut self, stmts: &[Statement]) -> Result<Signal, EvalError> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Signal::Normal => {}
                signal => return Ok(signal),
            }
        }
        Ok(Signal::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Statement) -> Result<Signal, EvalError> {
        trace!("executing statement at {:?}", stmt.position());
        match stmt {
            Statement::Block(block) => self.exec_block(block),
            Statement::VarDecl { name, value, position } => {
                let val = self.eval_expr(value)?;
                self.env.declare(name, val, *position)?;
                Ok(Signal::Normal)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let cond = self.eval_expr(condition)?.truthy();
                if cond {
                    self.env.enter_scope();
                    let result = self.exec_stmts(&then_branch.statements);
                    self.env.exit_scope();
                    result
                } else {
                    match else_branch.as_deref() {
                        // "else if" is a nested If statement in its own
                        // right; it manages its own scope.
                        Some(Statement::If { .. }) => self.exec_stmt(else_branch.as_ref().unwrap()),
                        Some(Statement::Block(block)) => {
                            self.env.enter_scope();
                            let result = self.exec_stmts(&block.statements);
                            self.env.exit_scope();
                            result
                        }
                        Some(_) => unreachable!("else branch is always If or Block"),
                        None => Ok(Signal::Normal),
                    }
                }
            }
            Statement::While { condition, body, .. } => {
                while self.eval_expr(condition)?.truthy() {
                    self.env.enter_scope();
                    let result = self.exec_stmts(&body.statements);
                    self.env.exit_scope();
                    match result? {
                        Signal::Break => break,
                        Signal::Continue | Signal::Normal => {}
                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                }
                Ok(Signal::Normal)
            }
            Statement::ForEach {
                binding,
                iterable,
                body,
                position,
            } => self.exec_for_each(binding, iterable, body, *position),
            Statement::Break { .. } => Ok(Signal::Break),
            Statement::Continue { .. } => Ok(Signal::Continue),
            Statement::Return { value, .. } => {
                let val = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                Ok(Signal::Return(val))
            }
            Statement::Try {
                try_body,
                err_binding,
                catch_body,
                ..
            } => self.exec_try(try_body, err_binding.as_deref(), catch_body),
            Statement::Expression(expr) => {
                self.eval_expr(expr)?;
                Ok(Signal::Normal)
            }
        }
    }

    fn exec_for_each(
        &mut self,
        binding: &str,
        iterable: &Expression,
        body: &Block,
        position: Position,
    ) -> Result<Signal, EvalError> {
        let iterable_val = self.eval_expr(iterable)?;
        let items: Vec<Value> = match &iterable_val {
            Value::List(items) => items.borrow().clone(),
            Value::Dict(entries) => entries.borrow().keys().cloned().collect(),
            Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
            Value::Range(r) => r.iter().map(Value::Int).collect(),
            other => {
                return Err(RuntimeError::new(
                    format!("cannot iterate over value of type {}", other.type_name()),
                    position,
                )
                .into())
            }
        };

        for item in items {
            self.env.enter_scope();
            self.env.push(binding, item);
            let result = self.exec_stmts(&body.statements);
            self.env.exit_scope();
            match result? {
                Signal::Break => break,
                Signal::Continue | Signal::Normal => {}
                signal @ Signal::Return(_) => return Ok(signal),
            }
        }
        Ok(Signal::Normal)
    }

    fn exec_try(
        &mut self,
        try_body: &Block,
        err_binding: Option<&str>,
        catch_body: &Block,
    ) -> Result<Signal, EvalError> {
        match self.exec_block(try_body) {
            Ok(signal) => Ok(signal),
            Err(EvalError::Bug(bug)) => Err(bug.into()),
            Err(EvalError::Runtime(err)) => {
                self.env.enter_scope();
                if let Some(name) = err_binding {
                    self.env.push(name, Value::str(err.message.clone()));
                }
                let result = self.exec_stmts(&catch_body.statements);
                self.env.exit_scope();
                result
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expression) -> Result<Value, EvalError> {
        match expr {
            Expression::BoolLit { value, .. } => Ok(Value::Bool(*value)),
            Expression::IntLit { value, .. } => Ok(Value::Int(*value)),
            Expression::FloatLit { value, .. } => Ok(Value::Float(*value)),
            Expression::StrLit { value, .. } => Ok(Value::str(value.clone())),
            Expression::NullLit { .. } => Ok(Value::Null),
            Expression::ListLit { items, .. } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item)?);
                }
                Ok(Value::list(values))
            }
            Expression::DictLit { pairs, .. } => {
                let mut entries = indexmap::IndexMap::new();
                for (key_expr, val_expr) in pairs {
                    let key = self.eval_expr(key_expr)?;
                    if !key.is_hashable_scalar() {
                        return Err(RuntimeError::new(
                            format!("value of type {} cannot be used as a dict key", key.type_name()),
                            key_expr.position(),
                        )
                        .into());
                    }
                    let val = self.eval_expr(val_expr)?;
                    entries.insert(key, val);
                }
                Ok(Value::dict(entries))
            }
            Expression::Access { name, position } => Ok(self.env.lookup(name, *position)?),
            Expression::Assignment { name, value, position } => {
                let val = self.eval_expr(value)?;
                self.env.assign(name, val.clone(), *position)?;
                Ok(val)
            }
            Expression::AttrAccess { object, attr, position } => {
                let obj = self.eval_expr(object)?;
                obj.attr(attr).ok_or_else(|| {
                    RuntimeError::new(
                        format!("cannot access attribute '{attr}' on value of type {}", obj.type_name()),
                        *position,
                    )
                    .into()
                })
            }
            Expression::AttrAssign {
                object,
                attr,
                value,
                position,
            } => {
                let obj = self.eval_expr(object)?;
                self.eval_expr(value)?;
                Err(RuntimeError::new(
                    format!("cannot set attribute '{attr}' on value of type {}", obj.type_name()),
                    *position,
                )
                .into())
            }
            Expression::ItemAccess { object, key, position } => {
                let obj = self.eval_expr(object)?;
                let key_val = self.eval_expr(key)?;
                self.item_access(&obj, &key_val, *position)
            }
            Expression::ItemAssign {
                object,
                key,
                value,
                position,
            } => {
                let obj = self.eval_expr(object)?;
                let key_val = self.eval_expr(key)?;
                let val = self.eval_expr(value)?;
                self.item_assign(&obj, &key_val, val.clone(), *position)?;
                Ok(val)
            }
            Expression::Call { callee, args, position } => self.eval_call(callee, args, *position),
        }
    }

    fn item_access(&self, obj: &Value, key: &Value, position: Position) -> Result<Value, EvalError> {
        match obj {
            Value::List(items) => {
                let items = items.borrow();
                let idx = list_index(key, items.len()).ok_or_else(|| {
                    RuntimeError::new(format!("cannot access item {key} on value of type list"), position)
                })?;
                items
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| RuntimeError::new(format!("index out of range: {key}"), position).into())
            }
            Value::Dict(entries) => entries
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| RuntimeError::new(format!("unknown key: {key}"), position).into()),
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = list_index(key, chars.len()).ok_or_else(|| {
                    RuntimeError::new(format!("cannot access item {key} on value of type string"), position)
                })?;
                chars
                    .get(idx)
                    .map(|c| Value::str(c.to_string()))
                    .ok_or_else(|| RuntimeError::new(format!("index out of range: {key}"), position).into())
            }
            other => Err(RuntimeError::new(
                format!("cannot access item {key} on value of type {}", other.type_name()),
                position,
            )
            .into()),
        }
    }

    fn item_assign(&self, obj: &Value, key: &Value, value: Value, position: Position) -> Result<(), EvalError> {
        match obj {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let idx = list_index(key, items.len()).ok_or_else(|| {
                    RuntimeError::new(format!("cannot assign item {key} on value of type list"), position)
                })?;
                match items.get_mut(idx) {
                    Some(slot) => {
                        *slot = value;
                        Ok(())
                    }
                    None => Err(RuntimeError::new(format!("index out of range: {key}"), position).into()),
                }
            }
            Value::Dict(entries) => {
                if !key.is_hashable_scalar() {
                    return Err(RuntimeError::new(
                        format!("value of type {} cannot be used as a dict key", key.type_name()),
                        position,
                    )
                    .into());
                }
                entries.borrow_mut().insert(key.clone(), value);
                Ok(())
            }
            other => Err(RuntimeError::new(
                format!("cannot assign item {key} on value of type {}", other.type_name()),
                position,
            )
            .into()),
        }
    }

    fn eval_call(&mut self, callee: &Expression, args: &[Expression], position: Position) -> Result<Value, EvalError> {
        let callee_val = self.eval_expr(callee)?;
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.eval_expr(arg)?);
        }

        let callable = match &callee_val {
            Value::Callable(c) => c,
            other => {
                return Err(RuntimeError::new(
                    format!("cannot call non-callable value of type {}", other.type_name()),
                    position,
                )
                .into())
            }
        };

        match callable {
            Callable::Prototype(name, slot) => match slot.borrow().clone() {
                Some(resolved) => self.call_callable(&resolved, &arg_values, position),
                None => Err(RuntimeError::new(format!("cannot call fn {name} before it is defined"), position).into()),
            },
            Callable::Native(name, f) => f(&arg_values, position).map_err(|e| {
                RuntimeError::new(format!("error calling {name}: {}", e.message), position).into()
            }),
            Callable::User(func) => self.call_user_function(func, &arg_values, position),
        }
    }

    fn call_callable(&mut self, callable: &Callable, args: &[Value], position: Position) -> Result<Value, EvalError> {
        match callable {
            Callable::Prototype(name, _) => {
                Err(RuntimeError::new(format!("cannot call fn {name} before it is defined"), position).into())
            }
            Callable::Native(name, f) => f(args, position)
                .map_err(|e| RuntimeError::new(format!("error calling {name}: {}", e.message), position).into()),
            Callable::User(func) => self.call_user_function(func, args, position),
        }
    }

    fn call_user_function(
        &mut self,
        func: &Rc<UserFunction>,
        args: &[Value],
        position: Position,
    ) -> Result<Value, EvalError> {
        if func.params.len() != args.len() {
            return Err(RuntimeError::new(
                format!(
                    "call {}: want {} args, got {}",
                    func.name,
                    func.params.len(),
                    args.len()
                ),
                position,
            )
            .into());
        }

        let mut call_env = func.captured_env.clone();
        call_env.enter_scope();
        for (param, arg) in func.params.iter().zip(args) {
            call_env.declare(param, arg.clone(), position)?;
        }

        let saved_env = std::mem::replace(&mut self.env, call_env);
        let result = self.exec_stmts(&func.body.statements);
        self.env = saved_env;

        match result? {
            Signal::Return(value) => Ok(value),
            Signal::Normal => Ok(Value::Null),
            other => Err(EvalBug(format!("{other:?} escaped function body {}", func.name)).into()),
        }
    }
}

/// Resolves an `Int` key into a non-negative list index, supporting
/// Python-style negative indexing from the end.
fn list_index(key: &Value, len: usize) -> Option<usize> {
    let Value::Int(i) = key else { return None };
    let i = *i;
    if i >= 0 {
        usize::try_from(i).ok()
    } else {
        let from_end = len as i64 + i;
        usize::try_from(from_end).ok()
    }
}
