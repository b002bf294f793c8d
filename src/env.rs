//! Lexically scoped environment: a single binding stack plus two
//! parallel bookkeeping stacks, rather than a parent-pointer scope
//! tree. This shape is what makes closure capture a plain `Clone` of
//! three `Vec`s/`HashSet`s — cheap because the values inside are
//! `Rc`-backed, not because the environment itself is small. The clone
//! is a value copy of the bindings themselves: mutating the original
//! after the clone was taken, or vice versa, is not observable through
//! the other.

use std::collections::HashSet;

use crate::error::RuntimeError;
use crate::span::Position;
use crate::value::Value;

#[derive(Clone)]
struct Binding {
    name: String,
    value: Value,
}

#[derive(Clone, Default)]
pub struct Environment {
    stack: Vec<Binding>,
    scope_offsets: Vec<usize>,
    declared: Vec<HashSet<String>>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            stack: vec![],
            scope_offsets: vec![],
            declared: vec![HashSet::new()],
        }
    }

    /// Pushes a new scope frame. Pair with [`Environment::exit_scope`];
    /// the caller must call it on every exit path, including ones
    /// caused by a control-flow transfer or error.
    pub fn enter_scope(&mut self) {
        self.scope_offsets.push(self.stack.len());
        self.declared.push(HashSet::new());
    }

    pub fn exit_scope(&mut self) {
        let offset = self.scope_offsets.pop().expect("scope stack underflow");
        self.stack.truncate(offset);
        self.declared.pop();
    }

    /// Declares a brand new binding in the current scope. Re-declaring
    /// a name already declared in *this* scope is a runtime error;
    /// shadowing a name from an outer scope is not.
    pub fn declare(&mut self, name: &str, value: Value, position: Position) -> Result<(), RuntimeError> {
        let current = self.declared.last_mut().expect("no active scope");
        if !current.insert(name.to_string()) {
            return Err(RuntimeError::new(
                format!("cannot redeclare variable in same scope: {name}"),
                position,
            ));
        }
        self.push(name, value);
        Ok(())
    }

    /// Pushes a binding without the re-declaration check. Used for
    /// built-ins at the base scope and for binding a function's
    /// forward-declaration prototype.
    pub fn push(&mut self, name: &str, value: Value) {
        self.stack.push(Binding {
            name: name.to_string(),
            value,
        });
    }

    pub fn has(&self, name: &str) -> bool {
        self.stack.iter().any(|b| b.name == name)
    }

    pub fn lookup(&self, name: &str, position: Position) -> Result<Value, RuntimeError> {
        self.stack
            .iter()
            .rev()
            .find(|b| b.name == name)
            .map(|b| b.value.clone())
            .ok_or_else(|| RuntimeError::new(format!("undefined variable: {name}"), position))
    }

    /// Updates *every* binding matching `name`, not just the nearest
    /// one — intentional, not nearest-scope semantics.
    pub fn assign(&mut self, name: &str, value: Value, position: Position) -> Result<(), RuntimeError> {
        let mut assigned = false;
        for binding in self.stack.iter_mut().rev() {
            if binding.name == name {
                binding.value = value.clone();
                assigned = true;
            }
        }
        if assigned {
            Ok(())
        } else {
            Err(RuntimeError::new(
                format!("cannot assign to undeclared variable: {name}"),
                position,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_in_nested_scope_does_not_error() {
        let mut env = Environment::new();
        env.declare("x", Value::Int(1), (1, 1)).unwrap();
        env.enter_scope();
        env.declare("x", Value::Int(2), (1, 1)).unwrap();
        assert_eq!(env.lookup("x", (1, 1)).unwrap(), Value::Int(2));
        env.exit_scope();
        assert_eq!(env.lookup("x", (1, 1)).unwrap(), Value::Int(1));
    }

    #[test]
    fn redeclare_same_scope_is_error() {
        let mut env = Environment::new();
        env.declare("x", Value::Int(1), (1, 1)).unwrap();
        let err = env.declare("x", Value::Int(2), (1, 1)).unwrap_err();
        assert_eq!(err.message, "cannot redeclare variable in same scope: x");
    }

    #[test]
    fn assign_updates_every_matching_binding() {
        let mut env = Environment::new();
        env.push("x", Value::Int(1));
        env.push("x", Value::Int(1));
        env.assign("x", Value::Int(9), (1, 1)).unwrap();
        assert_eq!(env.lookup("x", (1, 1)).unwrap(), Value::Int(9));
        env.stack.iter().for_each(|b| {
            if b.name == "x" {
                assert_eq!(b.value, Value::Int(9));
            }
        });
    }

    #[test]
    fn assign_to_undeclared_is_error() {
        let mut env = Environment::new();
        let err = env.assign("missing", Value::Null, (1, 1)).unwrap_err();
        assert_eq!(err.message, "cannot assign to undeclared variable: missing");
    }

    #[test]
    fn clone_snapshot_is_independent() {
        let mut env = Environment::new();
        env.declare("x", Value::Int(1), (1, 1)).unwrap();
        let snapshot = env.clone();
        env.assign("x", Value::Int(2), (1, 1)).unwrap();
        assert_eq!(snapshot.lookup("x", (1, 1)).unwrap(), Value::Int(1));
    }
}
