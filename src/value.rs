//! Runtime value representation.
//!
//! Lists and dicts are `Rc<RefCell<_>>`-backed so that aliasing works
//! the way dynamic-language lists/dicts do: two bindings that refer to
//! "the same" list see each other's mutations, even after one of them
//! has been captured into a closure snapshot.

use std::cell::RefCell;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::Block;
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::span::Position;

pub type NativeFn = dyn Fn(&[Value], Position) -> Result<Value, RuntimeError>;

/// A user-defined function's closure: parameters, body, and the
/// environment snapshot taken at the `fn` statement's execution.
pub struct UserFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
    pub captured_env: Environment,
}

/// Shared slot a forward-declared function's prototype resolves
/// through once its real closure is built. Every environment snapshot
/// taken while the name is still unresolved holds a `Prototype` with a
/// clone of this same `Rc`, so a closure defined earlier can still call
/// a sibling defined later in the same top-level pass — the two-pass
/// startup overwrites the *live* environment binding in place, which a
/// value-copy snapshot taken beforehand would not otherwise observe.
pub type ForwardRef = Rc<RefCell<Option<Callable>>>;

#[derive(Clone)]
pub enum Callable {
    User(Rc<UserFunction>),
    Native(Rc<str>, Rc<NativeFn>),
    /// Forward-declaration placeholder installed during the startup
    /// pass. Calling it resolves `ForwardRef` one more time: if the
    /// function has since been defined, the call proceeds against the
    /// real closure; otherwise it's a runtime error naming the
    /// function.
    Prototype(Rc<str>, ForwardRef),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::User(f) => &f.name,
            Callable::Native(name, _) => name,
            Callable::Prototype(name, _) => name,
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::User(a), Callable::User(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(_, a), Callable::Native(_, b)) => Rc::ptr_eq(a, b),
            (Callable::Prototype(a, _), Callable::Prototype(b, _)) => a == b,
            _ => false,
        }
    }
}

/// A half-open, step-wise integer sequence produced by `range`. Kept
/// lazy rather than materialized into a list so that `range(n)` for
/// large `n` stays cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRange {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl ValueRange {
    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let (start, stop, step) = (self.start, self.stop, self.step);
        let mut cur = start;
        std::iter::from_fn(move || {
            let in_range = if step > 0 { cur < stop } else { cur > stop };
            if !in_range {
                return None;
            }
            let val = cur;
            cur += step;
            Some(val)
        })
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<IndexMap<Value, Value>>>),
    Range(ValueRange),
    Callable(Callable),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: IndexMap<Value, Value>) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Range(_) => "range",
            Value::Callable(_) => "function",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Dict(entries) => !entries.borrow().is_empty(),
            Value::Range(r) => r.len() != 0,
            Value::Callable(_) => true,
        }
    }

    /// Whether this value may be used as a dict key. Mirrors the
    /// expanded spec's restriction to hashable scalars.
    pub fn is_hashable_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    /// The closed set of attributes the language exposes, rather than
    /// leaking the host representation's own fields: `.length` on
    /// strings, lists, and dicts.
    pub fn attr(&self, name: &str) -> Option<Value> {
        match (self, name) {
            (Value::Str(s), "length") => Some(Value::Int(s.chars().count() as i64)),
            (Value::List(items), "length") => Some(Value::Int(items.borrow().len() as i64)),
            (Value::Dict(entries), "length") => Some(Value::Int(entries.borrow().len() as i64)),
            (Value::Range(r), "length") => Some(Value::Int(r.len() as i64)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            // Int and Float share a tag and hash by the same f64
            // representation, because `eq` treats `Int(1)` and
            // `Float(1.0)` as equal — the `Hash`/`Eq` contract requires
            // equal values to hash equally, so the two variants cannot
            // carry distinct discriminants into the hash.
            Value::Int(n) => {
                state.write_u8(0);
                (*n as f64).to_bits().hash(state);
            }
            Value::Float(f) => {
                state.write_u8(0);
                f.to_bits().hash(state);
            }
            Value::Null => state.write_u8(1),
            Value::Bool(b) => {
                state.write_u8(2);
                b.hash(state);
            }
            Value::Str(s) => {
                state.write_u8(3);
                s.hash(state);
            }
            // List/Dict are never legal keys; these arms only exist so
            // `Value` as a whole can implement `Hash` for IndexMap's
            // bound. Identity hashing avoids recursing into cyclic
            // structures.
            Value::List(items) => {
                state.write_u8(4);
                (Rc::as_ptr(items) as usize).hash(state);
            }
            Value::Dict(entries) => {
                state.write_u8(5);
                (Rc::as_ptr(entries) as usize).hash(state);
            }
            Value::Range(r) => {
                state.write_u8(6);
                (r.start, r.stop, r.step).hash(state);
            }
            Value::Callable(c) => {
                state.write_u8(7);
                c.name().hash(state);
            }
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Range(r) => write!(f, "range({}, {}, {})", r.start, r.stop, r.step),
            Value::Callable(c) => write!(f, "<fn {}>", c.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_of(v: &Value) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        v.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn int_and_equal_float_are_equal_and_hash_equal() {
        let a = Value::Int(1);
        let b = Value::Float(1.0);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn dict_lookup_finds_int_key_via_equal_float() {
        let mut entries = IndexMap::new();
        entries.insert(Value::Int(1), Value::str("a"));
        let dict = Value::dict(entries);
        let Value::Dict(map) = &dict else { unreachable!() };
        assert_eq!(map.borrow().get(&Value::Float(1.0)), Some(&Value::str("a")));
    }
}
