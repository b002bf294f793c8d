//! The built-in function catalogue. The evaluator itself never
//! inspects numeric types — every arithmetic and comparison operation
//! lives here as an ordinary callable, injected as outermost bindings
//! before evaluation begins.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::span::Position;
use crate::value::{Callable, NativeFn, Value, ValueRange};

fn native(name: &str, f: impl Fn(&[Value], Position) -> Result<Value, RuntimeError> + 'static) -> Value {
    let f: Rc<NativeFn> = Rc::new(f);
    Value::Callable(Callable::Native(name.into(), f))
}

fn arity_err(name: &str, want: &str, got: usize) -> RuntimeError {
    RuntimeError::without_position(format!("{name}: want {want} args, got {got}"))
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Numeric arithmetic stays integer-valued only when both operands are
/// integers; any float operand promotes the result to float, matching
/// ordinary dynamic-language coercion.
enum Num {
    Int(i64),
    Float(f64),
}

fn coerce(a: &Value, b: &Value, name: &str) -> Result<(Num, Num), RuntimeError> {
    let to_num = |v: &Value| match v {
        Value::Int(n) => Some(Num::Int(*n)),
        Value::Float(f) => Some(Num::Float(*f)),
        _ => None,
    };
    match (to_num(a), to_num(b)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(RuntimeError::without_position(format!(
            "{name}: expected numeric arguments, got {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn binary_numeric(
    name: &'static str,
    int_op: impl Fn(i64, i64) -> i64 + 'static,
    float_op: impl Fn(f64, f64) -> f64 + 'static,
) -> Value {
    native(name, move |args, _pos| {
        let [a, b] = args else { return Err(arity_err(name, "2", args.len())) };
        match coerce(a, b, name)? {
            (Num::Int(x), Num::Int(y)) => Ok(Value::Int(int_op(x, y))),
            (x, y) => {
                let xf = match x {
                    Num::Int(n) => n as f64,
                    Num::Float(f) => f,
                };
                let yf = match y {
                    Num::Int(n) => n as f64,
                    Num::Float(f) => f,
                };
                Ok(Value::Float(float_op(xf, yf)))
            }
        }
    })
}

fn compare(name: &'static str, op: impl Fn(std::cmp::Ordering) -> bool + 'static) -> Value {
    native(name, move |args, _pos| {
        let [a, b] = args else { return Err(arity_err(name, "2", args.len())) };
        let ordering = match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => match (a, b) {
                (Value::Str(x), Value::Str(y)) => Some(x.as_ref().cmp(y.as_ref())),
                _ => None,
            },
        };
        match ordering {
            Some(ord) => Ok(Value::Bool(op(ord))),
            None => Err(RuntimeError::without_position(format!(
                "{name}: cannot compare {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    })
}

/// The pure (non-I/O) built-in catalogue.
pub fn standard_builtins() -> HashMap<String, Value> {
    let mut m = HashMap::new();

    m.insert("lt".into(), compare("lt", |o| o.is_lt()));
    m.insert("le".into(), compare("le", |o| o.is_le()));
    m.insert("ge".into(), compare("ge", |o| o.is_ge()));
    m.insert("gt".into(), compare("gt", |o| o.is_gt()));
    m.insert(
        "eq".into(),
        native("eq", |args, _pos| {
            let [a, b] = args else { return Err(arity_err("eq", "2", args.len())) };
            Ok(Value::Bool(a == b))
        }),
    );
    m.insert(
        "ne".into(),
        native("ne", |args, _pos| {
            let [a, b] = args else { return Err(arity_err("ne", "2", args.len())) };
            Ok(Value::Bool(a != b))
        }),
    );

    m.insert(
        "abs".into(),
        native("abs", |args, _pos| {
            let [a] = args else { return Err(arity_err("abs", "1", args.len())) };
            match a {
                Value::Int(n) => Ok(Value::Int(n.abs())),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(RuntimeError::without_position(format!(
                    "abs: expected a numeric argument, got {}",
                    other.type_name()
                ))),
            }
        }),
    );

    m.insert("add".into(), add_builtin());
    m.insert("sub".into(), binary_numeric("sub", |a, b| a - b, |a, b| a - b));
    m.insert("mul".into(), binary_numeric("mul", |a, b| a * b, |a, b| a * b));
    m.insert(
        "div".into(),
        native("div", |args, _pos| {
            let [a, b] = args else { return Err(arity_err("div", "2", args.len())) };
            let (x, y) = (
                as_number(a).ok_or_else(|| non_numeric("div", a))?,
                as_number(b).ok_or_else(|| non_numeric("div", b))?,
            );
            if y == 0.0 {
                return Err(RuntimeError::without_position("div: division by zero"));
            }
            Ok(Value::Float(x / y))
        }),
    );
    m.insert("floor_div".into(), floor_div_builtin());
    m.insert("mod".into(), mod_builtin());
    m.insert(
        "pow".into(),
        native("pow", |args, _pos| {
            let [a, b] = args else { return Err(arity_err("pow", "2", args.len())) };
            match (a, b) {
                (Value::Int(base), Value::Int(exp)) if *exp >= 0 => {
                    Ok(Value::Int(base.pow(*exp as u32)))
                }
                _ => {
                    let base = as_number(a).ok_or_else(|| non_numeric("pow", a))?;
                    let exp = as_number(b).ok_or_else(|| non_numeric("pow", b))?;
                    Ok(Value::Float(base.powf(exp)))
                }
            }
        }),
    );
    m.insert(
        "neg".into(),
        native("neg", |args, _pos| {
            let [a] = args else { return Err(arity_err("neg", "1", args.len())) };
            match a {
                Value::Int(n) => Ok(Value::Int(-n)),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(non_numeric("neg", other)),
            }
        }),
    );

    m.insert(
        "not".into(),
        native("not", |args, _pos| {
            let [a] = args else { return Err(arity_err("not", "1", args.len())) };
            Ok(Value::Bool(!a.truthy()))
        }),
    );
    m.insert(
        "and".into(),
        native("and", |args, _pos| {
            if args.is_empty() {
                return Err(arity_err("and", "at least 1", 0));
            }
            for arg in &args[..args.len() - 1] {
                if !arg.truthy() {
                    return Ok(arg.clone());
                }
            }
            Ok(args[args.len() - 1].clone())
        }),
    );
    m.insert(
        "or".into(),
        native("or", |args, _pos| {
            if args.is_empty() {
                return Err(arity_err("or", "at least 1", 0));
            }
            for arg in &args[..args.len() - 1] {
                if arg.truthy() {
                    return Ok(arg.clone());
                }
            }
            Ok(args[args.len() - 1].clone())
        }),
    );

    m.insert(
        "len".into(),
        native("len", |args, _pos| {
            let [a] = args else { return Err(arity_err("len", "1", args.len())) };
            match a {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(items) => Ok(Value::Int(items.borrow().len() as i64)),
                Value::Dict(entries) => Ok(Value::Int(entries.borrow().len() as i64)),
                Value::Range(r) => Ok(Value::Int(r.len() as i64)),
                other => Err(RuntimeError::without_position(format!(
                    "len: value of type {} has no length",
                    other.type_name()
                ))),
            }
        }),
    );

    m.insert("range".into(), range_builtin());
    m.insert(
        "parse_int".into(),
        native("parse_int", |args, _pos| {
            let [a] = args else { return Err(arity_err("parse_int", "1", args.len())) };
            match a {
                Value::Int(n) => Ok(Value::Int(*n)),
                Value::Float(f) => Ok(Value::Int(*f as i64)),
                Value::Str(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| RuntimeError::without_position(format!("parse_int: invalid literal: {s}"))),
                other => Err(non_numeric("parse_int", other)),
            }
        }),
    );
    m.insert(
        "parse_float".into(),
        native("parse_float", |args, _pos| {
            let [a] = args else { return Err(arity_err("parse_float", "1", args.len())) };
            match a {
                Value::Int(n) => Ok(Value::Float(*n as f64)),
                Value::Float(f) => Ok(Value::Float(*f)),
                Value::Str(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| RuntimeError::without_position(format!("parse_float: invalid literal: {s}"))),
                other => Err(non_numeric("parse_float", other)),
            }
        }),
    );

    m.insert("format".into(), format_builtin());

    m
}

fn num_to_f64(n: Num) -> f64 {
    match n {
        Num::Int(n) => n as f64,
        Num::Float(f) => f,
    }
}

/// Python's `//`: rounds toward negative infinity, not zero, so the
/// quotient's sign follows the divisor rather than truncating.
fn py_floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// Python's `%`: the remainder always carries the divisor's sign.
fn py_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

fn floor_div_builtin() -> Value {
    native("floor_div", |args, _pos| {
        let [a, b] = args else { return Err(arity_err("floor_div", "2", args.len())) };
        match coerce(a, b, "floor_div")? {
            (Num::Int(x), Num::Int(y)) => {
                if y == 0 {
                    return Err(RuntimeError::without_position("floor_div: division by zero"));
                }
                Ok(Value::Int(py_floor_div(x, y)))
            }
            (x, y) => {
                let (xf, yf) = (num_to_f64(x), num_to_f64(y));
                if yf == 0.0 {
                    return Err(RuntimeError::without_position("floor_div: division by zero"));
                }
                Ok(Value::Float((xf / yf).floor()))
            }
        }
    })
}

fn mod_builtin() -> Value {
    native("mod", |args, _pos| {
        let [a, b] = args else { return Err(arity_err("mod", "2", args.len())) };
        match coerce(a, b, "mod")? {
            (Num::Int(x), Num::Int(y)) => {
                if y == 0 {
                    return Err(RuntimeError::without_position("mod: division by zero"));
                }
                Ok(Value::Int(py_mod(x, y)))
            }
            (x, y) => {
                let (xf, yf) = (num_to_f64(x), num_to_f64(y));
                if yf == 0.0 {
                    return Err(RuntimeError::without_position("mod: division by zero"));
                }
                Ok(Value::Float(xf - yf * (xf / yf).floor()))
            }
        }
    })
}

fn non_numeric(name: &str, v: &Value) -> RuntimeError {
    RuntimeError::without_position(format!("{name}: expected a numeric argument, got {}", v.type_name()))
}

fn add_builtin() -> Value {
    native("add", |args, _pos| {
        let [a, b] = args else { return Err(arity_err("add", "2", args.len())) };
        match (a, b) {
            (Value::Str(x), Value::Str(y)) => Ok(Value::str(format!("{x}{y}"))),
            (Value::List(x), Value::List(y)) => {
                let mut items = x.borrow().clone();
                items.extend(y.borrow().iter().cloned());
                Ok(Value::list(items))
            }
            _ => match coerce(a, b, "add")? {
                (Num::Int(x), Num::Int(y)) => Ok(Value::Int(x + y)),
                (x, y) => {
                    let to_f = |n: Num| match n {
                        Num::Int(n) => n as f64,
                        Num::Float(f) => f,
                    };
                    Ok(Value::Float(to_f(x) + to_f(y)))
                }
            },
        }
    })
}

fn range_builtin() -> Value {
    native("range", |args, _pos| {
        let (start, stop, step) = match args {
            [stop] => (0, as_int(stop, "range")?, 1),
            [start, stop] => (as_int(start, "range")?, as_int(stop, "range")?, 1),
            [start, stop, step] => (as_int(start, "range")?, as_int(stop, "range")?, as_int(step, "range")?),
            _ => return Err(arity_err("range", "1 to 3", args.len())),
        };
        if step == 0 {
            return Err(RuntimeError::without_position("range: step must not be 0"));
        }
        Ok(Value::Range(ValueRange { start, stop, step }))
    })
}

fn as_int(v: &Value, ctx: &str) -> Result<i64, RuntimeError> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(non_numeric(ctx, other)),
    }
}

/// Minimal positional `{}` interpolation: each `{}` in the template
/// consumes the next argument in order via its `Display` form.
fn format_builtin() -> Value {
    native("format", |args, _pos| {
        let (tmpl, rest) = args
            .split_first()
            .ok_or_else(|| arity_err("format", "at least 1", 0))?;
        let Value::Str(tmpl) = tmpl else {
            return Err(RuntimeError::without_position(format!(
                "format: expected a string template, got {}",
                tmpl.type_name()
            )));
        };

        let mut out = String::new();
        let mut rest_iter = rest.iter();
        let mut chars = tmpl.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '{' && chars.peek() == Some(&'}') {
                chars.next();
                let val = rest_iter
                    .next()
                    .ok_or_else(|| RuntimeError::without_position("format: not enough arguments for template"))?;
                out.push_str(&val.to_string());
            } else {
                out.push(c);
            }
        }
        Ok(Value::str(out))
    })
}

/// `print`/`input` backed by the process's real stdio. Used by the CLI
/// entry point; tests install their own in-memory versions instead so
/// assertions don't depend on capturing a subprocess's stdout.
pub fn install_stdio_builtins(builtins: &mut HashMap<String, Value>) {
    builtins.insert(
        "print".into(),
        native("print", |args, _pos| {
            let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            println!("{}", rendered.join(" "));
            Ok(Value::Null)
        }),
    );
    builtins.insert(
        "input".into(),
        native("input", |args, _pos| {
            if let Some(prompt) = args.first() {
                print!("{prompt}");
                io::stdout().flush().ok();
            }
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| RuntimeError::without_position(format!("input: {e}")))?;
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            Ok(Value::str(line))
        }),
    );
}

/// In-memory `print`/`input` pair for tests: `print` appends to a
/// shared buffer instead of touching real stdout, and `input` pops
/// from a pre-seeded queue of lines.
pub fn install_test_io_builtins(
    builtins: &mut HashMap<String, Value>,
    output: Rc<RefCell<Vec<String>>>,
    input_lines: Rc<RefCell<std::collections::VecDeque<String>>>,
) {
    builtins.insert(
        "print".into(),
        native("print", move |args, _pos| {
            let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            output.borrow_mut().push(rendered.join(" "));
            Ok(Value::Null)
        }),
    );
    builtins.insert(
        "input".into(),
        native("input", move |_args, _pos| {
            Ok(Value::str(input_lines.borrow_mut().pop_front().unwrap_or_default()))
        }),
    );
}

/// The full default catalogue: pure builtins plus real-stdio `print`
/// and `input`. What `main` wires up for an ordinary run.
pub fn default_builtins() -> HashMap<String, Value> {
    let mut m = standard_builtins();
    install_stdio_builtins(&mut m);
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(builtins: &HashMap<String, Value>, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let Value::Callable(Callable::Native(_, f)) = &builtins[name] else {
            panic!("not a builtin: {name}")
        };
        f(args, (0, 0))
    }

    #[test]
    fn add_numeric_and_string_and_list() {
        let b = standard_builtins();
        assert_eq!(call(&b, "add", &[Value::Int(1), Value::Int(2)]).unwrap(), Value::Int(3));
        assert_eq!(
            call(&b, "add", &[Value::Int(1), Value::Float(2.5)]).unwrap(),
            Value::Float(3.5)
        );
        assert_eq!(
            call(&b, "add", &[Value::str("a"), Value::str("b")]).unwrap(),
            Value::str("ab")
        );
    }

    #[test]
    fn div_is_always_float_floor_div_is_integer() {
        let b = standard_builtins();
        assert_eq!(call(&b, "div", &[Value::Int(7), Value::Int(2)]).unwrap(), Value::Float(3.5));
        assert_eq!(call(&b, "floor_div", &[Value::Int(7), Value::Int(2)]).unwrap(), Value::Int(3));
    }

    #[test]
    fn div_by_zero_is_a_runtime_error_not_inf() {
        let b = standard_builtins();
        let err = call(&b, "div", &[Value::Int(1), Value::Int(0)]).unwrap_err();
        assert!(err.message.contains("division by zero"));
        let err = call(&b, "div", &[Value::Float(1.0), Value::Float(0.0)]).unwrap_err();
        assert!(err.message.contains("division by zero"));
    }

    #[test]
    fn floor_div_and_mod_by_zero_are_runtime_errors_not_panics() {
        let b = standard_builtins();
        assert!(call(&b, "floor_div", &[Value::Int(1), Value::Int(0)]).is_err());
        assert!(call(&b, "mod", &[Value::Int(1), Value::Int(0)]).is_err());
        assert!(call(&b, "floor_div", &[Value::Float(1.0), Value::Float(0.0)]).is_err());
        assert!(call(&b, "mod", &[Value::Float(1.0), Value::Float(0.0)]).is_err());
    }

    #[test]
    fn pow_is_exponentiation_not_unary_plus() {
        let b = standard_builtins();
        assert_eq!(call(&b, "pow", &[Value::Int(2), Value::Int(10)]).unwrap(), Value::Int(1024));
    }

    #[test]
    fn or_returns_first_truthy_else_last() {
        let b = standard_builtins();
        let result = call(
            &b,
            "or",
            &[Value::Int(0), Value::str(""), Value::str("hello"), Value::Int(7)],
        )
        .unwrap();
        assert_eq!(result, Value::str("hello"));
    }

    #[test]
    fn and_returns_first_falsy_else_last() {
        let b = standard_builtins();
        let result = call(&b, "and", &[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap();
        assert_eq!(result, Value::Int(3));
    }

    #[test]
    fn format_interpolates_positionally() {
        let b = standard_builtins();
        let result = call(&b, "format", &[Value::str("{} + {} = {}"), Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap();
        assert_eq!(result, Value::str("1 + 2 = 3"));
    }

    #[test]
    fn range_is_lazy_and_iterates_correctly() {
        let b = standard_builtins();
        let Value::Range(r) = call(&b, "range", &[Value::Int(5)]).unwrap() else {
            panic!("expected range")
        };
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn mod_follows_divisor_sign_like_python() {
        let b = standard_builtins();
        assert_eq!(call(&b, "mod", &[Value::Int(-1), Value::Int(5)]).unwrap(), Value::Int(4));
    }
}
