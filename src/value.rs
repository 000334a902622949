//! Runtime values produced by the evaluator.
//!
//! [`Value`] is a closed sum type. Literals are copied freely; procedures are shared:
//! cloning a [`Procedure`] clones an `Rc`, so every copy of a closure refers to the same
//! captured [`Environment`].

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::ast::Form;
use crate::builtinops::{Arity, BuiltinFn};
use crate::evaluator::environment::Environment;

#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Symbol(String),
    Procedure(Procedure),
    /// Result of forms evaluated for effect (`define`, one-armed `if`)
    /// Never equal to anything, itself included
    Unspecified,
}

/// A callable value: a built-in primitive or a user-defined closure
#[derive(Clone)]
pub enum Procedure {
    Primitive(Rc<Primitive>),
    Closure(Rc<Closure>),
}

/// A procedure implemented in Rust
pub struct Primitive {
    name: String,
    arity: Arity,
    func: BuiltinFn,
}

impl Primitive {
    pub fn new(name: impl Into<String>, arity: Arity, func: BuiltinFn) -> Self {
        Primitive {
            name: name.into(),
            arity,
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Check the argument count, then run the primitive.
    /// Primitives report a wrong argument count as a type error.
    pub fn call(&self, args: &[Value]) -> Result<Value, Error> {
        if !self.arity.accepts(args.len()) {
            return Err(Error::TypeError(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.arity,
                args.len()
            )));
        }
        (self.func)(args)
    }
}

/// A user-defined procedure: parameters, one body form, and the scope it was created in
pub struct Closure {
    params: Vec<String>,
    body: Form,
    env: Environment,
    name: OnceCell<String>,
}

impl Closure {
    pub(crate) fn new(params: Vec<String>, body: Form, env: Environment) -> Self {
        Closure {
            params,
            body,
            env,
            name: OnceCell::new(),
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &Form {
        &self.body
    }

    /// The environment captured when the closure was created
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Name of the first binding the closure was defined under, if any
    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    /// Names stick: a closure keeps the first name it is defined under
    pub(crate) fn name_if_anonymous(&self, name: &str) {
        self.name.get_or_init(|| name.to_owned());
    }

    pub(crate) fn display_name(&self) -> &str {
        self.name().unwrap_or("lambda")
    }
}

impl Procedure {
    pub fn name(&self) -> &str {
        match self {
            Procedure::Primitive(p) => p.name(),
            Procedure::Closure(c) => c.display_name(),
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The captured environment is left out: it may contain this very closure
        match self {
            Procedure::Primitive(p) => write!(f, "Primitive({}, {:?})", p.name, p.arity),
            Procedure::Closure(c) => {
                write!(f, "Closure(params={:?}, body={})", c.params, c.body)
            }
        }
    }
}

impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Procedure::Primitive(a), Procedure::Primitive(b)) => Rc::ptr_eq(a, b),
            (Procedure::Closure(a), Procedure::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Float(n) => write!(f, "Float({n:?})"),
            Value::String(s) => write!(f, "String(\"{s}\")"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::Procedure(p) => write!(f, "{p:?}"),
            Value::Unspecified => write!(f, "Unspecified"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n:?}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Procedure(Procedure::Primitive(p)) => write!(f, "#<primitive:{}>", p.name),
            Value::Procedure(Procedure::Closure(c)) => match c.name() {
                Some(name) => write!(f, "#<procedure:{name}>"),
                None => write!(f, "#<procedure>"),
            },
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Procedure(a), Value::Procedure(b)) => a == b,
            (Value::Unspecified, _) | (_, Value::Unspecified) => false,
            _ => false, // Different variants are never equal; 1 and 1.0 included
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(i64::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

/// A numeric operand; integers promote to floats when mixed with one
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(n) => n as f64,
            Number::Float(n) => n,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Integer(n) => Value::Integer(n),
            Number::Float(n) => Value::Float(n),
        }
    }
}

impl TryFrom<&Value> for Number {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Integer(n) => Ok(Number::Integer(*n)),
            Value::Float(n) => Ok(Number::Float(*n)),
            other => Err(Error::TypeError(format!("expected number, got {other}"))),
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;

    fn noop(_args: &[Value]) -> Result<Value, Error> {
        Ok(Value::Unspecified)
    }

    #[test]
    fn test_conversions_data_driven() {
        let test_cases = vec![
            (Value::from(42), Value::Integer(42)),
            (Value::from(-128i8), Value::Integer(-128)),
            (Value::from(65535u16), Value::Integer(65535)),
            (Value::from(3.5), Value::Float(3.5)),
            (Value::from(true), Value::Bool(true)),
            (Value::from("hi"), Value::String("hi".to_owned())),
            (Value::from(String::from("owned")), Value::String("owned".to_owned())),
            (Value::from(Number::Integer(7)), Value::Integer(7)),
            (Value::from(Number::Float(0.5)), Value::Float(0.5)),
        ];

        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            assert_eq!(actual, expected, "Test case {} failed", i + 1);
        }
    }

    #[test]
    fn test_number_extraction() {
        assert_eq!(
            Number::try_from(&Value::Integer(3)).unwrap(),
            Number::Integer(3)
        );
        assert_eq!(
            Number::try_from(&Value::Float(1.5)).unwrap(),
            Number::Float(1.5)
        );
        let err = Number::try_from(&Value::from("3")).unwrap_err();
        assert_eq!(err, Error::TypeError("expected number, got \"3\"".into()));
        assert!((Number::Integer(2).as_f64() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_equality_is_structural_for_literals() {
        assert_eq!(Value::Integer(1), Value::Integer(1));
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::Symbol("a".into()), Value::String("a".into()));
        assert_ne!(Value::Unspecified, Value::Unspecified);
    }

    #[test]
    fn test_procedure_identity() {
        let env = Environment::new();
        let closure = Value::Procedure(Procedure::Closure(Rc::new(Closure::new(
            vec!["x".into()],
            Form::Symbol("x".into()),
            env.clone(),
        ))));
        let same = closure.clone();
        let twin = Value::Procedure(Procedure::Closure(Rc::new(Closure::new(
            vec!["x".into()],
            Form::Symbol("x".into()),
            env,
        ))));
        assert_eq!(closure, same);
        assert_ne!(closure, twin);

        let plus = Value::Procedure(Procedure::Primitive(Rc::new(Primitive::new(
            "+",
            Arity::AtLeast(0),
            noop,
        ))));
        let plus_again = Value::Procedure(Procedure::Primitive(Rc::new(Primitive::new(
            "+",
            Arity::AtLeast(0),
            noop,
        ))));
        assert_eq!(plus, plus.clone());
        assert_ne!(plus, plus_again);
    }

    #[test]
    fn test_host_primitive_is_not_the_builtin() {
        let env = Environment::global();
        let builtin = env.lookup("+").unwrap();
        let aliased = builtin.clone();

        let host = Environment::new();
        host.register_builtin_function("+", Arity::AtLeast(0), noop);
        let shadow = host.lookup("+").unwrap();

        assert_eq!(builtin, aliased);
        assert_ne!(builtin, shadow);
        assert_eq!(builtin.to_string(), shadow.to_string());
    }

    #[test]
    fn test_display() {
        let closure = Rc::new(Closure::new(vec![], Form::Integer(1), Environment::new()));
        let value = Value::Procedure(Procedure::Closure(closure.clone()));
        assert_eq!(value.to_string(), "#<procedure>");
        closure.name_if_anonymous("one");
        closure.name_if_anonymous("uno");
        assert_eq!(value.to_string(), "#<procedure:one>");

        let test_cases = vec![
            (Value::Integer(-4), "-4"),
            (Value::Float(3.0), "3.0"),
            (Value::Float(3.5), "3.5"),
            (Value::from("s"), "\"s\""),
            (Value::Bool(false), "#f"),
            (Value::Symbol("foo".into()), "foo"),
            (Value::Unspecified, "#<unspecified>"),
        ];
        for (value, expected) in test_cases {
            assert_eq!(value.to_string(), expected);
        }
    }

    #[test]
    fn test_primitive_arity_is_type_error() {
        let p = Primitive::new("noop", Arity::Exact(1), noop);
        assert!(p.call(&[Value::Integer(1)]).is_ok());
        let err = p.call(&[]).unwrap_err();
        assert!(matches!(err, Error::TypeError(msg) if msg.contains("noop expects exactly 1")));
    }
}
