//! Built-in operations registry.
//!
//! Every operator the evaluator knows natively is described once here, by name, kind
//! and arity:
//!
//! ```scheme
//! (+ 1 2.5)            ; primitive: arguments are evaluated, then the function runs
//! (if (< 1 2) 'a 'b)   ; special form: receives its argument forms unevaluated
//! ```
//!
//! ## Functions vs Special Forms
//!
//! - **Functions** (`+ - * / = < > <= >= not`) are seeded into every global
//!   [`Environment`] as primitive procedure values. They are ordinary bindings and can
//!   be passed around, stored, or shadowed.
//! - **Special forms** (`if define lambda`) are never bound in an environment. The
//!   evaluator consults this registry before evaluating an operator, so a special form
//!   cannot be shadowed and its name cannot be rebound.
//!
//! ## Numeric rules
//!
//! Arithmetic accepts integers and floats. Any float operand makes the result a float.
//! Integer results that overflow `i64` are reported instead of wrapping. Division
//! stays in integers only when it is exact.
//!
//! ## Adding New Operations
//!
//! 1. Implement the function with the signature [`BuiltinFn`]
//! 2. Add an entry to `BUILTIN_OPS` with its identifier and arity
//! 3. Add tests covering edge cases and error conditions

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::Error;
use crate::ast::Form;
use crate::evaluator::environment::Environment;
use crate::evaluator::{Depth, eval_define, eval_if, eval_lambda};
use crate::value::{Number, Value};

/// Canonical signature of a primitive: evaluated arguments in, value out
pub type BuiltinFn = fn(&[Value]) -> Result<Value, Error>;

/// Signature of a special form: unevaluated argument forms, the current scope and
/// the evaluation depth reached so far
pub type SpecialFormFn = fn(&[Form], &Environment, Depth) -> Result<Value, Error>;

/// Number of arguments an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(&self, arg_count: usize) -> bool {
        match *self {
            Arity::Exact(n) => arg_count == n,
            Arity::AtLeast(n) => arg_count >= n,
            Arity::Range(min, max) => (min..=max).contains(&arg_count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
        }
    }
}

/// Represents the implementation of a built-in operation
#[derive(Clone, Copy)]
pub enum OpKind {
    Function(BuiltinFn),
    SpecialForm(SpecialFormFn),
}

impl fmt::Debug for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::SpecialForm(_) => write!(f, "SpecialForm(<fn>)"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    pub id: &'static str,
    pub op_kind: OpKind,
    pub arity: Arity,
}

impl BuiltinOp {
    pub fn is_special_form(&self) -> bool {
        matches!(self.op_kind, OpKind::SpecialForm(_))
    }
}

//
// Builtin Function Implementations
//

fn numeric_args(op: &str, args: &[Value]) -> Result<Vec<Number>, Error> {
    args.iter()
        .map(|arg| {
            Number::try_from(arg)
                .map_err(|_| Error::TypeError(format!("{op} requires numbers, got {arg}")))
        })
        .collect()
}

// Integer arithmetic is checked; mixing in a float switches to float arithmetic
macro_rules! checked_arithmetic {
    ($name:ident, $checked:ident, $op:tt, $what:literal) => {
        fn $name(a: Number, b: Number) -> Result<Number, Error> {
            match (a, b) {
                (Number::Integer(x), Number::Integer(y)) => x
                    .$checked(y)
                    .map(Number::Integer)
                    .ok_or_else(|| Error::IntegerOverflow($what.into())),
                _ => Ok(Number::Float(a.as_f64() $op b.as_f64())),
            }
        }
    };
}

checked_arithmetic!(add, checked_add, +, "addition");
checked_arithmetic!(sub, checked_sub, -, "subtraction");
checked_arithmetic!(mul, checked_mul, *, "multiplication");

fn div(a: Number, b: Number) -> Result<Number, Error> {
    match (a, b) {
        (_, Number::Integer(0)) => Err(Error::DivisionByZero),
        (_, Number::Float(y)) if y == 0.0 => Err(Error::DivisionByZero),
        (Number::Integer(x), Number::Integer(y)) => match x.checked_rem(y) {
            Some(0) => x
                .checked_div(y)
                .map(Number::Integer)
                .ok_or_else(|| Error::IntegerOverflow("division".into())),
            Some(_) => Ok(Number::Float(a.as_f64() / b.as_f64())),
            None => Err(Error::IntegerOverflow("division".into())),
        },
        _ => Ok(Number::Float(a.as_f64() / b.as_f64())),
    }
}

fn negate(n: Number) -> Result<Number, Error> {
    match n {
        Number::Integer(x) => x
            .checked_neg()
            .map(Number::Integer)
            .ok_or_else(|| Error::IntegerOverflow("negation".into())),
        Number::Float(x) => Ok(Number::Float(-x)),
    }
}

fn builtin_add(args: &[Value]) -> Result<Value, Error> {
    numeric_args("+", args)?
        .into_iter()
        .try_fold(Number::Integer(0), add)
        .map(Value::from)
}

fn builtin_mul(args: &[Value]) -> Result<Value, Error> {
    numeric_args("*", args)?
        .into_iter()
        .try_fold(Number::Integer(1), mul)
        .map(Value::from)
}

fn builtin_sub(args: &[Value]) -> Result<Value, Error> {
    match numeric_args("-", args)?.as_slice() {
        [] => Err(Error::TypeError("- expects at least 1 arguments, got 0".into())),
        [only] => negate(*only).map(Value::from),
        [first, rest @ ..] => rest.iter().copied().try_fold(*first, sub).map(Value::from),
    }
}

fn builtin_div(args: &[Value]) -> Result<Value, Error> {
    match numeric_args("/", args)?.as_slice() {
        [] => Err(Error::TypeError("/ expects at least 1 arguments, got 0".into())),
        [only] => div(Number::Integer(1), *only).map(Value::from),
        [first, rest @ ..] => rest.iter().copied().try_fold(*first, div).map(Value::from),
    }
}

/// Exact ordering of two numbers; an integer is never rounded to meet a float
fn compare_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => Some(x.cmp(&y)),
        (Number::Float(x), Number::Float(y)) => x.partial_cmp(&y),
        (Number::Integer(x), Number::Float(y)) => compare_integer_float(x, y),
        (Number::Float(x), Number::Integer(y)) => {
            compare_integer_float(y, x).map(Ordering::reverse)
        }
    }
}

fn compare_integer_float(int: i64, float: f64) -> Option<Ordering> {
    // 2^63: every float at or beyond it lies outside i64
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return None;
    }
    if float >= I64_BOUND {
        return Some(Ordering::Less);
    }
    if float < -I64_BOUND {
        return Some(Ordering::Greater);
    }
    // In range, the whole part converts to i64 without rounding
    let whole = float.trunc();
    Some(int.cmp(&(whole as i64)).then(whole.partial_cmp(&float)?))
}

// Chained comparison: every adjacent pair must order as the operator requires
macro_rules! numeric_comparison {
    ($name:ident, $op_str:expr, $ordering:pat) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let nums = numeric_args($op_str, args)?;
            let holds = nums
                .windows(2)
                .all(|pair| matches!(compare_numbers(pair[0], pair[1]), Some($ordering)));
            Ok(Value::Bool(holds))
        }
    };
}

numeric_comparison!(builtin_eq, "=", Ordering::Equal);
numeric_comparison!(builtin_lt, "<", Ordering::Less);
numeric_comparison!(builtin_gt, ">", Ordering::Greater);
numeric_comparison!(builtin_le, "<=", Ordering::Less | Ordering::Equal);
numeric_comparison!(builtin_ge, ">=", Ordering::Greater | Ordering::Equal);

fn builtin_not(args: &[Value]) -> Result<Value, Error> {
    match args {
        [Value::Bool(b)] => Ok(Value::Bool(!b)),
        [other] => Err(Error::TypeError(format!(
            "not requires a boolean argument, got {other}"
        ))),
        _ => Err(Error::TypeError(format!(
            "not expects exactly 1 arguments, got {}",
            args.len()
        ))),
    }
}

/// Global registry of all built-in operations
static BUILTIN_OPS: &[BuiltinOp] = &[
    // Arithmetic operations
    BuiltinOp {
        id: "+",
        op_kind: OpKind::Function(builtin_add),
        arity: Arity::AtLeast(0),
    },
    BuiltinOp {
        id: "-",
        op_kind: OpKind::Function(builtin_sub),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        id: "*",
        op_kind: OpKind::Function(builtin_mul),
        arity: Arity::AtLeast(0),
    },
    BuiltinOp {
        id: "/",
        op_kind: OpKind::Function(builtin_div),
        arity: Arity::AtLeast(1),
    },
    // Comparison operations
    BuiltinOp {
        id: "=",
        op_kind: OpKind::Function(builtin_eq),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "<",
        op_kind: OpKind::Function(builtin_lt),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: ">",
        op_kind: OpKind::Function(builtin_gt),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "<=",
        op_kind: OpKind::Function(builtin_le),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: ">=",
        op_kind: OpKind::Function(builtin_ge),
        arity: Arity::AtLeast(2),
    },
    // Logical operations
    BuiltinOp {
        id: "not",
        op_kind: OpKind::Function(builtin_not),
        arity: Arity::Exact(1),
    },
    // Special forms
    BuiltinOp {
        id: "if",
        op_kind: OpKind::SpecialForm(eval_if),
        // (if test then) is allowed; a false test then yields Unspecified
        arity: Arity::Range(2, 3),
    },
    BuiltinOp {
        id: "define",
        op_kind: OpKind::SpecialForm(eval_define),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "lambda",
        op_kind: OpKind::SpecialForm(eval_lambda),
        // Fixed-arity parameter lists and a single body form only
        arity: Arity::Exact(2),
    },
];

/// Lazy static map from id to BuiltinOp (private - use find_builtin_op)
static BUILTIN_BY_ID: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| BUILTIN_OPS.iter().map(|op| (op.id, op)).collect());

/// Get all builtin operations
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}

/// Find a builtin operation by its identifier
pub fn find_builtin_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_BY_ID.get(id).copied()
}

/// Whether `name` is reserved by a special form
pub fn is_special_form(name: &str) -> bool {
    find_builtin_op(name).is_some_and(BuiltinOp::is_special_form)
}
