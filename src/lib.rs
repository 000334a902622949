//! Minischeme - evaluation core of a minimal S-expression language
//!
//! This crate turns source text into values. It covers the four pieces that make up
//! the interpreter proper and nothing around them: reading files, printing results
//! and command-line handling are left to whatever driver embeds it.
//!
//! ```scheme
//! (+ (+ 1 3) (+ 2 4))                          ; 10
//! (+ 1 2.5)                                    ; 3.5, integers promote to floats
//! (define addN (lambda (x) (lambda (y) (+ x y))))
//! ((addN 5) 3)                                 ; 8, closures capture their scope
//! (if (< 1 2) "yes" "no")                      ; only the taken branch is evaluated
//! ```
//!
//! ## Pipeline
//!
//! text → [`lexer::Lexer`] → tokens → [`parser::Parser`] → [`ast::Form`] forest →
//! [`evaluator::eval`] against an [`Environment`] → [`value::Value`]
//!
//! ```
//! use minischeme::{Environment, eval, parse_source};
//! use minischeme::value::Value;
//!
//! let env = Environment::global();
//! let forms = parse_source("(define square (lambda (x) (* x x))) (square 12)").unwrap();
//! let mut last = Value::Unspecified;
//! for form in &forms {
//!     last = eval(form, &env).unwrap();
//! }
//! assert_eq!(last, Value::Integer(144));
//! ```
//!
//! ## Strictness
//!
//! - `if` requires a boolean test (no truthiness)
//! - integer arithmetic reports overflow instead of wrapping
//! - closures check their arity exactly; there are no variadic user procedures
//! - special form names cannot be rebound
//!
//! Each [`Environment::global`] call builds an independent interpreter instance, so
//! several can run side by side without sharing bindings. The returned
//! [`GlobalEnvironment`] owns the instance; dropping it frees every procedure defined
//! in it, even those that refer to themselves.
//!
//! ## Modules
//!
//! - `lexer`: tokens from raw text
//! - `parser`: nested forms from tokens
//! - `evaluator`: scope chain, `eval` and `apply`
//! - `builtinops`: primitive procedures and the special form table
//! - `value`: runtime values and procedures

use std::fmt;

use crate::builtinops::Arity;

/// Maximum nesting depth accepted by the parser
/// Deeper input is rejected instead of overflowing the stack
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum evaluation depth before `eval` gives up with [`Error::ResourceExhausted`]
/// Each nested evaluation (argument, branch, procedure body) counts as one level,
/// so the limit is on evaluations, not on procedure calls. A recursive call such as
/// `(+ 1 (count (- n 1)))` inside an `if` body costs three levels per call, which puts
/// the default at roughly 80 nested calls.
pub const MAX_EVAL_DEPTH: usize = 256;

/// Categorizes the different kinds of syntax errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SyntaxErrorKind {
    /// A token that cannot appear where it was found
    UnexpectedToken,
    /// A `)` with no open form
    UnmatchedClose,
    /// Input ended while a form was still open
    UnexpectedEnd,
    /// Form nesting exceeded the parser's maximum depth
    TooDeeplyNested,
}

/// A structured error describing why a token stream could not be parsed.
#[derive(Debug, PartialEq, Clone)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    /// Line on which the parser gave up (1-based)
    pub line: usize,
    /// The offending token, if there was one
    pub found: Option<String>,
}

impl SyntaxError {
    pub fn new(
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        line: usize,
        found: Option<String>,
    ) -> Self {
        SyntaxError {
            kind,
            message: message.into(),
            line,
            found,
        }
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    LexError {
        line: usize,
        message: String,
    },
    SyntaxError(SyntaxError),
    UnboundSymbol(String),
    TypeError(String),
    ArityMismatch {
        procedure: String,
        expected: Arity,
        got: usize,
    },
    DivisionByZero,
    NotCallable(String),
    EmptyApplication,
    IntegerOverflow(String),
    ResourceExhausted {
        limit: usize,
    },
}

impl Error {
    pub(crate) fn lex_error(line: usize, message: impl Into<String>) -> Self {
        Error::LexError {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn arity_mismatch(procedure: impl Into<String>, expected: Arity, got: usize) -> Self {
        Error::ArityMismatch {
            procedure: procedure.into(),
            expected,
            got,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::LexError { line, message } => write!(f, "LexError: line {line}: {message}"),
            Error::SyntaxError(e) => {
                write!(f, "SyntaxError: line {}: {}", e.line, e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                Ok(())
            }
            Error::UnboundSymbol(name) => write!(f, "Unbound symbol: {name}"),
            Error::TypeError(msg) => write!(f, "Type error: {msg}"),
            Error::ArityMismatch {
                procedure,
                expected,
                got,
            } => write!(
                f,
                "ArityMismatch: {procedure} expected {expected} arguments, got {got}"
            ),
            Error::DivisionByZero => write!(f, "Division by zero"),
            Error::NotCallable(value) => write!(f, "Not callable: {value}"),
            Error::EmptyApplication => write!(f, "Cannot evaluate empty application ()"),
            Error::IntegerOverflow(op) => write!(f, "Integer overflow in {op}"),
            Error::ResourceExhausted { limit } => {
                write!(f, "Evaluation depth limit exceeded (max: {limit})")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<SyntaxError> for Error {
    fn from(err: SyntaxError) -> Self {
        Error::SyntaxError(err)
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod value;

pub use evaluator::environment::{Environment, GlobalEnvironment};
pub use evaluator::{EvalConfig, apply, eval, eval_with_config};
pub use parser::parse_source;
