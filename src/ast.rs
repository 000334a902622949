//! This module defines [`Form`], the parsed representation of source text. A form is
//! either an atom (a literal or a symbol) or a parenthesized list of nested forms.
//! Forms are immutable after parsing; list bodies are reference counted so a closure
//! can keep its body alive by sharing it with the parse tree rather than copying it.
//! Ergonomic helpers [`sym`] and [`list`] plus `From` conversions for Rust literals
//! make forms easy to build in tests.

use std::fmt;
use std::rc::Rc;

use crate::lexer::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Symbol(String),
    /// A parenthesized expression; the empty list is `()`
    List(Rc<[Form]>),
}

impl Form {
    /// Build an atom from a literal or symbol token. Structural and unknown tokens
    /// have no atom form.
    pub fn from_token(token: Token) -> Option<Form> {
        match token {
            Token::Integer(n) => Some(Form::Integer(n)),
            Token::Float(n) => Some(Form::Float(n)),
            Token::String(s) => Some(Form::String(s)),
            Token::Bool(b) => Some(Form::Bool(b)),
            Token::Symbol(s) => Some(Form::Symbol(s)),
            Token::Unknown(_) | Token::FormBegin | Token::FormEnd => None,
        }
    }

    pub fn is_atom(&self) -> bool {
        !matches!(self, Form::List(_))
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Form::Symbol(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Form]> {
        match self {
            Form::List(elements) => Some(&elements[..]),
            _ => None,
        }
    }
}

impl From<&str> for Form {
    fn from(s: &str) -> Self {
        Form::String(s.to_owned())
    }
}

impl From<bool> for Form {
    fn from(b: bool) -> Self {
        Form::Bool(b)
    }
}

impl From<f64> for Form {
    fn from(n: f64) -> Self {
        Form::Float(n)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Form {
            fn from(n: $int_type) -> Self {
                Form::Integer(i64::from(n))
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

impl From<Vec<Form>> for Form {
    fn from(elements: Vec<Form>) -> Self {
        Form::List(elements.into())
    }
}

/// Helper for building symbol forms
pub fn sym<S: AsRef<str>>(name: S) -> Form {
    Form::Symbol(name.as_ref().to_owned())
}

/// Helper for building list forms from anything convertible to a form
pub fn list<T: Into<Form>, I: IntoIterator<Item = T>>(elements: I) -> Form {
    Form::List(elements.into_iter().map(Into::into).collect())
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Form::Integer(n) => write!(f, "{n}"),
            // Debug formatting keeps the decimal point so the text re-lexes as a float
            Form::Float(n) => write!(f, "{n:?}"),
            Form::String(s) => write!(f, "\"{s}\""),
            Form::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Form::Symbol(s) => write!(f, "{s}"),
            Form::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
        }
    }
}
