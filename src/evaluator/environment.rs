//! Lexical scope chain.
//!
//! An [`Environment`] is a handle to one frame of bindings plus an optional parent.
//! Handles are cheap to clone and every clone refers to the same frame, so a closure
//! that captures its defining scope sees bindings added to that scope afterwards.
//! This is what lets a top-level procedure call itself by name.
//!
//! The same sharing means a procedure defined at top level and the global frame
//! refer to each other. [`GlobalEnvironment`] owns an interpreter instance and
//! breaks those cycles when it is dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::Error;
use crate::builtinops::{Arity, BuiltinFn, OpKind, get_builtin_ops};
use crate::value::{Primitive, Procedure, Value};

#[derive(Default)]
struct Frame {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Environment>,
}

/// Environment for variable bindings
#[derive(Clone, Default)]
pub struct Environment {
    frame: Rc<Frame>,
}

impl Environment {
    /// An empty root scope with no bindings at all
    pub fn new() -> Self {
        Environment::default()
    }

    /// A fresh root scope seeded with every primitive procedure.
    /// Each call builds an independent instance; nothing is shared between them.
    pub fn global() -> GlobalEnvironment {
        let env = Environment::new();
        for op in get_builtin_ops() {
            if let OpKind::Function(func) = op.op_kind {
                env.register_builtin_function(op.id, op.arity, func);
            }
        }
        GlobalEnvironment { env }
    }

    /// A new scope whose parent is `self`, pre-populated with `bindings`
    pub fn child_scope<I>(&self, bindings: I) -> Environment
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        Environment {
            frame: Rc::new(Frame {
                bindings: RefCell::new(bindings.into_iter().collect()),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Bind `name` in this scope only, replacing any existing binding here.
    /// Outer scopes are never modified.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.frame.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Resolve `name` in this scope, then each enclosing scope in turn
    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        self.get(name)
            .ok_or_else(|| Error::UnboundSymbol(name.to_owned()))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(value) = env.frame.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            scope = env.parent();
        }
        None
    }

    pub fn is_defined_locally(&self, name: &str) -> bool {
        self.frame.bindings.borrow().contains_key(name)
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.frame.parent.as_ref()
    }

    /// Every binding visible from this scope, sorted by name.
    /// Inner bindings shadow outer ones.
    pub fn all_bindings(&self) -> Vec<(String, Value)> {
        let mut visible: HashMap<String, Value> = HashMap::new();
        let mut scope = Some(self);
        while let Some(env) = scope {
            for (name, value) in env.frame.bindings.borrow().iter() {
                visible
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
            scope = env.parent();
        }
        let mut bindings: Vec<_> = visible.into_iter().collect();
        bindings.sort_by(|(a, _), (b, _)| a.cmp(b));
        bindings
    }

    /// Register a host function as a primitive procedure in this scope.
    ///
    /// The arity is checked before `func` runs; a wrong argument count is reported
    /// as [`Error::TypeError`] like any other primitive.
    ///
    /// # Example
    /// ```
    /// use minischeme::{Environment, Error, eval, parse_source};
    /// use minischeme::builtinops::Arity;
    /// use minischeme::value::Value;
    ///
    /// fn double(args: &[Value]) -> Result<Value, Error> {
    ///     match args {
    ///         [Value::Integer(n)] => Ok(Value::Integer(n * 2)),
    ///         _ => Err(Error::TypeError("double requires an integer".into())),
    ///     }
    /// }
    ///
    /// let env = Environment::global();
    /// env.register_builtin_function("double", Arity::Exact(1), double);
    /// let forms = parse_source("(double 21)").unwrap();
    /// assert_eq!(eval(&forms[0], &env).unwrap(), Value::Integer(42));
    /// ```
    pub fn register_builtin_function(&self, name: &str, arity: Arity, func: BuiltinFn) {
        let primitive = Primitive::new(name, arity, func);
        self.define(name, Value::Procedure(Procedure::Primitive(Rc::new(primitive))));
    }

    /// Whether both handles refer to the same frame
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }
}

/// Owning handle to the global scope of one interpreter instance.
///
/// Derefs to [`Environment`], so it is passed to `eval` as `&env`. Dropping it tears
/// the instance down: the global bindings are cleared, releasing every procedure
/// defined there along with the scopes those procedures captured. Procedure values
/// taken out of the instance stay callable only as long as the handle is alive.
#[derive(Debug)]
pub struct GlobalEnvironment {
    env: Environment,
}

impl GlobalEnvironment {
    /// A handle to the global scope that shares its frame
    pub fn environment(&self) -> &Environment {
        &self.env
    }
}

impl Deref for GlobalEnvironment {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        &self.env
    }
}

impl AsRef<Environment> for GlobalEnvironment {
    fn as_ref(&self) -> &Environment {
        &self.env
    }
}

impl Drop for GlobalEnvironment {
    fn drop(&mut self) {
        // Values are dropped after the borrow ends; a closure's drop may release frames
        let bindings = std::mem::take(&mut *self.env.frame.bindings.borrow_mut());
        drop(bindings);
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values are left out: closures stored here usually capture this very frame
        let bindings = self.frame.bindings.borrow();
        let mut names: Vec<&String> = bindings.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("bindings", &names)
            .field("has_parent", &self.frame.parent.is_some())
            .finish()
    }
}
