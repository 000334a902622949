//! Evaluation of parsed forms against an [`Environment`].
//!
//! Atoms evaluate to themselves, symbols are looked up, and a list is an application.
//! Before the operator of an application is evaluated its symbol is checked against
//! the special form table in [`crate::builtinops`]; special forms receive their
//! argument forms unevaluated. Everything else evaluates the operator, then the
//! arguments strictly left to right, then applies.

pub mod environment;

use tracing::{debug, trace, warn};

use crate::ast::Form;
use crate::builtinops::{Arity, OpKind, find_builtin_op, is_special_form};
use crate::value::{Closure, Procedure, Value};
use crate::{Error, MAX_EVAL_DEPTH};
use environment::Environment;
use std::rc::Rc;

/// Run-time evaluation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Nesting depth at which evaluation fails with [`Error::ResourceExhausted`]
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_depth: MAX_EVAL_DEPTH,
        }
    }
}

impl EvalConfig {
    pub fn with_max_depth(max_depth: usize) -> Self {
        EvalConfig { max_depth }
    }
}

/// How deep the current evaluation is nested, and how deep it may go
#[derive(Debug, Clone, Copy)]
pub struct Depth {
    level: usize,
    limit: usize,
}

impl Depth {
    pub(crate) fn new(limit: usize) -> Self {
        Depth { level: 0, limit }
    }

    fn descend(self) -> Result<Depth, Error> {
        let level = self.level + 1;
        if level > self.limit {
            warn!(limit = self.limit, "evaluation depth limit reached");
            return Err(Error::ResourceExhausted { limit: self.limit });
        }
        Ok(Depth { level, ..self })
    }
}

/// Evaluate a form with the default depth limit
pub fn eval(form: &Form, env: &Environment) -> Result<Value, Error> {
    eval_with_config(form, env, &EvalConfig::default())
}

pub fn eval_with_config(form: &Form, env: &Environment, config: &EvalConfig) -> Result<Value, Error> {
    eval_with_depth_tracking(form, env, Depth::new(config.max_depth))
}

/// Apply a procedure value to already evaluated arguments
pub fn apply(procedure: &Value, args: Vec<Value>) -> Result<Value, Error> {
    apply_with_depth(procedure, args, Depth::new(MAX_EVAL_DEPTH))
}

/// Evaluate a form one level below `depth`
fn eval_with_depth_tracking(form: &Form, env: &Environment, depth: Depth) -> Result<Value, Error> {
    let depth = depth.descend()?;
    match form {
        Form::Integer(n) => Ok(Value::Integer(*n)),
        Form::Float(n) => Ok(Value::Float(*n)),
        Form::String(s) => Ok(Value::String(s.clone())),
        Form::Bool(b) => Ok(Value::Bool(*b)),
        Form::Symbol(name) => env.lookup(name),
        Form::List(elements) => eval_application(elements, env, depth),
    }
}

fn eval_application(elements: &[Form], env: &Environment, depth: Depth) -> Result<Value, Error> {
    let [operator, arg_forms @ ..] = elements else {
        return Err(Error::EmptyApplication);
    };

    // Special forms are syntax: resolved by name, never through the environment
    if let Form::Symbol(name) = operator
        && let Some(op) = find_builtin_op(name)
        && let OpKind::SpecialForm(special_form) = op.op_kind
    {
        if !op.arity.accepts(arg_forms.len()) {
            return Err(Error::arity_mismatch(op.id, op.arity, arg_forms.len()));
        }
        return special_form(arg_forms, env, depth);
    }

    let procedure = eval_with_depth_tracking(operator, env, depth)?;
    let args = arg_forms
        .iter()
        .map(|arg| eval_with_depth_tracking(arg, env, depth))
        .collect::<Result<Vec<_>, _>>()?;

    apply_with_depth(&procedure, args, depth)
}

fn apply_with_depth(procedure: &Value, args: Vec<Value>, depth: Depth) -> Result<Value, Error> {
    match procedure {
        Value::Procedure(Procedure::Primitive(primitive)) => primitive.call(&args),
        Value::Procedure(Procedure::Closure(closure)) => {
            let params = closure.params();
            if params.len() != args.len() {
                return Err(Error::arity_mismatch(
                    closure.display_name(),
                    Arity::Exact(params.len()),
                    args.len(),
                ));
            }
            trace!(
                procedure = closure.display_name(),
                args = args.len(),
                "applying closure"
            );
            let scope = closure.env().child_scope(params.iter().cloned().zip(args));
            eval_with_depth_tracking(closure.body(), &scope, depth)
        }
        other => Err(Error::NotCallable(other.to_string())),
    }
}

/// Evaluate if special form
pub(crate) fn eval_if(args: &[Form], env: &Environment, depth: Depth) -> Result<Value, Error> {
    match args {
        [test, consequent, alternative @ ..] => {
            match eval_with_depth_tracking(test, env, depth)? {
                Value::Bool(true) => eval_with_depth_tracking(consequent, env, depth),
                Value::Bool(false) => match alternative {
                    [alternative] => eval_with_depth_tracking(alternative, env, depth),
                    _ => Ok(Value::Unspecified),
                },
                other => Err(Error::TypeError(format!(
                    "if test must be a boolean, got {other}"
                ))),
            }
        }
        _ => Err(Error::arity_mismatch("if", Arity::Range(2, 3), args.len())),
    }
}

/// Evaluate define special form
///
/// `(define name expr)` binds the value of `expr`; `(define (name params...) body)`
/// binds a closure. Either way the binding goes into the current scope.
pub(crate) fn eval_define(args: &[Form], env: &Environment, depth: Depth) -> Result<Value, Error> {
    let (name, value) = match args {
        [Form::Symbol(name), expr] => {
            check_bindable(name)?;
            (name, eval_with_depth_tracking(expr, env, depth)?)
        }
        [Form::List(header), body] => match &header[..] {
            [Form::Symbol(name), params @ ..] => {
                check_bindable(name)?;
                (name, make_closure(params, body, env)?)
            }
            _ => {
                return Err(Error::TypeError(format!(
                    "define requires a procedure name, got {}",
                    args[0]
                )));
            }
        },
        [other, _] => {
            return Err(Error::TypeError(format!(
                "define requires a symbol, got {other}"
            )));
        }
        _ => return Err(Error::arity_mismatch("define", Arity::Exact(2), args.len())),
    };

    if let Value::Procedure(Procedure::Closure(closure)) = &value {
        closure.name_if_anonymous(name);
    }
    debug!(name = name.as_str(), "defined");
    env.define(name.as_str(), value);
    Ok(Value::Unspecified)
}

/// Evaluate lambda special form
pub(crate) fn eval_lambda(args: &[Form], env: &Environment, _depth: Depth) -> Result<Value, Error> {
    match args {
        [Form::List(params), body] => make_closure(params, body, env),
        [other, _] => Err(Error::TypeError(format!(
            "lambda parameters must be a list, got {other}"
        ))),
        _ => Err(Error::arity_mismatch("lambda", Arity::Exact(2), args.len())),
    }
}

fn make_closure(params: &[Form], body: &Form, env: &Environment) -> Result<Value, Error> {
    let params = parse_params(params)?;
    let closure = Closure::new(params, body.clone(), env.clone());
    Ok(Value::Procedure(Procedure::Closure(Rc::new(closure))))
}

// Fixed arity only: no rest parameters
fn parse_params(forms: &[Form]) -> Result<Vec<String>, Error> {
    let mut params: Vec<String> = Vec::with_capacity(forms.len());
    for form in forms {
        let Form::Symbol(name) = form else {
            return Err(Error::TypeError(format!(
                "lambda parameters must be symbols, got {form}"
            )));
        };
        check_bindable(name)?;
        if params.contains(name) {
            return Err(Error::TypeError(format!(
                "duplicate parameter name: {name}"
            )));
        }
        params.push(name.clone());
    }
    Ok(params)
}

fn check_bindable(name: &str) -> Result<(), Error> {
    if is_special_form(name) {
        return Err(Error::TypeError(format!(
            "cannot bind special form name: {name}"
        )));
    }
    Ok(())
}
