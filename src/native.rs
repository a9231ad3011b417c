use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::diagnostics::Severity;
use crate::interpreter::network_failure;
use crate::prelude::*;

type BuiltinFn = fn(&mut Evaluator, Vec<Object>, &Token) -> EvalResult;

/// A function implemented in Rust and bound in the global scope.
pub struct Builtin {
    pub name: &'static str,
    arity: Arity,
    function: BuiltinFn,
}

impl Builtin {
    fn new(name: &'static str, arity: Arity, function: BuiltinFn) -> Self {
        Self { name, arity, function }
    }
}

impl Callable for Builtin {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn call(&self, evaluator: &mut Evaluator, arguments: Vec<Object>, paren: &Token) -> EvalResult {
        (self.function)(evaluator, arguments, paren)
    }
}

impl Debug for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).field("arity", &self.arity).finish()
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "builtin function {}", self.name)
    }
}

pub fn builtins() -> Vec<Builtin> {
    vec![
        Builtin::new("keys", Arity::Exact(1), keys),
        Builtin::new("values", Arity::Exact(1), values),
        Builtin::new("length", Arity::Exact(1), length),
        Builtin::new("delete", Arity::Exact(2), delete),
        Builtin::new("type", Arity::Exact(1), type_of),
        Builtin::new("log", Arity::AtLeast(0), |e, args, _| emit(e, Severity::Log, &args)),
        Builtin::new("debug", Arity::AtLeast(0), |e, args, _| emit(e, Severity::Debug, &args)),
        Builtin::new("info", Arity::AtLeast(0), |e, args, _| emit(e, Severity::Info, &args)),
        Builtin::new("warn", Arity::AtLeast(0), |e, args, _| emit(e, Severity::Warn, &args)),
        Builtin::new("error", Arity::AtLeast(0), |e, args, _| emit(e, Severity::Error, &args)),
        Builtin::new("fetch", Arity::Exact(1), fetch),
        Builtin::new("fetch_all", Arity::Range(1, 2), fetch_all),
    ]
}

fn wrong_type(paren: &Token, function: &str, expected: &str, got: &Object) -> RuntimeInterrupt {
    ErrorObject::type_error(
        paren.position(),
        format!("{function} expects {expected}, got {}", got.type_name()),
    )
    .into()
}

fn keys(_: &mut Evaluator, args: Vec<Object>, paren: &Token) -> EvalResult {
    match &args[0] {
        Object::Hash(hash) => Ok(Object::array(hash.borrow().keys().cloned().collect())),
        other => Err(wrong_type(paren, "keys", "a HASH", other)),
    }
}

fn values(_: &mut Evaluator, args: Vec<Object>, paren: &Token) -> EvalResult {
    match &args[0] {
        Object::Hash(hash) => Ok(Object::array(hash.borrow().values().cloned().collect())),
        other => Err(wrong_type(paren, "values", "a HASH", other)),
    }
}

fn length(_: &mut Evaluator, args: Vec<Object>, paren: &Token) -> EvalResult {
    let len = match &args[0] {
        Object::String(s) => s.chars().count(),
        Object::Array(items) => items.len(),
        Object::Hash(hash) => hash.borrow().len(),
        other => return Err(wrong_type(paren, "length", "a STRING, ARRAY or HASH", other)),
    };
    Ok(Object::Integer(len as i64))
}

/// Removes `key` in place and hands back the same hash.
fn delete(_: &mut Evaluator, args: Vec<Object>, paren: &Token) -> EvalResult {
    let Object::Hash(hash) = &args[0] else {
        return Err(wrong_type(paren, "delete", "a HASH", &args[0]));
    };

    hash.borrow_mut().remove(&args[1]).map_err(|kind| {
        ErrorObject::type_error(paren.position(), format!("unusable as hash key: {kind}"))
    })?;
    Ok(args[0].clone())
}

fn type_of(_: &mut Evaluator, args: Vec<Object>, _: &Token) -> EvalResult {
    Ok(Object::String(args[0].type_name().to_string()))
}

fn emit(evaluator: &mut Evaluator, severity: Severity, args: &[Object]) -> EvalResult {
    let line = args.iter().map(Object::to_string).collect::<Vec<_>>().join(" ");
    evaluator.diagnostics().emit(severity, &line);
    Ok(Object::Null)
}

/// One raw GET. Any status is a value; only transport failures raise.
fn fetch(evaluator: &mut Evaluator, args: Vec<Object>, paren: &Token) -> EvalResult {
    let Object::String(url) = &args[0] else {
        return Err(wrong_type(paren, "fetch", "a URL STRING", &args[0]));
    };

    let response = evaluator
        .crawler()
        .fetch(url)
        .map_err(|e| network_failure(paren.position(), url, &e))?;
    Ok(Object::HttpResponse(Rc::new(response)))
}

fn fetch_all(evaluator: &mut Evaluator, args: Vec<Object>, paren: &Token) -> EvalResult {
    let Object::Array(items) = &args[0] else {
        return Err(wrong_type(paren, "fetch_all", "an ARRAY of URLs", &args[0]));
    };

    let mut urls = Vec::with_capacity(items.len());
    for item in items.iter() {
        match item {
            Object::String(url) => urls.push(url.clone()),
            other => return Err(wrong_type(paren, "fetch_all", "URL strings", other)),
        }
    }

    let concurrency = match args.get(1) {
        None => evaluator.crawler().concurrency(),
        Some(Object::Integer(n)) => usize::try_from(*n).unwrap_or(0),
        Some(other) => return Err(wrong_type(paren, "fetch_all", "an INTEGER concurrency", other)),
    };

    let responses = evaluator
        .crawler()
        .fetch_batch(urls, concurrency)
        .map(|response| Object::HttpResponse(Rc::new(response)))
        .collect();
    Ok(Object::array(responses))
}
