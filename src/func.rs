use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::prelude::*;

/// How many arguments a callable accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
            Arity::AtLeast(min) => write!(f, "at least {min}"),
        }
    }
}

pub trait Callable: Debug + Display {
    fn name(&self) -> &str;

    fn arity(&self) -> Arity;

    fn call(&self, evaluator: &mut Evaluator, arguments: Vec<Object>, paren: &Token) -> EvalResult;
}

/// A user-defined function together with the scope it was created in.
#[derive(Debug)]
pub struct Function {
    name: Option<String>,
    params: Vec<Token>,
    body: Rc<Block>,
    closure: Shared<Environment>,
}

impl Function {
    pub fn new(
        name: Option<String>,
        params: Vec<Token>,
        body: Rc<Block>,
        closure: Shared<Environment>,
    ) -> Self {
        Self { name, params, body, closure }
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }

    fn arity(&self) -> Arity {
        Arity::Exact(self.params.len())
    }

    fn call(&self, evaluator: &mut Evaluator, arguments: Vec<Object>, _paren: &Token) -> EvalResult {
        let environment = Environment::new().with_enclosing(self.closure.clone()).as_shared();

        {
            let mut env_borrow = environment.borrow_mut();
            for (arg, param) in arguments.into_iter().zip(&self.params) {
                env_borrow.set(param.lexeme.as_str(), arg);
            }
        }

        // A 'Return' interrupt carries the function's value out of the body.
        // Falling off the end yields null.
        match evaluator.execute_block(&self.body.statements, environment) {
            Ok(_) => Ok(Object::Null),
            Err(RuntimeInterrupt::Return(value)) => Ok(value),
            Err(interrupt) => Err(interrupt.outside_loop()),
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params: Vec<&str> = self.params.iter().map(|p| p.lexeme.as_str()).collect();
        write!(f, "function({}) {}", params.join(", "), self.body)
    }
}
