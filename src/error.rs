use std::fmt::Display;
use std::rc::Rc;

use thiserror::Error;

use crate::object::Object;
use crate::token::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SyntaxError,
    RuntimeError,
    NetworkError,
    SelectorError,
    TypeError,
    ReferenceError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::SyntaxError => "Syntax Error",
            ErrorKind::RuntimeError => "Runtime Error",
            ErrorKind::NetworkError => "Network Error",
            ErrorKind::SelectorError => "Selector Error",
            ErrorKind::TypeError => "Type Error",
            ErrorKind::ReferenceError => "Reference Error",
        };
        write!(f, "{s}")
    }
}

/// A script-level error. It is an ordinary runtime value; raising it is what
/// `RuntimeInterrupt::Error` is for.
#[derive(Debug, Clone, Error)]
#[error("{kind} at line {}, column {}: {message}", position.line, position.column)]
pub struct ErrorObject {
    pub kind: ErrorKind,
    pub message: String,
    pub position: Position,
    pub value: Option<Object>,
}

impl ErrorObject {
    pub fn new(kind: ErrorKind, position: Position, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), position, value: None }
    }

    pub fn with_value(self, value: Object) -> Self {
        Self { value: Some(value), ..self }
    }

    pub fn syntax(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, position, message)
    }

    pub fn runtime(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, position, message)
    }

    pub fn network(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, position, message)
    }

    pub fn selector(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SelectorError, position, message)
    }

    pub fn type_error(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, position, message)
    }

    pub fn reference(position: Position, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReferenceError, position, message)
    }
}

impl PartialEq for ErrorObject {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message && self.position == other.position
    }
}

/// Everything that can cut a statement sequence short. Normal completion is
/// the `Ok` side of [`EvalResult`](crate::interpreter::EvalResult).
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeInterrupt {
    Return(Object),
    Break(Position),
    Continue(Position),
    Error(ErrorObject),
}

impl RuntimeInterrupt {
    pub fn error(error: ErrorObject) -> Self {
        RuntimeInterrupt::Error(error)
    }

    /// Converts a `break`/`continue` that reached a function or program
    /// boundary into the error it stands for. Other signals pass through.
    pub fn outside_loop(self) -> Self {
        match self {
            RuntimeInterrupt::Break(position) => {
                ErrorObject::runtime(position, "'break' outside of a loop").into()
            }
            RuntimeInterrupt::Continue(position) => {
                ErrorObject::runtime(position, "'continue' outside of a loop").into()
            }
            other => other,
        }
    }

    /// Settles a signal that reached the top of a program.
    pub fn into_result(self) -> Result<Object, ErrorObject> {
        match self.outside_loop() {
            RuntimeInterrupt::Return(value) => Ok(value),
            RuntimeInterrupt::Error(error) => Err(error),
            RuntimeInterrupt::Break(_) | RuntimeInterrupt::Continue(_) => Ok(Object::Null),
        }
    }

    /// The value-channel form of this signal.
    pub fn into_object(self) -> Object {
        match self.outside_loop() {
            RuntimeInterrupt::Return(value) => Object::ReturnValue(Box::new(value)),
            RuntimeInterrupt::Error(error) => Object::Error(Rc::new(error)),
            RuntimeInterrupt::Break(_) | RuntimeInterrupt::Continue(_) => Object::Null,
        }
    }
}

impl From<ErrorObject> for RuntimeInterrupt {
    fn from(error: ErrorObject) -> Self {
        RuntimeInterrupt::Error(error)
    }
}

impl Display for RuntimeInterrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeInterrupt::Return(value) => write!(f, "return {value}"),
            RuntimeInterrupt::Break(position) => write!(f, "[{position}] Unexpected break statement"),
            RuntimeInterrupt::Continue(position) => {
                write!(f, "[{position}] Unexpected continue statement")
            }
            RuntimeInterrupt::Error(error) => write!(f, "{error}"),
        }
    }
}
