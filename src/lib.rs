#![allow(clippy::new_without_default)]

mod ast;
pub mod config;
pub mod crawler;
pub mod diagnostics;
mod environment;
mod error;
mod func;
mod interpreter;
mod native;
mod object;
mod parser;
mod printer;
mod scanner;
mod stack;
mod token;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::environment::Environment;
    pub use crate::error::*;
    pub use crate::func::*;
    pub use crate::interpreter::*;
    pub use crate::native::Builtin;
    pub use crate::object::*;
    pub use crate::parser::*;
    pub use crate::scanner::*;
    pub use crate::token::*;
    pub use crate::Shared;
}

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;

use config::Config;
use prelude::{ErrorObject, Evaluator, Parser, ParserError, Program, ScannerError};

pub type Shared<T> = Rc<RefCell<T>>;
pub type SharedErrorReporter = Shared<ErrorReporter>;

/// Source text in, side effects and diagnostics out.
pub struct Harvest {
    evaluator: Evaluator,
    error_reporter: SharedErrorReporter,
}

impl Harvest {
    pub fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let evaluator = Evaluator::from_config(config)?;
        Ok(Self::with_evaluator(evaluator))
    }

    pub fn with_evaluator(evaluator: Evaluator) -> Self {
        Self { evaluator, error_reporter: Rc::new(RefCell::new(ErrorReporter::default())) }
    }

    pub fn evaluator(&mut self) -> &mut Evaluator {
        &mut self.evaluator
    }

    pub fn had_error(&self) -> bool {
        self.error_reporter.borrow().had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.error_reporter.borrow().had_runtime_error
    }
}

impl Harvest {
    pub fn run_file(&mut self, filename: &str) -> Result<(), anyhow::Error> {
        let content = std::fs::read_to_string(filename)
            .with_context(|| format!("failed to read script '{filename}'"))?;
        self.run(&content)
    }

    /// Scans, parses and evaluates `input`. Script errors are reported, not
    /// returned; check [`Harvest::had_error`] and
    /// [`Harvest::had_runtime_error`] afterwards.
    pub fn run(&mut self, input: &str) -> Result<(), anyhow::Error> {
        let Some(program) = self.parse(input) else {
            return Ok(());
        };

        if let Err(e) = self.evaluator.eval_program(&program) {
            self.error_reporter.borrow_mut().runtime_error(&e);
        }

        Ok(())
    }

    fn parse(&mut self, input: &str) -> Option<Program> {
        let mut scanner = scanner::Scanner::new(input);
        let tokens = match scanner.scan_tokens() {
            Ok(tokens) => tokens,
            Err(errors) => {
                self.print_scanner_errors(&errors);
                return None;
            }
        };

        let mut parser = Parser::new(tokens);
        match parser.parse() {
            Ok(program) => {
                tracing::trace!(%program, "parsed");
                Some(program)
            }
            Err(errors) => {
                self.print_parser_errors(&errors);
                None
            }
        }
    }

    fn print_scanner_errors(&mut self, errors: &[ScannerError]) {
        let mut reporter = self.error_reporter.borrow_mut();
        errors.iter().for_each(|e| reporter.scanner_error(e));
    }

    fn print_parser_errors(&mut self, errors: &[ParserError]) {
        let mut reporter = self.error_reporter.borrow_mut();
        errors.iter().for_each(|e| reporter.parser_error(e));
    }
}

#[derive(Debug, Default)]
pub struct ErrorReporter {
    pub had_error: bool,
    pub had_runtime_error: bool,
}

impl ErrorReporter {
    pub fn scanner_error(&mut self, e: &ScannerError) {
        eprintln!("{e}");
        self.had_error = true;
    }

    pub fn parser_error(&mut self, e: &ParserError) {
        eprintln!("{e}");
        self.had_error = true;
    }

    pub fn runtime_error(&mut self, e: &ErrorObject) {
        eprintln!("{e}");
        self.had_runtime_error = true;
    }
}
