use super::EvalResult;
use crate::diagnostics::Severity;
use crate::prelude::*;

impl Evaluator {
    /// Runs a whole program in the global scope. Its value is that of the
    /// last statement, or of a top-level `return`.
    pub fn eval_program(&mut self, program: &Program) -> Result<Object, ErrorObject> {
        tracing::debug!(statements = program.statements.len(), "evaluating program");

        let mut result = Object::Null;
        for stmt in &program.statements {
            match self.execute(stmt) {
                Ok(value) => result = value,
                Err(interrupt) => {
                    tracing::debug!(signal = %interrupt.clone().into_object(), "program interrupted");
                    return interrupt.into_result();
                }
            }
        }

        if self.diagnostics.is_debug() {
            self.dump_globals();
        }

        Ok(result)
    }

    pub fn execute(&mut self, stmt: &Stmt) -> EvalResult {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let value = self.evaluate_expr(value)?;
                self.environment.borrow_mut().set(&name.lexeme, value);
                Ok(Object::Null)
            }
            Stmt::Return { value, .. } => {
                let value =
                    if let Some(expr) = value { self.evaluate_expr(expr)? } else { Object::Null };
                Err(RuntimeInterrupt::Return(value))
            }
            Stmt::Expression { expr } => self.evaluate_expr(expr),
            Stmt::Block { block } => self.evaluate_block(block),
            Stmt::Break { keyword } => Err(RuntimeInterrupt::Break(keyword.position())),
            Stmt::Continue { keyword } => Err(RuntimeInterrupt::Continue(keyword.position())),
        }
    }

    /// Runs `statements` inside `environment`, restoring the current scope
    /// afterwards whatever the outcome.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Shared<Environment>,
    ) -> EvalResult {
        let prev_env = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(Object::Null);
        for stmt in statements {
            result = self.execute(stmt);
            if result.is_err() {
                break;
            }
        }

        self.environment = prev_env;
        result
    }

    pub(super) fn evaluate_block(&mut self, block: &Block) -> EvalResult {
        let environment = self.child_environment();
        self.execute_block(&block.statements, environment)
    }

    pub(super) fn child_environment(&self) -> Shared<Environment> {
        Environment::new().with_enclosing(self.environment.clone()).as_shared()
    }

    fn dump_globals(&mut self) {
        let mut bindings: Vec<(String, String)> = self
            .globals
            .borrow()
            .get_all()
            .iter()
            .filter(|(_, value)| !matches!(value, Object::Builtin(_)))
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        bindings.sort();

        for (name, value) in bindings {
            self.diagnostics.emit(Severity::Debug, &format!("{name} = {value}"));
        }
    }
}
