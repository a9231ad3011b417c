use std::rc::Rc;

use super::{operators, EvalResult};
use crate::prelude::*;
use crate::stack::ensure_sufficient_stack;

impl Evaluator {
    pub fn evaluate_expr(&mut self, expr: &Expr) -> EvalResult {
        ensure_sufficient_stack(|| self.evaluate_expr_inner(expr))
    }

    fn evaluate_expr_inner(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Identifier { name } => self.lookup_variable(name),
            Expr::Literal { value, .. } => Ok(value.into()),
            Expr::Prefix { operator, right } => {
                let right = self.evaluate_expr(right)?;
                Ok(operators::prefix(operator, right)?)
            }
            Expr::Infix { left, operator, right } => match operator.token_type {
                TokenType::And | TokenType::Or => self.evaluate_logical(left, operator, right),
                _ => {
                    let left = self.evaluate_expr(left)?;
                    let right = self.evaluate_expr(right)?;
                    Ok(operators::infix(operator, left, right)?)
                }
            },
            Expr::If { condition, consequence, alternative, .. } => {
                self.evaluate_if(condition, consequence, alternative.as_ref())
            }
            Expr::While { condition, body, .. } => self.evaluate_while(condition, body),
            Expr::For { variable, iterable, body, .. } => {
                self.evaluate_for(variable, iterable, body)
            }
            Expr::Function { name, params, body, .. } => {
                // The function closes over the scope it is created in, not the
                // one it is later called from.
                let function = Function::new(
                    name.as_ref().map(|n| n.lexeme.clone()),
                    params.clone(),
                    body.clone(),
                    self.environment.clone(),
                );
                let value = Object::Function(Rc::new(function));
                if let Some(name) = name {
                    self.environment.borrow_mut().set(&name.lexeme, value.clone());
                }
                Ok(value)
            }
            Expr::Call { callee, paren, arguments } => {
                self.evaluate_call(callee, paren, arguments, None)
            }
            Expr::Array { elements, .. } => {
                let items = self.evaluate_arguments(None, elements)?;
                Ok(Object::array(items))
            }
            Expr::Index { left, bracket, index } => {
                let left = self.evaluate_expr(left)?;
                let index = self.evaluate_expr(index)?;
                self.evaluate_index(bracket, left, index)
            }
            Expr::Object { pairs, .. } => self.evaluate_object(pairs),
            Expr::Open { keyword, arguments } => self.evaluate_open(keyword, arguments, None),
            Expr::Extract { keyword, arguments } => {
                self.evaluate_extract(keyword, arguments, None)
            }
            Expr::Collect { keyword, arguments } => {
                self.evaluate_collect(keyword, arguments, None)
            }
            Expr::At { at, selector } => {
                let value = self.evaluate_expr(selector)?;
                self.evaluate_at(at, value)
            }
            Expr::Pipe { left, pipe, right } => self.evaluate_pipe(left, pipe, right),
        }
    }

    fn lookup_variable(&self, name: &Token) -> EvalResult {
        self.environment.borrow().get(&name.lexeme).ok_or_else(|| {
            ErrorObject::reference(
                name.position(),
                format!("identifier not found: {}", name.lexeme),
            )
            .into()
        })
    }

    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
        let left_value = match self.evaluate_expr(left)? {
            Object::Boolean(b) => b,
            other => return Err(logical_operand_error(operator, &other)),
        };

        match (operator.token_type, left_value) {
            (TokenType::And, false) => return Ok(Object::Boolean(false)),
            (TokenType::Or, true) => return Ok(Object::Boolean(true)),
            _ => {}
        }

        match self.evaluate_expr(right)? {
            Object::Boolean(b) => Ok(Object::Boolean(b)),
            other => Err(logical_operand_error(operator, &other)),
        }
    }

    fn evaluate_if(
        &mut self,
        condition: &Expr,
        consequence: &Block,
        alternative: Option<&Block>,
    ) -> EvalResult {
        match self.evaluate_expr(condition)? {
            Object::Boolean(true) => self.evaluate_block(consequence),
            Object::Boolean(false) => match alternative {
                Some(block) => self.evaluate_block(block),
                None => Ok(Object::Null),
            },
            other => Err(ErrorObject::type_error(
                condition.position(),
                format!("condition must be BOOLEAN, got {}", other.type_name()),
            )
            .into()),
        }
    }

    fn evaluate_while(&mut self, condition: &Expr, body: &Block) -> EvalResult {
        loop {
            match self.evaluate_expr(condition)? {
                Object::Boolean(true) => {}
                Object::Boolean(false) => break,
                other => {
                    return Err(ErrorObject::type_error(
                        condition.position(),
                        format!("condition must be BOOLEAN, got {}", other.type_name()),
                    )
                    .into())
                }
            }

            match self.evaluate_block(body) {
                Ok(_) | Err(RuntimeInterrupt::Continue(_)) => {}
                Err(RuntimeInterrupt::Break(_)) => break,
                Err(interrupt) => return Err(interrupt),
            }
        }

        Ok(Object::Null)
    }

    fn evaluate_for(&mut self, variable: &Token, iterable: &Expr, body: &Block) -> EvalResult {
        let items: Vec<Object> = match self.evaluate_expr(iterable)? {
            Object::Array(items) => items.as_ref().clone(),
            Object::Hash(hash) => hash.borrow().keys().cloned().collect(),
            other => {
                return Err(ErrorObject::runtime(
                    iterable.position(),
                    format!("{} is not iterable", other.type_name()),
                )
                .into())
            }
        };

        for item in items {
            let environment = self.child_environment();
            environment.borrow_mut().set(&variable.lexeme, item);

            match self.execute_block(&body.statements, environment) {
                Ok(_) | Err(RuntimeInterrupt::Continue(_)) => {}
                Err(RuntimeInterrupt::Break(_)) => break,
                Err(interrupt) => return Err(interrupt),
            }
        }

        Ok(Object::Null)
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
        piped: Option<Object>,
    ) -> EvalResult {
        let callable: Rc<dyn Callable> = match self.evaluate_expr(callee)? {
            Object::Function(function) => function,
            Object::Builtin(builtin) => builtin,
            other => {
                return Err(ErrorObject::type_error(
                    paren.position(),
                    format!("not a function: {}", other.type_name()),
                )
                .into())
            }
        };

        let arguments = self.evaluate_arguments(piped, arguments)?;
        self.call_callable(callable.as_ref(), arguments, paren)
    }

    pub fn call_callable(
        &mut self,
        callable: &dyn Callable,
        arguments: Vec<Object>,
        paren: &Token,
    ) -> EvalResult {
        let arity = callable.arity();
        if !arity.accepts(arguments.len()) {
            return Err(ErrorObject::runtime(
                paren.position(),
                format!(
                    "wrong number of arguments to {}: expected {arity}, got {}",
                    callable.name(),
                    arguments.len()
                ),
            )
            .into());
        }

        if self.call_depth >= self.max_call_depth {
            return Err(ErrorObject::runtime(
                paren.position(),
                format!("maximum call depth of {} exceeded", self.max_call_depth),
            )
            .into());
        }

        let _span = tracing::debug_span!("call", function = callable.name()).entered();
        self.call_depth += 1;
        let result = callable.call(self, arguments, paren);
        self.call_depth -= 1;
        result
    }

    /// Evaluates arguments left to right, with a piped value in front.
    pub(super) fn evaluate_arguments(
        &mut self,
        piped: Option<Object>,
        arguments: &[Expr],
    ) -> Result<Vec<Object>, RuntimeInterrupt> {
        let mut values = Vec::with_capacity(arguments.len() + 1);
        values.extend(piped);
        for arg in arguments {
            values.push(self.evaluate_expr(arg)?);
        }
        Ok(values)
    }

    fn evaluate_index(&mut self, bracket: &Token, left: Object, index: Object) -> EvalResult {
        let position = bracket.position();
        match (&left, &index) {
            (Object::Array(items), Object::Integer(i)) => {
                let slot = checked_index(position, ObjectType::Array, items.len(), *i)?;
                Ok(items[slot].clone())
            }
            (Object::String(s), Object::Integer(i)) => {
                let slot = checked_index(position, ObjectType::String, s.chars().count(), *i)?;
                Ok(s.chars().nth(slot).map(|c| Object::String(c.to_string())).unwrap_or(Object::Null))
            }
            (Object::Array(_) | Object::String(_), other) => Err(ErrorObject::type_error(
                position,
                format!("{} index must be INTEGER, got {}", left.type_name(), other.type_name()),
            )
            .into()),
            (Object::Hash(hash), key) => match hash.borrow().get(key) {
                Ok(value) => Ok(value.cloned().unwrap_or(Object::Null)),
                Err(kind) => Err(ErrorObject::type_error(
                    position,
                    format!("unusable as hash key: {kind}"),
                )
                .into()),
            },
            (Object::HttpResponse(response), Object::String(field)) => {
                Ok(super::crawl::response_field(position, response, field)?)
            }
            (Object::HtmlDocument(document), Object::String(field)) => {
                Ok(super::crawl::document_field(position, document, field)?)
            }
            _ => Err(ErrorObject::type_error(
                position,
                format!(
                    "index operator not supported: {}[{}]",
                    left.type_name(),
                    index.type_name()
                ),
            )
            .into()),
        }
    }

    fn evaluate_object(&mut self, pairs: &[(Expr, Expr)]) -> EvalResult {
        let mut hash = HashObject::new();
        for (key_expr, value_expr) in pairs {
            let key = self.evaluate_expr(key_expr)?;
            let value = self.evaluate_expr(value_expr)?;
            hash.insert(key, value).map_err(|kind| {
                ErrorObject::type_error(
                    key_expr.position(),
                    format!("unusable as hash key: {kind}"),
                )
            })?;
        }
        Ok(Object::hash(hash))
    }

    /// `value | f(a)` runs as `f(value, a)`.
    fn evaluate_pipe(&mut self, left: &Expr, pipe: &Token, right: &Expr) -> EvalResult {
        let value = self.evaluate_expr(left)?;
        match right {
            Expr::Call { callee, paren, arguments } => {
                self.evaluate_call(callee, paren, arguments, Some(value))
            }
            Expr::Open { keyword, arguments } => {
                self.evaluate_open(keyword, arguments, Some(value))
            }
            Expr::Extract { keyword, arguments } => {
                self.evaluate_extract(keyword, arguments, Some(value))
            }
            Expr::Collect { keyword, arguments } => {
                self.evaluate_collect(keyword, arguments, Some(value))
            }
            other => Err(ErrorObject::syntax(
                pipe.position(),
                format!("cannot pipe into '{other}'"),
            )
            .into()),
        }
    }
}

fn logical_operand_error(operator: &Token, operand: &Object) -> RuntimeInterrupt {
    ErrorObject::type_error(
        operator.position(),
        format!("operator {} requires BOOLEAN operands, got {}", operator.lexeme, operand.type_name()),
    )
    .into()
}

fn checked_index(
    position: Position,
    kind: ObjectType,
    len: usize,
    index: i64,
) -> Result<usize, ErrorObject> {
    usize::try_from(index).ok().filter(|&i| i < len).ok_or_else(|| {
        ErrorObject::runtime(
            position,
            format!("index {index} out of range for {kind} of length {len}"),
        )
    })
}
