use std::fmt::Display;
use std::rc::Rc;

use crate::ast::*;
use crate::stack::ensure_sufficient_stack;
use crate::token::{LiteralValue, Token, TokenType};

#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub token: Token,
    pub message: String,
}

impl Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (line, column) = (self.token.line, self.token.column);
        if self.token.token_type == TokenType::EOF {
            write!(f, "[line {line}:{column}] Error at end: {}", self.message)
        } else {
            write!(f, "[line {line}:{column}] Error at '{}': {}", self.token.lexeme, self.message)
        }
    }
}

impl std::error::Error for ParserError {}

const MAX_ARGUMENTS: usize = 255;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<ParserError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0, errors: vec![] }
    }

    pub fn parse(&mut self) -> Result<Program, Vec<ParserError>> {
        let mut statements = vec![];
        while !self.is_at_end() {
            match self.statement() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
        }

        if !self.errors.is_empty() {
            return Err(std::mem::take(&mut self.errors));
        }

        Ok(Program { statements })
    }

    fn statement(&mut self) -> Option<Stmt> {
        if self.match_tt(&[TokenType::Let]) {
            self.let_statement()
        } else if self.match_tt(&[TokenType::Return]) {
            self.return_statement()
        } else if self.match_tt(&[TokenType::Break]) {
            let keyword = self.previous();
            self.consume(TokenType::Semicolon, "Expect ';' after 'break'")?;
            Some(Stmt::Break { keyword })
        } else if self.match_tt(&[TokenType::Continue]) {
            let keyword = self.previous();
            self.consume(TokenType::Semicolon, "Expect ';' after 'continue'")?;
            Some(Stmt::Continue { keyword })
        } else if self.match_tt(&[TokenType::LeftBrace]) {
            Some(Stmt::Block { block: self.block()? })
        } else {
            self.expression_statement()
        }
    }

    fn let_statement(&mut self) -> Option<Stmt> {
        let keyword = self.previous();
        let name = self.consume(TokenType::Identifier, "Expect variable name")?;
        self.consume(TokenType::Equal, "Expect '=' after variable name")?;
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration")?;

        Some(Stmt::Let { keyword, name, value })
    }

    fn return_statement(&mut self) -> Option<Stmt> {
        let keyword = self.previous();
        let value = if !self.check(TokenType::Semicolon) { Some(self.expression()?) } else { None };

        self.consume(TokenType::Semicolon, "Expect ';' after return value")?;
        Some(Stmt::Return { keyword, value })
    }

    /// Parses the statements after an opening `{`, consuming the closing `}`.
    fn block(&mut self) -> Option<Block> {
        let brace = self.previous();
        let mut statements = vec![];

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block")?;
        Some(Block { brace, statements })
    }

    fn expression_statement(&mut self) -> Option<Stmt> {
        let expr = self.expression()?;

        // Block-bodied expressions read naturally without a trailing ';'
        let ends_with_block = matches!(
            expr,
            Expr::If { .. } | Expr::While { .. } | Expr::For { .. } | Expr::Function { .. }
        );
        if ends_with_block {
            self.match_tt(&[TokenType::Semicolon]);
        } else {
            self.consume(TokenType::Semicolon, "Expect ';' after expression")?;
        }

        Some(Stmt::Expression { expr })
    }

    fn expression(&mut self) -> Option<Expr> {
        ensure_sufficient_stack(|| self.pipe())
    }

    fn pipe(&mut self) -> Option<Expr> {
        let mut expr = self.or()?;

        while self.match_tt(&[TokenType::Pipe]) {
            let pipe = self.previous();
            let right = self.or()?;
            if !is_pipe_target(&right) {
                self.error(pipe.clone(), "Pipe target must be a call or a crawler operator");
                return None;
            }
            expr = Expr::Pipe { left: Box::new(expr), pipe, right: Box::new(right) };
        }

        Some(expr)
    }

    fn or(&mut self) -> Option<Expr> {
        let mut expr = self.and()?;

        while self.match_tt(&[TokenType::Or]) {
            let operator = self.previous();
            let right = self.and()?;
            expr = Expr::Infix { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Some(expr)
    }

    fn and(&mut self) -> Option<Expr> {
        let mut expr = self.equality()?;

        while self.match_tt(&[TokenType::And]) {
            let operator = self.previous();
            let right = self.equality()?;
            expr = Expr::Infix { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Some(expr)
    }

    fn equality(&mut self) -> Option<Expr> {
        let mut expr = self.comparison()?;

        while self.match_tt(&[TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator = self.previous();
            let right = self.comparison()?;
            expr = Expr::Infix { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Some(expr)
    }

    fn comparison(&mut self) -> Option<Expr> {
        let mut expr = self.term()?;

        while self.match_tt(&[
            TokenType::GreaterEqual,
            TokenType::Greater,
            TokenType::LessEqual,
            TokenType::Less,
        ]) {
            let operator = self.previous();
            let right = self.term()?;
            expr = Expr::Infix { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Some(expr)
    }

    fn term(&mut self) -> Option<Expr> {
        let mut expr = self.factor()?;

        while self.match_tt(&[TokenType::Minus, TokenType::Plus]) {
            let operator = self.previous();
            let right = self.factor()?;
            expr = Expr::Infix { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Some(expr)
    }

    fn factor(&mut self) -> Option<Expr> {
        let mut expr = self.unary()?;

        while self.match_tt(&[TokenType::Slash, TokenType::Star, TokenType::Percent]) {
            let operator = self.previous();
            let right = self.unary()?;
            expr = Expr::Infix { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Some(expr)
    }

    fn unary(&mut self) -> Option<Expr> {
        if self.match_tt(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous();
            let right = ensure_sufficient_stack(|| self.unary())?;
            return Some(Expr::Prefix { operator, right: Box::new(right) });
        }

        if self.match_tt(&[TokenType::At]) {
            let at = self.previous();
            let selector = self.postfix()?;
            return Some(Expr::At { at, selector: Box::new(selector) });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Option<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_tt(&[TokenType::LeftParen]) {
                let arguments = self.arguments()?;
                let paren = self.previous();
                expr = Expr::Call { callee: Box::new(expr), paren, arguments };
            } else if self.match_tt(&[TokenType::LeftBracket]) {
                let bracket = self.previous();
                let index = self.expression()?;
                self.consume(TokenType::RightBracket, "Expect ']' after index")?;
                expr = Expr::Index { left: Box::new(expr), bracket, index: Box::new(index) };
            } else if self.match_tt(&[TokenType::Dot]) {
                let bracket = self.previous();
                let name = self.consume(TokenType::Identifier, "Expect property name after '.'")?;
                let index = Expr::Literal {
                    value: LiteralValue::String(name.lexeme.clone()),
                    token: name,
                };
                expr = Expr::Index { left: Box::new(expr), bracket, index: Box::new(index) };
            } else {
                break;
            }
        }

        Some(expr)
    }

    /// Parses a comma separated argument list after `(`, consuming the `)`.
    fn arguments(&mut self) -> Option<Vec<Expr>> {
        let mut arguments = vec![];

        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    // Just report the error, but don't return None yet
                    self.error(self.peek().clone(), "Can't have more than 255 arguments");
                }

                arguments.push(self.expression()?);

                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "Expect ')' after arguments")?;
        Some(arguments)
    }

    fn primary(&mut self) -> Option<Expr> {
        if self.match_tt(&[TokenType::False]) {
            return Some(Expr::Literal { token: self.previous(), value: LiteralValue::Boolean(false) });
        }
        if self.match_tt(&[TokenType::True]) {
            return Some(Expr::Literal { token: self.previous(), value: LiteralValue::Boolean(true) });
        }
        if self.match_tt(&[TokenType::Null]) {
            return Some(Expr::Literal { token: self.previous(), value: LiteralValue::Null });
        }
        if self.match_tt(&[TokenType::Integer, TokenType::Float, TokenType::StringLiteral]) {
            let token = self.previous();
            let value = token.literal.clone().unwrap_or(LiteralValue::Null);
            return Some(Expr::Literal { token, value });
        }
        if self.match_tt(&[TokenType::Identifier]) {
            return Some(Expr::Identifier { name: self.previous() });
        }
        if self.match_tt(&[TokenType::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenType::RightParen, "Expect ')' after expression")?;
            return Some(expr);
        }
        if self.match_tt(&[TokenType::LeftBracket]) {
            return self.array_literal();
        }
        if self.match_tt(&[TokenType::LeftBrace]) {
            return self.object_literal();
        }
        if self.match_tt(&[TokenType::If]) {
            return self.if_expression();
        }
        if self.match_tt(&[TokenType::While]) {
            return self.while_expression();
        }
        if self.match_tt(&[TokenType::For]) {
            return self.for_expression();
        }
        if self.match_tt(&[TokenType::Function]) {
            return self.function();
        }
        if self.match_tt(&[TokenType::Open, TokenType::Extract, TokenType::Collect]) {
            return self.crawler_operator();
        }

        self.error(self.peek().clone(), "Expect expression");
        None
    }

    fn array_literal(&mut self) -> Option<Expr> {
        let bracket = self.previous();
        let mut elements = vec![];

        while !self.check(TokenType::RightBracket) {
            elements.push(self.expression()?);
            if !self.match_tt(&[TokenType::Comma]) {
                break;
            }
        }

        self.consume(TokenType::RightBracket, "Expect ']' after array elements")?;
        Some(Expr::Array { bracket, elements })
    }

    fn object_literal(&mut self) -> Option<Expr> {
        let brace = self.previous();
        let mut pairs = vec![];

        while !self.check(TokenType::RightBrace) {
            // Bare identifiers are string keys, like `{name: 1}`
            let key = if self.match_tt(&[TokenType::Identifier]) {
                let token = self.previous();
                Expr::Literal { value: LiteralValue::String(token.lexeme.clone()), token }
            } else {
                self.expression()?
            };

            self.consume(TokenType::Colon, "Expect ':' after object key")?;
            let value = self.expression()?;
            pairs.push((key, value));

            if !self.match_tt(&[TokenType::Comma]) {
                break;
            }
        }

        self.consume(TokenType::RightBrace, "Expect '}' after object literal")?;
        Some(Expr::Object { brace, pairs })
    }

    fn if_expression(&mut self) -> Option<Expr> {
        let keyword = self.previous();
        let condition = self.expression()?;
        self.consume(TokenType::LeftBrace, "Expect '{' after if condition")?;
        let consequence = self.block()?;

        let alternative = if self.match_tt(&[TokenType::Else]) {
            if self.match_tt(&[TokenType::If]) {
                // `else if` is an else block holding a single if expression
                let nested = self.if_expression()?;
                let brace = nested.token().clone();
                Some(Block { brace, statements: vec![Stmt::Expression { expr: nested }] })
            } else {
                self.consume(TokenType::LeftBrace, "Expect '{' after 'else'")?;
                Some(self.block()?)
            }
        } else {
            None
        };

        Some(Expr::If { keyword, condition: Box::new(condition), consequence, alternative })
    }

    fn while_expression(&mut self) -> Option<Expr> {
        let keyword = self.previous();
        let condition = self.expression()?;
        self.consume(TokenType::LeftBrace, "Expect '{' after while condition")?;
        let body = self.block()?;

        Some(Expr::While { keyword, condition: Box::new(condition), body })
    }

    fn for_expression(&mut self) -> Option<Expr> {
        let keyword = self.previous();
        let parenthesized = self.match_tt(&[TokenType::LeftParen]);

        let variable = self.consume(TokenType::Identifier, "Expect loop variable after 'for'")?;
        self.consume(TokenType::In, "Expect 'in' after loop variable")?;
        let iterable = self.expression()?;

        if parenthesized {
            self.consume(TokenType::RightParen, "Expect ')' after for clause")?;
        }
        self.consume(TokenType::LeftBrace, "Expect '{' before loop body")?;
        let body = self.block()?;

        Some(Expr::For { keyword, variable, iterable: Box::new(iterable), body })
    }

    fn function(&mut self) -> Option<Expr> {
        let keyword = self.previous();
        let name =
            if self.match_tt(&[TokenType::Identifier]) { Some(self.previous()) } else { None };

        self.consume(TokenType::LeftParen, "Expect '(' after 'function'")?;

        let mut params = vec![];
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    self.error(self.peek().clone(), "Can't have more than 255 parameters");
                }

                params.push(self.consume(TokenType::Identifier, "Expect parameter name")?);
                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "Expect ')' after parameters")?;
        self.consume(TokenType::LeftBrace, "Expect '{' before function body")?;
        let body = Rc::new(self.block()?);

        Some(Expr::Function { keyword, name, params, body })
    }

    fn crawler_operator(&mut self) -> Option<Expr> {
        let keyword = self.previous();
        self.consume(TokenType::LeftParen, &format!("Expect '(' after '{}'", keyword.lexeme))?;
        let arguments = self.arguments()?;

        Some(match keyword.token_type {
            TokenType::Open => Expr::Open { keyword, arguments },
            TokenType::Extract => Expr::Extract { keyword, arguments },
            _ => Expr::Collect { keyword, arguments },
        })
    }

    /// Return the next token if its `token_type` matches the given type as input.
    /// Otherwise, record the error message and return `None`.
    fn consume(&mut self, token_type: TokenType, message: &str) -> Option<Token> {
        if self.check(token_type) {
            return Some(self.advance());
        }

        self.error(self.peek().clone(), message);
        None
    }

    fn error(&mut self, token: Token, message: &str) {
        self.errors.push(ParserError { token, message: message.to_owned() });
    }

    fn match_tt(&mut self, types: &[TokenType]) -> bool {
        for tt in types {
            if self.check(*tt) {
                self.advance();
                return true;
            }
        }

        false
    }

    /// Check to see if the next token's type matches the given `token_type`.
    fn check(&self, token_type: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == token_type
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        // The scanner always terminates the stream with EOF
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> Token {
        self.tokens[self.current.saturating_sub(1)].clone()
    }

    fn synchronize(&mut self) {
        self.advance();

        // Move and discard tokens until we find a statement boundary
        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Let
                | TokenType::Function
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Break
                | TokenType::Continue
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}

pub(crate) fn is_pipe_target(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Call { .. } | Expr::Open { .. } | Expr::Extract { .. } | Expr::Collect { .. }
    )
}
