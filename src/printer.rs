//! Source-like rendering of the AST.
//!
//! Used for function display forms and `--debug` dumps. Prefix and infix
//! expressions are fully parenthesized so the output shows how the parser
//! grouped them.

use std::fmt::{Display, Formatter, Result};

use crate::ast::*;

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for stmt in &self.statements {
            write!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{{ ")?;
        for stmt in &self.statements {
            write!(f, "{stmt} ")?;
        }
        write!(f, "}}")
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Stmt::Let { name, value, .. } => write!(f, "let {} = {value};", name.lexeme),
            Stmt::Return { value: Some(value), .. } => write!(f, "return {value};"),
            Stmt::Return { value: None, .. } => write!(f, "return;"),
            Stmt::Expression { expr } => write!(f, "{expr};"),
            Stmt::Block { block } => write!(f, "{block}"),
            Stmt::Break { .. } => write!(f, "break;"),
            Stmt::Continue { .. } => write!(f, "continue;"),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Expr::Identifier { name } => write!(f, "{}", name.lexeme),
            Expr::Literal { value, .. } => write!(f, "{value}"),
            Expr::Prefix { operator, right } => write!(f, "({}{right})", operator.lexeme),
            Expr::Infix { left, operator, right } => {
                write!(f, "({left} {} {right})", operator.lexeme)
            }
            Expr::If { condition, consequence, alternative, .. } => {
                write!(f, "if {condition} {consequence}")?;
                if let Some(alternative) = alternative {
                    write!(f, " else {alternative}")?;
                }
                Ok(())
            }
            Expr::While { condition, body, .. } => write!(f, "while {condition} {body}"),
            Expr::For { variable, iterable, body, .. } => {
                write!(f, "for {} in {iterable} {body}", variable.lexeme)
            }
            Expr::Function { name, params, body, .. } => {
                write!(f, "function")?;
                if let Some(name) = name {
                    write!(f, " {}", name.lexeme)?;
                }
                let params: Vec<&str> = params.iter().map(|p| p.lexeme.as_str()).collect();
                write!(f, "({}) {body}", params.join(", "))
            }
            Expr::Call { callee, arguments, .. } => {
                write!(f, "{callee}(")?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            Expr::Array { elements, .. } => {
                write!(f, "[")?;
                write_list(f, elements)?;
                write!(f, "]")
            }
            Expr::Index { left, index, .. } => write!(f, "({left}[{index}])"),
            Expr::Object { pairs, .. } => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Expr::Open { arguments, .. } => {
                write!(f, "open(")?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            Expr::Extract { arguments, .. } => {
                write!(f, "extract(")?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            Expr::Collect { arguments, .. } => {
                write!(f, "collect(")?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            Expr::At { selector, .. } => write!(f, "@{selector}"),
            Expr::Pipe { left, right, .. } => write!(f, "({left} | {right})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::token::{LiteralValue, Token, TokenType};

    use super::*;

    #[test]
    fn print_an_ast() {
        // This is '-123 * (45.67)'
        let expr = Expr::Infix {
            left: Box::new(Expr::Prefix {
                operator: Token::new(TokenType::Minus, "-", None, 1, 1),
                right: Box::new(Expr::Literal {
                    token: Token::new(TokenType::Integer, "123", None, 1, 2),
                    value: LiteralValue::Integer(123),
                }),
            }),
            operator: Token::new(TokenType::Star, "*", None, 1, 6),
            right: Box::new(Expr::Literal {
                token: Token::new(TokenType::Float, "45.67", None, 1, 9),
                value: LiteralValue::Float(45.67),
            }),
        };

        assert_eq!(expr.to_string(), "((-123) * 45.67)");
    }

    #[test]
    fn print_a_let_statement() {
        let stmt = Stmt::Let {
            keyword: Token::new(TokenType::Let, "let", None, 1, 1),
            name: Token::new(TokenType::Identifier, "myVar", None, 1, 5),
            value: Expr::Identifier {
                name: Token::new(TokenType::Identifier, "anotherVar", None, 1, 13),
            },
        };

        assert_eq!(stmt.to_string(), "let myVar = anotherVar;");
    }
}
