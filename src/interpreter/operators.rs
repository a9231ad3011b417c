//! Prefix and infix operators over already-evaluated operands.
//! `&&` and `||` short-circuit, so they live in the evaluator instead.

use crate::prelude::*;

type OperatorResult = Result<Object, ErrorObject>;

pub(super) fn prefix(operator: &Token, right: Object) -> OperatorResult {
    match (operator.token_type, &right) {
        (TokenType::Minus, Object::Integer(n)) => n.checked_neg().map(Object::Integer).ok_or_else(
            || ErrorObject::runtime(operator.position(), format!("integer overflow: -({n})")),
        ),
        (TokenType::Minus, Object::Float(n)) => Ok(Object::Float(-n)),
        (TokenType::Bang, Object::Boolean(b)) => Ok(Object::Boolean(!b)),
        _ => Err(ErrorObject::type_error(
            operator.position(),
            format!("unsupported operand type for {}: {}", operator.lexeme, right.type_name()),
        )),
    }
}

pub(super) fn infix(operator: &Token, left: Object, right: Object) -> OperatorResult {
    match (&left, &right) {
        (Object::Integer(l), Object::Integer(r)) => integer_infix(operator, *l, *r),
        (Object::Integer(l), Object::Float(r)) => float_infix(operator, *l as f64, *r),
        (Object::Float(l), Object::Integer(r)) => float_infix(operator, *l, *r as f64),
        (Object::Float(l), Object::Float(r)) => float_infix(operator, *l, *r),
        (Object::String(l), Object::String(r)) => string_infix(operator, l, r),
        _ => match operator.token_type {
            TokenType::EqualEqual => Ok(Object::Boolean(left == right)),
            TokenType::BangEqual => Ok(Object::Boolean(left != right)),
            _ => Err(unsupported(operator, left.type_name(), right.type_name())),
        },
    }
}

fn integer_infix(operator: &Token, l: i64, r: i64) -> OperatorResult {
    let value = match operator.token_type {
        TokenType::Plus => l.checked_add(r),
        TokenType::Minus => l.checked_sub(r),
        TokenType::Star => l.checked_mul(r),
        TokenType::Slash | TokenType::Percent if r == 0 => {
            return Err(ErrorObject::runtime(operator.position(), "division by zero"));
        }
        TokenType::Slash => l.checked_div(r),
        TokenType::Percent => l.checked_rem(r),
        TokenType::Greater => return Ok(Object::Boolean(l > r)),
        TokenType::GreaterEqual => return Ok(Object::Boolean(l >= r)),
        TokenType::Less => return Ok(Object::Boolean(l < r)),
        TokenType::LessEqual => return Ok(Object::Boolean(l <= r)),
        TokenType::EqualEqual => return Ok(Object::Boolean(l == r)),
        TokenType::BangEqual => return Ok(Object::Boolean(l != r)),
        _ => return Err(unsupported(operator, ObjectType::Integer, ObjectType::Integer)),
    };

    value.map(Object::Integer).ok_or_else(|| {
        ErrorObject::runtime(
            operator.position(),
            format!("integer overflow: {l} {} {r}", operator.lexeme),
        )
    })
}

fn float_infix(operator: &Token, l: f64, r: f64) -> OperatorResult {
    let value = match operator.token_type {
        TokenType::Plus => Object::Float(l + r),
        TokenType::Minus => Object::Float(l - r),
        TokenType::Star => Object::Float(l * r),
        TokenType::Slash => Object::Float(l / r),
        TokenType::Percent => Object::Float(l % r),
        TokenType::Greater => Object::Boolean(l > r),
        TokenType::GreaterEqual => Object::Boolean(l >= r),
        TokenType::Less => Object::Boolean(l < r),
        TokenType::LessEqual => Object::Boolean(l <= r),
        TokenType::EqualEqual => Object::Boolean(l == r),
        TokenType::BangEqual => Object::Boolean(l != r),
        _ => return Err(unsupported(operator, ObjectType::Float, ObjectType::Float)),
    };
    Ok(value)
}

fn string_infix(operator: &Token, l: &str, r: &str) -> OperatorResult {
    let value = match operator.token_type {
        TokenType::Plus => Object::String(format!("{l}{r}")),
        TokenType::Greater => Object::Boolean(l > r),
        TokenType::GreaterEqual => Object::Boolean(l >= r),
        TokenType::Less => Object::Boolean(l < r),
        TokenType::LessEqual => Object::Boolean(l <= r),
        TokenType::EqualEqual => Object::Boolean(l == r),
        TokenType::BangEqual => Object::Boolean(l != r),
        _ => return Err(unsupported(operator, ObjectType::String, ObjectType::String)),
    };
    Ok(value)
}

fn unsupported(operator: &Token, left: ObjectType, right: ObjectType) -> ErrorObject {
    ErrorObject::type_error(
        operator.position(),
        format!("unsupported operand types for {}: {left} and {right}", operator.lexeme),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(token_type: TokenType, lexeme: &str) -> Token {
        Token::new(token_type, lexeme, None, 1, 3)
    }

    #[test]
    fn integer_arithmetic_is_checked() {
        let plus = op(TokenType::Plus, "+");
        assert_eq!(infix(&plus, Object::Integer(2), Object::Integer(3)), Ok(Object::Integer(5)));

        let overflow = infix(&plus, Object::Integer(i64::MAX), Object::Integer(1)).unwrap_err();
        assert_eq!(overflow.kind, ErrorKind::RuntimeError);

        let slash = op(TokenType::Slash, "/");
        let zero = infix(&slash, Object::Integer(1), Object::Integer(0)).unwrap_err();
        assert_eq!(zero.message, "division by zero");

        let percent = op(TokenType::Percent, "%");
        assert_eq!(infix(&percent, Object::Integer(7), Object::Integer(3)), Ok(Object::Integer(1)));
        assert!(infix(&percent, Object::Integer(7), Object::Integer(0)).is_err());
    }

    #[test]
    fn mixed_numbers_promote_to_float() {
        let star = op(TokenType::Star, "*");
        assert_eq!(infix(&star, Object::Integer(2), Object::Float(1.5)), Ok(Object::Float(3.0)));

        let less = op(TokenType::Less, "<");
        assert_eq!(infix(&less, Object::Float(0.5), Object::Integer(1)), Ok(Object::Boolean(true)));
    }

    #[test]
    fn strings_concatenate_and_compare() {
        let plus = op(TokenType::Plus, "+");
        assert_eq!(
            infix(&plus, Object::String("a".into()), Object::String("b".into())),
            Ok(Object::String("ab".into()))
        );

        let greater = op(TokenType::Greater, ">");
        assert_eq!(
            infix(&greater, Object::String("b".into()), Object::String("a".into())),
            Ok(Object::Boolean(true))
        );
    }

    #[test]
    fn mismatched_operands_are_type_errors() {
        let minus = op(TokenType::Minus, "-");
        let error = infix(&minus, Object::String("a".into()), Object::Integer(1)).unwrap_err();
        assert_eq!(error.kind, ErrorKind::TypeError);
        assert_eq!(error.message, "unsupported operand types for -: STRING and INTEGER");

        let error = prefix(&op(TokenType::Bang, "!"), Object::Integer(1)).unwrap_err();
        assert_eq!(error.message, "unsupported operand type for !: INTEGER");
    }

    #[test]
    fn equality_across_kinds() {
        let eq = op(TokenType::EqualEqual, "==");
        assert_eq!(infix(&eq, Object::Null, Object::Null), Ok(Object::Boolean(true)));
        assert_eq!(
            infix(&eq, Object::Integer(1), Object::String("1".into())),
            Ok(Object::Boolean(false))
        );
        assert_eq!(infix(&eq, Object::Integer(2), Object::Float(2.0)), Ok(Object::Boolean(true)));
    }
}
