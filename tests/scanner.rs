use harvest::prelude::{Scanner, TokenType};

#[test]
fn scanner_works() {
    let input = "open(url) | extract(@\"a\") && true";
    let mut scanner = Scanner::new(input);
    let tokens = scanner.scan_tokens().unwrap();

    let types: Vec<_> = tokens.iter().map(|t| t.token_type).collect();
    assert_eq!(
        types,
        vec![
            TokenType::Open,
            TokenType::LeftParen,
            TokenType::Identifier,
            TokenType::RightParen,
            TokenType::Pipe,
            TokenType::Extract,
            TokenType::LeftParen,
            TokenType::At,
            TokenType::StringLiteral,
            TokenType::RightParen,
            TokenType::And,
            TokenType::True,
            TokenType::EOF,
        ]
    );
}

#[test]
fn scanner_collects_every_error() {
    let mut scanner = Scanner::new("let a = #;\nlet b = \"open");
    let errors = scanner.scan_tokens().unwrap_err();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].line, 1);
    assert_eq!(errors[1].line, 2);
}
