use thiserror::Error;

use crate::token::{get_keyword, LiteralValue, Token, TokenType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}:{column}] Error: {message}")]
pub struct ScannerError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

#[derive(Debug)]
pub struct Scanner {
    source_chars: Vec<char>,
    tokens: Vec<Token>,
    errors: Vec<ScannerError>,
    start: usize,
    current: usize,
    line: u32,
    line_start: usize,
    start_line: u32,
    start_column: u32,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            source_chars: source.chars().collect(),
            tokens: Vec::new(),
            errors: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            line_start: 0,
            start_line: 1,
            start_column: 1,
        }
    }

    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, Vec<ScannerError>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column_of(self.start);
            self.scan_token();
        }

        let column = self.column_of(self.current);
        self.tokens.push(Token::new(TokenType::EOF, "", None, self.line, column));

        if !self.errors.is_empty() {
            return Err(std::mem::take(&mut self.errors));
        }

        // Take our temporary tokens out. It will be replaced by the default()
        // value for the vector
        Ok(std::mem::take(&mut self.tokens))
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source_chars.len()
    }

    fn column_of(&self, index: usize) -> u32 {
        (index - self.line_start + 1) as u32
    }

    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '[' => self.add_token(TokenType::LeftBracket),
            ']' => self.add_token(TokenType::RightBracket),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            ':' => self.add_token(TokenType::Colon),
            ';' => self.add_token(TokenType::Semicolon),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            '*' => self.add_token(TokenType::Star),
            '%' => self.add_token(TokenType::Percent),
            '@' => self.add_token(TokenType::At),
            '!' => {
                let token_type =
                    if self.match_next('=') { TokenType::BangEqual } else { TokenType::Bang };
                self.add_token(token_type);
            }
            '=' => {
                let token_type =
                    if self.match_next('=') { TokenType::EqualEqual } else { TokenType::Equal };
                self.add_token(token_type);
            }
            '<' => {
                let token_type =
                    if self.match_next('=') { TokenType::LessEqual } else { TokenType::Less };
                self.add_token(token_type);
            }
            '>' => {
                let token_type =
                    if self.match_next('=') { TokenType::GreaterEqual } else { TokenType::Greater };
                self.add_token(token_type);
            }
            '&' => {
                if self.match_next('&') {
                    self.add_token(TokenType::And);
                } else {
                    self.error("Unexpected character '&', did you mean '&&'?");
                }
            }
            '|' => {
                let token_type = if self.match_next('|') { TokenType::Or } else { TokenType::Pipe };
                self.add_token(token_type);
            }
            '/' => {
                if self.match_next('/') {
                    // Go until end of the commented line
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.newline(),
            '"' => self.string(),
            '0'..='9' => self.number(),
            c if is_alpha(c) => self.identifier(),
            c => self.error(&format!("Unexpected character '{c}'")),
        }
    }

    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.current;
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(ScannerError {
            line: self.start_line,
            column: self.start_column,
            message: msg.to_owned(),
        });
    }

    fn advance(&mut self) -> char {
        let ch = self.source_chars.get(self.current).copied().unwrap_or('\0');
        self.current += 1;
        ch
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_token_with_literal(token_type, None);
    }

    fn source_substring(&self, start: usize, end: usize) -> String {
        self.source_chars[start..end].iter().collect()
    }

    fn add_token_with_literal(&mut self, token_type: TokenType, literal: Option<LiteralValue>) {
        let text = self.source_substring(self.start, self.current);
        let token = Token::new(token_type, &text, literal, self.start_line, self.start_column);
        self.tokens.push(token);
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == expected && !self.is_at_end() {
            self.current += 1;
            return true;
        }

        false
    }

    fn peek(&self) -> char {
        self.source_chars.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source_chars.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn string(&mut self) {
        let mut value = String::new();

        while self.peek() != '"' && !self.is_at_end() {
            let c = self.advance();
            match c {
                '\n' => {
                    self.newline();
                    value.push(c);
                }
                '\\' => match self.advance() {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    other => {
                        self.error(&format!("Unknown escape sequence '\\{other}'"));
                    }
                },
                c => value.push(c),
            }
        }

        if self.is_at_end() {
            self.error("Unterminated string.");
            return;
        }

        // The closing "
        self.advance();

        self.add_token_with_literal(TokenType::StringLiteral, Some(LiteralValue::String(value)));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            // Consume '.'
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.source_substring(self.start, self.current);
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => {
                    self.add_token_with_literal(TokenType::Float, Some(LiteralValue::Float(value)))
                }
                Err(_) => self.error(&format!("Invalid float literal '{text}'")),
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self
                    .add_token_with_literal(TokenType::Integer, Some(LiteralValue::Integer(value))),
                Err(_) => self.error(&format!("Integer literal '{text}' is out of range")),
            }
        }
    }

    fn identifier(&mut self) {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let text = self.source_substring(self.start, self.current);
        let token_type = get_keyword(&text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_alpha_numeric(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_types(source: &str) -> Vec<TokenType> {
        Scanner::new(source)
            .scan_tokens()
            .expect("scan failed")
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn scans_crawler_operators() {
        assert_eq!(
            token_types(r#"open("u") | extract(@"h1");"#),
            vec![
                TokenType::Open,
                TokenType::LeftParen,
                TokenType::StringLiteral,
                TokenType::RightParen,
                TokenType::Pipe,
                TokenType::Extract,
                TokenType::LeftParen,
                TokenType::At,
                TokenType::StringLiteral,
                TokenType::RightParen,
                TokenType::Semicolon,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn distinguishes_pipe_from_or() {
        assert_eq!(
            token_types("a || b | c && d"),
            vec![
                TokenType::Identifier,
                TokenType::Or,
                TokenType::Identifier,
                TokenType::Pipe,
                TokenType::Identifier,
                TokenType::And,
                TokenType::Identifier,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn integer_and_float_literals() {
        let tokens = Scanner::new("42 3.25").scan_tokens().unwrap();
        assert_eq!(tokens[0].literal, Some(LiteralValue::Integer(42)));
        assert_eq!(tokens[1].literal, Some(LiteralValue::Float(3.25)));
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Scanner::new("let x = 1;\n  x;").scan_tokens().unwrap();
        let x = &tokens[5];
        assert_eq!(x.lexeme, "x");
        assert_eq!((x.line, x.column), (2, 3));
    }

    #[test]
    fn string_escapes() {
        let tokens = Scanner::new(r#""a\"b\n""#).scan_tokens().unwrap();
        assert_eq!(tokens[0].literal, Some(LiteralValue::String("a\"b\n".to_owned())));
    }

    #[test]
    fn reports_unterminated_string_and_bad_chars() {
        let errors = Scanner::new("\"abc\n#").scan_tokens().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unterminated string.");

        let errors = Scanner::new("let a = 1 # 2;").scan_tokens().unwrap_err();
        assert_eq!(errors[0].column, 11);
    }
}
