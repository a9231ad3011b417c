use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Minus,
    Plus,
    Slash,
    Star,
    Percent,
    Pipe,
    At,

    // One or two character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,

    // Literals.
    Identifier,
    StringLiteral,
    Integer,
    Float,

    // Keywords.
    Break,
    Collect,
    Continue,
    Else,
    Extract,
    False,
    For,
    Function,
    If,
    In,
    Let,
    Null,
    Open,
    Return,
    True,
    While,

    EOF,
}

/// Literal payload attached to number and string tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Display for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// Line and column of a token, both 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub literal: Option<LiteralValue>,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        lexeme: &str,
        literal: Option<LiteralValue>,
        line: u32,
        column: u32,
    ) -> Self {
        Self { token_type, lexeme: lexeme.to_owned(), literal, line, column }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {} {:?}", self.token_type, self.lexeme, self.literal)
    }
}

pub(crate) fn get_keyword(text: &str) -> Option<TokenType> {
    match text {
        "break" => Some(TokenType::Break),
        "collect" => Some(TokenType::Collect),
        "continue" => Some(TokenType::Continue),
        "else" => Some(TokenType::Else),
        "extract" => Some(TokenType::Extract),
        "false" => Some(TokenType::False),
        "for" => Some(TokenType::For),
        "function" => Some(TokenType::Function),
        "if" => Some(TokenType::If),
        "in" => Some(TokenType::In),
        "let" => Some(TokenType::Let),
        "null" => Some(TokenType::Null),
        "open" => Some(TokenType::Open),
        "return" => Some(TokenType::Return),
        "true" => Some(TokenType::True),
        "while" => Some(TokenType::While),
        _ => None,
    }
}
