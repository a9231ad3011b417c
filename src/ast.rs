use std::rc::Rc;

use crate::token::{LiteralValue, Position, Token};

/// A parsed script. Immutable once the parser hands it over.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub brace: Token,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let { keyword: Token, name: Token, value: Expr },
    Return { keyword: Token, value: Option<Expr> },
    Expression { expr: Expr },
    Block { block: Block },
    Break { keyword: Token },
    Continue { keyword: Token },
}

#[derive(Debug, Clone)]
pub enum Expr {
    Identifier {
        name: Token,
    },
    Literal {
        token: Token,
        value: LiteralValue,
    },
    Prefix {
        operator: Token,
        right: Box<Expr>,
    },
    Infix {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    If {
        keyword: Token,
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },
    While {
        keyword: Token,
        condition: Box<Expr>,
        body: Block,
    },
    For {
        keyword: Token,
        variable: Token,
        iterable: Box<Expr>,
        body: Block,
    },
    Function {
        keyword: Token,
        name: Option<Token>,
        params: Vec<Token>,
        body: Rc<Block>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },
    Array {
        bracket: Token,
        elements: Vec<Expr>,
    },
    Index {
        left: Box<Expr>,
        bracket: Token,
        index: Box<Expr>,
    },
    Object {
        brace: Token,
        pairs: Vec<(Expr, Expr)>,
    },
    Open {
        keyword: Token,
        arguments: Vec<Expr>,
    },
    Extract {
        keyword: Token,
        arguments: Vec<Expr>,
    },
    Collect {
        keyword: Token,
        arguments: Vec<Expr>,
    },
    At {
        at: Token,
        selector: Box<Expr>,
    },
    Pipe {
        left: Box<Expr>,
        pipe: Token,
        right: Box<Expr>,
    },
}

impl Expr {
    /// The token this node reports errors against.
    pub fn token(&self) -> &Token {
        match self {
            Expr::Identifier { name } => name,
            Expr::Literal { token, .. } => token,
            Expr::Prefix { operator, .. } | Expr::Infix { operator, .. } => operator,
            Expr::If { keyword, .. }
            | Expr::While { keyword, .. }
            | Expr::For { keyword, .. }
            | Expr::Function { keyword, .. }
            | Expr::Open { keyword, .. }
            | Expr::Extract { keyword, .. }
            | Expr::Collect { keyword, .. } => keyword,
            Expr::Call { paren, .. } => paren,
            Expr::Array { bracket, .. } | Expr::Index { bracket, .. } => bracket,
            Expr::Object { brace, .. } => brace,
            Expr::At { at, .. } => at,
            Expr::Pipe { pipe, .. } => pipe,
        }
    }

    pub fn position(&self) -> Position {
        self.token().position()
    }
}

impl Stmt {
    pub fn position(&self) -> Position {
        match self {
            Stmt::Let { keyword, .. }
            | Stmt::Return { keyword, .. }
            | Stmt::Break { keyword }
            | Stmt::Continue { keyword } => keyword.position(),
            Stmt::Expression { expr } => expr.position(),
            Stmt::Block { block } => block.brace.position(),
        }
    }
}
