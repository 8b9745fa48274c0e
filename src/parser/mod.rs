//! Recursive-descent parser for Grace.
//!
//! Each AST node implements [`FromTokens`] next to its definition in
//! [`ast`]. The parser produces a purely syntactic `Ast<()>`; all semantic
//! checking and annotation happens in a later pass over the tree.

pub mod ast;

use std::{error::Error, fmt::Display};

use crate::lexer::{GetPosition, Span, Token, TokenKind};

use self::ast::Program;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: Span,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl Error for ParseError {}

impl ParseError {
    pub fn new(message: impl ToString, position: Span) -> Self {
        Self {
            message: message.to_string(),
            position,
        }
    }

    pub fn eof(expected: impl Display) -> Self {
        Self {
            message: format!("unexpected end of input, expected {expected}"),
            position: Span::default(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Cursor over the token stream with single-token and two-token lookahead
/// plus index save/restore for the one backtracking point in the grammar
/// (parenthesised condition vs parenthesised expression).
pub struct Tokens {
    tokens: Vec<Token>,
    index: usize,
}

impl Tokens {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(Token::kind)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.index + n)
    }

    pub fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    /// Consume the next token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.index += 1;
            return true;
        }
        false
    }

    pub fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        match self.peek() {
            Some(token) if token.kind() == kind => Ok(self.next().unwrap()),
            Some(token) => Err(ParseError::new(
                format!("expected {kind} but found {}", token.kind()),
                token.position(),
            )),
            None => Err(ParseError::eof(kind)),
        }
    }

    /// Position of the next token, or of the end of input.
    pub fn span(&self) -> Span {
        match self.peek() {
            Some(token) => token.position(),
            None => self
                .tokens
                .last()
                .map(GetPosition::position)
                .unwrap_or_default(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }
}

impl From<Vec<Token>> for Tokens {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

/// Implemented by AST nodes that can be parsed from the token stream.
pub trait FromTokens: Sized {
    fn parse(tokens: &mut Tokens) -> ParseResult<Self>;
}

/// Parse a whole Grace program: exactly one top-level function definition.
pub fn parse_program(tokens: Vec<Token>) -> ParseResult<Program<()>> {
    let mut tokens = Tokens::new(tokens);
    let program = Program::parse(&mut tokens)?;

    if let Some(trailing) = tokens.peek() {
        return Err(ParseError::new(
            format!("trailing input after program, found {}", trailing.kind()),
            trailing.position(),
        ));
    }

    Ok(program)
}
