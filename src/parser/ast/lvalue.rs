//! L-value nodes: identifiers, string literals and indexed accesses.

use crate::{
    lexer::{GetPosition, Span, Token, TokenKind},
    parser::{FromTokens, ParseError, ParseResult, Tokens},
};

use super::{Expression, Identifier};

/// An expression denoting a storage location. A string literal is a
/// read-only l-value; an indexed access applies bracket expressions to a
/// simple (identifier or string) base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lvalue<T> {
    Variable(Variable<T>),
    String(StringLiteral<T>),
    Access(ArrayAccess<T>),
}

impl<T> Lvalue<T> {
    pub fn position(&self) -> Span {
        match self {
            Lvalue::Variable(Variable { position, .. })
            | Lvalue::String(StringLiteral { position, .. })
            | Lvalue::Access(ArrayAccess { position, .. }) => position.clone(),
        }
    }

    /// Whether the l-value is a string literal, or an access into one.
    pub fn is_string_literal(&self) -> bool {
        match self {
            Lvalue::String(_) => true,
            Lvalue::Variable(_) => false,
            Lvalue::Access(access) => access.base.is_string_literal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable<T> {
    pub id: Identifier,
    pub info: T,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral<T> {
    pub value: Vec<u8>,
    pub info: T,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayAccess<T> {
    pub base: Box<Lvalue<T>>,
    pub indices: Vec<Expression<T>>,
    pub info: T,
    pub position: Span,
}

impl FromTokens for Lvalue<()> {
    /// A simple base (identifier or string literal) followed by any number
    /// of `[index]` groups.
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        let base = match tokens.next() {
            Some(Token::Id { value, position }) => Lvalue::Variable(Variable {
                id: Identifier {
                    name: value,
                    position: position.clone(),
                },
                info: (),
                position,
            }),
            Some(Token::StringLiteral { value, position }) => Lvalue::String(StringLiteral {
                value,
                info: (),
                position,
            }),
            Some(token) => {
                return Err(ParseError::new(
                    format!("expected an l-value but found {}", token.kind()),
                    token.position(),
                ))
            }
            None => return Err(ParseError::eof("an l-value")),
        };

        let mut indices = vec![];
        while tokens.eat(TokenKind::LBracket) {
            indices.push(Expression::parse(tokens)?);
            tokens.expect(TokenKind::RBracket)?;
        }

        if indices.is_empty() {
            return Ok(base);
        }

        let position = base.position().merge(&tokens.span());
        Ok(Lvalue::Access(ArrayAccess {
            base: Box::new(base),
            indices,
            info: (),
            position,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_lvalue(input: &str) -> ParseResult<Lvalue<()>> {
        let mut tokens = Tokens::new(Lexer::new(input).lex().unwrap());
        Lvalue::parse(&mut tokens)
    }

    #[test]
    fn test_parse_variable() {
        let lvalue = parse_lvalue("x").unwrap();
        let Lvalue::Variable(variable) = lvalue else {
            panic!("expected variable");
        };
        assert_eq!(variable.id.name, "x");
    }

    #[test]
    fn test_parse_string() {
        let lvalue = parse_lvalue("\"hello\"").unwrap();
        assert!(lvalue.is_string_literal());
    }

    #[test]
    fn test_parse_indexed() {
        let lvalue = parse_lvalue("x[1][i + 1]").unwrap();
        let Lvalue::Access(access) = lvalue else {
            panic!("expected access");
        };
        assert_eq!(access.indices.len(), 2);
        assert!(matches!(*access.base, Lvalue::Variable(_)));
    }

    #[test]
    fn test_indexed_string_is_still_a_literal() {
        let lvalue = parse_lvalue("\"abc\"[0]").unwrap();
        assert!(lvalue.is_string_literal());
    }
}
