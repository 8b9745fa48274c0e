//! Expression nodes and their precedence-climbing parsers.
//!
//! All Grace arithmetic is over `int`; conditions are a separate syntactic
//! category (see [`super::condition`]).

use std::fmt::Display;

use crate::{
    lexer::{GetPosition, Span, Token, TokenKind},
    parser::{FromTokens, ParseError, ParseResult, Tokens},
};

use super::{Identifier, Lvalue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression<T> {
    Int(IntLiteral<T>),
    Char(CharLiteral<T>),
    Lvalue(Lvalue<T>),
    Call(FunctionCall<T>),
    Unary(UnaryExpression<T>),
    Binary(BinaryExpression<T>),
}

impl<T> Expression<T> {
    pub fn position(&self) -> Span {
        match self {
            Expression::Int(IntLiteral { position, .. })
            | Expression::Char(CharLiteral { position, .. })
            | Expression::Call(FunctionCall { position, .. })
            | Expression::Unary(UnaryExpression { position, .. })
            | Expression::Binary(BinaryExpression { position, .. }) => position.clone(),
            Expression::Lvalue(lvalue) => lvalue.position(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntLiteral<T> {
    pub value: i64,
    pub info: T,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharLiteral<T> {
    pub value: u8,
    pub info: T,
    pub position: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Plus => f.write_str("+"),
            UnaryOperator::Minus => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnaryExpression<T> {
    pub operator: UnaryOperator,
    pub operand: Box<Expression<T>>,
    pub info: T,
    pub position: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Add => f.write_str("+"),
            BinaryOperator::Subtract => f.write_str("-"),
            BinaryOperator::Multiply => f.write_str("*"),
            BinaryOperator::Divide => f.write_str("div"),
            BinaryOperator::Modulo => f.write_str("mod"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryExpression<T> {
    pub operator: BinaryOperator,
    pub left: Box<Expression<T>>,
    pub right: Box<Expression<T>>,
    pub info: T,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall<T> {
    pub id: Identifier,
    pub arguments: Vec<Expression<T>>,
    pub info: T,
    pub position: Span,
}

impl FunctionCall<()> {
    /// Parse the argument list of a call whose callee id has already been
    /// consumed.
    pub fn parse_with_id(id: Identifier, tokens: &mut Tokens) -> ParseResult<Self> {
        let position = id.position.clone();
        tokens.expect(TokenKind::LParen)?;

        let mut arguments = vec![];
        if !tokens.eat(TokenKind::RParen) {
            loop {
                arguments.push(Expression::parse(tokens)?);
                if tokens.eat(TokenKind::Comma) {
                    continue;
                }
                tokens.expect(TokenKind::RParen)?;
                break;
            }
        }

        let end = tokens.span();
        Ok(FunctionCall {
            id,
            arguments,
            info: (),
            position: position.merge(&end),
        })
    }
}

impl FromTokens for Expression<()> {
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        parse_additive(tokens)
    }
}

fn parse_additive(tokens: &mut Tokens) -> ParseResult<Expression<()>> {
    let mut left = parse_term(tokens)?;

    loop {
        let operator = match tokens.peek_kind() {
            Some(TokenKind::Plus) => BinaryOperator::Add,
            Some(TokenKind::Minus) => BinaryOperator::Subtract,
            _ => return Ok(left),
        };
        tokens.next();

        let right = parse_term(tokens)?;
        let position = left.position().merge(&right.position());
        left = Expression::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            info: (),
            position,
        });
    }
}

fn parse_term(tokens: &mut Tokens) -> ParseResult<Expression<()>> {
    let mut left = parse_factor(tokens)?;

    loop {
        let operator = match tokens.peek_kind() {
            Some(TokenKind::Times) => BinaryOperator::Multiply,
            Some(TokenKind::Div) => BinaryOperator::Divide,
            Some(TokenKind::Mod) => BinaryOperator::Modulo,
            _ => return Ok(left),
        };
        tokens.next();

        let right = parse_factor(tokens)?;
        let position = left.position().merge(&right.position());
        left = Expression::Binary(BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            info: (),
            position,
        });
    }
}

fn parse_factor(tokens: &mut Tokens) -> ParseResult<Expression<()>> {
    let operator = match tokens.peek_kind() {
        Some(TokenKind::Plus) => Some(UnaryOperator::Plus),
        Some(TokenKind::Minus) => Some(UnaryOperator::Minus),
        _ => None,
    };

    if let Some(operator) = operator {
        let position = tokens.span();
        tokens.next();
        let operand = parse_factor(tokens)?;
        let position = position.merge(&operand.position());
        return Ok(Expression::Unary(UnaryExpression {
            operator,
            operand: Box::new(operand),
            info: (),
            position,
        }));
    }

    parse_primary(tokens)
}

fn parse_primary(tokens: &mut Tokens) -> ParseResult<Expression<()>> {
    match tokens.peek() {
        Some(Token::IntLiteral { .. }) => {
            let Some(Token::IntLiteral { value, position }) = tokens.next() else {
                unreachable!()
            };
            Ok(Expression::Int(IntLiteral {
                value,
                info: (),
                position,
            }))
        }
        Some(Token::CharLiteral { .. }) => {
            let Some(Token::CharLiteral { value, position }) = tokens.next() else {
                unreachable!()
            };
            Ok(Expression::Char(CharLiteral {
                value,
                info: (),
                position,
            }))
        }
        Some(Token::LParen { .. }) => {
            tokens.next();
            let inner = Expression::parse(tokens)?;
            tokens.expect(TokenKind::RParen)?;
            Ok(inner)
        }
        Some(Token::Id { .. }) => {
            // an identifier starts either a call or an l-value chain
            if tokens.peek_nth(1).map(Token::kind) == Some(TokenKind::LParen) {
                let id = Identifier::parse(tokens)?;
                let call = FunctionCall::parse_with_id(id, tokens)?;
                Ok(Expression::Call(call))
            } else {
                Ok(Expression::Lvalue(Lvalue::parse(tokens)?))
            }
        }
        Some(Token::StringLiteral { .. }) => Ok(Expression::Lvalue(Lvalue::parse(tokens)?)),
        Some(token) => Err(ParseError::new(
            format!("expected an expression but found {}", token.kind()),
            token.position(),
        )),
        None => Err(ParseError::eof("an expression")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_expression(input: &str) -> ParseResult<Expression<()>> {
        let mut tokens = Tokens::new(Lexer::new(input).lex().unwrap());
        Expression::parse(&mut tokens)
    }

    #[test]
    fn test_precedence() {
        let expression = parse_expression("1 + 2 * 3").unwrap();
        let Expression::Binary(BinaryExpression {
            operator, right, ..
        }) = expression
        else {
            panic!("expected binary expression");
        };
        assert_eq!(operator, BinaryOperator::Add);
        assert!(matches!(
            *right,
            Expression::Binary(BinaryExpression {
                operator: BinaryOperator::Multiply,
                ..
            })
        ));
    }

    #[test]
    fn test_div_mod_keywords() {
        let expression = parse_expression("x div 2 mod 3").unwrap();
        let Expression::Binary(BinaryExpression { operator, left, .. }) = expression else {
            panic!("expected binary expression");
        };
        assert_eq!(operator, BinaryOperator::Modulo);
        assert!(matches!(
            *left,
            Expression::Binary(BinaryExpression {
                operator: BinaryOperator::Divide,
                ..
            })
        ));
    }

    #[test]
    fn test_unary_minus() {
        let expression = parse_expression("-x + 1").unwrap();
        let Expression::Binary(BinaryExpression { left, .. }) = expression else {
            panic!("expected binary expression");
        };
        assert!(matches!(
            *left,
            Expression::Unary(UnaryExpression {
                operator: UnaryOperator::Minus,
                ..
            })
        ));
    }

    #[test]
    fn test_parenthesised() {
        let expression = parse_expression("(1 + 2) * 3").unwrap();
        assert!(matches!(
            expression,
            Expression::Binary(BinaryExpression {
                operator: BinaryOperator::Multiply,
                ..
            })
        ));
    }

    #[test]
    fn test_call_with_arguments() {
        let expression = parse_expression("f(1, x + 2)").unwrap();
        let Expression::Call(call) = expression else {
            panic!("expected call");
        };
        assert_eq!(call.id.name, "f");
        assert_eq!(call.arguments.len(), 2);
    }

    #[test]
    fn test_call_without_arguments() {
        let expression = parse_expression("readInteger()").unwrap();
        let Expression::Call(call) = expression else {
            panic!("expected call");
        };
        assert!(call.arguments.is_empty());
    }
}
