//! Condition nodes: comparisons and logical connectives.
//!
//! Conditions are a category of their own in Grace; an `int` is never
//! implicitly a truth value. Precedence is `or` < `and` < `not` <
//! comparison.

use std::fmt::Display;

use crate::{
    lexer::{Span, TokenKind},
    parser::{FromTokens, ParseError, ParseResult, Tokens},
};

use super::Expression;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition<T> {
    Comparison(Comparison<T>),
    Logical(LogicalCondition<T>),
    Not(NotCondition<T>),
}

impl<T> Condition<T> {
    pub fn position(&self) -> Span {
        match self {
            Condition::Comparison(Comparison { position, .. })
            | Condition::Logical(LogicalCondition { position, .. })
            | Condition::Not(NotCondition { position, .. }) => position.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonOperator::Equal => f.write_str("="),
            ComparisonOperator::NotEqual => f.write_str("#"),
            ComparisonOperator::Less => f.write_str("<"),
            ComparisonOperator::LessEqual => f.write_str("<="),
            ComparisonOperator::Greater => f.write_str(">"),
            ComparisonOperator::GreaterEqual => f.write_str(">="),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison<T> {
    pub operator: ComparisonOperator,
    pub left: Box<Expression<T>>,
    pub right: Box<Expression<T>>,
    pub position: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOperator::And => f.write_str("and"),
            LogicalOperator::Or => f.write_str("or"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalCondition<T> {
    pub operator: LogicalOperator,
    pub left: Box<Condition<T>>,
    pub right: Box<Condition<T>>,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotCondition<T> {
    pub inner: Box<Condition<T>>,
    pub position: Span,
}

impl FromTokens for Condition<()> {
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        parse_or(tokens)
    }
}

fn parse_or(tokens: &mut Tokens) -> ParseResult<Condition<()>> {
    let mut left = parse_and(tokens)?;

    while tokens.eat(TokenKind::Or) {
        let right = parse_and(tokens)?;
        let position = left.position().merge(&right.position());
        left = Condition::Logical(LogicalCondition {
            operator: LogicalOperator::Or,
            left: Box::new(left),
            right: Box::new(right),
            position,
        });
    }

    Ok(left)
}

fn parse_and(tokens: &mut Tokens) -> ParseResult<Condition<()>> {
    let mut left = parse_cond_factor(tokens)?;

    while tokens.eat(TokenKind::And) {
        let right = parse_cond_factor(tokens)?;
        let position = left.position().merge(&right.position());
        left = Condition::Logical(LogicalCondition {
            operator: LogicalOperator::And,
            left: Box::new(left),
            right: Box::new(right),
            position,
        });
    }

    Ok(left)
}

fn parse_cond_factor(tokens: &mut Tokens) -> ParseResult<Condition<()>> {
    if tokens.peek_kind() == Some(TokenKind::Not) {
        let position = tokens.span();
        tokens.next();
        let inner = parse_cond_factor(tokens)?;
        let position = position.merge(&inner.position());
        return Ok(Condition::Not(NotCondition {
            inner: Box::new(inner),
            position,
        }));
    }

    // A '(' may open a nested condition or the left expression of a
    // comparison; try the condition reading first and backtrack.
    if tokens.peek_kind() == Some(TokenKind::LParen) {
        let checkpoint = tokens.index();
        tokens.next();
        if let Ok(inner) = Condition::parse(tokens) {
            if tokens.eat(TokenKind::RParen) {
                return Ok(inner);
            }
        }
        tokens.set_index(checkpoint);
    }

    parse_comparison(tokens)
}

fn parse_comparison(tokens: &mut Tokens) -> ParseResult<Condition<()>> {
    let left = Expression::parse(tokens)?;

    let operator = match tokens.peek_kind() {
        Some(TokenKind::Equal) => ComparisonOperator::Equal,
        Some(TokenKind::Hash) => ComparisonOperator::NotEqual,
        Some(TokenKind::Less) => ComparisonOperator::Less,
        Some(TokenKind::LessEqual) => ComparisonOperator::LessEqual,
        Some(TokenKind::Greater) => ComparisonOperator::Greater,
        Some(TokenKind::GreaterEqual) => ComparisonOperator::GreaterEqual,
        _ => {
            return Err(ParseError::new(
                "expected a comparison operator",
                tokens.span(),
            ))
        }
    };
    tokens.next();

    let right = Expression::parse(tokens)?;
    let position = left.position().merge(&right.position());
    Ok(Condition::Comparison(Comparison {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        position,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_condition(input: &str) -> ParseResult<Condition<()>> {
        let mut tokens = Tokens::new(Lexer::new(input).lex().unwrap());
        Condition::parse(&mut tokens)
    }

    #[test]
    fn test_comparison() {
        let condition = parse_condition("x # 0").unwrap();
        assert!(matches!(
            condition,
            Condition::Comparison(Comparison {
                operator: ComparisonOperator::NotEqual,
                ..
            })
        ));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let condition = parse_condition("a = 1 or b = 2 and c = 3").unwrap();
        let Condition::Logical(LogicalCondition {
            operator, right, ..
        }) = condition
        else {
            panic!("expected logical condition");
        };
        assert_eq!(operator, LogicalOperator::Or);
        assert!(matches!(
            *right,
            Condition::Logical(LogicalCondition {
                operator: LogicalOperator::And,
                ..
            })
        ));
    }

    #[test]
    fn test_parenthesised_condition() {
        let condition = parse_condition("(a = 1 or b = 2) and c = 3").unwrap();
        let Condition::Logical(LogicalCondition { operator, left, .. }) = condition else {
            panic!("expected logical condition");
        };
        assert_eq!(operator, LogicalOperator::And);
        assert!(matches!(
            *left,
            Condition::Logical(LogicalCondition {
                operator: LogicalOperator::Or,
                ..
            })
        ));
    }

    #[test]
    fn test_parenthesised_expression_operand() {
        // here the '(' belongs to the expression, not the condition
        let condition = parse_condition("(x + 1) < 2").unwrap();
        assert!(matches!(
            condition,
            Condition::Comparison(Comparison {
                operator: ComparisonOperator::Less,
                ..
            })
        ));
    }

    #[test]
    fn test_not() {
        let condition = parse_condition("not x = 1 and y = 2").unwrap();
        let Condition::Logical(LogicalCondition { operator, left, .. }) = condition else {
            panic!("expected logical condition");
        };
        assert_eq!(operator, LogicalOperator::And);
        assert!(matches!(*left, Condition::Not(_)));
    }
}
