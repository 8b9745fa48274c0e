//! Statement nodes. The dangling `else` binds to the innermost open `if`
//! simply because `If::parse` greedily consumes it.

use crate::{
    lexer::{GetPosition, Span, Token, TokenKind},
    parser::{FromTokens, ParseError, ParseResult, Tokens},
};

use super::{Condition, Expression, FunctionCall, Identifier, Lvalue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<T> {
    Empty(Span),
    Assignment(Assignment<T>),
    Block(Block<T>),
    Call(FunctionCall<T>),
    If(If<T>),
    While(While<T>),
    Return(Return<T>),
}

impl<T> Statement<T> {
    pub fn position(&self) -> Span {
        match self {
            Statement::Empty(position) => position.clone(),
            Statement::Assignment(Assignment { position, .. })
            | Statement::Block(Block { position, .. })
            | Statement::Call(FunctionCall { position, .. })
            | Statement::If(If { position, .. })
            | Statement::While(While { position, .. })
            | Statement::Return(Return { position, .. }) => position.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment<T> {
    pub target: Lvalue<T>,
    pub value: Expression<T>,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<T> {
    pub statements: Vec<Statement<T>>,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If<T> {
    pub condition: Condition<T>,
    pub then_branch: Box<Statement<T>>,
    pub else_branch: Option<Box<Statement<T>>>,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct While<T> {
    pub condition: Condition<T>,
    pub body: Box<Statement<T>>,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Return<T> {
    pub value: Option<Expression<T>>,
    pub position: Span,
}

impl FromTokens for Statement<()> {
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        match tokens.peek() {
            Some(Token::Semicolon { position }) => {
                let position = position.clone();
                tokens.next();
                Ok(Statement::Empty(position))
            }
            Some(Token::LBrace { .. }) => Ok(Statement::Block(Block::parse(tokens)?)),
            Some(Token::If { .. }) => {
                let position = tokens.span();
                tokens.next();
                let condition = Condition::parse(tokens)?;
                tokens.expect(TokenKind::Then)?;
                let then_branch = Box::new(Statement::parse(tokens)?);
                let else_branch = if tokens.eat(TokenKind::Else) {
                    Some(Box::new(Statement::parse(tokens)?))
                } else {
                    None
                };
                let end = match &else_branch {
                    Some(branch) => branch.position(),
                    None => then_branch.position(),
                };
                Ok(Statement::If(If {
                    condition,
                    then_branch,
                    else_branch,
                    position: position.merge(&end),
                }))
            }
            Some(Token::While { .. }) => {
                let position = tokens.span();
                tokens.next();
                let condition = Condition::parse(tokens)?;
                tokens.expect(TokenKind::Do)?;
                let body = Box::new(Statement::parse(tokens)?);
                let position = position.merge(&body.position());
                Ok(Statement::While(While {
                    condition,
                    body,
                    position,
                }))
            }
            Some(Token::Return { .. }) => {
                let position = tokens.span();
                tokens.next();
                let value = if tokens.peek_kind() == Some(TokenKind::Semicolon) {
                    None
                } else {
                    Some(Expression::parse(tokens)?)
                };
                let end = tokens.span();
                tokens.expect(TokenKind::Semicolon)?;
                Ok(Statement::Return(Return {
                    value,
                    position: position.merge(&end),
                }))
            }
            Some(Token::Id { .. }) => {
                if tokens.peek_nth(1).map(Token::kind) == Some(TokenKind::LParen) {
                    let id = Identifier::parse(tokens)?;
                    let call = FunctionCall::parse_with_id(id, tokens)?;
                    tokens.expect(TokenKind::Semicolon)?;
                    Ok(Statement::Call(call))
                } else {
                    parse_assignment(tokens)
                }
            }
            // the grammar allows a string literal as an assignment target;
            // rejecting it is the semantic analyzer's job
            Some(Token::StringLiteral { .. }) => parse_assignment(tokens),
            Some(token) => Err(ParseError::new(
                format!("expected a statement but found {}", token.kind()),
                token.position(),
            )),
            None => Err(ParseError::eof("a statement")),
        }
    }
}

fn parse_assignment(tokens: &mut Tokens) -> ParseResult<Statement<()>> {
    let target = Lvalue::parse(tokens)?;
    tokens.expect(TokenKind::Assign)?;
    let value = Expression::parse(tokens)?;
    tokens.expect(TokenKind::Semicolon)?;

    let position = target.position().merge(&value.position());
    Ok(Statement::Assignment(Assignment {
        target,
        value,
        position,
    }))
}

impl FromTokens for Block<()> {
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        let position = tokens.span();
        tokens.expect(TokenKind::LBrace)?;

        let mut statements = vec![];
        while tokens.peek_kind() != Some(TokenKind::RBrace) {
            if tokens.peek().is_none() {
                return Err(ParseError::eof("'}'"));
            }
            statements.push(Statement::parse(tokens)?);
        }

        let end = tokens.span();
        tokens.expect(TokenKind::RBrace)?;
        Ok(Block {
            statements,
            position: position.merge(&end),
        })
    }
}
