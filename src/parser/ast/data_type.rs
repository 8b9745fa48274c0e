//! The Grace data types as they appear in declarations.

use std::fmt::Display;

use crate::{
    lexer::{GetPosition, Token, TokenKind},
    parser::{FromTokens, ParseError, ParseResult, Tokens},
};

/// The scalar kinds of Grace. `Nothing` may only appear as a function
/// return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    Char,
    Nothing,
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarKind::Int => f.write_str("int"),
            ScalarKind::Char => f.write_str("char"),
            ScalarKind::Nothing => f.write_str("nothing"),
        }
    }
}

/// One array dimension: an explicit bound, or `[]` which is only legal as
/// the leading dimension of a by-reference array parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Unspecified,
    Fixed(i64),
}

/// How a parameter receives its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    ByValue,
    ByReference,
}

/// A declared type: a scalar, or an array of a scalar with one dimension
/// per bracket group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Scalar(ScalarKind),
    Array {
        element: ScalarKind,
        dims: Vec<Dimension>,
    },
}

impl DataType {
    pub fn char_array(len: i64) -> Self {
        DataType::Array {
            element: ScalarKind::Char,
            dims: vec![Dimension::Fixed(len)],
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, DataType::Array { .. })
    }

    pub fn element(&self) -> ScalarKind {
        match self {
            DataType::Scalar(kind) => *kind,
            DataType::Array { element, .. } => *element,
        }
    }

    pub fn dims(&self) -> &[Dimension] {
        match self {
            DataType::Scalar(_) => &[],
            DataType::Array { dims, .. } => dims,
        }
    }

    /// Whether the leading dimension is the `[]` of an open array parameter.
    pub fn has_unspecified_leading(&self) -> bool {
        matches!(self.dims().first(), Some(Dimension::Unspecified))
    }

    /// The type remaining after stripping the leading dimension: the
    /// sub-array, or the element scalar for one-dimensional arrays.
    pub fn strip_leading(&self) -> DataType {
        match self {
            DataType::Scalar(kind) => DataType::Scalar(*kind),
            DataType::Array { element, dims } => {
                if dims.len() <= 1 {
                    DataType::Scalar(*element)
                } else {
                    DataType::Array {
                        element: *element,
                        dims: dims[1..].to_vec(),
                    }
                }
            }
        }
    }

    /// The type of an access with `count` index expressions applied.
    pub fn after_indexing(&self, count: usize) -> DataType {
        match self {
            DataType::Scalar(kind) => DataType::Scalar(*kind),
            DataType::Array { element, dims } => {
                if count >= dims.len() {
                    DataType::Scalar(*element)
                } else {
                    DataType::Array {
                        element: *element,
                        dims: dims[count..].to_vec(),
                    }
                }
            }
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Scalar(kind) => write!(f, "{kind}"),
            DataType::Array { element, dims } => {
                write!(f, "{element}")?;
                for dim in dims {
                    match dim {
                        Dimension::Unspecified => write!(f, "[]")?,
                        Dimension::Fixed(bound) => write!(f, "[{bound}]")?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl FromTokens for DataType {
    /// `int` or `char`, followed by zero or more `[bound]` / `[]` groups.
    /// Placement rules for `[]` are enforced by the semantic analyzer, not
    /// by the grammar.
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        let element = match tokens.next() {
            Some(Token::IntKeyword { .. }) => ScalarKind::Int,
            Some(Token::CharKeyword { .. }) => ScalarKind::Char,
            Some(token) => {
                return Err(ParseError::new(
                    format!("expected a type but found {}", token.kind()),
                    token.position(),
                ))
            }
            None => return Err(ParseError::eof("a type")),
        };

        let mut dims = vec![];
        while tokens.eat(TokenKind::LBracket) {
            if tokens.eat(TokenKind::RBracket) {
                dims.push(Dimension::Unspecified);
                continue;
            }
            match tokens.next() {
                Some(Token::IntLiteral { value, .. }) => {
                    dims.push(Dimension::Fixed(value));
                    tokens.expect(TokenKind::RBracket)?;
                }
                Some(token) => {
                    return Err(ParseError::new(
                        format!("expected an array bound but found {}", token.kind()),
                        token.position(),
                    ))
                }
                None => return Err(ParseError::eof("an array bound")),
            }
        }

        if dims.is_empty() {
            Ok(DataType::Scalar(element))
        } else {
            Ok(DataType::Array { element, dims })
        }
    }
}

impl FromTokens for ScalarKind {
    /// A return type: `int`, `char` or `nothing`.
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        match tokens.next() {
            Some(Token::IntKeyword { .. }) => Ok(ScalarKind::Int),
            Some(Token::CharKeyword { .. }) => Ok(ScalarKind::Char),
            Some(Token::NothingKeyword { .. }) => Ok(ScalarKind::Nothing),
            Some(token) => Err(ParseError::new(
                format!("expected a return type but found {}", token.kind()),
                token.position(),
            )),
            None => Err(ParseError::eof("a return type")),
        }
    }
}
