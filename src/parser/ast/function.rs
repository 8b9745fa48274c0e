//! Function definitions, declarations, parameters and local variables.
//!
//! A Grace program is a single top-level function definition; everything
//! else nests inside it as local definitions.

use crate::{
    lexer::{GetPosition, Span, Token, TokenKind},
    parser::{FromTokens, ParseError, ParseResult, Tokens},
};

use super::{Block, DataType, PassMode, ScalarKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub position: Span,
}

impl FromTokens for Identifier {
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        match tokens.next() {
            Some(Token::Id { value, position }) => Ok(Identifier {
                name: value,
                position,
            }),
            Some(token) => Err(ParseError::new(
                format!("expected an identifier but found {}", token.kind()),
                token.position(),
            )),
            None => Err(ParseError::eof("an identifier")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param<T> {
    pub id: Identifier,
    pub mode: PassMode,
    pub data_type: DataType,
    pub info: T,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionHeader<T> {
    pub id: Identifier,
    pub params: Vec<Param<T>>,
    pub return_kind: ScalarKind,
    pub position: Span,
}

impl<T> FunctionHeader<T> {
    /// The part of the header that a declaration and its definition must
    /// agree on: return kind, parameter count, and each parameter's mode
    /// and type.
    pub fn signature(&self) -> (ScalarKind, Vec<(PassMode, DataType)>) {
        (
            self.return_kind,
            self.params
                .iter()
                .map(|param| (param.mode, param.data_type.clone()))
                .collect(),
        )
    }
}

/// A function declaration: a header terminated by `;`, promising a
/// definition later in the same scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl<T> {
    pub header: FunctionHeader<T>,
    pub info: T,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef<T> {
    pub header: FunctionHeader<T>,
    pub locals: Vec<LocalDef<T>>,
    pub body: Block<T>,
    pub info: T,
    pub position: Span,
}

/// One `var` binding. A `var x, y : int;` group is flattened into one
/// node per name, in textual order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDef<T> {
    pub id: Identifier,
    pub data_type: DataType,
    pub info: T,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalDef<T> {
    Function(FunctionDef<T>),
    Declaration(FunctionDecl<T>),
    Variable(VariableDef<T>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program<T> {
    pub main: FunctionDef<T>,
}

impl FromTokens for FunctionHeader<()> {
    /// `fun` id `(` parameter-groups? `)` `:` return-type
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        let position = tokens.span();
        tokens.expect(TokenKind::Fun)?;
        let id = Identifier::parse(tokens)?;

        tokens.expect(TokenKind::LParen)?;
        let mut params = vec![];
        if !tokens.eat(TokenKind::RParen) {
            loop {
                parse_param_group(tokens, &mut params)?;
                if tokens.eat(TokenKind::Semicolon) {
                    continue;
                }
                tokens.expect(TokenKind::RParen)?;
                break;
            }
        }

        tokens.expect(TokenKind::Colon)?;
        let return_kind = ScalarKind::parse(tokens)?;
        let end = tokens.span();

        Ok(FunctionHeader {
            id,
            params,
            return_kind,
            position: position.merge(&end),
        })
    }
}

/// One semicolon-separated group: `[ref] a, b : type`, flattened into one
/// [`Param`] per name.
fn parse_param_group(tokens: &mut Tokens, params: &mut Vec<Param<()>>) -> ParseResult<()> {
    let mode = if tokens.eat(TokenKind::Ref) {
        PassMode::ByReference
    } else {
        PassMode::ByValue
    };

    let mut ids = vec![Identifier::parse(tokens)?];
    while tokens.eat(TokenKind::Comma) {
        ids.push(Identifier::parse(tokens)?);
    }

    tokens.expect(TokenKind::Colon)?;
    let data_type = DataType::parse(tokens)?;

    for id in ids {
        let position = id.position.clone();
        params.push(Param {
            id,
            mode,
            data_type: data_type.clone(),
            info: (),
            position,
        });
    }
    Ok(())
}

impl FromTokens for FunctionDef<()> {
    /// header, then local definitions in textual order, then the body block.
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        let header = FunctionHeader::parse(tokens)?;
        Self::parse_with_header(header, tokens)
    }
}

impl FunctionDef<()> {
    fn parse_with_header(header: FunctionHeader<()>, tokens: &mut Tokens) -> ParseResult<Self> {
        let mut locals = vec![];

        loop {
            match tokens.peek_kind() {
                Some(TokenKind::Var) => parse_var_group(tokens, &mut locals)?,
                Some(TokenKind::Fun) => {
                    let nested_header = FunctionHeader::parse(tokens)?;
                    if tokens.eat(TokenKind::Semicolon) {
                        let position = nested_header.position.clone();
                        locals.push(LocalDef::Declaration(FunctionDecl {
                            header: nested_header,
                            info: (),
                            position,
                        }));
                    } else {
                        locals.push(LocalDef::Function(FunctionDef::parse_with_header(
                            nested_header,
                            tokens,
                        )?));
                    }
                }
                Some(TokenKind::LBrace) => break,
                Some(_) => {
                    let token = tokens.peek().unwrap();
                    return Err(ParseError::new(
                        format!(
                            "expected a local definition or a block but found {}",
                            token.kind()
                        ),
                        token.position(),
                    ));
                }
                None => return Err(ParseError::eof("a local definition or a block")),
            }
        }

        let body = Block::parse(tokens)?;
        let position = header.position.merge(&body.position);

        Ok(FunctionDef {
            header,
            locals,
            body,
            info: (),
            position,
        })
    }
}

/// `var` id-list `:` type `;`
fn parse_var_group(tokens: &mut Tokens, locals: &mut Vec<LocalDef<()>>) -> ParseResult<()> {
    tokens.expect(TokenKind::Var)?;

    let mut ids = vec![Identifier::parse(tokens)?];
    while tokens.eat(TokenKind::Comma) {
        ids.push(Identifier::parse(tokens)?);
    }

    tokens.expect(TokenKind::Colon)?;
    let data_type = DataType::parse(tokens)?;
    tokens.expect(TokenKind::Semicolon)?;

    for id in ids {
        let position = id.position.clone();
        locals.push(LocalDef::Variable(VariableDef {
            id,
            data_type: data_type.clone(),
            info: (),
            position,
        }));
    }
    Ok(())
}

impl FromTokens for Program<()> {
    fn parse(tokens: &mut Tokens) -> ParseResult<Self> {
        Ok(Program {
            main: FunctionDef::parse(tokens)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_def(input: &str) -> ParseResult<FunctionDef<()>> {
        let mut tokens = Tokens::new(Lexer::new(input).lex().unwrap());
        FunctionDef::parse(&mut tokens)
    }

    #[test]
    fn test_minimal_main() {
        let def = parse_def("fun main(): nothing {}").unwrap();
        assert_eq!(def.header.id.name, "main");
        assert!(def.header.params.is_empty());
        assert_eq!(def.header.return_kind, ScalarKind::Nothing);
    }

    #[test]
    fn test_param_groups_flatten() {
        let def = parse_def("fun f(a, b: int; ref c: char): int { return a; }").unwrap();
        let params = &def.header.params;
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].mode, PassMode::ByValue);
        assert_eq!(params[1].id.name, "b");
        assert_eq!(params[2].mode, PassMode::ByReference);
    }

    #[test]
    fn test_var_group_flattens() {
        let def = parse_def("fun f(): nothing var i, j: int; var c: char; {}").unwrap();
        assert_eq!(def.locals.len(), 3);
        assert!(def
            .locals
            .iter()
            .all(|local| matches!(local, LocalDef::Variable(_))));
    }

    #[test]
    fn test_nested_function_and_declaration() {
        let def = parse_def(
            "fun f(): nothing \
                 fun g(x: int): int; \
                 fun h(): nothing {} \
             { h(); }",
        )
        .unwrap();
        assert_eq!(def.locals.len(), 2);
        assert!(matches!(def.locals[0], LocalDef::Declaration(_)));
        assert!(matches!(def.locals[1], LocalDef::Function(_)));
    }

    #[test]
    fn test_open_array_parameter() {
        let def = parse_def("fun len(ref s: char[]): int { return 0; }").unwrap();
        assert!(def.header.params[0].data_type.has_unspecified_leading());
    }

    #[test]
    fn test_signature_comparison() {
        let a = parse_def("fun f(x: int): int { return x; }").unwrap();
        let b = parse_def("fun f(y: int): int { return y; }").unwrap();
        let c = parse_def("fun f(x: int): char { return 'a'; }").unwrap();
        // parameter names do not matter, return kinds do
        assert_eq!(a.header.signature(), b.header.signature());
        assert_ne!(a.header.signature(), c.header.signature());
    }
}
