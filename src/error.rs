//! The closed error taxonomy of the compiler.
//!
//! Every stage produces its own typed error; [`CompilerError`] wraps them
//! so the driver can abort on the first failure and print exactly one
//! diagnostic line.

use std::{error::Error, fmt::Display};

use crate::{
    codegen::CodegenError,
    lexer::{LexError, Span},
    parser::ParseError,
    semantic::{SemanticError, SymbolTableError},
};

/// A broken compiler invariant. Carries no source position; it should not
/// be reachable from any source program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Display for InternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl Error for InternalError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerError {
    Lex(LexError),
    Parse(ParseError),
    Semantic(SemanticError),
    SymbolTable(SymbolTableError),
    Codegen(CodegenError),
    Internal(InternalError),
}

impl CompilerError {
    fn kind(&self) -> &'static str {
        match self {
            CompilerError::Lex(_) => "Lexing error",
            CompilerError::Parse(_) => "Parser error",
            CompilerError::Semantic(_) => "Semantic error",
            CompilerError::SymbolTable(_) => "Symbol table error",
            CompilerError::Codegen(_) => "Codegen error",
            CompilerError::Internal(_) => "Internal compiler error",
        }
    }

    fn message(&self) -> &str {
        match self {
            CompilerError::Lex(e) => &e.message,
            CompilerError::Parse(e) => &e.message,
            CompilerError::Semantic(e) => &e.message,
            CompilerError::SymbolTable(e) => &e.message,
            CompilerError::Codegen(e) => &e.message,
            CompilerError::Internal(e) => &e.message,
        }
    }

    fn position(&self) -> Option<Span> {
        match self {
            CompilerError::Lex(e) => Some(e.position.clone()),
            CompilerError::Parse(e) => Some(e.position.clone()),
            CompilerError::Semantic(e) => Some(e.position.clone()),
            CompilerError::SymbolTable(e) => Some(e.position.clone()),
            CompilerError::Codegen(e) => Some(e.position.clone()),
            CompilerError::Internal(_) => None,
        }
    }

    /// The single diagnostic line the driver prints before exiting.
    pub fn render(&self, file: &str) -> String {
        match self.position() {
            Some(span) => format!(
                "{} at file: {}, line: {}, column: {}: {}",
                self.kind(),
                file,
                span.start.0,
                span.start.1,
                self.message()
            ),
            None => format!("{}: {}", self.kind(), self.message()),
        }
    }
}

impl Display for CompilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl Error for CompilerError {}

impl From<LexError> for CompilerError {
    fn from(error: LexError) -> Self {
        CompilerError::Lex(error)
    }
}

impl From<ParseError> for CompilerError {
    fn from(error: ParseError) -> Self {
        CompilerError::Parse(error)
    }
}

impl From<SemanticError> for CompilerError {
    fn from(error: SemanticError) -> Self {
        CompilerError::Semantic(error)
    }
}

impl From<SymbolTableError> for CompilerError {
    fn from(error: SymbolTableError) -> Self {
        CompilerError::SymbolTable(error)
    }
}

impl From<CodegenError> for CompilerError {
    fn from(error: CodegenError) -> Self {
        CompilerError::Codegen(error)
    }
}

impl From<InternalError> for CompilerError {
    fn from(error: InternalError) -> Self {
        CompilerError::Internal(error)
    }
}
