//! The Grace abstract syntax tree.
//!
//! Every node is generic over an annotation parameter `T`: the parser
//! produces an `Ast<()>`, the semantic analyzer rewrites it into an
//! `Ast<SemInfo>` with resolved types, frame offsets and parent paths.

mod condition;
mod data_type;
mod expression;
mod function;
mod lvalue;
mod statement;

pub use self::condition::*;
pub use self::data_type::*;
pub use self::expression::*;
pub use self::function::*;
pub use self::lvalue::*;
pub use self::statement::*;
