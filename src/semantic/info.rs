//! Annotations written into the AST by the semantic analyzer.
//!
//! The parser produces `Ast<()>`; the analyzer rewrites it into
//! `Ast<SemInfo>`. Codegen reads these annotations and never consults the
//! symbol table again.

use crate::parser::ast::{DataType, PassMode, ScalarKind};

/// Resolved information for a variable or parameter use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessInfo {
    pub data_type: DataType,
    /// Index of the entity's slot within its function's frame record.
    pub frame_offset: usize,
    /// Parent path of the defining entity, innermost first. Its length
    /// relative to the use site's path length gives the static-link hops.
    pub parent_path: Vec<String>,
    pub mode: PassMode,
    pub is_parameter: bool,
}

/// Resolved information for a call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    pub return_kind: ScalarKind,
    /// Parent path of the callee function (not including its own id).
    pub callee_path: Vec<String>,
    /// Parent path at the call site, including the calling function.
    pub caller_path: Vec<String>,
    /// Each argument zipped with its parameter's mode and declared type.
    pub params: Vec<(PassMode, DataType)>,
}

/// Frame-slot assignment of a variable or parameter definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefInfo {
    pub frame_offset: usize,
    pub parent_path: Vec<String>,
}

/// Placement of a function definition or declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncInfo {
    pub parent_path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemInfo {
    /// An expression's resolved type.
    Typed(DataType),
    /// A variable or parameter use.
    Access(AccessInfo),
    /// A call site.
    Call(CallInfo),
    /// A variable or parameter definition.
    Def(DefInfo),
    /// A function definition or declaration.
    Func(FuncInfo),
    /// Nodes that need no annotation.
    None,
}

impl SemInfo {
    pub fn as_access(&self) -> Option<&AccessInfo> {
        match self {
            SemInfo::Access(access) => Some(access),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CallInfo> {
        match self {
            SemInfo::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_typed(&self) -> Option<&DataType> {
        match self {
            SemInfo::Typed(data_type) => Some(data_type),
            _ => None,
        }
    }
}

/// Qualified lowered name of a function: its full path (own id innermost)
/// joined outermost-first with `.` separators.
pub fn qualified_name(path: &[String]) -> String {
    path.iter()
        .rev()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(".")
}
