//! The lexically scoped symbol table.
//!
//! A stack of scopes, one per function (plus the global scope holding the
//! runtime library and the top-level function). Each scope keeps its
//! entries in insertion order next to a fast lookup index, and assigns
//! frame offsets as parameters and locals are inserted. Entries are
//! identity-stable `Rc<RefCell<_>>` references so that a later definition
//! can flip a declared function's status in place.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    error::CompilerError,
    lexer::Span,
    parser::ast::{DataType, PassMode, ScalarKind},
};

use super::error::{SemanticError, SymbolTableError};

pub type EntityRef = Rc<RefCell<Entity>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionStatus {
    Declared,
    Defined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableEntity {
    pub id: String,
    pub data_type: DataType,
    pub frame_offset: usize,
    pub parent_path: Vec<String>,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterEntity {
    pub id: String,
    pub data_type: DataType,
    pub mode: PassMode,
    pub frame_offset: usize,
    pub parent_path: Vec<String>,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntity {
    pub id: String,
    pub params: Vec<(PassMode, DataType)>,
    pub return_kind: ScalarKind,
    pub status: FunctionStatus,
    pub parent_path: Vec<String>,
    pub position: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Variable(VariableEntity),
    Parameter(ParameterEntity),
    Function(FunctionEntity),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Variable(v) => &v.id,
            Entity::Parameter(p) => &p.id,
            Entity::Function(f) => &f.id,
        }
    }

    pub fn parent_path(&self) -> &[String] {
        match self {
            Entity::Variable(v) => &v.parent_path,
            Entity::Parameter(p) => &p.parent_path,
            Entity::Function(f) => &f.parent_path,
        }
    }
}

struct Scope {
    entries: Vec<(String, EntityRef)>,
    index: HashMap<String, EntityRef>,
    offset_counter: usize,
    return_kind: Option<ScalarKind>,
}

impl Scope {
    fn new(offset_counter: usize, return_kind: Option<ScalarKind>) -> Self {
        Self {
            entries: vec![],
            index: HashMap::new(),
            offset_counter,
            return_kind,
        }
    }
}

pub struct SymbolTable {
    scopes: Vec<Scope>,
    parent_path: Vec<String>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A fresh table containing only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(0, None)],
            parent_path: vec![],
        }
    }

    /// The chain of enclosing function ids at the current point, innermost
    /// first. Its length is the current nesting depth.
    pub fn parent_path(&self) -> &[String] {
        &self.parent_path
    }

    /// The return kind of the innermost open function scope.
    pub fn current_return_kind(&self) -> Option<ScalarKind> {
        self.scopes.last().and_then(|scope| scope.return_kind)
    }

    /// Push the scope of a function header. The frame offset counter
    /// starts at 1 for nested functions, whose frame slot 0 holds the
    /// static link; the top-level function has no link and starts at 0.
    pub fn open_scope(&mut self, function_id: &str, return_kind: ScalarKind) {
        let first_offset = usize::from(!self.parent_path.is_empty());
        self.scopes
            .push(Scope::new(first_offset, Some(return_kind)));
        self.parent_path.insert(0, function_id.to_string());
    }

    /// Pop the innermost scope. Fails if any function declared in it never
    /// received a definition, or if only the global scope is left.
    pub fn close_scope(&mut self, position: Span) -> Result<(), CompilerError> {
        if self.scopes.len() <= 1 {
            return Err(SymbolTableError::new(
                "attempted to close the global scope",
                position,
            )
            .into());
        }

        let scope = self.scopes.last().unwrap();
        for (id, entity) in &scope.entries {
            if let Entity::Function(function) = &*entity.borrow() {
                if function.status == FunctionStatus::Declared {
                    return Err(SemanticError::new(
                        format!("function '{id}' declared but not defined"),
                        function.position.clone(),
                    )
                    .into());
                }
            }
        }

        self.scopes.pop();
        self.parent_path.remove(0);
        Ok(())
    }

    /// Insert an entity into the current scope, assigning its frame offset
    /// and parent path. Fails on a second entity with the same id in the
    /// same scope.
    pub fn insert(
        &mut self,
        position: Span,
        id: &str,
        mut entity: Entity,
    ) -> Result<EntityRef, SemanticError> {
        let scope = self.scopes.last_mut().unwrap();
        if scope.index.contains_key(id) {
            return Err(SemanticError::new(
                format!("redefinition of '{id}'"),
                position,
            ));
        }

        match &mut entity {
            Entity::Variable(variable) => {
                variable.frame_offset = scope.offset_counter;
                variable.parent_path = self.parent_path.clone();
                scope.offset_counter += 1;
            }
            Entity::Parameter(parameter) => {
                parameter.frame_offset = scope.offset_counter;
                parameter.parent_path = self.parent_path.clone();
                scope.offset_counter += 1;
            }
            Entity::Function(function) => {
                function.parent_path = self.parent_path.clone();
            }
        }

        let entity = Rc::new(RefCell::new(entity));
        scope.entries.push((id.to_string(), Rc::clone(&entity)));
        scope.index.insert(id.to_string(), Rc::clone(&entity));
        Ok(entity)
    }

    /// Look up an id in the current scope only; used to detect
    /// redefinitions and to pair definitions with prior declarations.
    pub fn lookup(&self, id: &str) -> Option<EntityRef> {
        self.scopes
            .last()
            .and_then(|scope| scope.index.get(id))
            .cloned()
    }

    /// Resolve a use by walking the scopes from innermost to outermost.
    pub fn lookup_all(&self, id: &str) -> Option<EntityRef> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.index.get(id))
            .cloned()
    }

    /// Validate the table after the program's scope has been closed: only
    /// the global scope may remain, and it may hold nothing but defined
    /// functions (the runtime library and the top-level function).
    pub fn verify_final(&self) -> Result<(), SymbolTableError> {
        if self.scopes.len() != 1 {
            return Err(SymbolTableError::new(
                format!("{} scopes still open at program end", self.scopes.len() - 1),
                Span::default(),
            ));
        }

        for (id, entity) in &self.scopes[0].entries {
            match &*entity.borrow() {
                Entity::Variable(variable) => {
                    return Err(SymbolTableError::new(
                        format!("variable '{id}' lingers after program end"),
                        variable.position.clone(),
                    ))
                }
                Entity::Parameter(parameter) => {
                    return Err(SymbolTableError::new(
                        format!("parameter '{id}' lingers after program end"),
                        parameter.position.clone(),
                    ))
                }
                Entity::Function(function) => {
                    if function.status != FunctionStatus::Defined {
                        return Err(SymbolTableError::new(
                            format!("function '{id}' declared but never defined"),
                            function.position.clone(),
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(id: &str) -> Entity {
        Entity::Variable(VariableEntity {
            id: id.to_string(),
            data_type: DataType::Scalar(ScalarKind::Int),
            frame_offset: 0,
            parent_path: vec![],
            position: Span::default(),
        })
    }

    fn function(id: &str, status: FunctionStatus) -> Entity {
        Entity::Function(FunctionEntity {
            id: id.to_string(),
            params: vec![],
            return_kind: ScalarKind::Nothing,
            status,
            parent_path: vec![],
            position: Span::default(),
        })
    }

    #[test]
    fn test_offsets_start_after_static_link() {
        let mut table = SymbolTable::new();
        table.open_scope("main", ScalarKind::Nothing);
        // top-level frame has no static link
        let a = table.insert(Span::default(), "a", variable("a")).unwrap();
        assert!(matches!(
            &*a.borrow(),
            Entity::Variable(VariableEntity { frame_offset: 0, .. })
        ));

        table.open_scope("f", ScalarKind::Nothing);
        // nested frame reserves slot 0 for the static link
        let b = table.insert(Span::default(), "b", variable("b")).unwrap();
        assert!(matches!(
            &*b.borrow(),
            Entity::Variable(VariableEntity { frame_offset: 1, .. })
        ));
    }

    #[test]
    fn test_parent_path_innermost_first() {
        let mut table = SymbolTable::new();
        table.open_scope("main", ScalarKind::Nothing);
        table.open_scope("f", ScalarKind::Nothing);
        let entity = table.insert(Span::default(), "i", variable("i")).unwrap();
        assert_eq!(
            entity.borrow().parent_path(),
            &["f".to_string(), "main".to_string()]
        );
    }

    #[test]
    fn test_redefinition_rejected() {
        let mut table = SymbolTable::new();
        table.open_scope("main", ScalarKind::Nothing);
        table.insert(Span::default(), "x", variable("x")).unwrap();
        assert!(table.insert(Span::default(), "x", variable("x")).is_err());
    }

    #[test]
    fn test_lookup_all_walks_outward() {
        let mut table = SymbolTable::new();
        table.open_scope("main", ScalarKind::Nothing);
        table.insert(Span::default(), "x", variable("x")).unwrap();
        table.open_scope("f", ScalarKind::Nothing);
        assert!(table.lookup("x").is_none());
        assert!(table.lookup_all("x").is_some());
    }

    #[test]
    fn test_close_scope_rejects_undefined_declaration() {
        let mut table = SymbolTable::new();
        table.open_scope("main", ScalarKind::Nothing);
        table
            .insert(
                Span::default(),
                "g",
                function("g", FunctionStatus::Declared),
            )
            .unwrap();
        assert!(table.close_scope(Span::default()).is_err());
    }

    #[test]
    fn test_close_global_scope_is_an_error() {
        let mut table = SymbolTable::new();
        assert!(table.close_scope(Span::default()).is_err());
    }

    #[test]
    fn test_verify_final_accepts_defined_functions_only() {
        let mut table = SymbolTable::new();
        table
            .insert(
                Span::default(),
                "main",
                function("main", FunctionStatus::Defined),
            )
            .unwrap();
        assert!(table.verify_final().is_ok());

        table.insert(Span::default(), "x", variable("x")).unwrap();
        assert!(table.verify_final().is_err());
    }

    #[test]
    fn test_status_mutation_through_shared_reference() {
        let mut table = SymbolTable::new();
        let entity = table
            .insert(
                Span::default(),
                "f",
                function("f", FunctionStatus::Declared),
            )
            .unwrap();

        if let Entity::Function(function) = &mut *entity.borrow_mut() {
            function.status = FunctionStatus::Defined;
        }

        let Some(resolved) = table.lookup_all("f") else {
            panic!("expected entry");
        };
        assert!(matches!(
            &*resolved.borrow(),
            Entity::Function(FunctionEntity {
                status: FunctionStatus::Defined,
                ..
            })
        ));
    }
}
