//! Semantic analysis for Grace.
//!
//! A single total pass over the parsed AST that checks every declaration,
//! resolves every name through the symbol table, infers expression types,
//! and writes the annotations codegen depends on (resolved types, frame
//! offsets, parent paths, call-site modes). The pass aborts on the first
//! violation; there is no recovery.

mod error;
mod info;
mod table;

pub use self::error::{SemanticError, SymbolTableError};
pub use self::info::{qualified_name, AccessInfo, CallInfo, DefInfo, FuncInfo, SemInfo};
pub use self::table::{
    Entity, EntityRef, FunctionEntity, FunctionStatus, ParameterEntity, SymbolTable,
    VariableEntity,
};

use crate::{
    error::{CompilerError, InternalError},
    parser::ast::{
        ArrayAccess, Assignment, BinaryExpression, Block, CharLiteral, Comparison, Condition,
        DataType, Dimension, Expression, FunctionCall, FunctionDecl, FunctionDef, FunctionHeader,
        If, IntLiteral, LocalDef, LogicalCondition, Lvalue, NotCondition, Param, PassMode,
        Program, Return, ScalarKind, Statement, StringLiteral, UnaryExpression, VariableDef,
        Variable, While,
    },
};

type SemResult<T> = Result<T, CompilerError>;

/// The fixed runtime library, declared into the outermost scope before the
/// program is analyzed and to the backend module before lowering.
/// Array-of-char parameters are by-reference with an unspecified leading
/// dimension.
pub fn runtime_catalog() -> Vec<(&'static str, Vec<(PassMode, DataType)>, ScalarKind)> {
    use DataType::Scalar;
    use PassMode::{ByReference, ByValue};
    use ScalarKind::{Char, Int, Nothing};

    let string = || DataType::Array {
        element: Char,
        dims: vec![Dimension::Unspecified],
    };

    vec![
        ("writeInteger", vec![(ByValue, Scalar(Int))], Nothing),
        ("writeChar", vec![(ByValue, Scalar(Char))], Nothing),
        ("writeString", vec![(ByReference, string())], Nothing),
        ("readInteger", vec![], Int),
        ("readChar", vec![], Char),
        (
            "readString",
            vec![(ByValue, Scalar(Int)), (ByReference, string())],
            Nothing,
        ),
        ("ascii", vec![(ByValue, Scalar(Char))], Int),
        ("chr", vec![(ByValue, Scalar(Int))], Char),
        ("strlen", vec![(ByReference, string())], Int),
        (
            "strcmp",
            vec![(ByReference, string()), (ByReference, string())],
            Int,
        ),
        (
            "strcpy",
            vec![(ByReference, string()), (ByReference, string())],
            Nothing,
        ),
        (
            "strcat",
            vec![(ByReference, string()), (ByReference, string())],
            Nothing,
        ),
    ]
}

/// Checks a parsed program and rewrites it with semantic annotations.
pub struct Analyzer {
    table: SymbolTable,
}

impl Analyzer {
    pub fn analyze(program: Program<()>) -> SemResult<Program<SemInfo>> {
        let mut analyzer = Self {
            table: SymbolTable::new(),
        };
        analyzer.declare_runtime()?;

        let main = analyzer.check_main(program.main)?;
        analyzer.table.verify_final()?;

        Ok(Program { main })
    }

    fn declare_runtime(&mut self) -> SemResult<()> {
        for (id, params, return_kind) in runtime_catalog() {
            self.table
                .insert(
                    Default::default(),
                    id,
                    Entity::Function(FunctionEntity {
                        id: id.to_string(),
                        params,
                        return_kind,
                        status: FunctionStatus::Defined,
                        parent_path: vec![],
                        position: Default::default(),
                    }),
                )
                .map_err(|error| {
                    CompilerError::Internal(InternalError::new(format!(
                        "runtime declaration failed: {error}"
                    )))
                })?;
        }
        Ok(())
    }

    /// The top-level function: no parameters, return type `nothing`.
    fn check_main(&mut self, main: FunctionDef<()>) -> SemResult<FunctionDef<SemInfo>> {
        if !main.header.params.is_empty() {
            return Err(SemanticError::new(
                "the top-level function must not take parameters",
                main.header.position.clone(),
            )
            .into());
        }
        if main.header.return_kind != ScalarKind::Nothing {
            return Err(SemanticError::new(
                format!(
                    "the top-level function must return nothing, not '{}'",
                    main.header.return_kind
                ),
                main.header.position.clone(),
            )
            .into());
        }

        self.check_function_def(main)
    }

    fn check_function_def(&mut self, def: FunctionDef<()>) -> SemResult<FunctionDef<SemInfo>> {
        for param in &def.header.params {
            self.check_param_declaration(param)?;
        }
        let (return_kind, signature) = def.header.signature();

        // pair the definition with a prior declaration in the same scope,
        // or insert it fresh
        let entity = match self.table.lookup(&def.header.id.name) {
            Some(existing) => {
                self.match_declaration(&existing, &def.header)?;
                existing
            }
            None => self
                .table
                .insert(
                    def.header.position.clone(),
                    &def.header.id.name,
                    Entity::Function(FunctionEntity {
                        id: def.header.id.name.clone(),
                        params: signature,
                        return_kind,
                        status: FunctionStatus::Defined,
                        parent_path: vec![],
                        position: def.header.position.clone(),
                    }),
                )
                .map_err(CompilerError::Semantic)?,
        };
        let parent_path = entity.borrow().parent_path().to_vec();

        self.table
            .open_scope(&def.header.id.name, def.header.return_kind);

        let mut params = vec![];
        for param in def.header.params {
            let inserted = self
                .table
                .insert(
                    param.position.clone(),
                    &param.id.name,
                    Entity::Parameter(ParameterEntity {
                        id: param.id.name.clone(),
                        data_type: param.data_type.clone(),
                        mode: param.mode,
                        frame_offset: 0,
                        parent_path: vec![],
                        position: param.position.clone(),
                    }),
                )
                .map_err(CompilerError::Semantic)?;

            let info = match &*inserted.borrow() {
                Entity::Parameter(parameter) => SemInfo::Def(DefInfo {
                    frame_offset: parameter.frame_offset,
                    parent_path: parameter.parent_path.clone(),
                }),
                _ => SemInfo::None,
            };
            params.push(Param {
                id: param.id,
                mode: param.mode,
                data_type: param.data_type,
                info,
                position: param.position,
            });
        }

        let mut locals = vec![];
        for local in def.locals {
            locals.push(self.check_local_def(local)?);
        }

        let body = self.check_block(def.body)?;
        self.table.close_scope(def.position.clone())?;

        Ok(FunctionDef {
            header: FunctionHeader {
                id: def.header.id,
                params,
                return_kind: def.header.return_kind,
                position: def.header.position,
            },
            locals,
            body,
            info: SemInfo::Func(FuncInfo { parent_path }),
            position: def.position,
        })
    }

    /// A definition whose id already names something in the current scope:
    /// legal only for a matching prior declaration.
    fn match_declaration(
        &self,
        existing: &EntityRef,
        header: &FunctionHeader<()>,
    ) -> SemResult<()> {
        let mut existing = existing.borrow_mut();
        let Entity::Function(function) = &mut *existing else {
            return Err(SemanticError::new(
                format!("redefinition of '{}'", header.id.name),
                header.position.clone(),
            )
            .into());
        };
        if function.status != FunctionStatus::Declared {
            return Err(SemanticError::new(
                format!("redefinition of function '{}'", header.id.name),
                header.position.clone(),
            )
            .into());
        }

        let (return_kind, params) = header.signature();
        if function.return_kind != return_kind {
            return Err(SemanticError::new(
                format!(
                    "definition of '{}' does not match its declaration: return type '{}' differs from declared '{}'",
                    header.id.name, return_kind, function.return_kind
                ),
                header.position.clone(),
            )
            .into());
        }
        if function.params != params {
            return Err(SemanticError::new(
                format!(
                    "definition of '{}' does not match its declaration: parameters differ",
                    header.id.name
                ),
                header.position.clone(),
            )
            .into());
        }

        function.status = FunctionStatus::Defined;
        Ok(())
    }

    fn check_param_declaration(&self, param: &Param<()>) -> SemResult<()> {
        if let DataType::Array { dims, .. } = &param.data_type {
            if param.mode != PassMode::ByReference {
                return Err(SemanticError::new(
                    format!(
                        "array parameter '{}' must be passed by reference",
                        param.id.name
                    ),
                    param.position.clone(),
                )
                .into());
            }
            for (i, dim) in dims.iter().enumerate() {
                match dim {
                    Dimension::Fixed(bound) => self.check_bound(*bound, &param.position)?,
                    Dimension::Unspecified if i == 0 => {}
                    Dimension::Unspecified => {
                        return Err(SemanticError::new(
                            format!(
                                "only the leading dimension of parameter '{}' may be unspecified",
                                param.id.name
                            ),
                            param.position.clone(),
                        )
                        .into())
                    }
                }
            }
        }
        Ok(())
    }

    fn check_bound(&self, bound: i64, position: &crate::lexer::Span) -> SemResult<()> {
        if bound <= 0 {
            return Err(SemanticError::new(
                format!("array bound must be positive, found {bound}"),
                position.clone(),
            )
            .into());
        }
        if bound > u32::MAX as i64 {
            return Err(SemanticError::new(
                format!("array bound {bound} out of range"),
                position.clone(),
            )
            .into());
        }
        Ok(())
    }

    fn check_local_def(&mut self, local: LocalDef<()>) -> SemResult<LocalDef<SemInfo>> {
        match local {
            LocalDef::Variable(variable) => {
                if let DataType::Array { dims, .. } = &variable.data_type {
                    for dim in dims {
                        match dim {
                            Dimension::Fixed(bound) => {
                                self.check_bound(*bound, &variable.position)?
                            }
                            Dimension::Unspecified => {
                                return Err(SemanticError::new(
                                    format!(
                                        "variable '{}' must have explicit array bounds",
                                        variable.id.name
                                    ),
                                    variable.position.clone(),
                                )
                                .into())
                            }
                        }
                    }
                }

                let inserted = self
                    .table
                    .insert(
                        variable.position.clone(),
                        &variable.id.name,
                        Entity::Variable(VariableEntity {
                            id: variable.id.name.clone(),
                            data_type: variable.data_type.clone(),
                            frame_offset: 0,
                            parent_path: vec![],
                            position: variable.position.clone(),
                        }),
                    )
                    .map_err(CompilerError::Semantic)?;

                let info = match &*inserted.borrow() {
                    Entity::Variable(entity) => SemInfo::Def(DefInfo {
                        frame_offset: entity.frame_offset,
                        parent_path: entity.parent_path.clone(),
                    }),
                    _ => SemInfo::None,
                };
                Ok(LocalDef::Variable(VariableDef {
                    id: variable.id,
                    data_type: variable.data_type,
                    info,
                    position: variable.position,
                }))
            }
            LocalDef::Declaration(declaration) => {
                for param in &declaration.header.params {
                    self.check_param_declaration(param)?;
                }
                let (return_kind, params) = declaration.header.signature();
                let inserted = self
                    .table
                    .insert(
                        declaration.header.position.clone(),
                        &declaration.header.id.name,
                        Entity::Function(FunctionEntity {
                            id: declaration.header.id.name.clone(),
                            params,
                            return_kind,
                            status: FunctionStatus::Declared,
                            parent_path: vec![],
                            position: declaration.header.position.clone(),
                        }),
                    )
                    .map_err(CompilerError::Semantic)?;
                let parent_path = inserted.borrow().parent_path().to_vec();

                let header = FunctionHeader {
                    id: declaration.header.id,
                    params: declaration
                        .header
                        .params
                        .into_iter()
                        .map(|param| Param {
                            id: param.id,
                            mode: param.mode,
                            data_type: param.data_type,
                            info: SemInfo::None,
                            position: param.position,
                        })
                        .collect(),
                    return_kind: declaration.header.return_kind,
                    position: declaration.header.position,
                };
                Ok(LocalDef::Declaration(FunctionDecl {
                    header,
                    info: SemInfo::Func(FuncInfo { parent_path }),
                    position: declaration.position,
                }))
            }
            LocalDef::Function(def) => Ok(LocalDef::Function(self.check_function_def(def)?)),
        }
    }

    fn check_block(&mut self, block: Block<()>) -> SemResult<Block<SemInfo>> {
        let mut statements = vec![];
        for statement in block.statements {
            statements.push(self.check_statement(statement)?);
        }
        Ok(Block {
            statements,
            position: block.position,
        })
    }

    fn check_statement(&mut self, statement: Statement<()>) -> SemResult<Statement<SemInfo>> {
        Ok(match statement {
            Statement::Empty(position) => Statement::Empty(position),
            Statement::Assignment(assignment) => {
                Statement::Assignment(self.check_assignment(assignment)?)
            }
            Statement::Block(block) => Statement::Block(self.check_block(block)?),
            Statement::Call(call) => Statement::Call(self.check_call(call)?.0),
            Statement::If(if_statement) => {
                let condition = self.check_condition(if_statement.condition)?;
                let then_branch = Box::new(self.check_statement(*if_statement.then_branch)?);
                let else_branch = match if_statement.else_branch {
                    Some(branch) => Some(Box::new(self.check_statement(*branch)?)),
                    None => None,
                };
                Statement::If(If {
                    condition,
                    then_branch,
                    else_branch,
                    position: if_statement.position,
                })
            }
            Statement::While(while_loop) => {
                let condition = self.check_condition(while_loop.condition)?;
                let body = Box::new(self.check_statement(*while_loop.body)?);
                Statement::While(While {
                    condition,
                    body,
                    position: while_loop.position,
                })
            }
            Statement::Return(ret) => Statement::Return(self.check_return(ret)?),
        })
    }

    fn check_assignment(&mut self, assignment: Assignment<()>) -> SemResult<Assignment<SemInfo>> {
        if assignment.target.is_string_literal() {
            return Err(SemanticError::new(
                "cannot assign to a string literal",
                assignment.target.position(),
            )
            .into());
        }

        let (target, target_type) = self.check_lvalue(assignment.target)?;
        if target_type.is_array() {
            return Err(SemanticError::new(
                "cannot assign to an array",
                target.position(),
            )
            .into());
        }

        let (value, value_type) = self.check_expression(assignment.value)?;
        if value_type != target_type {
            return Err(SemanticError::new(
                format!(
                    "cannot assign a value of type '{value_type}' to an l-value of type '{target_type}'"
                ),
                assignment.position.clone(),
            )
            .into());
        }

        Ok(Assignment {
            target,
            value,
            position: assignment.position,
        })
    }

    fn check_return(&mut self, ret: Return<()>) -> SemResult<Return<SemInfo>> {
        let Some(return_kind) = self.table.current_return_kind() else {
            return Err(
                InternalError::new("return statement outside of any function scope").into(),
            );
        };

        let value = match ret.value {
            None => {
                if return_kind != ScalarKind::Nothing {
                    return Err(SemanticError::new(
                        format!("return without a value in a function returning '{return_kind}'"),
                        ret.position.clone(),
                    )
                    .into());
                }
                None
            }
            Some(expression) => {
                let (expression, expression_type) = self.check_expression(expression)?;
                if return_kind == ScalarKind::Nothing {
                    // a bare return of a nothing-call is permitted; the call
                    // is still emitted for its effect
                    let is_nothing_call = matches!(expression, Expression::Call(_))
                        && expression_type == DataType::Scalar(ScalarKind::Nothing);
                    if !is_nothing_call {
                        return Err(SemanticError::new(
                            "a function returning nothing cannot return a value",
                            ret.position.clone(),
                        )
                        .into());
                    }
                } else if expression_type != DataType::Scalar(return_kind) {
                    return Err(SemanticError::new(
                        format!(
                            "return type mismatch: expected '{return_kind}', found '{expression_type}'"
                        ),
                        ret.position.clone(),
                    )
                    .into());
                }
                Some(expression)
            }
        };

        Ok(Return {
            value,
            position: ret.position,
        })
    }

    fn check_condition(&mut self, condition: Condition<()>) -> SemResult<Condition<SemInfo>> {
        Ok(match condition {
            Condition::Comparison(comparison) => {
                let (left, left_type) = self.check_expression(*comparison.left)?;
                let (right, right_type) = self.check_expression(*comparison.right)?;

                let comparable = matches!(
                    (&left_type, &right_type),
                    (
                        DataType::Scalar(ScalarKind::Int),
                        DataType::Scalar(ScalarKind::Int)
                    ) | (
                        DataType::Scalar(ScalarKind::Char),
                        DataType::Scalar(ScalarKind::Char)
                    )
                );
                if !comparable {
                    return Err(SemanticError::new(
                        format!(
                            "comparison operands must both be int or both be char, found '{left_type}' and '{right_type}'"
                        ),
                        comparison.position.clone(),
                    )
                    .into());
                }

                Condition::Comparison(Comparison {
                    operator: comparison.operator,
                    left: Box::new(left),
                    right: Box::new(right),
                    position: comparison.position,
                })
            }
            Condition::Logical(logical) => {
                let left = Box::new(self.check_condition(*logical.left)?);
                let right = Box::new(self.check_condition(*logical.right)?);
                Condition::Logical(LogicalCondition {
                    operator: logical.operator,
                    left,
                    right,
                    position: logical.position,
                })
            }
            Condition::Not(not) => Condition::Not(NotCondition {
                inner: Box::new(self.check_condition(*not.inner)?),
                position: not.position,
            }),
        })
    }

    fn check_expression(
        &mut self,
        expression: Expression<()>,
    ) -> SemResult<(Expression<SemInfo>, DataType)> {
        Ok(match expression {
            Expression::Int(literal) => (
                Expression::Int(IntLiteral {
                    value: literal.value,
                    info: SemInfo::Typed(DataType::Scalar(ScalarKind::Int)),
                    position: literal.position,
                }),
                DataType::Scalar(ScalarKind::Int),
            ),
            Expression::Char(literal) => (
                Expression::Char(CharLiteral {
                    value: literal.value,
                    info: SemInfo::Typed(DataType::Scalar(ScalarKind::Char)),
                    position: literal.position,
                }),
                DataType::Scalar(ScalarKind::Char),
            ),
            Expression::Lvalue(lvalue) => {
                let (lvalue, data_type) = self.check_lvalue(lvalue)?;
                (Expression::Lvalue(lvalue), data_type)
            }
            Expression::Call(call) => {
                let (call, return_kind) = self.check_call(call)?;
                (Expression::Call(call), DataType::Scalar(return_kind))
            }
            Expression::Unary(unary) => {
                let (operand, operand_type) = self.check_expression(*unary.operand)?;
                if operand_type != DataType::Scalar(ScalarKind::Int) {
                    return Err(SemanticError::new(
                        format!("arithmetic operand must be int, found '{operand_type}'"),
                        unary.position.clone(),
                    )
                    .into());
                }
                (
                    Expression::Unary(UnaryExpression {
                        operator: unary.operator,
                        operand: Box::new(operand),
                        info: SemInfo::Typed(DataType::Scalar(ScalarKind::Int)),
                        position: unary.position,
                    }),
                    DataType::Scalar(ScalarKind::Int),
                )
            }
            Expression::Binary(binary) => {
                let (left, left_type) = self.check_expression(*binary.left)?;
                let (right, right_type) = self.check_expression(*binary.right)?;
                for (operand_type, operand) in [(&left_type, &left), (&right_type, &right)] {
                    if *operand_type != DataType::Scalar(ScalarKind::Int) {
                        return Err(SemanticError::new(
                            format!("arithmetic operand must be int, found '{operand_type}'"),
                            operand.position(),
                        )
                        .into());
                    }
                }
                (
                    Expression::Binary(BinaryExpression {
                        operator: binary.operator,
                        left: Box::new(left),
                        right: Box::new(right),
                        info: SemInfo::Typed(DataType::Scalar(ScalarKind::Int)),
                        position: binary.position,
                    }),
                    DataType::Scalar(ScalarKind::Int),
                )
            }
        })
    }

    fn check_lvalue(&mut self, lvalue: Lvalue<()>) -> SemResult<(Lvalue<SemInfo>, DataType)> {
        Ok(match lvalue {
            Lvalue::Variable(variable) => {
                let Some(entity) = self.table.lookup_all(&variable.id.name) else {
                    return Err(SemanticError::new(
                        format!("undefined identifier '{}'", variable.id.name),
                        variable.position.clone(),
                    )
                    .into());
                };

                let access = match &*entity.borrow() {
                    Entity::Variable(entity) => AccessInfo {
                        data_type: entity.data_type.clone(),
                        frame_offset: entity.frame_offset,
                        parent_path: entity.parent_path.clone(),
                        mode: PassMode::ByValue,
                        is_parameter: false,
                    },
                    Entity::Parameter(entity) => AccessInfo {
                        data_type: entity.data_type.clone(),
                        frame_offset: entity.frame_offset,
                        parent_path: entity.parent_path.clone(),
                        mode: entity.mode,
                        is_parameter: true,
                    },
                    Entity::Function(_) => {
                        return Err(SemanticError::new(
                            format!("'{}' is a function, not a variable", variable.id.name),
                            variable.position.clone(),
                        )
                        .into())
                    }
                };

                let data_type = access.data_type.clone();
                (
                    Lvalue::Variable(Variable {
                        id: variable.id,
                        info: SemInfo::Access(access),
                        position: variable.position,
                    }),
                    data_type,
                )
            }
            Lvalue::String(string) => {
                // typed as array-of-char with the trailing NUL included
                let data_type = DataType::char_array(string.value.len() as i64 + 1);
                (
                    Lvalue::String(StringLiteral {
                        value: string.value,
                        info: SemInfo::Typed(data_type.clone()),
                        position: string.position,
                    }),
                    data_type,
                )
            }
            Lvalue::Access(access) => {
                let (base, base_type) = self.check_lvalue(*access.base)?;
                let DataType::Array { dims, .. } = &base_type else {
                    return Err(SemanticError::new(
                        format!("cannot index a value of type '{base_type}'"),
                        access.position.clone(),
                    )
                    .into());
                };
                if access.indices.len() > dims.len() {
                    return Err(SemanticError::new(
                        format!(
                            "too many indices: '{base_type}' has {} dimensions but {} were indexed",
                            dims.len(),
                            access.indices.len()
                        ),
                        access.position.clone(),
                    )
                    .into());
                }

                let mut indices = vec![];
                for index in access.indices {
                    let (index, index_type) = self.check_expression(index)?;
                    if index_type != DataType::Scalar(ScalarKind::Int) {
                        return Err(SemanticError::new(
                            format!("array index must be int, found '{index_type}'"),
                            index.position(),
                        )
                        .into());
                    }
                    indices.push(index);
                }

                let data_type = base_type.after_indexing(indices.len());
                (
                    Lvalue::Access(ArrayAccess {
                        base: Box::new(base),
                        indices,
                        info: SemInfo::Typed(data_type.clone()),
                        position: access.position,
                    }),
                    data_type,
                )
            }
        })
    }

    fn check_call(
        &mut self,
        call: FunctionCall<()>,
    ) -> SemResult<(FunctionCall<SemInfo>, ScalarKind)> {
        let Some(entity) = self.table.lookup_all(&call.id.name) else {
            return Err(SemanticError::new(
                format!("call to undefined function '{}'", call.id.name),
                call.position.clone(),
            )
            .into());
        };

        let callee = match &*entity.borrow() {
            Entity::Function(function) => function.clone(),
            _ => {
                return Err(SemanticError::new(
                    format!("'{}' is not a function", call.id.name),
                    call.position.clone(),
                )
                .into())
            }
        };

        if callee.params.len() != call.arguments.len() {
            return Err(SemanticError::new(
                format!(
                    "'{}' expects {} arguments but {} were given",
                    call.id.name,
                    callee.params.len(),
                    call.arguments.len()
                ),
                call.position.clone(),
            )
            .into());
        }

        let mut arguments = vec![];
        for (argument, (mode, param_type)) in call.arguments.into_iter().zip(&callee.params) {
            let (argument, argument_type) = self.check_expression(argument)?;

            if *mode == PassMode::ByReference && !matches!(argument, Expression::Lvalue(_)) {
                return Err(SemanticError::new(
                    format!(
                        "argument for by-reference parameter of '{}' must be an l-value",
                        call.id.name
                    ),
                    argument.position(),
                )
                .into());
            }
            if !argument_compatible(&argument_type, param_type) {
                return Err(SemanticError::new(
                    format!(
                        "argument type mismatch in call to '{}': expected '{param_type}', found '{argument_type}'",
                        call.id.name
                    ),
                    argument.position(),
                )
                .into());
            }

            arguments.push(argument);
        }

        let info = CallInfo {
            return_kind: callee.return_kind,
            callee_path: callee.parent_path.clone(),
            caller_path: self.table.parent_path().to_vec(),
            params: callee.params.clone(),
        };

        Ok((
            FunctionCall {
                id: call.id,
                arguments,
                info: SemInfo::Call(info),
                position: call.position,
            },
            callee.return_kind,
        ))
    }
}

/// The variable/parameter compatibility rule for call arguments: scalars
/// must match exactly; arrays must agree on element kind and dimension
/// count, and on every bound except where the parameter's leading
/// dimension is unspecified.
fn argument_compatible(argument: &DataType, parameter: &DataType) -> bool {
    match (argument, parameter) {
        (DataType::Scalar(a), DataType::Scalar(p)) => a == p,
        (
            DataType::Array {
                element: argument_element,
                dims: argument_dims,
            },
            DataType::Array {
                element: parameter_element,
                dims: parameter_dims,
            },
        ) => {
            if argument_element != parameter_element || argument_dims.len() != parameter_dims.len()
            {
                return false;
            }
            argument_dims
                .iter()
                .zip(parameter_dims)
                .enumerate()
                .all(|(i, (argument_dim, parameter_dim))| match parameter_dim {
                    Dimension::Unspecified => i == 0,
                    Dimension::Fixed(_) => argument_dim == parameter_dim,
                })
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser::parse_program};

    fn analyze(source: &str) -> SemResult<Program<SemInfo>> {
        let tokens = Lexer::new(source).lex().unwrap();
        let program = parse_program(tokens).unwrap();
        Analyzer::analyze(program)
    }

    fn expect_semantic_error(source: &str, fragment: &str) {
        match analyze(source) {
            Err(CompilerError::Semantic(error)) => assert!(
                error.message.contains(fragment),
                "expected message containing '{fragment}', got '{}'",
                error.message
            ),
            other => panic!("expected a semantic error, got {other:?}"),
        }
    }

    #[test]
    fn test_minimal_program() {
        assert!(analyze("fun main(): nothing { writeInteger(1 + 2); }").is_ok());
    }

    #[test]
    fn test_main_with_parameters_rejected() {
        expect_semantic_error(
            "fun main(x: int): nothing {}",
            "must not take parameters",
        );
    }

    #[test]
    fn test_main_returning_value_rejected() {
        expect_semantic_error("fun main(): int { return 1; }", "must return nothing");
    }

    #[test]
    fn test_undefined_identifier() {
        expect_semantic_error("fun main(): nothing { x <- 1; }", "undefined identifier");
    }

    #[test]
    fn test_redefinition_in_same_scope() {
        expect_semantic_error(
            "fun main(): nothing var x: int; var x: char; {}",
            "redefinition",
        );
    }

    #[test]
    fn test_shadowing_in_nested_scope_allowed() {
        assert!(analyze(
            "fun main(): nothing \
                 var x: int; \
                 fun f(): nothing var x: char; { x <- 'a'; } \
             { x <- 1; f(); }"
        )
        .is_ok());
    }

    #[test]
    fn test_declaration_then_definition() {
        assert!(analyze(
            "fun main(): nothing \
                 fun f(x: int): int; \
                 fun g(): int { return f(1); } \
                 fun f(x: int): int { return x; } \
             { writeInteger(g()); }"
        )
        .is_ok());
    }

    #[test]
    fn test_declaration_without_definition_rejected() {
        expect_semantic_error(
            "fun main(): nothing fun f(): int; { ; }",
            "declared but not defined",
        );
    }

    #[test]
    fn test_declaration_definition_return_type_mismatch() {
        expect_semantic_error(
            "fun main(): nothing \
                 fun f(): int; \
                 fun f(): nothing {} \
             { ; }",
            "return type",
        );
    }

    #[test]
    fn test_declaration_definition_mode_mismatch() {
        expect_semantic_error(
            "fun main(): nothing \
                 fun f(x: int): int; \
                 fun f(ref x: int): int { return x; } \
             { ; }",
            "parameters differ",
        );
    }

    #[test]
    fn test_array_parameter_by_value_rejected() {
        expect_semantic_error(
            "fun main(): nothing fun f(a: int[3]): nothing {} { ; }",
            "must be passed by reference",
        );
    }

    #[test]
    fn test_non_leading_unspecified_dimension_rejected() {
        expect_semantic_error(
            "fun main(): nothing fun f(ref a: int[3][]): nothing {} { ; }",
            "leading dimension",
        );
    }

    #[test]
    fn test_variable_with_unspecified_dimension_rejected() {
        expect_semantic_error(
            "fun main(): nothing var a: int[]; {}",
            "explicit array bounds",
        );
    }

    #[test]
    fn test_zero_array_bound_rejected() {
        expect_semantic_error(
            "fun main(): nothing var a: int[0]; {}",
            "must be positive",
        );
    }

    #[test]
    fn test_assignment_type_mismatch() {
        expect_semantic_error(
            "fun main(): nothing var c: char; { c <- 42; }",
            "cannot assign",
        );
    }

    #[test]
    fn test_assignment_to_array_rejected() {
        expect_semantic_error(
            "fun main(): nothing var a, b: int[3]; { a <- b; }",
            "cannot assign to an array",
        );
    }

    #[test]
    fn test_assignment_to_string_literal_rejected() {
        expect_semantic_error(
            "fun main(): nothing { \"abc\" <- 'x'; }",
            "string literal",
        );
    }

    #[test]
    fn test_string_literal_passable_by_reference() {
        assert!(analyze("fun main(): nothing { writeString(\"hello\\n\"); }").is_ok());
    }

    #[test]
    fn test_by_reference_argument_must_be_lvalue() {
        expect_semantic_error(
            "fun main(): nothing var x: int; \
                 fun inc(ref n: int): nothing { n <- n + 1; } \
             { inc(x + 1); }",
            "must be an l-value",
        );
    }

    #[test]
    fn test_argument_count_mismatch() {
        expect_semantic_error(
            "fun main(): nothing { writeInteger(1, 2); }",
            "expects 1 arguments but 2 were given",
        );
    }

    #[test]
    fn test_open_array_accepts_any_leading_bound() {
        assert!(analyze(
            "fun main(): nothing \
                 var s: char[6]; \
                 fun f(ref t: char[]): nothing { t[0] <- 'x'; } \
             { f(s); }"
        )
        .is_ok());
    }

    #[test]
    fn test_open_array_trailing_dimensions_must_match() {
        expect_semantic_error(
            "fun main(): nothing \
                 var m: int[4][7]; \
                 fun f(ref t: int[][5]): nothing {} \
             { f(m); }",
            "argument type mismatch",
        );
    }

    #[test]
    fn test_fixed_array_bounds_must_match() {
        expect_semantic_error(
            "fun main(): nothing \
                 var a: int[4]; \
                 fun f(ref t: int[5]): nothing {} \
             { f(a); }",
            "argument type mismatch",
        );
    }

    #[test]
    fn test_partial_access_passes_subarray() {
        assert!(analyze(
            "fun main(): nothing \
                 var m: int[4][7]; \
                 fun f(ref row: int[]): nothing { row[0] <- 1; } \
             { f(m[2]); }"
        )
        .is_ok());
    }

    #[test]
    fn test_too_many_indices_rejected() {
        expect_semantic_error(
            "fun main(): nothing var a: int[3]; { a[1][2] <- 0; }",
            "too many indices",
        );
    }

    #[test]
    fn test_index_must_be_int() {
        expect_semantic_error(
            "fun main(): nothing var a: int[3]; { a['x'] <- 0; }",
            "array index must be int",
        );
    }

    #[test]
    fn test_comparison_requires_matching_scalars() {
        expect_semantic_error(
            "fun main(): nothing var c: char; { if c = 1 then ; }",
            "comparison operands",
        );
    }

    #[test]
    fn test_arithmetic_on_char_rejected() {
        expect_semantic_error(
            "fun main(): nothing var c: char; { writeInteger(c + 1); }",
            "arithmetic operand must be int",
        );
    }

    #[test]
    fn test_return_value_from_nothing_function_rejected() {
        expect_semantic_error(
            "fun main(): nothing { return 1; }",
            "cannot return a value",
        );
    }

    #[test]
    fn test_bare_return_of_nothing_call_allowed() {
        assert!(analyze("fun main(): nothing { return writeInteger(1); }").is_ok());
    }

    #[test]
    fn test_return_type_mismatch() {
        expect_semantic_error(
            "fun main(): nothing \
                 fun f(): int { return 'a'; } \
             { writeInteger(f()); }",
            "return type mismatch",
        );
    }

    #[test]
    fn test_missing_return_value() {
        expect_semantic_error(
            "fun main(): nothing \
                 fun f(): int { return; } \
             { writeInteger(f()); }",
            "return without a value",
        );
    }

    #[test]
    fn test_nested_shadowing_definitions() {
        // three nested functions all named f, each shadowing the outer one
        assert!(analyze("fun f(): nothing fun f(): nothing fun f(): nothing {} {} {}").is_ok());
    }

    #[test]
    fn test_access_through_two_static_links_annotated() {
        let program = analyze(
            "fun f(): nothing \
                 var c: char; \
                 fun g(): nothing \
                     fun h(): nothing { c <- 'a'; } \
                 { h(); } \
             { g(); }",
        )
        .unwrap();

        // dig out the assignment to c inside h
        let LocalDef::Function(g) = &program.main.locals[1] else {
            panic!("expected g");
        };
        let LocalDef::Function(h) = &g.locals[0] else {
            panic!("expected h");
        };
        let Statement::Assignment(assignment) = &h.body.statements[0] else {
            panic!("expected assignment");
        };
        let Lvalue::Variable(variable) = &assignment.target else {
            panic!("expected variable target");
        };
        let access = variable.info.as_access().unwrap();

        // c is defined in f: parent path ["f"], use site path ["h","g","f"]
        assert_eq!(access.parent_path, vec!["f".to_string()]);
        assert_eq!(access.frame_offset, 0);
    }

    #[test]
    fn test_call_annotations_carry_paths_and_modes() {
        let program = analyze(
            "fun main(): nothing \
                 var i: int; \
                 fun input(ref n: int): nothing { n <- readInteger(); } \
             { input(i); }",
        )
        .unwrap();

        let Statement::Call(call) = &program.main.body.statements[0] else {
            panic!("expected call statement");
        };
        let info = call.info.as_call().unwrap();
        assert_eq!(info.callee_path, vec!["main".to_string()]);
        assert_eq!(info.caller_path, vec!["main".to_string()]);
        assert_eq!(info.params.len(), 1);
        assert_eq!(info.params[0].0, PassMode::ByReference);
    }
}
