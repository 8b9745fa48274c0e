//! Code generation for Grace.
//!
//! Lowers the annotated AST into an LLVM module through inkwell. Nested
//! functions become flat functions whose frames are named record types:
//! {static link?, parameters in order, locals in order}. Non-local access
//! walks the static-link chain; the link is threaded as an implicit first
//! argument into every nested function.
//!
//! Two passes run over the tree: [`frame::declare_frames`] emits one record
//! type per function, then [`function::generate_function`] emits the flat
//! functions themselves. The [`CodegenContext`] carries the LLVM context,
//! module and builder plus the frame and active-function registries.

mod condition;
mod error;
mod expression;
mod frame;
mod function;
mod lvalue;
mod statement;

pub use error::CodegenError;
pub use lvalue::Place;

use std::{cell::RefCell, collections::HashMap};

use inkwell::{
    builder::Builder,
    context::Context,
    module::{Linkage, Module},
    types::{BasicMetadataTypeEnum, BasicTypeEnum, FunctionType, PointerType, StructType},
    values::{FunctionValue, PointerValue},
    AddressSpace,
};

use crate::{
    error::CompilerError,
    parser::ast::{DataType, Dimension, PassMode, Program, ScalarKind},
    semantic::{qualified_name, runtime_catalog, SemInfo},
};

/// The lowered record type of one function's activation frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo<'ctx> {
    pub record: StructType<'ctx>,
    pub has_static_link: bool,
}

/// The function currently being lowered: its LLVM value, the alloca
/// holding its frame, its full path (own id innermost) and return kind.
#[derive(Debug, Clone)]
pub struct ActiveFunction<'ctx> {
    pub function: FunctionValue<'ctx>,
    pub frame_pointer: PointerValue<'ctx>,
    pub path: Vec<String>,
    pub return_kind: ScalarKind,
}

pub struct CodegenContext<'ctx> {
    pub context: &'ctx Context,
    pub module: Module<'ctx>,
    pub builder: Builder<'ctx>,
    frames: RefCell<HashMap<String, FrameInfo<'ctx>>>,
    active: RefCell<Vec<ActiveFunction<'ctx>>>,
    string_counter: RefCell<usize>,
}

impl<'ctx> CodegenContext<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        Self {
            context,
            module,
            builder,
            frames: RefCell::new(HashMap::new()),
            active: RefCell::new(vec![]),
            string_counter: RefCell::new(0),
        }
    }

    pub fn ptr_type(&self) -> PointerType<'ctx> {
        self.context.ptr_type(AddressSpace::default())
    }

    /// `int` is a 64-bit and `char` an 8-bit signed integer.
    pub fn scalar_type(&self, kind: ScalarKind) -> BasicTypeEnum<'ctx> {
        match kind {
            ScalarKind::Int => self.context.i64_type().into(),
            ScalarKind::Char => self.context.i8_type().into(),
            ScalarKind::Nothing => {
                unreachable!("'nothing' has no value representation")
            }
        }
    }

    /// The storage type of a declared Grace type with explicit bounds.
    pub fn lowered_type(&self, data_type: &DataType) -> BasicTypeEnum<'ctx> {
        match data_type {
            DataType::Scalar(kind) => self.scalar_type(*kind),
            DataType::Array { element, dims } => {
                let mut lowered = self.scalar_type(*element);
                for dim in dims.iter().rev() {
                    let bound = match dim {
                        Dimension::Fixed(bound) => *bound as u32,
                        Dimension::Unspecified => {
                            unreachable!("open arrays are held through pointers")
                        }
                    };
                    lowered = match lowered {
                        BasicTypeEnum::IntType(ty) => ty.array_type(bound).into(),
                        BasicTypeEnum::ArrayType(ty) => ty.array_type(bound).into(),
                        other => unreachable!("unexpected array element {other:?}"),
                    };
                }
                lowered
            }
        }
    }

    /// The physical type a parameter occupies in its frame slot: by-value
    /// scalars are themselves, everything by-reference is a pointer.
    pub fn param_physical_type(&self, mode: PassMode, data_type: &DataType) -> BasicTypeEnum<'ctx> {
        match mode {
            PassMode::ByValue => self.lowered_type(data_type),
            PassMode::ByReference => self.ptr_type().into(),
        }
    }

    /// A function's LLVM signature: the static link (for nested functions)
    /// followed by the physical parameter types.
    pub fn function_type(
        &self,
        has_static_link: bool,
        params: &[(PassMode, DataType)],
        return_kind: ScalarKind,
    ) -> FunctionType<'ctx> {
        let mut param_types: Vec<BasicMetadataTypeEnum> = vec![];
        if has_static_link {
            param_types.push(self.ptr_type().into());
        }
        for (mode, data_type) in params {
            param_types.push(self.param_physical_type(*mode, data_type).into());
        }

        match return_kind {
            ScalarKind::Nothing => self.context.void_type().fn_type(&param_types, false),
            ScalarKind::Int => self.context.i64_type().fn_type(&param_types, false),
            ScalarKind::Char => self.context.i8_type().fn_type(&param_types, false),
        }
    }

    pub fn register_frame(&self, qualified: String, frame: FrameInfo<'ctx>) {
        self.frames.borrow_mut().insert(qualified, frame);
    }

    pub fn frame(&self, qualified: &str) -> FrameInfo<'ctx> {
        self.try_frame(qualified)
            .unwrap_or_else(|| panic!("expected a frame record for '{qualified}'"))
    }

    pub fn try_frame(&self, qualified: &str) -> Option<FrameInfo<'ctx>> {
        self.frames.borrow().get(qualified).copied()
    }

    pub fn push_active(&self, active: ActiveFunction<'ctx>) {
        self.active.borrow_mut().push(active);
    }

    pub fn pop_active(&self) {
        self.active.borrow_mut().pop();
    }

    pub fn active(&self) -> ActiveFunction<'ctx> {
        self.active
            .borrow()
            .last()
            .cloned()
            .expect("lowering outside of any function")
    }

    /// Whether the block under the builder already ends in a terminator.
    pub fn terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_terminator())
            .is_some()
    }

    /// Walk `hops` static links up from the current frame. Returns the
    /// reached frame pointer together with its record type.
    pub fn frame_at(&self, hops: usize) -> (PointerValue<'ctx>, StructType<'ctx>) {
        let active = self.active();
        let mut pointer = active.frame_pointer;
        let mut path = active.path;

        for _ in 0..hops {
            let frame = self.frame(&qualified_name(&path));
            let slot = self
                .builder
                .build_struct_gep(frame.record, pointer, 0, "link")
                .unwrap();
            pointer = self
                .builder
                .build_load(self.ptr_type(), slot, "frame.up")
                .unwrap()
                .into_pointer_value();
            path.remove(0);
        }

        (pointer, self.frame(&qualified_name(&path)).record)
    }

    /// Emit a private null-terminated global for a string literal and
    /// return a pointer to it along with its array type.
    pub fn global_string(
        &self,
        bytes: &[u8],
    ) -> (PointerValue<'ctx>, inkwell::types::ArrayType<'ctx>) {
        let mut data = bytes.to_vec();
        data.push(0);

        let name = {
            let mut counter = self.string_counter.borrow_mut();
            let name = format!("str.{}", *counter);
            *counter += 1;
            name
        };

        let array_type = self.context.i8_type().array_type(data.len() as u32);
        let global = self.module.add_global(array_type, None, &name);
        global.set_initializer(&self.context.const_string(&data, false));
        global.set_constant(true);
        global.set_linkage(Linkage::Private);
        global.set_unnamed_addr(true);

        (global.as_pointer_value(), array_type)
    }

    /// Declare the runtime library to the module, signature for signature.
    fn declare_runtime(&self) {
        for (id, params, return_kind) in runtime_catalog() {
            let fn_type = self.function_type(false, &params, return_kind);
            self.module.add_function(id, fn_type, None);
        }
    }
}

/// The lowered symbol of a function given its full path (own id
/// innermost). Shadowed nested functions stay unique through their
/// `.`-joined qualified names; a top-level function named `main` moves
/// aside for the C entry wrapper.
pub fn lowered_symbol(path: &[String]) -> String {
    if path.len() == 1 && path[0] == "main" {
        return "grace_main".to_string();
    }
    qualified_name(path)
}

/// Lower a checked program into a fresh LLVM module.
pub fn emit<'ctx>(
    context: &'ctx Context,
    program: &Program<SemInfo>,
    module_name: &str,
) -> Result<Module<'ctx>, CompilerError> {
    let ctx = CodegenContext::new(context, module_name);
    ctx.declare_runtime();

    frame::declare_frames(&ctx, &program.main);
    function::generate_function(&ctx, &program.main)?;
    function::generate_entry_wrapper(&ctx, &program.main);

    Ok(ctx.module)
}
