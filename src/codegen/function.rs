//! Function-body pass: one flat LLVM function per source function.
//!
//! Every generated function first allocates its frame record and spills
//! its incoming arguments (static link included) into the frame slots;
//! all later variable access goes through the frame. Nested declarations
//! are registered before sibling bodies are lowered so forward calls
//! resolve, and nested definitions are emitted before the parent's own
//! body.

use inkwell::values::FunctionValue;

use crate::{
    error::CompilerError,
    parser::ast::{FunctionDef, FunctionHeader, LocalDef, ScalarKind},
    semantic::{qualified_name, SemInfo},
};

use super::{error::CodegenError, lowered_symbol, statement, ActiveFunction, CodegenContext};

/// Full path of a defined function: its own id innermost, then the
/// annotated parent path.
pub fn full_path(def: &FunctionDef<SemInfo>) -> Vec<String> {
    let SemInfo::Func(info) = &def.info else {
        unreachable!("function definition without placement annotation");
    };
    let mut path = vec![def.header.id.name.clone()];
    path.extend(info.parent_path.iter().cloned());
    path
}

/// Register the LLVM declaration of a function if it is not already
/// present (a prior `fun f(...): t;` declaration shares the symbol).
pub fn declare_function<'ctx>(
    ctx: &CodegenContext<'ctx>,
    header: &FunctionHeader<SemInfo>,
    path: &[String],
) -> FunctionValue<'ctx> {
    let symbol = lowered_symbol(path);
    if let Some(existing) = ctx.module.get_function(&symbol) {
        return existing;
    }

    let params = header
        .params
        .iter()
        .map(|param| (param.mode, param.data_type.clone()))
        .collect::<Vec<_>>();
    let fn_type = ctx.function_type(path.len() > 1, &params, header.return_kind);
    ctx.module.add_function(&symbol, fn_type, None)
}

pub fn generate_function<'ctx>(
    ctx: &CodegenContext<'ctx>,
    def: &FunctionDef<SemInfo>,
) -> Result<(), CompilerError> {
    let path = full_path(def);
    let qualified = qualified_name(&path);
    let fn_value = declare_function(ctx, &def.header, &path);

    // declarations first, so every sibling can call forward
    for local in &def.locals {
        let (header, parent) = match local {
            LocalDef::Function(nested) => (&nested.header, full_path(nested)),
            LocalDef::Declaration(declaration) => {
                let SemInfo::Func(info) = &declaration.info else {
                    unreachable!("declaration without placement annotation");
                };
                let mut nested_path = vec![declaration.header.id.name.clone()];
                nested_path.extend(info.parent_path.iter().cloned());
                (&declaration.header, nested_path)
            }
            LocalDef::Variable(_) => continue,
        };
        declare_function(ctx, header, &parent);
    }

    // nested definitions before the parent body
    for local in &def.locals {
        if let LocalDef::Function(nested) = local {
            generate_function(ctx, nested)?;
        }
    }

    let frame = ctx.frame(&qualified);
    let entry = ctx.context.append_basic_block(fn_value, "entry");
    ctx.builder.position_at_end(entry);

    // allocate the frame and spill every incoming argument into its slot
    let frame_pointer = ctx.builder.build_alloca(frame.record, "frame").unwrap();
    let mut slot = 0u32;
    if frame.has_static_link {
        let link_slot = ctx
            .builder
            .build_struct_gep(frame.record, frame_pointer, 0, "link")
            .unwrap();
        ctx.builder
            .build_store(link_slot, fn_value.get_nth_param(0).unwrap())
            .unwrap();
        slot += 1;
    }
    for param in &def.header.params {
        let param_slot = ctx
            .builder
            .build_struct_gep(frame.record, frame_pointer, slot, &param.id.name)
            .unwrap();
        ctx.builder
            .build_store(param_slot, fn_value.get_nth_param(slot).unwrap())
            .unwrap();
        slot += 1;
    }

    ctx.push_active(ActiveFunction {
        function: fn_value,
        frame_pointer,
        path,
        return_kind: def.header.return_kind,
    });

    let result = statement::generate_block(ctx, &def.body);

    // end-of-body finalization
    let finalization = result.and_then(|()| {
        if ctx.terminated() {
            return Ok(());
        }
        match def.header.return_kind {
            ScalarKind::Nothing => {
                ctx.builder.build_return(None).unwrap();
                Ok(())
            }
            _ => Err(CodegenError::new(
                format!(
                    "non-nothing function '{}' does not return a value",
                    def.header.id.name
                ),
                def.position.clone(),
            )
            .into()),
        }
    });

    ctx.pop_active();
    finalization
}

/// The C entry point: `i32 main()` calling the lowered top-level function
/// and returning 0.
pub fn generate_entry_wrapper<'ctx>(ctx: &CodegenContext<'ctx>, main: &FunctionDef<SemInfo>) {
    let top = ctx
        .module
        .get_function(&lowered_symbol(&full_path(main)))
        .expect("top-level function must be lowered before the entry wrapper");

    let wrapper_type = ctx.context.i32_type().fn_type(&[], false);
    let wrapper = ctx.module.add_function("main", wrapper_type, None);
    let entry = ctx.context.append_basic_block(wrapper, "entry");

    ctx.builder.position_at_end(entry);
    ctx.builder.build_call(top, &[], "").unwrap();
    ctx.builder
        .build_return(Some(&ctx.context.i32_type().const_zero()))
        .unwrap();
}
