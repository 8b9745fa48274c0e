//! L-value lowering: from an annotated l-value to an addressable place.
//!
//! A place pairs the pointer with the type it points at, which is what the
//! subsequent load, store or GEP needs under opaque pointers. The pointer
//! is reached by walking `len(use-site path) - len(definer path)` static
//! links and indexing the definer's frame record; by-reference parameters
//! add one load to reach the underlying storage.

use inkwell::{
    types::BasicTypeEnum,
    values::{IntValue, PointerValue},
};

use crate::{
    error::CompilerError,
    parser::ast::{ArrayAccess, DataType, Lvalue, PassMode, StringLiteral, Variable},
    semantic::SemInfo,
};

use super::{expression, CodegenContext};

/// An addressable storage location together with its Grace type.
pub struct Place<'ctx> {
    pub pointer: PointerValue<'ctx>,
    /// The LLVM type `pointer` points at.
    pub pointee: BasicTypeEnum<'ctx>,
    pub data_type: DataType,
}

pub fn generate_place<'ctx>(
    ctx: &CodegenContext<'ctx>,
    lvalue: &Lvalue<SemInfo>,
) -> Result<Place<'ctx>, CompilerError> {
    match lvalue {
        Lvalue::Variable(variable) => generate_variable_place(ctx, variable),
        Lvalue::String(string) => Ok(generate_string_place(ctx, string)),
        Lvalue::Access(access) => generate_access_place(ctx, access),
    }
}

fn generate_variable_place<'ctx>(
    ctx: &CodegenContext<'ctx>,
    variable: &Variable<SemInfo>,
) -> Result<Place<'ctx>, CompilerError> {
    let access = variable
        .info
        .as_access()
        .expect("variable use without access annotation");

    let hops = ctx.active().path.len() - access.parent_path.len();
    let (frame_pointer, record) = ctx.frame_at(hops);
    let slot = ctx
        .builder
        .build_struct_gep(
            record,
            frame_pointer,
            access.frame_offset as u32,
            &variable.id.name,
        )
        .unwrap();

    if access.mode == PassMode::ByReference {
        // the slot holds a pointer to the storage; load it once
        let pointer = ctx
            .builder
            .build_load(ctx.ptr_type(), slot, &format!("{}.ref", variable.id.name))
            .unwrap()
            .into_pointer_value();
        let pointee = if access.data_type.has_unspecified_leading() {
            ctx.lowered_type(&access.data_type.strip_leading())
        } else {
            ctx.lowered_type(&access.data_type)
        };
        Ok(Place {
            pointer,
            pointee,
            data_type: access.data_type.clone(),
        })
    } else {
        Ok(Place {
            pointer: slot,
            pointee: ctx.lowered_type(&access.data_type),
            data_type: access.data_type.clone(),
        })
    }
}

fn generate_string_place<'ctx>(
    ctx: &CodegenContext<'ctx>,
    string: &StringLiteral<SemInfo>,
) -> Place<'ctx> {
    let (pointer, array_type) = ctx.global_string(&string.value);
    Place {
        pointer,
        pointee: array_type.into(),
        data_type: DataType::char_array(string.value.len() as i64 + 1),
    }
}

fn generate_access_place<'ctx>(
    ctx: &CodegenContext<'ctx>,
    access: &ArrayAccess<SemInfo>,
) -> Result<Place<'ctx>, CompilerError> {
    let base = generate_place(ctx, &access.base)?;

    let mut indices: Vec<IntValue> = vec![];
    if !base.data_type.has_unspecified_leading() {
        // descend into the array value itself before applying the
        // source-level indices
        indices.push(ctx.context.i64_type().const_zero());
    }
    for index in &access.indices {
        indices.push(expression::generate_value(ctx, index)?.into_int_value());
    }

    let pointer = unsafe {
        ctx.builder
            .build_in_bounds_gep(base.pointee, base.pointer, &indices, "elem")
            .unwrap()
    };

    let data_type = base.data_type.after_indexing(access.indices.len());
    Ok(Place {
        pointer,
        pointee: ctx.lowered_type(&data_type),
        data_type,
    })
}
