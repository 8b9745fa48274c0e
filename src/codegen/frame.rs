//! Frame-type pass: one named record type per source function.
//!
//! Runs to completion before any body is lowered, so that a grandchild
//! reaching through its static link can already name every ancestor's
//! frame. Field order is fixed: static link (nested functions only), then
//! parameters in declaration order, then locals in declaration order.

use inkwell::types::BasicTypeEnum;

use crate::{
    parser::ast::{FunctionDef, LocalDef},
    semantic::{qualified_name, SemInfo},
};

use super::{function::full_path, CodegenContext, FrameInfo};

/// Recursively emit the frame record of `def` and of every function nested
/// inside it, outermost first.
pub fn declare_frames<'ctx>(ctx: &CodegenContext<'ctx>, def: &FunctionDef<SemInfo>) {
    let path = full_path(def);
    let qualified = qualified_name(&path);
    let has_static_link = path.len() > 1;

    let record = ctx
        .context
        .opaque_struct_type(&format!("frame.{qualified}"));

    let mut fields: Vec<BasicTypeEnum> = vec![];
    if has_static_link {
        fields.push(ctx.ptr_type().into());
    }
    for param in &def.header.params {
        fields.push(ctx.param_physical_type(param.mode, &param.data_type));
    }
    for local in &def.locals {
        if let LocalDef::Variable(variable) = local {
            fields.push(ctx.lowered_type(&variable.data_type));
        }
    }
    record.set_body(&fields, false);

    ctx.register_frame(
        qualified,
        FrameInfo {
            record,
            has_static_link,
        },
    );

    for local in &def.locals {
        if let LocalDef::Function(nested) = local {
            declare_frames(ctx, nested);
        }
    }
}
