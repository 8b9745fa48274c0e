//! Expression lowering: values, calls and by-reference argument decay.

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, PointerValue};

use crate::{
    error::{CompilerError, InternalError},
    parser::ast::{
        BinaryOperator, DataType, Expression, FunctionCall, PassMode, ScalarKind, UnaryOperator,
    },
    semantic::{qualified_name, SemInfo},
};

use super::{lowered_symbol, lvalue, CodegenContext};

pub fn generate_value<'ctx>(
    ctx: &CodegenContext<'ctx>,
    expression: &Expression<SemInfo>,
) -> Result<BasicValueEnum<'ctx>, CompilerError> {
    match expression {
        Expression::Int(literal) => Ok(ctx
            .context
            .i64_type()
            .const_int(literal.value as u64, true)
            .into()),
        Expression::Char(literal) => Ok(ctx
            .context
            .i8_type()
            .const_int(literal.value as u64, false)
            .into()),
        Expression::Lvalue(lvalue) => {
            let place = lvalue::generate_place(ctx, lvalue)?;
            Ok(ctx
                .builder
                .build_load(place.pointee, place.pointer, "load")
                .unwrap())
        }
        Expression::Call(call) => generate_call(ctx, call)?.ok_or_else(|| {
            InternalError::new("call to a nothing-returning function used as a value").into()
        }),
        Expression::Unary(unary) => {
            let operand = generate_value(ctx, &unary.operand)?.into_int_value();
            match unary.operator {
                UnaryOperator::Plus => Ok(operand.into()),
                UnaryOperator::Minus => Ok(ctx
                    .builder
                    .build_int_neg(operand, "neg")
                    .unwrap()
                    .into()),
            }
        }
        Expression::Binary(binary) => {
            let left = generate_value(ctx, &binary.left)?.into_int_value();
            let right = generate_value(ctx, &binary.right)?.into_int_value();
            let builder = &ctx.builder;
            let result = match binary.operator {
                BinaryOperator::Add => builder.build_int_add(left, right, "add"),
                BinaryOperator::Subtract => builder.build_int_sub(left, right, "sub"),
                BinaryOperator::Multiply => builder.build_int_mul(left, right, "mul"),
                BinaryOperator::Divide => builder.build_int_signed_div(left, right, "div"),
                BinaryOperator::Modulo => builder.build_int_signed_rem(left, right, "mod"),
            };
            Ok(result.unwrap().into())
        }
    }
}

/// Lower a call. Returns `None` for nothing-returning callees, which must
/// not produce a result name.
pub fn generate_call<'ctx>(
    ctx: &CodegenContext<'ctx>,
    call: &FunctionCall<SemInfo>,
) -> Result<Option<BasicValueEnum<'ctx>>, CompilerError> {
    let info = call
        .info
        .as_call()
        .expect("call without resolution annotation");

    let mut callee_path = vec![call.id.name.clone()];
    callee_path.extend(info.callee_path.iter().cloned());
    let symbol = lowered_symbol(&callee_path);
    let Some(fn_value) = ctx.module.get_function(&symbol) else {
        return Err(InternalError::new(format!("call to unknown symbol '{symbol}'")).into());
    };

    let mut arguments: Vec<BasicMetadataValueEnum> = vec![];

    // nested callees receive their parent's frame as an implicit first
    // argument, reached from here in caller-callee hops
    if let Some(frame) = ctx.try_frame(&qualified_name(&callee_path)) {
        if frame.has_static_link {
            let hops = info.caller_path.len() - info.callee_path.len();
            arguments.push(ctx.frame_at(hops).0.into());
        }
    }

    for (argument, (mode, param_type)) in call.arguments.iter().zip(&info.params) {
        match mode {
            PassMode::ByValue => arguments.push(generate_value(ctx, argument)?.into()),
            PassMode::ByReference => {
                arguments.push(generate_reference_argument(ctx, argument, param_type)?.into())
            }
        }
    }

    let result_name = match info.return_kind {
        ScalarKind::Nothing => "",
        _ => "call",
    };
    let call_site = ctx
        .builder
        .build_call(fn_value, &arguments, result_name)
        .unwrap();

    Ok(call_site.try_as_basic_value().left())
}

/// The pointer passed for a by-reference argument. Scalars pass their slot
/// address. Arrays already held as pointers pass through unchanged when
/// the parameter keeps the same open shape; otherwise the owned array (or
/// sub-array) decays to a pointer to its first leading element.
fn generate_reference_argument<'ctx>(
    ctx: &CodegenContext<'ctx>,
    argument: &Expression<SemInfo>,
    param_type: &DataType,
) -> Result<PointerValue<'ctx>, CompilerError> {
    let Expression::Lvalue(lvalue) = argument else {
        return Err(
            InternalError::new("by-reference argument survived checking as a non-l-value").into(),
        );
    };
    let place = lvalue::generate_place(ctx, lvalue)?;

    if !param_type.has_unspecified_leading() || place.data_type.has_unspecified_leading() {
        // fully-bounded parameters take the array (or scalar slot) pointer
        // itself; an open argument is already the decayed pointer
        return Ok(place.pointer);
    }

    // owned array or sub-array into an open parameter: decay to the first
    // element of the leading dimension
    let zero = ctx.context.i64_type().const_zero();
    let pointer = unsafe {
        ctx.builder
            .build_in_bounds_gep(place.pointee, place.pointer, &[zero, zero], "decay")
            .unwrap()
    };
    Ok(pointer)
}
