//! Statement lowering with the block terminator discipline.
//!
//! Every branch of control flow checks whether the current block already
//! terminated (a `return` inside an arm) before emitting its own jump.
//! Statements following a terminator in the same block are dropped with a
//! single "unreachable code" warning.

use log::warn;

use crate::{
    error::CompilerError,
    parser::ast::{Assignment, Block, If, Return, ScalarKind, Statement, While},
    semantic::SemInfo,
};

use super::{condition, expression, lvalue, CodegenContext};

pub fn generate_statement<'ctx>(
    ctx: &CodegenContext<'ctx>,
    statement: &Statement<SemInfo>,
) -> Result<(), CompilerError> {
    match statement {
        Statement::Empty(_) => Ok(()),
        Statement::Assignment(assignment) => generate_assignment(ctx, assignment),
        Statement::Block(block) => generate_block(ctx, block),
        Statement::Call(call) => {
            expression::generate_call(ctx, call)?;
            Ok(())
        }
        Statement::If(if_statement) => generate_if(ctx, if_statement),
        Statement::While(while_loop) => generate_while(ctx, while_loop),
        Statement::Return(ret) => generate_return(ctx, ret),
    }
}

pub fn generate_block<'ctx>(
    ctx: &CodegenContext<'ctx>,
    block: &Block<SemInfo>,
) -> Result<(), CompilerError> {
    for statement in &block.statements {
        if ctx.terminated() {
            let position = statement.position();
            warn!(
                "unreachable code at line {}, column {}",
                position.start.0, position.start.1
            );
            break;
        }
        generate_statement(ctx, statement)?;
    }
    Ok(())
}

fn generate_assignment<'ctx>(
    ctx: &CodegenContext<'ctx>,
    assignment: &Assignment<SemInfo>,
) -> Result<(), CompilerError> {
    let place = lvalue::generate_place(ctx, &assignment.target)?;
    let value = expression::generate_value(ctx, &assignment.value)?;
    ctx.builder.build_store(place.pointer, value).unwrap();
    Ok(())
}

fn generate_if<'ctx>(
    ctx: &CodegenContext<'ctx>,
    if_statement: &If<SemInfo>,
) -> Result<(), CompilerError> {
    let cond = condition::generate_condition(ctx, &if_statement.condition)?;
    let function = ctx.active().function;

    let then_block = ctx.context.append_basic_block(function, "if_then");
    let else_block = ctx.context.append_basic_block(function, "if_else");
    let merge_block = ctx.context.append_basic_block(function, "if_merge");

    ctx.builder
        .build_conditional_branch(cond, then_block, else_block)
        .unwrap();

    ctx.builder.position_at_end(then_block);
    generate_statement(ctx, &if_statement.then_branch)?;
    let then_terminated = ctx.terminated();
    if !then_terminated {
        ctx.builder
            .build_unconditional_branch(merge_block)
            .unwrap();
    }

    ctx.builder.position_at_end(else_block);
    if let Some(else_branch) = &if_statement.else_branch {
        generate_statement(ctx, else_branch)?;
    }
    let else_terminated = ctx.terminated();
    if !else_terminated {
        ctx.builder
            .build_unconditional_branch(merge_block)
            .unwrap();
    }

    ctx.builder.position_at_end(merge_block);
    if then_terminated && else_terminated {
        // both arms returned; the merge block is unreachable but the
        // backend still wants it well-formed
        match ctx.active().return_kind {
            ScalarKind::Nothing => ctx.builder.build_return(None).unwrap(),
            kind => {
                let zero = ctx.scalar_type(kind).into_int_type().const_zero();
                ctx.builder.build_return(Some(&zero)).unwrap()
            }
        };
    }
    Ok(())
}

fn generate_while<'ctx>(
    ctx: &CodegenContext<'ctx>,
    while_loop: &While<SemInfo>,
) -> Result<(), CompilerError> {
    let function = ctx.active().function;

    let cond_block = ctx.context.append_basic_block(function, "while_cond");
    let body_block = ctx.context.append_basic_block(function, "while_body");
    let end_block = ctx.context.append_basic_block(function, "while_end");

    ctx.builder.build_unconditional_branch(cond_block).unwrap();

    ctx.builder.position_at_end(cond_block);
    let cond = condition::generate_condition(ctx, &while_loop.condition)?;
    ctx.builder
        .build_conditional_branch(cond, body_block, end_block)
        .unwrap();

    ctx.builder.position_at_end(body_block);
    generate_statement(ctx, &while_loop.body)?;
    if !ctx.terminated() {
        ctx.builder.build_unconditional_branch(cond_block).unwrap();
    }

    ctx.builder.position_at_end(end_block);
    Ok(())
}

fn generate_return<'ctx>(
    ctx: &CodegenContext<'ctx>,
    ret: &Return<SemInfo>,
) -> Result<(), CompilerError> {
    match (&ret.value, ctx.active().return_kind) {
        (None, _) => {
            ctx.builder.build_return(None).unwrap();
        }
        (Some(expression), ScalarKind::Nothing) => {
            // a bare return of a nothing-call: emit the call, return void
            let crate::parser::ast::Expression::Call(call) = expression else {
                unreachable!("non-call expression returned from a nothing function");
            };
            expression::generate_call(ctx, call)?;
            ctx.builder.build_return(None).unwrap();
        }
        (Some(expression), _) => {
            let value = expression::generate_value(ctx, expression)?;
            ctx.builder.build_return(Some(&value)).unwrap();
        }
    }
    Ok(())
}
