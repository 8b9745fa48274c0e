//! Condition lowering: signed comparisons and short-circuit connectives.

use inkwell::{values::IntValue, IntPredicate};

use crate::{
    error::CompilerError,
    parser::ast::{ComparisonOperator, Condition, LogicalOperator},
    semantic::SemInfo,
};

use super::{expression, CodegenContext};

pub fn generate_condition<'ctx>(
    ctx: &CodegenContext<'ctx>,
    condition: &Condition<SemInfo>,
) -> Result<IntValue<'ctx>, CompilerError> {
    match condition {
        Condition::Comparison(comparison) => {
            let left = expression::generate_value(ctx, &comparison.left)?.into_int_value();
            let right = expression::generate_value(ctx, &comparison.right)?.into_int_value();
            let predicate = match comparison.operator {
                ComparisonOperator::Equal => IntPredicate::EQ,
                ComparisonOperator::NotEqual => IntPredicate::NE,
                ComparisonOperator::Less => IntPredicate::SLT,
                ComparisonOperator::LessEqual => IntPredicate::SLE,
                ComparisonOperator::Greater => IntPredicate::SGT,
                ComparisonOperator::GreaterEqual => IntPredicate::SGE,
            };
            Ok(ctx
                .builder
                .build_int_compare(predicate, left, right, "cmp")
                .unwrap())
        }
        Condition::Not(not) => {
            let inner = generate_condition(ctx, &not.inner)?;
            Ok(ctx.builder.build_not(inner, "not").unwrap())
        }
        Condition::Logical(logical) => {
            let function = ctx.active().function;
            let (label, short_circuits_to_rhs_on_true) = match logical.operator {
                LogicalOperator::And => ("and", true),
                LogicalOperator::Or => ("or", false),
            };

            let left = generate_condition(ctx, &logical.left)?;
            // the block the branch lands in, which nested short-circuits
            // may have moved past the one the evaluation started in
            let left_block = ctx.builder.get_insert_block().unwrap();

            let rhs_block = ctx
                .context
                .append_basic_block(function, &format!("{label}_rhs"));
            let merge_block = ctx
                .context
                .append_basic_block(function, &format!("{label}_merge"));

            if short_circuits_to_rhs_on_true {
                // and: false short-circuits past the right operand
                ctx.builder
                    .build_conditional_branch(left, rhs_block, merge_block)
                    .unwrap();
            } else {
                // or: true short-circuits past the right operand
                ctx.builder
                    .build_conditional_branch(left, merge_block, rhs_block)
                    .unwrap();
            }

            ctx.builder.position_at_end(rhs_block);
            let right = generate_condition(ctx, &logical.right)?;
            let right_block = ctx.builder.get_insert_block().unwrap();
            ctx.builder
                .build_unconditional_branch(merge_block)
                .unwrap();

            ctx.builder.position_at_end(merge_block);
            let phi = ctx
                .builder
                .build_phi(ctx.context.bool_type(), &format!("{label}_result"))
                .unwrap();
            phi.add_incoming(&[(&left, left_block), (&right, right_block)]);
            Ok(phi.as_basic_value().into_int_value())
        }
    }
}
