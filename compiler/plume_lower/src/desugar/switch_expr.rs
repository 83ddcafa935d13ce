//! Switch expressions.
//!
//! ```text
//! s switch { p1 when g => r1, p2 => r2, _ => r3 }
//! ```
//!
//! becomes
//!
//! ```text
//! (s is p1 && g) ? (T)r1 : (s is p2) ? (T)r2 : (T)r3
//! ```
//!
//! where `T` is the type the switch converts to. Without a catch-all arm
//! the chain ends in `throw new SwitchExpressionException(s)`. The `is`
//! tests are left for the pattern pass.

use plume_ir::ast::{BinaryOp, ExprKind, PatternKind};
use plume_ir::{ArmRange, Conversion, ExprId, PatternId, SyntaxTree, TypeId};

use crate::rewrite::Rewriter;
use crate::LowerError;

pub(super) fn lower(
    rw: &mut Rewriter<'_>,
    id: ExprId,
    subject: ExprId,
    arms: ArmRange,
) -> Result<(), LowerError> {
    let span = rw.input.expr_span(id);
    let info = rw.type_info(id);
    let result_ty = if info.converted.is_unknown() {
        info.ty
    } else {
        info.converted
    };
    let subject_ty = rw.type_of(subject);
    let (subject, capture) = rw.stabilize(id, subject, subject_ty, "s")?;

    let exception = rw.out.type_str("SwitchExpressionException");
    let value = rw.read(subject);
    let exception = rw.out.new_object(exception, &[value], span);
    let mut chain = rw.out.alloc_expr(ExprKind::Throw(exception), span);

    let arms = rw.input.arms(arms).to_vec();
    for arm in arms.iter().rev() {
        let result = convert(rw, arm.result, result_ty);
        if !arm.guard.is_valid() && is_catch_all(rw.input, arm.pattern) {
            chain = result;
            continue;
        }
        let value = rw.read(subject);
        let mut cond = rw.out.alloc_expr(
            ExprKind::Is {
                subject: value,
                pattern: arm.pattern,
            },
            arm.span,
        );
        if arm.guard.is_valid() {
            cond = rw.out.binary(BinaryOp::And, cond, arm.guard, arm.span);
        }
        chain = rw.out.conditional(cond, result, chain, arm.span);
    }

    if let Some(capture) = capture {
        chain = rw.out.seq(&[capture], chain, span);
    }
    rw.replace(id, chain);
    Ok(())
}

/// Cast an arm result to the switch type unless it already has it.
fn convert(rw: &mut Rewriter<'_>, result: ExprId, target: TypeId) -> ExprId {
    if target.is_unknown() || matches!(rw.input.expr_kind(result), ExprKind::Throw(_)) {
        return result;
    }
    if rw.model.classify_conversion(result, target) == Conversion::Identity {
        return result;
    }
    let span = rw.input.expr_span(result);
    let ty = rw.type_syntax(target);
    rw.out.cast(ty, result, span)
}

fn is_catch_all(tree: &SyntaxTree, pattern: PatternId) -> bool {
    match tree.pattern_kind(pattern) {
        PatternKind::Discard => true,
        PatternKind::Parenthesized(inner) => is_catch_all(tree, inner),
        _ => false,
    }
}
