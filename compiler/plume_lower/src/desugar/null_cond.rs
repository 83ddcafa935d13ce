//! Null-conditional access.
//!
//! `a?.b.c?.d` tests each receiver once and substitutes it for the binding
//! that starts the access after `?`:
//!
//! ```text
//! a?.b.c?.d  →  a != null && (__n0 = a.b.c) != null ? (T?)__n0.d : null
//! ```
//!
//! Simple receivers are read directly; anything else goes through a
//! hoisted temporary. A void access in statement position becomes an `if`.
//! A void access inside a larger expression is wrapped in a lambda that is
//! invoked only when every guard holds.

use plume_ir::ast::{BinaryOp, ExprKind, LambdaBody, StmtKind};
use plume_ir::{ExprId, NodeRef, ParamRange, Parent, Span, StmtId, TypeId, TypeShape};

use super::indexing::{self, subscript};
use crate::rewrite::Rewriter;
use crate::synth::default_value;
use crate::LowerError;

pub(super) fn lower(rw: &mut Rewriter<'_>, id: ExprId) -> Result<(), LowerError> {
    if is_nested_access(rw, id) {
        return Ok(());
    }
    let span = rw.input.expr_span(id);
    let mut guards = Vec::new();
    let value = chain(rw, id, None, &mut guards)?;
    let cond = conjunction(rw, guards, span);
    let result_ty = rw.type_of(id);

    if result_ty == TypeId::VOID {
        match rw.parents.parent(NodeRef::Expr(id)) {
            Parent::Node(NodeRef::Stmt(stmt)) if is_expr_stmt_of(rw, stmt, id) => {
                let body = rw.out.expr_stmt(value, span);
                rw.set_stmt(
                    stmt,
                    StmtKind::If {
                        cond,
                        then_branch: body,
                        else_branch: StmtId::INVALID,
                    },
                );
                return Ok(());
            }
            Parent::Node(NodeRef::Expr(parent)) => {
                if let ExprKind::Lambda(lambda) = rw.input.expr_kind(parent) {
                    if rw.input.lambda(lambda).body == LambdaBody::Expr(id) {
                        let body = rw.out.expr_stmt(value, span);
                        let test = rw.out.if_stmt(cond, body, StmtId::INVALID, span);
                        let block = rw.out.block(&[test], span);
                        rw.out.set_lambda_body(lambda, LambdaBody::Block(block));
                        rw.mark_changed();
                        return Ok(());
                    }
                }
            }
            _ => {}
        }
        let call = invoke_when(rw, value, span);
        let otherwise = rw.out.bool_lit(false, span);
        let result = rw.out.conditional(cond, call, otherwise, span);
        rw.replace(id, result);
        return Ok(());
    }

    let value = if rw.model.type_data(result_ty).shape == TypeShape::Nullable {
        let ty = rw.type_syntax(result_ty);
        rw.out.cast(ty, value, span)
    } else {
        value
    };
    let fallback = default_value(&mut rw.out, rw.model, result_ty, span);
    let result = rw.out.conditional(cond, value, fallback, span);
    rw.replace(id, result);
    Ok(())
}

/// `a?.b?.c` nests the second access inside the first; only the
/// outermost one is lowered, and it takes the whole chain.
fn is_nested_access(rw: &Rewriter<'_>, id: ExprId) -> bool {
    let Parent::Node(NodeRef::Expr(parent)) = rw.parents.parent(NodeRef::Expr(id)) else {
        return false;
    };
    matches!(rw.input.expr_kind(parent), ExprKind::ConditionalAccess { access, .. } if access == id)
}

fn is_expr_stmt_of(rw: &Rewriter<'_>, stmt: StmtId, id: ExprId) -> bool {
    matches!(rw.input.stmt_kind(stmt), StmtKind::Expr(e) if e == id)
}

/// Guard one receiver and lower its access. Returns the accessed value.
///
/// `outer` is the receiver template of the enclosing access, substituted
/// into this access's receiver.
fn chain(
    rw: &mut Rewriter<'_>,
    ca: ExprId,
    outer: Option<(ExprId, TypeId)>,
    guards: &mut Vec<ExprId>,
) -> Result<ExprId, LowerError> {
    let span = rw.input.expr_span(ca);
    let ExprKind::ConditionalAccess { receiver, access } = rw.input.expr_kind(ca) else {
        return Err(rw.unsupported("malformed conditional access", span));
    };
    if let Some((template, ty)) = outer {
        substitute(rw, ca, receiver, template, ty)?;
    }
    let receiver_ty = rw.type_of(receiver);
    let (template, capture) = rw.stabilize(ca, receiver, receiver_ty, "n")?;
    let tested = match capture {
        Some(capture) => capture,
        None => rw.read(template),
    };
    let null = rw.out.null(span);
    guards.push(rw.out.binary(BinaryOp::NotEq, tested, null, span));

    // `int?` receivers are accessed through their value.
    let model = rw.model;
    let data = model.type_data(receiver_ty);
    let (template, template_ty) = if data.shape == TypeShape::Nullable {
        let element = data.element.unwrap_or(TypeId::UNKNOWN);
        let value = rw.read(template);
        (rw.out.member_str(value, "Value", span), element)
    } else {
        (template, receiver_ty)
    };

    if let ExprKind::ConditionalAccess { .. } = rw.input.expr_kind(access) {
        return chain(rw, access, Some((template, template_ty)), guards);
    }
    substitute(rw, ca, access, template, template_ty)?;
    Ok(access)
}

/// Replace the binding at the root of `expr` with a read of `template`.
///
/// Subscripts on the way up are lowered once their receiver exists.
fn substitute(
    rw: &mut Rewriter<'_>,
    anchor: ExprId,
    expr: ExprId,
    template: ExprId,
    template_ty: TypeId,
) -> Result<(), LowerError> {
    let span = rw.out.expr_span(expr);
    match rw.out.expr_kind(expr) {
        ExprKind::Member { receiver, .. } => substitute(rw, anchor, receiver, template, template_ty),
        ExprKind::Invocation { callee, .. } => substitute(rw, anchor, callee, template, template_ty),
        ExprKind::Index { receiver, args } => {
            substitute(rw, anchor, receiver, template, template_ty)?;
            let Some(arg) = indexing::classify(rw, args) else {
                return Ok(());
            };
            let receiver_ty = rw.type_of(receiver);
            let (stable, capture) = rw.stabilize(anchor, receiver, receiver_ty, "r")?;
            let mut result = subscript(rw, anchor, stable, receiver_ty, arg, span)?;
            if let Some(capture) = capture {
                result = rw.out.seq(&[capture], result, span);
            }
            rw.replace(expr, result);
            Ok(())
        }
        ExprKind::MemberBinding(name) => {
            let receiver = rw.read(template);
            rw.set_kind(expr, ExprKind::Member { receiver, name });
            Ok(())
        }
        ExprKind::ElementBinding(args) => {
            if let Some(arg) = indexing::classify(rw, args) {
                let result = subscript(rw, anchor, template, template_ty, arg, span)?;
                rw.replace(expr, result);
            } else {
                let receiver = rw.read(template);
                rw.set_kind(expr, ExprKind::Index { receiver, args });
            }
            Ok(())
        }
        _ => Err(rw.unsupported(
            "conditional access that does not start with a member or element binding",
            span,
        )),
    }
}

fn conjunction(rw: &mut Rewriter<'_>, guards: Vec<ExprId>, span: Span) -> ExprId {
    let mut guards = guards.into_iter();
    let Some(first) = guards.next() else {
        return rw.out.bool_lit(true, span);
    };
    guards.fold(first, |acc, guard| rw.out.binary(BinaryOp::And, acc, guard, span))
}

/// `((Func<bool>)(() => { value; return true; }))()`
fn invoke_when(rw: &mut Rewriter<'_>, value: ExprId, span: Span) -> ExprId {
    let effect = rw.out.expr_stmt(value, span);
    let done = rw.out.bool_lit(true, span);
    let ret = rw.out.return_stmt(done, span);
    let body = rw.out.block(&[effect, ret], span);
    let lambda = rw.out.lambda_expr(ParamRange::EMPTY, LambdaBody::Block(body), span);
    let bool_ty = rw.out.type_str("bool");
    let func = rw.out.generic_type("Func", &[bool_ty]);
    let delegate = rw.out.cast(func, lambda, span);
    rw.out.call(delegate, &[], span)
}
