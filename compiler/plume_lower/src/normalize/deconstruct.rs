//! Deconstruction, discards and `out` declarations.
//!
//! - `(a, var b) = e;` becomes `T __t0 = e; a = __t0.Item1; var b = __t0.Item2;`
//! - `_ = e;` becomes `e;`
//! - `M(out var x)` declares `x` before the statement and passes `out x`
//! - `M(out _)` passes a fresh hoisted temporary

use plume_ir::ast::{ExprKind, StmtKind, TypeExpr};
use plume_ir::{ExprId, ExprRange, NodeRef, Parent, SemanticModel, Span, StmtId, SyntaxTree, TypeId};

use crate::rewrite::{post_order, Rewriter, Rewritten};
use crate::synth::{components, local_type};
use crate::LowerError;

pub(crate) const PASS: &str = "deconstruction";

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(input: &SyntaxTree, model: &dyn SemanticModel) -> Result<Rewritten, LowerError> {
    let mut rw = Rewriter::new(PASS, input, model);
    for node in post_order(input) {
        match node {
            NodeRef::Expr(id) => expr(&mut rw, id)?,
            NodeRef::Stmt(id) => stmt(&mut rw, id),
            NodeRef::Pattern(_) => {}
        }
    }
    Ok(rw.finish())
}

fn expr(rw: &mut Rewriter<'_>, id: ExprId) -> Result<(), LowerError> {
    let input = rw.input;
    match input.expr_kind(id) {
        ExprKind::Out(inner) => out_argument(rw, id, inner),
        ExprKind::Assign {
            op: None,
            target,
            value,
        } if statement_of(rw, id).is_none() => match input.expr_kind(target) {
            // `x = (_ = e)` has the value of `e`.
            ExprKind::Discard => {
                rw.replace(id, value);
                Ok(())
            }
            ExprKind::Tuple(_) => Err(rw.unsupported(
                "deconstruction outside of an expression statement",
                input.expr_span(id),
            )),
            _ => Ok(()),
        },
        _ => Ok(()),
    }
}

fn stmt(rw: &mut Rewriter<'_>, id: StmtId) {
    let input = rw.input;
    let StmtKind::Expr(e) = input.stmt_kind(id) else {
        return;
    };
    let ExprKind::Assign {
        op: None,
        target,
        value,
    } = input.expr_kind(e)
    else {
        return;
    };
    match input.expr_kind(target) {
        ExprKind::Discard => rw.set_stmt(id, StmtKind::Expr(value)),
        ExprKind::Tuple(elements) => deconstruct(rw, id, elements, value),
        _ => {}
    }
}

/// Statement whose whole expression is `id`.
fn statement_of(rw: &Rewriter<'_>, id: ExprId) -> Option<StmtId> {
    let Parent::Node(NodeRef::Stmt(stmt)) = rw.parents.parent(NodeRef::Expr(id)) else {
        return None;
    };
    match rw.input.stmt_kind(stmt) {
        StmtKind::Expr(e) if e == id => Some(stmt),
        _ => None,
    }
}

fn deconstruct(rw: &mut Rewriter<'_>, stmt: StmtId, elements: ExprRange, value: ExprId) {
    let span = rw.input.stmt_span(stmt);
    let source_ty = rw.type_of(value);
    let temp = rw.fresh("t");
    let ty = local_type(&mut rw.out, rw.model, source_ty);
    let mut stmts = vec![rw.out.local(ty, temp, value, span)];
    let source = rw.out.ident(temp, span);
    assign_targets(rw, elements, source, source_ty, span, &mut stmts);
    rw.splice(stmt, &stmts);
}

/// One statement per target, reading components of `source` in order.
/// Nested tuples read through the outer component.
fn assign_targets(
    rw: &mut Rewriter<'_>,
    elements: ExprRange,
    source: ExprId,
    source_ty: TypeId,
    span: Span,
    stmts: &mut Vec<StmtId>,
) {
    let items = rw.input.exprs(elements).to_vec();
    let members = components(rw.model, &rw.out, source_ty, items.len());
    for (&item, (member, ty)) in items.iter().zip(members) {
        let kind = rw.input.expr_kind(item);
        if matches!(kind, ExprKind::Discard) {
            continue;
        }
        let receiver = rw.read(source);
        let access = rw.out.member(receiver, member, span);
        match kind {
            ExprKind::Tuple(nested) => assign_targets(rw, nested, access, ty, span, stmts),
            ExprKind::Declaration { ty: declared, name } => {
                stmts.push(rw.out.local(declared, name, access, span));
            }
            _ => {
                let assign = rw.out.assign(item, access, span);
                stmts.push(rw.out.expr_stmt(assign, span));
            }
        }
    }
}

/// `out var x` / `out T x` / `out _`.
fn out_argument(rw: &mut Rewriter<'_>, id: ExprId, inner: ExprId) -> Result<(), LowerError> {
    let span = rw.input.expr_span(id);
    let (name, ty) = match rw.input.expr_kind(inner) {
        ExprKind::Declaration { ty, name } => {
            let declared = rw
                .model
                .declared_symbol(NodeRef::Expr(inner))
                .map(|symbol| symbol.ty)
                .filter(|ty| !ty.is_unknown());
            let syntax = match declared {
                Some(declared) => rw.type_syntax(declared),
                // `var x;` needs an initializer; there is none to infer from.
                None if matches!(rw.input.type_expr(ty), TypeExpr::Var) => {
                    rw.type_syntax(TypeId::UNKNOWN)
                }
                None => ty,
            };
            (name, syntax)
        }
        ExprKind::Discard => {
            let name = rw.fresh("d");
            let ty = rw.type_info(inner).converted;
            (name, rw.type_syntax(ty))
        }
        _ => return Ok(()),
    };
    let point = rw.install_point(NodeRef::Expr(id), span)?;
    rw.hoist(point, name, ty, span);
    rw.set_kind(inner, ExprKind::Ident(name));
    Ok(())
}
