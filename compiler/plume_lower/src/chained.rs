//! Chained assignment statements.
//!
//! `a = b = e;` becomes `var __t0 = e; b = __t0; a = __t0;`. Targets are
//! assigned innermost first, the order the nested form stores them in.
//! Chains inside larger expressions are left alone.

use plume_ir::ast::{ExprKind, StmtKind};
use plume_ir::{ExprId, NodeRef, SemanticModel, StmtId, SyntaxTree, TypeId};

use crate::rewrite::{post_order, Rewriter, Rewritten};
use crate::synth::local_type;
use crate::LowerError;

pub(crate) const PASS: &str = "chained-assignment";

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(input: &SyntaxTree, model: &dyn SemanticModel) -> Result<Rewritten, LowerError> {
    let mut rw = Rewriter::new(PASS, input, model);
    for node in post_order(input) {
        let NodeRef::Stmt(id) = node else { continue };
        let StmtKind::Expr(expr) = input.stmt_kind(id) else {
            continue;
        };
        let (targets, value) = chain(input, expr);
        if targets.len() > 1 {
            split(&mut rw, id, &targets, value);
        }
    }
    Ok(rw.finish())
}

/// Targets of `t1 = t2 = .. = value`, outermost first.
fn chain(tree: &SyntaxTree, expr: ExprId) -> (Vec<ExprId>, ExprId) {
    let mut targets = Vec::new();
    let mut current = expr;
    while let ExprKind::Assign {
        op: None,
        target,
        value,
    } = tree.expr_kind(current)
    {
        targets.push(target);
        current = value;
    }
    (targets, current)
}

fn split(rw: &mut Rewriter<'_>, stmt: StmtId, targets: &[ExprId], value: ExprId) {
    let span = rw.input.stmt_span(stmt);
    let temp = rw.fresh("t");
    // The innermost target's type is what every outer target receives.
    let mut ty = targets.last().map_or(TypeId::UNKNOWN, |&t| rw.type_of(t));
    if ty.is_unknown() {
        ty = rw.type_of(value);
    }
    let ty = local_type(&mut rw.out, rw.model, ty);
    let mut items = Vec::with_capacity(targets.len() + 1);
    items.push(rw.out.local(ty, temp, value, span));
    for &target in targets.iter().rev() {
        let read = rw.out.ident(temp, span);
        let assign = rw.out.assign(target, read, span);
        items.push(rw.out.expr_stmt(assign, span));
    }
    rw.splice(stmt, &items);
}
