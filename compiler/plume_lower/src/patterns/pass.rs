//! Pattern lowering pass: rewrites every `is <pattern>` expression.

use plume_ir::ast::{ExprKind, PatternKind, StmtKind};
use plume_ir::{ExprId, NodeRef, Parent, PatternId, SemanticModel, StmtId, SyntaxTree};

use super::{PatternLowerer, Subject};
use crate::rewrite::{post_order, Rewriter, Rewritten};
use crate::synth::is_simple;
use crate::LowerError;

pub(crate) const PASS: &str = "patterns";

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(input: &SyntaxTree, model: &dyn SemanticModel) -> Result<Rewritten, LowerError> {
    let mut rw = Rewriter::new(PASS, input, model);
    for node in post_order(input) {
        match node {
            NodeRef::Expr(id) => {
                if let ExprKind::Is { subject, pattern } = input.expr_kind(id) {
                    if declaration_test(&rw, id).is_none() {
                        lower_is(&mut rw, id, subject, pattern)?;
                    }
                }
            }
            NodeRef::Stmt(id) => lower_if_declaration(&mut rw, id),
            NodeRef::Pattern(_) => {}
        }
    }
    Ok(rw.finish())
}

fn lower_is(
    rw: &mut Rewriter<'_>,
    id: ExprId,
    subject: ExprId,
    pattern: PatternId,
) -> Result<(), LowerError> {
    let span = rw.input.expr_span(id);
    let point = rw.install_point(NodeRef::Expr(id), span)?;
    let subject = Subject {
        expr: subject,
        ty: rw.type_of(subject),
        source: Some(subject),
    };
    let lowered = PatternLowerer::new(rw, point, span).lower(subject, pattern);
    let cond = lowered.map_err(|err| rw.wrap_expr(err, id))?;
    rw.replace(id, cond);
    Ok(())
}

/// `if (x is T name)` over a simple subject: the declaration is scoped to
/// the `then` branch instead of being hoisted. Returns the enclosing `if`.
fn declaration_test(rw: &Rewriter<'_>, id: ExprId) -> Option<StmtId> {
    let input = rw.input;
    let ExprKind::Is { subject, pattern } = input.expr_kind(id) else {
        return None;
    };
    let PatternKind::Declaration { name, .. } = input.pattern_kind(pattern) else {
        return None;
    };
    if name.is_empty() || input.name_str(name) == "_" || !is_simple(input, subject) {
        return None;
    }
    let Parent::Node(NodeRef::Stmt(stmt)) = rw.parents.parent(NodeRef::Expr(id)) else {
        return None;
    };
    match input.stmt_kind(stmt) {
        StmtKind::If { cond, .. } if cond == id => Some(stmt),
        _ => None,
    }
}

/// `if (x is T name) S` becomes `if (x is T) { T name = (T)x; S }`.
fn lower_if_declaration(rw: &mut Rewriter<'_>, stmt: StmtId) {
    let StmtKind::If {
        cond,
        then_branch,
        else_branch,
    } = rw.input.stmt_kind(stmt)
    else {
        return;
    };
    if declaration_test(rw, cond) != Some(stmt) {
        return;
    }
    let ExprKind::Is { subject, pattern } = rw.input.expr_kind(cond) else {
        return;
    };
    let PatternKind::Declaration { ty, name } = rw.input.pattern_kind(pattern) else {
        return;
    };
    let span = rw.input.expr_span(cond);
    let value = rw.out.duplicate_expr(subject);
    let test = rw.out.type_test(value, ty, span);
    let declared = rw
        .model
        .declared_symbol(NodeRef::Pattern(pattern))
        .map(|symbol| symbol.ty)
        .filter(|ty| !ty.is_unknown());
    let local_ty = match declared {
        Some(declared) => rw.type_syntax(declared),
        None => ty,
    };
    let value = rw.out.duplicate_expr(subject);
    let cast = rw.out.cast(ty, value, span);
    let local = rw.out.local(local_ty, name, cast, span);
    let then_span = rw.out.stmt_span(then_branch);
    let body = rw.out.block(&[local, then_branch], then_span);
    rw.set_stmt(
        stmt,
        StmtKind::If {
            cond: test,
            then_branch: body,
            else_branch,
        },
    );
}
