//! Expression-bodied members become block bodies.
//!
//! `int M() => e;` becomes `int M() { return e; }`. Members that produce no
//! value (void methods, constructors, setters) get `{ e; }` instead.
//! Lambdas keep their expression bodies.

use plume_ir::ast::{Body, MemberKind, StmtKind};
use plume_ir::{ExprId, NodeRef, SemanticModel, SyntaxTree, TypeExprId, TypeId};

use crate::rewrite::{post_order, Rewriter, Rewritten};
use crate::LowerError;

pub(crate) const PASS: &str = "expression-bodies";

#[tracing::instrument(level = "debug", skip_all)]
pub(crate) fn run(input: &SyntaxTree, model: &dyn SemanticModel) -> Result<Rewritten, LowerError> {
    let mut rw = Rewriter::new(PASS, input, model);

    for (t, decl) in input.unit.types.iter().enumerate() {
        for (m, member) in decl.members.iter().enumerate() {
            let kind = match member.kind.clone() {
                MemberKind::Method {
                    name,
                    type_params,
                    params,
                    ret,
                    body: Body::Expr(e),
                } => {
                    let returns = !is_void(model, ret);
                    MemberKind::Method {
                        name,
                        type_params,
                        params,
                        ret,
                        body: block_body(&mut rw.out, e, returns),
                    }
                }
                MemberKind::Operator {
                    op,
                    params,
                    ret,
                    body: Body::Expr(e),
                } => MemberKind::Operator {
                    op,
                    params,
                    ret,
                    body: block_body(&mut rw.out, e, true),
                },
                MemberKind::Constructor {
                    params,
                    initializer,
                    body: Body::Expr(e),
                } => MemberKind::Constructor {
                    params,
                    initializer,
                    body: block_body(&mut rw.out, e, false),
                },
                MemberKind::Property {
                    ty,
                    name,
                    getter,
                    setter,
                    init,
                } if matches!(getter, Some(Body::Expr(_))) || matches!(setter, Some(Body::Expr(_))) => {
                    let getter = getter.map(|body| accessor(&mut rw.out, body, true));
                    let setter = setter.map(|body| accessor(&mut rw.out, body, false));
                    MemberKind::Property {
                        ty,
                        name,
                        getter,
                        setter,
                        init,
                    }
                }
                _ => continue,
            };
            rw.out.unit.types[t].members[m].kind = kind;
            rw.mark_changed();
        }
    }

    for node in post_order(input) {
        let NodeRef::Stmt(stmt) = node else { continue };
        let StmtKind::LocalFunction(func) = input.stmt_kind(stmt) else {
            continue;
        };
        let mut func = input.local_fn(func).clone();
        let Body::Expr(e) = func.body else { continue };
        let returns = !is_void(model, func.ret);
        func.body = block_body(&mut rw.out, e, returns);
        let func = rw.out.alloc_local_fn(func);
        rw.set_stmt(stmt, StmtKind::LocalFunction(func));
    }

    Ok(rw.finish())
}

/// Whether the return type syntax `ty` resolves to `void`, however it is
/// spelled.
fn is_void(model: &dyn SemanticModel, ty: TypeExprId) -> bool {
    model.bind_type(ty) == TypeId::VOID
}

fn accessor(out: &mut SyntaxTree, body: Body, returns: bool) -> Body {
    match body {
        Body::Expr(e) => block_body(out, e, returns),
        other => other,
    }
}

fn block_body(out: &mut SyntaxTree, e: ExprId, returns: bool) -> Body {
    let span = out.expr_span(e);
    let stmt = if returns {
        out.return_stmt(e, span)
    } else {
        out.expr_stmt(e, span)
    };
    out.block_body(&[stmt], span)
}
